//! Raum-Handler – Expliziter Beitritt und Austritt
//!
//! Der Beitritt ist reine Zustellmechanik, autorisiert wird trotzdem:
//! nur Teilnehmer der Konversation duerfen ihren Raum abonnieren.

use std::sync::Arc;
use tandem_auth::{Identitaet, TokenVerifier};
use tandem_core::types::ConversationId;
use tandem_db::{CallRepository, ConversationRepository, MessageRepository};
use tandem_protocol::events::ServerEvent;

use crate::dispatcher::DispatcherContext;
use crate::server_state::SignalingState;

/// Verarbeitet einen Raum-Beitritt
pub async fn handle_join_room<R, V>(
    conversation_id: ConversationId,
    identitaet: &Identitaet,
    ctx: &DispatcherContext,
    state: &Arc<SignalingState<R, V>>,
) -> Option<ServerEvent>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    if let Err(e) = state
        .chat_service
        .mitgliedschaft_pruefen(conversation_id, identitaet.user_id)
        .await
    {
        tracing::debug!(
            user_id = %identitaet.user_id,
            conversation_id = %conversation_id,
            fehler = %e,
            "Raum-Beitritt verweigert"
        );
        return Some(ServerEvent::message_error(format!(
            "Beitritt verweigert: {}",
            e
        )));
    }

    let sender = ctx.sender()?;
    state.raeume.beitreten(conversation_id, sender);
    None
}

/// Verarbeitet einen Raum-Austritt
pub fn handle_leave_room<R, V>(
    conversation_id: ConversationId,
    ctx: &DispatcherContext,
    state: &Arc<SignalingState<R, V>>,
) -> Option<ServerEvent>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    state.raeume.verlassen(&conversation_id, &ctx.conn_id);
    None
}
