//! Auth-Handler – Credential pruefen, Identitaet binden, Auto-Join
//!
//! Nach erfolgreicher Authentifizierung wird die Verbindung in der
//! Praesenz-Registry registriert (ersetzt dabei eine eventuelle
//! Vorgaenger-Verbindung derselben Identitaet), allen Konversations-
//! Raeumen des Benutzers beigetreten und der Online-Status verteilt.
//! Ein Fehlschlag laesst die Verbindung offen; der Client darf es
//! erneut versuchen.

use std::sync::Arc;
use tandem_auth::TokenVerifier;
use tandem_db::{CallRepository, ConversationRepository, MessageRepository};
use tandem_protocol::events::ServerEvent;

use crate::dispatcher::{DispatcherContext, VerbindungsZustand};
use crate::server_state::SignalingState;

/// Verarbeitet einen Authentifizierungsversuch
pub async fn handle_authenticate<R, V>(
    token: &str,
    ctx: &mut DispatcherContext,
    state: &Arc<SignalingState<R, V>>,
) -> Option<ServerEvent>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    let identitaet = match state.verifier.pruefen(token).await {
        Ok(identitaet) => identitaet,
        Err(e) => {
            tracing::warn!(peer = %ctx.peer_addr, fehler = %e, "Authentifizierung fehlgeschlagen");
            return Some(ServerEvent::auth_error("Authentifizierung fehlgeschlagen"));
        }
    };

    let user_id = identitaet.user_id;
    ctx.identitaet = Some(identitaet);
    ctx.zustand = VerbindungsZustand::Authentifiziert;

    // Nach dem Setzen der Identitaet ist der Sender-Handle verfuegbar
    let sender = ctx.sender()?;
    state.presence.client_registrieren(sender.clone());

    // Auto-Join: alle Konversations-Raeume des Benutzers abonnieren
    match state.chat_service.konversationen_von(user_id).await {
        Ok(konversationen) => {
            for konversation in konversationen {
                state.raeume.beitreten(konversation, sender.clone());
            }
        }
        Err(e) => {
            // Der Benutzer bleibt authentifiziert; Raeume koennen spaeter
            // explizit per join_room abonniert werden
            tracing::warn!(user_id = %user_id, fehler = %e, "Auto-Join fehlgeschlagen");
        }
    }

    // Online-Status an alle anderen verteilen
    state
        .presence
        .an_alle_ausser_senden(&ctx.conn_id, ServerEvent::UserOnline { user_id });

    tracing::info!(user_id = %user_id, peer = %ctx.peer_addr, "Verbindung authentifiziert");

    Some(ServerEvent::OnlineUsers {
        users: state.presence.online_ids(),
    })
}
