//! Chat-Handler – Nachrichten-Relay, Tipp-Indikator, Gelesen-Markierung
//!
//! Der Handler validiert und persistiert ueber den ChatService und
//! verteilt erst danach: das `new_message`-Event geht an alle Raum-
//! Mitglieder, der Partner bekommt zusaetzlich einen `new_notification`-
//! Hinweis wenn er online ist, aber den Raum gerade nicht abonniert hat.

use std::sync::Arc;
use tandem_auth::{Identitaet, TokenVerifier};
use tandem_core::types::ConversationId;
use tandem_db::{CallRepository, ConversationRepository, MessageRepository};
use tandem_protocol::events::{NachrichtInfo, NachrichtenTyp, ServerEvent};

use crate::dispatcher::DispatcherContext;
use crate::server_state::SignalingState;

/// Maximale Laenge der Benachrichtigungs-Vorschau in Zeichen
const VORSCHAU_ZEICHEN: usize = 50;

/// Verarbeitet das Senden einer Chat-Nachricht
pub async fn handle_send_message<R, V>(
    conversation_id: ConversationId,
    content: &str,
    message_type: NachrichtenTyp,
    identitaet: &Identitaet,
    state: &Arc<SignalingState<R, V>>,
) -> Option<ServerEvent>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    let zugestellt = match state
        .chat_service
        .nachricht_senden(
            conversation_id,
            identitaet.user_id,
            &identitaet.anzeige_name,
            content,
            typ_zu_chat(message_type),
        )
        .await
    {
        Ok(zugestellt) => zugestellt,
        Err(e) => {
            tracing::warn!(
                user_id = %identitaet.user_id,
                conversation_id = %conversation_id,
                fehler = %e,
                "Nachricht senden fehlgeschlagen"
            );
            return Some(ServerEvent::message_error(format!(
                "Nachricht konnte nicht gesendet werden: {}",
                e
            )));
        }
    };

    let nachricht = zugestellt.nachricht;
    let info = NachrichtInfo {
        id: nachricht.id,
        conversation_id: nachricht.conversation_id,
        sender_id: nachricht.sender_id,
        sender_name: nachricht.sender_name.clone(),
        content: nachricht.content.clone(),
        message_type,
        created_at: nachricht.created_at,
    };

    // Fan-out an alle Raum-Mitglieder, inklusive Absender (Echo mit
    // serverseitiger ID und Zeitstempel)
    let empfaenger = state.raeume.an_raum_senden(
        &conversation_id,
        ServerEvent::NewMessage {
            message: info.clone(),
        },
    );

    tracing::debug!(
        conversation_id = %conversation_id,
        message_id = %info.id,
        empfaenger,
        "Nachricht zugestellt"
    );

    // Sekundaerer Hinweis: Partner ist online, aber nicht im Raum
    if let Some(partner_sender) = state.presence.sender_von(&zugestellt.partner) {
        if !state
            .raeume
            .ist_mitglied(&conversation_id, &partner_sender.conn_id)
        {
            partner_sender.senden(ServerEvent::NewNotification {
                conversation_id,
                sender_id: info.sender_id,
                sender_name: info.sender_name.clone(),
                preview: vorschau(&info.content),
            });
        }
    }

    None
}

/// Verarbeitet einen Tipp-Indikator
///
/// Reines Relay ohne Persistenz; der Ausloeser bekommt das Event nicht
/// zurueck.
pub fn handle_typing<R, V>(
    conversation_id: ConversationId,
    is_typing: bool,
    identitaet: &Identitaet,
    ctx: &DispatcherContext,
    state: &Arc<SignalingState<R, V>>,
) -> Option<ServerEvent>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    state.raeume.an_raum_ausser_senden(
        &conversation_id,
        &ctx.conn_id,
        ServerEvent::UserTyping {
            conversation_id,
            user_id: identitaet.user_id,
            is_typing,
        },
    );
    None
}

/// Verarbeitet eine Gelesen-Markierung
pub async fn handle_mark_read<R, V>(
    conversation_id: ConversationId,
    identitaet: &Identitaet,
    state: &Arc<SignalingState<R, V>>,
) -> Option<ServerEvent>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    match state
        .chat_service
        .als_gelesen_markieren(conversation_id, identitaet.user_id)
        .await
    {
        Ok(partner) => {
            state.presence.an_user_senden(
                &partner,
                ServerEvent::MessagesRead {
                    conversation_id,
                    by: identitaet.user_id,
                },
            );
            None
        }
        Err(e) => {
            tracing::debug!(
                user_id = %identitaet.user_id,
                conversation_id = %conversation_id,
                fehler = %e,
                "Gelesen-Markierung fehlgeschlagen"
            );
            Some(ServerEvent::message_error(format!(
                "Gelesen-Markierung fehlgeschlagen: {}",
                e
            )))
        }
    }
}

/// Kuerzt den Nachrichteninhalt auf die Vorschau-Laenge
fn vorschau(content: &str) -> String {
    content.chars().take(VORSCHAU_ZEICHEN).collect()
}

/// Konvertiert den Draht-Typ in den Domain-Typ
fn typ_zu_chat(typ: NachrichtenTyp) -> tandem_chat::NachrichtenTyp {
    match typ {
        NachrichtenTyp::Text => tandem_chat::NachrichtenTyp::Text,
        NachrichtenTyp::Image => tandem_chat::NachrichtenTyp::Image,
        NachrichtenTyp::Audio => tandem_chat::NachrichtenTyp::Audio,
    }
}
