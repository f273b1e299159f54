//! Event-Dispatcher – Routet ClientEvents an die richtigen Handler
//!
//! Der Dispatcher empfaengt ClientEvents von einer ClientConnection,
//! bestimmt den richtigen Handler und gibt die direkte Antwort zurueck.
//! Alles was an andere Verbindungen geht laeuft ueber deren Send-Queues.
//!
//! ## Zustandspruefung
//! - `Authenticate` ist nur im Zustand `Verbunden` erlaubt
//! - Keepalive ist immer erlaubt
//! - Alle anderen Events erfordern den Zustand `Authentifiziert`

use std::net::SocketAddr;
use std::sync::Arc;
use tandem_auth::{Identitaet, TokenVerifier};
use tandem_core::types::{ConnectionId, UserId};
use tandem_db::{CallRepository, ConversationRepository, MessageRepository};
use tandem_protocol::events::{ClientEvent, ServerEvent};
use tokio::sync::mpsc;

use crate::handlers::{auth_handler, call_handler, chat_handler, room_handler};
use crate::presence::ClientSender;
use crate::server_state::SignalingState;

// ---------------------------------------------------------------------------
// Verbindungszustand
// ---------------------------------------------------------------------------

/// Zustand einer Client-Verbindung
///
/// ```text
/// Verbunden -> Authentifiziert -> Geschlossen
///     |                              ^
///     +------------------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbindungsZustand {
    /// Verbunden, noch nicht authentifiziert
    Verbunden,
    /// Erfolgreich authentifiziert, Identitaet gebunden
    Authentifiziert,
    /// Verbindung wird abgebaut
    Geschlossen,
}

// ---------------------------------------------------------------------------
// DispatcherContext
// ---------------------------------------------------------------------------

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    /// Peer-Adresse (fuer Logging)
    pub peer_addr: SocketAddr,
    /// Eindeutige ID dieser Verbindung
    pub conn_id: ConnectionId,
    /// Verbindungszustand
    pub zustand: VerbindungsZustand,
    /// Gebundene Identitaet (None solange nicht authentifiziert)
    pub identitaet: Option<Identitaet>,
    /// Send-Queue dieser Verbindung (fuer die Praesenz-Registrierung)
    pub sende_tx: mpsc::Sender<ServerEvent>,
}

impl DispatcherContext {
    /// Erstellt einen neuen Kontext fuer eine frische Verbindung
    pub fn neu(peer_addr: SocketAddr, sende_tx: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            peer_addr,
            conn_id: ConnectionId::new(),
            zustand: VerbindungsZustand::Verbunden,
            identitaet: None,
            sende_tx,
        }
    }

    /// Gibt die gebundene User-ID zurueck (None solange nicht authentifiziert)
    pub fn user_id(&self) -> Option<UserId> {
        self.identitaet.as_ref().map(|i| i.user_id)
    }

    /// Baut den ClientSender-Handle dieser Verbindung
    ///
    /// Nur nach erfolgreicher Authentifizierung aufrufbar.
    pub fn sender(&self) -> Option<ClientSender> {
        let identitaet = self.identitaet.as_ref()?;
        Some(ClientSender {
            conn_id: self.conn_id,
            user_id: identitaet.user_id,
            tx: self.sende_tx.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// EventDispatcher
// ---------------------------------------------------------------------------

/// Zentraler Event-Dispatcher
///
/// Routet eingehende ClientEvents an die entsprechenden Handler und gibt
/// die direkte Antwort an die sendende Verbindung zurueck.
pub struct EventDispatcher<R, V>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    state: Arc<SignalingState<R, V>>,
}

impl<R, V> EventDispatcher<R, V>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState<R, V>>) -> Self {
        Self { state }
    }

    /// Verarbeitet ein eingehendes ClientEvent und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine direkte Antwort gesendet werden soll
    /// (z.B. bei Relay-Events die nur die Gegenstelle betreffen).
    pub async fn dispatch(
        &self,
        event: ClientEvent,
        ctx: &mut DispatcherContext,
    ) -> Option<ServerEvent> {
        match event {
            // -------------------------------------------------------------------
            // Authentifizierung (nur im Zustand Verbunden)
            // -------------------------------------------------------------------
            ClientEvent::Authenticate { token } => {
                if ctx.zustand == VerbindungsZustand::Authentifiziert {
                    return Some(ServerEvent::auth_error("Bereits angemeldet"));
                }
                auth_handler::handle_authenticate(&token, ctx, &self.state).await
            }

            // -------------------------------------------------------------------
            // Keepalive (immer erlaubt)
            // -------------------------------------------------------------------
            ClientEvent::Ping { timestamp_ms } => Some(ServerEvent::Pong { timestamp_ms }),

            ClientEvent::Pong { .. } => {
                // Pong-Antworten vom Client werden nur geloggt (RTT-Messung)
                tracing::trace!(peer = %ctx.peer_addr, "Pong empfangen");
                None
            }

            // -------------------------------------------------------------------
            // Authentifizierung erfordernde Events
            // -------------------------------------------------------------------
            event => {
                let identitaet = match (&ctx.zustand, &ctx.identitaet) {
                    (VerbindungsZustand::Authentifiziert, Some(identitaet)) => identitaet.clone(),
                    _ => {
                        return Some(ServerEvent::auth_error(
                            "Nicht authentifiziert – bitte zuerst anmelden",
                        ));
                    }
                };

                self.dispatch_authentifiziert(event, identitaet, ctx).await
            }
        }
    }

    /// Routet Events die eine Authentifizierung erfordern
    async fn dispatch_authentifiziert(
        &self,
        event: ClientEvent,
        identitaet: Identitaet,
        ctx: &DispatcherContext,
    ) -> Option<ServerEvent> {
        match event {
            // -------------------------------------------------------------------
            // Raum-Events
            // -------------------------------------------------------------------
            ClientEvent::JoinRoom { conversation_id } => {
                room_handler::handle_join_room(conversation_id, &identitaet, ctx, &self.state)
                    .await
            }

            ClientEvent::LeaveRoom { conversation_id } => {
                room_handler::handle_leave_room(conversation_id, ctx, &self.state)
            }

            // -------------------------------------------------------------------
            // Chat-Events
            // -------------------------------------------------------------------
            ClientEvent::SendMessage {
                conversation_id,
                content,
                message_type,
            } => {
                chat_handler::handle_send_message(
                    conversation_id,
                    &content,
                    message_type,
                    &identitaet,
                    &self.state,
                )
                .await
            }

            ClientEvent::Typing {
                conversation_id,
                is_typing,
            } => chat_handler::handle_typing(conversation_id, is_typing, &identitaet, ctx, &self.state),

            ClientEvent::MarkRead { conversation_id } => {
                chat_handler::handle_mark_read(conversation_id, &identitaet, &self.state).await
            }

            // -------------------------------------------------------------------
            // Anruf-Events
            // -------------------------------------------------------------------
            ClientEvent::CallUser {
                receiver_id,
                caller_name,
            } => {
                call_handler::handle_call_user(
                    receiver_id,
                    &caller_name,
                    &identitaet,
                    ctx,
                    &self.state,
                )
                .await
            }

            ClientEvent::AcceptCall { call_id } => {
                call_handler::handle_accept_call(call_id, &identitaet, ctx, &self.state).await
            }

            ClientEvent::RejectCall { call_id } => {
                call_handler::handle_reject_call(call_id, &identitaet, &self.state).await
            }

            ClientEvent::EndCall { call_id } => {
                call_handler::handle_end_call(call_id, &identitaet, &self.state).await
            }

            ClientEvent::Signal { call_id, payload } => {
                call_handler::handle_signal(call_id, payload, ctx, &self.state)
            }

            // Authenticate/Ping/Pong werden oben bereits behandelt
            ClientEvent::Authenticate { .. } | ClientEvent::Ping { .. } | ClientEvent::Pong { .. } => {
                None
            }
        }
    }

    /// Bereinigt alle Ressourcen einer Verbindung beim Trennen
    ///
    /// Reihenfolge: erst lebende Anrufe abraeumen (Gegenstellen werden
    /// benachrichtigt), dann Raum-Mitgliedschaften und Praesenz entfernen,
    /// zuletzt den Offline-Broadcast. Der Praesenz-Eintrag wird nur
    /// entfernt wenn er noch zu dieser Verbindung gehoert.
    pub async fn client_cleanup(&self, ctx: &mut DispatcherContext) {
        ctx.zustand = VerbindungsZustand::Geschlossen;

        let Some(identitaet) = ctx.identitaet.take() else {
            return;
        };
        let user_id = identitaet.user_id;

        call_handler::verbindungs_sweep(&ctx.conn_id, &self.state).await;
        self.state.raeume.ueberall_entfernen(&ctx.conn_id);

        let war_aktuell = self.state.presence.client_entfernen(&user_id, &ctx.conn_id);
        if war_aktuell {
            self.state
                .presence
                .an_alle_senden(ServerEvent::UserOffline { user_id });
        }

        tracing::debug!(user_id = %user_id, peer = %ctx.peer_addr, "Client-Ressourcen bereinigt");
    }
}
