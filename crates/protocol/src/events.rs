//! Event-Definitionen (Client <-> Server)
//!
//! Alle Events die ueber die persistente Verbindung ausgetauscht werden.
//! Client-Events tragen keine Absender-Identitaet – die ergibt sich
//! ausschliesslich aus der authentifizierten Verbindung.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tandem_core::types::{CallId, ConversationId, UserId};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Nachrichtentyp
// ---------------------------------------------------------------------------

/// Typ einer Chat-Nachricht auf dem Draht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NachrichtenTyp {
    Text,
    Image,
    Audio,
}

impl Default for NachrichtenTyp {
    fn default() -> Self {
        Self::Text
    }
}

// ---------------------------------------------------------------------------
// Signaling-Payloads
// ---------------------------------------------------------------------------

/// WebRTC-Signaling-Payload, nach `kind` getaggt
///
/// Der Server leitet den Payload unveraendert an die Gegenstelle weiter;
/// inhaltlich interpretiert wird er nur vom Client (SDP/ICE).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalPayload {
    /// SDP-Offer des Initiators
    Offer { sdp: String },
    /// SDP-Answer der Gegenstelle
    Answer { sdp: String },
    /// Einzelner ICE-Kandidat
    IceCandidate {
        candidate: String,
        sdp_mid: Option<String>,
        sdp_m_line_index: Option<u32>,
    },
}

// ---------------------------------------------------------------------------
// Nachrichten-Info (Server -> Client Fan-out)
// ---------------------------------------------------------------------------

/// Eine zugestellte Chat-Nachricht mit serverseitiger ID und Zeitstempel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NachrichtInfo {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub content: String,
    pub message_type: NachrichtenTyp,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Alle Events die ein Client senden darf
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Credential vorlegen; vor Erfolg ist die Verbindung anonym
    Authenticate { token: String },

    /// Einer Konversations-Raum beitreten (Zustellmechanik, keine Autorisierung)
    JoinRoom { conversation_id: ConversationId },
    /// Einen Konversations-Raum verlassen
    LeaveRoom { conversation_id: ConversationId },

    /// Chat-Nachricht senden
    SendMessage {
        conversation_id: ConversationId,
        content: String,
        #[serde(default)]
        message_type: NachrichtenTyp,
    },
    /// Tipp-Indikator setzen/loeschen
    Typing {
        conversation_id: ConversationId,
        is_typing: bool,
    },
    /// Nachrichten der Gegenstelle als gelesen markieren
    MarkRead { conversation_id: ConversationId },

    /// Anruf initiieren
    CallUser {
        receiver_id: UserId,
        caller_name: String,
    },
    /// Klingelnden Anruf annehmen
    AcceptCall { call_id: CallId },
    /// Klingelnden Anruf ablehnen
    RejectCall { call_id: CallId },
    /// Anruf beenden
    EndCall { call_id: CallId },
    /// Signaling-Payload an die Gegenstelle weiterleiten
    Signal {
        call_id: CallId,
        payload: SignalPayload,
    },

    /// Keepalive
    Ping { timestamp_ms: u64 },
    /// Antwort auf Server-Ping
    Pong { timestamp_ms: u64 },
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Alle Events die der Server sendet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Authentifizierung fehlgeschlagen – Verbindung bleibt offen
    AuthError { message: String },
    /// Momentaufnahme aller online Identitaeten (nach erfolgreichem Auth)
    OnlineUsers { users: Vec<UserId> },
    /// Eine Identitaet ist online gegangen
    UserOnline { user_id: UserId },
    /// Eine Identitaet ist offline gegangen
    UserOffline { user_id: UserId },

    /// Neue Nachricht im Raum (Fan-out an alle Raum-Mitglieder)
    NewMessage { message: NachrichtInfo },
    /// Sekundaerer Hinweis fuer den Partner der gerade nicht im Raum ist
    NewNotification {
        conversation_id: ConversationId,
        sender_id: UserId,
        sender_name: String,
        preview: String,
    },
    /// Tipp-Indikator der Gegenstelle
    UserTyping {
        conversation_id: ConversationId,
        user_id: UserId,
        is_typing: bool,
    },
    /// Die Gegenstelle hat die Nachrichten gelesen
    MessagesRead {
        conversation_id: ConversationId,
        by: UserId,
    },
    /// Nachricht konnte nicht zugestellt werden
    MessageError { message: String },

    /// Eingehender Anruf
    IncomingCall {
        call_id: CallId,
        caller_id: UserId,
        caller_name: String,
    },
    /// Bestaetigung an den Anrufer: es klingelt
    CallInitiated {
        call_id: CallId,
        receiver_id: UserId,
    },
    /// Anruf wurde angenommen (an beide Parteien)
    CallAccepted {
        call_id: CallId,
        caller_id: UserId,
        receiver_id: UserId,
    },
    /// Anruf wurde abgelehnt (an den Anrufer)
    CallRejected { call_id: CallId, by: UserId },
    /// Anruf beendet (an beide Parteien, genau einmal)
    CallEnded { call_id: CallId },
    /// Anruf-Operation fehlgeschlagen
    CallError { message: String },
    /// Signaling-Payload der Gegenstelle, unveraendert
    Signal {
        call_id: CallId,
        payload: SignalPayload,
    },

    /// Keepalive
    Ping { timestamp_ms: u64 },
    /// Antwort auf Client-Ping
    Pong { timestamp_ms: u64 },
}

impl ServerEvent {
    /// Erstellt ein AuthError-Event
    pub fn auth_error(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
        }
    }

    /// Erstellt ein CallError-Event
    pub fn call_error(message: impl Into<String>) -> Self {
        Self::CallError {
            message: message.into(),
        }
    }

    /// Erstellt ein MessageError-Event
    pub fn message_error(message: impl Into<String>) -> Self {
        Self::MessageError {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
