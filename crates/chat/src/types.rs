//! Oeffentliche Typen fuer den Chat-Service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tandem_core::types::{ConversationId, UserId};
use uuid::Uuid;

/// Nachrichtentyp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NachrichtenTyp {
    Text,
    Image,
    Audio,
}

/// Eine persistierte Chat-Nachricht (Domain-Typ, nicht DB-Record)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatNachricht {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub content: String,
    pub message_type: NachrichtenTyp,
    pub created_at: DateTime<Utc>,
}

/// Ergebnis eines erfolgreichen Relays
///
/// `partner` ist die Gegenstelle der Konversation – Empfaenger des
/// sekundaeren `new_notification`-Hinweises falls online aber nicht im Raum.
#[derive(Debug, Clone)]
pub struct ZugestellteNachricht {
    pub nachricht: ChatNachricht,
    pub partner: UserId,
}
