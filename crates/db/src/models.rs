//! Datensatz-Typen fuer die Repositories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tandem_core::types::{CallId, ConversationId, UserId};

/// Nachrichtentyp
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

/// Status eines Anruf-Datensatzes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnrufStatus {
    Klingelt,
    Angenommen,
    Abgelehnt,
    Beendet,
}

/// Datensatz fuer eine Konversation (genau zwei Teilnehmer)
#[derive(Debug, Clone)]
pub struct KonversationRecord {
    pub id: ConversationId,
    pub teilnehmer_a: UserId,
    pub teilnehmer_b: UserId,
    pub erstellt_am: DateTime<Utc>,
}

impl KonversationRecord {
    /// Prueft ob ein Benutzer Teilnehmer dieser Konversation ist
    pub fn hat_teilnehmer(&self, user_id: &UserId) -> bool {
        self.teilnehmer_a == *user_id || self.teilnehmer_b == *user_id
    }

    /// Gibt den jeweils anderen Teilnehmer zurueck
    pub fn partner_von(&self, user_id: &UserId) -> Option<UserId> {
        if self.teilnehmer_a == *user_id {
            Some(self.teilnehmer_b)
        } else if self.teilnehmer_b == *user_id {
            Some(self.teilnehmer_a)
        } else {
            None
        }
    }
}

/// Datensatz fuer eine gespeicherte Chat-Nachricht
#[derive(Debug, Clone)]
pub struct NachrichtRecord {
    pub id: uuid::Uuid,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub message_type: NachrichtenTyp,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Eingabedaten fuer eine neue Nachricht (ID und Zeitstempel vergibt das Repository)
#[derive(Debug, Clone)]
pub struct NeueNachricht {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub message_type: NachrichtenTyp,
}

/// Datensatz fuer einen Anruf
#[derive(Debug, Clone)]
pub struct AnrufRecord {
    pub id: CallId,
    pub anrufer_id: UserId,
    pub angerufener_id: UserId,
    pub status: AnrufStatus,
    pub begonnen_am: Option<DateTime<Utc>>,
    pub beendet_am: Option<DateTime<Utc>>,
    pub erstellt_am: DateTime<Utc>,
}

/// Teilaktualisierung eines Anruf-Datensatzes
#[derive(Debug, Clone, Default)]
pub struct AnrufUpdate {
    pub status: Option<AnrufStatus>,
    pub begonnen_am: Option<DateTime<Utc>>,
    pub beendet_am: Option<DateTime<Utc>>,
}

impl AnrufUpdate {
    /// Update fuer einen angenommenen Anruf (Status + Startzeitpunkt)
    pub fn angenommen(jetzt: DateTime<Utc>) -> Self {
        Self {
            status: Some(AnrufStatus::Angenommen),
            begonnen_am: Some(jetzt),
            beendet_am: None,
        }
    }

    /// Update fuer einen abgeschlossenen Anruf (terminaler Status + Endzeitpunkt)
    pub fn abgeschlossen(status: AnrufStatus, jetzt: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            begonnen_am: None,
            beendet_am: Some(jetzt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partner_von_beiden_seiten() {
        let a = UserId::new();
        let b = UserId::new();
        let konv = KonversationRecord {
            id: ConversationId::new(),
            teilnehmer_a: a,
            teilnehmer_b: b,
            erstellt_am: Utc::now(),
        };

        assert_eq!(konv.partner_von(&a), Some(b));
        assert_eq!(konv.partner_von(&b), Some(a));
        assert_eq!(konv.partner_von(&UserId::new()), None);
    }

    #[test]
    fn nachrichtentyp_serde_werte() {
        assert_eq!(
            serde_json::to_string(&NachrichtenTyp::Text).unwrap(),
            "\"text\""
        );
        assert_eq!(
            serde_json::to_string(&NachrichtenTyp::Image).unwrap(),
            "\"image\""
        );
    }
}
