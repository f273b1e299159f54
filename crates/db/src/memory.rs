//! In-Memory-Implementierung der Repositories
//!
//! Thread-safe via DashMap; dient als Standard-Backend fuer Tests und
//! Einzelprozess-Betrieb. Kein Durability-Anspruch – die Traits sind die
//! Schnittstelle hinter der spaeter ein SQL-Backend stehen kann.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::types::{CallId, ConversationId, UserId};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::{
    AnrufRecord, AnrufStatus, AnrufUpdate, KonversationRecord, NachrichtRecord, NeueNachricht,
};
use crate::repository::{CallRepository, ConversationRepository, MessageRepository};

/// In-Memory-Datenbank fuer alle drei Repositories
///
/// Clone teilt den inneren Zustand (Arc).
#[derive(Clone)]
pub struct MemoryDatenbank {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    konversationen: DashMap<ConversationId, KonversationRecord>,
    nachrichten: DashMap<Uuid, NachrichtRecord>,
    anrufe: DashMap<CallId, AnrufRecord>,
}

impl MemoryDatenbank {
    /// Erstellt eine neue, leere In-Memory-Datenbank
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                konversationen: DashMap::new(),
                nachrichten: DashMap::new(),
                anrufe: DashMap::new(),
            }),
        }
    }

    /// Gibt einen gespeicherten Anruf-Datensatz zurueck (fuer Tests)
    pub fn anruf_laden(&self, id: CallId) -> Option<AnrufRecord> {
        self.inner.anrufe.get(&id).map(|e| e.clone())
    }

    /// Gibt eine gespeicherte Nachricht zurueck (fuer Tests)
    pub fn nachricht_laden(&self, id: Uuid) -> Option<NachrichtRecord> {
        self.inner.nachrichten.get(&id).map(|e| e.clone())
    }

    /// Anzahl gespeicherter Nachrichten
    pub fn nachrichten_anzahl(&self) -> usize {
        self.inner.nachrichten.len()
    }
}

impl Default for MemoryDatenbank {
    fn default() -> Self {
        Self::neu()
    }
}

impl ConversationRepository for MemoryDatenbank {
    async fn laden(&self, id: ConversationId) -> DbResult<Option<KonversationRecord>> {
        Ok(self.inner.konversationen.get(&id).map(|e| e.clone()))
    }

    async fn fuer_benutzer(&self, user_id: UserId) -> DbResult<Vec<KonversationRecord>> {
        Ok(self
            .inner
            .konversationen
            .iter()
            .filter(|e| e.value().hat_teilnehmer(&user_id))
            .map(|e| e.value().clone())
            .collect())
    }

    async fn erstellen(&self, a: UserId, b: UserId) -> DbResult<KonversationRecord> {
        let record = KonversationRecord {
            id: ConversationId::new(),
            teilnehmer_a: a,
            teilnehmer_b: b,
            erstellt_am: Utc::now(),
        };
        self.inner.konversationen.insert(record.id, record.clone());
        tracing::debug!(conversation_id = %record.id, "Konversation angelegt");
        Ok(record)
    }
}

impl MessageRepository for MemoryDatenbank {
    async fn nachricht_erstellen(&self, neu: NeueNachricht) -> DbResult<NachrichtRecord> {
        let record = NachrichtRecord {
            id: Uuid::new_v4(),
            conversation_id: neu.conversation_id,
            sender_id: neu.sender_id,
            content: neu.content,
            message_type: neu.message_type,
            is_read: false,
            created_at: Utc::now(),
        };
        self.inner.nachrichten.insert(record.id, record.clone());
        Ok(record)
    }

    async fn als_gelesen_markieren(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
    ) -> DbResult<u64> {
        let mut geaendert = 0u64;
        for mut entry in self.inner.nachrichten.iter_mut() {
            let n = entry.value_mut();
            if n.conversation_id == conversation_id && n.sender_id == sender_id && !n.is_read {
                n.is_read = true;
                geaendert += 1;
            }
        }
        Ok(geaendert)
    }
}

impl CallRepository for MemoryDatenbank {
    async fn anruf_erstellen(
        &self,
        anrufer: UserId,
        angerufener: UserId,
    ) -> DbResult<AnrufRecord> {
        let record = AnrufRecord {
            id: CallId::new(),
            anrufer_id: anrufer,
            angerufener_id: angerufener,
            status: AnrufStatus::Klingelt,
            begonnen_am: None,
            beendet_am: None,
            erstellt_am: Utc::now(),
        };
        self.inner.anrufe.insert(record.id, record.clone());
        Ok(record)
    }

    async fn anruf_aktualisieren(&self, id: CallId, update: AnrufUpdate) -> DbResult<bool> {
        match self.inner.anrufe.get_mut(&id) {
            Some(mut entry) => {
                let record = entry.value_mut();
                if let Some(status) = update.status {
                    record.status = status;
                }
                if let Some(begonnen) = update.begonnen_am {
                    record.begonnen_am = Some(begonnen);
                }
                if let Some(beendet) = update.beendet_am {
                    record.beendet_am = Some(beendet);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
