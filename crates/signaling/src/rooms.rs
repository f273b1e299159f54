//! Raum-Verwaltung – Mitgliedschaft von Verbindungen in Konversations-Raeumen
//!
//! Ein Raum ist die ephemere Zustell-Liste einer Konversation: alle
//! Verbindungen die Nachrichten dieser Konversation live empfangen sollen.
//! Mitglied ist immer eine konkrete Verbindung, nicht der Benutzer – so
//! raeumt der Abbau einer veralteten Verbindung nie die Mitgliedschaft
//! einer Nachfolger-Verbindung ab.

use crate::presence::ClientSender;
use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::types::{ConnectionId, ConversationId};
use tandem_protocol::events::ServerEvent;

// ---------------------------------------------------------------------------
// RoomManager
// ---------------------------------------------------------------------------

/// Verwaltet die Raum-Mitgliedschaft aller Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct RoomManager {
    inner: Arc<RoomManagerInner>,
}

struct RoomManagerInner {
    /// Konversation -> Mitglieds-Verbindungen
    raeume: DashMap<ConversationId, Vec<ClientSender>>,
}

impl RoomManager {
    /// Erstellt einen neuen RoomManager
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(RoomManagerInner {
                raeume: DashMap::new(),
            }),
        }
    }

    /// Fuegt eine Verbindung einem Raum hinzu
    ///
    /// Idempotent pro Verbindung: ein erneuter Beitritt derselben
    /// Verbindung veraendert den Raum nicht.
    pub fn beitreten(&self, raum: ConversationId, sender: ClientSender) {
        let mut mitglieder = self.inner.raeume.entry(raum).or_default();
        if mitglieder.iter().any(|m| m.conn_id == sender.conn_id) {
            return;
        }
        tracing::debug!(raum = %raum, user_id = %sender.user_id, "Raum beigetreten");
        mitglieder.push(sender);
    }

    /// Entfernt eine Verbindung aus einem Raum
    pub fn verlassen(&self, raum: &ConversationId, conn_id: &ConnectionId) {
        if let Some(mut mitglieder) = self.inner.raeume.get_mut(raum) {
            mitglieder.retain(|m| m.conn_id != *conn_id);
            let ist_leer = mitglieder.is_empty();
            drop(mitglieder);
            if ist_leer {
                self.inner.raeume.remove(raum);
            }
        }
    }

    /// Entfernt eine Verbindung aus allen Raeumen (Verbindungsabbau)
    pub fn ueberall_entfernen(&self, conn_id: &ConnectionId) {
        self.inner.raeume.iter_mut().for_each(|mut entry| {
            entry.value_mut().retain(|m| m.conn_id != *conn_id);
        });
        // Leere Raum-Eintraege aufraumen
        self.inner.raeume.retain(|_, mitglieder| !mitglieder.is_empty());
    }

    /// Prueft ob eine Verbindung Mitglied eines Raums ist
    pub fn ist_mitglied(&self, raum: &ConversationId, conn_id: &ConnectionId) -> bool {
        self.inner
            .raeume
            .get(raum)
            .map(|mitglieder| mitglieder.iter().any(|m| m.conn_id == *conn_id))
            .unwrap_or(false)
    }

    /// Gibt die Mitglieds-Verbindungen eines Raums zurueck
    pub fn mitglieder(&self, raum: &ConversationId) -> Vec<ClientSender> {
        self.inner
            .raeume
            .get(raum)
            .map(|mitglieder| mitglieder.clone())
            .unwrap_or_default()
    }

    /// Gibt die Anzahl der Raeume mit mindestens einem Mitglied zurueck
    pub fn raum_anzahl(&self) -> usize {
        self.inner.raeume.len()
    }

    /// Sendet ein Event an alle Mitglieder eines Raums
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_raum_senden(&self, raum: &ConversationId, event: ServerEvent) -> usize {
        let mitglieder = self.mitglieder(raum);
        let mut gesendet = 0;
        for mitglied in &mitglieder {
            if mitglied.senden(event.clone()) {
                gesendet += 1;
            }
        }
        gesendet
    }

    /// Sendet ein Event an alle Mitglieder eines Raums ausser einer Verbindung
    ///
    /// Nuetzlich fuer Tipp-Indikatoren, die der Ausloeser nicht zurueckbekommt.
    pub fn an_raum_ausser_senden(
        &self,
        raum: &ConversationId,
        ausgeschlossen: &ConnectionId,
        event: ServerEvent,
    ) -> usize {
        let mitglieder = self.mitglieder(raum);
        let mut gesendet = 0;
        for mitglied in &mitglieder {
            if mitglied.conn_id == *ausgeschlossen {
                continue;
            }
            if mitglied.senden(event.clone()) {
                gesendet += 1;
            }
        }
        gesendet
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::SEND_QUEUE_GROESSE;
    use tandem_core::types::UserId;
    use tokio::sync::mpsc;

    fn test_sender(user_id: UserId) -> (ClientSender, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        (
            ClientSender {
                conn_id: ConnectionId::new(),
                user_id,
                tx,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn beitreten_und_senden() {
        let rooms = RoomManager::neu();
        let raum = ConversationId::new();
        let (s1, mut rx1) = test_sender(UserId::new());
        let (s2, mut rx2) = test_sender(UserId::new());

        rooms.beitreten(raum, s1);
        rooms.beitreten(raum, s2);
        assert_eq!(rooms.mitglieder(&raum).len(), 2);

        let gesendet = rooms.an_raum_senden(&raum, ServerEvent::Ping { timestamp_ms: 1 });
        assert_eq!(gesendet, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn beitritt_ist_idempotent() {
        let rooms = RoomManager::neu();
        let raum = ConversationId::new();
        let (sender, _rx) = test_sender(UserId::new());

        rooms.beitreten(raum, sender.clone());
        rooms.beitreten(raum, sender);
        assert_eq!(rooms.mitglieder(&raum).len(), 1);
    }

    #[tokio::test]
    async fn ausser_senden_schliesst_ausloeser_aus() {
        let rooms = RoomManager::neu();
        let raum = ConversationId::new();
        let (s1, mut rx1) = test_sender(UserId::new());
        let conn1 = s1.conn_id;
        let (s2, mut rx2) = test_sender(UserId::new());

        rooms.beitreten(raum, s1);
        rooms.beitreten(raum, s2);

        rooms.an_raum_ausser_senden(&raum, &conn1, ServerEvent::Ping { timestamp_ms: 2 });
        assert!(rx1.try_recv().is_err(), "Ausloeser darf nichts empfangen");
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn ueberall_entfernen_bereinigt_alle_raeume() {
        let rooms = RoomManager::neu();
        let raum_a = ConversationId::new();
        let raum_b = ConversationId::new();
        let (sender, _rx) = test_sender(UserId::new());
        let conn = sender.conn_id;

        rooms.beitreten(raum_a, sender.clone());
        rooms.beitreten(raum_b, sender);
        assert_eq!(rooms.raum_anzahl(), 2);

        rooms.ueberall_entfernen(&conn);
        assert_eq!(rooms.raum_anzahl(), 0);
        assert!(!rooms.ist_mitglied(&raum_a, &conn));
    }

    #[tokio::test]
    async fn verlassen_entfernt_nur_eine_verbindung() {
        let rooms = RoomManager::neu();
        let raum = ConversationId::new();
        let (s1, _rx1) = test_sender(UserId::new());
        let conn1 = s1.conn_id;
        let (s2, _rx2) = test_sender(UserId::new());

        rooms.beitreten(raum, s1);
        rooms.beitreten(raum, s2);

        rooms.verlassen(&raum, &conn1);
        assert_eq!(rooms.mitglieder(&raum).len(), 1);
        assert!(!rooms.ist_mitglied(&raum, &conn1));
    }
}
