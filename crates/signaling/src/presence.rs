//! Praesenz-Registry – Verwaltet welche Benutzer gerade verbunden sind
//!
//! Bildet jede Benutzer-Identitaet auf ihre aktuell lebende Verbindung ab.
//! Pro Benutzer existiert hoechstens ein Eintrag: meldet sich dieselbe
//! Identitaet ueber eine neue Verbindung an, ersetzt diese den alten Eintrag
//! (letzter Schreiber gewinnt). Die alte Verbindung wird dadurch fuer
//! gezielte Zustellungen unerreichbar.
//!
//! ## Selektives Senden
//! - An einen Benutzer: `an_user_senden`
//! - An alle: `an_alle_senden`
//! - An alle ausser eine Verbindung: `an_alle_ausser_senden`

use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::types::{ConnectionId, UserId};
use tandem_protocol::events::ServerEvent;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Client
pub const SEND_QUEUE_GROESSE: usize = 64;

/// Handle auf die Send-Queue einer verbundenen Client-Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub conn_id: ConnectionId,
    pub user_id: UserId,
    pub tx: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    /// Sendet ein Event nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, event: ServerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(user_id = %self.user_id, "Send-Queue voll – Event verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(user_id = %self.user_id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PresenceRegistry
// ---------------------------------------------------------------------------

/// Verwaltet die Zuordnung Benutzer -> lebende Verbindung
///
/// Thread-safe via Arc + DashMap. Clone der Registry teilt den inneren Zustand.
#[derive(Clone)]
pub struct PresenceRegistry {
    inner: Arc<PresenceRegistryInner>,
}

struct PresenceRegistryInner {
    /// Online-Benutzer, indiziert nach UserId
    clients: DashMap<UserId, ClientSender>,
}

impl PresenceRegistry {
    /// Erstellt eine neue PresenceRegistry
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(PresenceRegistryInner {
                clients: DashMap::new(),
            }),
        }
    }

    /// Registriert eine Verbindung fuer einen Benutzer
    ///
    /// Ein bereits vorhandener Eintrag derselben Identitaet wird ersetzt.
    pub fn client_registrieren(&self, sender: ClientSender) {
        let user_id = sender.user_id;
        if let Some(alt) = self.inner.clients.insert(user_id, sender) {
            tracing::info!(
                user_id = %user_id,
                alte_conn = %alt.conn_id,
                "Praesenz ersetzt – neue Verbindung uebernimmt"
            );
        } else {
            tracing::info!(user_id = %user_id, "Benutzer online");
        }
    }

    /// Entfernt den Eintrag eines Benutzers, aber nur wenn er noch zur
    /// angegebenen Verbindung gehoert
    ///
    /// Der Abbau einer veralteten Verbindung darf den Eintrag einer
    /// Nachfolger-Verbindung nicht loeschen. Gibt `true` zurueck wenn
    /// tatsaechlich entfernt wurde.
    pub fn client_entfernen(&self, user_id: &UserId, conn_id: &ConnectionId) -> bool {
        let entfernt = self
            .inner
            .clients
            .remove_if(user_id, |_, sender| sender.conn_id == *conn_id)
            .is_some();
        if entfernt {
            tracing::info!(user_id = %user_id, "Benutzer offline");
        } else {
            tracing::debug!(
                user_id = %user_id,
                conn_id = %conn_id,
                "Praesenz-Entfernung uebersprungen (Verbindung nicht mehr aktuell)"
            );
        }
        entfernt
    }

    /// Gibt den Sender-Handle eines Benutzers zurueck
    pub fn sender_von(&self, user_id: &UserId) -> Option<ClientSender> {
        self.inner.clients.get(user_id).map(|e| e.clone())
    }

    /// Prueft ob ein Benutzer online ist
    pub fn ist_online(&self, user_id: &UserId) -> bool {
        self.inner.clients.contains_key(user_id)
    }

    /// Gibt alle Online-Benutzer-IDs zurueck
    pub fn online_ids(&self) -> Vec<UserId> {
        self.inner.clients.iter().map(|e| *e.key()).collect()
    }

    /// Gibt die Anzahl der Online-Benutzer zurueck
    pub fn online_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Sendet ein Event an einen einzelnen Benutzer
    ///
    /// Gibt `true` zurueck wenn der Benutzer online ist und das Event
    /// eingereiht wurde.
    pub fn an_user_senden(&self, user_id: &UserId, event: ServerEvent) -> bool {
        match self.inner.clients.get(user_id) {
            Some(sender) => sender.senden(event),
            None => {
                tracing::debug!(user_id = %user_id, "Senden an Offline-Benutzer verworfen");
                false
            }
        }
    }

    /// Sendet ein Event an alle Online-Benutzer
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_alle_senden(&self, event: ServerEvent) -> usize {
        let mut gesendet = 0;
        self.inner.clients.iter().for_each(|entry| {
            if entry.value().senden(event.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Sendet ein Event an alle Online-Benutzer ausser einer Verbindung
    pub fn an_alle_ausser_senden(&self, ausgeschlossen: &ConnectionId, event: ServerEvent) -> usize {
        let mut gesendet = 0;
        self.inner.clients.iter().for_each(|entry| {
            if entry.value().conn_id == *ausgeschlossen {
                return;
            }
            if entry.value().senden(event.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
