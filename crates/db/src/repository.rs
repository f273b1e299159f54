//! Repository-Trait-Definitionen
//!
//! Die Traits verwenden `async fn` ohne Send-Garantie (async_fn_in_trait);
//! alle Verbindungs-Tasks laufen deshalb in einer tokio `LocalSet`
//! (siehe tandem-signaling::tcp).

use tandem_core::types::{CallId, ConversationId, UserId};

use crate::error::DbResult;
use crate::models::{AnrufRecord, AnrufUpdate, KonversationRecord, NachrichtRecord, NeueNachricht};

/// Repository fuer Konversationen
///
/// Konversationen selbst werden ueber die (nicht zu diesem Kern gehoerende)
/// CRUD-Schicht angelegt; dieser Kern liest sie nur fuer Autorisierung und
/// Auto-Join.
#[allow(async_fn_in_trait)]
pub trait ConversationRepository: Send + Sync {
    /// Laedt eine Konversation anhand ihrer ID
    async fn laden(&self, id: ConversationId) -> DbResult<Option<KonversationRecord>>;

    /// Laedt alle Konversationen an denen ein Benutzer teilnimmt
    async fn fuer_benutzer(&self, user_id: UserId) -> DbResult<Vec<KonversationRecord>>;

    /// Legt eine neue Konversation zwischen zwei Benutzern an
    async fn erstellen(&self, a: UserId, b: UserId) -> DbResult<KonversationRecord>;
}

/// Repository fuer Chat-Nachrichten
#[allow(async_fn_in_trait)]
pub trait MessageRepository: Send + Sync {
    /// Persistiert eine neue Nachricht; vergibt ID und Server-Zeitstempel
    async fn nachricht_erstellen(&self, neu: NeueNachricht) -> DbResult<NachrichtRecord>;

    /// Markiert alle ungelesenen Nachrichten eines Absenders in einer
    /// Konversation als gelesen; gibt die Anzahl der Aenderungen zurueck
    async fn als_gelesen_markieren(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
    ) -> DbResult<u64>;
}

/// Repository fuer Anruf-Datensaetze
#[allow(async_fn_in_trait)]
pub trait CallRepository: Send + Sync {
    /// Legt einen neuen Anruf-Datensatz im Status `Klingelt` an
    ///
    /// Die CallId wird vom Repository vergeben (serverseitig, kollisionsfest)
    /// und ist fuer alle nachfolgenden Signaling-Nachrichten massgeblich.
    async fn anruf_erstellen(&self, anrufer: UserId, angerufener: UserId)
        -> DbResult<AnrufRecord>;

    /// Aktualisiert Status und Zeitstempel eines Anrufs
    ///
    /// Gibt `false` zurueck wenn kein Datensatz mit dieser ID existiert.
    async fn anruf_aktualisieren(&self, id: CallId, update: AnrufUpdate) -> DbResult<bool>;
}
