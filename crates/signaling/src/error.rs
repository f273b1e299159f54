//! Fehlertypen fuer den Signaling-Service

use tandem_auth::AuthError;
use tandem_chat::ChatError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Authentifizierungsfehler
    #[error("Authentifizierungsfehler: {0}")]
    Auth(#[from] AuthError),

    /// Operation erfordert eine authentifizierte Verbindung
    #[error("Nicht authentifiziert")]
    NichtAuthentifiziert,

    /// Zielbenutzer ist nicht erreichbar (offline)
    #[error("Benutzer offline: {0}")]
    ZielOffline(String),

    /// Kein lebender Anruf mit dieser ID
    #[error("Anruf nicht gefunden: {0}")]
    AnrufNichtGefunden(String),

    /// Anruf ist nicht (mehr) im erwarteten Zustand
    #[error("Ungueltiger Anrufzustand: {0}")]
    UngueltigerAnrufZustand(String),

    /// Absender ist keine der beiden Anruf-Parteien
    #[error("Nicht berechtigt: {0}")]
    NichtBerechtigt(String),

    /// Zwischen diesem Paar laeuft bereits ein Anruf
    #[error("Zwischen den Teilnehmern laeuft bereits ein Anruf")]
    PaarBelegt,

    /// Diese Verbindung hat bereits einen ausgehenden Klingelversuch
    #[error("Es klingelt bereits ein ausgehender Anruf")]
    AnrufBereitsAusgehend,

    /// Fehler aus dem Chat-Service (Autorisierung, Validierung, Persistenz)
    #[error("Chat-Fehler: {0}")]
    Chat(#[from] ChatError),

    /// Persistenzfehler
    #[error("Datenbankfehler: {0}")]
    Datenbank(#[from] tandem_db::DbError),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SignalingError {
    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
