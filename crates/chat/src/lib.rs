//! tandem-chat – Nachrichten-Relay der Tandem-Plattform
//!
//! Dieses Crate implementiert die Validierungs- und Persistenzseite des
//! Nachrichtenversands:
//! - Autorisierung gegen die Konversations-Tabelle (niemals gegen die
//!   Socket-Raum-Mitgliedschaft – die ist reine Zustellmechanik)
//! - Persistenz vor Fan-out: ohne erfolgreiche Speicherung wird kein
//!   Event emittiert
//! - Gelesen-Markierung und Konversations-Aufloesung fuer den Auto-Join
//!
//! Der eigentliche Fan-out an Raum-Mitglieder passiert im Signaling-Crate.

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use error::{ChatError, ChatResult};
pub use service::ChatService;
pub use types::{ChatNachricht, NachrichtenTyp, ZugestellteNachricht};
