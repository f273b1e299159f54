//! tandem-db – Datenzugriffsschicht der Tandem-Plattform
//!
//! Das Repository-Pattern entkoppelt die Geschaeftslogik von der konkreten
//! Persistenz. Dieses Crate definiert die Traits sowie eine In-Memory-
//! Implementierung (`MemoryDatenbank`) fuer Tests und Einzelprozess-Betrieb.
//! Ein SQL-Backend kann spaeter hinter denselben Traits ergaenzt werden.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;

pub use error::{DbError, DbResult};
pub use memory::MemoryDatenbank;
pub use repository::{CallRepository, ConversationRepository, MessageRepository};
