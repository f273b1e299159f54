//! tandem-core – Gemeinsame Typen fuer die Tandem-Plattform
//!
//! Enthaelt die Newtype-IDs, die von allen anderen Crates geteilt werden.
//! Bewusst abhaengigkeitsarm gehalten; Fehlertypen definieren die Crates,
//! in denen die Fehler entstehen.

pub mod types;
