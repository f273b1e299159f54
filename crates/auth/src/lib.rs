//! tandem-auth – Authentifizierungs-Kollaborateur
//!
//! Der Echtzeit-Kern behandelt Credentials als opak: `TokenVerifier`
//! bildet ein Credential auf eine Identitaet ab oder schlaegt fehl.
//! JWT-Validierung, Passwort-Hashing etc. liegen hinter dieser Naht
//! und gehoeren nicht zu diesem Kern.

pub mod error;
pub mod service;

pub use error::{AuthError, AuthResult};
pub use service::{Identitaet, StaticTokenVerifier, TokenVerifier};
