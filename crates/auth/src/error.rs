//! Fehlertypen fuer das Auth-Crate

use thiserror::Error;

/// Auth-Fehlertypen
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token unbekannt oder abgelaufen – Client darf erneut versuchen
    #[error("Ungueltiger Token")]
    UngueltigerToken,

    #[error("Interner Fehler: {0}")]
    Intern(String),
}

pub type AuthResult<T> = Result<T, AuthError>;
