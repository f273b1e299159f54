//! Token-Verifizierung
//!
//! `TokenVerifier` ist die Naht zum Auth-System: ein Credential rein,
//! eine Identitaet raus. `StaticTokenVerifier` haelt eine feste
//! Token-Tabelle (Konfiguration oder Tests); produktiv steht hier
//! ein JWT-Verifizierer hinter demselben Trait.

use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::types::UserId;

use crate::error::{AuthError, AuthResult};

/// Aufgeloeste Identitaet einer Verbindung
///
/// Unveraenderlich fuer die Lebenszeit der Verbindung nach erfolgreicher
/// Authentifizierung.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identitaet {
    pub user_id: UserId,
    pub anzeige_name: String,
}

/// Verifiziert ein Client-Credential und loest es zu einer Identitaet auf
#[allow(async_fn_in_trait)]
pub trait TokenVerifier: Send + Sync {
    /// Prueft ein Credential; `UngueltigerToken` ist der normale,
    /// wiederholbare Fehlschlag
    async fn pruefen(&self, token: &str) -> AuthResult<Identitaet>;
}

/// Statische Token-Tabelle (Konfiguration / Tests)
#[derive(Clone)]
pub struct StaticTokenVerifier {
    tokens: Arc<DashMap<String, Identitaet>>,
}

impl StaticTokenVerifier {
    /// Erstellt einen leeren Verifizierer
    pub fn neu() -> Self {
        Self {
            tokens: Arc::new(DashMap::new()),
        }
    }

    /// Registriert einen Token fuer eine Identitaet
    pub fn registrieren(&self, token: impl Into<String>, identitaet: Identitaet) {
        self.tokens.insert(token.into(), identitaet);
    }

    /// Anzahl registrierter Tokens
    pub fn anzahl(&self) -> usize {
        self.tokens.len()
    }
}

impl Default for StaticTokenVerifier {
    fn default() -> Self {
        Self::neu()
    }
}

impl TokenVerifier for StaticTokenVerifier {
    async fn pruefen(&self, token: &str) -> AuthResult<Identitaet> {
        match self.tokens.get(token) {
            Some(identitaet) => Ok(identitaet.clone()),
            None => {
                tracing::debug!("Token-Pruefung fehlgeschlagen");
                Err(AuthError::UngueltigerToken)
            }
        }
    }
}
