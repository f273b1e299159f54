//! tandem-server – Bibliotheks-Root
//!
//! Verdrahtet die Crates zum lauffaehigen Server: Konfiguration laden,
//! Token-Tabelle und Datenbank aufbauen, Signaling-Server starten und
//! auf das Shutdown-Signal warten.

pub mod config;

use anyhow::{Context, Result};
use std::sync::Arc;
use tandem_auth::{Identitaet, StaticTokenVerifier};
use tandem_core::types::UserId;
use tandem_db::MemoryDatenbank;
use tandem_signaling::{SignalingServer, SignalingState};

use config::ServerConfig;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Signaling-Server und laeuft bis zum Shutdown-Signal
    pub async fn starten(self) -> Result<()> {
        let bind_addr = self
            .config
            .tcp_bind_adresse()
            .parse()
            .context("Ungueltige Bind-Adresse")?;

        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.config.tcp_bind_adresse(),
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        // Statische Token-Tabelle aus der Konfiguration aufbauen
        let verifier = StaticTokenVerifier::neu();
        for eintrag in &self.config.auth.tokens {
            verifier.registrieren(
                eintrag.token.clone(),
                Identitaet {
                    user_id: UserId(eintrag.user_id),
                    anzeige_name: eintrag.anzeige_name.clone(),
                },
            );
        }
        tracing::info!(tokens = verifier.anzahl(), "Token-Tabelle geladen");

        let db = Arc::new(MemoryDatenbank::neu());
        let state = SignalingState::neu(
            self.config.signaling_config(),
            Arc::new(verifier),
            Arc::clone(&db),
        );

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        // Ctrl-C loest den Shutdown aus
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
            }
        });

        let server = SignalingServer::neu(state, bind_addr);
        server.starten(shutdown_rx).await?;

        tracing::info!("Server beendet");
        Ok(())
    }
}
