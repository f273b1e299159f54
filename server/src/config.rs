//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use tandem_signaling::SignalingConfig;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Verbindungs-Einstellungen (Keepalive, Timeouts)
    pub verbindung: VerbindungsEinstellungen,
    /// Anruf-Einstellungen
    pub anrufe: AnrufEinstellungen,
    /// Auth-Einstellungen (statische Token-Tabelle)
    pub auth: AuthEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Clients
    pub max_clients: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Tandem Server".into(),
            max_clients: 512,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer die TCP-Verbindung
    pub bind_adresse: String,
    /// Port fuer die TCP-Verbindung
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 9400,
        }
    }
}

/// Verbindungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbindungsEinstellungen {
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub timeout_sek: u64,
    /// Maximale Frame-Groesse in Kilobyte
    pub max_frame_kb: usize,
}

impl Default for VerbindungsEinstellungen {
    fn default() -> Self {
        Self {
            keepalive_sek: 30,
            timeout_sek: 90,
            max_frame_kb: 256,
        }
    }
}

/// Anruf-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnrufEinstellungen {
    /// Klingelfrist fuer unbeantwortete Anrufe in Sekunden (0 = keine Frist)
    pub klingel_timeout_sek: u64,
}

impl Default for AnrufEinstellungen {
    fn default() -> Self {
        Self {
            klingel_timeout_sek: 60,
        }
    }
}

/// Auth-Einstellungen
///
/// Die statische Token-Tabelle ist fuer Entwicklung und Tests gedacht;
/// produktiv steht hinter demselben Trait ein externer Verifizierer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEinstellungen {
    /// Statisch konfigurierte Tokens
    pub tokens: Vec<TokenEintrag>,
}

/// Ein statisch konfigurierter Token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEintrag {
    /// Das Credential das der Client vorlegt
    pub token: String,
    /// Benutzer-ID des Eintrags
    pub user_id: uuid::Uuid,
    /// Anzeigename des Benutzers
    pub anzeige_name: String,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Baut die Signaling-Konfiguration aus den Server-Einstellungen
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            max_clients: self.server.max_clients,
            keepalive_sek: self.verbindung.keepalive_sek,
            verbindungs_timeout_sek: self.verbindung.timeout_sek,
            klingel_timeout_sek: self.anrufe.klingel_timeout_sek,
            max_frame_bytes: self.verbindung.max_frame_kb * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server.max_clients, 512);
        assert_eq!(cfg.netzwerk.tcp_port, 9400);
        assert_eq!(cfg.anrufe.klingel_timeout_sek, 60);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.auth.tokens.is_empty());
    }

    #[test]
    fn bind_adresse() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.tcp_bind_adresse(), "0.0.0.0:9400");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            name = "Mein Tandem"
            max_clients = 100

            [netzwerk]
            tcp_port = 10000

            [[auth.tokens]]
            token = "geheim"
            user_id = "6f8d57cc-1db5-4b5a-b8a9-5b0b75a0a3d3"
            anzeige_name = "Ana"
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.name, "Mein Tandem");
        assert_eq!(cfg.server.max_clients, 100);
        assert_eq!(cfg.netzwerk.tcp_port, 10000);
        assert_eq!(cfg.auth.tokens.len(), 1);
        assert_eq!(cfg.auth.tokens[0].anzeige_name, "Ana");
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.verbindung.keepalive_sek, 30);
    }

    #[test]
    fn signaling_config_uebernimmt_werte() {
        let mut cfg = ServerConfig::default();
        cfg.verbindung.max_frame_kb = 64;
        cfg.anrufe.klingel_timeout_sek = 10;

        let sig = cfg.signaling_config();
        assert_eq!(sig.max_frame_bytes, 64 * 1024);
        assert_eq!(sig.klingel_timeout_sek, 10);
        assert_eq!(sig.max_clients, 512);
    }
}
