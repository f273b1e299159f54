//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt alle geteilten Services und Zustands-Manager als Arc-Referenzen,
//! die sicher zwischen tokio-Tasks geteilt werden koennen.

use std::sync::Arc;
use tandem_auth::TokenVerifier;
use tandem_chat::ChatService;
use tandem_db::{CallRepository, ConversationRepository, MessageRepository};
use tandem_protocol::wire::DEFAULT_MAX_FRAME_SIZE;

use crate::calls::CallManager;
use crate::presence::PresenceRegistry;
use crate::rooms::RoomManager;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale Clients
    pub max_clients: u32,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Klingelfrist fuer unbeantwortete Anrufe in Sekunden (0 = keine Frist)
    pub klingel_timeout_sek: u64,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_bytes: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_clients: 512,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            klingel_timeout_sek: 60,
            max_frame_bytes: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
///
/// Alle Services sind als Arc gehalten. Clone gibt eine Referenz auf
/// denselben inneren Zustand.
pub struct SignalingState<R, V>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Token-Verifizierer (Credential -> Identitaet)
    pub verifier: Arc<V>,
    /// Datenbank-Zugriff (Konversationen, Nachrichten, Anrufe)
    pub db: Arc<R>,
    /// Chat-Service (Validierung, Autorisierung, Persistenz)
    pub chat_service: Arc<ChatService<R>>,
    /// Praesenz-Registry (Wer ist online, ueber welche Verbindung)
    pub presence: PresenceRegistry,
    /// Raum-Verwaltung (Zustell-Listen pro Konversation)
    pub raeume: RoomManager,
    /// Anruf-Verwaltung (lebende Anruf-Sessions)
    pub anrufe: CallManager,
}

impl<R, V> SignalingState<R, V>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, verifier: Arc<V>, db: Arc<R>) -> Arc<Self> {
        let chat_service = ChatService::neu(Arc::clone(&db));
        Arc::new(Self {
            config: Arc::new(config),
            verifier,
            db,
            chat_service,
            presence: PresenceRegistry::neu(),
            raeume: RoomManager::neu(),
            anrufe: CallManager::neu(),
        })
    }
}
