//! tandem-signaling – Echtzeit-Session-Koordination
//!
//! Dieser Crate implementiert den Koordinations-Kern der Tandem-Plattform:
//! persistente TCP-Verbindungen, Praesenz, Konversations-Raeume,
//! Nachrichten-Relay und die Zustandsmaschine fuer 1:1-Anrufe mit
//! WebRTC-Signal-Relay.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  State Machine: Verbunden -> Authentifiziert -> Geschlossen
//!     |
//!     v
//! EventDispatcher
//!     |
//!     +-- AuthHandler  (Authenticate, Auto-Join, Online-Broadcast)
//!     +-- RoomHandler  (JoinRoom, LeaveRoom)
//!     +-- ChatHandler  (SendMessage, Typing, MarkRead)
//!     +-- CallHandler  (CallUser, Accept, Reject, End, Signal)
//!
//! PresenceRegistry – Benutzer -> lebende Verbindung
//! RoomManager      – Zustell-Listen pro Konversation
//! CallManager      – lebende Anruf-Sessions
//! ```

pub mod calls;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod presence;
pub mod rooms;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use calls::{CallManager, CallSession, CallStatus};
pub use connection::ClientConnection;
pub use dispatcher::{DispatcherContext, EventDispatcher, VerbindungsZustand};
pub use error::{SignalingError, SignalingResult};
pub use presence::{ClientSender, PresenceRegistry};
pub use rooms::RoomManager;
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
