//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task.
//!
//! ## State Machine
//! ```text
//! Verbunden -> Authentifiziert -> Geschlossen
//!     |                              ^
//!     +------------------------------+
//! ```
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Client muss innerhalb von `verbindungs_timeout_sek` irgendein Event senden
//! - Bei Timeout wird die Verbindung getrennt
//!
//! Die Send-Queue dieser Verbindung wird bei der Authentifizierung in der
//! Praesenz-Registry hinterlegt; alles was andere Verbindungen an diesen
//! Client senden, laeuft ueber `sende_rx` in den Framed-Stream.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tandem_auth::TokenVerifier;
use tandem_db::{CallRepository, ConversationRepository, MessageRepository};
use tandem_protocol::events::ServerEvent;
use tandem_protocol::wire::ServerCodec;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use crate::dispatcher::{DispatcherContext, EventDispatcher};
use crate::presence::SEND_QUEUE_GROESSE;
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Liest Frames via `ServerCodec`, dispatcht an den `EventDispatcher` und
/// sendet Antworten zurueck. Laeuft in einem eigenen tokio-Task.
pub struct ClientConnection<R, V>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    state: Arc<SignalingState<R, V>>,
    peer_addr: SocketAddr,
}

impl<R, V> ClientConnection<R, V>
where
    R: ConversationRepository + MessageRepository + CallRepository + 'static,
    V: TokenVerifier + 'static,
{
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState<R, V>>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Diese Methode laeuft bis die Verbindung getrennt wird oder ein
    /// Shutdown-Signal eingeht.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek);
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);

        tracing::info!(peer = %peer_addr, "Neue Verbindung");

        let mut framed = Framed::new(
            stream,
            ServerCodec::with_max_size(self.state.config.max_frame_bytes),
        );

        // Send-Queue dieser Verbindung (Registry/Raeume -> TCP)
        let (sende_tx, mut sende_rx) = mpsc::channel::<ServerEvent>(SEND_QUEUE_GROESSE);

        let mut ctx = DispatcherContext::neu(peer_addr, sende_tx);
        let dispatcher = EventDispatcher::neu(Arc::clone(&self.state));

        // Zeitpunkt des letzten empfangenen Frames
        let mut letzter_empfang = Instant::now();
        // Zeitpunkt des naechsten Ping
        let mut naechster_ping = Instant::now() + keepalive_intervall;

        loop {
            let jetzt = Instant::now();

            // Timeout-Pruefung
            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(peer = %peer_addr, "Verbindungs-Timeout");
                break;
            }

            // Naechsten Ping-Zeitpunkt berechnen
            let ping_verzoegerung = if jetzt < naechster_ping {
                naechster_ping.duration_since(jetzt)
            } else {
                Duration::from_millis(1)
            };

            tokio::select! {
                // Eingehendes Event vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(event)) => {
                            letzter_empfang = Instant::now();

                            if let Some(antwort) = dispatcher.dispatch(event, &mut ctx).await {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::warn!(
                                        peer = %peer_addr,
                                        fehler = %e,
                                        "Senden fehlgeschlagen"
                                    );
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                        None => {
                            // Verbindung geschlossen
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehendes Event aus der Send-Queue
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(
                            peer = %peer_addr,
                            fehler = %e,
                            "Queue-Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if jetzt >= naechster_ping {
                        let ts = std::time::SystemTime::now()
                            .duration_since(std::time::UNIX_EPOCH)
                            .unwrap_or_default()
                            .as_millis() as u64;

                        if let Err(e) = framed.send(ServerEvent::Ping { timestamp_ms: ts }).await {
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "Ping-Senden fehlgeschlagen"
                            );
                            break;
                        }
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende (Anrufe, Raeume, Praesenz)
        dispatcher.client_cleanup(&mut ctx).await;

        tracing::info!(peer = %peer_addr, "Verbindungs-Task beendet");
    }
}
