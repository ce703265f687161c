//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede WebSocket-Verbindung bekommt eine `ClientConnection` in einem
//! eigenen tokio-Task. Die Verbindung registriert sich beim Start als neue
//! Session und meldet sich beim Ende in jedem Fall wieder ab.
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen WebSocket-Ping
//! - Kommt innerhalb von `verbindungs_timeout_sek` kein Frame, wird getrennt

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use treffpunkt_core::SessionId;
use treffpunkt_protocol::{AusgehendesEvent, FrameCodec, ProtokollFehler};

use crate::dispatcher::{fehler_event, protokoll_fehler_event, MessageDispatcher};
use crate::error::{RelayError, RelayResult};
use crate::server_state::RelayState;

/// Close-Code "Going Away" beim Server-Shutdown
const CLOSE_GOING_AWAY: u16 = 1001;
/// Close-Code "Try Again Later" wenn der Server voll ist
const CLOSE_TRY_AGAIN_LATER: u16 = 1013;

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    state: Arc<RelayState>,
    peer_addr: SocketAddr,
    session_id: SessionId,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection mit frischer Session-ID
    pub fn neu(state: Arc<RelayState>, peer_addr: SocketAddr) -> Self {
        Self {
            state,
            peer_addr,
            session_id: SessionId::new(),
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, der Timeout greift oder ein
    /// Shutdown-Signal eingeht.
    pub async fn verarbeiten(
        self,
        socket: WebSocket,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let session_id = self.session_id;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek.max(1));
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);
        let codec = FrameCodec::with_max_size(self.state.config.max_frame_groesse);

        let (mut sink, mut stream) = socket.split();

        let mut sende_rx = match self.state.verbinden(session_id) {
            Ok(rx) => rx,
            Err(e) => {
                tracing::warn!(
                    peer = %peer_addr,
                    fehler = %e,
                    "Session konnte nicht registriert werden"
                );
                let _ = senden(&mut sink, &codec, &fehler_event(&e)).await;
                let code = match e {
                    RelayError::ServerVoll => CLOSE_TRY_AGAIN_LATER,
                    _ => CLOSE_GOING_AWAY,
                };
                let _ = schliessen(&mut sink, code, "Verbindung abgelehnt").await;
                return;
            }
        };

        tracing::info!(peer = %peer_addr, session_id = %session_id, "Neue Verbindung");

        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));
        let mut letzter_empfang = Instant::now();
        let mut keepalive = tokio::time::interval_at(
            tokio::time::Instant::now() + keepalive_intervall,
            keepalive_intervall,
        );

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            letzter_empfang = Instant::now();
                            tracing::trace!(
                                session_id = %session_id,
                                frame = %text,
                                "Frame empfangen"
                            );
                            let antwort = match codec.dekodieren(&text) {
                                Ok(event) => dispatcher.dispatch(session_id, event),
                                Err(e) => {
                                    tracing::warn!(
                                        session_id = %session_id,
                                        fehler = %e,
                                        "Ungueltiger Frame abgelehnt"
                                    );
                                    Some(protokoll_fehler_event(e))
                                }
                            };
                            if let Some(fehler) = antwort {
                                let _ = self.state.an_session_senden(&session_id, fehler);
                            }
                        }
                        Some(Ok(Message::Binary(_))) => {
                            letzter_empfang = Instant::now();
                            let fehler = protokoll_fehler_event(ProtokollFehler::UngueltigesFeld {
                                feld: "frame",
                                grund: "Binaer-Frames werden nicht unterstuetzt".into(),
                            });
                            let _ = self.state.an_session_senden(&session_id, fehler);
                        }
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                            letzter_empfang = Instant::now();
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(
                                session_id = %session_id,
                                "Verbindung vom Client getrennt"
                            );
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                session_id = %session_id,
                                fehler = %e,
                                "WebSocket-Lesefehler"
                            );
                            break;
                        }
                    }
                }

                // Ausgehendes Event aus dem Broadcaster
                ausgehend = sende_rx.recv() => {
                    let Some(event) = ausgehend else {
                        tracing::debug!(session_id = %session_id, "Send-Queue geschlossen");
                        break;
                    };
                    if let Err(e) = senden(&mut sink, &codec, &event).await {
                        tracing::warn!(
                            session_id = %session_id,
                            fehler = %e,
                            "Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Keepalive und Timeout
                _ = keepalive.tick() => {
                    if letzter_empfang.elapsed() > timeout_dauer {
                        tracing::warn!(session_id = %session_id, "Verbindungs-Timeout");
                        break;
                    }
                    if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                        tracing::warn!(
                            session_id = %session_id,
                            fehler = %e,
                            "Ping-Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(
                            session_id = %session_id,
                            "Shutdown-Signal – Verbindung wird getrennt"
                        );
                        let _ = schliessen(
                            &mut sink,
                            CLOSE_GOING_AWAY,
                            "Server wird heruntergefahren",
                        )
                        .await;
                        break;
                    }
                }
            }
        }

        self.state.trennen(session_id);
        tracing::info!(peer = %peer_addr, session_id = %session_id, "Verbindungs-Task beendet");
    }
}

/// Kodiert ein Event und schreibt es als Text-Frame
async fn senden(
    sink: &mut SplitSink<WebSocket, Message>,
    codec: &FrameCodec,
    event: &AusgehendesEvent,
) -> RelayResult<()> {
    let text = codec.kodieren(event)?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| RelayError::intern(e.to_string()))
}

async fn schliessen(
    sink: &mut SplitSink<WebSocket, Message>,
    code: u16,
    grund: &'static str,
) -> RelayResult<()> {
    sink.send(Message::Close(Some(CloseFrame {
        code,
        reason: grund.into(),
    })))
    .await
    .map_err(|e| RelayError::intern(e.to_string()))
}
