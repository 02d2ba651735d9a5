//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Der Task ist der einzige Schreiber auf dem Socket: direkte
//! Antworten des Dispatchers und Nachrichten aus der Send-Queue laufen
//! beide durch dieselbe Schleife.
//!
//! ## Ablauf
//! ```text
//! Upgrade -> registrieren -> Schleife (Frames / Queue / Shutdown) -> aufraeumen
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use peerdial_protocol::{codec, ServerMessage};
use tokio::sync::watch;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::error::SignalingError;
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: Option<SocketAddr>,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState>, peer_addr: Option<SocketAddr>) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, ein Socket-Fehler auftritt oder ein
    /// Shutdown-Signal eingeht. Danach werden Calls aufgeloest und die
    /// Verbindung abgemeldet.
    pub async fn verarbeiten(self, socket: WebSocket, mut shutdown_rx: watch::Receiver<bool>) {
        if *shutdown_rx.borrow() {
            return;
        }

        let (connection_id, mut sende_rx) = self.state.client_registrieren();
        let ctx = DispatcherContext {
            connection_id,
            peer_addr: self.peer_addr,
        };
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        tracing::info!(
            connection_id = %connection_id,
            peer = ?self.peer_addr,
            "Client verbunden"
        );

        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = stream.next() => {
                    let antwort = match frame {
                        Some(Ok(Message::Text(text))) => dispatcher.frame_verarbeiten(&text, &ctx),
                        Some(Ok(Message::Binary(daten))) => match String::from_utf8(daten) {
                            Ok(text) => dispatcher.frame_verarbeiten(&text, &ctx),
                            Err(_) => {
                                tracing::warn!(
                                    connection_id = %connection_id,
                                    "Binaer-Frame ist kein UTF-8"
                                );
                                Some(SignalingError::malformed("Binaer-Frame ist kein UTF-8").antwort())
                            }
                        },
                        // Ping beantwortet axum selbst
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => None,
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(connection_id = %connection_id, "Verbindung vom Client getrennt");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                connection_id = %connection_id,
                                fehler = %e,
                                "WebSocket-Lesefehler"
                            );
                            break;
                        }
                    };

                    if let Some(antwort) = antwort {
                        if let Err(e) = frame_senden(&mut sink, &antwort).await {
                            tracing::warn!(
                                connection_id = %connection_id,
                                fehler = %e,
                                "Senden fehlgeschlagen"
                            );
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus der Send-Queue
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = frame_senden(&mut sink, &ausgehend).await {
                        tracing::warn!(
                            connection_id = %connection_id,
                            fehler = %e,
                            "Queue-Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(
                            connection_id = %connection_id,
                            "Shutdown-Signal – Verbindung wird getrennt"
                        );
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }

        // Queue zuerst schliessen, danach nimmt sie nichts mehr an
        sende_rx.close();
        dispatcher.client_cleanup(&connection_id);

        tracing::info!(connection_id = %connection_id, "Verbindungs-Task beendet");
    }
}

/// Kodiert eine Nachricht und schreibt sie als Text-Frame
async fn frame_senden(
    sink: &mut SplitSink<WebSocket, Message>,
    nachricht: &ServerMessage,
) -> Result<(), axum::Error> {
    match codec::kodieren(nachricht) {
        Ok(json) => sink.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!(typ = nachricht.typ(), fehler = %e, "Kodieren fehlgeschlagen");
            Ok(())
        }
    }
}
