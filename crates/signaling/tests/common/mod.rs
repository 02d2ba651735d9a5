//! Gemeinsame Hilfen fuer die Signaling-Tests
//!
//! Clients werden direkt am SignalingState registriert. Ihre Send-Queue
//! ersetzt den WebSocket.

#![allow(dead_code)]

use std::sync::Arc;

use peerdial_chat::ChatService;
use peerdial_core::types::ConnectionId;
use peerdial_protocol::ServerMessage;
use peerdial_signaling::{DispatcherContext, MessageDispatcher, SignalingConfig, SignalingState};
use serde_json::Value;
use tokio::sync::mpsc;

pub struct TestClient {
    pub id: ConnectionId,
    pub rx: mpsc::Receiver<ServerMessage>,
    ctx: DispatcherContext,
    dispatcher: MessageDispatcher,
}

impl TestClient {
    /// Sendet einen JSON-Frame und liefert die direkte Antwort
    pub fn senden(&self, frame: Value) -> Option<ServerMessage> {
        self.dispatcher.frame_verarbeiten(&frame.to_string(), &self.ctx)
    }

    pub fn senden_roh(&self, text: &str) -> Option<ServerMessage> {
        self.dispatcher.frame_verarbeiten(text, &self.ctx)
    }

    /// Alle bisher eingereihten Nachrichten
    pub fn empfangen(&mut self) -> Vec<ServerMessage> {
        let mut alle = Vec::new();
        while let Ok(nachricht) = self.rx.try_recv() {
            alle.push(nachricht);
        }
        alle
    }

    /// Eingereihte Nachrichten ohne `user_count`
    pub fn empfangen_ohne_anzahl(&mut self) -> Vec<ServerMessage> {
        self.empfangen()
            .into_iter()
            .filter(|n| !matches!(n, ServerMessage::UserCount { .. }))
            .collect()
    }

    /// Verbindung trennen und aufraeumen
    pub fn trennen(mut self) {
        self.rx.close();
        self.dispatcher.client_cleanup(&self.id);
    }
}

pub fn state() -> Arc<SignalingState> {
    state_mit(SignalingConfig::default())
}

pub fn state_mit(config: SignalingConfig) -> Arc<SignalingState> {
    SignalingState::neu(config, ChatService::neu())
}

pub fn verbinden(state: &Arc<SignalingState>) -> TestClient {
    let (id, rx) = state.client_registrieren();
    TestClient {
        id,
        rx,
        ctx: DispatcherContext {
            connection_id: id,
            peer_addr: None,
        },
        dispatcher: MessageDispatcher::neu(Arc::clone(state)),
    }
}
