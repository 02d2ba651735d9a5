//! Message-Dispatcher – Routet Client-Nachrichten an die richtigen Handler
//!
//! Der Dispatcher empfaengt Text-Frames von einer ClientConnection,
//! dekodiert sie, bestimmt den Handler und gibt die direkte Antwort
//! an den Absender zurueck. Nachrichten an andere Clients laufen ueber
//! deren Send-Queues in der Registry.
//!
//! ## Tabelle
//! - `incoming_call`, `accept_call`, `hangup` -> call_handler
//! - `offer`, `answer`, `ice-candidate`       -> relay_handler
//! - `chat_message`                           -> chat_handler

use std::net::SocketAddr;
use std::sync::Arc;

use peerdial_core::event::{AnrufEnde, SignalingEvent};
use peerdial_core::types::ConnectionId;
use peerdial_protocol::{codec, ClientMessage, ServerMessage};

use crate::error::{SignalingError, SignalingResult};
use crate::handlers::{call_handler, chat_handler, relay_handler};
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
#[derive(Debug, Clone)]
pub struct DispatcherContext {
    /// Vom Registry vergebene Identitaet
    pub connection_id: ConnectionId,
    /// Peer-Adresse (fuer Logs)
    pub peer_addr: Option<SocketAddr>,
}

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Dekodiert einen Text-Frame und verarbeitet ihn
    ///
    /// Gibt die Antwort an den Absender zurueck, `None` wenn keine
    /// direkte Antwort faellig ist.
    pub fn frame_verarbeiten(&self, text: &str, ctx: &DispatcherContext) -> Option<ServerMessage> {
        match codec::dekodieren(text) {
            Ok(nachricht) => self.dispatch(nachricht, ctx),
            Err(e) => {
                tracing::warn!(
                    connection_id = %ctx.connection_id,
                    fehler = %e,
                    "Nachricht abgelehnt"
                );
                Some(SignalingError::from(e).antwort())
            }
        }
    }

    /// Verarbeitet eine dekodierte Nachricht
    pub fn dispatch(&self, nachricht: ClientMessage, ctx: &DispatcherContext) -> Option<ServerMessage> {
        let typ = nachricht.typ();
        tracing::trace!(connection_id = %ctx.connection_id, typ, "Nachricht empfangen");

        match self.dispatch_inner(nachricht, ctx.connection_id) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(
                    connection_id = %ctx.connection_id,
                    typ,
                    fehler = %e,
                    "Nachricht nicht verarbeitet"
                );
                Some(e.antwort())
            }
        }
    }

    fn dispatch_inner(&self, nachricht: ClientMessage, absender: ConnectionId) -> SignalingResult<()> {
        let state = self.state.as_ref();

        match nachricht {
            // -------------------------------------------------------------------
            // Call-Lebenszyklus
            // -------------------------------------------------------------------
            ClientMessage::IncomingCall { call_id } => {
                call_handler::handle_incoming_call(state, absender, call_id)
            }

            ClientMessage::AcceptCall { call_id } => {
                call_handler::handle_accept_call(state, absender, call_id)
            }

            ClientMessage::Hangup { call_id } => {
                call_handler::handle_hangup(state, absender, call_id)
            }

            // -------------------------------------------------------------------
            // Relay
            // -------------------------------------------------------------------
            ClientMessage::Signal {
                art,
                call_id,
                felder,
            } => relay_handler::handle_signal(state, absender, art, call_id, felder).map(|_| ()),

            // -------------------------------------------------------------------
            // Chat
            // -------------------------------------------------------------------
            ClientMessage::ChatMessage(anfrage) => {
                chat_handler::handle_chat_message(state, absender, anfrage)
            }
        }
    }

    /// Raeumt eine getrennte Verbindung auf
    ///
    /// Reihenfolge unter einem Lock: Calls aufloesen (Gegenparts erhalten
    /// `peer_disconnected`), Ereignisse veroeffentlichen, abmelden, neue
    /// Anzahl verteilen.
    pub fn client_cleanup(&self, connection_id: &ConnectionId) {
        {
            let mut vermittlung = self.state.vermittlung.lock();
            let beendet = call_handler::calls_aufloesen(&mut vermittlung, connection_id);

            let anzahl = vermittlung.calls.anzahl();
            for call_id in beendet {
                self.state.presence.ereignis(SignalingEvent::AnrufBeendet {
                    call_id,
                    grund: AnrufEnde::Getrennt,
                    anzahl,
                });
            }

            if vermittlung.registry.unregister(connection_id) {
                self.state
                    .presence
                    .client_getrennt(&vermittlung.registry, *connection_id);
            }
        }

        tracing::debug!(connection_id = %connection_id, "Client aufgeraeumt");
    }
}
