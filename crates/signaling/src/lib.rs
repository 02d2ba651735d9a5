//! peerdial-signaling – WebSocket-Signaling und Anruf-Vermittlung
//!
//! Dieser Crate implementiert den Signaling-Kern von Peerdial. Er verwaltet
//! WebSocket-Verbindungen, vermittelt Anrufe zwischen freien Clients,
//! reicht Offer/Answer/ICE an den Gegenpart weiter und stellt
//! Chat-Nachrichten zu.
//!
//! ## Architektur
//!
//! ```text
//! axum-Route (websocket)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- CallHandler   (incoming_call, accept_call, hangup)
//!     +-- RelayHandler  (offer, answer, ice-candidate)
//!     +-- ChatHandler   (chat_message)
//!
//! Vermittlung (ein Mutex)
//!     +-- ConnectionRegistry – Verbindungen, Send-Queues, aktueller Call
//!     +-- CallTable          – Calls und ihre Teilnehmer
//!
//! Matcher          – First-Fit-Suche nach einem freien Gegenpart
//! PresenceNotifier – user_count an alle, SignalingEvents an Beobachter
//! ```

pub mod call_table;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod matcher;
pub mod presence;
pub mod registry;
pub mod server_state;
pub mod websocket;

// Bequeme Re-Exporte
pub use call_table::{Call, CallTable, CallZustand};
pub use connection::ClientConnection;
pub use dispatcher::{DispatcherContext, MessageDispatcher};
pub use error::{SignalingError, SignalingResult};
pub use presence::PresenceNotifier;
pub use registry::ConnectionRegistry;
pub use server_state::{SignalingConfig, SignalingState, Vermittlung};
pub use websocket::signaling_router;
