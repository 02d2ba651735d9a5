//! peerdial-chat – Oeffentlicher und privater Text-Chat
//!
//! Dieses Crate implementiert:
//! - ChatService: Nachricht aufbauen (ID, Zeitstempel) und Zustellung bestimmen
//! - Zustellung: oeffentlich an alle oder privat an genau einen Empfaenger
//!
//! Die eigentliche Auslieferung uebernimmt das Signaling, das die
//! verbundenen Clients kennt.
//!
//! # Beispiel
//!
//! ```no_run
//! use peerdial_chat::{ChatService, Zustellung};
//! use peerdial_core::ConnectionId;
//! use peerdial_protocol::ChatSendRequest;
//!
//! let chat = ChatService::neu();
//! let versand = chat
//!     .nachricht_erstellen(
//!         ConnectionId::new(),
//!         ChatSendRequest {
//!             content: "Hallo".into(),
//!             ..Default::default()
//!         },
//!     )
//!     .unwrap();
//! assert_eq!(versand.zustellung, Zustellung::Oeffentlich);
//! ```

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use error::{ChatError, ChatResult};
pub use service::ChatService;
pub use types::{ChatVersand, Zustellung};
