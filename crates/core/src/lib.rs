//! peerdial-core – Gemeinsame Typen, Ereignisse und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Peerdial-Crates gemeinsam genutzt werden.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{PeerdialError, Result};
pub use event::{AnrufEnde, SignalingEvent};
pub use types::{CallId, ConnectionId};
