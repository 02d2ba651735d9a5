//! peerdial-protocol – Nachrichtenkatalog des Signaling-Servers
//!
//! Dieses Crate definiert alle JSON-Nachrichten die ueber die
//! WebSocket-Verbindung zwischen Client und Server ausgetauscht werden,
//! sowie den Codec der Text-Frames in typisierte Nachrichten uebersetzt.

pub mod codec;
pub mod control;

pub use codec::{dekodieren, kodieren, DecodeError};
pub use control::{ChatMessageInfo, ChatSendRequest, ClientMessage, ServerMessage, SignalArt};
