//! Oeffentliche Typen fuer den Chat-Service

use peerdial_core::types::ConnectionId;
use peerdial_protocol::ChatMessageInfo;

/// Wohin eine Chat-Nachricht zugestellt wird
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zustellung {
    /// An jede registrierte Verbindung, inklusive Absender
    Oeffentlich,
    /// Nur an den Empfaenger, mit Echo an den Absender
    Privat(ConnectionId),
}

impl Zustellung {
    pub fn ist_privat(&self) -> bool {
        matches!(self, Self::Privat(_))
    }
}

/// Fertig aufgebaute Nachricht samt Zustellentscheidung
#[derive(Debug, Clone, PartialEq)]
pub struct ChatVersand {
    pub zustellung: Zustellung,
    pub nachricht: ChatMessageInfo,
}
