//! Fehlertypen fuer Peerdial
//!
//! Zentraler Fehler-Enum fuer den Serverstart (Konfiguration laden).
//! Untermodule definieren eigene Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Peerdial
pub type Result<T> = std::result::Result<T, PeerdialError>;

/// Prozessweite Fehler im Peerdial-System
#[derive(Debug, Error)]
pub enum PeerdialError {
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl PeerdialError {
    /// Erstellt einen Konfigurationsfehler
    pub fn konfiguration(msg: impl Into<String>) -> Self {
        Self::Konfiguration(msg.into())
    }
}
