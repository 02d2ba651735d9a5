//! Fehlertypen fuer das Chat-Crate

use thiserror::Error;

/// Chat-Fehlertypen
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Private Nachricht ohne aufloesbaren Empfaenger
    #[error("Empfaenger nicht gefunden oder offline: {0}")]
    EmpfaengerUnbekannt(String),
}

pub type ChatResult<T> = Result<T, ChatError>;
