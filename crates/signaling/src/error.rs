//! Fehlertypen fuer den Signaling-Service
//!
//! Kein Fehler in diesem Modul beendet die Verbindung. Jeder Fehler wird
//! ueber [`SignalingError::antwort`] zu genau einer Nachricht an den
//! Absender.

use peerdial_chat::ChatError;
use peerdial_core::types::CallId;
use peerdial_protocol::{DecodeError, ServerMessage};
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingError {
    /// Frame ist kein gueltiges JSON oder Pflichtfelder fehlen
    #[error("Ungueltige Nachricht: {0}")]
    MalformedMessage(String),

    /// `type` ist nicht Teil des Nachrichtenkatalogs
    #[error("Unbekannter Nachrichtentyp: {0}")]
    UnknownMessageType(String),

    /// Der Matcher hat keinen freien Gegenpart gefunden
    #[error("Kein freier Gegenpart verfuegbar")]
    NoAvailablePeer,

    /// Call existiert nicht, ist nicht mehr offen oder gehoert jemand anderem
    #[error("Call nicht gefunden oder abgelaufen: {0}")]
    CallNotFound(CallId),

    /// Privater Chat-Empfaenger ist nicht verbunden
    #[error("Empfaenger nicht gefunden oder offline")]
    RecipientOffline,

    /// Call-ID ist bereits einem aktiven Call zugeordnet
    #[error("Call-ID bereits vergeben: {0}")]
    CallIdInUse(CallId),

    /// Anrufer ist bereits Teilnehmer eines Calls
    #[error("Verbindung ist bereits in einem Call")]
    AlreadyInCall,

    /// Der Angenommene ist inzwischen in einem anderen Call
    #[error("Call bereits vergeben: {0}")]
    CallTaken(CallId),
}

impl SignalingError {
    /// Erstellt einen Formatfehler
    pub fn malformed(grund: impl Into<String>) -> Self {
        Self::MalformedMessage(grund.into())
    }

    /// Nachricht an den Absender
    pub fn antwort(&self) -> ServerMessage {
        match self {
            Self::MalformedMessage(_) => ServerMessage::error("Invalid message format"),
            Self::UnknownMessageType(typ) => {
                ServerMessage::error(format!("Unknown message type: {typ}"))
            }
            Self::NoAvailablePeer => ServerMessage::error("No available peers"),
            Self::CallNotFound(_) => ServerMessage::error("Call not found or expired"),
            Self::RecipientOffline => ServerMessage::error("Recipient not found or offline"),
            Self::CallIdInUse(_) => ServerMessage::error("Call ID already in use"),
            Self::AlreadyInCall => ServerMessage::error("Already in a call"),
            Self::CallTaken(call_id) => ServerMessage::CallTaken {
                call_id: call_id.clone(),
            },
        }
    }
}

impl From<DecodeError> for SignalingError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::Ungueltig(grund) => Self::MalformedMessage(grund),
            DecodeError::UnbekannterTyp(typ) => Self::UnknownMessageType(typ),
        }
    }
}

impl From<ChatError> for SignalingError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::EmpfaengerUnbekannt(_) => Self::RecipientOffline,
        }
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
