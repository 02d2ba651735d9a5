//! Control-Protokoll (WebSocket, JSON)
//!
//! Definiert alle Nachrichten die ueber die WebSocket-Verbindung zwischen
//! Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Umschlag: JSON-Objekt mit Pflichtfeld `type`
//! - Feldnamen auf dem Draht in camelCase (`callId`, `senderId`, ...)
//! - Offer/Answer/ICE werden unveraendert weitergereicht, daher bleiben
//!   ihre Felder als rohe JSON-Map erhalten

use peerdial_core::types::{CallId, ConnectionId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Signal-Arten
// ---------------------------------------------------------------------------

/// Art eines WebRTC-Signals das an den Gegenpart weitergereicht wird
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalArt {
    /// Session-Description des Anrufers
    Offer,
    /// Session-Description des Angerufenen
    Answer,
    /// Konnektivitaets-Kandidat
    IceCandidate,
}

impl SignalArt {
    /// Wert des `type`-Feldes auf dem Draht
    pub fn typ(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
        }
    }

    /// Bestimmt die Signal-Art aus dem `type`-Feld
    pub fn aus_typ(typ: &str) -> Option<Self> {
        match typ {
            "offer" => Some(Self::Offer),
            "answer" => Some(Self::Answer),
            "ice-candidate" => Some(Self::IceCandidate),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Chat-Nachricht vom Client (`chat_message`, C->S)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendRequest {
    /// Nachrichteninhalt
    pub content: String,
    /// Vom Client gesetzter Zeitstempel (beliebiges JSON, wird durchgereicht)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    /// Private Nachricht an `recipient_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    /// Verbindungs-ID des Empfaengers (nur bei privaten Nachrichten)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
}

/// Zugestellte Chat-Nachricht (`chat_message.message`, S->C)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageInfo {
    pub id: Uuid,
    pub sender_id: ConnectionId,
    pub content: String,
    pub timestamp: Value,
    pub is_private: bool,
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Vom Client empfangene, bereits klassifizierte Nachricht
///
/// Wird ausschliesslich vom Codec erzeugt, siehe [`crate::codec::dekodieren`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Anrufer kuendigt einen Anruf an, der Server sucht einen Gegenpart
    IncomingCall { call_id: CallId },
    /// Eingeladener nimmt den Anruf an
    AcceptCall { call_id: CallId },
    /// Ein Teilnehmer legt auf
    Hangup { call_id: CallId },
    /// Offer/Answer/ICE fuer den Gegenpart (Felder ohne `type`)
    Signal {
        art: SignalArt,
        call_id: CallId,
        felder: Map<String, Value>,
    },
    /// Oeffentliche oder private Chat-Nachricht
    ChatMessage(ChatSendRequest),
}

impl ClientMessage {
    /// Wert des `type`-Feldes (fuer Logs)
    pub fn typ(&self) -> &'static str {
        match self {
            Self::IncomingCall { .. } => "incoming_call",
            Self::AcceptCall { .. } => "accept_call",
            Self::Hangup { .. } => "hangup",
            Self::Signal { art, .. } => art.typ(),
            Self::ChatMessage(_) => "chat_message",
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Vom Server gesendete Nachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Einladung an den gefundenen Gegenpart
    IncomingCall {
        #[serde(rename = "callId")]
        call_id: CallId,
        from: ConnectionId,
    },
    /// An den Anrufer: der Eingeladene hat angenommen
    CallJoined {
        #[serde(rename = "callId")]
        call_id: CallId,
    },
    /// An Unbeteiligte: der Anruf ist vergeben
    CallTaken {
        #[serde(rename = "callId")]
        call_id: CallId,
    },
    /// An den Gegenpart: es wurde aufgelegt
    Hangup {
        #[serde(rename = "callId")]
        call_id: CallId,
    },
    /// An den Gegenpart: die andere Seite ist weg
    PeerDisconnected {
        #[serde(rename = "callId")]
        call_id: CallId,
    },
    Offer {
        #[serde(flatten)]
        felder: Map<String, Value>,
    },
    Answer {
        #[serde(flatten)]
        felder: Map<String, Value>,
    },
    #[serde(rename = "ice-candidate")]
    IceCandidate {
        #[serde(flatten)]
        felder: Map<String, Value>,
    },
    /// Zugestellte Chat-Nachricht
    ChatMessage { message: ChatMessageInfo },
    /// Aktuelle Anzahl verbundener Clients
    UserCount { count: usize },
    /// Menschenlesbare Fehlermeldung
    Error { data: String },
}

impl ServerMessage {
    /// Erstellt eine Fehlernachricht
    pub fn error(data: impl Into<String>) -> Self {
        Self::Error { data: data.into() }
    }

    /// Baut das weitergereichte Signal mit unveraenderten Feldern
    pub fn signal(art: SignalArt, felder: Map<String, Value>) -> Self {
        match art {
            SignalArt::Offer => Self::Offer { felder },
            SignalArt::Answer => Self::Answer { felder },
            SignalArt::IceCandidate => Self::IceCandidate { felder },
        }
    }

    /// Wert des `type`-Feldes (fuer Logs)
    pub fn typ(&self) -> &'static str {
        match self {
            Self::IncomingCall { .. } => "incoming_call",
            Self::CallJoined { .. } => "call_joined",
            Self::CallTaken { .. } => "call_taken",
            Self::Hangup { .. } => "hangup",
            Self::PeerDisconnected { .. } => "peer_disconnected",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::ChatMessage { .. } => "chat_message",
            Self::UserCount { .. } => "user_count",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn incoming_call_drahtformat() {
        let von = ConnectionId(Uuid::nil());
        let msg = ServerMessage::IncomingCall {
            call_id: CallId::from("x"),
            from: von,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "incoming_call",
                "callId": "x",
                "from": "00000000-0000-0000-0000-000000000000"
            })
        );
    }

    #[test]
    fn signal_behaelt_alle_felder() {
        let mut felder = Map::new();
        felder.insert("callId".into(), json!("x"));
        felder.insert("data".into(), json!("sdp1"));
        felder.insert("extra".into(), json!({"a": 1}));

        let msg = ServerMessage::signal(SignalArt::IceCandidate, felder);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "ice-candidate", "callId": "x", "data": "sdp1", "extra": {"a": 1}})
        );
    }

    #[test]
    fn user_count_und_error() {
        assert_eq!(
            serde_json::to_value(ServerMessage::UserCount { count: 3 }).unwrap(),
            json!({"type": "user_count", "count": 3})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::error("Invalid message format")).unwrap(),
            json!({"type": "error", "data": "Invalid message format"})
        );
    }

    #[test]
    fn chat_message_camel_case() {
        let msg = ServerMessage::ChatMessage {
            message: ChatMessageInfo {
                id: Uuid::nil(),
                sender_id: ConnectionId(Uuid::nil()),
                content: "hallo".into(),
                timestamp: json!("2024-01-01T00:00:00.000Z"),
                is_private: false,
            },
        };
        let wert = serde_json::to_value(&msg).unwrap();
        assert_eq!(wert["type"], "chat_message");
        assert_eq!(wert["message"]["senderId"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(wert["message"]["isPrivate"], false);
    }

    #[test]
    fn signal_art_typen() {
        for art in [SignalArt::Offer, SignalArt::Answer, SignalArt::IceCandidate] {
            assert_eq!(SignalArt::aus_typ(art.typ()), Some(art));
        }
        assert_eq!(SignalArt::aus_typ("ice_candidate"), None);
    }
}
