//! ChatService – Nachrichten aufbauen und Zustellung bestimmen

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use peerdial_core::types::ConnectionId;
use peerdial_protocol::{ChatMessageInfo, ChatSendRequest};

use crate::{
    error::{ChatError, ChatResult},
    types::{ChatVersand, Zustellung},
};

/// ChatService erzeugt zustellbare Chat-Nachrichten
///
/// Haelt keinen Zustand: es gibt keine History, Nachrichten existieren
/// nur waehrend der Auslieferung.
#[derive(Debug, Default)]
pub struct ChatService;

impl ChatService {
    /// Erstellt einen neuen ChatService
    pub fn neu() -> Arc<Self> {
        Arc::new(Self)
    }

    /// Baut die Nachricht fuer `sender` auf
    ///
    /// Vergibt eine frische Nachrichten-ID und setzt einen Server-Zeitstempel,
    /// falls der Client keinen mitgeschickt hat. Ob der private Empfaenger
    /// tatsaechlich verbunden ist, prueft der Aufrufer.
    pub fn nachricht_erstellen(
        &self,
        sender: ConnectionId,
        anfrage: ChatSendRequest,
    ) -> ChatResult<ChatVersand> {
        let zustellung = Self::zustellung_bestimmen(&anfrage)?;

        let nachricht = ChatMessageInfo {
            id: Uuid::new_v4(),
            sender_id: sender,
            content: anfrage.content,
            timestamp: zeitstempel_oder_jetzt(anfrage.timestamp),
            is_private: zustellung.ist_privat(),
        };

        tracing::debug!(
            sender = %sender,
            message_id = %nachricht.id,
            privat = zustellung.ist_privat(),
            "Chat-Nachricht erstellt"
        );

        Ok(ChatVersand {
            zustellung,
            nachricht,
        })
    }

    /// Bestimmt die Zustellung aus `isPrivate` und `recipientId`
    pub fn zustellung_bestimmen(anfrage: &ChatSendRequest) -> ChatResult<Zustellung> {
        if !anfrage.is_private.unwrap_or(false) {
            return Ok(Zustellung::Oeffentlich);
        }

        let roh = anfrage.recipient_id.as_deref().unwrap_or_default();
        roh.parse::<ConnectionId>()
            .map(Zustellung::Privat)
            .map_err(|_| ChatError::EmpfaengerUnbekannt(roh.to_string()))
    }
}

/// Uebernimmt den Client-Zeitstempel, sonst jetzt (RFC 3339, Millisekunden, UTC)
pub fn zeitstempel_oder_jetzt(zeitstempel: Option<Value>) -> Value {
    match zeitstempel {
        Some(wert) if !ist_leer(&wert) => wert,
        _ => Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    }
}

fn ist_leer(wert: &Value) -> bool {
    match wert {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}
