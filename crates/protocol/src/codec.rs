//! Text-Frame-Codec
//!
//! Uebersetzt WebSocket-Text-Frames in [`ClientMessage`]s und zurueck.
//!
//! Das Dekodieren laeuft zweistufig, damit der Server zwischen
//! unlesbaren Nachrichten und unbekannten Typen unterscheiden kann:
//! 1. JSON parsen und das Pflichtfeld `type` lesen
//! 2. Typspezifische Felder pruefen

use peerdial_core::types::CallId;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::control::{ChatSendRequest, ClientMessage, ServerMessage, SignalArt};

/// Fehler beim Dekodieren eines Frames
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Kein JSON, kein Objekt, `type` fehlt oder Pflichtfelder fehlen
    #[error("Ungueltiges Nachrichtenformat: {0}")]
    Ungueltig(String),

    /// `type` ist gesetzt, aber nicht Teil des Katalogs
    #[error("Unbekannter Nachrichtentyp: {0}")]
    UnbekannterTyp(String),
}

impl DecodeError {
    fn ungueltig(grund: impl Into<String>) -> Self {
        Self::Ungueltig(grund.into())
    }
}

/// Dekodiert einen Text-Frame vom Client
pub fn dekodieren(text: &str) -> Result<ClientMessage, DecodeError> {
    let wert: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::ungueltig(e.to_string()))?;

    let Value::Object(mut felder) = wert else {
        return Err(DecodeError::ungueltig("Nachricht ist kein JSON-Objekt"));
    };

    let typ = match felder.remove("type") {
        Some(Value::String(typ)) => typ,
        Some(_) => return Err(DecodeError::ungueltig("Feld 'type' ist kein String")),
        None => return Err(DecodeError::ungueltig("Feld 'type' fehlt")),
    };

    match typ.as_str() {
        "incoming_call" => Ok(ClientMessage::IncomingCall {
            call_id: call_id_lesen(&felder)?,
        }),
        "accept_call" => Ok(ClientMessage::AcceptCall {
            call_id: call_id_lesen(&felder)?,
        }),
        "hangup" => Ok(ClientMessage::Hangup {
            call_id: call_id_lesen(&felder)?,
        }),
        "chat_message" => {
            let anfrage: ChatSendRequest = serde_json::from_value(Value::Object(felder))
                .map_err(|e| DecodeError::ungueltig(e.to_string()))?;
            Ok(ClientMessage::ChatMessage(anfrage))
        }
        andere => match SignalArt::aus_typ(andere) {
            Some(art) => {
                let call_id = call_id_lesen(&felder)?;
                if !felder.contains_key("data") {
                    return Err(DecodeError::ungueltig("Feld 'data' fehlt"));
                }
                Ok(ClientMessage::Signal {
                    art,
                    call_id,
                    felder,
                })
            }
            None => Err(DecodeError::UnbekannterTyp(andere.to_string())),
        },
    }
}

/// Kodiert eine Server-Nachricht als Text-Frame
pub fn kodieren(nachricht: &ServerMessage) -> serde_json::Result<String> {
    serde_json::to_string(nachricht)
}

fn call_id_lesen(felder: &Map<String, Value>) -> Result<CallId, DecodeError> {
    match felder.get("callId") {
        Some(Value::String(id)) if !id.is_empty() => Ok(CallId::new(id.clone())),
        Some(Value::String(_)) => Err(DecodeError::ungueltig("Feld 'callId' ist leer")),
        Some(_) => Err(DecodeError::ungueltig("Feld 'callId' ist kein String")),
        None => Err(DecodeError::ungueltig("Feld 'callId' fehlt")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn incoming_call_dekodieren() {
        let msg = dekodieren(r#"{"type":"incoming_call","callId":"call_1","from":"Caller"}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::IncomingCall {
                call_id: CallId::from("call_1")
            }
        );
    }

    #[test]
    fn kein_json_ist_ungueltig() {
        assert!(matches!(dekodieren("{kaputt"), Err(DecodeError::Ungueltig(_))));
        assert!(matches!(dekodieren("[1,2]"), Err(DecodeError::Ungueltig(_))));
        assert!(matches!(dekodieren("\"offer\""), Err(DecodeError::Ungueltig(_))));
    }

    #[test]
    fn fehlender_typ_ist_ungueltig() {
        assert!(matches!(
            dekodieren(r#"{"callId":"x"}"#),
            Err(DecodeError::Ungueltig(_))
        ));
        assert!(matches!(
            dekodieren(r#"{"type":7}"#),
            Err(DecodeError::Ungueltig(_))
        ));
    }

    #[test]
    fn unbekannter_typ_wird_benannt() {
        assert_eq!(
            dekodieren(r#"{"type":"tanzen","callId":"x"}"#),
            Err(DecodeError::UnbekannterTyp("tanzen".into()))
        );
    }

    #[test]
    fn fehlende_call_id_ist_ungueltig() {
        assert!(matches!(
            dekodieren(r#"{"type":"accept_call"}"#),
            Err(DecodeError::Ungueltig(_))
        ));
        assert!(matches!(
            dekodieren(r#"{"type":"hangup","callId":42}"#),
            Err(DecodeError::Ungueltig(_))
        ));
    }

    #[test]
    fn signal_ohne_data_ist_ungueltig() {
        assert!(matches!(
            dekodieren(r#"{"type":"offer","callId":"x"}"#),
            Err(DecodeError::Ungueltig(_))
        ));
    }

    #[test]
    fn signal_behaelt_felder_ohne_typ() {
        let msg = dekodieren(r#"{"type":"answer","callId":"x","data":"sdp2","hint":1}"#).unwrap();
        match msg {
            ClientMessage::Signal {
                art,
                call_id,
                felder,
            } => {
                assert_eq!(art, SignalArt::Answer);
                assert_eq!(call_id.as_str(), "x");
                assert!(!felder.contains_key("type"));
                assert_eq!(felder["data"], json!("sdp2"));
                assert_eq!(felder["hint"], json!(1));
            }
            andere => panic!("Signal erwartet, erhalten: {andere:?}"),
        }
    }

    #[test]
    fn chat_message_optionale_felder() {
        let msg = dekodieren(
            r#"{"type":"chat_message","content":"hi","isPrivate":true,"recipientId":"abc"}"#,
        )
        .unwrap();
        let ClientMessage::ChatMessage(anfrage) = msg else {
            panic!("ChatMessage erwartet");
        };
        assert_eq!(anfrage.content, "hi");
        assert_eq!(anfrage.is_private, Some(true));
        assert_eq!(anfrage.recipient_id.as_deref(), Some("abc"));
        assert!(anfrage.timestamp.is_none());
    }

    #[test]
    fn chat_message_ohne_inhalt_ist_ungueltig() {
        assert!(matches!(
            dekodieren(r#"{"type":"chat_message"}"#),
            Err(DecodeError::Ungueltig(_))
        ));
    }

    #[test]
    fn weitergereichtes_signal_ist_identisch() {
        let eingang = json!({"type": "offer", "callId": "x", "data": "sdp1"});
        let ClientMessage::Signal { art, felder, .. } = dekodieren(&eingang.to_string()).unwrap()
        else {
            panic!("Signal erwartet");
        };
        let ausgang = kodieren(&ServerMessage::signal(art, felder)).unwrap();
        let ausgang: Value = serde_json::from_str(&ausgang).unwrap();
        assert_eq!(ausgang, eingang);
    }
}
