//! Signaling-Ereignisse
//!
//! Der Signaling-Kern veroeffentlicht diese Ereignisse ueber einen
//! tokio-broadcast-Kanal. Beobachter (Metriken, Health) abonnieren ihn,
//! ohne den gemeinsamen Zustand zu beruehren. Zaehlende Ereignisse tragen
//! den absoluten Stand nach der Aenderung, damit Beobachter auch nach
//! verpassten Ereignissen den richtigen Wert setzen.

use crate::types::{CallId, ConnectionId};
use serde::{Deserialize, Serialize};

/// Warum ein Anruf beendet wurde
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnrufEnde {
    /// Ein Teilnehmer hat aufgelegt
    Aufgelegt,
    /// Ein Teilnehmer hat die Verbindung verloren
    Getrennt,
    /// Kein freier Gegenpart gefunden
    KeinPartner,
}

impl AnrufEnde {
    /// Label fuer Metriken und Logs
    pub fn als_label(&self) -> &'static str {
        match self {
            Self::Aufgelegt => "aufgelegt",
            Self::Getrennt => "getrennt",
            Self::KeinPartner => "kein_partner",
        }
    }
}

/// Alle Ereignisse die der Signaling-Kern versendet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalingEvent {
    /// Eine Verbindung wurde registriert (`anzahl` nach dem Ereignis)
    ClientVerbunden {
        connection_id: ConnectionId,
        anzahl: usize,
    },
    /// Eine Verbindung wurde entfernt (`anzahl` nach dem Ereignis)
    ClientGetrennt {
        connection_id: ConnectionId,
        anzahl: usize,
    },
    /// Ein Anrufer hat einen Gegenpart eingeladen (`anzahl` Calls danach)
    AnrufAngelegt {
        call_id: CallId,
        anrufer: ConnectionId,
        eingeladen: ConnectionId,
        anzahl: usize,
    },
    /// Der Eingeladene hat angenommen
    AnrufVerbunden { call_id: CallId },
    /// Der Anruf existiert nicht mehr (`anzahl` Calls danach)
    AnrufBeendet {
        call_id: CallId,
        grund: AnrufEnde,
        anzahl: usize,
    },
    /// Offer/Answer/ICE wurde an den Gegenpart weitergereicht
    SignalWeitergeleitet { call_id: CallId },
    /// Eine Chat-Nachricht wurde zugestellt
    ChatZugestellt { privat: bool, empfaenger: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ist_serde_kompatibel() {
        let event = SignalingEvent::AnrufBeendet {
            call_id: CallId::from("call_1"),
            grund: AnrufEnde::Getrennt,
            anzahl: 0,
        };
        let json = serde_json::to_string(&event).unwrap();
        let zurueck: SignalingEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, zurueck);
    }

    #[test]
    fn anruf_ende_labels() {
        assert_eq!(AnrufEnde::Aufgelegt.als_label(), "aufgelegt");
        assert_eq!(AnrufEnde::KeinPartner.als_label(), "kein_partner");
    }
}
