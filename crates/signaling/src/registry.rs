//! Connection-Registry – Alle verbundenen Clients und ihre Send-Queues
//!
//! Die Registry ist der einzige Besitzer der Send-Queues. Andere Komponenten
//! kennen Verbindungen nur ueber ihre [`ConnectionId`].
//!
//! ## Reihenfolge
//! Eintraege werden in Registrierungsreihenfolge gehalten, damit der
//! Matcher deterministisch den ersten freien Client waehlt.
//!
//! Die Registry selbst ist nicht thread-safe. Sie lebt zusammen mit der
//! Call-Tabelle hinter einem gemeinsamen Mutex, siehe
//! [`crate::server_state::Vermittlung`].

use std::collections::{BTreeMap, HashMap};

use peerdial_core::types::{CallId, ConnectionId};
use peerdial_protocol::ServerMessage;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub connection_id: ConnectionId,
    tx: mpsc::Sender<ServerMessage>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ServerMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = %self.connection_id,
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }

    /// Ob der Verbindungs-Task die Queue noch liest
    pub fn ist_offen(&self) -> bool {
        !self.tx.is_closed()
    }
}

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Eintrag {
    sender: ClientSender,
    /// Rueckverweis auf den Call an dem die Verbindung teilnimmt
    aktueller_call: Option<CallId>,
}

/// Verzeichnis aller registrierten Verbindungen
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Registrierungsreihenfolge -> Eintrag
    eintraege: BTreeMap<u64, Eintrag>,
    /// ConnectionId -> Position in `eintraege`
    index: HashMap<ConnectionId, u64>,
    naechste_position: u64,
}

impl ConnectionRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert eine neue Verbindung und vergibt ihre Identitaet
    pub fn register(&mut self, tx: mpsc::Sender<ServerMessage>) -> ConnectionId {
        let connection_id = ConnectionId::new();
        let position = self.naechste_position;
        self.naechste_position += 1;

        self.eintraege.insert(
            position,
            Eintrag {
                sender: ClientSender { connection_id, tx },
                aktueller_call: None,
            },
        );
        self.index.insert(connection_id, position);

        tracing::debug!(connection_id = %connection_id, "Client in Registry registriert");
        connection_id
    }

    /// Entfernt eine Verbindung; mehrfacher Aufruf ist harmlos
    ///
    /// Gibt `true` zurueck wenn die Verbindung registriert war.
    pub fn unregister(&mut self, connection_id: &ConnectionId) -> bool {
        let Some(position) = self.index.remove(connection_id) else {
            return false;
        };
        self.eintraege.remove(&position);
        tracing::debug!(connection_id = %connection_id, "Client aus Registry entfernt");
        true
    }

    /// Anzahl der registrierten Verbindungen
    pub fn count(&self) -> usize {
        self.index.len()
    }

    /// Sendet an jede offene Verbindung, Fehler werden verschluckt
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn broadcast(&self, nachricht: &ServerMessage) -> usize {
        self.eintraege
            .values()
            .filter(|e| e.sender.ist_offen())
            .filter(|e| e.sender.senden(nachricht.clone()))
            .count()
    }

    /// Sendet an alle offenen Verbindungen die fuer `ausgewaehlt` `true` liefern
    pub fn senden_an_alle_mit(
        &self,
        nachricht: &ServerMessage,
        mut ausgewaehlt: impl FnMut(&ConnectionId, Option<&CallId>) -> bool,
    ) -> usize {
        self.eintraege
            .values()
            .filter(|e| e.sender.ist_offen())
            .filter(|e| ausgewaehlt(&e.sender.connection_id, e.aktueller_call.as_ref()))
            .filter(|e| e.sender.senden(nachricht.clone()))
            .count()
    }

    /// Sendet eine Nachricht an eine einzelne Verbindung
    ///
    /// Gibt `true` zurueck wenn die Verbindung gefunden und die Nachricht eingereiht wurde.
    pub fn senden(&self, connection_id: &ConnectionId, nachricht: ServerMessage) -> bool {
        match self.eintrag(connection_id) {
            Some(eintrag) => eintrag.sender.senden(nachricht),
            None => {
                tracing::debug!(connection_id = %connection_id, "Senden an unbekannten Client");
                false
            }
        }
    }

    /// Prueft ob eine Verbindung registriert ist
    pub fn ist_registriert(&self, connection_id: &ConnectionId) -> bool {
        self.index.contains_key(connection_id)
    }

    /// Registriert und die Queue wird noch gelesen
    pub fn ist_offen(&self, connection_id: &ConnectionId) -> bool {
        self.eintrag(connection_id)
            .is_some_and(|e| e.sender.ist_offen())
    }

    /// Registriert und an keinem Call beteiligt
    pub fn ist_frei(&self, connection_id: &ConnectionId) -> bool {
        self.eintrag(connection_id)
            .is_some_and(|e| e.aktueller_call.is_none())
    }

    /// Call an dem die Verbindung gerade teilnimmt
    pub fn aktueller_call(&self, connection_id: &ConnectionId) -> Option<&CallId> {
        self.eintrag(connection_id)
            .and_then(|e| e.aktueller_call.as_ref())
    }

    /// Setzt oder loescht den Rueckverweis auf den aktuellen Call
    pub fn call_setzen(&mut self, connection_id: &ConnectionId, call_id: Option<CallId>) {
        if let Some(position) = self.index.get(connection_id) {
            if let Some(eintrag) = self.eintraege.get_mut(position) {
                eintrag.aktueller_call = call_id;
            }
        }
    }

    /// Loescht den Rueckverweis nur wenn er auf `call_id` zeigt
    pub fn call_loesen(&mut self, connection_id: &ConnectionId, call_id: &CallId) {
        if self.aktueller_call(connection_id) == Some(call_id) {
            self.call_setzen(connection_id, None);
        }
    }

    /// Alle offenen Verbindungen in Registrierungsreihenfolge
    pub fn offene_in_reihenfolge(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.eintraege
            .values()
            .filter(|e| e.sender.ist_offen())
            .map(|e| e.sender.connection_id)
    }

    fn eintrag(&self, connection_id: &ConnectionId) -> Option<&Eintrag> {
        self.index
            .get(connection_id)
            .and_then(|position| self.eintraege.get(position))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
