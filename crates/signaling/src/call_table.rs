//! Call-Tabelle – Alle laufenden und angekuendigten Calls
//!
//! Ein Call durchlaeuft die Zustaende
//!
//! ```text
//! (nicht vorhanden) -> Offen (Anrufer, kein Angerufener) -> Verbunden -> (entfernt)
//! ```
//!
//! Die Tabelle ist reine Datenhaltung. Benachrichtigungen und die Pruefung
//! ob ein Angerufener noch frei ist erledigen die Handler unter demselben
//! Lock, siehe [`crate::handlers::call_handler`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use peerdial_core::types::{CallId, ConnectionId};
use peerdial_protocol::ServerMessage;

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------------

/// Zustand eines Calls aus Sicht des Servers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallZustand {
    /// Anrufer hat angekuendigt, noch niemand hat angenommen
    Offen,
    /// Angerufener ist zugeordnet
    Verbunden,
}

/// Ein angekuendigter oder laufender Call
#[derive(Debug, Clone)]
pub struct Call {
    pub call_id: CallId,
    pub anrufer: ConnectionId,
    /// Vom Matcher eingeladene Verbindung (nur sie darf annehmen)
    pub eingeladen: Option<ConnectionId>,
    pub angerufener: Option<ConnectionId>,
    pub erstellt_am: DateTime<Utc>,
    /// Signale des Anrufers die vor dem Annehmen eintrafen
    gepuffert: Vec<ServerMessage>,
}

impl Call {
    fn neu(call_id: CallId, anrufer: ConnectionId) -> Self {
        Self {
            call_id,
            anrufer,
            eingeladen: None,
            angerufener: None,
            erstellt_am: Utc::now(),
            gepuffert: Vec::new(),
        }
    }

    pub fn zustand(&self) -> CallZustand {
        match self.angerufener {
            Some(_) => CallZustand::Verbunden,
            None => CallZustand::Offen,
        }
    }

    /// Anrufer oder Angerufener
    pub fn ist_teilnehmer(&self, connection_id: &ConnectionId) -> bool {
        self.anrufer == *connection_id || self.angerufener.as_ref() == Some(connection_id)
    }

    /// Der jeweils andere Teilnehmer
    pub fn gegenpart(&self, connection_id: &ConnectionId) -> Option<ConnectionId> {
        if self.anrufer == *connection_id {
            self.angerufener
        } else if self.angerufener.as_ref() == Some(connection_id) {
            Some(self.anrufer)
        } else {
            None
        }
    }

    /// Puffert ein Signal fuer den spaeteren Angerufenen
    ///
    /// Gibt `false` zurueck wenn der Puffer voll ist; das Signal wird verworfen.
    pub fn signal_puffern(&mut self, signal: ServerMessage, maximum: usize) -> bool {
        if self.gepuffert.len() >= maximum {
            return false;
        }
        self.gepuffert.push(signal);
        true
    }

    /// Entnimmt alle gepufferten Signale in Eingangsreihenfolge
    pub fn puffer_leeren(&mut self) -> Vec<ServerMessage> {
        std::mem::take(&mut self.gepuffert)
    }

    pub fn gepufferte_anzahl(&self) -> usize {
        self.gepuffert.len()
    }
}

// ---------------------------------------------------------------------------
// CallTable
// ---------------------------------------------------------------------------

/// Besitzt die Zuordnung Call-ID -> Call
#[derive(Debug, Default)]
pub struct CallTable {
    calls: HashMap<CallId, Call>,
}

impl CallTable {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt einen offenen Call an
    ///
    /// Eine bereits aktive Call-ID wird nicht ueberschrieben.
    pub fn create(&mut self, call_id: CallId, anrufer: ConnectionId) -> SignalingResult<&mut Call> {
        use std::collections::hash_map::Entry;

        match self.calls.entry(call_id) {
            Entry::Occupied(belegt) => Err(SignalingError::CallIdInUse(belegt.key().clone())),
            Entry::Vacant(frei) => {
                let call = Call::neu(frei.key().clone(), anrufer);
                Ok(frei.insert(call))
            }
        }
    }

    /// Ordnet dem offenen Call seinen Angerufenen zu
    ///
    /// Schlaegt fehl wenn der Call fehlt, schon verbunden ist oder
    /// `angerufener` nicht eingeladen wurde. Ob der Angerufene noch frei
    /// ist, prueft der Aufrufer unter demselben Lock.
    pub fn attach_callee(
        &mut self,
        call_id: &CallId,
        angerufener: ConnectionId,
    ) -> SignalingResult<&mut Call> {
        let nicht_gefunden = || SignalingError::CallNotFound(call_id.clone());

        let call = self.calls.get_mut(call_id).ok_or_else(nicht_gefunden)?;
        if call.zustand() != CallZustand::Offen {
            return Err(nicht_gefunden());
        }
        if call.eingeladen.is_some_and(|e| e != angerufener) || call.anrufer == angerufener {
            return Err(nicht_gefunden());
        }

        call.angerufener = Some(angerufener);
        Ok(call)
    }

    /// Gegenpart von `connection_id` im Call `call_id`
    pub fn peer_of(&self, connection_id: &ConnectionId, call_id: &CallId) -> Option<ConnectionId> {
        self.calls
            .get(call_id)
            .and_then(|call| call.gegenpart(connection_id))
    }

    /// Entfernt einen Call; mehrfacher Aufruf ist harmlos
    pub fn remove(&mut self, call_id: &CallId) -> Option<Call> {
        self.calls.remove(call_id)
    }

    /// Entfernt jeden Call an dem `connection_id` teilnimmt
    ///
    /// Liefert pro Call die ID und den Gegenpart (falls schon verbunden).
    pub fn remove_all_for(
        &mut self,
        connection_id: &ConnectionId,
    ) -> Vec<(CallId, Option<ConnectionId>)> {
        let betroffen: Vec<CallId> = self
            .calls
            .values()
            .filter(|call| call.ist_teilnehmer(connection_id))
            .map(|call| call.call_id.clone())
            .collect();

        betroffen
            .into_iter()
            .filter_map(|call_id| self.calls.remove(&call_id))
            .map(|call| {
                let peer = call.gegenpart(connection_id);
                (call.call_id, peer)
            })
            .collect()
    }

    pub fn get(&self, call_id: &CallId) -> Option<&Call> {
        self.calls.get(call_id)
    }

    pub fn get_mut(&mut self, call_id: &CallId) -> Option<&mut Call> {
        self.calls.get_mut(call_id)
    }

    /// Anzahl aktiver Calls (offen und verbunden)
    pub fn anzahl(&self) -> usize {
        self.calls.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> CallId {
        CallId::from("x")
    }

    #[test]
    fn anlegen_und_doppelte_id() {
        let mut table = CallTable::neu();
        let a = ConnectionId::new();
        let b = ConnectionId::new();

        table.create(x(), a).unwrap();
        assert_eq!(
            table.create(x(), b).unwrap_err(),
            SignalingError::CallIdInUse(x())
        );
        assert_eq!(table.get(&x()).unwrap().anrufer, a, "bestehender Call bleibt");
    }

    #[test]
    fn annehmen_nur_durch_eingeladenen() {
        let mut table = CallTable::neu();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let c = ConnectionId::new();

        table.create(x(), a).unwrap().eingeladen = Some(b);

        assert!(table.attach_callee(&x(), c).is_err());
        assert!(table.attach_callee(&x(), a).is_err());
        let call = table.attach_callee(&x(), b).unwrap();
        assert_eq!(call.zustand(), CallZustand::Verbunden);
    }

    #[test]
    fn zweites_annehmen_laesst_paar_intakt() {
        let mut table = CallTable::neu();
        let a = ConnectionId::new();
        let b = ConnectionId::new();

        table.create(x(), a).unwrap();
        table.attach_callee(&x(), b).unwrap();
        assert_eq!(
            table.attach_callee(&x(), ConnectionId::new()).unwrap_err(),
            SignalingError::CallNotFound(x())
        );
        assert_eq!(table.peer_of(&a, &x()), Some(b));
        assert_eq!(table.peer_of(&b, &x()), Some(a));
    }

    #[test]
    fn annehmen_unbekannter_call() {
        let mut table = CallTable::neu();
        assert_eq!(
            table.attach_callee(&x(), ConnectionId::new()).unwrap_err(),
            SignalingError::CallNotFound(x())
        );
    }

    #[test]
    fn peer_of_fuer_unbeteiligte() {
        let mut table = CallTable::neu();
        let a = ConnectionId::new();
        table.create(x(), a).unwrap();

        assert_eq!(table.peer_of(&a, &x()), None, "noch kein Angerufener");
        assert_eq!(table.peer_of(&ConnectionId::new(), &x()), None);
        assert_eq!(table.peer_of(&a, &CallId::from("y")), None);
    }

    #[test]
    fn entfernen_ist_idempotent() {
        let mut table = CallTable::neu();
        table.create(x(), ConnectionId::new()).unwrap();
        assert!(table.remove(&x()).is_some());
        assert!(table.remove(&x()).is_none());
        assert_eq!(table.anzahl(), 0);
    }

    #[test]
    fn alle_calls_einer_verbindung_entfernen() {
        let mut table = CallTable::neu();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let c = ConnectionId::new();

        table.create(x(), a).unwrap();
        table.attach_callee(&x(), b).unwrap();
        table.create(CallId::from("y"), c).unwrap();

        let entfernt = table.remove_all_for(&b);
        assert_eq!(entfernt, vec![(x(), Some(a))]);
        assert!(table.get(&x()).is_none());
        assert!(table.get(&CallId::from("y")).is_some());

        let entfernt = table.remove_all_for(&c);
        assert_eq!(entfernt, vec![(CallId::from("y"), None)]);
    }

    #[test]
    fn puffer_hat_obergrenze() {
        let mut table = CallTable::neu();
        let call = table.create(x(), ConnectionId::new()).unwrap();

        assert!(call.signal_puffern(ServerMessage::error("1"), 2));
        assert!(call.signal_puffern(ServerMessage::error("2"), 2));
        assert!(!call.signal_puffern(ServerMessage::error("3"), 2));

        let puffer = call.puffer_leeren();
        assert_eq!(puffer, vec![ServerMessage::error("1"), ServerMessage::error("2")]);
        assert_eq!(call.gepufferte_anzahl(), 0);
    }
}
