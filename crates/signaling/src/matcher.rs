//! Call-Matcher – Sucht fuer einen Anrufer einen freien Gegenpart
//!
//! First-Fit: der erste freie Client in Registrierungsreihenfolge wird
//! eingeladen. Clients die bereits an einem Call teilnehmen werden nie
//! gestoert.

use peerdial_core::types::{CallId, ConnectionId};
use peerdial_protocol::ServerMessage;

use crate::error::{SignalingError, SignalingResult};
use crate::server_state::Vermittlung;

/// Legt den Call an und laedt den ersten freien Client ein
///
/// Gibt die eingeladene Verbindung zurueck. Findet sich niemand, wird der
/// Call wieder entfernt und [`SignalingError::NoAvailablePeer`] geliefert.
pub fn find_peer_for(
    vermittlung: &mut Vermittlung,
    anrufer: ConnectionId,
    call_id: &CallId,
) -> SignalingResult<ConnectionId> {
    let Vermittlung { registry, calls } = vermittlung;

    if !registry.ist_frei(&anrufer) {
        return Err(SignalingError::AlreadyInCall);
    }

    calls.create(call_id.clone(), anrufer)?;
    registry.call_setzen(&anrufer, Some(call_id.clone()));

    let kandidat = registry
        .offene_in_reihenfolge()
        .find(|id| *id != anrufer && registry.ist_frei(id));

    let Some(eingeladen) = kandidat else {
        calls.remove(call_id);
        registry.call_loesen(&anrufer, call_id);
        return Err(SignalingError::NoAvailablePeer);
    };

    if let Some(call) = calls.get_mut(call_id) {
        call.eingeladen = Some(eingeladen);
    }

    registry.senden(
        &eingeladen,
        ServerMessage::IncomingCall {
            call_id: call_id.clone(),
            from: anrufer,
        },
    );

    tracing::info!(
        call_id = %call_id,
        anrufer = %anrufer,
        eingeladen = %eingeladen,
        "Gegenpart eingeladen"
    );

    Ok(eingeladen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn verbinden(
        vermittlung: &mut Vermittlung,
    ) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(8);
        (vermittlung.registry.register(tx), rx)
    }

    #[tokio::test]
    async fn erster_freier_wird_eingeladen() {
        let mut v = Vermittlung::default();
        let (a, _rxa) = verbinden(&mut v);
        let (b, mut rxb) = verbinden(&mut v);
        let (_c, mut rxc) = verbinden(&mut v);

        let x = CallId::from("x");
        assert_eq!(find_peer_for(&mut v, a, &x).unwrap(), b);

        assert_eq!(
            rxb.try_recv().unwrap(),
            ServerMessage::IncomingCall {
                call_id: x.clone(),
                from: a
            }
        );
        assert!(rxc.try_recv().is_err(), "nur der erste freie wird eingeladen");
        assert_eq!(v.calls.get(&x).unwrap().eingeladen, Some(b));
        assert_eq!(v.registry.aktueller_call(&a), Some(&x));
    }

    #[tokio::test]
    async fn teilnehmer_werden_uebersprungen() {
        let mut v = Vermittlung::default();
        let (a, _rxa) = verbinden(&mut v);
        let (b, _rxb) = verbinden(&mut v);
        let (c, _rxc) = verbinden(&mut v);
        let (d, _rxd) = verbinden(&mut v);

        // a und b telefonieren bereits
        let x = CallId::from("x");
        find_peer_for(&mut v, a, &x).unwrap();
        v.calls.attach_callee(&x, b).unwrap();
        v.registry.call_setzen(&b, Some(x));

        assert_eq!(find_peer_for(&mut v, c, &CallId::from("y")).unwrap(), d);
    }

    #[tokio::test]
    async fn niemand_frei() {
        let mut v = Vermittlung::default();
        let (a, _rxa) = verbinden(&mut v);

        let x = CallId::from("x");
        assert_eq!(
            find_peer_for(&mut v, a, &x).unwrap_err(),
            SignalingError::NoAvailablePeer
        );
        assert!(v.calls.get(&x).is_none(), "Call-Eintrag wird verworfen");
        assert!(v.registry.ist_frei(&a));
    }

    #[tokio::test]
    async fn geschlossene_verbindungen_zaehlen_nicht() {
        let mut v = Vermittlung::default();
        let (a, _rxa) = verbinden(&mut v);
        let (_b, rxb) = verbinden(&mut v);
        drop(rxb);

        assert_eq!(
            find_peer_for(&mut v, a, &CallId::from("x")).unwrap_err(),
            SignalingError::NoAvailablePeer
        );
    }

    #[tokio::test]
    async fn anrufer_im_call_wird_abgewiesen() {
        let mut v = Vermittlung::default();
        let (a, _rxa) = verbinden(&mut v);
        let (_b, _rxb) = verbinden(&mut v);
        let (_c, _rxc) = verbinden(&mut v);

        find_peer_for(&mut v, a, &CallId::from("x")).unwrap();
        assert_eq!(
            find_peer_for(&mut v, a, &CallId::from("y")).unwrap_err(),
            SignalingError::AlreadyInCall
        );
    }

    #[tokio::test]
    async fn doppelte_call_id() {
        let mut v = Vermittlung::default();
        let (a, _rxa) = verbinden(&mut v);
        let (_b, _rxb) = verbinden(&mut v);
        let (c, _rxc) = verbinden(&mut v);

        let x = CallId::from("x");
        find_peer_for(&mut v, a, &x).unwrap();
        assert_eq!(
            find_peer_for(&mut v, c, &x).unwrap_err(),
            SignalingError::CallIdInUse(x.clone())
        );
        assert_eq!(v.calls.get(&x).unwrap().anrufer, a);
        assert!(v.registry.ist_frei(&c));
    }
}
