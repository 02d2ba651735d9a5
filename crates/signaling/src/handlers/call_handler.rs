//! Call-Handler – Anruf ankuendigen, annehmen, auflegen
//!
//! Alle Schritte einer Operation laufen unter dem Vermittlungs-Lock. Damit
//! ist das Annehmen atomar zur Frei-Pruefung des Matchers und eine
//! Verbindung kann nie zwei Calls gleichzeitig angehoeren. Auch die
//! Call-Ereignisse werden unter dem Lock veroeffentlicht: ihre Reihenfolge
//! im Kanal entspricht der Reihenfolge der Zustandsaenderungen.

use peerdial_core::event::{AnrufEnde, SignalingEvent};
use peerdial_core::types::{CallId, ConnectionId};
use peerdial_protocol::ServerMessage;

use crate::call_table::CallZustand;
use crate::error::{SignalingError, SignalingResult};
use crate::matcher;
use crate::server_state::{SignalingState, Vermittlung};

/// `incoming_call`: Call anlegen und ersten freien Client einladen
pub fn handle_incoming_call(
    state: &SignalingState,
    anrufer: ConnectionId,
    call_id: CallId,
) -> SignalingResult<()> {
    let mut vermittlung = state.vermittlung.lock();

    match matcher::find_peer_for(&mut vermittlung, anrufer, &call_id) {
        Ok(eingeladen) => {
            state.presence.ereignis(SignalingEvent::AnrufAngelegt {
                call_id,
                anrufer,
                eingeladen,
                anzahl: vermittlung.calls.anzahl(),
            });
            Ok(())
        }
        Err(SignalingError::NoAvailablePeer) => {
            tracing::info!(call_id = %call_id, anrufer = %anrufer, "Kein freier Gegenpart");
            state.presence.ereignis(SignalingEvent::AnrufBeendet {
                call_id,
                grund: AnrufEnde::KeinPartner,
                anzahl: vermittlung.calls.anzahl(),
            });
            Err(SignalingError::NoAvailablePeer)
        }
        Err(e) => Err(e),
    }
}

/// `accept_call`: Eingeladenen als Angerufenen eintragen
///
/// Der Anrufer erhaelt `call_joined`, alle anderen freien Clients
/// `call_taken`. Ist der Eingeladene inzwischen in einem anderen Call,
/// bekommt er selbst `call_taken` und der Call bleibt offen.
pub fn handle_accept_call(
    state: &SignalingState,
    angerufener: ConnectionId,
    call_id: CallId,
) -> SignalingResult<()> {
    {
        let mut vermittlung = state.vermittlung.lock();
        let Vermittlung { registry, calls } = &mut *vermittlung;

        let eingeladen = calls
            .get(&call_id)
            .filter(|call| call.zustand() == CallZustand::Offen)
            .and_then(|call| call.eingeladen);
        if eingeladen != Some(angerufener) {
            return Err(SignalingError::CallNotFound(call_id));
        }

        if !registry.ist_frei(&angerufener) {
            tracing::warn!(
                call_id = %call_id,
                connection_id = %angerufener,
                "Angenommen, aber bereits in einem anderen Call"
            );
            return Err(SignalingError::CallTaken(call_id));
        }

        let call = calls.attach_callee(&call_id, angerufener)?;
        let anrufer = call.anrufer;
        let gepuffert = call.puffer_leeren();
        registry.call_setzen(&angerufener, Some(call_id.clone()));

        registry.senden(
            &anrufer,
            ServerMessage::CallJoined {
                call_id: call_id.clone(),
            },
        );

        if !gepuffert.is_empty() {
            tracing::debug!(
                call_id = %call_id,
                anzahl = gepuffert.len(),
                "Gepufferte Signale werden zugestellt"
            );
        }
        for signal in gepuffert {
            registry.senden(&angerufener, signal);
        }

        registry.senden_an_alle_mit(
            &ServerMessage::CallTaken {
                call_id: call_id.clone(),
            },
            |id, aktueller_call| {
                *id != anrufer && *id != angerufener && aktueller_call.is_none()
            },
        );

        tracing::info!(
            call_id = %call_id,
            anrufer = %anrufer,
            angerufener = %angerufener,
            "Call verbunden"
        );

        state
            .presence
            .ereignis(SignalingEvent::AnrufVerbunden { call_id });
    }
    Ok(())
}

/// `hangup`: Call beenden und Gegenpart benachrichtigen
///
/// Unbekannte Calls und Nicht-Teilnehmer werden still ignoriert. Der
/// Eingeladene darf einen offenen Call ablehnen.
pub fn handle_hangup(
    state: &SignalingState,
    absender: ConnectionId,
    call_id: CallId,
) -> SignalingResult<()> {
    {
        let mut vermittlung = state.vermittlung.lock();
        let Vermittlung { registry, calls } = &mut *vermittlung;

        let darf_auflegen = calls.get(&call_id).is_some_and(|call| {
            call.ist_teilnehmer(&absender)
                || (call.zustand() == CallZustand::Offen && call.eingeladen == Some(absender))
        });
        if !darf_auflegen {
            tracing::debug!(call_id = %call_id, absender = %absender, "Hangup ignoriert");
            return Ok(());
        }

        let Some(call) = calls.remove(&call_id) else {
            return Ok(());
        };

        registry.call_loesen(&call.anrufer, &call_id);
        if let Some(angerufener) = call.angerufener {
            registry.call_loesen(&angerufener, &call_id);
        }

        let gegenpart = if absender == call.anrufer {
            call.angerufener.or(call.eingeladen)
        } else {
            Some(call.anrufer)
        };
        if let Some(gegenpart) = gegenpart {
            registry.senden(
                &gegenpart,
                ServerMessage::Hangup {
                    call_id: call_id.clone(),
                },
            );
        }

        tracing::info!(call_id = %call_id, absender = %absender, "Aufgelegt");

        state.presence.ereignis(SignalingEvent::AnrufBeendet {
            call_id,
            grund: AnrufEnde::Aufgelegt,
            anzahl: calls.anzahl(),
        });
    }
    Ok(())
}

/// Beim Trennen: alle Calls der Verbindung aufloesen
///
/// Jeder verbliebene Gegenpart erhaelt `peer_disconnected`. Muss unter dem
/// Vermittlungs-Lock laufen, bevor die Verbindung abgemeldet wird.
pub fn calls_aufloesen(vermittlung: &mut Vermittlung, connection_id: &ConnectionId) -> Vec<CallId> {
    let Vermittlung { registry, calls } = vermittlung;

    calls
        .remove_all_for(connection_id)
        .into_iter()
        .map(|(call_id, gegenpart)| {
            if let Some(gegenpart) = gegenpart {
                registry.call_loesen(&gegenpart, &call_id);
                registry.senden(
                    &gegenpart,
                    ServerMessage::PeerDisconnected {
                        call_id: call_id.clone(),
                    },
                );
            }
            registry.call_loesen(connection_id, &call_id);
            tracing::info!(
                call_id = %call_id,
                connection_id = %connection_id,
                "Call durch Verbindungsabbruch beendet"
            );
            call_id
        })
        .collect()
}
