//! Relay-Handler – Offer/Answer/ICE an den Gegenpart weiterreichen
//!
//! Der Server prueft keine WebRTC-Semantik. Er stellt nur sicher, dass der
//! Absender Teilnehmer des genannten Calls ist und dass es sein aktueller
//! Call ist. Alles andere wird still verworfen.

use peerdial_core::event::SignalingEvent;
use peerdial_core::types::{CallId, ConnectionId};
use peerdial_protocol::{ServerMessage, SignalArt};
use serde_json::{Map, Value};

use crate::error::SignalingResult;
use crate::server_state::{SignalingState, Vermittlung};

/// Was mit einem Signal passiert ist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayErgebnis {
    Weitergeleitet,
    Gepuffert,
    Verworfen,
}

/// `offer` / `answer` / `ice-candidate`
pub fn handle_signal(
    state: &SignalingState,
    absender: ConnectionId,
    art: SignalArt,
    call_id: CallId,
    felder: Map<String, Value>,
) -> SignalingResult<RelayErgebnis> {
    let ergebnis = {
        let mut vermittlung = state.vermittlung.lock();
        let Vermittlung { registry, calls } = &mut *vermittlung;

        if registry.aktueller_call(&absender) != Some(&call_id) {
            tracing::debug!(
                call_id = %call_id,
                absender = %absender,
                signal = art.typ(),
                "Signal fuer fremden Call verworfen"
            );
            return Ok(RelayErgebnis::Verworfen);
        }

        let Some(call) = calls.get_mut(&call_id) else {
            return Ok(RelayErgebnis::Verworfen);
        };

        let signal = ServerMessage::signal(art, felder);
        match call.gegenpart(&absender) {
            Some(gegenpart) => {
                registry.senden(&gegenpart, signal);
                RelayErgebnis::Weitergeleitet
            }
            None if state.config.signale_puffern && call.anrufer == absender => {
                if call.signal_puffern(signal, state.config.max_gepufferte_signale) {
                    RelayErgebnis::Gepuffert
                } else {
                    tracing::warn!(call_id = %call_id, "Signal-Puffer voll – Signal verworfen");
                    RelayErgebnis::Verworfen
                }
            }
            None => RelayErgebnis::Verworfen,
        }
    };

    tracing::debug!(
        call_id = %call_id,
        absender = %absender,
        signal = art.typ(),
        ergebnis = ?ergebnis,
        "Signal verarbeitet"
    );

    if ergebnis == RelayErgebnis::Weitergeleitet {
        state
            .presence
            .ereignis(SignalingEvent::SignalWeitergeleitet { call_id });
    }
    Ok(ergebnis)
}
