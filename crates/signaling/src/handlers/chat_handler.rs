//! Chat-Handler – Oeffentliche und private Nachrichten zustellen
//!
//! Baut die Nachricht ueber den ChatService und liefert sie ueber die
//! Registry aus. Unabhaengig vom Call-Zustand.

use peerdial_chat::Zustellung;
use peerdial_core::event::SignalingEvent;
use peerdial_core::types::ConnectionId;
use peerdial_protocol::{ChatSendRequest, ServerMessage};

use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

/// `chat_message`
///
/// Oeffentlich: an alle Clients, der Absender erhaelt sie dabei selbst.
/// Privat: an den Empfaenger und als Echo an den Absender. Ist der
/// Empfaenger nicht verbunden, wird nichts zugestellt.
pub fn handle_chat_message(
    state: &SignalingState,
    absender: ConnectionId,
    anfrage: ChatSendRequest,
) -> SignalingResult<()> {
    let versand = state.chat_service.nachricht_erstellen(absender, anfrage)?;
    let message_id = versand.nachricht.id;
    let nachricht = ServerMessage::ChatMessage {
        message: versand.nachricht,
    };

    let empfaenger = {
        let vermittlung = state.vermittlung.lock();
        let registry = &vermittlung.registry;

        match versand.zustellung {
            Zustellung::Oeffentlich => registry.broadcast(&nachricht),
            Zustellung::Privat(empfaenger) => {
                if !registry.ist_offen(&empfaenger) {
                    tracing::debug!(
                        absender = %absender,
                        empfaenger = %empfaenger,
                        "Privater Empfaenger nicht verbunden"
                    );
                    return Err(SignalingError::RecipientOffline);
                }

                let mut zugestellt = usize::from(registry.senden(&empfaenger, nachricht.clone()));
                if empfaenger != absender {
                    zugestellt += usize::from(registry.senden(&absender, nachricht));
                }
                zugestellt
            }
        }
    };

    tracing::debug!(
        absender = %absender,
        message_id = %message_id,
        empfaenger,
        "Chat-Nachricht zugestellt"
    );

    state.presence.ereignis(SignalingEvent::ChatZugestellt {
        privat: versand.zustellung.ist_privat(),
        empfaenger,
    });
    Ok(())
}
