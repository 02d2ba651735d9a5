//! Presence-Notifier – Verteilt die Anzahl verbundener Clients
//!
//! Jede Registrierung und jede Abmeldung fuehrt zu genau einer
//! `user_count`-Nachricht an alle Clients. Es wird nicht entprellt.
//!
//! Zusaetzlich veroeffentlicht der Notifier alle [`SignalingEvent`]s ueber
//! einen broadcast-Kanal, den Metriken und Tests abonnieren.

use peerdial_core::event::SignalingEvent;
use peerdial_core::types::ConnectionId;
use peerdial_protocol::ServerMessage;
use tokio::sync::broadcast;

use crate::registry::ConnectionRegistry;

/// Kapazitaet des Event-Kanals
const EVENT_KANAL_GROESSE: usize = 256;

/// Presence-Notifier und Event-Quelle des Signaling-Kerns
#[derive(Debug, Clone)]
pub struct PresenceNotifier {
    event_tx: broadcast::Sender<SignalingEvent>,
}

impl PresenceNotifier {
    pub fn neu() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_KANAL_GROESSE);
        Self { event_tx }
    }

    /// Nach `register`: neue Anzahl an alle (inklusive des Neuen)
    pub fn client_verbunden(&self, registry: &ConnectionRegistry, connection_id: ConnectionId) {
        let anzahl = self.anzahl_verteilen(registry);
        self.ereignis(SignalingEvent::ClientVerbunden {
            connection_id,
            anzahl,
        });
    }

    /// Nach `unregister`: neue Anzahl an alle verbleibenden
    pub fn client_getrennt(&self, registry: &ConnectionRegistry, connection_id: ConnectionId) {
        let anzahl = self.anzahl_verteilen(registry);
        self.ereignis(SignalingEvent::ClientGetrennt {
            connection_id,
            anzahl,
        });
    }

    /// Sendet `user_count` an alle offenen Verbindungen und gibt die Anzahl zurueck
    pub fn anzahl_verteilen(&self, registry: &ConnectionRegistry) -> usize {
        let anzahl = registry.count();
        let erreicht = registry.broadcast(&ServerMessage::UserCount { count: anzahl });
        tracing::debug!(anzahl, erreicht, "Client-Anzahl verteilt");
        anzahl
    }

    /// Veroeffentlicht ein Ereignis; ohne Abonnenten geht es verloren
    pub fn ereignis(&self, ereignis: SignalingEvent) {
        let _ = self.event_tx.send(ereignis);
    }

    /// Abonniert alle Signaling-Ereignisse
    pub fn events_abonnieren(&self) -> broadcast::Receiver<SignalingEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for PresenceNotifier {
    fn default() -> Self {
        Self::neu()
    }
}
