//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Registry und Call-Tabelle liegen gemeinsam hinter einem einzigen Mutex.
//! Jede Operation die beide beruehrt (Matcher, Annehmen, Auflegen,
//! Aufraeumen) laeuft vollstaendig unter diesem Lock. Gesendet wird nur
//! ueber `try_send`, daher wird unter dem Lock nie auf Netzwerk-I/O gewartet.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use peerdial_chat::ChatService;
use peerdial_core::types::ConnectionId;
use peerdial_protocol::ServerMessage;
use tokio::sync::mpsc;

use crate::call_table::CallTable;
use crate::presence::PresenceNotifier;
use crate::registry::ConnectionRegistry;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Kapazitaet der Send-Queue pro Client
    pub send_queue_groesse: usize,
    /// Signale des Anrufers puffern bis jemand annimmt
    pub signale_puffern: bool,
    /// Obergrenze fuer gepufferte Signale pro Call
    pub max_gepufferte_signale: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            send_queue_groesse: 64,
            signale_puffern: false,
            max_gepufferte_signale: 32,
        }
    }
}

/// Registry und Call-Tabelle, gemeinsam gesperrt
#[derive(Debug, Default)]
pub struct Vermittlung {
    pub registry: ConnectionRegistry,
    pub calls: CallTable,
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Signaling-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Registry + Call-Tabelle (einziger Serialisierungspunkt)
    pub vermittlung: Mutex<Vermittlung>,
    /// Chat-Service (Nachrichten aufbauen)
    pub chat_service: Arc<ChatService>,
    /// Presence-Notifier und Event-Quelle
    pub presence: PresenceNotifier,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, chat_service: Arc<ChatService>) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            vermittlung: Mutex::new(Vermittlung::default()),
            chat_service,
            presence: PresenceNotifier::neu(),
            start_time: Instant::now(),
        })
    }

    /// Registriert eine neue Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Alle Clients (inklusive des neuen) erhalten die neue Anzahl.
    pub fn client_registrieren(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.config.send_queue_groesse.max(1));

        let mut vermittlung = self.vermittlung.lock();
        let connection_id = vermittlung.registry.register(tx);
        self.presence
            .client_verbunden(&vermittlung.registry, connection_id);

        (connection_id, rx)
    }

    /// Anzahl registrierter Verbindungen
    pub fn online_anzahl(&self) -> usize {
        self.vermittlung.lock().registry.count()
    }

    /// Anzahl aktiver Calls (offen und verbunden)
    pub fn aktive_calls(&self) -> usize {
        self.vermittlung.lock().calls.anzahl()
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
