//! Prometheus-kompatible Metriken fuer Peerdial
//!
//! Registrierte Metriken:
//! - `peerdial_connected_clients` – Gauge: Aktuell verbundene Clients
//! - `peerdial_active_calls` – Gauge: Offene und verbundene Calls
//! - `peerdial_calls_total` – Counter: Call-Ereignisse (ergebnis)
//! - `peerdial_signals_relayed_total` – Counter: Weitergeleitete Offer/Answer/ICE
//! - `peerdial_chat_messages_total` – Counter: Zugestellte Chat-Nachrichten (art)
//! - `peerdial_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `peerdial_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit
//!
//! Die Signaling-Metriken werden ausschliesslich aus dem Ereignis-Kanal
//! gespeist (`ereignisse_verfolgen`).

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use peerdial_core::event::SignalingEvent;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Alle Peerdial-Prometheus-Metriken
#[derive(Clone)]
pub struct PeerdialMetrics {
    pub registry: Arc<Registry>,

    // Signaling-Metriken
    pub connected_clients: IntGauge,
    pub active_calls: IntGauge,
    pub calls_total: IntCounterVec,
    pub signals_relayed_total: IntCounter,
    pub chat_messages_total: IntCounterVec,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,

    /// Laeuft ein Task der den Ereignis-Kanal verfolgt?
    ereignisse_aktiv: Arc<AtomicBool>,
}

impl PeerdialMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Signaling-Metriken ---
        let connected_clients = IntGauge::with_opts(Opts::new(
            "peerdial_connected_clients",
            "Anzahl aktuell verbundener Clients",
        ))?;
        registry.register(Box::new(connected_clients.clone()))?;

        let active_calls = IntGauge::with_opts(Opts::new(
            "peerdial_active_calls",
            "Anzahl offener und verbundener Calls",
        ))?;
        registry.register(Box::new(active_calls.clone()))?;

        let calls_total = IntCounterVec::new(
            Opts::new("peerdial_calls_total", "Call-Ereignisse nach Ergebnis"),
            &["ergebnis"],
        )?;
        registry.register(Box::new(calls_total.clone()))?;

        let signals_relayed_total = IntCounter::with_opts(Opts::new(
            "peerdial_signals_relayed_total",
            "Weitergeleitete Offer/Answer/ICE-Nachrichten",
        ))?;
        registry.register(Box::new(signals_relayed_total.clone()))?;

        let chat_messages_total = IntCounterVec::new(
            Opts::new(
                "peerdial_chat_messages_total",
                "Zugestellte Chat-Nachrichten",
            ),
            &["art"],
        )?;
        registry.register(Box::new(chat_messages_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("peerdial_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "peerdial_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_clients,
            active_calls,
            calls_total,
            signals_relayed_total,
            chat_messages_total,
            http_requests_total,
            http_request_duration_seconds,
            ereignisse_aktiv: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Uebernimmt ein Signaling-Ereignis in die Metriken
    pub fn ereignis_verarbeiten(&self, ereignis: &SignalingEvent) {
        match ereignis {
            SignalingEvent::ClientVerbunden { anzahl, .. }
            | SignalingEvent::ClientGetrennt { anzahl, .. } => {
                self.connected_clients
                    .set(i64::try_from(*anzahl).unwrap_or(i64::MAX));
            }
            SignalingEvent::AnrufAngelegt { anzahl, .. } => {
                self.active_calls
                    .set(i64::try_from(*anzahl).unwrap_or(i64::MAX));
                self.calls_total.with_label_values(&["angelegt"]).inc();
            }
            SignalingEvent::AnrufVerbunden { .. } => {
                self.calls_total.with_label_values(&["verbunden"]).inc();
            }
            SignalingEvent::AnrufBeendet { grund, anzahl, .. } => {
                self.active_calls
                    .set(i64::try_from(*anzahl).unwrap_or(i64::MAX));
                self.calls_total
                    .with_label_values(&[grund.als_label()])
                    .inc();
            }
            SignalingEvent::SignalWeitergeleitet { .. } => {
                self.signals_relayed_total.inc();
            }
            SignalingEvent::ChatZugestellt { privat, .. } => {
                let art = if *privat { "privat" } else { "oeffentlich" };
                self.chat_messages_total.with_label_values(&[art]).inc();
            }
        }
    }

    /// Werden die Signaling-Gauges noch aus dem Ereignis-Kanal gespeist?
    pub fn ereignisse_aktiv(&self) -> bool {
        self.ereignisse_aktiv.load(Ordering::Acquire)
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Startet einen Task der den Ereignis-Kanal in die Metriken uebertraegt
///
/// Endet wenn alle Sender geschlossen sind. Verpasste Ereignisse
/// (Lagged) werden geloggt und uebersprungen; die Gauges tragen absolute
/// Werte und sind nach dem naechsten Ereignis wieder korrekt.
pub fn ereignisse_verfolgen(
    metriken: PeerdialMetrics,
    mut events: broadcast::Receiver<SignalingEvent>,
) -> JoinHandle<()> {
    metriken.ereignisse_aktiv.store(true, Ordering::Release);
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ereignis) => metriken.ereignis_verarbeiten(&ereignis),
                Err(broadcast::error::RecvError::Lagged(verpasst)) => {
                    tracing::warn!(verpasst, "Metriken hinken dem Ereignis-Kanal hinterher");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        metriken.ereignisse_aktiv.store(false, Ordering::Release);
        tracing::debug!("Metriken-Task beendet");
    })
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: PeerdialMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<PeerdialMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerdial_core::event::AnrufEnde;
    use peerdial_core::types::{CallId, ConnectionId};

    fn angelegt(call_id: &str, anzahl: usize) -> SignalingEvent {
        SignalingEvent::AnrufAngelegt {
            call_id: CallId::from(call_id),
            anrufer: ConnectionId::new(),
            eingeladen: ConnectionId::new(),
            anzahl,
        }
    }

    fn beendet(call_id: &str, grund: AnrufEnde, anzahl: usize) -> SignalingEvent {
        SignalingEvent::AnrufBeendet {
            call_id: CallId::from(call_id),
            grund,
            anzahl,
        }
    }

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = PeerdialMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn client_anzahl_folgt_ereignissen() {
        let metriken = PeerdialMetrics::neu().unwrap();
        let id = ConnectionId::new();
        metriken.ereignis_verarbeiten(&SignalingEvent::ClientVerbunden {
            connection_id: id,
            anzahl: 3,
        });
        assert_eq!(metriken.connected_clients.get(), 3);

        metriken.ereignis_verarbeiten(&SignalingEvent::ClientGetrennt {
            connection_id: id,
            anzahl: 2,
        });
        assert_eq!(metriken.connected_clients.get(), 2);
    }

    #[test]
    fn aktive_calls_zaehlen() {
        let metriken = PeerdialMetrics::neu().unwrap();
        metriken.ereignis_verarbeiten(&angelegt("x", 1));
        metriken.ereignis_verarbeiten(&angelegt("y", 2));
        metriken.ereignis_verarbeiten(&SignalingEvent::AnrufVerbunden {
            call_id: CallId::from("x"),
        });
        assert_eq!(metriken.active_calls.get(), 2);

        metriken.ereignis_verarbeiten(&beendet("x", AnrufEnde::Aufgelegt, 1));
        assert_eq!(metriken.active_calls.get(), 1);
        assert_eq!(
            metriken.calls_total.with_label_values(&["verbunden"]).get(),
            1
        );
    }

    #[test]
    fn kein_partner_aendert_aktive_calls_nicht() {
        let metriken = PeerdialMetrics::neu().unwrap();
        metriken.ereignis_verarbeiten(&beendet("x", AnrufEnde::KeinPartner, 0));
        assert_eq!(metriken.active_calls.get(), 0);
        assert_eq!(
            metriken
                .calls_total
                .with_label_values(&["kein_partner"])
                .get(),
            1
        );
    }

    #[test]
    fn aktive_calls_folgen_absoluter_anzahl() {
        let metriken = PeerdialMetrics::neu().unwrap();
        // Beendet vor Angelegt (z.B. nach Lagged): die Gauge uebernimmt
        // immer den mitgelieferten Stand
        metriken.ereignis_verarbeiten(&beendet("x", AnrufEnde::Aufgelegt, 0));
        assert_eq!(metriken.active_calls.get(), 0);

        metriken.ereignis_verarbeiten(&angelegt("y", 3));
        assert_eq!(metriken.active_calls.get(), 3);

        metriken.ereignis_verarbeiten(&beendet("y", AnrufEnde::Getrennt, 2));
        assert_eq!(metriken.active_calls.get(), 2);
    }

    #[test]
    fn chat_und_signale_zaehlen() {
        let metriken = PeerdialMetrics::neu().unwrap();
        metriken.ereignis_verarbeiten(&SignalingEvent::ChatZugestellt {
            privat: true,
            empfaenger: 1,
        });
        metriken.ereignis_verarbeiten(&SignalingEvent::ChatZugestellt {
            privat: false,
            empfaenger: 5,
        });
        metriken.ereignis_verarbeiten(&SignalingEvent::SignalWeitergeleitet {
            call_id: CallId::from("x"),
        });

        assert_eq!(
            metriken.chat_messages_total.with_label_values(&["privat"]).get(),
            1
        );
        assert_eq!(
            metriken
                .chat_messages_total
                .with_label_values(&["oeffentlich"])
                .get(),
            1
        );
        assert_eq!(metriken.signals_relayed_total.get(), 1);
    }

    #[test]
    fn http_counter_mit_labels() {
        let metriken = PeerdialMetrics::neu().unwrap();
        metriken
            .http_requests_total
            .with_label_values(&["GET", "/health", "200"])
            .inc();
        let wert = metriken
            .http_requests_total
            .with_label_values(&["GET", "/health", "200"])
            .get();
        assert_eq!(wert, 1);
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let metriken = PeerdialMetrics::neu().unwrap();
        metriken.connected_clients.set(5);
        metriken.signals_relayed_total.inc();

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("peerdial_connected_clients 5"));
        assert!(output.contains("peerdial_signals_relayed_total 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[tokio::test]
    async fn ereignis_task_verarbeitet_kanal() {
        let metriken = PeerdialMetrics::neu().unwrap();
        let (tx, rx) = broadcast::channel(16);
        assert!(!metriken.ereignisse_aktiv());
        let task = ereignisse_verfolgen(metriken.clone(), rx);
        assert!(metriken.ereignisse_aktiv());

        tx.send(angelegt("x", 1)).unwrap();
        tx.send(SignalingEvent::ClientVerbunden {
            connection_id: ConnectionId::new(),
            anzahl: 7,
        })
        .unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(metriken.active_calls.get(), 1);
        assert_eq!(metriken.connected_clients.get(), 7);
        assert!(!metriken.ereignisse_aktiv());
    }
}
