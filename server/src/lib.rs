//! peerdial-server – Bibliotheks-Root
//!
//! Setzt Signaling-Kern, REST-Platzhalter, statische UI und Observability
//! zu einem lauffaehigen Server zusammen und stellt den Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod api;
pub mod config;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use axum::Router;
use config::ServerConfig;
use peerdial_chat::ChatService;
use peerdial_observability::{
    ereignisse_verfolgen, observability_server_starten, request_timing_layer, timing_middleware,
    HealthState, PeerdialMetrics, TimingState,
};
use peerdial_signaling::{signaling_router, SignalingState};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
    pub state: Arc<SignalingState>,
    pub metriken: PeerdialMetrics,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Result<Self> {
        let state = SignalingState::neu(config.signaling_config(), ChatService::neu());
        let metriken = PeerdialMetrics::neu().context("Metriken konnten nicht registriert werden")?;
        Ok(Self {
            config,
            state,
            metriken,
        })
    }

    /// Baut den HTTP-Router: WebSocket, `/api`, statische UI
    pub fn app(&self, shutdown_rx: watch::Receiver<bool>) -> Router {
        let mut app = signaling_router(
            Arc::clone(&self.state),
            &self.config.netzwerk.ws_pfad,
            shutdown_rx,
        )
        .merge(api::api_router());

        if let Some(verzeichnis) = &self.config.ui.verzeichnis {
            let index = Path::new(verzeichnis).join("index.html");
            app = app.fallback_service(ServeDir::new(verzeichnis).not_found_service(ServeFile::new(index)));
        }

        app.layer(axum::middleware::from_fn_with_state(
            TimingState::neu(self.metriken.clone(), &self.config.netzwerk.ws_pfad),
            timing_middleware,
        ))
        .layer(request_timing_layer())
        .layer(cors_layer(&self.config.netzwerk.cors_origins))
    }

    /// Startet alle Subsysteme und laeuft bis Ctrl-C / SIGTERM
    pub async fn starten(self) -> Result<()> {
        let adresse = self.config.http_bind_adresse();
        let listener = TcpListener::bind(&adresse)
            .await
            .with_context(|| format!("Adresse {adresse} konnte nicht gebunden werden"))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
            let _ = shutdown_tx.send(true);
        });

        self.mit_listener(listener, shutdown_rx).await
    }

    /// Betreibt den Server auf einem bereits gebundenen Listener
    ///
    /// Endet sobald `shutdown_rx` `true` meldet und alle HTTP-Verbindungen
    /// abgeschlossen sind. WebSocket-Tasks trennen sich selbst und raeumen
    /// ihre Calls auf.
    pub async fn mit_listener(
        self,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<()> {
        let lokale_adresse = listener.local_addr()?;

        let metriken_task =
            ereignisse_verfolgen(self.metriken.clone(), self.state.presence.events_abonnieren());

        if self.config.observability.aktiviert {
            match self.config.observability_bind_adresse().parse::<SocketAddr>() {
                Ok(bind_addr) => {
                    let metriken = self.metriken.clone();
                    let health = HealthState::neu(self.metriken.clone());
                    let rx = shutdown_rx.clone();
                    tokio::spawn(async move {
                        if let Err(e) =
                            observability_server_starten(bind_addr, metriken, health, rx).await
                        {
                            tracing::error!(fehler = %e, "Observability-Server beendet");
                        }
                    });
                }
                Err(e) => tracing::error!(fehler = %e, "Ungueltige Observability-Adresse"),
            }
        }

        let app = self.app(shutdown_rx.clone());

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %lokale_adresse,
            ws_pfad = %self.config.netzwerk.ws_pfad,
            ui = ?self.config.ui.verzeichnis,
            "Server laeuft"
        );

        let mut rx = shutdown_rx;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    break;
                }
            }
        })
        .await?;

        metriken_task.abort();
        tracing::info!(
            verbleibend = self.state.online_anzahl(),
            "Server beendet"
        );
        Ok(())
    }
}

/// CORS: leere Liste erlaubt alle Origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

/// Wartet auf Ctrl-C oder (unter Unix) SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(fehler = %e, "SIGTERM-Handler konnte nicht installiert werden");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = sigterm => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn server_ohne_observability() -> Server {
        let mut config = ServerConfig::default();
        config.observability.aktiviert = false;
        Server::neu(config).unwrap()
    }

    #[tokio::test]
    async fn unbekannter_pfad_ohne_ui_ist_404() {
        let server = server_ohne_observability();
        let (_tx, rx) = watch::channel(false);
        let response = server
            .app(rx)
            .oneshot(Request::builder().uri("/irgendwo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_pfad_ohne_upgrade_wird_abgelehnt() {
        let server = server_ohne_observability();
        let (_tx, rx) = watch::channel(false);
        let response = server
            .app(rx)
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn cors_erlaubt_konfigurierte_origin() {
        let mut config = ServerConfig::default();
        config.observability.aktiviert = false;
        config.netzwerk.cors_origins = vec!["https://peerdial.example".into()];
        let server = Server::neu(config).unwrap();
        let (_tx, rx) = watch::channel(false);

        let response = server
            .app(rx)
            .oneshot(
                Request::builder()
                    .uri("/api/friends/x")
                    .header("origin", "https://peerdial.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://peerdial.example"
        );
    }

    #[tokio::test]
    async fn api_anfragen_werden_gezaehlt() {
        let server = server_ohne_observability();
        let metriken = server.metriken.clone();
        let (_tx, rx) = watch::channel(false);

        server
            .app(rx)
            .oneshot(Request::builder().uri("/api/friends/x").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            metriken
                .http_requests_total
                .with_label_values(&["GET", "/api/friends", "200"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn eigener_ws_pfad_wird_als_label_gefuehrt() {
        let mut config = ServerConfig::default();
        config.observability.aktiviert = false;
        config.netzwerk.ws_pfad = "/signal".into();
        let server = Server::neu(config).unwrap();
        let metriken = server.metriken.clone();
        let (_tx, rx) = watch::channel(false);

        let response = server
            .app(rx)
            .oneshot(Request::builder().uri("/signal").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status().as_u16().to_string();

        assert_eq!(
            metriken
                .http_requests_total
                .with_label_values(&["GET", "/signal", &status])
                .get(),
            1
        );
        assert_eq!(
            metriken
                .http_requests_total
                .with_label_values(&["GET", "other", &status])
                .get(),
            0
        );
    }
}
