//! Request-Timing Middleware fuer Axum
//!
//! Misst die Antwortzeit jeder HTTP-Anfrage, protokolliert sie als
//! strukturiertes Log-Event und fuellt die HTTP-Metriken.

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    middleware::Next,
};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::PeerdialMetrics;

/// Zustand der Timing-Middleware
#[derive(Clone)]
pub struct TimingState {
    pub metriken: PeerdialMetrics,
    /// Konfigurierter WebSocket-Pfad, wird als eigenes Label gefuehrt
    pub ws_pfad: Arc<str>,
}

impl TimingState {
    pub fn neu(metriken: PeerdialMetrics, ws_pfad: &str) -> Self {
        Self {
            metriken,
            ws_pfad: Arc::from(ws_pfad),
        }
    }
}

/// Erstellt den Tower-Layer fuer Request-Tracing.
pub fn request_timing_layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    use tower_http::trace::TraceLayer;
    TraceLayer::new_for_http()
}

/// Axum-Middleware-Funktion: misst Antwortzeit, loggt und zaehlt.
///
/// Verwendung:
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn_with_state(
///         TimingState::neu(metriken, "/ws"),
///         timing_middleware,
///     ))
/// ```
pub async fn timing_middleware(
    State(TimingState { metriken, ws_pfad }): State<TimingState>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let methode = req.method().to_string();
    let pfad = pfad_label(req.uri().path(), &ws_pfad);
    let start = Instant::now();

    let response = next.run(req).await;

    let dauer = start.elapsed();
    let status = response.status().as_u16();

    metriken
        .http_requests_total
        .with_label_values(&[&methode, pfad, &status.to_string()])
        .inc();
    metriken
        .http_request_duration_seconds
        .with_label_values(&[&methode, pfad])
        .observe(dauer.as_secs_f64());

    tracing::info!(
        method = %methode,
        path = %pfad,
        status = status,
        duration_ms = dauer.as_millis(),
        "HTTP-Anfrage abgeschlossen"
    );

    response
}

/// Bekannte Routen behalten ihren Pfad, alles andere (statische Dateien)
/// landet unter `other`.
pub fn pfad_label<'a>(pfad: &str, ws_pfad: &'a str) -> &'a str {
    match pfad {
        p if p == ws_pfad => ws_pfad,
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/api/auth/login" => "/api/auth/login",
        "/api/messages" => "/api/messages",
        p if p.starts_with("/api/friends/") => "/api/friends",
        _ => "other",
    }
}
