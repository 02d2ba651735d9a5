//! REST-Platzhalter fuer Login, Nachrichten und Freunde
//!
//! Diese Endpunkte teilen sich den Port mit dem WebSocket, beruehren den
//! Signaling-Kern aber nicht. Es wird nichts gespeichert.

use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Basis-URL fuer generierte Avatare
const AVATAR_BASIS: &str = "https://api.dicebear.com/7.x/avataaars/svg?seed=";

/// Router mit allen `/api`-Routen
pub fn api_router() -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/messages", post(nachricht_anlegen))
        .route("/api/friends/:user_id", get(freunde_auflisten))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// `POST /api/auth/login` – akzeptiert jede nicht-leere Kombination
pub async fn login(body: Result<Json<LoginBody>, JsonRejection>) -> Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let username = body.username.filter(|u| !u.is_empty());
    let password = body.password.filter(|p| !p.is_empty());

    match (username, password) {
        (Some(name), Some(_)) => {
            let id = format!("user_{}", &Uuid::new_v4().simple().to_string()[..7]);
            let avatar = format!("{AVATAR_BASIS}{name}");
            tracing::debug!(user_id = %id, "Login (Platzhalter)");
            Json(json!({
                "success": true,
                "user": {
                    "id": id,
                    "name": name,
                    "avatar": avatar,
                    "status": "online",
                }
            }))
            .into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Invalid credentials" })),
        )
            .into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NachrichtBody {
    pub content: Option<Value>,
    pub sender_id: Option<Value>,
    pub recipient_id: Option<Value>,
}

/// `POST /api/messages` – gibt die Nachricht mit ID und Zeitstempel zurueck
pub async fn nachricht_anlegen(body: Result<Json<NachrichtBody>, JsonRejection>) -> Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let ist_privat = body.recipient_id.as_ref().is_some_and(wahrheitswert);

    Json(json!({
        "success": true,
        "message": {
            "id": Uuid::new_v4(),
            "senderId": body.sender_id,
            "recipientId": body.recipient_id,
            "content": body.content,
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "type": "text",
            "isPrivate": ist_privat,
        }
    }))
    .into_response()
}

/// `GET /api/friends/:user_id` – feste Beispielliste
pub async fn freunde_auflisten(Path(user_id): Path<String>) -> Response {
    tracing::debug!(user_id = %user_id, "Freundesliste (Platzhalter)");
    Json(json!({
        "success": true,
        "friends": [
            freund("1", "friend1", "Alex Johnson", "online", "alex", (2024, 1, 15)),
            freund("2", "friend2", "Sarah Chen", "busy", "sarah", (2024, 1, 10)),
        ]
    }))
    .into_response()
}

fn freund(
    id: &str,
    user_id: &str,
    name: &str,
    status: &str,
    seed: &str,
    (jahr, monat, tag): (i32, u32, u32),
) -> Value {
    let hinzugefuegt = NaiveDate::from_ymd_opt(jahr, monat, tag)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true));

    json!({
        "id": id,
        "user": {
            "id": user_id,
            "name": name,
            "status": status,
            "avatar": format!("{AVATAR_BASIS}{seed}"),
        },
        "status": "accepted",
        "addedAt": hinzugefuegt,
    })
}

/// JSON-Wert als Bedingung: null, false, 0 und "" zaehlen als nicht gesetzt
fn wahrheitswert(wert: &Value) -> bool {
    match wert {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
