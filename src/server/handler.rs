//! HTTP handlers for the memory service
//!
//! - GET  /health      liveness and backend flags
//! - GET  /gates       gate registry
//! - GET  /memory      recent reflections, newest first (`?limit=N`)
//! - POST /memory      store a reflection
//! - POST /tolls       record a toll transaction
//! - POST /tolls/pay   create (or simulate) a toll payment
//!
//! Request bodies are read leniently: a missing or unparsable body is
//! treated like an empty object and rejected by the field checks.

use super::payments::PaymentIntent;
use super::{ServerState, SERVICE_NAME};
use crate::error::Error;
use crate::remote::types::*;
use crate::time::{now_millis, parse_millis};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rand::Rng;
use serde::Deserialize;

/// `/health` and `/gates`
pub fn service_router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/gates", get(list_gates))
        .with_state(state)
}

/// `/memory`
pub fn memory_router(state: ServerState) -> Router {
    Router::new()
        .route("/memory", get(list_memory).post(create_memory))
        .with_state(state)
}

/// `/tolls` and `/tolls/pay`
pub fn tolls_router(state: ServerState) -> Router {
    Router::new()
        .route("/tolls", post(create_toll))
        .route("/tolls/pay", post(pay_toll))
        .with_state(state)
}

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListMemoryQuery {
    limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMemoryRequest {
    text: Option<serde_json::Value>,
    tone: Option<String>,
    ts: Option<serde_json::Value>,
    device_id: Option<String>,
    division: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTollRequest {
    gate: Option<String>,
    amount: Option<serde_json::Value>,
    currency: Option<String>,
    device_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PayTollRequest {
    gate: Option<String>,
    amount: Option<serde_json::Value>,
    currency: Option<String>,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health
async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    Json(HealthStatus {
        ok: true,
        service: Some(SERVICE_NAME.to_string()),
        ts: now_millis(),
        db: false,
        stripe: state.payments.is_some(),
    })
}

/// GET /gates
async fn list_gates(State(state): State<ServerState>) -> impl IntoResponse {
    Json(GatesResponse {
        gates: state.gates.as_ref().clone(),
    })
}

/// GET /memory
async fn list_memory(
    State(state): State<ServerState>,
    Query(params): Query<ListMemoryQuery>,
) -> impl IntoResponse {
    let limit = parse_limit(
        params.limit.as_deref(),
        state.limits.default_limit,
        state.limits.max_limit,
    );
    Json(MemoryList {
        items: state.memory.recent(limit).await,
    })
}

/// POST /memory
async fn create_memory(
    State(state): State<ServerState>,
    body: Option<Json<CreateMemoryRequest>>,
) -> Response {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let Some(text) = request.text.as_ref().and_then(present_text) else {
        return bad_request("Missing text");
    };

    let tone = request
        .tone
        .as_deref()
        .and_then(|t| t.parse().ok())
        .unwrap_or_else(|| state.classifier.classify(&text));

    let entry = MemoryItem {
        text: text.chars().take(state.limits.max_text_len).collect(),
        tone,
        ts: request.ts.as_ref().and_then(coerce_millis).unwrap_or_else(now_millis),
        device_id: Some(non_empty(request.device_id).unwrap_or_else(|| "web".to_string())),
        division: non_empty(request.division),
        location: non_empty(request.location),
    };

    if let Err(e) = state.memory.append(entry.clone()).await {
        tracing::error!("Failed to store reflection: {}", e);
        return internal_error(e);
    }

    tracing::debug!(tone = %entry.tone, division = ?entry.division, "Stored reflection");
    Json(SavedMemory {
        saved: true,
        entry,
        db: false,
    })
    .into_response()
}

/// POST /tolls
async fn create_toll(
    State(state): State<ServerState>,
    body: Option<Json<CreateTollRequest>>,
) -> Response {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let Some(gate) = non_empty(request.gate) else {
        return bad_request("gate required");
    };

    let ts = now_millis();
    let tx = TollTx {
        id: format!("{}-{}", ts, random_suffix()),
        gate,
        amount: request.amount.as_ref().map(coerce_amount).unwrap_or(0.0),
        currency: non_empty(request.currency).unwrap_or_else(|| state.default_currency.clone()),
        ts,
        device_id: non_empty(request.device_id).unwrap_or_else(|| "web".to_string()),
    };

    if let Err(e) = state.tolls.append(tx.clone()).await {
        tracing::error!("Failed to store toll: {}", e);
        return internal_error(e);
    }

    tracing::info!(id = %tx.id, gate = %tx.gate, amount = tx.amount, "Recorded toll");
    Json(SavedToll { saved: true, tx }).into_response()
}

/// POST /tolls/pay
async fn pay_toll(
    State(state): State<ServerState>,
    body: Option<Json<PayTollRequest>>,
) -> Response {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let gate = non_empty(request.gate);
    let amount = request.amount.as_ref().map(coerce_amount).unwrap_or(0.0);
    let Some(gate) = gate.filter(|_| amount != 0.0) else {
        return bad_request("gate and amount required");
    };

    let Some(provider) = state.payments.as_ref() else {
        tracing::info!(gate = %gate, amount, "Simulated toll payment");
        return Json(PaymentResponse {
            ok: true,
            simulated: true,
            client_secret: Some(format!("sim_{}", now_millis())),
        })
        .into_response();
    };

    let currency = non_empty(request.currency).unwrap_or_else(|| state.default_currency.clone());
    let intent = PaymentIntent::for_gate(&gate, amount, &currency, &request.metadata);
    match provider.create_intent(&intent).await {
        Ok(client_secret) => Json(PaymentResponse {
            ok: true,
            simulated: false,
            client_secret: Some(client_secret),
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(gate = %gate, "Payment intent failed: {}", e);
            let message = match e {
                Error::Payment(message) => message,
                other => other.to_string(),
            };
            bad_request(message)
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response()
}

fn internal_error(e: Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new(e.to_string())),
    )
        .into_response()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Text of a submitted value, if it counts as present
fn present_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        serde_json::Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Timestamp from a number of milliseconds or a date string; 0 counts as absent
fn coerce_millis(value: &serde_json::Value) -> Option<i64> {
    let ms = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        serde_json::Value::String(s) => parse_millis(s).ok(),
        _ => None,
    };
    ms.filter(|ms| *ms != 0)
}

/// Numeric amount; anything unparsable is 0
fn coerce_amount(value: &serde_json::Value) -> f64 {
    let amount = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(0.0)
            }
        }
        serde_json::Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}

/// `?limit=` value: leading digits, 0 or absent falls back to the default
fn parse_limit(raw: Option<&str>, default: usize, max: usize) -> usize {
    let parsed = raw
        .map(|s| {
            s.trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
        })
        .and_then(|digits| digits.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default);
    parsed.min(max)
}

fn random_suffix() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
