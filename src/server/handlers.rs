use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::catalog::Property;
use crate::locator::ResponsePayload;
use crate::rate_limit::RateLimitExceeded;

use super::state::AppState;

pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong while searching. Please try again.";

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

fn rate_limited(e: RateLimitExceeded) -> Response {
    let status = StatusCode::TOO_MANY_REQUESTS;
    let body = ApiErrorBody {
        error: e.to_string(),
        code: status.as_u16(),
    };
    let retry_after = e.retry_after_secs().to_string();
    (status, [(header::RETRY_AFTER, retry_after)], Json(body)).into_response()
}

// ─── Client identity ─────────────────────────────────────────────

/// Who is asking: the peer address, or the first `X-Forwarded-For` hop
/// when the server is configured to trust it.
pub struct ClientId(pub String);

impl ClientId {
    fn from_parts(parts: &Parts, trust_forwarded_for: bool) -> Self {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| trust_forwarded_for && !v.is_empty());
        if let Some(ip) = forwarded {
            return ClientId(ip.to_string());
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        ClientId(peer.unwrap_or_else(|| "unknown".to_string()))
    }
}

impl FromRequestParts<Arc<AppState>> for ClientId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts, state.trust_forwarded_for))
    }
}

// ─── POST /find-properties ───────────────────────────────────────

#[derive(Deserialize)]
pub struct FindRequest {
    pub query: String,
}

pub async fn find_properties(
    State(state): State<Arc<AppState>>,
    ClientId(client): ClientId,
    Json(req): Json<FindRequest>,
) -> Result<Json<ResponsePayload>, Response> {
    let start = Instant::now();
    let query = req.query;

    let task_state = Arc::clone(&state);
    let task_query = query.clone();
    let task_client = client.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        task_state.locator.find_properties_for(&task_client, &task_query)
    })
    .await;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    match outcome {
        Ok(Ok(payload)) => {
            log::info!(
                "POST /find-properties client={} query={:?} -> {} result(s) ({:.1}ms)",
                client,
                query,
                payload.properties.len(),
                elapsed_ms,
            );
            Ok(Json(payload))
        }
        Ok(Err(limited)) => {
            log::info!("POST /find-properties client={} -> 429 ({:.1}ms)", client, elapsed_ms);
            Err(rate_limited(limited))
        }
        Err(e) => {
            log::error!("POST /find-properties client={} query={:?} failed: {}", client, query, e);
            Ok(Json(ResponsePayload {
                query,
                properties: Vec::new(),
                message: Some(INTERNAL_ERROR_MESSAGE.to_string()),
            }))
        }
    }
}

// ─── GET /health ─────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: "1.0".into(),
    })
}

// ─── GET /properties ─────────────────────────────────────────────

pub async fn property_list(State(state): State<Arc<AppState>>) -> Json<Vec<Property>> {
    Json(state.locator.catalog().properties().to_vec())
}
