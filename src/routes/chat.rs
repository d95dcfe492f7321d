//! `POST /api/chat` — the single inbound surface of the gateway.
//!
//! DESIGN
//! ======
//! The handler reads the raw body and parses it itself rather than using the
//! `Json` extractor: malformed caller JSON must land in the outer catch-all
//! (a well-formed apology envelope with a 500 status), never an Axum
//! rejection. Status policy: ordinary upstream failures are returned with
//! HTTP 200 so the UI renders `content` without branching on transport
//! status; non-2xx is reserved for configuration errors and the catch-all.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::gateway;
use crate::gateway::types::{ChatTurn, ErrorKind, GatewayRequest, GatewayResponse};
use crate::state::AppState;

/// Turns kept from the tail of the conversation before invoking the gateway.
pub const MAX_HISTORY_TURNS: usize = 25;

/// Inbound request body. `forceImage` is the caller's explicit dispatch
/// flag; absent means the text path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
    #[serde(default)]
    pub force_image: bool,
}

/// `POST /api/chat` — dispatch a conversation to the gateway.
pub async fn chat(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<GatewayResponse>) {
    let request_id = Uuid::new_v4();

    let client_key = client_key(&headers, addr);
    if let Err(e) = state.rate_limiter.check_and_record(&client_key) {
        warn!(%request_id, client = %client_key, error = %e, "request rate limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(GatewayResponse::text("You're sending requests too quickly. Please wait a moment and try again.")),
        );
    }

    // Outer catch-all: a body we cannot read still yields a well-formed
    // envelope.
    let parsed: ChatRequestBody = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(%request_id, error = %e, "unreadable request body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GatewayResponse::failure(
                    ErrorKind::Unknown,
                    "I encountered an unexpected error processing your request. Please try again or contact support \
                     if this persists.",
                )),
            );
        }
    };

    let request = GatewayRequest { turns: cap_history(parsed.messages), image_mode: parsed.force_image };
    info!(%request_id, turns = request.turns.len(), image_mode = request.image_mode, "gateway request");

    let envelope = gateway::handle(&state.config, state.upstream.as_deref(), &request).await;
    (response_status(&envelope), Json(envelope))
}

/// Per-client rate-limit key: the browser client sends `x-client-info`;
/// otherwise fall back to the peer address.
fn client_key(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-client-info")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| addr.ip().to_string(), str::to_owned)
}

/// Keep only the most recent turns; the gateway never needs unbounded
/// history.
fn cap_history(mut turns: Vec<ChatTurn>) -> Vec<ChatTurn> {
    if turns.len() > MAX_HISTORY_TURNS {
        turns.drain(..turns.len() - MAX_HISTORY_TURNS);
    }
    turns
}

/// Ordinary upstream failures still ride a 200 so the UI renders `content`
/// uniformly; only configuration errors get failure framing here.
fn response_status(envelope: &GatewayResponse) -> StatusCode {
    if envelope.error == Some(ErrorKind::MissingConfig) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
