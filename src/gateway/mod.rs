//! Request gateway — dispatch, normalization, and failure classification.
//!
//! DESIGN
//! ======
//! Control flow for every request: Configuration Guard → Mode Selector →
//! {text completion | image orchestrator} → error classification on failure
//! → one normalized [`GatewayResponse`]. Nothing escapes this module as an
//! unhandled fault; every path ends in an envelope whose `content` is a
//! user-presentable string.

pub mod azure;
pub mod classify;
pub mod images;
pub mod types;

use tracing::{info, warn};

use crate::config::GatewayConfig;

use classify::{BODY_SNIPPET_MAX, classify, snippet};
use images::ImageJobError;
pub use types::Upstream;
use types::{ChatTurn, ErrorKind, GatewayRequest, GatewayResponse, RequestMode, Role, UpstreamError};

/// Fixed system instruction prepended to every completion call.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that can answer questions, generate HTML/CSS/JS code, \
     fix code bugs, and create images based on user prompts. Respond concisely unless \
     otherwise requested. Format code nicely with markdown code blocks.";

/// Handle one gateway request end to end.
///
/// `upstream` is `None` when the process started without a usable client;
/// the guard turns that into a configuration-error envelope before any
/// network activity would occur.
pub async fn handle(
    config: &GatewayConfig,
    upstream: Option<&dyn Upstream>,
    request: &GatewayRequest,
) -> GatewayResponse {
    let mode = request.mode();

    // Configuration Guard: first gate, never a retry target.
    let missing = config.missing_for(mode);
    if !missing.is_empty() {
        warn!(?mode, ?missing, "request rejected: incomplete upstream configuration");
        return not_configured_envelope(config, mode, &missing);
    }
    let Some(upstream) = upstream else {
        warn!(?mode, "request rejected: upstream client unavailable");
        return GatewayResponse::not_configured(format!(
            "The model service client could not be initialized. {}",
            ErrorKind::MissingConfig.remediation()
        ))
        .with_diagnostics(config.deployment_for(mode), config.endpoint.as_deref(), config.api_version_for(mode));
    };

    match mode {
        RequestMode::Text => run_text(config, upstream, request).await,
        RequestMode::Image => run_image(config, upstream, request).await,
    }
}

// =============================================================================
// TEXT PATH
// =============================================================================

/// Single-attempt chat completion. Transient-error recovery belongs to the
/// interactive caller, so there are no retries here.
async fn run_text(config: &GatewayConfig, upstream: &dyn Upstream, request: &GatewayRequest) -> GatewayResponse {
    let mut turns = Vec::with_capacity(request.turns.len() + 1);
    turns.push(ChatTurn::new(Role::System, SYSTEM_PROMPT));
    turns.extend(request.turns.iter().cloned());

    info!(turns = turns.len(), "dispatching chat completion");
    match upstream.complete(&turns).await {
        Ok(content) => GatewayResponse::text(content),
        Err(e) => {
            warn!(error = %e, "chat completion failed");
            upstream_failure(config, RequestMode::Text, &e)
        }
    }
}

// =============================================================================
// IMAGE PATH
// =============================================================================

async fn run_image(config: &GatewayConfig, upstream: &dyn Upstream, request: &GatewayRequest) -> GatewayResponse {
    let prompt = request.turns.last().map(|t| t.content.as_str()).unwrap_or("");
    if prompt.is_empty() {
        return GatewayResponse::failure(
            ErrorKind::Unknown,
            "I didn't receive a prompt to generate an image from. Please describe the image you'd like.",
        );
    }

    info!(prompt_len = prompt.len(), "dispatching image generation");
    match images::generate(upstream, prompt).await {
        Ok(url) => GatewayResponse::image(url),
        Err(e) => {
            warn!(error = %e, "image generation failed");
            image_failure(config, &e)
        }
    }
}

fn image_failure(config: &GatewayConfig, error: &ImageJobError) -> GatewayResponse {
    let mode = RequestMode::Image;
    match error {
        ImageJobError::Submit(upstream_error) => upstream_failure(config, mode, upstream_error),
        ImageJobError::JobFailed { reason } => diagnosed(
            config,
            mode,
            GatewayResponse::failure(ErrorKind::Unknown, format!("The image generation job failed: {reason}")),
        ),
        ImageJobError::TimedOut => diagnosed(
            config,
            mode,
            GatewayResponse::failure(
                ErrorKind::Timeout,
                format!("The image generation took too long to process. {}", ErrorKind::Timeout.remediation()),
            ),
        ),
        ImageJobError::MalformedResult(detail) => diagnosed(
            config,
            mode,
            GatewayResponse::failure(
                ErrorKind::MalformedResult,
                format!(
                    "The model service reported success but returned no usable image ({detail}). {}",
                    ErrorKind::MalformedResult.remediation()
                ),
            ),
        ),
    }
}

// =============================================================================
// FAILURE ENVELOPES
// =============================================================================

/// Classify an upstream call failure and build the matching envelope.
fn upstream_failure(config: &GatewayConfig, mode: RequestMode, error: &UpstreamError) -> GatewayResponse {
    let (kind, message) = match error {
        UpstreamError::Status { status, body } => {
            let kind = classify(*status, body);
            (kind, failure_message(config, mode, kind, body))
        }
        UpstreamError::Transport(detail) => {
            let kind = ErrorKind::Unknown;
            (kind, failure_message(config, mode, kind, detail))
        }
        UpstreamError::Malformed(detail) => (
            ErrorKind::MalformedResult,
            format!(
                "The model service returned a response I couldn't use ({detail}). {}",
                ErrorKind::MalformedResult.remediation()
            ),
        ),
        UpstreamError::ImageNotConfigured | UpstreamError::ClientBuild(_) => {
            return GatewayResponse::not_configured(format!(
                "Image generation is not configured. {}",
                ErrorKind::MissingConfig.remediation()
            ))
            .with_diagnostics(config.deployment_for(mode), config.endpoint.as_deref(), config.api_version_for(mode));
        }
    };
    diagnosed(config, mode, GatewayResponse::failure(kind, message))
}

/// Compose the user-facing message for a classified upstream failure. The
/// not-found message names the configured deployment so an operator can spot
/// a mismatched identifier at a glance.
fn failure_message(config: &GatewayConfig, mode: RequestMode, kind: ErrorKind, raw_body: &str) -> String {
    match kind {
        ErrorKind::Unauthorized => {
            format!("I couldn't authenticate with the model service. {}", kind.remediation())
        }
        ErrorKind::NotFound => {
            let deployment = config.deployment_for(mode).unwrap_or("unknown");
            format!("The model service could not find the deployment \"{deployment}\". {}", kind.remediation())
        }
        ErrorKind::RateLimited => {
            format!("The model service is throttling requests right now. {}", kind.remediation())
        }
        _ => {
            let detail = snippet(raw_body, BODY_SNIPPET_MAX);
            if detail.is_empty() {
                format!(
                    "I'm sorry, I couldn't process your request due to a connection issue with the model service. {}",
                    kind.remediation()
                )
            } else {
                format!(
                    "I'm sorry, I couldn't process your request due to a connection issue with the model service \
                     ({detail}). {}",
                    kind.remediation()
                )
            }
        }
    }
}

fn not_configured_envelope(config: &GatewayConfig, mode: RequestMode, missing: &[&str]) -> GatewayResponse {
    GatewayResponse::not_configured(format!(
        "The model service is not configured: missing {}. {}",
        missing.join(", "),
        ErrorKind::MissingConfig.remediation()
    ))
    .with_diagnostics(config.deployment_for(mode), config.endpoint.as_deref(), config.api_version_for(mode))
}

fn diagnosed(config: &GatewayConfig, mode: RequestMode, envelope: GatewayResponse) -> GatewayResponse {
    envelope.with_diagnostics(config.deployment_for(mode), config.endpoint.as_deref(), config.api_version_for(mode))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
