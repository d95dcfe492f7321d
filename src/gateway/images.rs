//! Image synthesis orchestrator — drives a submit/poll job to a terminal
//! state.
//!
//! DESIGN
//! ======
//! A small state machine over an inherently asynchronous upstream job:
//! `Init → Submitted → {Polling → {Succeeded | Failed | TimedOut}} |
//! {Succeeded synchronously} | {SubmitFailed}`. Timeout is attempt-count
//! bounded (10 polls, one cooperative 1-second sleep before each), never
//! wall-clock bounded, so tests can reason about attempts exactly. The loop
//! runs inside the request future: when the caller disconnects, axum drops
//! the future and polling stops at the next await point.

use std::time::Duration;

use tracing::{debug, warn};

use super::types::{PollOutcome, SubmitOutcome, Upstream, UpstreamError};

pub const MAX_POLL_ATTEMPTS: u32 = 10;
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Terminal failures of one image generation job.
#[derive(Debug, thiserror::Error)]
pub enum ImageJobError {
    /// The submit call itself failed; no polling was started.
    #[error("image submission failed: {0}")]
    Submit(#[source] UpstreamError),

    /// The job reached a terminal `failed` status. `reason` is carried
    /// verbatim from the upstream.
    #[error("image generation job failed: {reason}")]
    JobFailed { reason: String },

    /// The job was still pending when the poll budget ran out.
    #[error("image generation job did not complete before polling stopped")]
    TimedOut,

    /// A terminal success without a usable result.
    #[error("image generation returned no result: {0}")]
    MalformedResult(String),
}

/// Run one image generation to completion and return the result URL.
pub async fn generate(upstream: &dyn Upstream, prompt: &str) -> Result<String, ImageJobError> {
    let job = match upstream.submit_image(prompt).await.map_err(ImageJobError::Submit)? {
        SubmitOutcome::Inline(url) => {
            debug!("image submit returned an inline result, no polling needed");
            return Ok(url);
        }
        SubmitOutcome::Deferred(job) => job,
    };

    for attempt in 1..=MAX_POLL_ATTEMPTS {
        tokio::time::sleep(POLL_INTERVAL).await;
        match upstream.poll_image(&job).await {
            Ok(PollOutcome::Pending) => {
                debug!(attempt, "image job still pending");
            }
            Ok(PollOutcome::Succeeded(urls)) => {
                return urls
                    .into_iter()
                    .find(|url| !url.is_empty())
                    .ok_or_else(|| ImageJobError::MalformedResult("job succeeded with an empty result list".into()));
            }
            // Terminal failure from the upstream is a hard stop, not a retry
            // trigger.
            Ok(PollOutcome::Failed(reason)) => return Err(ImageJobError::JobFailed { reason }),
            // A failed poll round trip is transient: it consumes the attempt
            // and the loop keeps going.
            Err(e) => {
                warn!(attempt, error = %e, "image poll attempt failed");
            }
        }
    }
    Err(ImageJobError::TimedOut)
}

#[cfg(test)]
#[path = "images_test.rs"]
mod tests;
