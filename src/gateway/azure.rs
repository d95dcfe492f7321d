//! Azure OpenAI client — the production [`Upstream`] implementation.
//!
//! DESIGN
//! ======
//! Two sub-protocols behind one trait: a synchronous chat-completion POST and
//! the asynchronous image submit/poll pair. The submit call detects which of
//! the two valid upstream shapes occurred (operation locator in a response
//! header vs. completed result inline in the body) and resolves it into a
//! [`SubmitOutcome`] right here, so the orchestrator has a single input shape.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::config::GatewayConfig;

use super::types::{ChatTurn, JobHandle, PollOutcome, SubmitOutcome, Upstream, UpstreamError};

const OPERATION_LOCATION_HEADER: &str = "operation-location";

const CHAT_TEMPERATURE: f32 = 0.7;
const CHAT_MAX_TOKENS: u32 = 800;

const IMAGE_COUNT: u32 = 1;
const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_RESPONSE_FORMAT: &str = "url";

pub struct AzureClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    text_deployment: String,
    image_deployment: Option<String>,
    chat_api_version: String,
    image_api_version: String,
}

impl AzureClient {
    /// Build the client from the process config. Returns `Ok(None)` when the
    /// text-path credentials are incomplete — the server keeps running and
    /// the gateway answers with configuration-error envelopes instead.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying HTTP client fails to build.
    pub fn from_config(config: &GatewayConfig) -> Result<Option<Self>, UpstreamError> {
        let (Some(api_key), Some(endpoint), Some(text_deployment)) =
            (config.api_key.clone(), config.endpoint.clone(), config.text_deployment.clone())
        else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| UpstreamError::ClientBuild(e.to_string()))?;
        Ok(Some(Self {
            http,
            api_key,
            endpoint,
            text_deployment,
            image_deployment: config.image_deployment.clone(),
            chat_api_version: config.chat_api_version.clone(),
            image_api_version: config.image_api_version.clone(),
        }))
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.text_deployment, self.chat_api_version
        )
    }

    fn image_submit_url(&self) -> String {
        format!("{}/openai/images/generations:submit?api-version={}", self.endpoint, self.image_api_version)
    }
}

#[async_trait::async_trait]
impl Upstream for AzureClient {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, UpstreamError> {
        let messages: Vec<WireMessage<'_>> = turns
            .iter()
            .map(|t| WireMessage { role: t.role.as_str(), content: &t.content })
            .collect();
        let body = ChatCompletionRequest {
            messages: &messages,
            temperature: CHAT_TEMPERATURE,
            max_tokens: CHAT_MAX_TOKENS,
        };

        let response = self
            .http
            .post(self.chat_url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(UpstreamError::Status { status: status.as_u16(), body: text });
        }
        parse_completion_body(&text)
    }

    async fn submit_image(&self, prompt: &str) -> Result<SubmitOutcome, UpstreamError> {
        let Some(model) = self.image_deployment.as_deref() else {
            return Err(UpstreamError::ImageNotConfigured);
        };
        let body = ImageSubmitRequest {
            prompt,
            n: IMAGE_COUNT,
            size: IMAGE_SIZE,
            response_format: IMAGE_RESPONSE_FORMAT,
            model,
        };

        let response = self
            .http
            .post(self.image_submit_url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        let status = response.status();
        let locator = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(UpstreamError::Status { status: status.as_u16(), body: text });
        }

        // Shape (a): async job, locator in the header. Shape (b): finished
        // result inline in the body. Anything else is malformed, not a
        // silent timeout.
        if let Some(locator) = locator {
            return Ok(SubmitOutcome::Deferred(JobHandle(locator)));
        }
        match parse_inline_result(&text) {
            Some(url) => Ok(SubmitOutcome::Inline(url)),
            None => Err(UpstreamError::Malformed(
                "image submit returned neither an operation locator nor an inline result".into(),
            )),
        }
    }

    async fn poll_image(&self, job: &JobHandle) -> Result<PollOutcome, UpstreamError> {
        let response = self
            .http
            .get(&job.0)
            .header("api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(UpstreamError::Status { status: status.as_u16(), body: text });
        }
        parse_poll_body(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [WireMessage<'a>],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ImageSubmitRequest<'a> {
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'a str,
    model: &'a str,
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

/// Extract `choices[0].message.content` from a chat-completion body.
pub(crate) fn parse_completion_body(text: &str) -> Result<String, UpstreamError> {
    let root: Value = serde_json::from_str(text).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
    root.get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| UpstreamError::Malformed("chat completion missing choices[0].message.content".into()))
}

/// Extract `data[0].url` from a synchronous image submit body, if present.
pub(crate) fn parse_inline_result(text: &str) -> Option<String> {
    let root: Value = serde_json::from_str(text).ok()?;
    root.get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
        .and_then(|entry| entry.get("url"))
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
}

/// Interpret a poll body `{status, result?, error?}` as a [`PollOutcome`].
///
/// A succeeded status is reported with whatever URL list accompanied it —
/// possibly empty; the orchestrator decides that an empty list is an error.
/// Unrecognized or absent statuses count as still pending.
pub(crate) fn parse_poll_body(text: &str) -> Result<PollOutcome, UpstreamError> {
    let root: Value = serde_json::from_str(text).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
    match root.get("status").and_then(Value::as_str) {
        Some("succeeded") => {
            let data = root
                .get("result")
                .and_then(|r| r.get("data"))
                .or_else(|| root.get("data"))
                .and_then(Value::as_array);
            let urls = data
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|e| e.get("url").and_then(Value::as_str))
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default();
            Ok(PollOutcome::Succeeded(urls))
        }
        Some("failed" | "canceled" | "cancelled") => {
            let reason = root
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("the upstream reported no failure reason")
                .to_string();
            Ok(PollOutcome::Failed(reason))
        }
        _ => Ok(PollOutcome::Pending),
    }
}

#[cfg(test)]
#[path = "azure_test.rs"]
mod tests;
