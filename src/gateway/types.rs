//! Gateway types — conversation turns, the upstream seam, and the response
//! envelope.
//!
//! DESIGN
//! ======
//! Everything here is created fresh per request and dropped when the response
//! is written; the gateway holds no state between calls. The `Upstream` trait
//! is the mocking seam: the Azure client implements it in production, tests
//! inject scripted fakes.

use serde::{Deserialize, Serialize};

// =============================================================================
// CONVERSATION
// =============================================================================

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// One role-tagged message in a conversation. Insertion order is
/// conversational order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

// =============================================================================
// REQUEST + MODE SELECTION
// =============================================================================

/// A single gateway invocation: the conversation plus the caller's explicit
/// mode flag.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub turns: Vec<ChatTurn>,
    /// Sole authority on dispatch. The gateway never infers image intent
    /// from message text.
    pub image_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Text,
    Image,
}

impl GatewayRequest {
    /// Pure mode selection, driven only by the `image_mode` flag.
    #[must_use]
    pub fn mode(&self) -> RequestMode {
        if self.image_mode { RequestMode::Image } else { RequestMode::Text }
    }
}

// =============================================================================
// ERROR TAXONOMY
// =============================================================================

/// Actionable failure classes surfaced to the caller. Serialized into the
/// envelope's `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "missing_config")]
    MissingConfig,
    #[serde(rename = "upstream_unauthorized")]
    Unauthorized,
    #[serde(rename = "upstream_not_found")]
    NotFound,
    #[serde(rename = "upstream_rate_limited")]
    RateLimited,
    #[serde(rename = "upstream_timeout")]
    Timeout,
    #[serde(rename = "upstream_malformed_result")]
    MalformedResult,
    #[serde(rename = "unknown")]
    Unknown,
}

impl ErrorKind {
    /// Fixed remediation hint template for each kind.
    #[must_use]
    pub fn remediation(self) -> &'static str {
        match self {
            Self::MissingConfig => "Set the missing environment variables and restart the service.",
            Self::Unauthorized => "Check that the API key is valid and has access to the deployment.",
            Self::NotFound => "Verify the deployment identifier matches exactly.",
            Self::RateLimited => "Please wait a moment and try again.",
            Self::Timeout => "Please try again with a simpler prompt.",
            Self::MalformedResult => "Please try again; if this persists the upstream service may be degraded.",
            Self::Unknown => "Please try again in a moment or contact support if this persists.",
        }
    }
}

// =============================================================================
// UPSTREAM SEAM
// =============================================================================

/// Failures produced by upstream API calls, before classification.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The HTTP request never produced a response (DNS, connect, timeout).
    #[error("upstream request failed: {0}")]
    Transport(String),

    /// The upstream answered with a non-success HTTP status.
    #[error("upstream returned status {status}")]
    Status { status: u16, body: String },

    /// A 2xx response whose body or headers could not be used.
    #[error("malformed upstream response: {0}")]
    Malformed(String),

    /// The image path was invoked without an image deployment configured.
    #[error("image generation is not configured")]
    ImageNotConfigured,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

/// Opaque locator for an in-progress image generation job. Owned by the
/// orchestrator for the lifetime of one request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(pub String);

/// What the image submit call resolved to, detected once immediately after
/// the call: either the finished result inline, or a job to poll.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Inline(String),
    Deferred(JobHandle),
}

/// One observation of a polled job.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Pending,
    Succeeded(Vec<String>),
    Failed(String),
}

/// Provider-neutral boundary to the hosted model API. Enables mocking in
/// tests; `AzureClient` is the production implementation.
#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    /// One chat-completion call over the full turn sequence (including the
    /// leading system turn). Returns the assistant's message content.
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, UpstreamError>;

    /// Submit an image generation job for `prompt`.
    async fn submit_image(&self, prompt: &str) -> Result<SubmitOutcome, UpstreamError>;

    /// Fetch the current status of a submitted job.
    async fn poll_image(&self, job: &JobHandle) -> Result<PollOutcome, UpstreamError>;
}

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

/// The single normalized response shape returned to callers regardless of
/// which upstream path was taken. `content` is always non-empty and
/// user-presentable, even on failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub is_image: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_configured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl GatewayResponse {
    /// Successful text completion.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::bare(false, content)
    }

    /// Successful image generation; `content` carries the result URL.
    #[must_use]
    pub fn image(url: impl Into<String>) -> Self {
        Self::bare(true, url)
    }

    /// Classified failure with a user-facing message.
    #[must_use]
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        let mut envelope = Self::bare(false, message);
        envelope.error = Some(kind);
        envelope
    }

    /// Configuration-error envelope: the guard failed before any network call.
    #[must_use]
    pub fn not_configured(message: impl Into<String>) -> Self {
        let mut envelope = Self::failure(ErrorKind::MissingConfig, message);
        envelope.is_configured = Some(false);
        envelope
    }

    /// Attach optional diagnostic fields for operator debugging. Callers may
    /// ignore them.
    #[must_use]
    pub fn with_diagnostics(mut self, deployment: Option<&str>, endpoint: Option<&str>, api_version: &str) -> Self {
        self.deployment_name = deployment.map(str::to_owned);
        self.endpoint = endpoint.map(str::to_owned);
        self.api_version = Some(api_version.to_owned());
        self
    }

    fn bare(is_image: bool, content: impl Into<String>) -> Self {
        Self {
            is_image,
            content: content.into(),
            is_configured: None,
            error: None,
            deployment_name: None,
            endpoint: None,
            api_version: None,
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
