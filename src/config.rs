//! Gateway configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! All upstream connection parameters are read exactly once at process start
//! into an immutable `GatewayConfig` carried in `AppState`. Missing values do
//! not abort startup: the server still runs and answers requests on the
//! affected path with a configuration-error envelope. `missing_for` is the
//! single source of truth for which variables a request mode requires.

use crate::gateway::types::RequestMode;

pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_TEXT_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
pub const ENV_IMAGE_DEPLOYMENT: &str = "AZURE_OPENAI_IMAGE_DEPLOYMENT";

pub const DEFAULT_CHAT_API_VERSION: &str = "2023-05-15";
pub const DEFAULT_IMAGE_API_VERSION: &str = "2023-12-01-preview";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Upstream connection parameters. The image deployment is optional — its
/// absence disables only the image path, not the whole gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub text_deployment: Option<String>,
    pub image_deployment: Option<String>,
    pub chat_api_version: String,
    pub image_api_version: String,
    pub timeouts: Timeouts,
}

impl GatewayConfig {
    /// Build the config from environment variables. Never fails: absent or
    /// empty values are recorded as `None` and surface later as
    /// configuration-error envelopes.
    ///
    /// - `AZURE_OPENAI_API_KEY`
    /// - `AZURE_OPENAI_ENDPOINT` (trailing slash stripped)
    /// - `AZURE_OPENAI_DEPLOYMENT_NAME` (chat completions deployment)
    /// - `AZURE_OPENAI_IMAGE_DEPLOYMENT` (optional, image generation)
    /// - `GATEWAY_CHAT_API_VERSION` / `GATEWAY_IMAGE_API_VERSION`
    /// - `GATEWAY_REQUEST_TIMEOUT_SECS` / `GATEWAY_CONNECT_TIMEOUT_SECS`
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: env_opt(ENV_API_KEY),
            endpoint: env_opt(ENV_ENDPOINT).map(|e| e.trim_end_matches('/').to_string()),
            text_deployment: env_opt(ENV_TEXT_DEPLOYMENT),
            image_deployment: env_opt(ENV_IMAGE_DEPLOYMENT),
            chat_api_version: env_opt("GATEWAY_CHAT_API_VERSION").unwrap_or_else(|| DEFAULT_CHAT_API_VERSION.into()),
            image_api_version: env_opt("GATEWAY_IMAGE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_IMAGE_API_VERSION.into()),
            timeouts: Timeouts {
                request_secs: env_parse("GATEWAY_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("GATEWAY_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
        }
    }

    /// Environment variable names required for `mode` but currently unset.
    /// Empty result means the Configuration Guard passes.
    #[must_use]
    pub fn missing_for(&self, mode: RequestMode) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push(ENV_API_KEY);
        }
        if self.endpoint.is_none() {
            missing.push(ENV_ENDPOINT);
        }
        if self.text_deployment.is_none() {
            missing.push(ENV_TEXT_DEPLOYMENT);
        }
        if mode == RequestMode::Image && self.image_deployment.is_none() {
            missing.push(ENV_IMAGE_DEPLOYMENT);
        }
        missing
    }

    /// The deployment identifier serving `mode`, for operator diagnostics.
    #[must_use]
    pub fn deployment_for(&self, mode: RequestMode) -> Option<&str> {
        match mode {
            RequestMode::Text => self.text_deployment.as_deref(),
            RequestMode::Image => self.image_deployment.as_deref(),
        }
    }

    /// The upstream api-version used for `mode`.
    #[must_use]
    pub fn api_version_for(&self, mode: RequestMode) -> &str {
        match mode {
            RequestMode::Text => &self.chat_api_version,
            RequestMode::Image => &self.image_api_version,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
