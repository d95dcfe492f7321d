//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the immutable gateway configuration, the optional upstream client
//! (absent when the process started without credentials), and the in-memory
//! rate limiter. The gateway itself is stateless between requests; nothing
//! here is mutated per call except the limiter's windows.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::gateway::Upstream;
use crate::rate_limit::RateLimiter;

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    /// Optional upstream client. `None` if upstream env vars are not set.
    pub upstream: Option<Arc<dyn Upstream>>,
    /// In-memory rate limiter for gateway requests.
    pub rate_limiter: RateLimiter,
}

impl AppState {
    #[must_use]
    pub fn new(config: GatewayConfig, upstream: Option<Arc<dyn Upstream>>) -> Self {
        Self { config: Arc::new(config), upstream, rate_limiter: RateLimiter::new() }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_state_has_no_upstream() {
        let state = AppState::new(test_helpers::unconfigured(), None);
        assert!(state.upstream.is_none());
        assert!(state.config.api_key.is_none());
    }

    #[test]
    fn state_clone_shares_config() {
        let state = test_helpers::test_app_state(None);
        let clone = state.clone();
        assert!(Arc::ptr_eq(&state.config, &clone.config));
    }
}
