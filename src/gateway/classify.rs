//! Error classifier — maps raw upstream failures to the error taxonomy.
//!
//! Classification is total and deterministic: it never fails, and
//! unrecognized shapes fall back to [`ErrorKind::Unknown`] with the raw body
//! truncated into the user-facing hint by the caller.

use super::types::ErrorKind;

/// Longest body excerpt embedded in an Unknown-error message.
pub const BODY_SNIPPET_MAX: usize = 200;

/// Classify a non-success upstream response by status code and body.
///
/// 401/403 ⇒ unauthorized; 404 or a "resource not found" body ⇒ not found
/// (Azure reports a wrong deployment name this way); 429 ⇒ rate limited;
/// anything else ⇒ unknown.
#[must_use]
pub fn classify(status: u16, body: &str) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::Unauthorized,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimited,
        _ => {
            let lower = body.to_ascii_lowercase();
            if lower.contains("resource not found") {
                ErrorKind::NotFound
            } else if lower.contains("invalid api key") || lower.contains("access denied") {
                ErrorKind::Unauthorized
            } else {
                ErrorKind::Unknown
            }
        }
    }
}

/// Truncate a raw body to at most `max` characters for inclusion in a
/// user-facing message, respecting char boundaries.
#[must_use]
pub fn snippet(body: &str, max: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max).collect();
    format!("{cut}…")
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
