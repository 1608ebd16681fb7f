//! API DTOs (Data Transfer Objects)

use serde::Serialize;

/// Body of a 429 rejection
///
/// Clients key on `rateLimited` to tell throttling apart from other
/// failures; the field shape is a stable contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedBody {
    pub message: String,
    pub rate_limited: bool,
}

impl RateLimitedBody {
    pub fn new() -> Self {
        Self {
            message: "Too many requests. Slow down.".to_string(),
            rate_limited: true,
        }
    }
}

impl Default for RateLimitedBody {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let body = serde_json::to_value(RateLimitedBody::new()).unwrap();
        assert_eq!(body["rateLimited"], true);
        assert!(body["message"].is_string());
    }
}
