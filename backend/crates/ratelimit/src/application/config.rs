//! Rate Limit Policy Table
//!
//! All limiter configurations in one place, so bucket instances are
//! constructed once at process start and reused across requests.
//! Constructing a bucket per request would reset its capacity and
//! defeat the limiter.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::{RateLimitError, RlResult};

/// What a bucket does when the backing store is unreachable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Treat the outage as "allowed" (availability over strictness)
    Open,
    /// Propagate the outage as a 503 (strictness over availability)
    Closed,
}

/// Configuration for one named limiter class
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Keyspace discriminator, unique per limiter class.
    /// Reusing a namespace across differently-configured buckets is a
    /// configuration error; [`RateLimitConfig::validate`] rejects it
    /// within one table, reuse across tables is a caller obligation.
    pub namespace: String,
    /// Maximum requests allowed per window
    pub capacity: u32,
    /// Refill window length
    pub window: Duration,
    /// Fail-open/fail-closed choice on store errors
    pub on_store_error: FailurePolicy,
}

impl RateLimitPolicy {
    pub fn new(
        namespace: impl Into<String>,
        capacity: u32,
        window_secs: u64,
        on_store_error: FailurePolicy,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            capacity,
            window: Duration::from_secs(window_secs),
            on_store_error,
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// The policy table: one policy per recognized limiter class
///
/// Capacity/window numbers are deployment tuning, overridable through
/// `RATE_LIMIT_<NAME>_MAX` and `RATE_LIMIT_<NAME>_WINDOW_SECS`.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// General read traffic
    pub get: RateLimitPolicy,
    /// Expensive bulk-fetch endpoints
    pub strict_get: RateLimitPolicy,
    /// Search, isolated so it cannot starve other reads
    pub search: RateLimitPolicy,
    /// Outbound email sending
    pub email: RateLimitPolicy,
    /// State-mutating requests
    pub modify: RateLimitPolicy,
    /// Critical mutations (account deletion, password change)
    pub crit_modify: RateLimitPolicy,
    /// Broad backstop for CDN/static asset paths
    pub ddos_protection: RateLimitPolicy,
    /// Charged only on failed credential checks
    pub invalid_auth_attempt: RateLimitPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        use FailurePolicy::{Closed, Open};
        Self {
            get: RateLimitPolicy::new("get", 250, 300, Open),
            strict_get: RateLimitPolicy::new("strict-get", 60, 300, Open),
            search: RateLimitPolicy::new("search", 150, 300, Open),
            email: RateLimitPolicy::new("email", 5, 3600, Closed),
            modify: RateLimitPolicy::new("modify", 60, 300, Closed),
            crit_modify: RateLimitPolicy::new("crit-modify", 20, 300, Closed),
            ddos_protection: RateLimitPolicy::new("ddos", 5000, 60, Open),
            invalid_auth_attempt: RateLimitPolicy::new("invalid-auth", 10, 3600, Closed),
        }
    }
}

impl RateLimitConfig {
    /// Load the table with environment overrides applied to the defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        for (policy, name) in [
            (&mut config.get, "GET"),
            (&mut config.strict_get, "STRICT_GET"),
            (&mut config.search, "SEARCH"),
            (&mut config.email, "EMAIL"),
            (&mut config.modify, "MODIFY"),
            (&mut config.crit_modify, "CRIT_MODIFY"),
            (&mut config.ddos_protection, "DDOS_PROTECTION"),
            (&mut config.invalid_auth_attempt, "INVALID_AUTH_ATTEMPT"),
        ] {
            if let Some(max) = platform::config::env_parse::<u32>(&format!("RATE_LIMIT_{name}_MAX"))
            {
                policy.capacity = max;
            }
            if let Some(secs) =
                platform::config::env_parse::<u64>(&format!("RATE_LIMIT_{name}_WINDOW_SECS"))
            {
                policy.window = Duration::from_secs(secs);
            }
        }
        config
    }

    /// All policies, for validation and registry construction
    pub fn policies(&self) -> [&RateLimitPolicy; 8] {
        [
            &self.get,
            &self.strict_get,
            &self.search,
            &self.email,
            &self.modify,
            &self.crit_modify,
            &self.ddos_protection,
            &self.invalid_auth_attempt,
        ]
    }

    /// Fail fast on misconfiguration; called at process startup, never
    /// at request time
    pub fn validate(&self) -> RlResult<()> {
        let mut seen = HashSet::new();
        for policy in self.policies() {
            if policy.namespace.is_empty() {
                return Err(RateLimitError::InvalidPolicy(
                    "namespace must be non-empty".into(),
                ));
            }
            if policy.namespace.contains(':') {
                return Err(RateLimitError::InvalidPolicy(format!(
                    "namespace '{}' must not contain ':'",
                    policy.namespace
                )));
            }
            if policy.capacity == 0 {
                return Err(RateLimitError::InvalidPolicy(format!(
                    "namespace '{}' has zero capacity",
                    policy.namespace
                )));
            }
            if policy.window.is_zero() {
                return Err(RateLimitError::InvalidPolicy(format!(
                    "namespace '{}' has zero window",
                    policy.namespace
                )));
            }
            if !seen.insert(policy.namespace.as_str()) {
                return Err(RateLimitError::InvalidPolicy(format!(
                    "namespace '{}' is used by two policies",
                    policy.namespace
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RateLimitConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_numbers() {
        let config = RateLimitConfig::default();
        assert_eq!(config.email.capacity, 5);
        assert_eq!(config.ddos_protection.capacity, 5000);
        assert_eq!(config.get.window, Duration::from_secs(300));
    }

    #[test]
    fn test_failure_policy_defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.get.on_store_error, FailurePolicy::Open);
        assert_eq!(config.search.on_store_error, FailurePolicy::Open);
        assert_eq!(config.email.on_store_error, FailurePolicy::Closed);
        assert_eq!(
            config.invalid_auth_attempt.on_store_error,
            FailurePolicy::Closed
        );
    }

    #[test]
    fn test_validate_zero_capacity() {
        let mut config = RateLimitConfig::default();
        config.search.capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(crate::error::RateLimitError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_validate_zero_window() {
        let mut config = RateLimitConfig::default();
        config.modify.window = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_namespace() {
        let mut config = RateLimitConfig::default();
        config.search.namespace = "get".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_colon_in_namespace() {
        let mut config = RateLimitConfig::default();
        config.get.namespace = "get:v2".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_overrides() {
        unsafe {
            std::env::set_var("RATE_LIMIT_SEARCH_MAX", "42");
            std::env::set_var("RATE_LIMIT_SEARCH_WINDOW_SECS", "120");
        }
        let config = RateLimitConfig::from_env();
        assert_eq!(config.search.capacity, 42);
        assert_eq!(config.search.window, Duration::from_secs(120));
        // untouched classes keep their defaults
        assert_eq!(config.email.capacity, 5);
        unsafe {
            std::env::remove_var("RATE_LIMIT_SEARCH_MAX");
            std::env::remove_var("RATE_LIMIT_SEARCH_WINDOW_SECS");
        }
    }

    #[test]
    fn test_window_ms() {
        let policy = RateLimitPolicy::new("get", 10, 60, FailurePolicy::Open);
        assert_eq!(policy.window_ms(), 60_000);
    }
}
