//! Environment configuration helpers
//!
//! Thin wrappers over `std::env` used by config loaders. Unset
//! variables are silently skipped; set-but-unparseable values are
//! logged and skipped so a typo cannot silently disable a limit.

use std::str::FromStr;

/// Read and parse an environment variable
///
/// ## Returns
/// * `Some(value)` - variable set and parseable
/// * `None` - variable unset, empty, or unparseable (logged at warn)
pub fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

/// Read an environment variable, falling back to a default
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_parse(key).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global; each test uses its own key.

    #[test]
    fn test_env_parse_unset() {
        assert_eq!(env_parse::<u32>("PLATFORM_TEST_UNSET_VAR"), None);
    }

    #[test]
    fn test_env_parse_valid() {
        unsafe { std::env::set_var("PLATFORM_TEST_VALID_VAR", "42") };
        assert_eq!(env_parse::<u32>("PLATFORM_TEST_VALID_VAR"), Some(42));
    }

    #[test]
    fn test_env_parse_invalid() {
        unsafe { std::env::set_var("PLATFORM_TEST_INVALID_VAR", "not-a-number") };
        assert_eq!(env_parse::<u32>("PLATFORM_TEST_INVALID_VAR"), None);
    }

    #[test]
    fn test_env_or_default() {
        assert_eq!(env_or("PLATFORM_TEST_DEFAULT_VAR", 7u64), 7);
    }
}
