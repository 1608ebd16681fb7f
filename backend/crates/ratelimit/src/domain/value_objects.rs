//! Domain Value Objects

use std::fmt;

/// Composite store key for one `(namespace, identifier)` pair
///
/// All limiter classes share one store; the namespace prefix is the
/// only isolation mechanism. Namespaces are validated at startup to
/// contain no `':'`, which makes the composition collision-free by
/// construction (identifiers such as IPv6 addresses may contain
/// colons, but everything before the first colon-after-namespace is
/// fixed per bucket).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey(String);

impl BucketKey {
    pub fn new(namespace: &str, identifier: &str) -> Self {
        Self(format!("{namespace}:{identifier}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_composition() {
        let key = BucketKey::new("search", "203.0.113.5");
        assert_eq!(key.as_str(), "search:203.0.113.5");
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let a = BucketKey::new("get", "1.2.3.4");
        let b = BucketKey::new("search", "1.2.3.4");
        assert_ne!(a, b);
    }

    #[test]
    fn test_ipv6_identifier() {
        let key = BucketKey::new("email", "2001:db8::1");
        assert_eq!(key.as_str(), "email:2001:db8::1");
    }
}
