//! Domain Entities
//!
//! Bucket state as stored, and the per-call consumption outcome.

/// Bucket slot - per-key state held by the store
///
/// `tokens_remaining` counts down from `capacity - 1` after the first
/// take. The store floors it at `-1`: `0` means the last token was just
/// granted, `-1` means the bucket is exhausted. User-visible "remaining"
/// is always the clamped, non-negative view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSlot {
    pub tokens_remaining: i64,
    pub expires_at_ms: i64,
}

impl BucketSlot {
    pub fn new(tokens_remaining: i64, expires_at_ms: i64) -> Self {
        Self {
            tokens_remaining,
            expires_at_ms,
        }
    }

    /// Whether this slot's window has elapsed at the given instant
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }

    /// Tokens remaining, clamped at zero
    pub fn remaining(&self) -> u32 {
        self.tokens_remaining.max(0) as u32
    }
}

/// Outcome of a single consumption attempt (not persisted)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    /// True if the request must be rejected
    pub rate_limited: bool,
    /// Tokens left after this attempt, clamped at zero
    pub remaining: u32,
    /// Echo of the policy capacity, for header reporting
    pub limit: u32,
    /// When the bucket next resets (sliding expiry), epoch millis
    pub reset_at_ms: i64,
}

impl ConsumeOutcome {
    /// Reset time in epoch seconds, rounded up (header reporting)
    pub fn reset_at_secs(&self) -> i64 {
        // i64::div_ceil is unstable (int_roundings); equivalent on stable
        let q = self.reset_at_ms / 1000;
        let r = self.reset_at_ms % 1000;
        if r > 0 { q + 1 } else { q }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_expiry() {
        let slot = BucketSlot::new(3, 60_000);
        assert!(!slot.is_expired(59_999));
        assert!(slot.is_expired(60_000));
        assert!(slot.is_expired(61_000));
    }

    #[test]
    fn test_slot_remaining_clamped() {
        assert_eq!(BucketSlot::new(4, 0).remaining(), 4);
        assert_eq!(BucketSlot::new(0, 0).remaining(), 0);
        assert_eq!(BucketSlot::new(-1, 0).remaining(), 0);
    }

    #[test]
    fn test_reset_at_secs_rounds_up() {
        let outcome = ConsumeOutcome {
            rate_limited: false,
            remaining: 1,
            limit: 5,
            reset_at_ms: 60_001,
        };
        assert_eq!(outcome.reset_at_secs(), 61);

        let outcome = ConsumeOutcome {
            reset_at_ms: 60_000,
            ..outcome
        };
        assert_eq!(outcome.reset_at_secs(), 60);
    }
}
