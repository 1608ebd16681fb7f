//! Clock abstraction
//!
//! Time source used by anything that stamps or expires state, so tests
//! can control time instead of sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Clock abstraction so timing can be faked in tests.
///
/// Returns wall-clock time because bucket expiries are shared across
/// processes; a per-process monotonic clock would not agree between
/// instances sharing one store.
pub trait Clock: Send + Sync {
    /// Current time as epoch milliseconds
    fn now_ms(&self) -> i64;
}

/// System clock backed by `chrono::Utc::now()`
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock for tests
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock starting at the given epoch milliseconds
    pub fn starting_at(now_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(now_ms)),
        }
    }

    /// Advance the clock by the given number of milliseconds
    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Set the clock to an absolute time
    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_recent() {
        let clock = SystemClock;
        // 2020-01-01 as a sanity floor
        assert!(clock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::starting_at(1_000);
        assert_eq!(clock.now_ms(), 1_000);

        clock.advance_ms(60_000);
        assert_eq!(clock.now_ms(), 61_000);

        clock.set_ms(500);
        assert_eq!(clock.now_ms(), 500);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::starting_at(0);
        let other = clock.clone();

        clock.advance_ms(1_234);
        assert_eq!(other.now_ms(), 1_234);
    }
}
