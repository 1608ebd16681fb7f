//! Token Bucket Use Case
//!
//! One bucket per limiter class, constructed once at startup and shared
//! across requests. Decides, for one identifier, whether the current
//! request is allowed.

use std::sync::Arc;

use platform::clock::Clock;

use crate::application::config::{FailurePolicy, RateLimitPolicy};
use crate::domain::entities::ConsumeOutcome;
use crate::domain::repository::BucketStore;
use crate::domain::value_objects::BucketKey;
use crate::error::{RateLimitError, RlResult};

/// Fixed-capacity, fixed-window token bucket bound to one namespace
pub struct TokenBucket<S>
where
    S: BucketStore,
{
    policy: RateLimitPolicy,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> TokenBucket<S>
where
    S: BucketStore,
{
    pub fn new(policy: RateLimitPolicy, store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            store,
            clock,
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Attempt to take one token for the given identifier.
    ///
    /// An empty identifier is a caller fault, answered with a server
    /// error rather than a silent bypass. Store errors honor the
    /// policy's fail-open/fail-closed choice.
    pub async fn consume(&self, identifier: &str) -> RlResult<ConsumeOutcome> {
        if identifier.is_empty() {
            return Err(RateLimitError::MissingIdentifier);
        }
        let key = BucketKey::new(&self.policy.namespace, identifier);
        let now_ms = self.clock.now_ms();

        let slot = match self
            .store
            .consume(&key, self.policy.capacity, self.policy.window_ms(), now_ms)
            .await
        {
            Ok(slot) => slot,
            Err(e) => return self.on_store_error(e, now_ms),
        };

        let outcome = ConsumeOutcome {
            rate_limited: slot.tokens_remaining < 0,
            remaining: slot.remaining(),
            limit: self.policy.capacity,
            reset_at_ms: slot.expires_at_ms,
        };

        if outcome.rate_limited {
            tracing::debug!(
                namespace = %self.policy.namespace,
                identifier,
                "Rate limit exceeded"
            );
        }
        Ok(outcome)
    }

    /// Report the identifier's bucket state without taking a token.
    ///
    /// Used by gates that deny on an already-exhausted budget (e.g.
    /// invalid-auth lockout) where the request itself is not charged.
    pub async fn peek(&self, identifier: &str) -> RlResult<ConsumeOutcome> {
        if identifier.is_empty() {
            return Err(RateLimitError::MissingIdentifier);
        }
        let key = BucketKey::new(&self.policy.namespace, identifier);
        let now_ms = self.clock.now_ms();

        let slot = match self.store.peek(&key, now_ms).await {
            Ok(slot) => slot,
            Err(e) => return self.on_store_error(e, now_ms),
        };

        Ok(match slot {
            Some(slot) => ConsumeOutcome {
                // a consume would be denied once nothing is left
                rate_limited: slot.tokens_remaining <= 0,
                remaining: slot.remaining(),
                limit: self.policy.capacity,
                reset_at_ms: slot.expires_at_ms,
            },
            None => self.fresh_outcome(now_ms),
        })
    }

    /// Outcome for an identifier with no stored state: full capacity
    fn fresh_outcome(&self, now_ms: i64) -> ConsumeOutcome {
        ConsumeOutcome {
            rate_limited: false,
            remaining: self.policy.capacity,
            limit: self.policy.capacity,
            reset_at_ms: now_ms + self.policy.window_ms(),
        }
    }

    fn on_store_error(&self, err: RateLimitError, now_ms: i64) -> RlResult<ConsumeOutcome> {
        match self.policy.on_store_error {
            FailurePolicy::Open => {
                tracing::error!(
                    namespace = %self.policy.namespace,
                    error = %err,
                    "Bucket store unavailable, failing open"
                );
                // synthetic allowance as if one token were taken from
                // a fresh bucket; nothing is persisted
                Ok(ConsumeOutcome {
                    rate_limited: false,
                    remaining: self.policy.capacity.saturating_sub(1),
                    limit: self.policy.capacity,
                    reset_at_ms: now_ms + self.policy.window_ms(),
                })
            }
            FailurePolicy::Closed => Err(err),
        }
    }
}
