//! Limiter Registry
//!
//! Application-context struct owning one bucket per limiter class.
//! Constructed once at startup from a validated policy table and
//! passed to route registration; there is no global limiter state.

use std::sync::Arc;

use platform::clock::Clock;

use crate::application::bucket::TokenBucket;
use crate::application::config::RateLimitConfig;
use crate::domain::repository::BucketStore;
use crate::error::RlResult;

/// One bucket per recognized limiter class, all sharing one store
pub struct RateLimiters<S>
where
    S: BucketStore,
{
    pub get: Arc<TokenBucket<S>>,
    pub strict_get: Arc<TokenBucket<S>>,
    pub search: Arc<TokenBucket<S>>,
    pub email: Arc<TokenBucket<S>>,
    pub modify: Arc<TokenBucket<S>>,
    pub crit_modify: Arc<TokenBucket<S>>,
    pub ddos_protection: Arc<TokenBucket<S>>,
    pub invalid_auth_attempt: Arc<TokenBucket<S>>,
}

impl<S> RateLimiters<S>
where
    S: BucketStore,
{
    /// Validate the policy table and construct every bucket.
    ///
    /// Fails fast on misconfiguration so a bad deployment never
    /// reaches request handling.
    pub fn new(config: RateLimitConfig, store: Arc<S>, clock: Arc<dyn Clock>) -> RlResult<Self> {
        config.validate()?;

        let bucket =
            |policy| Arc::new(TokenBucket::new(policy, Arc::clone(&store), Arc::clone(&clock)));

        Ok(Self {
            get: bucket(config.get),
            strict_get: bucket(config.strict_get),
            search: bucket(config.search),
            email: bucket(config.email),
            modify: bucket(config.modify),
            crit_modify: bucket(config.crit_modify),
            ddos_protection: bucket(config.ddos_protection),
            invalid_auth_attempt: bucket(config.invalid_auth_attempt),
        })
    }
}
