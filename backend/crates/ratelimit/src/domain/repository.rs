//! Store Traits
//!
//! Interface for bucket persistence. Implementations are in the
//! infrastructure layer.

use crate::domain::entities::BucketSlot;
use crate::domain::value_objects::BucketKey;
use crate::error::RlResult;

/// Bucket store trait
///
/// Shared by all token buckets, and across process boundaries in
/// multi-instance deployments. The store never interprets key contents;
/// key composition is the caller's job.
///
/// Time is passed in (`now_ms`) rather than read by the store, keeping
/// every implementation under the caller's `Clock`.
#[trait_variant::make(BucketStore: Send)]
pub trait LocalBucketStore {
    /// Atomically take one token from the keyed bucket.
    ///
    /// Single atomic fetch-or-initialize-then-decrement:
    /// - absent or expired slot: initialize to `capacity`, take one
    ///   token (result `capacity - 1`)
    /// - `tokens_remaining > -1`: decrement by one; `0` after the call
    ///   means the last token was granted
    /// - already at the `-1` floor: leave unchanged (denial)
    ///
    /// Every touch re-arms the expiry to `now_ms + window_ms`
    /// (sliding expiry), denials included.
    ///
    /// Two concurrent callers must never both observe the same token;
    /// this is the store's central correctness obligation.
    async fn consume(
        &self,
        key: &BucketKey,
        capacity: u32,
        window_ms: i64,
        now_ms: i64,
    ) -> RlResult<BucketSlot>;

    /// Read the keyed slot without taking a token.
    ///
    /// Returns `None` when the slot is absent or its window elapsed.
    async fn peek(&self, key: &BucketKey, now_ms: i64) -> RlResult<Option<BucketSlot>>;
}
