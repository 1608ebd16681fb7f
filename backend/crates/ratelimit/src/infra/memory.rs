//! In-Memory Store Implementation
//!
//! Process-local bucket store for single-instance deployments and
//! tests. Atomicity comes from the map lock; the critical section is
//! pure computation, never held across an await.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::entities::BucketSlot;
use crate::domain::repository::BucketStore;
use crate::domain::value_objects::BucketKey;
use crate::error::RlResult;

/// Mutex-guarded map of live bucket slots
///
/// Expired slots are treated as absent and replaced lazily on the next
/// touch; `sweep_expired` exists for long-running processes that want
/// to reclaim memory for idle identifiers.
#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    slots: Mutex<HashMap<String, BucketSlot>>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every slot whose window has elapsed; returns how many
    pub fn sweep_expired(&self, now_ms: i64) -> usize {
        let mut slots = self.slots.lock().expect("bucket map lock poisoned");
        let before = slots.len();
        slots.retain(|_, slot| !slot.is_expired(now_ms));
        before - slots.len()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().expect("bucket map lock poisoned").len()
    }
}

impl BucketStore for MemoryBucketStore {
    async fn consume(
        &self,
        key: &BucketKey,
        capacity: u32,
        window_ms: i64,
        now_ms: i64,
    ) -> RlResult<BucketSlot> {
        let mut slots = self.slots.lock().expect("bucket map lock poisoned");
        let expires_at_ms = now_ms + window_ms;

        let slot = slots
            .entry(key.as_str().to_owned())
            .and_modify(|slot| {
                if slot.is_expired(now_ms) {
                    slot.tokens_remaining = capacity as i64 - 1;
                } else {
                    slot.tokens_remaining = (slot.tokens_remaining - 1).max(-1);
                }
                slot.expires_at_ms = expires_at_ms;
            })
            .or_insert_with(|| BucketSlot::new(capacity as i64 - 1, expires_at_ms));

        Ok(*slot)
    }

    async fn peek(&self, key: &BucketKey, now_ms: i64) -> RlResult<Option<BucketSlot>> {
        let slots = self.slots.lock().expect("bucket map lock poisoned");
        Ok(slots
            .get(key.as_str())
            .filter(|slot| !slot.is_expired(now_ms))
            .copied())
    }
}
