//! PostgreSQL Store Implementation
//!
//! Shared bucket store for multi-instance deployments. Atomicity comes
//! from a single upsert statement; there is no separate lock and no
//! multi-roundtrip read-modify-write, so concurrent consumers for the
//! same key serialize on the row without head-of-line blocking across
//! keys.

use sqlx::PgPool;

use crate::domain::entities::BucketSlot;
use crate::domain::repository::BucketStore;
use crate::domain::value_objects::BucketKey;
use crate::error::RlResult;

/// PostgreSQL-backed bucket store
#[derive(Clone)]
pub struct PgBucketStore {
    pool: PgPool,
}

impl PgBucketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete slots whose window elapsed before `now_ms`.
    ///
    /// Expiry is enforced lazily on read, so this is hygiene rather
    /// than correctness; run it at startup and let failures degrade to
    /// a warning.
    pub async fn cleanup_expired(&self, now_ms: i64) -> RlResult<u64> {
        let deleted = sqlx::query("DELETE FROM rate_limit_buckets WHERE expires_at_ms <= $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(buckets = deleted, "Cleaned up expired rate limit buckets");
        Ok(deleted)
    }
}

impl BucketStore for PgBucketStore {
    async fn consume(
        &self,
        key: &BucketKey,
        capacity: u32,
        window_ms: i64,
        now_ms: i64,
    ) -> RlResult<BucketSlot> {
        // One statement covers all three cases: fresh/expired slot is
        // initialized to capacity minus the granted token, a live slot
        // is decremented with a floor of -1 (the exhausted marker), and
        // the expiry is re-armed on every touch, denials included.
        let row = sqlx::query_as::<_, (i64, i64)>(
            r#"
            INSERT INTO rate_limit_buckets (bucket_key, tokens_remaining, expires_at_ms)
            VALUES ($1, $2 - 1, $3 + $4)
            ON CONFLICT (bucket_key)
            DO UPDATE SET
                tokens_remaining = CASE
                    WHEN rate_limit_buckets.expires_at_ms <= $3 THEN $2 - 1
                    ELSE GREATEST(rate_limit_buckets.tokens_remaining - 1, -1)
                END,
                expires_at_ms = $3 + $4
            RETURNING tokens_remaining, expires_at_ms
            "#,
        )
        .bind(key.as_str())
        .bind(capacity as i64)
        .bind(now_ms)
        .bind(window_ms)
        .fetch_one(&self.pool)
        .await?;

        Ok(BucketSlot::new(row.0, row.1))
    }

    async fn peek(&self, key: &BucketKey, now_ms: i64) -> RlResult<Option<BucketSlot>> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT tokens_remaining, expires_at_ms
            FROM rate_limit_buckets
            WHERE bucket_key = $1 AND expires_at_ms > $2
            "#,
        )
        .bind(key.as_str())
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(tokens_remaining, expires_at_ms)| {
            BucketSlot::new(tokens_remaining, expires_at_ms)
        }))
    }
}
