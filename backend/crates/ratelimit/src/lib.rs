//! Rate Limiting Backend Module
//!
//! Distributed token-bucket rate limiter shared by all request-handling
//! middleware. Clean Architecture structure:
//! - `domain/` - Bucket state, key composition, store trait
//! - `application/` - Token bucket, policy table, limiter registry
//! - `infra/` - PostgreSQL and in-memory store implementations
//! - `presentation/` - Middleware adapters and response DTOs
//!
//! ## Correctness Model
//! - One logical bucket per `(namespace, identifier)` pair; the store's
//!   single atomic consume operation is the only mutation path, so
//!   concurrent callers never double-spend a token
//! - Denied requests never push the bucket below its floor
//! - Every touch (including denials) re-arms the sliding expiry, so an
//!   idle bucket resets naturally via TTL rather than explicit deletion
//! - Store outages honor a per-policy fail-open/fail-closed choice

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::bucket::TokenBucket;
pub use application::config::{FailurePolicy, RateLimitConfig, RateLimitPolicy};
pub use application::registry::RateLimiters;
pub use domain::entities::{BucketSlot, ConsumeOutcome};
pub use domain::repository::BucketStore;
pub use error::{RateLimitError, RlResult};
pub use infra::memory::MemoryBucketStore;
pub use infra::postgres::PgBucketStore;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
