//! Rate Limit Middleware
//!
//! Binds a token bucket to a route or group: resolves the caller's IP,
//! consults the bucket, and translates the outcome into response
//! headers and, on denial, a 429.

use std::net::IpAddr;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::client::require_client_ip;

use crate::application::bucket::TokenBucket;
use crate::domain::entities::ConsumeOutcome;
use crate::domain::repository::BucketStore;
use crate::error::{RateLimitError, RlResult};
use crate::presentation::dto::RateLimitedBody;

/// Response headers reporting limiter state (stable client contract)
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Middleware state: one bucket, cloned per route it guards
pub struct RateLimitState<S>
where
    S: BucketStore,
{
    pub bucket: Arc<TokenBucket<S>>,
}

impl<S> Clone for RateLimitState<S>
where
    S: BucketStore,
{
    fn clone(&self) -> Self {
        Self {
            bucket: Arc::clone(&self.bucket),
        }
    }
}

impl<S> RateLimitState<S>
where
    S: BucketStore,
{
    pub fn new(bucket: Arc<TokenBucket<S>>) -> Self {
        Self { bucket }
    }
}

/// Middleware that charges one token per request
///
/// Allowed requests are forwarded with the rate-limit headers attached
/// to the downstream response. Denials short-circuit with a 429
/// carrying the same headers. An unresolvable client IP is a server
/// error, never a silent bypass.
pub async fn enforce<S>(
    state: RateLimitState<S>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    S: BucketStore + Send + Sync + 'static,
{
    let ip = match client_ip(&req) {
        Ok(ip) => ip,
        Err(e) => return Err(e.into_response()),
    };

    let outcome = match state.bucket.consume(&ip.to_string()).await {
        Ok(outcome) => outcome,
        Err(e) => return Err(e.into_response()),
    };

    if outcome.rate_limited {
        return Err(too_many_requests(&outcome));
    }

    let mut res = next.run(req).await;
    apply_headers(res.headers_mut(), &outcome);
    Ok(res)
}

/// Middleware that denies on an exhausted bucket without charging it
///
/// Used for the invalid-auth class: the budget is spent by explicit
/// [`record_invalid_auth_attempt`] calls on failed credential checks,
/// not by request volume; this gate only locks out callers whose
/// budget is already gone.
pub async fn gate<S>(
    state: RateLimitState<S>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    S: BucketStore + Send + Sync + 'static,
{
    let ip = match client_ip(&req) {
        Ok(ip) => ip,
        Err(e) => return Err(e.into_response()),
    };

    let outcome = match state.bucket.peek(&ip.to_string()).await {
        Ok(outcome) => outcome,
        Err(e) => return Err(e.into_response()),
    };

    if outcome.rate_limited {
        return Err(too_many_requests(&outcome));
    }

    Ok(next.run(req).await)
}

/// Charge one invalid-auth token for the caller.
///
/// Handlers call this after a failed credential check, independent of
/// normal request volume, to slow down credential stuffing.
pub async fn record_invalid_auth_attempt<S>(
    bucket: &TokenBucket<S>,
    ip: IpAddr,
) -> RlResult<ConsumeOutcome>
where
    S: BucketStore + Send + Sync + 'static,
{
    let outcome = bucket.consume(&ip.to_string()).await?;
    tracing::warn!(
        client_ip = %ip,
        remaining = outcome.remaining,
        "Recorded invalid auth attempt"
    );
    Ok(outcome)
}

/// Resolve the client IP from trusted headers, then the socket address
fn client_ip(req: &Request<Body>) -> Result<IpAddr, RateLimitError> {
    let direct_ip = req
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.ip());

    Ok(require_client_ip(req.headers(), direct_ip)?)
}

/// Attach the limiter headers to a response
fn apply_headers(headers: &mut HeaderMap, outcome: &ConsumeOutcome) {
    let entries = [
        (LIMIT_HEADER, outcome.limit.to_string()),
        (REMAINING_HEADER, outcome.remaining.to_string()),
        (RESET_HEADER, outcome.reset_at_secs().to_string()),
    ];
    for (name, value) in entries {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}

/// Build the 429 rejection, headers included
fn too_many_requests(outcome: &ConsumeOutcome) -> Response {
    let mut res =
        (StatusCode::TOO_MANY_REQUESTS, Json(RateLimitedBody::new())).into_response();
    apply_headers(res.headers_mut(), outcome);
    res
}
