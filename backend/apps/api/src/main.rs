//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.
//!
//! The routes here exist to exercise the rate limit middleware; the
//! business handlers behind them live elsewhere.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{self, HeaderMap, Method, header};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use kernel::error::app_error::{AppError, AppResult};
use platform::client::require_client_ip;
use platform::clock::{Clock, SystemClock};
use ratelimit::application::bucket::TokenBucket;
use ratelimit::presentation::middleware::{self, RateLimitState};
use ratelimit::{BucketStore, MemoryBucketStore, PgBucketStore, RateLimitConfig, RateLimiters};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,ratelimit=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Policy table: defaults plus RATE_LIMIT_* env overrides,
    // validated before any route is registered
    let config = RateLimitConfig::from_env();

    // Shared store: Postgres when DATABASE_URL is set (multi-instance
    // deployments), otherwise an in-process store
    let app = match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;

            tracing::info!("Migrations completed");

            let store = PgBucketStore::new(pool);

            // Startup cleanup: remove expired bucket rows
            // Errors here should not prevent server startup
            match store.cleanup_expired(clock.now_ms()).await {
                Ok(buckets) => {
                    tracing::info!(buckets_deleted = buckets, "Bucket cleanup completed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Bucket cleanup failed, continuing anyway");
                }
            }

            let limiters = RateLimiters::new(config, Arc::new(store), clock)?;
            build_app(limiters)
        }
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, using the in-process bucket store (single instance only)"
            );
            let limiters = RateLimiters::new(config, Arc::new(MemoryBucketStore::new()), clock)?;
            build_app(limiters)
        }
    };

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    let app = app.layer(TraceLayer::new_for_http()).layer(cors);

    // Start server
    let port = platform::config::env_or("PORT", 31160u16);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Build the router, binding one bucket per route group
fn build_app<S>(limiters: RateLimiters<S>) -> Router
where
    S: BucketStore + Send + Sync + 'static,
{
    let limit = |bucket: &Arc<TokenBucket<S>>| {
        let state = RateLimitState::new(Arc::clone(bucket));
        axum::middleware::from_fn(move |req, next| middleware::enforce(state.clone(), req, next))
    };

    let reads = Router::new()
        .route("/api/projects", get(projects_get))
        .route("/api/projects/{slug}", get(project_get))
        .route_layer(limit(&limiters.get));

    let bulk_reads = Router::new()
        .route("/api/projects/bulk", get(projects_bulk_get))
        .route_layer(limit(&limiters.strict_get));

    let search = Router::new()
        .route("/api/search", get(search_get))
        .route_layer(limit(&limiters.search));

    let email = Router::new()
        .route("/api/user/confirmation-email", post(confirmation_email_post))
        .route_layer(limit(&limiters.email));

    let modify = Router::new()
        .route("/api/project", post(project_post))
        .route_layer(limit(&limiters.modify));

    let crit_modify = Router::new()
        .route("/api/user", delete(user_delete))
        .route_layer(limit(&limiters.crit_modify));

    let cdn = Router::new()
        .route("/cdn/data/{file}", get(cdn_file_get))
        .route_layer(limit(&limiters.ddos_protection));

    // Login is gated (denied once the attempt budget is spent) but not
    // charged per request; only failed credential checks are charged,
    // inside the handler
    let gate_state = RateLimitState::new(Arc::clone(&limiters.invalid_auth_attempt));
    let auth = Router::new()
        .route("/api/auth/login", post(login_post::<S>))
        .route_layer(axum::middleware::from_fn(move |req, next| {
            middleware::gate(gate_state.clone(), req, next)
        }))
        .with_state(AuthState {
            invalid_auth: Arc::clone(&limiters.invalid_auth_attempt),
        });

    Router::new()
        .merge(reads)
        .merge(bulk_reads)
        .merge(search)
        .merge(email)
        .merge(modify)
        .merge(crit_modify)
        .merge(cdn)
        .merge(auth)
}

// ============================================================================
// Demo handlers
// ============================================================================

async fn projects_get() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "projects": [] }))
}

async fn project_get(Path(slug): Path<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "slug": slug }))
}

async fn projects_bulk_get() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "projects": [] }))
}

async fn search_get() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "hits": [] }))
}

async fn confirmation_email_post() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "sent": true }))
}

async fn project_post() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "created": true }))
}

async fn user_delete() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "deleted": true }))
}

async fn cdn_file_get(Path(file): Path<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "file": file }))
}

/// Login handler state: the bucket charged on failed credential checks
struct AuthState<S>
where
    S: BucketStore,
{
    invalid_auth: Arc<TokenBucket<S>>,
}

impl<S> Clone for AuthState<S>
where
    S: BucketStore,
{
    fn clone(&self) -> Self {
        Self {
            invalid_auth: Arc::clone(&self.invalid_auth),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// Stand-in credential check: accepts the DEMO_USER/DEMO_PASSWORD pair
/// from the environment. A failed check charges the caller's
/// invalid-auth bucket; request volume alone never does.
async fn login_post<S>(
    State(state): State<AuthState<S>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<serde_json::Value>>
where
    S: BucketStore + Send + Sync + 'static,
{
    let expected_user = env::var("DEMO_USER").unwrap_or_else(|_| "demo".to_string());
    let expected_password = env::var("DEMO_PASSWORD").unwrap_or_else(|_| "demo".to_string());

    if body.username == expected_user && body.password == expected_password {
        return Ok(Json(serde_json::json!({ "success": true })));
    }

    let ip = require_client_ip(&headers, Some(addr.ip()))
        .map_err(|_| AppError::internal("Cannot determine client identity"))?;

    middleware::record_invalid_auth_attempt(&state.invalid_auth, ip)
        .await
        .map_err(AppError::from)?;

    Err(AppError::unauthorized("Invalid username or password"))
}
