//! HTTP surface of the launch registry
//!
//! Serves the query and broadcast interfaces consumed by
//! [`crate::client::RegistryClient`]. Ledger calls touch SQLite, so they run
//! on the blocking pool.

use axum::{
    extract::{Path, Request, State},
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use crate::error::NetworkError;
use crate::launch::{
    Broadcaster, GenesisAccount, GenesisValidator, LaunchId, LaunchQuery, Request as LaunchRequest,
    SignedTx, TxResponse, VestingAccount,
};
use crate::registry::Ledger;

/// Shared server state
#[derive(Clone)]
pub struct ApiState {
    pub ledger: Arc<Ledger>,
    stats: Arc<ApiStats>,
}

#[derive(Debug, Default)]
struct ApiStats {
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    transactions_committed: AtomicU64,
}

impl ApiState {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        ApiState {
            ledger,
            stats: Arc::new(ApiStats::default()),
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub struct ApiError(NetworkError);

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u32,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            NetworkError::NotFound(_) => (StatusCode::NOT_FOUND, 0),
            NetworkError::TxRejected { code, .. } => (StatusCode::BAD_REQUEST, *code),
            NetworkError::InvalidMessage(_) | NetworkError::InvalidCoin(_) => {
                (StatusCode::BAD_REQUEST, 0)
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, 0),
        };
        let error = match self.0 {
            NetworkError::TxRejected { log, .. } => log,
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error, code })).into_response()
    }
}

impl From<NetworkError> for ApiError {
    fn from(err: NetworkError) -> Self {
        ApiError(err)
    }
}

/// Runs a ledger call on the blocking pool.
async fn blocking<T, F>(state: &ApiState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Ledger) -> Result<T, NetworkError> + Send + 'static,
{
    let ledger = state.ledger.clone();
    tokio::task::spawn_blocking(move || f(ledger.as_ref()))
        .await
        .map_err(|e| ApiError(NetworkError::Transport(format!("ledger task failed: {}", e))))?
        .map_err(ApiError)
}

// ============================================================================
// Middleware
// ============================================================================

async fn logging_middleware(State(state): State<ApiState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let status = response.status();
    state.stats.total_requests.fetch_add(1, Ordering::Relaxed);
    if !status.is_success() {
        state.stats.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// Router
// ============================================================================

pub fn build_api_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        .route("/launch/:launch_id/genesis_account/:address", get(get_genesis_account))
        .route("/launch/:launch_id/vesting_account/:address", get(get_vesting_account))
        .route("/launch/:launch_id/genesis_validator/:address", get(get_genesis_validator))
        .route("/launch/:launch_id/requests", get(get_requests))
        .route("/txs", post(broadcast_tx))
        .layer(middleware::from_fn_with_state(state.clone(), logging_middleware))
        .layer(cors)
        .with_state(state)
}

/// Serve the registry API on `addr` until the process exits.
pub async fn run_api_server(ledger: Arc<Ledger>, addr: SocketAddr) -> Result<(), NetworkError> {
    let app = build_api_router(ApiState::new(ledger));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("launch registry listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let height = blocking(&state, |ledger| ledger.height()).await?;
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "height": height,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

async fn get_api_stats(State(state): State<ApiState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "total_requests": state.stats.total_requests.load(Ordering::Relaxed),
        "failed_requests": state.stats.failed_requests.load(Ordering::Relaxed),
        "transactions_committed": state.stats.transactions_committed.load(Ordering::Relaxed),
    }))
}

async fn get_genesis_account(
    State(state): State<ApiState>,
    Path((launch_id, address)): Path<(LaunchId, String)>,
) -> Result<Json<GenesisAccount>, ApiError> {
    let account = blocking(&state, move |ledger| ledger.genesis_account(launch_id, &address)).await?;
    Ok(Json(account))
}

async fn get_vesting_account(
    State(state): State<ApiState>,
    Path((launch_id, address)): Path<(LaunchId, String)>,
) -> Result<Json<VestingAccount>, ApiError> {
    let account = blocking(&state, move |ledger| ledger.vesting_account(launch_id, &address)).await?;
    Ok(Json(account))
}

async fn get_genesis_validator(
    State(state): State<ApiState>,
    Path((launch_id, address)): Path<(LaunchId, String)>,
) -> Result<Json<GenesisValidator>, ApiError> {
    let validator = blocking(&state, move |ledger| ledger.genesis_validator(launch_id, &address)).await?;
    Ok(Json(validator))
}

async fn get_requests(
    State(state): State<ApiState>,
    Path(launch_id): Path<LaunchId>,
) -> Result<Json<Vec<LaunchRequest>>, ApiError> {
    let requests = blocking(&state, move |ledger| ledger.request_all(launch_id)).await?;
    Ok(Json(requests))
}

async fn broadcast_tx(
    State(state): State<ApiState>,
    Json(tx): Json<SignedTx>,
) -> Result<Json<TxResponse>, ApiError> {
    let response = blocking(&state, move |ledger| ledger.broadcast_tx(&tx)).await?;
    state.stats.transactions_committed.fetch_add(1, Ordering::Relaxed);
    Ok(Json(response))
}
