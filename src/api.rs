//! REST API server for fundledger
//!
//! HTTP surface for campaign management, donation confirmation and the
//! ledger audit endpoints.

use axum::{
    extract::{Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::campaign::{Campaign, Donation, NewCampaign, NewDonation};
use crate::error::LedgerError;
use crate::ledger::LedgerEntry;
use crate::node::{Node, NodeState};
use crate::payment::PaymentReceipt;
use crate::transaction::TransactionRecord;

const DEFAULT_API_PORT: u16 = 5001;

/// API state: the node plus request statistics.
#[derive(Clone)]
pub struct ApiNode {
    pub node: Arc<Node>,
    api_stats: Arc<RwLock<ApiStats>>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    campaigns_created: u64,
    donations_confirmed: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl ApiNode {
    pub fn new(node: Arc<Node>) -> Self {
        Self {
            node,
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            campaigns_created: stats.campaigns_created,
            donations_confirmed: stats.donations_confirmed,
            uptime_seconds: uptime,
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    LedgerFailure(LedgerError),
    InvalidInput(String),
    NotFound(String),
    PaymentRejected(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::LedgerFailure(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::PaymentRejected(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::CampaignNotFound(id) => {
                ApiError::NotFound(format!("Campaign {} not found", id))
            }
            LedgerError::InvalidCampaign(msg) => ApiError::InvalidInput(msg),
            LedgerError::PaymentError(msg) => ApiError::PaymentRejected(msg),
            LedgerError::DatabaseError(_) | LedgerError::IoError(_) => {
                ApiError::InternalError(err.to_string())
            }
            other => ApiError::LedgerFailure(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct ConfirmDonationRequest {
    pub payment_id: String,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub signature: String,
    pub campaign_id: i64,
    /// Minor currency units (paise).
    pub amount: u64,
    pub donor_name: Option<String>,
}

#[derive(Serialize)]
pub struct ConfirmDonationResponse {
    pub message: String,
    pub block_hash: String,
    pub donation: Donation,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub height: u64,
    pub checked_at: String,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub campaigns_created: u64,
    pub donations_confirmed: u64,
    pub uptime_seconds: u64,
}

// ============================================================================
// Middleware
// ============================================================================

/// Request statistics middleware
async fn stats_middleware(State(api): State<Arc<ApiNode>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    let mut stats = api.api_stats.write().await;
    stats.record_request(success);

    response
}

/// Request logging middleware. Logs method, path, status, duration and the
/// current `NodeState`.
async fn logging_middleware(
    State(api): State<Arc<ApiNode>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();
    let node_state = format!("{:?}", api.node.state.read().await.clone());

    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        node_state = %node_state,
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints (also used by tests)
pub fn build_api_router(api: Arc<ApiNode>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    let api_routes = Router::new()
        // Campaign endpoints
        .route("/campaigns", get(list_campaigns).post(create_campaign))
        .route("/campaigns/:id", get(get_campaign))
        .route("/campaigns/:id/donations", get(get_campaign_donations))
        // Donation confirmation (payment collaborator entry point)
        .route("/donations/confirm", post(confirm_donation))
        // Ledger audit endpoints
        .route("/ledger/transactions", get(get_ledger_transactions))
        .route("/ledger/verify", get(verify_ledger))
        .route("/ledger/height", get(get_ledger_height))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        // logging before stats so we always record timing and node-state
        .layer(middleware::from_fn_with_state(api.clone(), logging_middleware))
        .layer(middleware::from_fn_with_state(api.clone(), stats_middleware))
        .with_state(api)
        .layer(cors.clone());

    Router::new().nest("/api", api_routes).layer(cors)
}

/// Run the API server
pub async fn run_api_server(
    api: Arc<ApiNode>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(api);

    let port = if port == 0 { DEFAULT_API_PORT } else { port };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(api): State<Arc<ApiNode>>) -> impl IntoResponse {
    let state = api.node.state.read().await.clone();
    match state {
        NodeState::Ready => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "node_state": format!("{:?}", state),
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        )
            .into_response(),
        _ => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unhealthy",
                "node_state": format!("{:?}", state),
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        )
            .into_response(),
    }
}

async fn list_campaigns(
    State(api): State<Arc<ApiNode>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let campaigns = api.node.persistence.list_campaigns()?;
    Ok(Json(serde_json::json!({
        "count": campaigns.len(),
        "campaigns": campaigns
    })))
}

async fn create_campaign(
    State(api): State<Arc<ApiNode>>,
    Json(new): Json<NewCampaign>,
) -> Result<Json<Campaign>, ApiError> {
    let campaign = api.node.persistence.create_campaign(&new)?;

    {
        let mut stats = api.api_stats.write().await;
        stats.campaigns_created += 1;
    }

    Ok(Json(campaign))
}

async fn get_campaign(
    State(api): State<Arc<ApiNode>>,
    Path(id): Path<i64>,
) -> Result<Json<Campaign>, ApiError> {
    api.node
        .persistence
        .get_campaign(id)?
        .ok_or_else(|| ApiError::NotFound(format!("Campaign {} not found", id)))
        .map(Json)
}

async fn get_campaign_donations(
    State(api): State<Arc<ApiNode>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if api.node.persistence.get_campaign(id)?.is_none() {
        return Err(ApiError::NotFound(format!("Campaign {} not found", id)));
    }
    let donations = api.node.persistence.donations_for_campaign(id)?;
    Ok(Json(serde_json::json!({
        "campaign_id": id,
        "count": donations.len(),
        "donations": donations
    })))
}

/// The payment-confirmation path: verify the receipt with the gateway,
/// append the donation to the ledger, write the block ahead, then record the
/// donation row carrying the block hash. The ledger write lock is held for
/// the whole append-and-persist section so concurrent confirmations
/// serialize.
async fn confirm_donation(
    State(api): State<Arc<ApiNode>>,
    Json(req): Json<ConfirmDonationRequest>,
) -> Result<Json<ConfirmDonationResponse>, ApiError> {
    if req.amount == 0 {
        return Err(ApiError::InvalidInput(
            "Donation amount must be greater than zero".to_string(),
        ));
    }
    let donor_name = req
        .donor_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "Anonymous".to_string());

    let node = &api.node;
    if node.persistence.get_campaign(req.campaign_id)?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Campaign {} not found",
            req.campaign_id
        )));
    }

    // Payment verification happens before anything touches the ledger.
    let receipt = PaymentReceipt {
        payment_id: req.payment_id.clone(),
        order_id: req.order_id.clone(),
        signature: req.signature.clone(),
    };
    node.gateway.verify_payment(&receipt)?;

    let record = TransactionRecord::donation(
        req.payment_id.clone(),
        req.campaign_id,
        req.amount,
        donor_name.clone(),
    );

    let donation = {
        let mut ledger = node.ledger.write().await;
        let block = ledger.append(record)?;
        node.persistence.append_block(&block)?;
        node.persistence.record_donation(&NewDonation {
            amount: req.amount,
            donor_name,
            payment_id: req.payment_id,
            campaign_id: req.campaign_id,
            block_hash: block.hash,
        })?
    };

    {
        let mut stats = api.api_stats.write().await;
        stats.donations_confirmed += 1;
    }

    Ok(Json(ConfirmDonationResponse {
        message: "Donation recorded".to_string(),
        block_hash: donation.block_hash.clone(),
        donation,
    }))
}

async fn get_ledger_transactions(
    State(api): State<Arc<ApiNode>>,
) -> Json<Vec<LedgerEntry>> {
    let ledger = api.node.ledger.read().await;
    Json(ledger.export())
}

async fn verify_ledger(State(api): State<Arc<ApiNode>>) -> Json<VerifyResponse> {
    let ledger = api.node.ledger.read().await;
    let valid = ledger.verify();
    if !valid {
        tracing::error!("Ledger integrity check failed");
    }
    Json(VerifyResponse {
        valid,
        height: ledger.len() as u64,
        checked_at: chrono::Utc::now().to_rfc3339(),
    })
}

async fn get_ledger_height(State(api): State<Arc<ApiNode>>) -> Json<u64> {
    let ledger = api.node.ledger.read().await;
    Json(ledger.len() as u64)
}

async fn get_api_stats(State(api): State<Arc<ApiNode>>) -> Json<ApiStatsResponse> {
    Json(api.get_stats().await)
}
