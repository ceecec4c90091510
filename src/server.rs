//! HTTP surface - webhook intake, authorization and verdict response.
//!
//! `POST /` takes a job event; `GET`/`HEAD /` answer a liveness check; any
//! other method gets `405` from the router. Parsing and authorization
//! failures are the only non-200 answers for a well-formed request; judge
//! and chain failures are absorbed below this layer.
//!
//! Evaluation runs on its own task so a panic surfaces as `500`. The task is
//! tied to the request: when the client goes away it is aborted, and any
//! judge call or submission still in flight is abandoned.

use crate::chain::gateway::{AlloyGateway, ChainGateway};
use crate::config::RedshellConfig;
use crate::extract;
use crate::judges::JudgeRouter;
use crate::recorder::{RecordOutcome, VerdictRecorder};
use crate::types::Verdict;
use anyhow::anyhow;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tokio::task::AbortHandle;
use tracing::{debug, error, info};

pub const LIVENESS_MESSAGE: &str = "RedShell judge is running";

/// Headers that may carry the webhook signature, in lookup order.
pub const SIGNATURE_HEADERS: [&str; 3] = ["x-alchemy-signature", "x-webhook-signature", "x-signature"];

/// Shared, read-only request context.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RedshellConfig>,
    pub judges: JudgeRouter,
    pub recorder: VerdictRecorder,
}

impl AppState {
    pub fn new(config: Arc<RedshellConfig>, judges: JudgeRouter, gateway: Arc<dyn ChainGateway>) -> Self {
        let recorder = VerdictRecorder::new(config.clone(), gateway);
        Self {
            config,
            judges,
            recorder,
        }
    }

    /// Production wiring: HTTP judges and the alloy chain gateway.
    pub fn from_config(config: RedshellConfig) -> Self {
        let config = Arc::new(config);
        let judges = JudgeRouter::from_config(&config, Client::new());
        Self::new(config, judges, Arc::new(AlloyGateway::new()))
    }
}

/// Body of a successful webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub ok: bool,
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
    pub verdict: Verdict,
}

/// Unexpected failure while handling a request.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Unhandled error: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness).post(handle_webhook))
        .with_state(state)
}

async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

/// Compare the first signature header present against the shared secret.
///
/// With no secret configured, every request passes.
pub fn verify_signature(headers: &HeaderMap, secret: Option<&str>) -> bool {
    let Some(secret) = secret.map(str::trim).filter(|s| !s.is_empty()) else {
        return true;
    };

    let Some(signature) = SIGNATURE_HEADERS.iter().find_map(|name| headers.get(*name)) else {
        info!("Missing webhook signature header.");
        return false;
    };

    let matches: bool = signature.as_bytes().ct_eq(secret.as_bytes()).into();
    if !matches {
        info!("Invalid webhook signature.");
    }
    matches
}

/// Aborts the evaluation task if the request future is dropped first.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn addresses_equal(left: &str, right: &str) -> bool {
    left.eq_ignore_ascii_case(right)
}

async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let event: Value = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(_) => return Ok((StatusCode::BAD_REQUEST, "Invalid JSON").into_response()),
    };

    if !verify_signature(&headers, state.config.webhook_secret.as_deref()) {
        return Ok((StatusCode::UNAUTHORIZED, "Unauthorized").into_response());
    }

    let evaluator = extract::evaluator_address(&event);
    let (Some(evaluator), Some(expected)) = (evaluator, state.config.wallet_address.as_deref()) else {
        info!("Missing evaluator or REDSHELL_WALLET_ADDRESS.");
        return Ok((StatusCode::ACCEPTED, "Ignored").into_response());
    };
    if !addresses_equal(&evaluator, expected) {
        return Ok((StatusCode::ACCEPTED, "Ignored").into_response());
    }

    let task = tokio::spawn(evaluate_job(state, event));
    let _abort = AbortOnDrop(task.abort_handle());
    let response = task
        .await
        .map_err(|e| anyhow!("job evaluation aborted: {}", e))?;

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Judge the event, then record the verdict on-chain best-effort.
async fn evaluate_job(state: AppState, event: Value) -> WebhookResponse {
    let job_id = extract::job_id(&event);
    let memo_id = extract::memo_id(&event);

    let verdict = state.judges.route(&event).await;
    info!("Intent to {}: {}", verdict.label(), verdict.reason);

    if let RecordOutcome::Submitted(receipt) = state
        .recorder
        .record(job_id.as_deref(), memo_id.as_deref(), &verdict)
        .await
    {
        debug!("Verdict confirmed in tx {}", receipt.tx_hash);
    }

    info!(
        "Job {} -> {} ({})",
        job_id.as_deref().unwrap_or("unknown"),
        verdict.label(),
        verdict.judge_kind.as_str()
    );

    WebhookResponse {
        ok: true,
        job_id,
        verdict,
    }
}
