//! End-to-end tests for the webhook endpoint with scripted judges and chain

use alloy::primitives::{B256, U256};
use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use redshell::chain::gateway::{ChainEndpoint, ChainGateway, SubmissionReceipt, SubmissionRequest};
use redshell::chain::resolver::BoundValue;
use redshell::judges::{Judge, JudgeRouter};
use redshell::config::ConfigBuilder;
use redshell::{build_router, AppState, JudgeKind, RedshellConfig, Verdict};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const WALLET: &str = "0x00000000000000000000000000000000000000aB";
const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
const SIGN_MEMO_ABI: &str = r#"[{"type":"function","name":"signMemo","stateMutability":"nonpayable",
    "inputs":[{"name":"memoId","type":"uint256"},{"name":"isApproved","type":"bool"},{"name":"reason","type":"string"}]}]"#;

struct CountingJudge {
    kind: JudgeKind,
    approved: bool,
    calls: AtomicUsize,
}

impl CountingJudge {
    fn new(kind: JudgeKind, approved: bool) -> Arc<Self> {
        Arc::new(Self {
            kind,
            approved,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Judge for CountingJudge {
    async fn judge(&self, _event: &Value) -> Verdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.approved {
            Verdict::approve("looks good", self.kind)
        } else {
            Verdict::reject("not good enough", self.kind)
        }
    }
}

#[derive(Default)]
struct RecordingGateway {
    submitted: Mutex<Vec<SubmissionRequest>>,
}

#[async_trait]
impl ChainGateway for RecordingGateway {
    async fn pending_memo_id(&self, _endpoint: &ChainEndpoint, _job_id: U256) -> Result<Option<U256>> {
        Ok(None)
    }

    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionReceipt> {
        self.submitted.lock().unwrap().push(request.clone());
        Ok(SubmissionReceipt {
            tx_hash: B256::repeat_byte(0x11),
            block_number: Some(7),
            success: true,
            confirmed_at: Utc::now(),
        })
    }
}

struct Harness {
    app: Router,
    text: Arc<CountingJudge>,
    code: Arc<CountingJudge>,
    gateway: Arc<RecordingGateway>,
}

fn harness(config: RedshellConfig) -> Harness {
    let text = CountingJudge::new(JudgeKind::Text, true);
    let code = CountingJudge::new(JudgeKind::Code, false);
    let gateway = Arc::new(RecordingGateway::default());
    let judges = JudgeRouter::new(text.clone(), code.clone());
    let app = build_router(AppState::new(Arc::new(config), judges, gateway.clone()));
    Harness {
        app,
        text,
        code,
        gateway,
    }
}

fn chain_builder() -> ConfigBuilder {
    RedshellConfig::builder()
        .with_wallet(WALLET, Some(DEV_KEY.to_string()))
        .with_rpc("http://127.0.0.1:8545", None)
        .with_contract(CONTRACT, SIGN_MEMO_ABI, "signMemo")
}

fn chain_config() -> RedshellConfig {
    chain_builder().build()
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_liveness() {
    let h = harness(RedshellConfig::default());
    let response = h
        .app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "RedShell judge is running");
}

#[tokio::test]
async fn test_other_methods_not_allowed() {
    let h = harness(RedshellConfig::default());
    let response = h
        .app
        .oneshot(Request::builder().method(Method::PUT).uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_invalid_json_is_rejected() {
    let h = harness(RedshellConfig::default());
    let response = h.app.oneshot(post("{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Invalid JSON");
}

#[tokio::test]
async fn test_bad_signature_never_reaches_judge_or_chain() {
    let config = chain_builder().with_webhook_secret("s3cr3t").build();
    let h = harness(config);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("x-signature", "wrong")
        .body(Body::from(json!({"jobId": "1", "memoId": "2", "evaluator": WALLET}).to_string()))
        .unwrap();

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "Unauthorized");
    assert_eq!(h.text.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.code.calls.load(Ordering::SeqCst), 0);
    assert!(h.gateway.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_matching_signature_is_accepted() {
    let config = chain_builder().with_webhook_secret("s3cr3t").build();
    let h = harness(config);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("x-alchemy-signature", "s3cr3t")
        .body(Body::from(json!({"jobId": "1", "evaluator": WALLET}).to_string()))
        .unwrap();

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_other_evaluator_is_ignored() {
    let h = harness(chain_config());
    let body = json!({"jobId": "1", "evaluator": "0x0000000000000000000000000000000000000001"});
    let response = h.app.oneshot(post(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_text(response).await, "Ignored");
    assert_eq!(h.text.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_wallet_is_ignored() {
    let h = harness(RedshellConfig::default());
    let body = json!({"jobId": "1", "evaluator": WALLET});
    let response = h.app.oneshot(post(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_code_hint_routes_to_code_judge_without_chain_config() {
    let config = RedshellConfig::builder().with_wallet("0xABC", None).build();
    let h = harness(config);
    let body = json!({
        "jobId": "42",
        "evaluator": "0xabc",
        "jobType": "code",
        "deliverable": "print('hi')"
    });

    let response = h.app.oneshot(post(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        payload,
        json!({
            "ok": true,
            "jobId": "42",
            "verdict": {"approved": false, "reason": "not good enough", "judge": "code"}
        })
    );
    assert_eq!(h.code.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.text.calls.load(Ordering::SeqCst), 0);
    assert!(h.gateway.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_verdict_is_submitted_on_chain() {
    let h = harness(chain_config());
    let body = json!({
        "data": {"jobId": 9, "memoId": "31", "evaluator": WALLET.to_lowercase()},
        "deliverable": {"summary": "done"}
    });

    let response = h.app.oneshot(post(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(payload["jobId"], "9");
    assert_eq!(payload["verdict"]["judge"], "text");
    assert_eq!(payload["verdict"]["approved"], true);

    let submitted = h.gateway.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].function.name, "signMemo");
    assert_eq!(
        submitted[0].binding.values(),
        &[
            BoundValue::Uint(U256::from(31u64)),
            BoundValue::Bool(true),
            BoundValue::Text("Evaluated by RedShell".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_argument_template_and_reason_are_submitted() {
    let config = chain_builder()
        .with_contract_args(r#"["$jobId", "$approved", "$reason"]"#)
        .with_contract_reason("Judged by panel")
        .build();
    let h = harness(config);
    let body = json!({"jobId": "9", "evaluator": WALLET, "jobType": "text", "deliverable": "essay"});

    let response = h.app.oneshot(post(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let submitted = h.gateway.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(
        submitted[0].binding.values(),
        &[
            BoundValue::Uint(U256::from(9u64)),
            BoundValue::Bool(true),
            BoundValue::Text("Judged by panel".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_later_job_type_hint_routes_prose_to_text_judge() {
    let h = harness(RedshellConfig::builder().with_wallet(WALLET, None).build());
    let body = json!({
        "jobId": "3",
        "evaluator": WALLET,
        "jobType": "review",
        "payload": {"job_type": "text"},
        "deliverable": "An essay about ponds."
    });

    let response = h.app.oneshot(post(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.text.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.code.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_skipped_submission_still_answers_ok() {
    let h = harness(chain_config());
    let body = json!({"evaluator": WALLET, "deliverable": "essay"});

    let response = h.app.oneshot(post(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(payload["jobId"], Value::Null);
    assert!(h.gateway.submitted.lock().unwrap().is_empty());
}
