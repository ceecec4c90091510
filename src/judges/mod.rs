//! Judges module - decides whether a deliverable satisfies its criteria.
//!
//! [`JudgeRouter`] classifies a job event as code or text and dispatches it
//! to the matching [`Judge`]. Judges never fail: every error is folded into a
//! rejecting [`Verdict`].

pub mod code;
pub mod sandbox;
pub mod text;

pub use code::CodeJudge;
pub use sandbox::{E2bSandbox, Execution, Sandbox};
pub use text::TextJudge;

use crate::config::RedshellConfig;
use crate::extract::{extract_code, job_type_hints};
use crate::types::{JudgeKind, Verdict};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Produces a verdict for a job event.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, event: &Value) -> Verdict;
}

fn classify_hint(hint: &str) -> Option<JudgeKind> {
    let normalized = hint.to_lowercase();
    if normalized.contains("code") {
        Some(JudgeKind::Code)
    } else if normalized.contains("text") {
        Some(JudgeKind::Text)
    } else {
        None
    }
}

/// Classify an event from the first job-type hint naming code or text,
/// falling back to whether it carries extractable code.
pub fn detect_job_type(event: &Value) -> JudgeKind {
    if let Some(kind) = job_type_hints(event).find_map(|hint| classify_hint(&hint)) {
        return kind;
    }

    if extract_code(event).code.is_some() {
        return JudgeKind::Code;
    }
    JudgeKind::Unknown
}

/// Dispatches events to the code or text judge.
#[derive(Clone)]
pub struct JudgeRouter {
    text: Arc<dyn Judge>,
    code: Arc<dyn Judge>,
}

impl JudgeRouter {
    pub fn new(text: Arc<dyn Judge>, code: Arc<dyn Judge>) -> Self {
        Self { text, code }
    }

    /// Build the production judges, handing each its own credential.
    pub fn from_config(config: &RedshellConfig, http: Client) -> Self {
        let sandbox = config.sandbox_api_key.as_ref().map(|key| {
            Arc::new(E2bSandbox::new(http.clone(), config.sandbox_url.clone(), key.clone()))
                as Arc<dyn Sandbox>
        });
        let text = TextJudge::new(
            http,
            config.anthropic_api_key.clone(),
            config.anthropic_url.clone(),
            config.anthropic_model.clone(),
        );
        Self::new(Arc::new(text), Arc::new(CodeJudge::new(sandbox)))
    }

    /// Judge an event. Anything not classified as code goes to the text judge.
    pub async fn route(&self, event: &Value) -> Verdict {
        let kind = detect_job_type(event);
        debug!("Detected job type: {}", kind.as_str());
        match kind {
            JudgeKind::Code => self.code.judge(event).await,
            JudgeKind::Text | JudgeKind::Unknown => self.text.judge(event).await,
        }
    }
}
