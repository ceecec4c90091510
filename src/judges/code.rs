//! Code judge - runs the deliverable and approves clean executions.

use crate::extract::{extract_code, truncate};
use crate::judges::sandbox::Sandbox;
use crate::judges::Judge;
use crate::types::{JudgeKind, Verdict};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// Characters of stdout quoted in an approving reason.
const STDOUT_PREVIEW_CHARS: usize = 200;

pub struct CodeJudge {
    /// `None` when no sandbox credential is configured
    sandbox: Option<Arc<dyn Sandbox>>,
}

impl CodeJudge {
    pub fn new(sandbox: Option<Arc<dyn Sandbox>>) -> Self {
        Self { sandbox }
    }
}

fn language_suffix(language: Option<&str>) -> String {
    language.map(|lang| format!(" ({})", lang)).unwrap_or_default()
}

#[async_trait]
impl Judge for CodeJudge {
    #[instrument(skip(self, event))]
    async fn judge(&self, event: &Value) -> Verdict {
        let Some(sandbox) = &self.sandbox else {
            return Verdict::reject("Missing E2B_API_KEY for code judge.", JudgeKind::Code);
        };

        let extracted = extract_code(event);
        let Some(code) = extracted.code else {
            return Verdict::reject("No executable code found in deliverable.", JudgeKind::Code);
        };
        let language = extracted.language.as_deref();
        let suffix = language_suffix(language);

        let execution = match sandbox.run_code(&code, language).await {
            Ok(execution) => execution,
            Err(e) => {
                return Verdict::reject(format!("Sandbox error: {:#}", e), JudgeKind::Code);
            }
        };

        if !execution.stderr.is_empty() || !execution.error.is_empty() {
            let detail = if execution.stderr.is_empty() {
                &execution.error
            } else {
                &execution.stderr
            };
            info!("Code execution failed{}", suffix);
            return Verdict::reject(format!("Runtime error{}: {}", suffix, detail), JudgeKind::Code);
        }

        if execution.stdout.is_empty() {
            Verdict::approve("Execution succeeded with no output.", JudgeKind::Code)
        } else {
            Verdict::approve(
                format!(
                    "Execution succeeded{}: {}",
                    suffix,
                    truncate(&execution.stdout, STDOUT_PREVIEW_CHARS, "...")
                ),
                JudgeKind::Code,
            )
        }
    }
}
