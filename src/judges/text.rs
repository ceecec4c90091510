//! Text judge - asks an LLM whether the deliverable meets the criteria.
//!
//! Uses the Anthropic Messages API. Every failure mode (missing key, HTTP
//! error, unparseable answer) becomes a rejecting verdict with a diagnostic
//! reason.

use crate::extract::{criteria, deliverable, format_evidence, truncate, EVIDENCE_MAX_CHARS};
use crate::judges::Judge;
use crate::types::{JudgeKind, Verdict};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const SYSTEM_PROMPT: &str = "You are an impartial judge for ACP deliverables.";
const MAX_TOKENS: u32 = 400;
const TEMPERATURE: f32 = 0.2;
const ERROR_BODY_CHARS: usize = 200;
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// LLM-backed judge for text deliverables.
pub struct TextJudge {
    http: Client,
    api_key: Option<String>,
    url: String,
    model: String,
}

impl TextJudge {
    pub fn new(
        http: Client,
        api_key: Option<String>,
        url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key,
            url: url.into(),
            model: model.into(),
        }
    }
}

/// User prompt: output contract, then criteria, then evidence.
pub fn build_prompt(criteria: &str, evidence: &str) -> String {
    [
        "Return ONLY strict JSON with keys: approved (boolean), reason (string).",
        "TASK/CRITERIA:",
        criteria,
        "",
        "EVIDENCE:",
        evidence,
    ]
    .join("\n")
}

/// Parse `{approved, reason}` from model output.
///
/// Falls back to the outermost `{...}` span when the text has extra prose
/// around the JSON object.
pub fn parse_verdict(text: &str) -> Option<(bool, String)> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = serde_json::from_str::<Value>(trimmed).ok().or_else(|| {
        let start = trimmed.find('{')?;
        let end = trimmed.rfind('}')?;
        if end <= start {
            return None;
        }
        serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
    })?;

    let object = parsed.as_object()?;
    let approved = object.get("approved").and_then(Value::as_bool).unwrap_or(false);
    let reason = object
        .get("reason")
        .and_then(Value::as_str)
        .filter(|reason| !reason.is_empty())
        .unwrap_or("No reason provided.")
        .to_string();
    Some((approved, reason))
}

fn first_text_block(response: &MessagesResponse) -> &str {
    response
        .content
        .iter()
        .find(|block| block.kind.as_deref() == Some("text"))
        .and_then(|block| block.text.as_deref())
        .unwrap_or_default()
}

#[async_trait]
impl Judge for TextJudge {
    #[instrument(skip(self, event), fields(model = %self.model))]
    async fn judge(&self, event: &Value) -> Verdict {
        let Some(api_key) = &self.api_key else {
            return Verdict::reject("Missing ANTHROPIC_API_KEY for text judge.", JudgeKind::Text);
        };

        let criteria = criteria(event).unwrap_or_else(|| "No explicit criteria provided.".to_string());
        let evidence = format_evidence(deliverable(event).as_ref(), EVIDENCE_MAX_CHARS);

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: build_prompt(&criteria, &evidence),
            }],
        };

        let response = match self
            .http
            .post(&self.url)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Anthropic request failed: {}", e);
                return Verdict::reject(format!("Anthropic request failed: {}", e), JudgeKind::Text);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Verdict::reject(
                format!(
                    "Anthropic error: {} {}",
                    status.as_u16(),
                    truncate(&body, ERROR_BODY_CHARS, "")
                ),
                JudgeKind::Text,
            );
        }

        let payload: MessagesResponse = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                debug!("Anthropic body was not a messages response: {}", e);
                return Verdict::reject("Anthropic response was not valid JSON.", JudgeKind::Text);
            }
        };

        match parse_verdict(first_text_block(&payload)) {
            Some((approved, reason)) => Verdict {
                approved,
                reason,
                judge_kind: JudgeKind::Text,
            },
            None => Verdict::reject("Anthropic response was not valid JSON.", JudgeKind::Text),
        }
    }
}
