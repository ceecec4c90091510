//! Ephemeral code-execution sandbox.
//!
//! [`E2bSandbox`] talks to an E2B-style HTTP API: a sandbox is created per
//! execution, the code runs through the sandbox's execution endpoint, and
//! the sandbox is killed afterwards whether or not execution succeeded.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const CODE_INTERPRETER_TEMPLATE: &str = "code-interpreter-v1";
const EXECUTION_PORT: u16 = 49999;
const DEFAULT_SANDBOX_DOMAIN: &str = "e2b.app";
const SANDBOX_TIMEOUT_SECS: u64 = 60;

/// Captured output of one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    pub stdout: String,
    pub stderr: String,
    /// Uncaught error raised by the code, if any
    pub error: String,
}

/// Runs untrusted code in isolation.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn run_code(&self, code: &str, language: Option<&str>) -> Result<Execution>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SandboxHandle {
    #[serde(rename = "sandboxID")]
    sandbox_id: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    envd_access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

/// E2B-backed [`Sandbox`]. The API key is held by the client itself.
#[derive(Clone)]
pub struct E2bSandbox {
    http: Client,
    api_url: String,
    api_key: String,
}

impl E2bSandbox {
    pub fn new(http: Client, api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn create(&self) -> Result<SandboxHandle> {
        let response = self
            .http
            .post(format!("{}/sandboxes", self.api_url))
            .header("X-API-Key", &self.api_key)
            .json(&json!({
                "templateID": CODE_INTERPRETER_TEMPLATE,
                "timeout": SANDBOX_TIMEOUT_SECS,
            }))
            .send()
            .await
            .context("Failed to create sandbox")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("sandbox creation failed: {} {}", status.as_u16(), body));
        }

        response.json().await.context("Failed to parse sandbox handle")
    }

    async fn execute(&self, handle: &SandboxHandle, code: &str, language: Option<&str>) -> Result<Execution> {
        let domain = handle.domain.as_deref().unwrap_or(DEFAULT_SANDBOX_DOMAIN);
        let url = format!("https://{}-{}.{}/execute", EXECUTION_PORT, handle.sandbox_id, domain);

        let mut request = self
            .http
            .post(url)
            .timeout(Duration::from_secs(SANDBOX_TIMEOUT_SECS))
            .json(&ExecuteRequest { code, language });
        if let Some(token) = &handle.envd_access_token {
            request = request.header("X-Access-Token", token);
        }

        let response = request.send().await.context("Failed to reach sandbox")?;
        if !response.status().is_success() {
            return Err(anyhow!("sandbox execution failed: {}", response.status().as_u16()));
        }

        let body = response.text().await.context("Failed to read sandbox output")?;
        Ok(parse_execution_stream(&body))
    }

    async fn kill(&self, handle: &SandboxHandle) {
        let result = self
            .http
            .delete(format!("{}/sandboxes/{}", self.api_url, handle.sandbox_id))
            .header("X-API-Key", &self.api_key)
            .send()
            .await;
        if let Err(e) = result {
            warn!("Failed to close sandbox {}: {}", handle.sandbox_id, e);
        }
    }
}

#[async_trait]
impl Sandbox for E2bSandbox {
    #[instrument(skip(self, code), fields(code_len = code.len()))]
    async fn run_code(&self, code: &str, language: Option<&str>) -> Result<Execution> {
        let handle = self.create().await?;
        debug!("Created sandbox {}", handle.sandbox_id);

        let result = self.execute(&handle, code, language).await;
        self.kill(&handle).await;
        result
    }
}

/// Fold the newline-delimited JSON execution stream into an [`Execution`].
///
/// `stdout`/`stderr` chunks are concatenated; `result` text stands in for
/// stdout when nothing was printed; `error` events become `name: value`.
pub fn parse_execution_stream(body: &str) -> Execution {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut result_text = String::new();
    let mut error = String::new();

    for line in body.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Ok(event) = serde_json::from_str::<Value>(line) else {
            debug!("Skipping non-JSON sandbox line");
            continue;
        };
        let text = event.get("text").and_then(Value::as_str).unwrap_or_default();
        match event.get("type").and_then(Value::as_str) {
            Some("stdout") => stdout.push_str(text),
            Some("stderr") => stderr.push_str(text),
            Some("result") => result_text.push_str(text),
            Some("error") => {
                let name = event.get("name").and_then(Value::as_str).unwrap_or("Error");
                let value = event.get("value").and_then(Value::as_str).unwrap_or_default();
                error = format!("{}: {}", name, value);
            }
            _ => {}
        }
    }

    let stdout = if stdout.trim().is_empty() { result_text } else { stdout };
    Execution {
        stdout: stdout.trim().to_string(),
        stderr: stderr.trim().to_string(),
        error: error.trim().to_string(),
    }
}
