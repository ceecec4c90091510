//! Core types shared by the judges, the recorder and the HTTP layer.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Which judge produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeKind {
    Text,
    Code,
    Unknown,
}

impl JudgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JudgeKind::Text => "text",
            JudgeKind::Code => "code",
            JudgeKind::Unknown => "unknown",
        }
    }
}

/// Approve/reject decision on a deliverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub approved: bool,
    /// Human-readable explanation
    pub reason: String,
    #[serde(rename = "judge")]
    pub judge_kind: JudgeKind,
}

impl Verdict {
    pub fn approve(reason: impl Into<String>, judge_kind: JudgeKind) -> Self {
        Self {
            approved: true,
            reason: reason.into(),
            judge_kind,
        }
    }

    pub fn reject(reason: impl Into<String>, judge_kind: JudgeKind) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
            judge_kind,
        }
    }

    pub fn label(&self) -> &'static str {
        if self.approved {
            "APPROVE"
        } else {
            "REJECT"
        }
    }
}

/// Identifiers a verdict is recorded against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerdictTarget {
    pub job_id: Option<U256>,
    pub memo_id: Option<U256>,
}

impl VerdictTarget {
    /// Memo id takes priority over job id.
    pub fn target_id(&self) -> Option<U256> {
        self.memo_id.or(self.job_id)
    }
}
