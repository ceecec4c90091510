//! RedShell - webhook verdict service for agent commerce jobs.
//!
//! Receives job events over HTTP, judges the deliverable with a text or code
//! judge, and records the verdict on-chain by resolving contract call
//! arguments against a configurable ABI.

pub mod chain;
pub mod config;
pub mod extract;
pub mod judges;
pub mod recorder;
pub mod server;
pub mod types;

pub use config::RedshellConfig;
pub use recorder::{RecordOutcome, SkipReason, VerdictRecorder};
pub use server::{build_router, AppState};
pub use types::{JudgeKind, Verdict, VerdictTarget};
