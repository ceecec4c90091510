//! Verdict recorder - best-effort on-chain recording of judge verdicts.
//!
//! Recording runs as a linear pipeline: configuration preflight, identifier
//! resolution, ABI lookup, argument resolution, submission. Any missing
//! precondition ends the pipeline with a logged [`SkipReason`]; submission
//! failures are logged and swallowed. Neither ever affects the verdict
//! returned to the webhook caller.

use crate::chain::abi::ContractInterface;
use crate::chain::codec::encode_call;
use crate::chain::gateway::{
    resolve_chain, signer_from_key, ChainEndpoint, ChainGateway, SubmissionReceipt,
    SubmissionRequest,
};
use crate::chain::identifier::parse_optional;
use crate::chain::resolver::{resolve_arguments, ResolutionContext};
use crate::config::RedshellConfig;
use crate::types::{Verdict, VerdictTarget};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Reason written on-chain when none is configured.
pub const DEFAULT_REASON: &str = "Evaluated by RedShell";

/// Why a verdict was not submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("Missing BASE_RPC_URL")]
    MissingRpcUrl,
    #[error("Missing ACP_CONTRACT_ADDRESS")]
    MissingContractAddress,
    #[error("Invalid ACP_CONTRACT_ADDRESS {0:?}")]
    InvalidContractAddress(String),
    #[error("Missing ACP_CONTRACT_FUNCTION")]
    MissingFunction,
    #[error("Missing or invalid ACP_CONTRACT_ABI")]
    InvalidAbi,
    #[error("Missing REDSHELL_WALLET_PRIVATE_KEY")]
    MissingPrivateKey,
    #[error("Invalid REDSHELL_WALLET_PRIVATE_KEY")]
    InvalidPrivateKey,
    #[error("No memoId or jobId found")]
    MissingIdentifier,
    #[error("Invalid memoId/jobId")]
    InvalidIdentifier,
    #[error("Function {0} not found in ACP_CONTRACT_ABI")]
    FunctionNotFound(String),
    #[error("Unable to build contract args")]
    UnresolvableArguments,
    #[error("Unable to encode contract call: {0}")]
    Encoding(String),
}

/// Validated chain configuration for one submission attempt.
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub endpoint: ChainEndpoint,
    pub function_name: String,
    pub interface: ContractInterface,
    pub signer: PrivateKeySigner,
    pub override_template: Option<String>,
    pub reason: String,
    pub evaluator: Option<String>,
}

/// Check every configuration precondition, stopping at the first one missing.
pub fn preflight(config: &RedshellConfig) -> Result<ChainSettings, SkipReason> {
    let rpc_url = config.rpc_url.clone().ok_or(SkipReason::MissingRpcUrl)?;

    let contract_raw = config
        .contract_address
        .as_deref()
        .ok_or(SkipReason::MissingContractAddress)?;
    let contract = contract_raw
        .parse::<Address>()
        .map_err(|_| SkipReason::InvalidContractAddress(contract_raw.to_string()))?;

    let function_name = config
        .contract_function
        .clone()
        .ok_or(SkipReason::MissingFunction)?;

    let interface = config
        .contract_abi
        .as_deref()
        .and_then(ContractInterface::parse)
        .ok_or(SkipReason::InvalidAbi)?;

    let key = config
        .wallet_private_key
        .as_deref()
        .ok_or(SkipReason::MissingPrivateKey)?;
    let signer = signer_from_key(key).map_err(|_| SkipReason::InvalidPrivateKey)?;

    Ok(ChainSettings {
        endpoint: ChainEndpoint {
            rpc_url,
            chain: resolve_chain(config.chain_id.as_deref()),
            contract,
        },
        function_name,
        interface,
        signer,
        override_template: config.contract_args.clone(),
        reason: config
            .contract_reason
            .clone()
            .unwrap_or_else(|| DEFAULT_REASON.to_string()),
        evaluator: config.wallet_address.clone(),
    })
}

/// Parse raw identifiers; an unparseable one is dropped, not fatal.
///
/// Fails only when no identifier was supplied or none of them parse.
pub fn resolve_target(job_id: Option<&str>, memo_id: Option<&str>) -> Result<VerdictTarget, SkipReason> {
    if job_id.is_none() && memo_id.is_none() {
        return Err(SkipReason::MissingIdentifier);
    }

    let target = VerdictTarget {
        job_id: parse_optional("jobId", job_id),
        memo_id: parse_optional("memoId", memo_id),
    };
    if target.target_id().is_none() {
        return Err(SkipReason::InvalidIdentifier);
    }
    Ok(target)
}

/// Locate the function, bind its arguments and check that they encode.
pub fn plan_submission(
    settings: &ChainSettings,
    target: &VerdictTarget,
    approved: bool,
) -> Result<SubmissionRequest, SkipReason> {
    let function = settings
        .interface
        .find_function(&settings.function_name)
        .ok_or_else(|| SkipReason::FunctionNotFound(settings.function_name.clone()))?;

    let ctx = ResolutionContext::new(
        target.memo_id,
        target.job_id,
        approved,
        settings.reason.clone(),
        settings.evaluator.clone(),
    )
    .ok_or(SkipReason::InvalidIdentifier)?;

    let binding = resolve_arguments(function, &ctx, settings.override_template.as_deref())
        .ok_or(SkipReason::UnresolvableArguments)?;

    encode_call(function, &binding).map_err(|e| SkipReason::Encoding(e.to_string()))?;

    Ok(SubmissionRequest {
        endpoint: settings.endpoint.clone(),
        signer: settings.signer.clone(),
        function: function.clone(),
        binding,
    })
}

/// What happened to a verdict on-chain.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Skipped(SkipReason),
    Submitted(SubmissionReceipt),
    Failed(String),
}

/// Records verdicts through a [`ChainGateway`].
#[derive(Clone)]
pub struct VerdictRecorder {
    config: Arc<RedshellConfig>,
    gateway: Arc<dyn ChainGateway>,
}

impl VerdictRecorder {
    pub fn new(config: Arc<RedshellConfig>, gateway: Arc<dyn ChainGateway>) -> Self {
        Self { config, gateway }
    }

    /// Record `verdict` against the job/memo named in the event.
    ///
    /// Never returns an error; the outcome is informational.
    #[instrument(skip(self, verdict), fields(approved = verdict.approved))]
    pub async fn record(
        &self,
        job_id: Option<&str>,
        memo_id: Option<&str>,
        verdict: &Verdict,
    ) -> RecordOutcome {
        match self.prepare(job_id, memo_id, verdict).await {
            Ok(request) => self.submit(request).await,
            Err(reason) => {
                info!("{}. Skipping on-chain verdict.", reason);
                RecordOutcome::Skipped(reason)
            }
        }
    }

    async fn prepare(
        &self,
        job_id: Option<&str>,
        memo_id: Option<&str>,
        verdict: &Verdict,
    ) -> Result<SubmissionRequest, SkipReason> {
        let settings = preflight(&self.config)?;
        let mut target = resolve_target(job_id, memo_id)?;

        if let (None, Some(job)) = (target.memo_id, target.job_id) {
            match self.gateway.pending_memo_id(&settings.endpoint, job).await {
                Ok(Some(memo)) => {
                    debug!("Using pending memo {} for job {}", memo, job);
                    target.memo_id = Some(memo);
                }
                Ok(None) => debug!("No pending memo for job {}", job),
                Err(e) => warn!("Pending memo lookup failed for job {}: {:#}", job, e),
            }
        }

        plan_submission(&settings, &target, verdict.approved)
    }

    async fn submit(&self, request: SubmissionRequest) -> RecordOutcome {
        match self.gateway.submit(&request).await {
            Ok(receipt) => RecordOutcome::Submitted(receipt),
            Err(e) => {
                warn!("Failed to submit verdict: {:#}", e);
                RecordOutcome::Failed(format!("{:#}", e))
            }
        }
    }
}
