//! Chain gateway - signs, submits and confirms verdict transactions.
//!
//! [`ChainGateway`] is the seam between verdict orchestration and the
//! network. [`AlloyGateway`] is the production implementation over an HTTP
//! JSON-RPC endpoint.

use crate::chain::abi::FunctionDescriptor;
use crate::chain::codec::encode_call;
use crate::chain::memos::{latest_pending_memo, memo_page_call, decode_memo_page};
use crate::chain::resolver::ArgumentBinding;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

/// Chain id assumed when none is configured.
pub const DEFAULT_CHAIN_ID: u64 = 84532;

/// Networks with a known chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Base,
    BaseSepolia,
}

impl Chain {
    pub fn id(&self) -> u64 {
        match self {
            Chain::Base => 8453,
            Chain::BaseSepolia => 84532,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Chain::Base => "base",
            Chain::BaseSepolia => "base-sepolia",
        }
    }

    pub fn from_id(id: u64) -> Option<Self> {
        match id {
            8453 => Some(Chain::Base),
            84532 => Some(Chain::BaseSepolia),
            _ => None,
        }
    }
}

/// Resolve the configured chain id.
///
/// Absent input selects [`DEFAULT_CHAIN_ID`]. Unparseable or unknown ids
/// leave the chain unresolved; the endpoint then decides.
pub fn resolve_chain(raw: Option<&str>) -> Option<Chain> {
    let id = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => text.parse::<u64>().ok()?,
        None => DEFAULT_CHAIN_ID,
    };
    Chain::from_id(id)
}

/// Parse a hex private key, with or without `0x`.
pub fn signer_from_key(raw: &str) -> Result<PrivateKeySigner> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if hex.len() != 64 {
        return Err(anyhow!("private key must be 32 bytes of hex, got {} chars", hex.len()));
    }
    PrivateKeySigner::from_str(hex).map_err(|e| anyhow!("invalid private key: {}", e))
}

/// Where verdicts are recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainEndpoint {
    pub rpc_url: String,
    /// `None` when the configured chain id is not recognized
    pub chain: Option<Chain>,
    pub contract: Address,
}

/// One verdict transaction, fully resolved.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub endpoint: ChainEndpoint,
    pub signer: PrivateKeySigner,
    pub function: FunctionDescriptor,
    pub binding: ArgumentBinding,
}

/// Confirmation of a mined verdict transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    /// `false` when the transaction reverted
    pub success: bool,
    pub confirmed_at: DateTime<Utc>,
}

/// Network operations needed to record a verdict.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Newest memo of `job_id` that requires approval and is not yet approved.
    async fn pending_memo_id(&self, endpoint: &ChainEndpoint, job_id: U256) -> Result<Option<U256>>;

    /// Sign and send the transaction, then wait for one confirmation.
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionReceipt>;
}

/// [`ChainGateway`] over alloy's HTTP provider.
#[derive(Debug, Clone, Default)]
pub struct AlloyGateway;

impl AlloyGateway {
    pub fn new() -> Self {
        Self
    }
}

fn parse_rpc_url(raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).with_context(|| format!("Invalid RPC URL: {}", raw))
}

#[async_trait]
impl ChainGateway for AlloyGateway {
    #[instrument(skip(self, endpoint), fields(contract = %endpoint.contract))]
    async fn pending_memo_id(&self, endpoint: &ChainEndpoint, job_id: U256) -> Result<Option<U256>> {
        let provider = ProviderBuilder::new().on_http(parse_rpc_url(&endpoint.rpc_url)?);

        let calldata = memo_page_call(job_id)?;
        let tx = TransactionRequest::default()
            .with_to(endpoint.contract)
            .with_input(calldata);

        let output = provider
            .call(&tx)
            .await
            .context("getAllMemos call failed")?;

        let page = decode_memo_page(&output)?;
        let memo_id = latest_pending_memo(&page);
        debug!("Pending memo for job {}: {:?}", job_id, memo_id);
        Ok(memo_id)
    }

    #[instrument(skip(self, request), fields(function = %request.function.name, contract = %request.endpoint.contract))]
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionReceipt> {
        let calldata = encode_call(&request.function, &request.binding)
            .context("Failed to encode verdict call")?;

        let wallet = EthereumWallet::from(request.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(parse_rpc_url(&request.endpoint.rpc_url)?);

        let mut tx = TransactionRequest::default()
            .with_to(request.endpoint.contract)
            .with_input(calldata);
        tx.from = Some(request.signer.address());
        if let Some(chain) = request.endpoint.chain {
            tx = tx.with_chain_id(chain.id());
        }

        let pending = provider
            .send_transaction(tx)
            .await
            .context("Failed to send verdict transaction")?;
        let tx_hash = *pending.tx_hash();
        info!(
            "Submitted verdict tx {} on {}",
            tx_hash,
            request.endpoint.chain.map_or("endpoint chain", |chain| chain.name())
        );

        let receipt = pending
            .get_receipt()
            .await
            .context("Failed waiting for verdict receipt")?;

        let result = SubmissionReceipt {
            tx_hash,
            block_number: receipt.block_number,
            success: receipt.status(),
            confirmed_at: Utc::now(),
        };

        if result.success {
            info!("Verdict confirmed on-chain in block {:?}", result.block_number);
        } else {
            warn!("Verdict transaction {} reverted", tx_hash);
        }
        Ok(result)
    }
}
