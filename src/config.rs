//! Service configuration.
//!
//! Everything is read from environment-style key/value pairs. Values are
//! trimmed, and blank values count as unset.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8787";
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const DEFAULT_SANDBOX_URL: &str = "https://api.e2b.dev";

/// Full configuration surface of the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedshellConfig {
    /// Address the webhook server binds to
    pub listen_addr: String,
    /// Evaluator wallet address events must be addressed to
    pub wallet_address: Option<String>,
    /// Hex private key used to sign verdict transactions
    pub wallet_private_key: Option<String>,
    /// Shared webhook secret; signature checks are skipped when unset
    pub webhook_secret: Option<String>,
    /// Text judge credential
    pub anthropic_api_key: Option<String>,
    pub anthropic_url: String,
    pub anthropic_model: String,
    /// Code judge credential
    pub sandbox_api_key: Option<String>,
    pub sandbox_url: String,
    /// JSON-RPC endpoint for verdict submission
    pub rpc_url: Option<String>,
    /// Raw chain id; see [`crate::chain::resolve_chain`]
    pub chain_id: Option<String>,
    pub contract_address: Option<String>,
    /// JSON array of ABI entries
    pub contract_abi: Option<String>,
    pub contract_function: Option<String>,
    /// JSON array argument template with `$placeholder` entries
    pub contract_args: Option<String>,
    /// Reason string written on-chain
    pub contract_reason: Option<String>,
}

impl Default for RedshellConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            wallet_address: None,
            wallet_private_key: None,
            webhook_secret: None,
            anthropic_api_key: None,
            anthropic_url: DEFAULT_ANTHROPIC_URL.to_string(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            sandbox_api_key: None,
            sandbox_url: DEFAULT_SANDBOX_URL.to_string(),
            rpc_url: None,
            chain_id: None,
            contract_address: None,
            contract_abi: None,
            contract_function: None,
            contract_args: None,
            contract_reason: None,
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RedshellConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| clean(lookup(key));
        let defaults = Self::default();

        Self {
            listen_addr: get("REDSHELL_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            wallet_address: get("REDSHELL_WALLET_ADDRESS"),
            wallet_private_key: get("REDSHELL_WALLET_PRIVATE_KEY"),
            webhook_secret: get("ALCHEMY_WEBHOOK_SECRET"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_url: get("ANTHROPIC_API_URL").unwrap_or(defaults.anthropic_url),
            anthropic_model: get("ANTHROPIC_MODEL").unwrap_or(defaults.anthropic_model),
            sandbox_api_key: get("E2B_API_KEY"),
            sandbox_url: get("E2B_API_URL").unwrap_or(defaults.sandbox_url),
            rpc_url: get("BASE_RPC_URL"),
            chain_id: get("CHAIN_ID"),
            contract_address: get("ACP_CONTRACT_ADDRESS"),
            contract_abi: get("ACP_CONTRACT_ABI"),
            contract_function: get("ACP_CONTRACT_FUNCTION"),
            contract_args: get("ACP_CONTRACT_ARGS"),
            contract_reason: get("ACP_CONTRACT_REASON"),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for [`RedshellConfig`], mainly for tests and embedding.
pub struct ConfigBuilder {
    config: RedshellConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RedshellConfig::default(),
        }
    }

    pub fn with_wallet(mut self, address: impl Into<String>, private_key: Option<String>) -> Self {
        self.config.wallet_address = clean(Some(address.into()));
        self.config.wallet_private_key = clean(private_key);
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.webhook_secret = clean(Some(secret.into()));
        self
    }

    pub fn with_rpc(mut self, rpc_url: impl Into<String>, chain_id: Option<String>) -> Self {
        self.config.rpc_url = clean(Some(rpc_url.into()));
        self.config.chain_id = clean(chain_id);
        self
    }

    /// Set the verdict contract, its ABI JSON and the function to call.
    pub fn with_contract(
        mut self,
        address: impl Into<String>,
        abi: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        self.config.contract_address = clean(Some(address.into()));
        self.config.contract_abi = clean(Some(abi.into()));
        self.config.contract_function = clean(Some(function.into()));
        self
    }

    pub fn with_contract_args(mut self, template: impl Into<String>) -> Self {
        self.config.contract_args = clean(Some(template.into()));
        self
    }

    pub fn with_contract_reason(mut self, reason: impl Into<String>) -> Self {
        self.config.contract_reason = clean(Some(reason.into()));
        self
    }

    pub fn build(self) -> RedshellConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
