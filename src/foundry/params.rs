//! Orchestrator parameter types: the per-standard base call shapes, the
//! extension-module vocabulary, and post-deployment configuration chunks.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chain::{Blockchain, NetworkEnvironment};
use crate::standard::TokenStandard;

/// One unit of work for the deployment orchestrator.
#[derive(Debug, Clone)]
pub struct FoundryDeploymentParams {
    pub token_id: String,
    pub project_id: String,
    pub config: FoundryTokenConfig,
    pub blockchain: Blockchain,
    pub environment: NetworkEnvironment,
    pub gas: Option<GasConfig>,
    /// Deploy from this exact wallet instead of the project's default
    /// (blockchain, type) wallet. Supports address reuse across EVM chains.
    pub wallet_address: Option<Address>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GasConfig {
    pub priority: GasPriority,
    /// Hard override; skips estimation when set.
    pub gas_limit: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
}

/// Base-level fields needed for the constructor/initializer call, per
/// standard. Simpler than the enhanced configs: optional sections are
/// applied after deployment, never here.
///
/// `owner: None` means "the deployer wallet"; the orchestrator substitutes
/// the resolved signer address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "standard", rename_all = "kebab-case")]
pub enum FoundryTokenConfig {
    #[serde(rename = "erc-20")]
    Erc20 {
        name: String,
        symbol: String,
        decimals: u8,
        initial_supply: U256,
        max_supply: U256,
        owner: Option<Address>,
        is_mintable: bool,
        is_burnable: bool,
        is_pausable: bool,
    },
    #[serde(rename = "erc-721")]
    Erc721 {
        name: String,
        symbol: String,
        base_uri: String,
        max_supply: u64,
        owner: Option<Address>,
        is_mintable: bool,
        is_burnable: bool,
    },
    #[serde(rename = "erc-1155")]
    Erc1155 {
        name: String,
        symbol: String,
        base_uri: String,
        owner: Option<Address>,
        batch_minting: bool,
        supply_tracking: bool,
    },
    #[serde(rename = "erc-1400")]
    Erc1400 {
        name: String,
        symbol: String,
        decimals: u8,
        initial_supply: U256,
        default_partitions: Vec<String>,
        owner: Option<Address>,
        is_controllable: bool,
        is_issuable: bool,
    },
    #[serde(rename = "erc-3525")]
    Erc3525 {
        name: String,
        symbol: String,
        value_decimals: u8,
        owner: Option<Address>,
    },
    #[serde(rename = "erc-4626")]
    Erc4626 {
        name: String,
        symbol: String,
        decimals: u8,
        asset: Option<Address>,
        owner: Option<Address>,
    },
}

impl FoundryTokenConfig {
    pub const fn standard(&self) -> TokenStandard {
        match self {
            Self::Erc20 { .. } => TokenStandard::Erc20,
            Self::Erc721 { .. } => TokenStandard::Erc721,
            Self::Erc1155 { .. } => TokenStandard::Erc1155,
            Self::Erc1400 { .. } => TokenStandard::Erc1400,
            Self::Erc3525 { .. } => TokenStandard::Erc3525,
            Self::Erc4626 { .. } => TokenStandard::Erc4626,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Erc20 { name, .. }
            | Self::Erc721 { name, .. }
            | Self::Erc1155 { name, .. }
            | Self::Erc1400 { name, .. }
            | Self::Erc3525 { name, .. }
            | Self::Erc4626 { name, .. } => name,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::Erc20 { symbol, .. }
            | Self::Erc721 { symbol, .. }
            | Self::Erc1155 { symbol, .. }
            | Self::Erc1400 { symbol, .. }
            | Self::Erc3525 { symbol, .. }
            | Self::Erc4626 { symbol, .. } => symbol,
        }
    }

    pub fn owner(&self) -> Option<Address> {
        match self {
            Self::Erc20 { owner, .. }
            | Self::Erc721 { owner, .. }
            | Self::Erc1155 { owner, .. }
            | Self::Erc1400 { owner, .. }
            | Self::Erc3525 { owner, .. }
            | Self::Erc4626 { owner, .. } => *owner,
        }
    }

    /// Copy with `owner: None` replaced by the deployer address.
    pub fn with_default_owner(mut self, deployer: Address) -> Self {
        let owner = match &mut self {
            Self::Erc20 { owner, .. }
            | Self::Erc721 { owner, .. }
            | Self::Erc1155 { owner, .. }
            | Self::Erc1400 { owner, .. }
            | Self::Erc3525 { owner, .. }
            | Self::Erc4626 { owner, .. } => owner,
        };
        if owner.is_none() {
            *owner = Some(deployer);
        }
        self
    }
}

/// Auxiliary contracts attachable to a deployed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleKind {
    Compliance,
    Fees,
    Governance,
    Vesting,
    PolicyEngine,
    Royalty,
}

impl ModuleKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compliance => "compliance",
            Self::Fees => "fees",
            Self::Governance => "governance",
            Self::Vesting => "vesting",
            Self::PolicyEngine => "policy-engine",
            Self::Royalty => "royalty",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One post-deployment configuration transaction's worth of related
/// records, applied through the token's generic configuration entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigChunk {
    pub section: String,
    pub label: String,
    pub payload: serde_json::Value,
}
