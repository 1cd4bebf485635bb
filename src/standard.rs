//! The six supported token standards and their on-chain artifact mapping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unknown token types fail fast: every deployment must map to exactly one
/// known master-artifact / factory-method pair.
#[derive(Debug, thiserror::Error)]
#[error("unknown token standard: {0}")]
pub struct UnknownStandardError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenStandard {
    /// Fungible token (ERC-20).
    Erc20,
    /// Non-fungible token (ERC-721).
    Erc721,
    /// Multi-token (ERC-1155).
    Erc1155,
    /// Security token with partitions and transfer controls (ERC-1400).
    Erc1400,
    /// Semi-fungible slot/value token (ERC-3525).
    Erc3525,
    /// Tokenized vault shares (ERC-4626).
    Erc4626,
}

impl TokenStandard {
    pub const ALL: [Self; 6] = [
        Self::Erc20,
        Self::Erc721,
        Self::Erc1155,
        Self::Erc1400,
        Self::Erc3525,
        Self::Erc4626,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Erc20 => "erc-20",
            Self::Erc721 => "erc-721",
            Self::Erc1155 => "erc-1155",
            Self::Erc1400 => "erc-1400",
            Self::Erc3525 => "erc-3525",
            Self::Erc4626 => "erc-4626",
        }
    }

    /// Name of the master implementation artifact behind the per-token proxy.
    pub const fn master_artifact(self) -> &'static str {
        match self {
            Self::Erc20 => "BaseERC20Token",
            Self::Erc721 => "BaseERC721Token",
            Self::Erc1155 => "BaseERC1155Token",
            Self::Erc1400 => "BaseERC1400Token",
            Self::Erc3525 => "BaseERC3525Token",
            Self::Erc4626 => "BaseERC4626Token",
        }
    }

    /// Factory method invoked when a factory is registered for the network.
    pub const fn factory_method(self) -> &'static str {
        match self {
            Self::Erc20 => "deployERC20",
            Self::Erc721 => "deployERC721",
            Self::Erc1155 => "deployERC1155",
            Self::Erc1400 => "deployERC1400",
            Self::Erc3525 => "deployERC3525",
            Self::Erc4626 => "deployERC4626",
        }
    }

    /// Standards subject to the compliance validation pass before deployment.
    pub const fn is_security_like(self) -> bool {
        matches!(self, Self::Erc1400 | Self::Erc3525)
    }
}

impl fmt::Display for TokenStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenStandard {
    type Err = UnknownStandardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "erc-20" | "erc20" => Ok(Self::Erc20),
            "erc-721" | "erc721" => Ok(Self::Erc721),
            "erc-1155" | "erc1155" => Ok(Self::Erc1155),
            "erc-1400" | "erc1400" => Ok(Self::Erc1400),
            "erc-3525" | "erc3525" => Ok(Self::Erc3525),
            "erc-4626" | "erc4626" => Ok(Self::Erc4626),
            other => Err(UnknownStandardError(other.to_owned())),
        }
    }
}
