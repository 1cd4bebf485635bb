//! Supported EVM networks: chain-id resolution and block-explorer URLs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
#[error("unknown blockchain: {0}")]
pub struct UnknownBlockchainError(pub String);

#[derive(Debug, thiserror::Error)]
#[error("unknown network environment: {0}")]
pub struct UnknownEnvironmentError(pub String);

/// Raised when a connected node reports a chain id other than the one the
/// requested (blockchain, environment) pair resolves to.
#[derive(Debug, thiserror::Error)]
#[error("chain id mismatch for {blockchain} {environment}: expected {expected}, node reports {actual}")]
pub struct ChainIdMismatchError {
    pub blockchain: Blockchain,
    pub environment: NetworkEnvironment,
    pub expected: u64,
    pub actual: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Blockchain {
    Ethereum,
    Polygon,
    Base,
    Arbitrum,
    Optimism,
    Avalanche,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkEnvironment {
    Mainnet,
    Testnet,
}

impl Blockchain {
    pub const ALL: [Self; 6] = [
        Self::Ethereum,
        Self::Polygon,
        Self::Base,
        Self::Arbitrum,
        Self::Optimism,
        Self::Avalanche,
    ];

    /// The canonical chain id for this network in the given environment.
    /// Testnets are the ones the factory contracts are deployed to
    /// (Sepolia-family where available, Fuji for Avalanche).
    pub const fn chain_id(self, environment: NetworkEnvironment) -> u64 {
        match (self, environment) {
            (Self::Ethereum, NetworkEnvironment::Mainnet) => 1,
            (Self::Ethereum, NetworkEnvironment::Testnet) => 11_155_111,
            (Self::Polygon, NetworkEnvironment::Mainnet) => 137,
            (Self::Polygon, NetworkEnvironment::Testnet) => 80_002,
            (Self::Base, NetworkEnvironment::Mainnet) => 8453,
            (Self::Base, NetworkEnvironment::Testnet) => 84_532,
            (Self::Arbitrum, NetworkEnvironment::Mainnet) => 42_161,
            (Self::Arbitrum, NetworkEnvironment::Testnet) => 421_614,
            (Self::Optimism, NetworkEnvironment::Mainnet) => 10,
            (Self::Optimism, NetworkEnvironment::Testnet) => 11_155_420,
            (Self::Avalanche, NetworkEnvironment::Mainnet) => 43_114,
            (Self::Avalanche, NetworkEnvironment::Testnet) => 43_113,
        }
    }

    /// Block-explorer base URL, used to build actionable messages for
    /// stuck or slow transactions.
    pub const fn explorer_url(self, environment: NetworkEnvironment) -> &'static str {
        match (self, environment) {
            (Self::Ethereum, NetworkEnvironment::Mainnet) => "https://etherscan.io",
            (Self::Ethereum, NetworkEnvironment::Testnet) => "https://sepolia.etherscan.io",
            (Self::Polygon, NetworkEnvironment::Mainnet) => "https://polygonscan.com",
            (Self::Polygon, NetworkEnvironment::Testnet) => "https://amoy.polygonscan.com",
            (Self::Base, NetworkEnvironment::Mainnet) => "https://basescan.org",
            (Self::Base, NetworkEnvironment::Testnet) => "https://sepolia.basescan.org",
            (Self::Arbitrum, NetworkEnvironment::Mainnet) => "https://arbiscan.io",
            (Self::Arbitrum, NetworkEnvironment::Testnet) => "https://sepolia.arbiscan.io",
            (Self::Optimism, NetworkEnvironment::Mainnet) => "https://optimistic.etherscan.io",
            (Self::Optimism, NetworkEnvironment::Testnet) => {
                "https://sepolia-optimism.etherscan.io"
            }
            (Self::Avalanche, NetworkEnvironment::Mainnet) => "https://snowtrace.io",
            (Self::Avalanche, NetworkEnvironment::Testnet) => "https://testnet.snowtrace.io",
        }
    }

    pub fn explorer_tx_url(
        self,
        environment: NetworkEnvironment,
        tx_hash: alloy::primitives::TxHash,
    ) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url(environment))
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Polygon => "polygon",
            Self::Base => "base",
            Self::Arbitrum => "arbitrum",
            Self::Optimism => "optimism",
            Self::Avalanche => "avalanche",
        }
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Blockchain {
    type Err = UnknownBlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" => Ok(Self::Ethereum),
            "polygon" => Ok(Self::Polygon),
            "base" => Ok(Self::Base),
            "arbitrum" => Ok(Self::Arbitrum),
            "optimism" => Ok(Self::Optimism),
            "avalanche" => Ok(Self::Avalanche),
            other => Err(UnknownBlockchainError(other.to_owned())),
        }
    }
}

impl NetworkEnvironment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for NetworkEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkEnvironment {
    type Err = UnknownEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(UnknownEnvironmentError(other.to_owned())),
        }
    }
}

/// Verify that a connected node's reported chain id matches the id the
/// (blockchain, environment) pair resolves to. Guards against silently
/// deploying to the wrong network.
pub fn verify_chain_id(
    blockchain: Blockchain,
    environment: NetworkEnvironment,
    actual: u64,
) -> Result<(), ChainIdMismatchError> {
    let expected = blockchain.chain_id(environment);
    if expected == actual {
        Ok(())
    } else {
        Err(ChainIdMismatchError {
            blockchain,
            environment,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::fixed_bytes;

    #[test]
    fn chain_ids_are_distinct_across_networks() {
        let mut seen = std::collections::HashSet::new();
        for chain in Blockchain::ALL {
            for env in [NetworkEnvironment::Mainnet, NetworkEnvironment::Testnet] {
                assert!(
                    seen.insert(chain.chain_id(env)),
                    "duplicate chain id for {chain} {env}"
                );
            }
        }
    }

    #[test]
    fn blockchain_round_trips_through_strings() {
        for chain in Blockchain::ALL {
            assert_eq!(chain.as_str().parse::<Blockchain>().unwrap(), chain);
        }
    }

    #[test]
    fn unknown_blockchain_fails_parse() {
        let err = "solana".parse::<Blockchain>().unwrap_err();
        assert_eq!(err.0, "solana");
    }

    #[test]
    fn chain_id_mismatch_carries_both_ids() {
        let err = verify_chain_id(Blockchain::Base, NetworkEnvironment::Mainnet, 1).unwrap_err();
        assert_eq!(err.expected, 8453);
        assert_eq!(err.actual, 1);
    }

    #[test]
    fn matching_chain_id_passes() {
        verify_chain_id(Blockchain::Polygon, NetworkEnvironment::Testnet, 80_002).unwrap();
    }

    #[test]
    fn explorer_tx_url_embeds_hash() {
        let hash = fixed_bytes!("0x1111111111111111111111111111111111111111111111111111111111111111");
        let url = Blockchain::Ethereum.explorer_tx_url(NetworkEnvironment::Testnet, hash);
        assert_eq!(
            url,
            format!("https://sepolia.etherscan.io/tx/{hash}")
        );
    }
}
