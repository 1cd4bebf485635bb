//! Solidity interface bindings for the token factory, the per-standard
//! master contracts, and the module factory.
//!
//! These signatures are a fixed external wire contract: the factory spreads
//! constructor-style parameters individually (no encoded structs) and emits
//! `TokenDeployed` with the new proxy address; masters follow the
//! upgradeable-proxy pattern, so direct deployments use an empty constructor
//! and all configuration flows through `initialize`.

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::foundry::params::FoundryTokenConfig;

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    contract ITokenFoundryFactory {
        event TokenDeployed(address indexed token, string standard, address indexed owner);

        function deployERC20(
            string name,
            string symbol,
            uint8 decimals,
            uint256 initialSupply,
            uint256 maxSupply,
            address owner,
            bool mintable,
            bool burnable,
            bool pausable
        ) external returns (address token);

        function deployERC721(
            string name,
            string symbol,
            string baseURI,
            uint256 maxSupply,
            address owner,
            bool mintable,
            bool burnable
        ) external returns (address token);

        function deployERC1155(
            string name,
            string symbol,
            string baseURI,
            address owner,
            bool batchMinting,
            bool supplyTracking
        ) external returns (address token);

        function deployERC1400(
            string name,
            string symbol,
            uint8 decimals,
            uint256 initialSupply,
            string[] defaultPartitions,
            address owner,
            bool controllable,
            bool issuable
        ) external returns (address token);

        function deployERC3525(
            string name,
            string symbol,
            uint8 valueDecimals,
            address owner
        ) external returns (address token);

        function deployERC4626(
            string name,
            string symbol,
            uint8 decimals,
            address asset,
            address owner
        ) external returns (address token);
    }
);

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    contract IERC20Master {
        function initialize(
            string name,
            string symbol,
            uint256 maxSupply,
            uint256 initialSupply,
            address owner
        ) external;

        function name() external view returns (string);
        function symbol() external view returns (string);
        function totalSupply() external view returns (uint256);
    }
);

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    contract IERC721Master {
        function initialize(
            string name,
            string symbol,
            string baseURI,
            uint256 maxSupply,
            address owner
        ) external;
    }
);

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    contract IERC1155Master {
        function initialize(string name, string symbol, string baseURI, address owner) external;
    }
);

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    contract IERC1400Master {
        function initialize(
            string name,
            string symbol,
            uint8 decimals,
            string[] defaultPartitions,
            address owner,
            bool controllable
        ) external;
    }
);

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    contract IERC3525Master {
        function initialize(
            string name,
            string symbol,
            uint8 valueDecimals,
            address owner
        ) external;
    }
);

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    contract IERC4626Master {
        function initialize(
            string name,
            string symbol,
            address asset,
            address owner
        ) external;
    }
);

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    contract IConfigurableToken {
        function applyConfiguration(string section, bytes payload) external;
    }
);

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    contract IModuleFactory {
        event ModuleAttached(address indexed token, address indexed module, string kind);

        function deployAndAttach(address token, string kind) external returns (address module);
    }
);

/// Encode the standard-specific `initialize` calldata for a directly
/// deployed master. `owner` must already be resolved (no `None` at this
/// layer).
pub fn encode_initialize(config: &FoundryTokenConfig, owner: Address) -> Vec<u8> {
    match config {
        FoundryTokenConfig::Erc20 {
            name,
            symbol,
            initial_supply,
            max_supply,
            ..
        } => IERC20Master::initializeCall {
            name: name.clone(),
            symbol: symbol.clone(),
            maxSupply: *max_supply,
            initialSupply: *initial_supply,
            owner,
        }
        .abi_encode(),
        FoundryTokenConfig::Erc721 {
            name,
            symbol,
            base_uri,
            max_supply,
            ..
        } => IERC721Master::initializeCall {
            name: name.clone(),
            symbol: symbol.clone(),
            baseURI: base_uri.clone(),
            maxSupply: U256::from(*max_supply),
            owner,
        }
        .abi_encode(),
        FoundryTokenConfig::Erc1155 {
            name,
            symbol,
            base_uri,
            ..
        } => IERC1155Master::initializeCall {
            name: name.clone(),
            symbol: symbol.clone(),
            baseURI: base_uri.clone(),
            owner,
        }
        .abi_encode(),
        FoundryTokenConfig::Erc1400 {
            name,
            symbol,
            decimals,
            default_partitions,
            is_controllable,
            ..
        } => IERC1400Master::initializeCall {
            name: name.clone(),
            symbol: symbol.clone(),
            decimals: *decimals,
            defaultPartitions: default_partitions.clone(),
            owner,
            controllable: *is_controllable,
        }
        .abi_encode(),
        FoundryTokenConfig::Erc3525 {
            name,
            symbol,
            value_decimals,
            ..
        } => IERC3525Master::initializeCall {
            name: name.clone(),
            symbol: symbol.clone(),
            valueDecimals: *value_decimals,
            owner,
        }
        .abi_encode(),
        FoundryTokenConfig::Erc4626 {
            name,
            symbol,
            asset,
            ..
        } => IERC4626Master::initializeCall {
            name: name.clone(),
            symbol: symbol.clone(),
            asset: asset.unwrap_or(Address::ZERO),
            owner,
        }
        .abi_encode(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn erc20_initialize_round_trips() {
        let owner = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        let config = FoundryTokenConfig::Erc20 {
            name: "Test".to_owned(),
            symbol: "TST".to_owned(),
            decimals: 18,
            initial_supply: U256::from(1_000_000u64),
            max_supply: U256::from(10_000_000u64),
            owner: Some(owner),
            is_mintable: true,
            is_burnable: false,
            is_pausable: false,
        };

        let encoded = encode_initialize(&config, owner);
        let decoded = IERC20Master::initializeCall::abi_decode(&encoded).unwrap();
        assert_eq!(decoded.name, "Test");
        assert_eq!(decoded.symbol, "TST");
        assert_eq!(decoded.initialSupply, U256::from(1_000_000u64));
        assert_eq!(decoded.maxSupply, U256::from(10_000_000u64));
        assert_eq!(decoded.owner, owner);
    }

    #[test]
    fn erc1400_initialize_carries_partitions() {
        let owner = address!("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        let config = FoundryTokenConfig::Erc1400 {
            name: "Security".to_owned(),
            symbol: "SEC".to_owned(),
            decimals: 6,
            initial_supply: U256::from(500u64),
            default_partitions: vec!["senior".to_owned(), "junior".to_owned()],
            owner: Some(owner),
            is_controllable: true,
            is_issuable: true,
        };

        let encoded = encode_initialize(&config, owner);
        let decoded = IERC1400Master::initializeCall::abi_decode(&encoded).unwrap();
        assert_eq!(decoded.defaultPartitions, vec!["senior", "junior"]);
        assert!(decoded.controllable);
        assert_eq!(decoded.decimals, 6);
    }

    #[test]
    fn missing_vault_asset_encodes_as_zero_address() {
        let owner = address!("0xcccccccccccccccccccccccccccccccccccccccc");
        let config = FoundryTokenConfig::Erc4626 {
            name: "Vault".to_owned(),
            symbol: "VLT".to_owned(),
            decimals: 18,
            asset: None,
            owner: Some(owner),
        };
        let encoded = encode_initialize(&config, owner);
        let decoded = IERC4626Master::initializeCall::abi_decode(&encoded).unwrap();
        assert_eq!(decoded.asset, Address::ZERO);
    }
}
