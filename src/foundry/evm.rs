//! Chain interaction behind the `ChainWriter` seam: identity checks,
//! balance and fee reads, factory and direct deployment, initialization,
//! module attachment, and chunked configuration calls.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::bindings::{
    IConfigurableToken, IModuleFactory, ITokenFoundryFactory, encode_initialize,
};
use crate::chain::{Blockchain, NetworkEnvironment};
use crate::error::ChainError;
use crate::foundry::gas::GasPlan;
use crate::foundry::params::{ConfigChunk, FoundryTokenConfig, ModuleKind};
use crate::standard::TokenStandard;

/// Factory and initialize transactions wait this long before the caller
/// gets a timeout error pointing at the explorer.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Module attachment races a shorter clock; a slow module is a warning,
/// not a failed deployment.
pub const MODULE_ATTACH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOutcome {
    pub contract_address: Address,
    pub tx: TxOutcome,
}

#[async_trait]
pub trait ChainWriter: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ChainError>;
    async fn balance(&self, address: Address) -> Result<U256, ChainError>;
    async fn gas_price(&self) -> Result<u128, ChainError>;
    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError>;

    /// Simulate the factory deployment. `None` means the node refused the
    /// simulation; callers fall back to the heuristic table.
    async fn estimate_factory_gas(
        &self,
        factory: Address,
        config: &FoundryTokenConfig,
        owner: Address,
    ) -> Result<Option<u64>, ChainError>;

    async fn deploy_via_factory(
        &self,
        factory: Address,
        config: &FoundryTokenConfig,
        owner: Address,
        gas: GasPlan,
        nonce: u64,
    ) -> Result<DeployOutcome, ChainError>;

    /// Deploy the master bytecode with an empty constructor; `initialize`
    /// must follow.
    async fn deploy_direct(
        &self,
        standard: TokenStandard,
        gas: GasPlan,
        nonce: u64,
    ) -> Result<DeployOutcome, ChainError>;

    async fn initialize(
        &self,
        token: Address,
        config: &FoundryTokenConfig,
        owner: Address,
    ) -> Result<TxOutcome, ChainError>;

    async fn attach_module(
        &self,
        module_factory: Address,
        token: Address,
        kind: ModuleKind,
    ) -> Result<Address, ChainError>;

    async fn apply_configuration(
        &self,
        token: Address,
        chunk: &ConfigChunk,
    ) -> Result<TxOutcome, ChainError>;
}

fn factory_calldata(config: &FoundryTokenConfig, owner: Address) -> Bytes {
    let encoded = match config {
        FoundryTokenConfig::Erc20 {
            name,
            symbol,
            decimals,
            initial_supply,
            max_supply,
            is_mintable,
            is_burnable,
            is_pausable,
            ..
        } => ITokenFoundryFactory::deployERC20Call {
            name: name.clone(),
            symbol: symbol.clone(),
            decimals: *decimals,
            initialSupply: *initial_supply,
            maxSupply: *max_supply,
            owner,
            mintable: *is_mintable,
            burnable: *is_burnable,
            pausable: *is_pausable,
        }
        .abi_encode(),
        FoundryTokenConfig::Erc721 {
            name,
            symbol,
            base_uri,
            max_supply,
            is_mintable,
            is_burnable,
            ..
        } => ITokenFoundryFactory::deployERC721Call {
            name: name.clone(),
            symbol: symbol.clone(),
            baseURI: base_uri.clone(),
            maxSupply: U256::from(*max_supply),
            owner,
            mintable: *is_mintable,
            burnable: *is_burnable,
        }
        .abi_encode(),
        FoundryTokenConfig::Erc1155 {
            name,
            symbol,
            base_uri,
            batch_minting,
            supply_tracking,
            ..
        } => ITokenFoundryFactory::deployERC1155Call {
            name: name.clone(),
            symbol: symbol.clone(),
            baseURI: base_uri.clone(),
            owner,
            batchMinting: *batch_minting,
            supplyTracking: *supply_tracking,
        }
        .abi_encode(),
        FoundryTokenConfig::Erc1400 {
            name,
            symbol,
            decimals,
            initial_supply,
            default_partitions,
            is_controllable,
            is_issuable,
            ..
        } => ITokenFoundryFactory::deployERC1400Call {
            name: name.clone(),
            symbol: symbol.clone(),
            decimals: *decimals,
            initialSupply: *initial_supply,
            defaultPartitions: default_partitions.clone(),
            owner,
            controllable: *is_controllable,
            issuable: *is_issuable,
        }
        .abi_encode(),
        FoundryTokenConfig::Erc3525 {
            name,
            symbol,
            value_decimals,
            ..
        } => ITokenFoundryFactory::deployERC3525Call {
            name: name.clone(),
            symbol: symbol.clone(),
            valueDecimals: *value_decimals,
            owner,
        }
        .abi_encode(),
        FoundryTokenConfig::Erc4626 {
            name,
            symbol,
            decimals,
            asset,
            ..
        } => ITokenFoundryFactory::deployERC4626Call {
            name: name.clone(),
            symbol: symbol.clone(),
            decimals: *decimals,
            asset: asset.unwrap_or(Address::ZERO),
            owner,
        }
        .abi_encode(),
    };
    Bytes::from(encoded)
}

/// Production writer over an alloy provider with a wallet filler. Creation
/// bytecode for direct deployments is registered per standard at startup.
pub struct AlloyChainWriter<P> {
    provider: P,
    blockchain: Blockchain,
    environment: NetworkEnvironment,
    bytecode: HashMap<TokenStandard, Bytes>,
}

impl<P: Provider + Clone> AlloyChainWriter<P> {
    pub fn new(
        provider: P,
        blockchain: Blockchain,
        environment: NetworkEnvironment,
        bytecode: HashMap<TokenStandard, Bytes>,
    ) -> Self {
        Self {
            provider,
            blockchain,
            environment,
            bytecode,
        }
    }

    async fn send_and_confirm(
        &self,
        tx: TransactionRequest,
        timeout: Duration,
    ) -> Result<(alloy::rpc::types::TransactionReceipt, B256), ChainError> {
        let pending = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();

        let receipt = tokio::time::timeout(timeout, pending.get_receipt())
            .await
            .map_err(|_| ChainError::ConfirmationTimeout {
                tx_hash,
                timeout_secs: timeout.as_secs(),
                explorer_url: self.blockchain.explorer_tx_url(self.environment, tx_hash),
            })??;

        if !receipt.status() {
            return Err(ChainError::Reverted { tx_hash });
        }
        Ok((receipt, tx_hash))
    }
}

fn outcome(receipt: &alloy::rpc::types::TransactionReceipt, tx_hash: B256) -> TxOutcome {
    TxOutcome {
        tx_hash,
        block_number: receipt.block_number,
        gas_used: Some(receipt.gas_used),
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync> ChainWriter for AlloyChainWriter<P> {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError> {
        Ok(self.provider.get_transaction_count(address).pending().await?)
    }

    async fn estimate_factory_gas(
        &self,
        factory: Address,
        config: &FoundryTokenConfig,
        owner: Address,
    ) -> Result<Option<u64>, ChainError> {
        let tx = TransactionRequest::default()
            .with_to(factory)
            .with_input(factory_calldata(config, owner));
        match self.provider.estimate_gas(tx).await {
            Ok(gas) => Ok(Some(gas)),
            Err(e) => {
                debug!(error = %e, "gas simulation refused, falling back to heuristic");
                Ok(None)
            }
        }
    }

    async fn deploy_via_factory(
        &self,
        factory: Address,
        config: &FoundryTokenConfig,
        owner: Address,
        gas: GasPlan,
        nonce: u64,
    ) -> Result<DeployOutcome, ChainError> {
        let tx = TransactionRequest::default()
            .with_to(factory)
            .with_input(factory_calldata(config, owner))
            .with_gas_limit(gas.gas_limit)
            .with_max_fee_per_gas(gas.max_fee_per_gas)
            .with_nonce(nonce);

        let (receipt, tx_hash) = self.send_and_confirm(tx, RECEIPT_TIMEOUT).await?;

        let deployed = receipt
            .logs()
            .iter()
            .find_map(|log| ITokenFoundryFactory::TokenDeployed::decode_log(log.as_ref()).ok())
            .ok_or(ChainError::MissingDeploymentEvent { tx_hash })?;

        info!(token = %deployed.token, %tx_hash, "factory deployment confirmed");
        Ok(DeployOutcome {
            contract_address: deployed.token,
            tx: outcome(&receipt, tx_hash),
        })
    }

    async fn deploy_direct(
        &self,
        standard: TokenStandard,
        gas: GasPlan,
        nonce: u64,
    ) -> Result<DeployOutcome, ChainError> {
        let bytecode = self
            .bytecode
            .get(&standard)
            .ok_or(ChainError::MissingBytecode { standard })?;

        let tx = TransactionRequest::default()
            .with_deploy_code(bytecode.clone())
            .with_gas_limit(gas.gas_limit)
            .with_max_fee_per_gas(gas.max_fee_per_gas)
            .with_nonce(nonce);

        let (receipt, tx_hash) = self.send_and_confirm(tx, RECEIPT_TIMEOUT).await?;
        let contract_address = receipt
            .contract_address
            .ok_or(ChainError::NoContractAddress { tx_hash })?;

        info!(token = %contract_address, %tx_hash, "direct deployment confirmed");
        Ok(DeployOutcome {
            contract_address,
            tx: outcome(&receipt, tx_hash),
        })
    }

    async fn initialize(
        &self,
        token: Address,
        config: &FoundryTokenConfig,
        owner: Address,
    ) -> Result<TxOutcome, ChainError> {
        let tx = TransactionRequest::default()
            .with_to(token)
            .with_input(Bytes::from(encode_initialize(config, owner)));
        let (receipt, tx_hash) = self.send_and_confirm(tx, RECEIPT_TIMEOUT).await?;
        Ok(outcome(&receipt, tx_hash))
    }

    async fn attach_module(
        &self,
        module_factory: Address,
        token: Address,
        kind: ModuleKind,
    ) -> Result<Address, ChainError> {
        let tx = TransactionRequest::default()
            .with_to(module_factory)
            .with_input(Bytes::from(
                IModuleFactory::deployAndAttachCall {
                    token,
                    kind: kind.as_str().to_owned(),
                }
                .abi_encode(),
            ));
        let (receipt, tx_hash) = self.send_and_confirm(tx, MODULE_ATTACH_TIMEOUT).await?;

        let attached = receipt
            .logs()
            .iter()
            .find_map(|log| IModuleFactory::ModuleAttached::decode_log(log.as_ref()).ok())
            .ok_or(ChainError::MissingDeploymentEvent { tx_hash })?;

        Ok(attached.module)
    }

    async fn apply_configuration(
        &self,
        token: Address,
        chunk: &ConfigChunk,
    ) -> Result<TxOutcome, ChainError> {
        let tx = TransactionRequest::default()
            .with_to(token)
            .with_input(Bytes::from(
                IConfigurableToken::applyConfigurationCall {
                    section: chunk.section.clone(),
                    payload: Bytes::from(chunk.payload.to_string().into_bytes()),
                }
                .abi_encode(),
            ));
        let (receipt, tx_hash) = self.send_and_confirm(tx, RECEIPT_TIMEOUT).await?;
        Ok(outcome(&receipt, tx_hash))
    }
}
