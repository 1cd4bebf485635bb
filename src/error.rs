//! Domain-specific error types with clear layer boundaries: key resolution,
//! gas estimation, nonce leasing, and chain interaction each keep their own
//! enum, and the orchestrator-level `DeploymentError` aggregates them.

use alloy::primitives::{Address, B256, U256};
use alloy::transports::{RpcError, TransportErrorKind};

use crate::chain::{Blockchain, ChainIdMismatchError};
use crate::standard::TokenStandard;

/// Failures resolving a deployment wallet and its signing key.
#[derive(Debug, thiserror::Error)]
pub enum KeyResolutionError {
    #[error("No {wallet_type} wallet configured for project {project_id} on {blockchain}")]
    WalletNotFound {
        project_id: String,
        blockchain: Blockchain,
        wallet_type: String,
    },
    #[error("No wallet with address {address} for project {project_id}")]
    WalletByAddressNotFound {
        project_id: String,
        address: Address,
    },
    #[error("Wallet {address} has no key material (neither private key nor vault reference)")]
    MissingKeyMaterial { address: Address },
    #[error("Invalid private key for wallet {address}: {source}")]
    InvalidPrivateKey {
        address: Address,
        #[source]
        source: alloy::signers::local::LocalSignerError,
    },
    #[error("Key vault rejected reference {vault_ref}: {reason}")]
    Vault { vault_ref: String, reason: String },
    #[error("Stored wallet row is malformed: {0}")]
    MalformedStoredField(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failures producing a gas estimate before deployment.
#[derive(Debug, thiserror::Error)]
pub enum GasEstimationError {
    #[error("Gas simulation failed: {0}")]
    Simulation(#[from] alloy::contract::Error),
    #[error("RPC transport error: {0}")]
    RpcTransport(#[from] RpcError<TransportErrorKind>),
    #[error("No heuristic gas entry for {standard} on {blockchain}")]
    NoHeuristic {
        blockchain: Blockchain,
        standard: TokenStandard,
    },
}

/// Failures reserving or releasing a wallet nonce lease.
#[derive(Debug, thiserror::Error)]
pub enum NonceError {
    #[error("Nonce for wallet {wallet} on {blockchain} is already leased")]
    AlreadyLeased {
        wallet: Address,
        blockchain: Blockchain,
    },
    #[error("Failed to fetch pending nonce: {0}")]
    RpcTransport(#[from] RpcError<TransportErrorKind>),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failures talking to the chain during deployment, initialization, or
/// module attachment.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("RPC transport error: {0}")]
    RpcTransport(#[from] RpcError<TransportErrorKind>),
    #[error("Contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error("Transaction watcher failed: {0}")]
    PendingTransaction(#[from] alloy::providers::PendingTransactionError),
    #[error(
        "Transaction {tx_hash} not confirmed within {timeout_secs}s; check {explorer_url} before retrying"
    )]
    ConfirmationTimeout {
        tx_hash: B256,
        timeout_secs: u64,
        explorer_url: String,
    },
    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },
    #[error("Factory transaction {tx_hash} emitted no TokenDeployed event")]
    MissingDeploymentEvent { tx_hash: B256 },
    #[error("Deployment transaction {tx_hash} produced no contract address")]
    NoContractAddress { tx_hash: B256 },
    #[error("No creation bytecode registered for {standard}")]
    MissingBytecode { standard: TokenStandard },
}

/// Orchestrator-internal aggregate. Converted to a structured
/// `DeploymentOutcome` at the service boundary; callers never see this
/// type cross an API edge.
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("Key resolution failed: {0}")]
    Key(#[from] KeyResolutionError),
    #[error("Chain identity check failed: {0}")]
    ChainId(#[from] ChainIdMismatchError),
    #[error("Gas estimation failed: {0}")]
    Gas(#[from] GasEstimationError),
    #[error(
        "Wallet {address} balance {balance} wei is below the required {required} wei for deployment"
    )]
    InsufficientBalance {
        address: Address,
        balance: U256,
        required: U256,
    },
    #[error("Nonce reservation failed: {0}")]
    Nonce(#[from] NonceError),
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("No contract master registered for {standard} on {blockchain} {environment}")]
    MissingMaster {
        blockchain: Blockchain,
        environment: crate::chain::NetworkEnvironment,
        standard: TokenStandard,
    },
    #[error("Stored contract address is malformed: {0}")]
    MalformedStoredAddress(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Infrastructure failures at the unified service boundary. Domain
/// failures (mapper errors, validation, compliance rejections) travel in
/// the result payload instead.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Token {token_id} not found")]
    TokenNotFound { token_id: String },
    #[error("Token {token_id} is {actual}, but this service handles {expected}")]
    StandardMismatch {
        token_id: String,
        expected: TokenStandard,
        actual: TokenStandard,
    },
    #[error("Rate limit exceeded for user {user_id}: {remaining_secs}s until next deployment slot")]
    RateLimited {
        user_id: String,
        remaining_secs: u64,
    },
    #[error("Stored token form is unreadable: {0}")]
    MalformedForm(#[from] serde_json::Error),
    #[error("Unknown token standard: {0}")]
    UnknownStandard(#[from] crate::standard::UnknownStandardError),
    #[error("Unknown blockchain: {0}")]
    UnknownBlockchain(#[from] crate::chain::UnknownBlockchainError),
    #[error("Stored field is malformed: {0}")]
    MalformedStoredField(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
