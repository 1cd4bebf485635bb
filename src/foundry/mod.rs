//! Deployment orchestration: key resolution, chain identity check, gas
//! planning, balance check, nonce lease, deploy, initialize, module
//! attachment, chunked configuration, and best-effort persistence.
//!
//! The pipeline never lets an error escape as a panic or an unresolved
//! nonce lease, and it never fails a deployment retroactively once the
//! chain has confirmed it.

pub mod evm;
pub mod gas;
pub mod keys;
pub mod nonce;
pub mod params;

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::chain::verify_chain_id;
use crate::error::DeploymentError;
use crate::events::{DeploymentEvent, DeploymentEventSink, DeploymentPhase};
use crate::persistence::{
    self, DeploymentRecord, HistoryEntry, HistoryStatus, MasterRecord, TokenStatus,
};
use crate::strategy::DeploymentStrategy;

use evm::{ChainWriter, DeployOutcome};
use gas::{GasPlan, plan_gas};
use keys::{KeyResolver, KeyVault, ResolvedKey};
use nonce::{NonceLease, NonceManager};
use params::{ConfigChunk, FoundryDeploymentParams, ModuleKind};

/// Result of one configuration chunk transaction. Chunk failures never
/// fail the deployment; they surface here for a follow-up run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    pub label: String,
    pub tx_hash: Option<B256>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedModule {
    pub kind: ModuleKind,
    pub address: Option<Address>,
}

/// Terminal outcome of a deployment attempt. Infrastructure errors are
/// folded into `error`; callers always get a value, never an `Err`.
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub success: bool,
    pub contract_address: Option<Address>,
    pub deployer_address: Option<Address>,
    pub tx_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub strategy: DeploymentStrategy,
    pub modules: Vec<AttachedModule>,
    pub chunk_results: Vec<ChunkResult>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl DeploymentOutcome {
    fn failed(strategy: DeploymentStrategy, error: DeploymentError) -> Self {
        Self {
            success: false,
            contract_address: None,
            deployer_address: None,
            tx_hash: None,
            block_number: None,
            gas_used: None,
            strategy,
            modules: Vec::new(),
            chunk_results: Vec::new(),
            warnings: Vec::new(),
            error: Some(error.to_string()),
            finished_at: Utc::now(),
        }
    }
}

pub struct FoundryDeploymentService<V> {
    pool: SqlitePool,
    writer: Arc<dyn ChainWriter>,
    nonces: Arc<dyn NonceManager>,
    keys: KeyResolver<V>,
    events: Arc<dyn DeploymentEventSink>,
}

impl<V: KeyVault> FoundryDeploymentService<V> {
    pub fn new(
        pool: SqlitePool,
        writer: Arc<dyn ChainWriter>,
        nonces: Arc<dyn NonceManager>,
        keys: KeyResolver<V>,
        events: Arc<dyn DeploymentEventSink>,
    ) -> Self {
        Self {
            pool,
            writer,
            nonces,
            keys,
            events,
        }
    }

    /// Run the full deployment pipeline for one token. `modules` and
    /// `chunks` come from the mapped configuration; chunks are only
    /// applied under the chunked strategy.
    pub async fn deploy_token(
        &self,
        params: &FoundryDeploymentParams,
        strategy: DeploymentStrategy,
        modules: &[ModuleKind],
        chunks: &[ConfigChunk],
    ) -> DeploymentOutcome {
        self.events
            .record(DeploymentEvent::info(&params.token_id, DeploymentPhase::Requested))
            .await;
        self.record_status(params, HistoryStatus::Pending, None).await;

        match self.try_deploy(params, strategy, modules, chunks).await {
            Ok(outcome) => {
                self.persist_success(params, &outcome).await;
                outcome
            }
            Err(e) => {
                error!(token_id = %params.token_id, error = %e, "deployment failed");
                self.events
                    .record(DeploymentEvent::failure(
                        &params.token_id,
                        DeploymentPhase::Failed,
                        e.to_string(),
                    ))
                    .await;
                self.record_status(params, HistoryStatus::Failed, Some(e.to_string()))
                    .await;
                if let Err(db) =
                    persistence::update_token_status(&self.pool, &params.token_id, TokenStatus::Failed)
                        .await
                {
                    warn!(token_id = %params.token_id, error = %db, "failed to mark token as failed");
                }
                DeploymentOutcome::failed(strategy, e)
            }
        }
    }

    async fn try_deploy(
        &self,
        params: &FoundryDeploymentParams,
        strategy: DeploymentStrategy,
        modules: &[ModuleKind],
        chunks: &[ConfigChunk],
    ) -> Result<DeploymentOutcome, DeploymentError> {
        let mut warnings = Vec::new();

        self.events
            .record(DeploymentEvent::info(&params.token_id, DeploymentPhase::KeyResolution))
            .await;
        let key = self
            .keys
            .resolve(&params.project_id, params.blockchain, params.wallet_address)
            .await?;

        let reported = self.writer.chain_id().await?;
        verify_chain_id(params.blockchain, params.environment, reported)?;

        let standard = params.config.standard();
        let master = persistence::find_master(
            &self.pool,
            params.blockchain,
            params.environment,
            standard,
        )
        .await?;

        let plan = self.plan_gas(params, &master, &key).await?;

        let balance = self.writer.balance(key.address).await?;
        let required = plan.required_balance();
        if balance < required {
            return Err(DeploymentError::InsufficientBalance {
                address: key.address,
                balance,
                required,
            });
        }

        // Nonce is reserved only after every fallible pre-check has passed.
        let pending_nonce = self.writer.pending_nonce(key.address).await?;
        let lease = NonceLease::reserve(
            Arc::clone(&self.nonces),
            key.address,
            params.blockchain,
            pending_nonce,
        )
        .await?;

        self.events
            .record(DeploymentEvent::info(&params.token_id, DeploymentPhase::Deploying))
            .await;
        self.record_status(params, HistoryStatus::Deploying, None).await;

        let config = params.config.clone().with_default_owner(key.address);
        let owner = config.owner().unwrap_or(key.address);

        let deployed = match self
            .execute_deploy(&master, &config, owner, plan, lease.nonce())
            .await
        {
            Ok(deployed) => {
                if let Err(e) = lease.confirm().await {
                    warn!(token_id = %params.token_id, error = %e, "nonce confirm failed after deploy");
                }
                deployed
            }
            Err(e) => {
                if let Err(release) = lease.release().await {
                    warn!(token_id = %params.token_id, error = %release, "nonce release failed");
                }
                return Err(e.into());
            }
        };

        // Direct deployments still need their initializer; the factory
        // path initializes atomically. A failed initialize leaves a live
        // contract behind, so it degrades to a warning.
        if master.factory_address.is_none() {
            self.events
                .record(DeploymentEvent::info(&params.token_id, DeploymentPhase::Initializing))
                .await;
            if let Err(e) = self
                .writer
                .initialize(deployed.contract_address, &config, owner)
                .await
            {
                warn!(token_id = %params.token_id, error = %e, "initialize failed after deployment");
                warnings.push(format!(
                    "contract deployed at {} but initialize failed: {e}; run initialize manually",
                    deployed.contract_address
                ));
            }
        }

        let attached = self
            .attach_modules(params, &master, deployed.contract_address, strategy, modules, &mut warnings)
            .await;

        let chunk_results = if strategy == DeploymentStrategy::Chunked && !chunks.is_empty() {
            self.apply_chunks(params, deployed.contract_address, chunks, &mut warnings)
                .await
        } else {
            Vec::new()
        };

        self.events
            .record(DeploymentEvent::info(&params.token_id, DeploymentPhase::Confirmed))
            .await;
        info!(
            token_id = %params.token_id,
            contract = %deployed.contract_address,
            %strategy,
            "deployment confirmed"
        );

        Ok(DeploymentOutcome {
            success: true,
            contract_address: Some(deployed.contract_address),
            deployer_address: Some(key.address),
            tx_hash: Some(deployed.tx.tx_hash),
            block_number: deployed.tx.block_number,
            gas_used: deployed.tx.gas_used,
            strategy,
            modules: attached,
            chunk_results,
            warnings,
            error: None,
            finished_at: Utc::now(),
        })
    }

    async fn plan_gas(
        &self,
        params: &FoundryDeploymentParams,
        master: &MasterRecord,
        key: &ResolvedKey,
    ) -> Result<GasPlan, DeploymentError> {
        self.events
            .record(DeploymentEvent::info(&params.token_id, DeploymentPhase::GasEstimation))
            .await;

        let simulated = match master.factory_address {
            Some(factory) => {
                self.writer
                    .estimate_factory_gas(factory, &params.config, key.address)
                    .await?
            }
            None => None,
        };
        let network_gas_price = self.writer.gas_price().await?;
        Ok(plan_gas(
            params.blockchain,
            params.config.standard(),
            params.gas,
            network_gas_price,
            simulated,
        ))
    }

    async fn execute_deploy(
        &self,
        master: &MasterRecord,
        config: &params::FoundryTokenConfig,
        owner: Address,
        plan: GasPlan,
        nonce: u64,
    ) -> Result<DeployOutcome, crate::error::ChainError> {
        match master.factory_address {
            Some(factory) => {
                self.writer
                    .deploy_via_factory(factory, config, owner, plan, nonce)
                    .await
            }
            None => self.writer.deploy_direct(config.standard(), plan, nonce).await,
        }
    }

    async fn attach_modules(
        &self,
        params: &FoundryDeploymentParams,
        master: &MasterRecord,
        token: Address,
        strategy: DeploymentStrategy,
        modules: &[ModuleKind],
        warnings: &mut Vec<String>,
    ) -> Vec<AttachedModule> {
        if strategy == DeploymentStrategy::Basic || modules.is_empty() {
            return Vec::new();
        }
        let Some(module_factory) = master.factory_address else {
            warnings.push("modules requested but no factory is registered on this network".to_owned());
            return modules
                .iter()
                .map(|&kind| AttachedModule { kind, address: None })
                .collect();
        };

        self.events
            .record(DeploymentEvent::info(&params.token_id, DeploymentPhase::AttachingModules))
            .await;

        let mut attached = Vec::with_capacity(modules.len());
        for &kind in modules {
            match self.writer.attach_module(module_factory, token, kind).await {
                Ok(address) => {
                    info!(token_id = %params.token_id, module = %kind, %address, "module attached");
                    attached.push(AttachedModule {
                        kind,
                        address: Some(address),
                    });
                }
                Err(e) => {
                    warn!(token_id = %params.token_id, module = %kind, error = %e, "module attach failed");
                    warnings.push(format!("module {kind} not attached: {e}"));
                    attached.push(AttachedModule { kind, address: None });
                }
            }
        }
        attached
    }

    async fn apply_chunks(
        &self,
        params: &FoundryDeploymentParams,
        token: Address,
        chunks: &[ConfigChunk],
        warnings: &mut Vec<String>,
    ) -> Vec<ChunkResult> {
        self.events
            .record(DeploymentEvent::info(
                &params.token_id,
                DeploymentPhase::ApplyingConfiguration,
            ))
            .await;

        let mut results = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match self.writer.apply_configuration(token, chunk).await {
                Ok(tx) => results.push(ChunkResult {
                    label: chunk.label.clone(),
                    tx_hash: Some(tx.tx_hash),
                    error: None,
                }),
                Err(e) => {
                    warn!(token_id = %params.token_id, chunk = %chunk.label, error = %e, "configuration chunk failed");
                    warnings.push(format!("configuration chunk '{}' failed: {e}", chunk.label));
                    results.push(ChunkResult {
                        label: chunk.label.clone(),
                        tx_hash: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        results
    }

    /// Persistence after on-chain success is best effort: a lost row never
    /// retracts a confirmed deployment.
    async fn persist_success(&self, params: &FoundryDeploymentParams, outcome: &DeploymentOutcome) {
        let (Some(contract_address), Some(deployer_address), Some(tx_hash)) = (
            outcome.contract_address,
            outcome.deployer_address,
            outcome.tx_hash,
        ) else {
            return;
        };

        let snapshot = serde_json::to_value(&params.config).unwrap_or_default();
        let record = DeploymentRecord {
            token_id: params.token_id.clone(),
            project_id: params.project_id.clone(),
            standard: params.config.standard(),
            blockchain: params.blockchain,
            environment: params.environment,
            contract_address,
            deployer_address,
            tx_hash,
            block_number: outcome.block_number,
            strategy: outcome.strategy,
            gas_used: outcome.gas_used,
            config_snapshot: snapshot,
        };
        if let Err(e) = persistence::insert_deployment(&self.pool, &record).await {
            warn!(token_id = %params.token_id, error = %e, "failed to persist deployment record");
        }

        if let Err(e) = persistence::record_history(
            &self.pool,
            &HistoryEntry {
                token_id: params.token_id.clone(),
                status: HistoryStatus::Success,
                contract_address: Some(contract_address),
                tx_hash: Some(tx_hash),
                block_number: outcome.block_number,
                blockchain: params.blockchain,
                environment: params.environment,
                detail: None,
            },
        )
        .await
        {
            warn!(token_id = %params.token_id, error = %e, "failed to record deployment history");
        }

        if let Err(e) =
            persistence::update_token_status(&self.pool, &params.token_id, TokenStatus::Deployed)
                .await
        {
            warn!(token_id = %params.token_id, error = %e, "failed to update token status");
        }
    }

    async fn record_status(
        &self,
        params: &FoundryDeploymentParams,
        status: HistoryStatus,
        detail: Option<String>,
    ) {
        let entry = HistoryEntry {
            token_id: params.token_id.clone(),
            status,
            contract_address: None,
            tx_hash: None,
            block_number: None,
            blockchain: params.blockchain,
            environment: params.environment,
            detail,
        };
        if let Err(e) = persistence::record_history(&self.pool, &entry).await {
            warn!(token_id = %params.token_id, error = %e, "failed to record deployment history");
        }
    }
}

/// One entry in a batch deployment.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub params: FoundryDeploymentParams,
    pub strategy: DeploymentStrategy,
    pub modules: Vec<ModuleKind>,
    pub chunks: Vec<ConfigChunk>,
    pub complexity_score: u32,
}

/// Sequential batch deployment with complexity-scaled pacing. Heavier
/// tokens get longer gaps so RPC rate limits and nonce settling keep up;
/// jitter avoids thundering-herd alignment across concurrent batches.
pub async fn deploy_batch<V: KeyVault>(
    service: &FoundryDeploymentService<V>,
    items: Vec<BatchItem>,
) -> Vec<DeploymentOutcome> {
    let mut outcomes = Vec::with_capacity(items.len());
    let last = items.len().saturating_sub(1);
    for (i, item) in items.into_iter().enumerate() {
        let outcome = service
            .deploy_token(&item.params, item.strategy, &item.modules, &item.chunks)
            .await;
        outcomes.push(outcome);

        if i < last {
            tokio::time::sleep(batch_delay(item.complexity_score)).await;
        }
    }
    outcomes
}

fn batch_delay(complexity_score: u32) -> Duration {
    let base_ms = (500 + u64::from(complexity_score) * 10).min(3_000);
    let jitter_ms = rand::random_range(0..250);
    Duration::from_millis(base_ms + jitter_ms)
}

#[cfg(test)]
pub(crate) mod test_writer {
    use super::*;
    use crate::error::ChainError;
    use alloy::primitives::{B256, U256};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted chain writer: fixed reads, optional failure injection,
    /// and a call log for asserting what the orchestrator attempted.
    pub(crate) struct MockChainWriter {
        pub chain_id: u64,
        pub balance: U256,
        pub gas_price: u128,
        pub pending_nonce: u64,
        pub fail_deploy: bool,
        pub fail_initialize: bool,
        pub fail_modules: bool,
        pub fail_chunks: bool,
        pub calls: Mutex<Vec<String>>,
    }

    pub(crate) const DEPLOYED_AT: Address =
        alloy::primitives::address!("0xdddddddddddddddddddddddddddddddddddddddd");

    impl MockChainWriter {
        pub(crate) fn healthy(chain_id: u64) -> Self {
            Self {
                chain_id,
                balance: U256::MAX,
                gas_price: 1_000_000_000,
                pending_nonce: 0,
                fail_deploy: false,
                fail_initialize: false,
                fail_modules: false,
                fail_chunks: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn log(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_owned());
        }

        fn tx_outcome() -> evm::TxOutcome {
            evm::TxOutcome {
                tx_hash: B256::repeat_byte(0x42),
                block_number: Some(100),
                gas_used: Some(1_500_000),
            }
        }
    }

    #[async_trait]
    impl ChainWriter for MockChainWriter {
        async fn chain_id(&self) -> Result<u64, ChainError> {
            Ok(self.chain_id)
        }

        async fn balance(&self, _address: Address) -> Result<U256, ChainError> {
            Ok(self.balance)
        }

        async fn gas_price(&self) -> Result<u128, ChainError> {
            Ok(self.gas_price)
        }

        async fn pending_nonce(&self, _address: Address) -> Result<u64, ChainError> {
            self.log("pending_nonce");
            Ok(self.pending_nonce)
        }

        async fn estimate_factory_gas(
            &self,
            _factory: Address,
            _config: &params::FoundryTokenConfig,
            _owner: Address,
        ) -> Result<Option<u64>, ChainError> {
            Ok(Some(2_000_000))
        }

        async fn deploy_via_factory(
            &self,
            _factory: Address,
            _config: &params::FoundryTokenConfig,
            _owner: Address,
            _gas: GasPlan,
            _nonce: u64,
        ) -> Result<DeployOutcome, ChainError> {
            self.log("deploy_via_factory");
            if self.fail_deploy {
                return Err(ChainError::Reverted {
                    tx_hash: B256::repeat_byte(0x13),
                });
            }
            Ok(DeployOutcome {
                contract_address: DEPLOYED_AT,
                tx: Self::tx_outcome(),
            })
        }

        async fn deploy_direct(
            &self,
            _standard: crate::standard::TokenStandard,
            _gas: GasPlan,
            _nonce: u64,
        ) -> Result<DeployOutcome, ChainError> {
            self.log("deploy_direct");
            if self.fail_deploy {
                return Err(ChainError::Reverted {
                    tx_hash: B256::repeat_byte(0x13),
                });
            }
            Ok(DeployOutcome {
                contract_address: DEPLOYED_AT,
                tx: Self::tx_outcome(),
            })
        }

        async fn initialize(
            &self,
            _token: Address,
            _config: &params::FoundryTokenConfig,
            _owner: Address,
        ) -> Result<evm::TxOutcome, ChainError> {
            self.log("initialize");
            if self.fail_initialize {
                return Err(ChainError::Reverted {
                    tx_hash: B256::repeat_byte(0x14),
                });
            }
            Ok(Self::tx_outcome())
        }

        async fn attach_module(
            &self,
            _module_factory: Address,
            _token: Address,
            kind: ModuleKind,
        ) -> Result<Address, ChainError> {
            self.log(&format!("attach_module:{kind}"));
            if self.fail_modules {
                return Err(ChainError::ConfirmationTimeout {
                    tx_hash: B256::repeat_byte(0x15),
                    timeout_secs: 60,
                    explorer_url: "https://sepolia.basescan.org/tx/0x15".to_owned(),
                });
            }
            Ok(Address::repeat_byte(0xee))
        }

        async fn apply_configuration(
            &self,
            _token: Address,
            chunk: &ConfigChunk,
        ) -> Result<evm::TxOutcome, ChainError> {
            self.log(&format!("apply_configuration:{}", chunk.label));
            if self.fail_chunks {
                return Err(ChainError::Reverted {
                    tx_hash: B256::repeat_byte(0x16),
                });
            }
            Ok(Self::tx_outcome())
        }
    }
}
