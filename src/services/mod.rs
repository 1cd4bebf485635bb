//! Unified deployment façade. One entry point per token regardless of
//! standard: load the draft, map its form, pick a strategy, run the
//! compliance pass for security tokens, hand off to the orchestrator, and
//! normalize whatever happened into a `UnifiedDeploymentResult`.

mod rate_limit;

pub use rate_limit::{NoRateLimit, RateLimiter, WindowedRateLimiter};

use alloy::primitives::{Address, B256};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use crate::complexity::ComplexityAnalysis;
use crate::error::ServiceError;
use crate::events::{DeploymentEvent, DeploymentEventSink, DeploymentPhase};
use crate::foundry::gas::estimated_savings_percent;
use crate::foundry::keys::KeyVault;
use crate::foundry::params::FoundryDeploymentParams;
use crate::foundry::{AttachedModule, ChunkResult, FoundryDeploymentService};
use crate::mapper::{AnyEnhancedConfig, TokenConfig, map_form};
use crate::persistence::{self, TokenRecord, TokenStatus};
use crate::standard::TokenStandard;
use crate::strategy::{DeploymentStrategy, StrategyChoice, select_strategy};

#[derive(Debug, Clone, Copy)]
pub struct DeployOptions {
    /// When false and no strategy is forced, skip optimization entirely
    /// and take the basic path.
    pub use_optimization: bool,
    pub force_strategy: StrategyChoice,
    /// Log the complexity breakdown alongside the deployment.
    pub enable_analytics: bool,
    /// Run the security-token compliance pass for ERC-1400/ERC-3525.
    pub enable_compliance_validation: bool,
    pub institutional_grade: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            use_optimization: true,
            force_strategy: StrategyChoice::Auto,
            enable_analytics: false,
            enable_compliance_validation: true,
            institutional_grade: false,
        }
    }
}

/// Normalized result every deployment call returns, successful or not.
#[derive(Debug, Clone)]
pub struct UnifiedDeploymentResult {
    pub success: bool,
    pub token_id: String,
    pub standard: TokenStandard,
    pub strategy: DeploymentStrategy,
    pub contract_address: Option<Address>,
    pub tx_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub complexity: ComplexityAnalysis,
    /// Heuristic percentage of the basic-path gas spend saved; zero for
    /// the basic strategy.
    pub gas_savings_percent: u8,
    pub modules: Vec<AttachedModule>,
    pub chunk_results: Vec<ChunkResult>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl UnifiedDeploymentResult {
    fn rejected(
        token_id: &str,
        standard: TokenStandard,
        strategy: DeploymentStrategy,
        complexity: ComplexityAnalysis,
        errors: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            success: false,
            token_id: token_id.to_owned(),
            standard,
            strategy,
            contract_address: None,
            tx_hash: None,
            block_number: None,
            gas_used: None,
            complexity,
            gas_savings_percent: 0,
            modules: Vec::new(),
            chunk_results: Vec::new(),
            errors,
            warnings,
        }
    }
}

/// Pre-deployment analysis for a stored token draft.
#[derive(Debug, Clone)]
pub struct StrategyRecommendation {
    pub token_id: String,
    pub standard: TokenStandard,
    pub complexity: ComplexityAnalysis,
    pub recommended_strategy: DeploymentStrategy,
    pub gas_savings_percent: u8,
    pub mapping_errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct UnifiedDeploymentService<V> {
    pool: SqlitePool,
    foundry: FoundryDeploymentService<V>,
    limiter: Arc<dyn RateLimiter>,
    events: Arc<dyn DeploymentEventSink>,
}

impl<V: KeyVault> UnifiedDeploymentService<V> {
    pub fn new(
        pool: SqlitePool,
        foundry: FoundryDeploymentService<V>,
        limiter: Arc<dyn RateLimiter>,
        events: Arc<dyn DeploymentEventSink>,
    ) -> Self {
        Self {
            pool,
            foundry,
            limiter,
            events,
        }
    }

    /// Deploy a stored token draft. Domain rejections (mapping errors,
    /// validation, compliance) come back as an unsuccessful result;
    /// infrastructure problems (missing token, rate limit, database)
    /// surface as `ServiceError`.
    pub async fn deploy(
        &self,
        token_id: &str,
        user_id: Option<&str>,
        options: DeployOptions,
    ) -> Result<UnifiedDeploymentResult, ServiceError> {
        let record = persistence::load_token(&self.pool, token_id).await?;
        verify_standard(&record)?;

        if let Some(user) = user_id {
            self.limiter.check(user).await?;
        }
        self.events
            .record(
                DeploymentEvent::info(token_id, DeploymentPhase::Requested).with_user(user_id),
            )
            .await;

        self.events
            .record(DeploymentEvent::info(token_id, DeploymentPhase::Mapping))
            .await;
        let mapping = map_form(&record.form);
        let Some(config) = mapping.config.filter(|_| mapping.success) else {
            return Ok(UnifiedDeploymentResult::rejected(
                token_id,
                record.standard,
                DeploymentStrategy::Basic,
                mapping.complexity,
                mapping.errors,
                mapping.warnings,
            ));
        };

        let institutional = options.institutional_grade || is_institutional(&config);
        let strategy = choose_strategy(&mapping.complexity, &options, institutional);

        let mut errors = config.validate_configuration().errors;
        if options.enable_compliance_validation {
            errors.extend(compliance_violations(&config));
        }
        if !errors.is_empty() {
            self.events
                .record(DeploymentEvent::failure(
                    token_id,
                    DeploymentPhase::Failed,
                    errors.join("; "),
                ))
                .await;
            return Ok(UnifiedDeploymentResult::rejected(
                token_id,
                record.standard,
                strategy,
                mapping.complexity,
                errors,
                mapping.warnings,
            ));
        }

        if options.enable_analytics {
            info!(
                token_id,
                score = mapping.complexity.score,
                level = ?mapping.complexity.level,
                %strategy,
                reasons = ?mapping.complexity.reasons,
                "deployment analytics"
            );
        }

        if let Err(e) =
            persistence::update_token_status(&self.pool, token_id, TokenStatus::Deploying).await
        {
            tracing::warn!(token_id, error = %e, "failed to mark token as deploying");
        }

        let params = FoundryDeploymentParams {
            token_id: record.id.clone(),
            project_id: record.project_id.clone(),
            config: config.foundry_config(),
            blockchain: record.blockchain,
            environment: record.environment,
            gas: None,
            wallet_address: None,
        };
        let modules = config.modules();
        let chunks = if strategy == DeploymentStrategy::Chunked {
            config.chunks()
        } else {
            Vec::new()
        };

        let outcome = self
            .foundry
            .deploy_token(&params, strategy, &modules, &chunks)
            .await;

        let mut warnings = mapping.warnings;
        warnings.extend(outcome.warnings);
        Ok(UnifiedDeploymentResult {
            success: outcome.success,
            token_id: token_id.to_owned(),
            standard: record.standard,
            strategy,
            contract_address: outcome.contract_address,
            tx_hash: outcome.tx_hash,
            block_number: outcome.block_number,
            gas_used: outcome.gas_used,
            complexity: mapping.complexity,
            gas_savings_percent: if outcome.success {
                estimated_savings_percent(strategy)
            } else {
                0
            },
            modules: outcome.modules,
            chunk_results: outcome.chunk_results,
            errors: outcome.error.into_iter().collect(),
            warnings,
        })
    }

    /// Analyze a stored draft without touching the chain.
    pub async fn get_recommendation(
        &self,
        token_id: &str,
    ) -> Result<StrategyRecommendation, ServiceError> {
        let record = persistence::load_token(&self.pool, token_id).await?;
        verify_standard(&record)?;

        let mapping = map_form(&record.form);
        let institutional = mapping
            .config
            .as_ref()
            .is_some_and(is_institutional);
        let recommended =
            select_strategy(&mapping.complexity, StrategyChoice::Auto, institutional);

        Ok(StrategyRecommendation {
            token_id: token_id.to_owned(),
            standard: record.standard,
            recommended_strategy: recommended,
            gas_savings_percent: estimated_savings_percent(recommended),
            complexity: mapping.complexity,
            mapping_errors: mapping.errors,
            warnings: mapping.warnings,
        })
    }
}

/// The stored standard column and the form's own tag must agree; a drifted
/// row is rejected instead of silently deploying the wrong standard.
fn verify_standard(record: &TokenRecord) -> Result<(), ServiceError> {
    let form_standard = record.form.standard();
    if record.standard == form_standard {
        Ok(())
    } else {
        Err(ServiceError::StandardMismatch {
            token_id: record.id.clone(),
            expected: record.standard,
            actual: form_standard,
        })
    }
}

fn choose_strategy(
    analysis: &ComplexityAnalysis,
    options: &DeployOptions,
    institutional: bool,
) -> DeploymentStrategy {
    if options.force_strategy == StrategyChoice::Auto && !options.use_optimization {
        return DeploymentStrategy::Basic;
    }
    select_strategy(analysis, options.force_strategy, institutional)
}

fn is_institutional(config: &AnyEnhancedConfig) -> bool {
    match config {
        AnyEnhancedConfig::Erc1400(c) => c.is_institutional_grade(),
        AnyEnhancedConfig::Erc3525(c) => c.is_institutional_grade(),
        _ => false,
    }
}

/// Security-token compliance pass. Hard blocks only; softer concerns stay
/// in the mapper's warnings.
fn compliance_violations(config: &AnyEnhancedConfig) -> Vec<String> {
    let mut violations = Vec::new();
    match config {
        AnyEnhancedConfig::Erc1400(c) => {
            let Some(compliance) = &c.compliance else {
                violations
                    .push("security token deployment requires compliance settings".to_owned());
                return violations;
            };
            if !compliance.kyc_enabled {
                violations.push("KYC verification must be enabled for security tokens".to_owned());
            }
            if compliance.jurisdiction.trim().is_empty() {
                violations.push("jurisdiction must be specified for security tokens".to_owned());
            }
            if compliance.cross_border_enabled && !compliance.whitelist_enabled {
                violations.push(
                    "cross-border transfers require investor whitelisting".to_owned(),
                );
            }
        }
        AnyEnhancedConfig::Erc3525(c) => {
            if c.is_institutional_grade() && c.slots.as_deref().unwrap_or_default().is_empty() {
                violations.push(
                    "institutional-grade semi-fungible tokens require at least one slot"
                        .to_owned(),
                );
            }
        }
        _ => {}
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Blockchain, NetworkEnvironment};
    use crate::events::NoopEventSink;
    use crate::foundry::keys::{KeyResolver, NoKeyVault};
    use crate::foundry::nonce::SqliteNonceManager;
    use crate::foundry::test_writer::{DEPLOYED_AT, MockChainWriter};
    use crate::persistence::{MasterRecord, upsert_master};
    use crate::test_utils::{insert_test_token_with_form, insert_test_wallet, setup_test_db};
    use alloy::primitives::address;

    const BASE_SEPOLIA: u64 = 84_532;

    async fn seed_network(pool: &SqlitePool, standard: TokenStandard) {
        insert_test_wallet(pool, "proj-1", Blockchain::Base).await;
        upsert_master(
            pool,
            Blockchain::Base,
            NetworkEnvironment::Testnet,
            standard,
            MasterRecord {
                master_address: address!("0x1111111111111111111111111111111111111111"),
                factory_address: Some(address!("0x2222222222222222222222222222222222222222")),
            },
        )
        .await
        .unwrap();
    }

    fn unified(pool: &SqlitePool, writer: MockChainWriter) -> UnifiedDeploymentService<NoKeyVault> {
        let foundry = FoundryDeploymentService::new(
            pool.clone(),
            Arc::new(writer),
            Arc::new(SqliteNonceManager::new(pool.clone())),
            KeyResolver::new(pool.clone(), NoKeyVault),
            Arc::new(NoopEventSink),
        );
        UnifiedDeploymentService::new(
            pool.clone(),
            foundry,
            Arc::new(NoRateLimit),
            Arc::new(NoopEventSink),
        )
    }

    fn erc20_form() -> serde_json::Value {
        serde_json::json!({
            "standard": "erc-20",
            "name": "Test",
            "symbol": "TST",
            "initial_supply": "1000"
        })
    }

    fn compliant_erc1400_form() -> serde_json::Value {
        serde_json::json!({
            "standard": "erc-1400",
            "name": "Security",
            "symbol": "SEC",
            "initial_supply": "1000",
            "kyc_enabled": true,
            "whitelist_enabled": true,
            "jurisdiction": "US"
        })
    }

    #[tokio::test]
    async fn simple_erc20_deploys_on_the_basic_path() {
        let pool = setup_test_db().await;
        seed_network(&pool, TokenStandard::Erc20).await;
        insert_test_token_with_form(&pool, "tok-1", "proj-1", "erc-20", &erc20_form()).await;
        let service = unified(&pool, MockChainWriter::healthy(BASE_SEPOLIA));

        let result = service
            .deploy("tok-1", None, DeployOptions::default())
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.strategy, DeploymentStrategy::Basic);
        assert_eq!(result.contract_address, Some(DEPLOYED_AT));
        assert_eq!(result.gas_savings_percent, 0);
    }

    #[tokio::test]
    async fn institutional_grade_always_gets_chunked() {
        let pool = setup_test_db().await;
        seed_network(&pool, TokenStandard::Erc1400).await;
        insert_test_token_with_form(
            &pool,
            "tok-1",
            "proj-1",
            "erc-1400",
            &compliant_erc1400_form(),
        )
        .await;
        let service = unified(&pool, MockChainWriter::healthy(BASE_SEPOLIA));

        let result = service
            .deploy(
                "tok-1",
                None,
                DeployOptions {
                    institutional_grade: true,
                    ..DeployOptions::default()
                },
            )
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.strategy, DeploymentStrategy::Chunked);
        assert!(result.gas_savings_percent > 0);
    }

    #[tokio::test]
    async fn standard_mismatch_is_rejected_before_anything_else() {
        let pool = setup_test_db().await;
        insert_test_token_with_form(&pool, "tok-1", "proj-1", "erc-721", &erc20_form()).await;
        let service = unified(&pool, MockChainWriter::healthy(BASE_SEPOLIA));

        let err = service
            .deploy("tok-1", None, DeployOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::StandardMismatch {
                expected: TokenStandard::Erc721,
                actual: TokenStandard::Erc20,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn mapping_failure_returns_unsuccessful_result_without_chain_calls() {
        let pool = setup_test_db().await;
        seed_network(&pool, TokenStandard::Erc20).await;
        let form = serde_json::json!({ "standard": "erc-20", "symbol": "TST" });
        insert_test_token_with_form(&pool, "tok-1", "proj-1", "erc-20", &form).await;

        let writer = Arc::new(MockChainWriter::healthy(BASE_SEPOLIA));
        let foundry = FoundryDeploymentService::new(
            pool.clone(),
            Arc::<MockChainWriter>::clone(&writer) as Arc<dyn crate::foundry::evm::ChainWriter>,
            Arc::new(SqliteNonceManager::new(pool.clone())),
            KeyResolver::new(pool.clone(), NoKeyVault),
            Arc::new(NoopEventSink),
        );
        let service = UnifiedDeploymentService::new(
            pool.clone(),
            foundry,
            Arc::new(NoRateLimit),
            Arc::new(NoopEventSink),
        );

        let result = service
            .deploy("tok-1", None, DeployOptions::default())
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.contains("name")));
        assert!(writer.calls().is_empty());
    }

    #[tokio::test]
    async fn compliance_pass_blocks_kyc_less_security_token() {
        let pool = setup_test_db().await;
        seed_network(&pool, TokenStandard::Erc1400).await;
        let form = serde_json::json!({
            "standard": "erc-1400",
            "name": "Security",
            "symbol": "SEC",
            "initial_supply": "1000",
            "jurisdiction": "US"
        });
        insert_test_token_with_form(&pool, "tok-1", "proj-1", "erc-1400", &form).await;
        let service = unified(&pool, MockChainWriter::healthy(BASE_SEPOLIA));

        let result = service
            .deploy("tok-1", None, DeployOptions::default())
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.contains("KYC")));
    }

    #[tokio::test]
    async fn compliance_pass_can_be_disabled() {
        let pool = setup_test_db().await;
        seed_network(&pool, TokenStandard::Erc1400).await;
        let form = serde_json::json!({
            "standard": "erc-1400",
            "name": "Security",
            "symbol": "SEC",
            "initial_supply": "1000",
            "jurisdiction": "US"
        });
        insert_test_token_with_form(&pool, "tok-1", "proj-1", "erc-1400", &form).await;
        let service = unified(&pool, MockChainWriter::healthy(BASE_SEPOLIA));

        let result = service
            .deploy(
                "tok-1",
                None,
                DeployOptions {
                    enable_compliance_validation: false,
                    ..DeployOptions::default()
                },
            )
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.errors);
    }

    #[tokio::test]
    async fn optimization_disabled_forces_the_basic_path() {
        let pool = setup_test_db().await;
        seed_network(&pool, TokenStandard::Erc1400).await;
        insert_test_token_with_form(
            &pool,
            "tok-1",
            "proj-1",
            "erc-1400",
            &compliant_erc1400_form(),
        )
        .await;
        let service = unified(&pool, MockChainWriter::healthy(BASE_SEPOLIA));

        let result = service
            .deploy(
                "tok-1",
                None,
                DeployOptions {
                    use_optimization: false,
                    ..DeployOptions::default()
                },
            )
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.strategy, DeploymentStrategy::Basic);
    }

    #[tokio::test]
    async fn rate_limited_user_is_refused() {
        let pool = setup_test_db().await;
        seed_network(&pool, TokenStandard::Erc20).await;
        insert_test_token_with_form(&pool, "tok-1", "proj-1", "erc-20", &erc20_form()).await;

        struct AlwaysLimited;
        #[async_trait::async_trait]
        impl RateLimiter for AlwaysLimited {
            async fn check(&self, user_id: &str) -> Result<(), ServiceError> {
                Err(ServiceError::RateLimited {
                    user_id: user_id.to_owned(),
                    remaining_secs: 42,
                })
            }
        }

        let foundry = FoundryDeploymentService::new(
            pool.clone(),
            Arc::new(MockChainWriter::healthy(BASE_SEPOLIA)),
            Arc::new(SqliteNonceManager::new(pool.clone())),
            KeyResolver::new(pool.clone(), NoKeyVault),
            Arc::new(NoopEventSink),
        );
        let service = UnifiedDeploymentService::new(
            pool.clone(),
            foundry,
            Arc::new(AlwaysLimited),
            Arc::new(NoopEventSink),
        );

        let err = service
            .deploy("tok-1", Some("user-1"), DeployOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn recommendation_reports_strategy_and_savings() {
        let pool = setup_test_db().await;
        insert_test_token_with_form(&pool, "tok-1", "proj-1", "erc-20", &erc20_form()).await;
        let service = unified(&pool, MockChainWriter::healthy(BASE_SEPOLIA));

        let rec = service.get_recommendation("tok-1").await.unwrap();
        assert_eq!(rec.recommended_strategy, DeploymentStrategy::Basic);
        assert_eq!(rec.gas_savings_percent, 0);
        assert!(rec.mapping_errors.is_empty());

        let institutional = serde_json::json!({
            "standard": "erc-1400",
            "name": "Security",
            "symbol": "SEC",
            "initial_supply": "1000",
            "institutional_grade": true,
            "kyc_enabled": true,
            "whitelist_enabled": true,
            "jurisdiction": "US"
        });
        insert_test_token_with_form(&pool, "tok-2", "proj-1", "erc-1400", &institutional).await;
        let rec = service.get_recommendation("tok-2").await.unwrap();
        assert_eq!(rec.recommended_strategy, DeploymentStrategy::Chunked);
        assert!(rec.gas_savings_percent > 0);
    }
}
