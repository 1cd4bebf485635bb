//! Command-line entry point: deploy stored token drafts and preview
//! strategy recommendations.

use std::path::PathBuf;
use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::providers::ProviderBuilder;
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;

use token_foundry::config::{Config, setup_tracing};
use token_foundry::events::SqliteEventSink;
use token_foundry::foundry::FoundryDeploymentService;
use token_foundry::foundry::evm::AlloyChainWriter;
use token_foundry::foundry::keys::{KeyResolver, NoKeyVault};
use token_foundry::foundry::nonce::SqliteNonceManager;
use token_foundry::persistence::{self, TokenRecord};
use token_foundry::services::{
    DeployOptions, NoRateLimit, RateLimiter, UnifiedDeploymentService, WindowedRateLimiter,
};
use token_foundry::strategy::StrategyChoice;

#[derive(Debug, Parser)]
#[command(name = "token-foundry")]
#[command(about = "Deploy configurable tokens across EVM networks")]
#[command(version)]
struct Cli {
    /// Path to TOML configuration file
    #[clap(long)]
    config_file: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Deploy a stored token draft
    Deploy {
        /// Token draft id to deploy
        #[arg(long)]
        token_id: String,
        /// User id for rate limiting and the audit trail
        #[arg(long)]
        user: Option<String>,
        /// auto, basic, enhanced, or chunked
        #[arg(long, default_value = "auto")]
        strategy: StrategyChoice,
        /// Skip strategy optimization and take the basic path
        #[arg(long)]
        no_optimization: bool,
        /// Escalate to the institutional-grade (chunked) pipeline
        #[arg(long)]
        institutional: bool,
        /// Skip the security-token compliance pass
        #[arg(long)]
        skip_compliance: bool,
        /// Log the complexity breakdown alongside the deployment
        #[arg(long)]
        analytics: bool,
    },
    /// Preview the complexity analysis and recommended strategy for a draft
    Recommend {
        #[arg(long)]
        token_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load_file(&cli.config_file)?;
    setup_tracing(&config.log_level);

    let pool = config.get_sqlite_pool().await?;
    sqlx::migrate!().run(&pool).await?;

    match cli.command {
        Commands::Deploy {
            token_id,
            user,
            strategy,
            no_optimization,
            institutional,
            skip_compliance,
            analytics,
        } => {
            let options = DeployOptions {
                use_optimization: !no_optimization,
                force_strategy: strategy,
                enable_analytics: analytics,
                enable_compliance_validation: !skip_compliance,
                institutional_grade: institutional,
            };
            deploy(&config, pool, &token_id, user.as_deref(), options).await
        }
        Commands::Recommend { token_id } => recommend(&config, pool, &token_id).await,
    }
}

/// Load the draft and check it targets the configured network before any
/// chain traffic.
async fn load_draft(
    config: &Config,
    pool: &SqlitePool,
    token_id: &str,
) -> anyhow::Result<TokenRecord> {
    let record = persistence::load_token(pool, token_id).await?;
    if record.blockchain != config.evm.blockchain || record.environment != config.evm.environment {
        anyhow::bail!(
            "token {token_id} targets {} {} but this instance is configured for {} {}",
            record.blockchain,
            record.environment,
            config.evm.blockchain,
            config.evm.environment,
        );
    }
    Ok(record)
}

fn unified_service<P>(
    config: &Config,
    pool: SqlitePool,
    provider: P,
) -> anyhow::Result<UnifiedDeploymentService<NoKeyVault>>
where
    P: alloy::providers::Provider + Clone + Send + Sync + 'static,
{
    let writer = AlloyChainWriter::new(
        provider,
        config.evm.blockchain,
        config.evm.environment,
        config.load_bytecode()?,
    );
    let events = Arc::new(SqliteEventSink::new(pool.clone()));
    let foundry = FoundryDeploymentService::new(
        pool.clone(),
        Arc::new(writer),
        Arc::new(SqliteNonceManager::new(pool.clone())),
        KeyResolver::new(pool.clone(), NoKeyVault),
        events.clone(),
    );

    let limiter: Arc<dyn RateLimiter> = match config.rate_limit {
        Some(limit) => Arc::new(WindowedRateLimiter::new(
            pool.clone(),
            limit.max_deployments,
            limit.window_secs,
        )),
        None => Arc::new(NoRateLimit),
    };

    Ok(UnifiedDeploymentService::new(pool, foundry, limiter, events))
}

async fn deploy(
    config: &Config,
    pool: SqlitePool,
    token_id: &str,
    user: Option<&str>,
    options: DeployOptions,
) -> anyhow::Result<()> {
    let record = load_draft(config, &pool, token_id).await?;

    // The transaction signer is fixed per provider, so the deployer key is
    // resolved up front; the pipeline re-resolves it for address checks.
    let key = KeyResolver::new(pool.clone(), NoKeyVault)
        .resolve(&record.project_id, record.blockchain, None)
        .await?;
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(key.signer))
        .connect_http(config.evm.rpc_url.clone());

    let service = unified_service(config, pool, provider)?;
    let result = service.deploy(token_id, user, options).await?;

    if result.success {
        println!("deployed {} ({})", result.token_id, result.standard);
        if let Some(address) = result.contract_address {
            println!("  contract: {address}");
        }
        if let Some(tx_hash) = result.tx_hash {
            println!("  tx: {tx_hash}");
        }
        println!("  strategy: {}", result.strategy);
        if result.gas_savings_percent > 0 {
            println!("  estimated gas savings: {}%", result.gas_savings_percent);
        }
        for module in &result.modules {
            match module.address {
                Some(address) => println!("  module {}: {address}", module.kind),
                None => println!("  module {}: attachment failed", module.kind),
            }
        }
    } else {
        println!("deployment of {} failed", result.token_id);
        for error in &result.errors {
            println!("  error: {error}");
        }
    }
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }

    if result.success {
        Ok(())
    } else {
        anyhow::bail!("deployment failed")
    }
}

async fn recommend(config: &Config, pool: SqlitePool, token_id: &str) -> anyhow::Result<()> {
    load_draft(config, &pool, token_id).await?;

    let provider = ProviderBuilder::new().connect_http(config.evm.rpc_url.clone());
    let service = unified_service(config, pool, provider)?;
    let recommendation = service.get_recommendation(token_id).await?;

    println!(
        "{} ({}): {:?} complexity, score {}",
        recommendation.token_id,
        recommendation.standard,
        recommendation.complexity.level,
        recommendation.complexity.score,
    );
    println!("  recommended strategy: {}", recommendation.recommended_strategy);
    if recommendation.complexity.requires_chunking {
        println!(
            "  estimated transactions: {}",
            recommendation.complexity.estimated_chunks
        );
    }
    if recommendation.gas_savings_percent > 0 {
        println!(
            "  estimated gas savings: {}%",
            recommendation.gas_savings_percent
        );
    }
    for reason in &recommendation.complexity.reasons {
        println!("  reason: {reason}");
    }
    for error in &recommendation.mapping_errors {
        println!("  mapping error: {error}");
    }
    for warning in &recommendation.warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}
