//! Gas planning. Simulation against the live network is preferred; when a
//! node refuses to simulate (common for factory calls on congested RPCs)
//! a heuristic table keyed by (blockchain, standard) keeps deployments
//! moving. Priority scales the fee, never the limit.

use alloy::primitives::U256;

use crate::chain::Blockchain;
use crate::foundry::params::{GasConfig, GasPriority};
use crate::standard::TokenStandard;
use crate::strategy::DeploymentStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasSource {
    Override,
    Simulated,
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPlan {
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub source: GasSource,
}

impl GasPlan {
    /// Worst-case wei spend; compared against the wallet balance before
    /// any nonce is reserved.
    pub fn required_balance(&self) -> U256 {
        U256::from(self.gas_limit) * U256::from(self.max_fee_per_gas)
    }
}

/// Simulated estimates get headroom for state drift between simulation
/// and inclusion.
const SIMULATION_MARGIN_PERCENT: u64 = 20;

/// Fallback deployment gas by standard. Proxy deployment plus initialize;
/// security-token standards carry heavier initializers.
const fn base_gas_limit(standard: TokenStandard) -> u64 {
    match standard {
        TokenStandard::Erc20 => 2_200_000,
        TokenStandard::Erc721 => 2_800_000,
        TokenStandard::Erc1155 => 3_000_000,
        TokenStandard::Erc1400 => 4_500_000,
        TokenStandard::Erc3525 => 4_000_000,
        TokenStandard::Erc4626 => 3_200_000,
    }
}

/// L1 deployments pay materially more per opcode than the L2s; Polygon and
/// Avalanche sit in between on calldata-heavy initializers.
const fn chain_gas_adjustment_percent(blockchain: Blockchain) -> u64 {
    match blockchain {
        Blockchain::Ethereum => 110,
        Blockchain::Polygon | Blockchain::Avalanche => 105,
        Blockchain::Base | Blockchain::Arbitrum | Blockchain::Optimism => 100,
    }
}

const fn priority_fee_percent(priority: GasPriority) -> u128 {
    match priority {
        GasPriority::Low => 90,
        GasPriority::Medium => 100,
        GasPriority::High => 130,
    }
}

pub fn heuristic_gas_limit(blockchain: Blockchain, standard: TokenStandard) -> u64 {
    base_gas_limit(standard) * chain_gas_adjustment_percent(blockchain) / 100
}

/// Combine override, simulation, and heuristic into the plan used for the
/// balance check and the deployment transaction.
pub fn plan_gas(
    blockchain: Blockchain,
    standard: TokenStandard,
    config: Option<GasConfig>,
    network_gas_price: u128,
    simulated_limit: Option<u64>,
) -> GasPlan {
    let config = config.unwrap_or_default();

    let (gas_limit, source) = match (config.gas_limit, simulated_limit) {
        (Some(limit), _) => (limit, GasSource::Override),
        (None, Some(simulated)) => (
            simulated + simulated * SIMULATION_MARGIN_PERCENT / 100,
            GasSource::Simulated,
        ),
        (None, None) => (heuristic_gas_limit(blockchain, standard), GasSource::Heuristic),
    };

    let max_fee_per_gas = config.max_fee_per_gas.unwrap_or_else(|| {
        network_gas_price * priority_fee_percent(config.priority) / 100
    });

    GasPlan {
        gas_limit,
        max_fee_per_gas,
        source,
    }
}

/// Heuristic percentage of the basic-path gas spend saved by batching
/// configuration instead of issuing one transaction per record.
pub const fn estimated_savings_percent(strategy: DeploymentStrategy) -> u8 {
    match strategy {
        DeploymentStrategy::Basic => 0,
        DeploymentStrategy::Enhanced => 12,
        DeploymentStrategy::Chunked => 30,
    }
}
