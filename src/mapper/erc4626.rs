//! Vault-share token (ERC-4626) configuration mapper.

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::complexity::{ArrayRule, ComplexityProfile, ScoringTable};
use crate::foundry::params::{ConfigChunk, FoundryTokenConfig, ModuleKind};
use crate::forms::Erc4626Form;
use crate::mapper::{
    check_decimals, check_name_symbol, chunk_records, parse_amount, parse_optional_address,
    require_percentage, warn_percentage, DeploymentValidation, MappingResult, TokenConfig,
};
use crate::standard::TokenStandard;

pub const SCORING: ScoringTable = ScoringTable {
    base: 12,
    low_below: 30,
    medium_below: 65,
    high_below: 110,
};

const WEIGHT_FEES: u32 = 12;
const WEIGHT_LIMITS: u32 = 6;
const WEIGHT_YIELD: u32 = 15;

pub const VAULT_STRATEGIES: ArrayRule = ArrayRule {
    per_item: 5,
    cap: 25,
    ceiling: 5,
    chunk_size: 5,
};

pub const ASSET_ALLOCATIONS: ArrayRule = ArrayRule {
    per_item: 3,
    cap: 18,
    ceiling: 10,
    chunk_size: 10,
};

pub const PERFORMANCE_METRICS: ArrayRule = ArrayRule {
    per_item: 1,
    cap: 10,
    ceiling: 10,
    chunk_size: 10,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Erc4626BaseConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub asset: Option<Address>,
    pub asset_decimals: u8,
    pub owner: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaultFeeConfig {
    pub deposit_percentage: f64,
    pub withdrawal_percentage: f64,
    pub management_percentage: f64,
    pub performance_percentage: f64,
    pub recipient: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitConfig {
    pub deposit_limit: U256,
    pub min_deposit: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldStrategyConfig {
    pub protocol: String,
    pub rebalancing_enabled: bool,
    pub auto_compound: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaultStrategy {
    pub name: String,
    pub protocol: String,
    pub allocation_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetAllocation {
    pub asset: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedErc4626Config {
    pub base: Erc4626BaseConfig,
    pub fees: Option<VaultFeeConfig>,
    pub limits: Option<LimitConfig>,
    pub yield_strategy: Option<YieldStrategyConfig>,
    pub vault_strategies: Option<Vec<VaultStrategy>>,
    pub asset_allocations: Option<Vec<AssetAllocation>>,
    pub performance_metrics: Option<Vec<String>>,
}

pub fn map(form: &Erc4626Form) -> MappingResult<EnhancedErc4626Config> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let (name, symbol) = check_name_symbol(&form.name, &form.symbol, &mut errors);
    let decimals = check_decimals(form.decimals, &mut errors);
    if !errors.is_empty() {
        return MappingResult::failure(errors);
    }

    let asset = parse_optional_address(form.asset_address.as_deref(), "asset_address", &mut warnings);
    if asset.is_none() {
        warnings.push("underlying asset address is missing; deployment will be blocked".to_owned());
    }

    let base = Erc4626BaseConfig {
        name,
        symbol,
        decimals,
        asset,
        asset_decimals: form.asset_decimals.unwrap_or(18),
        owner: parse_optional_address(form.owner.as_deref(), "owner", &mut warnings),
    };

    let fees = extract_fees(form, &mut warnings);
    let limits = extract_limits(form, &mut warnings);
    let yield_strategy = extract_yield_strategy(form);
    let vault_strategies = extract_vault_strategies(form, &mut warnings);
    let asset_allocations = extract_asset_allocations(form, &mut warnings);
    let performance_metrics =
        (!form.performance_metrics.is_empty()).then(|| form.performance_metrics.clone());

    let mut profile = ComplexityProfile::new(&SCORING);
    if fees.is_some() {
        profile.feature("vault fees", WEIGHT_FEES);
    }
    if limits.is_some() {
        profile.feature("deposit limits", WEIGHT_LIMITS);
    }
    if yield_strategy.is_some() {
        profile.feature("yield strategy", WEIGHT_YIELD);
    }
    profile.records(
        "vault strategies",
        vault_strategies.as_deref().map_or(0, <[VaultStrategy]>::len),
        &VAULT_STRATEGIES,
    );
    profile.records(
        "asset allocations",
        asset_allocations.as_deref().map_or(0, <[AssetAllocation]>::len),
        &ASSET_ALLOCATIONS,
    );
    profile.records(
        "performance metrics",
        performance_metrics.as_deref().map_or(0, <[String]>::len),
        &PERFORMANCE_METRICS,
    );
    let complexity = profile.finish();

    MappingResult {
        success: true,
        config: Some(EnhancedErc4626Config {
            base,
            fees,
            limits,
            yield_strategy,
            vault_strategies,
            asset_allocations,
            performance_metrics,
        }),
        errors: Vec::new(),
        warnings,
        complexity,
    }
}

fn any_fee_input(form: &Erc4626Form) -> bool {
    form.deposit_fee_percentage.is_some()
        || form.withdrawal_fee_percentage.is_some()
        || form.management_fee_percentage.is_some()
        || form.performance_fee_percentage.is_some()
        || form.fee_recipient.is_some()
}

fn extract_fees(form: &Erc4626Form, warnings: &mut Vec<String>) -> Option<VaultFeeConfig> {
    if !any_fee_input(form) {
        return None;
    }
    let deposit = form.deposit_fee_percentage.unwrap_or(0.0);
    let withdrawal = form.withdrawal_fee_percentage.unwrap_or(0.0);
    let management = form.management_fee_percentage.unwrap_or(0.0);
    let performance = form.performance_fee_percentage.unwrap_or(0.0);
    for (value, field) in [
        (deposit, "deposit_fee_percentage"),
        (withdrawal, "withdrawal_fee_percentage"),
        (management, "management_fee_percentage"),
        (performance, "performance_fee_percentage"),
    ] {
        warn_percentage(value, field, warnings);
    }
    Some(VaultFeeConfig {
        deposit_percentage: deposit,
        withdrawal_percentage: withdrawal,
        management_percentage: management,
        performance_percentage: performance,
        recipient: parse_optional_address(form.fee_recipient.as_deref(), "fee_recipient", warnings),
    })
}

fn extract_limits(form: &Erc4626Form, warnings: &mut Vec<String>) -> Option<LimitConfig> {
    if form.deposit_limit.is_none() && form.min_deposit.is_none() {
        return None;
    }
    let mut parse_errors = Vec::new();
    let deposit_limit = parse_amount(form.deposit_limit.as_deref(), "deposit_limit", &mut parse_errors);
    let min_deposit = parse_amount(form.min_deposit.as_deref(), "min_deposit", &mut parse_errors);
    warnings.extend(parse_errors);
    Some(LimitConfig {
        deposit_limit,
        min_deposit,
    })
}

fn extract_yield_strategy(form: &Erc4626Form) -> Option<YieldStrategyConfig> {
    let any = form.yield_strategy_protocol.is_some()
        || form.rebalancing_enabled.unwrap_or(false)
        || form.auto_compound.unwrap_or(false);
    any.then(|| YieldStrategyConfig {
        protocol: form.yield_strategy_protocol.clone().unwrap_or_default(),
        rebalancing_enabled: form.rebalancing_enabled.unwrap_or(false),
        auto_compound: form.auto_compound.unwrap_or(false),
    })
}

fn extract_vault_strategies(
    form: &Erc4626Form,
    warnings: &mut Vec<String>,
) -> Option<Vec<VaultStrategy>> {
    if form.vault_strategies.is_empty() {
        return None;
    }
    let strategies = form
        .vault_strategies
        .iter()
        .map(|input| {
            let allocation_percentage = input.allocation_percentage.unwrap_or(0.0);
            warn_percentage(allocation_percentage, "allocation_percentage", warnings);
            VaultStrategy {
                name: input.name.clone().unwrap_or_default(),
                protocol: input.protocol.clone().unwrap_or_default(),
                allocation_percentage,
            }
        })
        .collect();
    Some(strategies)
}

fn extract_asset_allocations(
    form: &Erc4626Form,
    warnings: &mut Vec<String>,
) -> Option<Vec<AssetAllocation>> {
    if form.asset_allocations.is_empty() {
        return None;
    }
    let allocations = form
        .asset_allocations
        .iter()
        .map(|input| {
            let percentage = input.percentage.unwrap_or(0.0);
            warn_percentage(percentage, "asset allocation percentage", warnings);
            AssetAllocation {
                asset: input.asset.clone().unwrap_or_default(),
                percentage,
            }
        })
        .collect();
    Some(allocations)
}

impl TokenConfig for EnhancedErc4626Config {
    fn standard(&self) -> TokenStandard {
        TokenStandard::Erc4626
    }

    fn foundry_config(&self) -> FoundryTokenConfig {
        FoundryTokenConfig::Erc4626 {
            name: self.base.name.clone(),
            symbol: self.base.symbol.clone(),
            decimals: self.base.decimals,
            asset: self.base.asset,
            owner: self.base.owner,
        }
    }

    fn modules(&self) -> Vec<ModuleKind> {
        let mut modules = Vec::new();
        if self.fees.is_some() {
            modules.push(ModuleKind::Fees);
        }
        if self.yield_strategy.is_some() || self.vault_strategies.is_some() {
            modules.push(ModuleKind::PolicyEngine);
        }
        modules
    }

    fn chunks(&self) -> Vec<ConfigChunk> {
        let mut chunks = Vec::new();
        if let Some(strategies) = &self.vault_strategies {
            chunks.extend(chunk_records(
                "vault-strategies",
                strategies,
                VAULT_STRATEGIES.chunk_size,
            ));
        }
        if let Some(allocations) = &self.asset_allocations {
            chunks.extend(chunk_records(
                "asset-allocations",
                allocations,
                ASSET_ALLOCATIONS.chunk_size,
            ));
        }
        if let Some(metrics) = &self.performance_metrics {
            chunks.extend(chunk_records(
                "performance-metrics",
                metrics,
                PERFORMANCE_METRICS.chunk_size,
            ));
        }
        chunks
    }

    fn validate_configuration(&self) -> DeploymentValidation {
        let mut errors = Vec::new();
        if self.base.asset.is_none() {
            errors.push("underlying asset address is required".to_owned());
        }
        if let Some(fees) = &self.fees {
            for (value, field) in [
                (fees.deposit_percentage, "deposit_fee_percentage"),
                (fees.withdrawal_percentage, "withdrawal_fee_percentage"),
                (fees.management_percentage, "management_fee_percentage"),
                (fees.performance_percentage, "performance_fee_percentage"),
            ] {
                require_percentage(value, field, &mut errors);
            }
            let any_nonzero = fees.deposit_percentage > 0.0
                || fees.withdrawal_percentage > 0.0
                || fees.management_percentage > 0.0
                || fees.performance_percentage > 0.0;
            if any_nonzero && fees.recipient.is_none() {
                errors.push("fee_recipient is required when any vault fee is non-zero".to_owned());
            }
        }
        if let Some(strategies) = &self.vault_strategies {
            let total: f64 = strategies.iter().map(|s| s.allocation_percentage).sum();
            if total > 100.0 {
                errors.push(format!(
                    "vault strategy allocations sum to {total}%, above 100%"
                ));
            }
        }
        if let Some(limits) = &self.limits {
            if limits.deposit_limit != U256::ZERO && limits.min_deposit > limits.deposit_limit {
                errors.push("min_deposit exceeds deposit_limit".to_owned());
            }
        }
        DeploymentValidation::from_errors(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::VaultStrategyInput;

    fn minimal_form() -> Erc4626Form {
        Erc4626Form {
            name: Some("Yield Vault".to_owned()),
            symbol: Some("yVLT".to_owned()),
            decimals: Some(18),
            asset_address: Some("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_owned()),
            ..Erc4626Form::default()
        }
    }

    fn strategies(count: usize, each_percentage: f64) -> Vec<VaultStrategyInput> {
        (0..count)
            .map(|i| VaultStrategyInput {
                name: Some(format!("strategy-{i}")),
                protocol: Some("aave".to_owned()),
                allocation_percentage: Some(each_percentage),
            })
            .collect()
    }

    #[test]
    fn minimal_form_maps_cleanly() {
        let result = map(&minimal_form());
        assert!(result.success);
        let config = result.config.unwrap();
        assert!(config.fees.is_none());
        assert!(config.yield_strategy.is_none());
        assert!(config.vault_strategies.is_none());
        assert!(config.validate_configuration().is_valid);
    }

    #[test]
    fn missing_asset_is_warned_then_blocked() {
        let result = map(&Erc4626Form {
            asset_address: None,
            ..minimal_form()
        });
        assert!(result.success, "mapping still succeeds for preview");
        assert!(result.warnings.iter().any(|w| w.contains("asset")));
        let validation = result.config.unwrap().validate_configuration();
        assert!(!validation.is_valid);
    }

    #[test]
    fn any_fee_field_materializes_the_section() {
        let result = map(&Erc4626Form {
            management_fee_percentage: Some(2.0),
            ..minimal_form()
        });
        let fees = result.config.unwrap().fees.unwrap();
        assert_eq!(fees.management_percentage, 2.0);
        assert_eq!(fees.deposit_percentage, 0.0);
    }

    #[test]
    fn six_strategies_force_chunking() {
        let result = map(&Erc4626Form {
            vault_strategies: strategies(6, 10.0),
            ..minimal_form()
        });
        assert!(result.complexity.requires_chunking);
    }

    #[test]
    fn nonzero_fee_without_recipient_blocks_deployment() {
        let result = map(&Erc4626Form {
            performance_fee_percentage: Some(10.0),
            ..minimal_form()
        });
        let validation = result.config.unwrap().validate_configuration();
        assert!(!validation.is_valid);
        assert!(validation.errors.iter().any(|e| e.contains("fee_recipient")));
    }

    #[test]
    fn over_allocated_strategies_block_deployment() {
        let result = map(&Erc4626Form {
            vault_strategies: strategies(3, 40.0),
            ..minimal_form()
        });
        let validation = result.config.unwrap().validate_configuration();
        assert!(!validation.is_valid);
        assert!(validation.errors.iter().any(|e| e.contains("120")));
    }

    #[test]
    fn min_deposit_above_limit_blocks_deployment() {
        let result = map(&Erc4626Form {
            deposit_limit: Some("100".to_owned()),
            min_deposit: Some("200".to_owned()),
            ..minimal_form()
        });
        let validation = result.config.unwrap().validate_configuration();
        assert!(!validation.is_valid);
    }

    #[test]
    fn yield_strategy_from_rebalancing_flag_alone() {
        let result = map(&Erc4626Form {
            rebalancing_enabled: Some(true),
            ..minimal_form()
        });
        let config = result.config.unwrap();
        let strategy = config.yield_strategy.as_ref().unwrap();
        assert!(strategy.rebalancing_enabled);
        assert!(strategy.protocol.is_empty());
        assert!(config.modules().contains(&ModuleKind::PolicyEngine));
    }
}
