//! Fungible token (ERC-20) configuration mapper.

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::complexity::{ComplexityProfile, ScoringTable};
use crate::foundry::params::{ConfigChunk, FoundryTokenConfig, ModuleKind};
use crate::forms::Erc20Form;
use crate::mapper::{
    check_decimals, check_name_symbol, parse_amount, parse_optional_address, require_percentage,
    warn_percentage, DeploymentValidation, MappingResult, TokenConfig,
};
use crate::standard::TokenStandard;

pub const SCORING: ScoringTable = ScoringTable {
    base: 10,
    low_below: 25,
    medium_below: 55,
    high_below: 95,
};

const WEIGHT_FEES: u32 = 10;
const WEIGHT_REBASING: u32 = 15;
const WEIGHT_GOVERNANCE: u32 = 18;
const WEIGHT_ANTI_WHALE: u32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Erc20BaseConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub initial_supply: U256,
    pub max_supply: U256,
    pub owner: Option<Address>,
    pub is_mintable: bool,
    pub is_burnable: bool,
    pub is_pausable: bool,
    pub permit_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeConfig {
    pub percentage: f64,
    pub recipient: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebasingConfig {
    pub mode: String,
    pub target_supply: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GovernanceConfig {
    pub quorum_percentage: f64,
    pub proposal_threshold: U256,
    pub voting_delay_blocks: u32,
    pub voting_period_blocks: u32,
    pub timelock_delay_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AntiWhaleConfig {
    pub max_wallet_amount: U256,
    pub cooldown_seconds: u32,
}

/// Mapper output: mandatory base config plus optional sections, each
/// `Some` only when its governing flag is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedErc20Config {
    pub base: Erc20BaseConfig,
    pub fees: Option<FeeConfig>,
    pub rebasing: Option<RebasingConfig>,
    pub governance: Option<GovernanceConfig>,
    pub anti_whale: Option<AntiWhaleConfig>,
}

pub fn map(form: &Erc20Form) -> MappingResult<EnhancedErc20Config> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let (name, symbol) = check_name_symbol(&form.name, &form.symbol, &mut errors);
    let decimals = check_decimals(form.decimals, &mut errors);
    let initial_supply = parse_amount(form.initial_supply.as_deref(), "initial_supply", &mut errors);
    let max_supply = parse_amount(form.max_supply.as_deref(), "max_supply", &mut errors);
    if !errors.is_empty() {
        return MappingResult::failure(errors);
    }

    let base = Erc20BaseConfig {
        name,
        symbol,
        decimals,
        initial_supply,
        max_supply,
        owner: parse_optional_address(form.owner.as_deref(), "owner", &mut warnings),
        is_mintable: form.is_mintable.unwrap_or(false),
        is_burnable: form.is_burnable.unwrap_or(false),
        is_pausable: form.is_pausable.unwrap_or(false),
        permit_enabled: form.permit_enabled.unwrap_or(false),
    };

    let fees = extract_fees(form, &mut warnings);
    let rebasing = extract_rebasing(form, &mut warnings);
    let governance = extract_governance(form, &mut warnings);
    let anti_whale = extract_anti_whale(form, &mut warnings);

    let mut profile = ComplexityProfile::new(&SCORING);
    if fees.is_some() {
        profile.feature("transfer fees", WEIGHT_FEES);
    }
    if rebasing.is_some() {
        profile.feature("rebasing", WEIGHT_REBASING);
    }
    if governance.is_some() {
        profile.feature("governance", WEIGHT_GOVERNANCE);
    }
    if anti_whale.is_some() {
        profile.feature("anti-whale limits", WEIGHT_ANTI_WHALE);
    }
    let complexity = profile.finish();

    MappingResult {
        success: true,
        config: Some(EnhancedErc20Config {
            base,
            fees,
            rebasing,
            governance,
            anti_whale,
        }),
        errors: Vec::new(),
        warnings,
        complexity,
    }
}

fn extract_fees(form: &Erc20Form, warnings: &mut Vec<String>) -> Option<FeeConfig> {
    if !form.fee_on_transfer.unwrap_or(false) {
        return None;
    }
    let percentage = form.fee_percentage.unwrap_or(0.0);
    warn_percentage(percentage, "fee_percentage", warnings);
    if percentage == 0.0 {
        warnings.push("transfer fee enabled with 0% configured".to_owned());
    }
    Some(FeeConfig {
        percentage,
        recipient: parse_optional_address(form.fee_recipient.as_deref(), "fee_recipient", warnings),
    })
}

fn extract_rebasing(form: &Erc20Form, warnings: &mut Vec<String>) -> Option<RebasingConfig> {
    if !form.rebasing_enabled.unwrap_or(false) {
        return None;
    }
    let mut parse_errors = Vec::new();
    let target_supply = parse_amount(form.target_supply.as_deref(), "target_supply", &mut parse_errors);
    warnings.extend(parse_errors);
    Some(RebasingConfig {
        mode: form.rebasing_mode.clone().unwrap_or_else(|| "automatic".to_owned()),
        target_supply,
    })
}

fn extract_governance(form: &Erc20Form, warnings: &mut Vec<String>) -> Option<GovernanceConfig> {
    if !form.governance_enabled.unwrap_or(false) {
        return None;
    }
    let quorum_percentage = form.quorum_percentage.unwrap_or(0.0);
    warn_percentage(quorum_percentage, "quorum_percentage", warnings);
    let mut parse_errors = Vec::new();
    let proposal_threshold = parse_amount(
        form.proposal_threshold.as_deref(),
        "proposal_threshold",
        &mut parse_errors,
    );
    warnings.extend(parse_errors);
    Some(GovernanceConfig {
        quorum_percentage,
        proposal_threshold,
        voting_delay_blocks: form.voting_delay_blocks.unwrap_or(0),
        voting_period_blocks: form.voting_period_blocks.unwrap_or(0),
        timelock_delay_seconds: form.timelock_delay_seconds.unwrap_or(0),
    })
}

fn extract_anti_whale(form: &Erc20Form, warnings: &mut Vec<String>) -> Option<AntiWhaleConfig> {
    if !form.anti_whale_enabled.unwrap_or(false) {
        return None;
    }
    let mut parse_errors = Vec::new();
    let max_wallet_amount = parse_amount(
        form.max_wallet_amount.as_deref(),
        "max_wallet_amount",
        &mut parse_errors,
    );
    warnings.extend(parse_errors);
    Some(AntiWhaleConfig {
        max_wallet_amount,
        cooldown_seconds: form.transfer_cooldown_seconds.unwrap_or(0),
    })
}

impl TokenConfig for EnhancedErc20Config {
    fn standard(&self) -> TokenStandard {
        TokenStandard::Erc20
    }

    fn foundry_config(&self) -> FoundryTokenConfig {
        FoundryTokenConfig::Erc20 {
            name: self.base.name.clone(),
            symbol: self.base.symbol.clone(),
            decimals: self.base.decimals,
            initial_supply: self.base.initial_supply,
            max_supply: self.base.max_supply,
            owner: self.base.owner,
            is_mintable: self.base.is_mintable,
            is_burnable: self.base.is_burnable,
            is_pausable: self.base.is_pausable,
        }
    }

    fn modules(&self) -> Vec<ModuleKind> {
        let mut modules = Vec::new();
        if self.fees.is_some() {
            modules.push(ModuleKind::Fees);
        }
        if self.governance.is_some() {
            modules.push(ModuleKind::Governance);
        }
        if self.rebasing.is_some() || self.anti_whale.is_some() {
            modules.push(ModuleKind::PolicyEngine);
        }
        modules
    }

    fn chunks(&self) -> Vec<ConfigChunk> {
        // ERC-20 carries no related-record arrays; all configuration fits
        // in the initializer and module attachments.
        Vec::new()
    }

    fn validate_configuration(&self) -> DeploymentValidation {
        let mut errors = Vec::new();
        if let Some(fees) = &self.fees {
            require_percentage(fees.percentage, "fee_percentage", &mut errors);
            if fees.recipient.is_none() {
                errors.push("fee_recipient is required when transfer fees are enabled".to_owned());
            }
        }
        if let Some(governance) = &self.governance {
            require_percentage(governance.quorum_percentage, "quorum_percentage", &mut errors);
            if governance.voting_period_blocks == 0 {
                errors.push("voting_period_blocks must be greater than zero".to_owned());
            }
        }
        if self.base.max_supply != U256::ZERO && self.base.initial_supply > self.base.max_supply {
            errors.push("initial_supply exceeds max_supply".to_owned());
        }
        DeploymentValidation::from_errors(errors)
    }
}
