//! NFT (ERC-721) configuration mapper.

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::complexity::{ArrayRule, ComplexityProfile, ScoringTable};
use crate::foundry::params::{ConfigChunk, FoundryTokenConfig, ModuleKind};
use crate::forms::{Erc721Form, MintPhaseInput};
use crate::mapper::{
    check_name_symbol, chunk_records, parse_amount, parse_optional_address, require_percentage,
    warn_percentage, DeploymentValidation, MappingResult, TokenConfig,
};
use crate::standard::TokenStandard;

pub const SCORING: ScoringTable = ScoringTable {
    base: 12,
    low_below: 30,
    medium_below: 60,
    high_below: 100,
};

const WEIGHT_ROYALTY: u32 = 8;
const WEIGHT_REVEAL: u32 = 5;

pub const MINT_PHASES: ArrayRule = ArrayRule {
    per_item: 4,
    cap: 24,
    ceiling: 10,
    chunk_size: 5,
};

pub const ATTRIBUTES: ArrayRule = ArrayRule {
    per_item: 2,
    cap: 20,
    ceiling: 20,
    chunk_size: 10,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Erc721BaseConfig {
    pub name: String,
    pub symbol: String,
    pub base_uri: String,
    pub max_supply: u64,
    pub owner: Option<Address>,
    pub is_mintable: bool,
    pub is_burnable: bool,
    pub is_pausable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoyaltyConfig {
    pub percentage: f64,
    pub receiver: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevealConfig {
    pub pre_reveal_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MintPhase {
    pub name: String,
    pub price_wei: U256,
    pub max_per_wallet: u32,
    pub starts_at: String,
    pub allowlist_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDefinition {
    pub trait_type: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedErc721Config {
    pub base: Erc721BaseConfig,
    pub royalty: Option<RoyaltyConfig>,
    pub reveal: Option<RevealConfig>,
    pub mint_phases: Option<Vec<MintPhase>>,
    pub attributes: Option<Vec<AttributeDefinition>>,
}

pub fn map(form: &Erc721Form) -> MappingResult<EnhancedErc721Config> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let (name, symbol) = check_name_symbol(&form.name, &form.symbol, &mut errors);
    if !errors.is_empty() {
        return MappingResult::failure(errors);
    }

    let base = Erc721BaseConfig {
        name,
        symbol,
        base_uri: form.base_uri.clone().unwrap_or_default(),
        max_supply: form.max_supply.unwrap_or(0),
        owner: parse_optional_address(form.owner.as_deref(), "owner", &mut warnings),
        is_mintable: form.is_mintable.unwrap_or(false),
        is_burnable: form.is_burnable.unwrap_or(false),
        is_pausable: form.is_pausable.unwrap_or(false),
    };

    let royalty = extract_royalty(form, &mut warnings);
    let reveal = extract_reveal(form, &mut warnings);
    let mint_phases = extract_mint_phases(&form.mint_phases, &mut warnings);
    let attributes = extract_attributes(form);

    let mut profile = ComplexityProfile::new(&SCORING);
    if royalty.is_some() {
        profile.feature("royalties", WEIGHT_ROYALTY);
    }
    if reveal.is_some() {
        profile.feature("delayed reveal", WEIGHT_REVEAL);
    }
    profile.records(
        "mint phases",
        mint_phases.as_deref().map_or(0, <[MintPhase]>::len),
        &MINT_PHASES,
    );
    profile.records(
        "attribute definitions",
        attributes.as_deref().map_or(0, <[AttributeDefinition]>::len),
        &ATTRIBUTES,
    );
    let complexity = profile.finish();

    MappingResult {
        success: true,
        config: Some(EnhancedErc721Config {
            base,
            royalty,
            reveal,
            mint_phases,
            attributes,
        }),
        errors: Vec::new(),
        warnings,
        complexity,
    }
}

fn extract_royalty(form: &Erc721Form, warnings: &mut Vec<String>) -> Option<RoyaltyConfig> {
    if !form.royalty_enabled.unwrap_or(false) {
        return None;
    }
    let percentage = form.royalty_percentage.unwrap_or(0.0);
    warn_percentage(percentage, "royalty_percentage", warnings);
    if percentage == 0.0 {
        warnings.push("royalties enabled with 0% configured".to_owned());
    }
    Some(RoyaltyConfig {
        percentage,
        receiver: parse_optional_address(
            form.royalty_receiver.as_deref(),
            "royalty_receiver",
            warnings,
        ),
    })
}

fn extract_reveal(form: &Erc721Form, warnings: &mut Vec<String>) -> Option<RevealConfig> {
    if !form.reveal_enabled.unwrap_or(false) {
        return None;
    }
    let pre_reveal_uri = form.pre_reveal_uri.clone().unwrap_or_default();
    if pre_reveal_uri.is_empty() {
        warnings.push("delayed reveal enabled without a pre-reveal URI".to_owned());
    }
    Some(RevealConfig { pre_reveal_uri })
}

fn extract_mint_phases(
    inputs: &[MintPhaseInput],
    warnings: &mut Vec<String>,
) -> Option<Vec<MintPhase>> {
    if inputs.is_empty() {
        return None;
    }
    let phases = inputs
        .iter()
        .map(|input| {
            let mut parse_errors = Vec::new();
            let price_wei = parse_amount(input.price_wei.as_deref(), "price_wei", &mut parse_errors);
            warnings.extend(parse_errors);
            MintPhase {
                name: input.name.clone().unwrap_or_default(),
                price_wei,
                max_per_wallet: input.max_per_wallet.unwrap_or(0),
                starts_at: input.starts_at.clone().unwrap_or_default(),
                allowlist_only: input.allowlist_only.unwrap_or(false),
            }
        })
        .collect();
    Some(phases)
}

fn extract_attributes(form: &Erc721Form) -> Option<Vec<AttributeDefinition>> {
    if form.attributes.is_empty() {
        return None;
    }
    let attributes = form
        .attributes
        .iter()
        .map(|input| AttributeDefinition {
            trait_type: input.trait_type.clone().unwrap_or_default(),
            values: input.values.clone(),
        })
        .collect();
    Some(attributes)
}

impl TokenConfig for EnhancedErc721Config {
    fn standard(&self) -> TokenStandard {
        TokenStandard::Erc721
    }

    fn foundry_config(&self) -> FoundryTokenConfig {
        FoundryTokenConfig::Erc721 {
            name: self.base.name.clone(),
            symbol: self.base.symbol.clone(),
            base_uri: self.base.base_uri.clone(),
            max_supply: self.base.max_supply,
            owner: self.base.owner,
            is_mintable: self.base.is_mintable,
            is_burnable: self.base.is_burnable,
        }
    }

    fn modules(&self) -> Vec<ModuleKind> {
        let mut modules = Vec::new();
        if self.royalty.is_some() {
            modules.push(ModuleKind::Royalty);
        }
        if self.mint_phases.is_some() {
            modules.push(ModuleKind::PolicyEngine);
        }
        modules
    }

    fn chunks(&self) -> Vec<ConfigChunk> {
        let mut chunks = Vec::new();
        if let Some(phases) = &self.mint_phases {
            chunks.extend(chunk_records("mint-phases", phases, MINT_PHASES.chunk_size));
        }
        if let Some(attributes) = &self.attributes {
            chunks.extend(chunk_records("attributes", attributes, ATTRIBUTES.chunk_size));
        }
        chunks
    }

    fn validate_configuration(&self) -> DeploymentValidation {
        let mut errors = Vec::new();
        if let Some(royalty) = &self.royalty {
            require_percentage(royalty.percentage, "royalty_percentage", &mut errors);
            if royalty.receiver.is_none() {
                errors.push("royalty_receiver is required when royalties are enabled".to_owned());
            }
        }
        if let Some(phases) = &self.mint_phases {
            for (index, phase) in phases.iter().enumerate() {
                if phase.name.is_empty() {
                    errors.push(format!("mint phase {index} is missing a name"));
                }
            }
        }
        DeploymentValidation::from_errors(errors)
    }
}
