//! Multi-token (ERC-1155) configuration mapper.

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::complexity::{ArrayRule, ComplexityProfile, ScoringTable};
use crate::foundry::params::{ConfigChunk, FoundryTokenConfig, ModuleKind};
use crate::forms::Erc1155Form;
use crate::mapper::{
    check_name_symbol, chunk_records, parse_amount, parse_optional_address, require_percentage,
    warn_percentage, DeploymentValidation, MappingResult, TokenConfig,
};
use crate::standard::TokenStandard;

pub const SCORING: ScoringTable = ScoringTable {
    base: 15,
    low_below: 30,
    medium_below: 70,
    high_below: 120,
};

const WEIGHT_ROYALTY: u32 = 8;
const WEIGHT_CONTAINER: u32 = 10;

pub const TOKEN_TYPES: ArrayRule = ArrayRule {
    per_item: 3,
    cap: 36,
    ceiling: 30,
    chunk_size: 10,
};

pub const URI_MAPPINGS: ArrayRule = ArrayRule {
    per_item: 1,
    cap: 15,
    ceiling: 50,
    chunk_size: 20,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Erc1155BaseConfig {
    pub name: String,
    pub symbol: String,
    pub base_uri: String,
    pub owner: Option<Address>,
    pub is_pausable: bool,
    pub batch_minting: bool,
    pub supply_tracking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoyaltyConfig {
    pub percentage: f64,
    pub receiver: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenType {
    pub id: u64,
    pub name: String,
    pub max_supply: U256,
    pub fungible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UriMapping {
    pub token_type_id: u64,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedErc1155Config {
    pub base: Erc1155BaseConfig,
    pub royalty: Option<RoyaltyConfig>,
    pub container: Option<ContainerConfig>,
    pub token_types: Option<Vec<TokenType>>,
    pub uri_mappings: Option<Vec<UriMapping>>,
}

pub fn map(form: &Erc1155Form) -> MappingResult<EnhancedErc1155Config> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let (name, symbol) = check_name_symbol(&form.name, &form.symbol, &mut errors);
    if !errors.is_empty() {
        return MappingResult::failure(errors);
    }

    let base = Erc1155BaseConfig {
        name,
        symbol,
        base_uri: form.base_uri.clone().unwrap_or_default(),
        owner: parse_optional_address(form.owner.as_deref(), "owner", &mut warnings),
        is_pausable: form.is_pausable.unwrap_or(false),
        batch_minting: form.batch_minting_enabled.unwrap_or(false),
        supply_tracking: form.supply_tracking.unwrap_or(false),
    };

    let royalty = extract_royalty(form, &mut warnings);
    let container = form
        .container_enabled
        .unwrap_or(false)
        .then_some(ContainerConfig { enabled: true });
    let token_types = extract_token_types(form, &mut warnings);
    let uri_mappings = extract_uri_mappings(form, &mut warnings);

    let mut profile = ComplexityProfile::new(&SCORING);
    if royalty.is_some() {
        profile.feature("royalties", WEIGHT_ROYALTY);
    }
    if container.is_some() {
        profile.feature("container semantics", WEIGHT_CONTAINER);
    }
    profile.records(
        "token types",
        token_types.as_deref().map_or(0, <[TokenType]>::len),
        &TOKEN_TYPES,
    );
    profile.records(
        "URI mappings",
        uri_mappings.as_deref().map_or(0, <[UriMapping]>::len),
        &URI_MAPPINGS,
    );
    let complexity = profile.finish();

    MappingResult {
        success: true,
        config: Some(EnhancedErc1155Config {
            base,
            royalty,
            container,
            token_types,
            uri_mappings,
        }),
        errors: Vec::new(),
        warnings,
        complexity,
    }
}

fn extract_royalty(form: &Erc1155Form, warnings: &mut Vec<String>) -> Option<RoyaltyConfig> {
    if !form.royalty_enabled.unwrap_or(false) {
        return None;
    }
    let percentage = form.royalty_percentage.unwrap_or(0.0);
    warn_percentage(percentage, "royalty_percentage", warnings);
    Some(RoyaltyConfig {
        percentage,
        receiver: parse_optional_address(
            form.royalty_receiver.as_deref(),
            "royalty_receiver",
            warnings,
        ),
    })
}

fn extract_token_types(form: &Erc1155Form, warnings: &mut Vec<String>) -> Option<Vec<TokenType>> {
    if form.token_types.is_empty() {
        return None;
    }
    let types = form
        .token_types
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let mut parse_errors = Vec::new();
            let max_supply = parse_amount(input.max_supply.as_deref(), "max_supply", &mut parse_errors);
            warnings.extend(parse_errors);
            TokenType {
                id: input.id.unwrap_or(index as u64),
                name: input.name.clone().unwrap_or_default(),
                max_supply,
                fungible: input.fungible.unwrap_or(true),
            }
        })
        .collect();
    Some(types)
}

fn extract_uri_mappings(form: &Erc1155Form, warnings: &mut Vec<String>) -> Option<Vec<UriMapping>> {
    if form.uri_mappings.is_empty() {
        return None;
    }
    let mappings = form
        .uri_mappings
        .iter()
        .filter_map(|input| {
            let Some(token_type_id) = input.token_type_id else {
                warnings.push("URI mapping without a token type id was dropped".to_owned());
                return None;
            };
            Some(UriMapping {
                token_type_id,
                uri: input.uri.clone().unwrap_or_default(),
            })
        })
        .collect::<Vec<_>>();
    (!mappings.is_empty()).then_some(mappings)
}

impl TokenConfig for EnhancedErc1155Config {
    fn standard(&self) -> TokenStandard {
        TokenStandard::Erc1155
    }

    fn foundry_config(&self) -> FoundryTokenConfig {
        FoundryTokenConfig::Erc1155 {
            name: self.base.name.clone(),
            symbol: self.base.symbol.clone(),
            base_uri: self.base.base_uri.clone(),
            owner: self.base.owner,
            batch_minting: self.base.batch_minting,
            supply_tracking: self.base.supply_tracking,
        }
    }

    fn modules(&self) -> Vec<ModuleKind> {
        let mut modules = Vec::new();
        if self.royalty.is_some() {
            modules.push(ModuleKind::Royalty);
        }
        if self.container.is_some() {
            modules.push(ModuleKind::PolicyEngine);
        }
        modules
    }

    fn chunks(&self) -> Vec<ConfigChunk> {
        let mut chunks = Vec::new();
        if let Some(types) = &self.token_types {
            chunks.extend(chunk_records("token-types", types, TOKEN_TYPES.chunk_size));
        }
        if let Some(mappings) = &self.uri_mappings {
            chunks.extend(chunk_records("uri-mappings", mappings, URI_MAPPINGS.chunk_size));
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
        if let Some(types) = &self.token_types {
            let mut seen = std::collections::HashSet::new();
            for token_type in types {
                if !seen.insert(token_type.id) {
                    errors.push(format!("duplicate token type id {}", token_type.id));
                }
            }
        }
        if let (Some(mappings), Some(types)) = (&self.uri_mappings, &self.token_types) {
            let known: std::collections::HashSet<u64> = types.iter().map(|t| t.id).collect();
            for mapping in mappings {
                if !known.contains(&mapping.token_type_id) {
                    errors.push(format!(
                        "URI mapping references unknown token type id {}",
                        mapping.token_type_id
                    ));
                }
            }
        }
        DeploymentValidation::from_errors(errors)
    }
}
