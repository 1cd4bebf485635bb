//! Configuration mappers: normalize typed form input into deployment
//! configurations, score their complexity, and validate them for
//! deployment.
//!
//! Mapping never returns `Err`: the contract is a structured
//! [`MappingResult`] carrying success flag, errors, warnings, and the
//! complexity analysis. Hard core-field validation short-circuits with a
//! zeroed analysis and no config. Deployment validation
//! (`validate_configuration`) is a separate pass with stricter semantics,
//! so a partially-suspect config can still be inspected before being
//! rejected for deployment.

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::complexity::ComplexityAnalysis;
use crate::foundry::params::{ConfigChunk, FoundryTokenConfig, ModuleKind};
use crate::forms::TokenForm;
use crate::standard::TokenStandard;

pub mod erc1155;
pub mod erc1400;
pub mod erc20;
pub mod erc3525;
pub mod erc4626;
pub mod erc721;

#[derive(Debug, Clone)]
pub struct MappingResult<C> {
    pub success: bool,
    pub config: Option<C>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub complexity: ComplexityAnalysis,
}

impl<C> MappingResult<C> {
    /// Hard validation failure: no config, zeroed complexity.
    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            success: false,
            config: None,
            errors,
            warnings: Vec::new(),
            complexity: ComplexityAnalysis::zeroed(),
        }
    }

    pub fn map_config<D>(self, f: impl FnOnce(C) -> D) -> MappingResult<D> {
        MappingResult {
            success: self.success,
            config: self.config.map(f),
            errors: self.errors,
            warnings: self.warnings,
            complexity: self.complexity,
        }
    }
}

/// Outcome of the deployment-validation pass. Distinct from mapping
/// errors: these are semantic rules that block deployment of an otherwise
/// well-formed config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl DeploymentValidation {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Behavior every per-standard enhanced config provides to the
/// orchestration layer.
pub trait TokenConfig {
    fn standard(&self) -> TokenStandard;

    /// The base-level call shape for the constructor/initializer.
    fn foundry_config(&self) -> FoundryTokenConfig;

    /// Extension modules implied by the present optional sections.
    fn modules(&self) -> Vec<ModuleKind>;

    /// Post-deployment configuration batches for the chunked path.
    fn chunks(&self) -> Vec<ConfigChunk>;

    /// Hard semantic checks deferred from extraction.
    fn validate_configuration(&self) -> DeploymentValidation;
}

/// Type-erased union of the six enhanced configs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnyEnhancedConfig {
    Erc20(erc20::EnhancedErc20Config),
    Erc721(erc721::EnhancedErc721Config),
    Erc1155(erc1155::EnhancedErc1155Config),
    Erc1400(erc1400::EnhancedErc1400Config),
    Erc3525(erc3525::EnhancedErc3525Config),
    Erc4626(erc4626::EnhancedErc4626Config),
}

macro_rules! delegate {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            AnyEnhancedConfig::Erc20($inner) => $body,
            AnyEnhancedConfig::Erc721($inner) => $body,
            AnyEnhancedConfig::Erc1155($inner) => $body,
            AnyEnhancedConfig::Erc1400($inner) => $body,
            AnyEnhancedConfig::Erc3525($inner) => $body,
            AnyEnhancedConfig::Erc4626($inner) => $body,
        }
    };
}

impl TokenConfig for AnyEnhancedConfig {
    fn standard(&self) -> TokenStandard {
        delegate!(self, c => c.standard())
    }

    fn foundry_config(&self) -> FoundryTokenConfig {
        delegate!(self, c => c.foundry_config())
    }

    fn modules(&self) -> Vec<ModuleKind> {
        delegate!(self, c => c.modules())
    }

    fn chunks(&self) -> Vec<ConfigChunk> {
        delegate!(self, c => c.chunks())
    }

    fn validate_configuration(&self) -> DeploymentValidation {
        delegate!(self, c => c.validate_configuration())
    }
}

/// Map a token form with the mapper for its standard.
pub fn map_form(form: &TokenForm) -> MappingResult<AnyEnhancedConfig> {
    match form {
        TokenForm::Erc20(f) => erc20::map(f).map_config(AnyEnhancedConfig::Erc20),
        TokenForm::Erc721(f) => erc721::map(f).map_config(AnyEnhancedConfig::Erc721),
        TokenForm::Erc1155(f) => erc1155::map(f).map_config(AnyEnhancedConfig::Erc1155),
        TokenForm::Erc1400(f) => erc1400::map(f).map_config(AnyEnhancedConfig::Erc1400),
        TokenForm::Erc3525(f) => erc3525::map(f).map_config(AnyEnhancedConfig::Erc3525),
        TokenForm::Erc4626(f) => erc4626::map(f).map_config(AnyEnhancedConfig::Erc4626),
    }
}

// ===== Shared extraction helpers =====

/// Core name/symbol check shared by every mapper. Pushes hard errors.
pub(crate) fn check_name_symbol(
    name: &Option<String>,
    symbol: &Option<String>,
    errors: &mut Vec<String>,
) -> (String, String) {
    let name = name.as_deref().unwrap_or("").trim().to_owned();
    let symbol = symbol.as_deref().unwrap_or("").trim().to_owned();
    if name.is_empty() {
        errors.push("name is required".to_owned());
    }
    if symbol.is_empty() {
        errors.push("symbol is required".to_owned());
    }
    (name, symbol)
}

/// Decimals default to 18 when absent; values above 18 are a hard error.
pub(crate) fn check_decimals(decimals: Option<u8>, errors: &mut Vec<String>) -> u8 {
    let decimals = decimals.unwrap_or(18);
    if decimals > 18 {
        errors.push(format!("decimals must be between 0 and 18, got {decimals}"));
    }
    decimals
}

/// Parse a decimal amount string, defaulting to zero when absent.
/// Unparseable amounts are hard errors.
pub(crate) fn parse_amount(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<String>,
) -> U256 {
    match value {
        None => U256::ZERO,
        Some(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return U256::ZERO;
            }
            match raw.parse::<U256>() {
                Ok(amount) => amount,
                Err(_) => {
                    errors.push(format!("{field} is not a valid amount: {raw}"));
                    U256::ZERO
                }
            }
        }
    }
}

/// Parse an optional address. Malformed input degrades to `None` with a
/// warning; the deployment-validation pass decides whether the absence is
/// fatal for the section it governs.
pub(crate) fn parse_optional_address(
    value: Option<&str>,
    field: &str,
    warnings: &mut Vec<String>,
) -> Option<Address> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<Address>() {
        Ok(address) => Some(address),
        Err(_) => {
            warnings.push(format!("{field} is not a valid address: {raw}"));
            None
        }
    }
}

/// Percentage bounds are soft at extraction time.
pub(crate) fn warn_percentage(value: f64, field: &str, warnings: &mut Vec<String>) {
    if !(0.0..=100.0).contains(&value) {
        warnings.push(format!("{field} {value} is outside the 0-100 range"));
    }
}

/// Percentage bounds are hard at deployment-validation time.
pub(crate) fn require_percentage(value: f64, field: &str, errors: &mut Vec<String>) {
    if !(0.0..=100.0).contains(&value) {
        errors.push(format!("{field} must be between 0 and 100, got {value}"));
    }
}

/// Split a related-record array into per-transaction configuration
/// batches of `chunk_size` items.
pub(crate) fn chunk_records<T: Serialize>(
    section: &str,
    records: &[T],
    chunk_size: usize,
) -> Vec<ConfigChunk> {
    if records.is_empty() {
        return Vec::new();
    }
    let total = records.len().div_ceil(chunk_size);
    records
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, batch)| ConfigChunk {
            section: section.to_owned(),
            label: format!("{section} {}/{total}", index + 1),
            payload: serde_json::to_value(batch).unwrap_or(serde_json::Value::Null),
        })
        .collect()
}
