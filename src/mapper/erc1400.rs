//! Security token (ERC-1400) configuration mapper.

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::complexity::{ArrayRule, ComplexityProfile, ScoringTable};
use crate::foundry::params::{ConfigChunk, FoundryTokenConfig, ModuleKind};
use crate::forms::Erc1400Form;
use crate::mapper::{
    check_decimals, check_name_symbol, chunk_records, parse_amount, DeploymentValidation,
    MappingResult, TokenConfig,
};
use crate::standard::TokenStandard;

pub const SCORING: ScoringTable = ScoringTable {
    base: 15,
    low_below: 40,
    medium_below: 80,
    high_below: 150,
};

const WEIGHT_COMPLIANCE: u32 = 20;
const WEIGHT_INSTITUTIONAL: u32 = 25;
const WEIGHT_CORPORATE_ACTIONS: u32 = 12;

pub const PARTITIONS: ArrayRule = ArrayRule {
    per_item: 5,
    cap: 40,
    ceiling: 10,
    chunk_size: 5,
};

pub const CONTROLLERS: ArrayRule = ArrayRule {
    per_item: 3,
    cap: 15,
    ceiling: 5,
    chunk_size: 10,
};

pub const DOCUMENTS: ArrayRule = ArrayRule {
    per_item: 2,
    cap: 20,
    ceiling: 20,
    chunk_size: 10,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Erc1400BaseConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub initial_supply: U256,
    pub owner: Option<Address>,
    pub is_controllable: bool,
    pub is_issuable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceConfig {
    pub kyc_enabled: bool,
    pub whitelist_enabled: bool,
    pub accredited_investor_only: bool,
    pub investor_accreditation: bool,
    pub jurisdiction: String,
    pub cross_border_enabled: bool,
    pub max_investor_count: u32,
    pub forced_transfers_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstitutionalConfig {
    pub institutional_grade: bool,
    pub custody_integration: bool,
    pub settlement_integration: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorporateActionsConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partition {
    pub name: String,
    pub amount: U256,
    pub transferable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub name: String,
    pub uri: String,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedErc1400Config {
    pub base: Erc1400BaseConfig,
    pub compliance: Option<ComplianceConfig>,
    pub institutional: Option<InstitutionalConfig>,
    pub corporate_actions: Option<CorporateActionsConfig>,
    pub partitions: Option<Vec<Partition>>,
    pub controllers: Option<Vec<Address>>,
    pub documents: Option<Vec<DocumentRecord>>,
}

impl EnhancedErc1400Config {
    pub fn is_institutional_grade(&self) -> bool {
        self.institutional
            .as_ref()
            .is_some_and(|i| i.institutional_grade)
    }
}

pub fn map(form: &Erc1400Form) -> MappingResult<EnhancedErc1400Config> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let (name, symbol) = check_name_symbol(&form.name, &form.symbol, &mut errors);
    let decimals = check_decimals(form.decimals, &mut errors);
    let initial_supply = parse_amount(form.initial_supply.as_deref(), "initial_supply", &mut errors);
    if !errors.is_empty() {
        return MappingResult::failure(errors);
    }

    let base = Erc1400BaseConfig {
        name,
        symbol,
        decimals,
        initial_supply,
        owner: super::parse_optional_address(form.owner.as_deref(), "owner", &mut warnings),
        is_controllable: form.is_controllable.unwrap_or(false),
        is_issuable: form.is_issuable.unwrap_or(false),
    };

    let compliance = extract_compliance(form);
    let institutional = extract_institutional(form);
    let corporate_actions = form
        .corporate_actions_enabled
        .unwrap_or(false)
        .then_some(CorporateActionsConfig { enabled: true });
    let partitions = extract_partitions(form, &mut warnings);
    let controllers = extract_controllers(form, &mut warnings);
    let documents = extract_documents(form, &mut warnings);

    let mut profile = ComplexityProfile::new(&SCORING);
    if compliance.is_some() {
        profile.feature("compliance controls", WEIGHT_COMPLIANCE);
    }
    if institutional.is_some() {
        profile.feature("institutional grade", WEIGHT_INSTITUTIONAL);
    }
    if corporate_actions.is_some() {
        profile.feature("corporate actions", WEIGHT_CORPORATE_ACTIONS);
    }
    profile.records(
        "partitions",
        partitions.as_deref().map_or(0, <[Partition]>::len),
        &PARTITIONS,
    );
    profile.records(
        "controllers",
        controllers.as_deref().map_or(0, <[Address]>::len),
        &CONTROLLERS,
    );
    profile.records(
        "documents",
        documents.as_deref().map_or(0, <[DocumentRecord]>::len),
        &DOCUMENTS,
    );
    let complexity = profile.finish();

    MappingResult {
        success: true,
        config: Some(EnhancedErc1400Config {
            base,
            compliance,
            institutional,
            corporate_actions,
            partitions,
            controllers,
            documents,
        }),
        errors: Vec::new(),
        warnings,
        complexity,
    }
}

fn compliance_governing_inputs_present(form: &Erc1400Form) -> bool {
    form.kyc_enabled.unwrap_or(false)
        || form.whitelist_enabled.unwrap_or(false)
        || form.accredited_investor_only.unwrap_or(false)
        || form.investor_accreditation.unwrap_or(false)
        || form.jurisdiction.as_deref().is_some_and(|j| !j.is_empty())
        || form.cross_border_enabled.unwrap_or(false)
        || form.max_investor_count.is_some()
        || form.forced_transfers_enabled.unwrap_or(false)
}

fn extract_compliance(form: &Erc1400Form) -> Option<ComplianceConfig> {
    if !compliance_governing_inputs_present(form) {
        return None;
    }
    Some(ComplianceConfig {
        kyc_enabled: form.kyc_enabled.unwrap_or(false),
        whitelist_enabled: form.whitelist_enabled.unwrap_or(false),
        accredited_investor_only: form.accredited_investor_only.unwrap_or(false),
        investor_accreditation: form.investor_accreditation.unwrap_or(false),
        jurisdiction: form.jurisdiction.clone().unwrap_or_default(),
        cross_border_enabled: form.cross_border_enabled.unwrap_or(false),
        max_investor_count: form.max_investor_count.unwrap_or(0),
        forced_transfers_enabled: form.forced_transfers_enabled.unwrap_or(false),
    })
}

fn extract_institutional(form: &Erc1400Form) -> Option<InstitutionalConfig> {
    let any = form.institutional_grade.unwrap_or(false)
        || form.custody_integration.unwrap_or(false)
        || form.settlement_integration.unwrap_or(false);
    any.then(|| InstitutionalConfig {
        institutional_grade: form.institutional_grade.unwrap_or(false),
        custody_integration: form.custody_integration.unwrap_or(false),
        settlement_integration: form.settlement_integration.unwrap_or(false),
    })
}

fn extract_partitions(form: &Erc1400Form, warnings: &mut Vec<String>) -> Option<Vec<Partition>> {
    if form.partitions.is_empty() {
        return None;
    }
    let partitions = form
        .partitions
        .iter()
        .map(|input| {
            let mut parse_errors = Vec::new();
            let amount = parse_amount(input.amount.as_deref(), "partition amount", &mut parse_errors);
            warnings.extend(parse_errors);
            Partition {
                name: input.name.clone().unwrap_or_default(),
                amount,
                transferable: input.transferable.unwrap_or(true),
            }
        })
        .collect();
    Some(partitions)
}

fn extract_controllers(form: &Erc1400Form, warnings: &mut Vec<String>) -> Option<Vec<Address>> {
    if form.controllers.is_empty() {
        return None;
    }
    let controllers = form
        .controllers
        .iter()
        .filter_map(|raw| match raw.trim().parse::<Address>() {
            Ok(address) => Some(address),
            Err(_) => {
                warnings.push(format!("controller is not a valid address: {raw}"));
                None
            }
        })
        .collect::<Vec<_>>();
    (!controllers.is_empty()).then_some(controllers)
}

fn extract_documents(form: &Erc1400Form, warnings: &mut Vec<String>) -> Option<Vec<DocumentRecord>> {
    if form.documents.is_empty() {
        return None;
    }
    let documents = form
        .documents
        .iter()
        .map(|input| {
            if input.content_hash.is_none() {
                warnings.push(format!(
                    "document {} has no content hash",
                    input.name.as_deref().unwrap_or("<unnamed>")
                ));
            }
            DocumentRecord {
                name: input.name.clone().unwrap_or_default(),
                uri: input.uri.clone().unwrap_or_default(),
                content_hash: input.content_hash.clone().unwrap_or_default(),
            }
        })
        .collect();
    Some(documents)
}

impl TokenConfig for EnhancedErc1400Config {
    fn standard(&self) -> TokenStandard {
        TokenStandard::Erc1400
    }

    fn foundry_config(&self) -> FoundryTokenConfig {
        FoundryTokenConfig::Erc1400 {
            name: self.base.name.clone(),
            symbol: self.base.symbol.clone(),
            decimals: self.base.decimals,
            initial_supply: self.base.initial_supply,
            default_partitions: self
                .partitions
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|p| p.name.clone())
                .collect(),
            owner: self.base.owner,
            is_controllable: self.base.is_controllable,
            is_issuable: self.base.is_issuable,
        }
    }

    fn modules(&self) -> Vec<ModuleKind> {
        let mut modules = Vec::new();
        if self.compliance.is_some() || self.institutional.is_some() {
            modules.push(ModuleKind::Compliance);
        }
        if self.corporate_actions.is_some() {
            modules.push(ModuleKind::PolicyEngine);
        }
        modules
    }

    fn chunks(&self) -> Vec<ConfigChunk> {
        let mut chunks = Vec::new();
        if let Some(partitions) = &self.partitions {
            chunks.extend(chunk_records("partitions", partitions, PARTITIONS.chunk_size));
        }
        if let Some(controllers) = &self.controllers {
            chunks.extend(chunk_records("controllers", controllers, CONTROLLERS.chunk_size));
        }
        if let Some(documents) = &self.documents {
            chunks.extend(chunk_records("documents", documents, DOCUMENTS.chunk_size));
        }
        chunks
    }

    fn validate_configuration(&self) -> DeploymentValidation {
        let mut errors = Vec::new();
        if let Some(compliance) = &self.compliance {
            if compliance.accredited_investor_only && !compliance.investor_accreditation {
                errors.push(
                    "accredited-investor-only requires investor accreditation to be enabled"
                        .to_owned(),
                );
            }
            if compliance.max_investor_count > 0 {
                // A max-investor rule needs a whitelist to count against.
                if !compliance.whitelist_enabled {
                    errors.push(
                        "max_investor_count requires the whitelist to be enabled".to_owned(),
                    );
                }
            }
        }
        if self.base.is_controllable && self.controllers.is_none() {
            errors.push("controllable token has no controllers configured".to_owned());
        }
        if !self.base.is_controllable && self.controllers.is_some() {
            errors.push("controllers configured but the token is not controllable".to_owned());
        }
        if let Some(partitions) = &self.partitions {
            let mut seen = std::collections::HashSet::new();
            for partition in partitions {
                if partition.name.is_empty() {
                    errors.push("partition with an empty name".to_owned());
                } else if !seen.insert(partition.name.as_str()) {
                    errors.push(format!("duplicate partition name: {}", partition.name));
                }
            }
            let total: U256 = partitions.iter().map(|p| p.amount).fold(U256::ZERO, |a, b| a.saturating_add(b));
            if self.base.initial_supply != U256::ZERO && total > self.base.initial_supply {
                errors.push("partition amounts exceed the initial supply".to_owned());
            }
        }
        if let Some(institutional) = &self.institutional {
            if institutional.settlement_integration && !institutional.custody_integration {
                errors.push(
                    "settlement integration requires custody integration".to_owned(),
                );
            }
        }
        DeploymentValidation::from_errors(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::PartitionInput;
    use crate::strategy::DeploymentStrategy;

    fn minimal_form() -> Erc1400Form {
        Erc1400Form {
            name: Some("Security".to_owned()),
            symbol: Some("SEC".to_owned()),
            decimals: Some(18),
            ..Erc1400Form::default()
        }
    }

    fn partitions(count: usize) -> Vec<PartitionInput> {
        (0..count)
            .map(|i| PartitionInput {
                name: Some(format!("tranche-{i}")),
                amount: Some("100".to_owned()),
                transferable: Some(true),
            })
            .collect()
    }

    #[test]
    fn minimal_form_has_no_compliance_section() {
        let result = map(&minimal_form());
        assert!(result.success);
        let config = result.config.unwrap();
        assert!(config.compliance.is_none());
        assert!(config.institutional.is_none());
        assert!(config.partitions.is_none());
    }

    #[test]
    fn any_compliance_input_materializes_the_full_section() {
        let result = map(&Erc1400Form {
            jurisdiction: Some("US".to_owned()),
            ..minimal_form()
        });
        let compliance = result.config.unwrap().compliance.unwrap();
        assert_eq!(compliance.jurisdiction, "US");
        assert!(!compliance.kyc_enabled, "absent fields are defaulted");
        assert!(!compliance.whitelist_enabled);
        assert_eq!(compliance.max_investor_count, 0);
    }

    #[test]
    fn eleven_partitions_force_chunking() {
        let result = map(&Erc1400Form {
            partitions: partitions(11),
            ..minimal_form()
        });
        assert!(result.complexity.requires_chunking);
        assert_eq!(
            result.complexity.recommended_strategy,
            DeploymentStrategy::Chunked
        );
    }

    #[test]
    fn six_controllers_force_chunking() {
        let controllers: Vec<String> = (0..6)
            .map(|i| format!("0x{:040x}", i + 1))
            .collect();
        let result = map(&Erc1400Form {
            is_controllable: Some(true),
            controllers,
            ..minimal_form()
        });
        assert!(result.complexity.requires_chunking);
    }

    #[test]
    fn invalid_controller_is_dropped_with_warning() {
        let result = map(&Erc1400Form {
            is_controllable: Some(true),
            controllers: vec!["not-an-address".to_owned()],
            ..minimal_form()
        });
        assert!(result.success);
        assert!(result.config.unwrap().controllers.is_none());
        assert!(result.warnings.iter().any(|w| w.contains("controller")));
    }

    #[test]
    fn accredited_only_without_accreditation_blocks_deployment() {
        let result = map(&Erc1400Form {
            accredited_investor_only: Some(true),
            ..minimal_form()
        });
        let validation = result.config.unwrap().validate_configuration();
        assert!(!validation.is_valid);
        assert!(validation
            .errors
            .iter()
            .any(|e| e.contains("accredited-investor-only")));
    }

    #[test]
    fn controllable_without_controllers_blocks_deployment() {
        let result = map(&Erc1400Form {
            is_controllable: Some(true),
            ..minimal_form()
        });
        let validation = result.config.unwrap().validate_configuration();
        assert!(!validation.is_valid);
    }

    #[test]
    fn partition_amounts_above_supply_block_deployment() {
        let result = map(&Erc1400Form {
            initial_supply: Some("150".to_owned()),
            partitions: partitions(2), // 2 x 100 > 150
            ..minimal_form()
        });
        let validation = result.config.unwrap().validate_configuration();
        assert!(!validation.is_valid);
    }

    #[test]
    fn duplicate_partition_names_block_deployment() {
        let mut inputs = partitions(2);
        inputs[1].name = Some("tranche-0".to_owned());
        let result = map(&Erc1400Form {
            partitions: inputs,
            ..minimal_form()
        });
        let validation = result.config.unwrap().validate_configuration();
        assert!(!validation.is_valid);
    }

    #[test]
    fn institutional_section_flags_grade() {
        let result = map(&Erc1400Form {
            institutional_grade: Some(true),
            custody_integration: Some(true),
            ..minimal_form()
        });
        let config = result.config.unwrap();
        assert!(config.is_institutional_grade());
    }

    #[test]
    fn default_partitions_feed_the_initializer() {
        let result = map(&Erc1400Form {
            partitions: partitions(3),
            ..minimal_form()
        });
        let FoundryTokenConfig::Erc1400 {
            default_partitions, ..
        } = result.config.unwrap().foundry_config()
        else {
            panic!("expected erc-1400 foundry config");
        };
        assert_eq!(default_partitions, vec!["tranche-0", "tranche-1", "tranche-2"]);
    }
}
