//! Semi-fungible token (ERC-3525) configuration mapper.

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::complexity::{ArrayRule, ComplexityProfile, ScoringTable};
use crate::foundry::params::{ConfigChunk, FoundryTokenConfig, ModuleKind};
use crate::forms::Erc3525Form;
use crate::mapper::{
    check_decimals, check_name_symbol, chunk_records, parse_amount, parse_optional_address,
    require_percentage, warn_percentage, DeploymentValidation, MappingResult, TokenConfig,
};
use crate::standard::TokenStandard;

pub const SCORING: ScoringTable = ScoringTable {
    base: 15,
    low_below: 35,
    medium_below: 75,
    high_below: 130,
};

const WEIGHT_FINANCIAL_INSTRUMENT: u32 = 15;
const WEIGHT_DERIVATIVE: u32 = 18;
const WEIGHT_INSTITUTIONAL: u32 = 25;

pub const SLOTS: ArrayRule = ArrayRule {
    per_item: 3,
    cap: 30,
    ceiling: 10,
    chunk_size: 5,
};

pub const ALLOCATIONS: ArrayRule = ArrayRule {
    per_item: 2,
    cap: 30,
    ceiling: 20,
    chunk_size: 10,
};

pub const PAYMENT_SCHEDULES: ArrayRule = ArrayRule {
    per_item: 4,
    cap: 20,
    ceiling: 5,
    chunk_size: 5,
};

pub const VALUE_ADJUSTMENTS: ArrayRule = ArrayRule {
    per_item: 2,
    cap: 16,
    ceiling: 15,
    chunk_size: 10,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Erc3525BaseConfig {
    pub name: String,
    pub symbol: String,
    pub value_decimals: u8,
    pub owner: Option<Address>,
    pub is_mintable: bool,
    pub is_burnable: bool,
    pub slot_approvable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialInstrumentConfig {
    pub instrument_type: String,
    pub principal_amount: U256,
    pub maturity_date: String,
    pub interest_rate_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivativeConfig {
    pub underlying_asset: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstitutionalConfig {
    pub institutional_grade: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotDefinition {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub value_units: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub slot_id: u64,
    pub holder: Option<Address>,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSchedule {
    pub due_date: String,
    pub amount: U256,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueAdjustment {
    pub effective_date: String,
    pub factor: f64,
    pub reason: String,
}

/// Post-deployment slot/allocation state lives under one umbrella so the
/// orchestrator can snapshot it alongside the base config.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedErc3525Config {
    pub base: Erc3525BaseConfig,
    pub financial_instrument: Option<FinancialInstrumentConfig>,
    pub derivative: Option<DerivativeConfig>,
    pub institutional: Option<InstitutionalConfig>,
    pub slots: Option<Vec<SlotDefinition>>,
    pub allocations: Option<Vec<Allocation>>,
    pub payment_schedules: Option<Vec<PaymentSchedule>>,
    pub value_adjustments: Option<Vec<ValueAdjustment>>,
}

impl EnhancedErc3525Config {
    pub fn is_institutional_grade(&self) -> bool {
        self.institutional
            .as_ref()
            .is_some_and(|i| i.institutional_grade)
    }
}

pub fn map(form: &Erc3525Form) -> MappingResult<EnhancedErc3525Config> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let (name, symbol) = check_name_symbol(&form.name, &form.symbol, &mut errors);
    let value_decimals = check_decimals(form.value_decimals, &mut errors);
    if !errors.is_empty() {
        return MappingResult::failure(errors);
    }

    let base = Erc3525BaseConfig {
        name,
        symbol,
        value_decimals,
        owner: parse_optional_address(form.owner.as_deref(), "owner", &mut warnings),
        is_mintable: form.is_mintable.unwrap_or(false),
        is_burnable: form.is_burnable.unwrap_or(false),
        slot_approvable: form.slot_approvable.unwrap_or(false),
    };

    let financial_instrument = extract_financial_instrument(form, &mut warnings);
    let derivative = extract_derivative(form, &mut warnings);
    let institutional = form
        .institutional_grade
        .unwrap_or(false)
        .then_some(InstitutionalConfig {
            institutional_grade: true,
        });
    let slots = extract_slots(form);
    let allocations = extract_allocations(form, &mut warnings);
    let payment_schedules = extract_payment_schedules(form, &mut warnings);
    let value_adjustments = extract_value_adjustments(form);

    let mut profile = ComplexityProfile::new(&SCORING);
    if financial_instrument.is_some() {
        profile.feature("financial instrument terms", WEIGHT_FINANCIAL_INSTRUMENT);
    }
    if derivative.is_some() {
        profile.feature("derivative exposure", WEIGHT_DERIVATIVE);
    }
    if institutional.is_some() {
        profile.feature("institutional grade", WEIGHT_INSTITUTIONAL);
    }
    profile.records("slots", slots.as_deref().map_or(0, <[SlotDefinition]>::len), &SLOTS);
    profile.records(
        "allocations",
        allocations.as_deref().map_or(0, <[Allocation]>::len),
        &ALLOCATIONS,
    );
    profile.records(
        "payment schedules",
        payment_schedules.as_deref().map_or(0, <[PaymentSchedule]>::len),
        &PAYMENT_SCHEDULES,
    );
    profile.records(
        "value adjustments",
        value_adjustments.as_deref().map_or(0, <[ValueAdjustment]>::len),
        &VALUE_ADJUSTMENTS,
    );
    let complexity = profile.finish();

    MappingResult {
        success: true,
        config: Some(EnhancedErc3525Config {
            base,
            financial_instrument,
            derivative,
            institutional,
            slots,
            allocations,
            payment_schedules,
            value_adjustments,
        }),
        errors: Vec::new(),
        warnings,
        complexity,
    }
}

fn extract_financial_instrument(
    form: &Erc3525Form,
    warnings: &mut Vec<String>,
) -> Option<FinancialInstrumentConfig> {
    let instrument_type = form.financial_instrument_type.as_deref()?.trim();
    if instrument_type.is_empty() {
        return None;
    }
    let mut parse_errors = Vec::new();
    let principal_amount = parse_amount(
        form.principal_amount.as_deref(),
        "principal_amount",
        &mut parse_errors,
    );
    warnings.extend(parse_errors);
    let interest_rate_percentage = form.interest_rate_percentage.unwrap_or(0.0);
    warn_percentage(interest_rate_percentage, "interest_rate_percentage", warnings);
    Some(FinancialInstrumentConfig {
        instrument_type: instrument_type.to_owned(),
        principal_amount,
        maturity_date: form.maturity_date.clone().unwrap_or_default(),
        interest_rate_percentage,
    })
}

fn extract_derivative(form: &Erc3525Form, warnings: &mut Vec<String>) -> Option<DerivativeConfig> {
    if !form.derivative_enabled.unwrap_or(false) {
        return None;
    }
    Some(DerivativeConfig {
        underlying_asset: parse_optional_address(
            form.underlying_asset.as_deref(),
            "underlying_asset",
            warnings,
        ),
    })
}

fn extract_slots(form: &Erc3525Form) -> Option<Vec<SlotDefinition>> {
    if form.slots.is_empty() {
        return None;
    }
    let slots = form
        .slots
        .iter()
        .enumerate()
        .map(|(index, input)| SlotDefinition {
            id: input.id.unwrap_or(index as u64 + 1),
            name: input.name.clone().unwrap_or_default(),
            description: input.description.clone().unwrap_or_default(),
            value_units: input.value_units.clone().unwrap_or_default(),
        })
        .collect();
    Some(slots)
}

fn extract_allocations(form: &Erc3525Form, warnings: &mut Vec<String>) -> Option<Vec<Allocation>> {
    if form.allocations.is_empty() {
        return None;
    }
    let allocations = form
        .allocations
        .iter()
        .map(|input| {
            let mut parse_errors = Vec::new();
            let value = parse_amount(input.value.as_deref(), "allocation value", &mut parse_errors);
            warnings.extend(parse_errors);
            Allocation {
                slot_id: input.slot_id.unwrap_or(0),
                holder: parse_optional_address(
                    input.holder.as_deref(),
                    "allocation holder",
                    warnings,
                ),
                value,
            }
        })
        .collect();
    Some(allocations)
}

fn extract_payment_schedules(
    form: &Erc3525Form,
    warnings: &mut Vec<String>,
) -> Option<Vec<PaymentSchedule>> {
    if form.payment_schedules.is_empty() {
        return None;
    }
    let schedules = form
        .payment_schedules
        .iter()
        .map(|input| {
            let mut parse_errors = Vec::new();
            let amount = parse_amount(input.amount.as_deref(), "payment amount", &mut parse_errors);
            warnings.extend(parse_errors);
            PaymentSchedule {
                due_date: input.due_date.clone().unwrap_or_default(),
                amount,
                kind: input.kind.clone().unwrap_or_else(|| "interest".to_owned()),
            }
        })
        .collect();
    Some(schedules)
}

fn extract_value_adjustments(form: &Erc3525Form) -> Option<Vec<ValueAdjustment>> {
    if form.value_adjustments.is_empty() {
        return None;
    }
    let adjustments = form
        .value_adjustments
        .iter()
        .map(|input| ValueAdjustment {
            effective_date: input.effective_date.clone().unwrap_or_default(),
            factor: input.factor.unwrap_or(1.0),
            reason: input.reason.clone().unwrap_or_default(),
        })
        .collect();
    Some(adjustments)
}

impl TokenConfig for EnhancedErc3525Config {
    fn standard(&self) -> TokenStandard {
        TokenStandard::Erc3525
    }

    fn foundry_config(&self) -> FoundryTokenConfig {
        FoundryTokenConfig::Erc3525 {
            name: self.base.name.clone(),
            symbol: self.base.symbol.clone(),
            value_decimals: self.base.value_decimals,
            owner: self.base.owner,
        }
    }

    fn modules(&self) -> Vec<ModuleKind> {
        let mut modules = Vec::new();
        if self.financial_instrument.is_some() || self.derivative.is_some() {
            modules.push(ModuleKind::PolicyEngine);
        }
        if self.payment_schedules.is_some() {
            modules.push(ModuleKind::Vesting);
        }
        if self.institutional.is_some() {
            modules.push(ModuleKind::Compliance);
        }
        modules
    }

    fn chunks(&self) -> Vec<ConfigChunk> {
        let mut chunks = Vec::new();
        if let Some(slots) = &self.slots {
            chunks.extend(chunk_records("slots", slots, SLOTS.chunk_size));
        }
        if let Some(allocations) = &self.allocations {
            chunks.extend(chunk_records("allocations", allocations, ALLOCATIONS.chunk_size));
        }
        if let Some(schedules) = &self.payment_schedules {
            chunks.extend(chunk_records(
                "payment-schedules",
                schedules,
                PAYMENT_SCHEDULES.chunk_size,
            ));
        }
        if let Some(adjustments) = &self.value_adjustments {
            chunks.extend(chunk_records(
                "value-adjustments",
                adjustments,
                VALUE_ADJUSTMENTS.chunk_size,
            ));
        }
        chunks
    }

    fn validate_configuration(&self) -> DeploymentValidation {
        let mut errors = Vec::new();
        if let Some(instrument) = &self.financial_instrument {
            require_percentage(
                instrument.interest_rate_percentage,
                "interest_rate_percentage",
                &mut errors,
            );
            if instrument.maturity_date.is_empty() {
                errors.push("financial instrument requires a maturity date".to_owned());
            }
        }
        if let Some(derivative) = &self.derivative {
            if derivative.underlying_asset.is_none() {
                errors.push("derivative requires an underlying asset address".to_owned());
            }
        }
        if let Some(allocations) = &self.allocations {
            let known: std::collections::HashSet<u64> = self
                .slots
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|s| s.id)
                .collect();
            for allocation in allocations {
                if !known.contains(&allocation.slot_id) {
                    errors.push(format!(
                        "allocation references unknown slot id {}",
                        allocation.slot_id
                    ));
                }
                if allocation.holder.is_none() {
                    errors.push(format!(
                        "allocation in slot {} is missing a holder address",
                        allocation.slot_id
                    ));
                }
            }
        }
        DeploymentValidation::from_errors(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complexity::ComplexityLevel;
    use crate::forms::{AllocationInput, PaymentScheduleInput, SlotInput};

    fn minimal_form() -> Erc3525Form {
        Erc3525Form {
            name: Some("Bond".to_owned()),
            symbol: Some("BND".to_owned()),
            value_decimals: Some(18),
            ..Erc3525Form::default()
        }
    }

    fn slots(count: usize) -> Vec<SlotInput> {
        (0..count)
            .map(|i| SlotInput {
                id: Some(i as u64 + 1),
                name: Some(format!("slot-{i}")),
                ..SlotInput::default()
            })
            .collect()
    }

    fn allocations(count: usize) -> Vec<AllocationInput> {
        (0..count)
            .map(|i| AllocationInput {
                slot_id: Some(1),
                holder: Some(format!("0x{:040x}", i + 1)),
                value: Some("100".to_owned()),
            })
            .collect()
    }

    #[test]
    fn minimal_form_is_low_complexity() {
        let result = map(&minimal_form());
        assert!(result.success);
        assert_eq!(result.complexity.level, ComplexityLevel::Low);
    }

    #[test]
    fn eleven_slots_force_chunking() {
        let result = map(&Erc3525Form {
            slots: slots(11),
            ..minimal_form()
        });
        assert!(result.complexity.requires_chunking);
    }

    #[test]
    fn twenty_one_allocations_force_chunking() {
        let result = map(&Erc3525Form {
            slots: slots(1),
            allocations: allocations(21),
            ..minimal_form()
        });
        assert!(result.complexity.requires_chunking);
    }

    #[test]
    fn six_payment_schedules_force_chunking() {
        let schedules: Vec<PaymentScheduleInput> = (0..6)
            .map(|i| PaymentScheduleInput {
                due_date: Some(format!("2026-0{}-01", i + 1)),
                amount: Some("50".to_owned()),
                kind: Some("coupon".to_owned()),
            })
            .collect();
        let result = map(&Erc3525Form {
            payment_schedules: schedules,
            ..minimal_form()
        });
        assert!(result.complexity.requires_chunking);
    }

    #[test]
    fn ten_slots_do_not_force_chunking_by_ceiling() {
        let result = map(&Erc3525Form {
            slots: slots(10),
            ..minimal_form()
        });
        // 10 slots stay under the ceiling; the score alone decides.
        assert!(!result
            .complexity
            .warnings
            .iter()
            .any(|w| w.contains("ceiling")));
    }

    #[test]
    fn allocation_against_unknown_slot_blocks_deployment() {
        let mut inputs = allocations(1);
        inputs[0].slot_id = Some(42);
        let result = map(&Erc3525Form {
            slots: slots(2),
            allocations: inputs,
            ..minimal_form()
        });
        let validation = result.config.unwrap().validate_configuration();
        assert!(!validation.is_valid);
        assert!(validation.errors.iter().any(|e| e.contains("unknown slot")));
    }

    #[test]
    fn derivative_without_underlying_blocks_deployment() {
        let result = map(&Erc3525Form {
            derivative_enabled: Some(true),
            ..minimal_form()
        });
        let validation = result.config.unwrap().validate_configuration();
        assert!(!validation.is_valid);
    }

    #[test]
    fn instrument_without_maturity_blocks_deployment() {
        let result = map(&Erc3525Form {
            financial_instrument_type: Some("bond".to_owned()),
            principal_amount: Some("1000000".to_owned()),
            ..minimal_form()
        });
        let validation = result.config.unwrap().validate_configuration();
        assert!(!validation.is_valid);
    }

    #[test]
    fn payment_schedules_imply_the_vesting_module() {
        let result = map(&Erc3525Form {
            payment_schedules: vec![PaymentScheduleInput {
                due_date: Some("2026-06-01".to_owned()),
                amount: Some("10".to_owned()),
                kind: None,
            }],
            ..minimal_form()
        });
        let modules = result.config.unwrap().modules();
        assert!(modules.contains(&ModuleKind::Vesting));
    }

    #[test]
    fn chunk_estimate_includes_every_array() {
        let result = map(&Erc3525Form {
            slots: slots(12),
            allocations: allocations(15),
            ..minimal_form()
        });
        // 12 slots / 5 = 3 chunks + 15 allocations / 10 = 2 chunks + base.
        assert_eq!(result.complexity.estimated_chunks, 6);
        let chunks = result.config.unwrap().chunks();
        assert_eq!(chunks.len(), 5);
    }
}
