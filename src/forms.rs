//! Typed per-standard token form input.
//!
//! The UI layer submits one JSON document per token draft. Instead of a
//! loosely-typed field bag, the boundary is a closed tagged enum: one
//! variant per standard, every optional field an `Option` or an
//! empty-defaulted `Vec`. Unknown JSON fields are ignored on deserialize;
//! defaulting to the mapper's literal defaults happens in the mappers, not
//! here.

use serde::{Deserialize, Serialize};

use crate::standard::TokenStandard;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "standard", rename_all = "kebab-case")]
pub enum TokenForm {
    #[serde(rename = "erc-20", alias = "erc20")]
    Erc20(Erc20Form),
    #[serde(rename = "erc-721", alias = "erc721")]
    Erc721(Erc721Form),
    #[serde(rename = "erc-1155", alias = "erc1155")]
    Erc1155(Erc1155Form),
    #[serde(rename = "erc-1400", alias = "erc1400")]
    Erc1400(Erc1400Form),
    #[serde(rename = "erc-3525", alias = "erc3525")]
    Erc3525(Erc3525Form),
    #[serde(rename = "erc-4626", alias = "erc4626")]
    Erc4626(Erc4626Form),
}

impl TokenForm {
    pub const fn standard(&self) -> TokenStandard {
        match self {
            Self::Erc20(_) => TokenStandard::Erc20,
            Self::Erc721(_) => TokenStandard::Erc721,
            Self::Erc1155(_) => TokenStandard::Erc1155,
            Self::Erc1400(_) => TokenStandard::Erc1400,
            Self::Erc3525(_) => TokenStandard::Erc3525,
            Self::Erc4626(_) => TokenStandard::Erc4626,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Erc20Form {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub initial_supply: Option<String>,
    pub max_supply: Option<String>,
    pub owner: Option<String>,
    pub is_mintable: Option<bool>,
    pub is_burnable: Option<bool>,
    pub is_pausable: Option<bool>,
    pub permit_enabled: Option<bool>,

    pub fee_on_transfer: Option<bool>,
    pub fee_percentage: Option<f64>,
    pub fee_recipient: Option<String>,

    pub rebasing_enabled: Option<bool>,
    pub rebasing_mode: Option<String>,
    pub target_supply: Option<String>,

    pub governance_enabled: Option<bool>,
    pub quorum_percentage: Option<f64>,
    pub proposal_threshold: Option<String>,
    pub voting_delay_blocks: Option<u32>,
    pub voting_period_blocks: Option<u32>,
    pub timelock_delay_seconds: Option<u32>,

    pub anti_whale_enabled: Option<bool>,
    pub max_wallet_amount: Option<String>,
    pub transfer_cooldown_seconds: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Erc721Form {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub base_uri: Option<String>,
    pub max_supply: Option<u64>,
    pub owner: Option<String>,
    pub is_mintable: Option<bool>,
    pub is_burnable: Option<bool>,
    pub is_pausable: Option<bool>,

    pub royalty_enabled: Option<bool>,
    pub royalty_percentage: Option<f64>,
    pub royalty_receiver: Option<String>,

    pub reveal_enabled: Option<bool>,
    pub pre_reveal_uri: Option<String>,

    pub mint_phases: Vec<MintPhaseInput>,
    pub attributes: Vec<AttributeInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MintPhaseInput {
    pub name: Option<String>,
    pub price_wei: Option<String>,
    pub max_per_wallet: Option<u32>,
    pub starts_at: Option<String>,
    pub allowlist_only: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeInput {
    pub trait_type: Option<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Erc1155Form {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub base_uri: Option<String>,
    pub owner: Option<String>,
    pub is_pausable: Option<bool>,
    pub batch_minting_enabled: Option<bool>,
    pub supply_tracking: Option<bool>,

    pub royalty_enabled: Option<bool>,
    pub royalty_percentage: Option<f64>,
    pub royalty_receiver: Option<String>,

    pub container_enabled: Option<bool>,

    pub token_types: Vec<TokenTypeInput>,
    pub uri_mappings: Vec<UriMappingInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenTypeInput {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub max_supply: Option<String>,
    pub fungible: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UriMappingInput {
    pub token_type_id: Option<u64>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Erc1400Form {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub initial_supply: Option<String>,
    pub owner: Option<String>,
    pub is_controllable: Option<bool>,
    pub is_issuable: Option<bool>,

    pub kyc_enabled: Option<bool>,
    pub whitelist_enabled: Option<bool>,
    pub accredited_investor_only: Option<bool>,
    pub investor_accreditation: Option<bool>,
    pub jurisdiction: Option<String>,
    pub cross_border_enabled: Option<bool>,
    pub max_investor_count: Option<u32>,

    pub institutional_grade: Option<bool>,
    pub custody_integration: Option<bool>,
    pub settlement_integration: Option<bool>,

    pub corporate_actions_enabled: Option<bool>,
    pub forced_transfers_enabled: Option<bool>,

    pub partitions: Vec<PartitionInput>,
    pub controllers: Vec<String>,
    pub documents: Vec<DocumentInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionInput {
    pub name: Option<String>,
    pub amount: Option<String>,
    pub transferable: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInput {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Erc3525Form {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub value_decimals: Option<u8>,
    pub owner: Option<String>,
    pub is_mintable: Option<bool>,
    pub is_burnable: Option<bool>,
    pub slot_approvable: Option<bool>,

    pub financial_instrument_type: Option<String>,
    pub principal_amount: Option<String>,
    pub maturity_date: Option<String>,
    pub interest_rate_percentage: Option<f64>,

    pub derivative_enabled: Option<bool>,
    pub underlying_asset: Option<String>,

    pub institutional_grade: Option<bool>,

    pub slots: Vec<SlotInput>,
    pub allocations: Vec<AllocationInput>,
    pub payment_schedules: Vec<PaymentScheduleInput>,
    pub value_adjustments: Vec<ValueAdjustmentInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotInput {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub value_units: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationInput {
    pub slot_id: Option<u64>,
    pub holder: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentScheduleInput {
    pub due_date: Option<String>,
    pub amount: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueAdjustmentInput {
    pub effective_date: Option<String>,
    pub factor: Option<f64>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Erc4626Form {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub asset_address: Option<String>,
    pub asset_decimals: Option<u8>,
    pub owner: Option<String>,

    pub deposit_fee_percentage: Option<f64>,
    pub withdrawal_fee_percentage: Option<f64>,
    pub management_fee_percentage: Option<f64>,
    pub performance_fee_percentage: Option<f64>,
    pub fee_recipient: Option<String>,

    pub deposit_limit: Option<String>,
    pub min_deposit: Option<String>,

    pub yield_strategy_protocol: Option<String>,
    pub rebalancing_enabled: Option<bool>,
    pub auto_compound: Option<bool>,

    pub vault_strategies: Vec<VaultStrategyInput>,
    pub asset_allocations: Vec<AssetAllocationInput>,
    pub performance_metrics: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultStrategyInput {
    pub name: Option<String>,
    pub protocol: Option<String>,
    pub allocation_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetAllocationInput {
    pub asset: Option<String>,
    pub percentage: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_json_selects_the_standard() {
        let form: TokenForm = serde_json::from_str(
            r#"{"standard": "erc-20", "name": "Test", "symbol": "TST", "decimals": 18}"#,
        )
        .unwrap();
        assert_eq!(form.standard(), TokenStandard::Erc20);
        let TokenForm::Erc20(erc20) = form else {
            panic!("expected erc-20 variant");
        };
        assert_eq!(erc20.name.as_deref(), Some("Test"));
        assert_eq!(erc20.decimals, Some(18));
    }

    #[test]
    fn compact_tag_alias_is_accepted() {
        let form: TokenForm =
            serde_json::from_str(r#"{"standard": "erc3525", "name": "Bond"}"#).unwrap();
        assert_eq!(form.standard(), TokenStandard::Erc3525);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let form: TokenForm = serde_json::from_str(
            r#"{"standard": "erc-721", "name": "Art", "ui_wizard_step": 3}"#,
        )
        .unwrap();
        assert_eq!(form.standard(), TokenStandard::Erc721);
    }

    #[test]
    fn related_records_default_to_empty() {
        let form: TokenForm =
            serde_json::from_str(r#"{"standard": "erc-1400", "name": "Sec"}"#).unwrap();
        let TokenForm::Erc1400(sec) = form else {
            panic!("expected erc-1400 variant");
        };
        assert!(sec.partitions.is_empty());
        assert!(sec.controllers.is_empty());
        assert!(sec.documents.is_empty());
    }
}
