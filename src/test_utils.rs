//! Shared fixtures for database-backed tests.

use alloy::primitives::{Address, address};
use alloy::signers::local::PrivateKeySigner;
use sqlx::SqlitePool;

use crate::chain::Blockchain;
use crate::persistence::{WalletRecord, WalletType, insert_wallet};

/// Private key of the default test deployer wallet on Base.
pub const TEST_DEPLOYER_KEY: &str =
    "0000000000000000000000000000000000000000000000000000000000000001";

/// Address derived from [`TEST_DEPLOYER_KEY`].
pub const TEST_DEPLOYER_ADDRESS: Address =
    address!("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");

pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:")
        .await
        .expect("failed to open in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");
    pool
}

/// Distinct key per chain so cross-chain wallet tests see different
/// addresses. Base uses [`TEST_DEPLOYER_KEY`].
const fn test_key_for(blockchain: Blockchain) -> &'static str {
    match blockchain {
        Blockchain::Base => TEST_DEPLOYER_KEY,
        Blockchain::Ethereum => {
            "0000000000000000000000000000000000000000000000000000000000000002"
        }
        Blockchain::Polygon => {
            "0000000000000000000000000000000000000000000000000000000000000003"
        }
        Blockchain::Arbitrum => {
            "0000000000000000000000000000000000000000000000000000000000000004"
        }
        Blockchain::Optimism => {
            "0000000000000000000000000000000000000000000000000000000000000005"
        }
        Blockchain::Avalanche => {
            "0000000000000000000000000000000000000000000000000000000000000006"
        }
    }
}

/// Insert a deployer wallet with a plaintext test key and return its address.
pub async fn insert_test_wallet(
    pool: &SqlitePool,
    project_id: &str,
    blockchain: Blockchain,
) -> Address {
    let key = test_key_for(blockchain);
    let signer: PrivateKeySigner = key.parse().expect("test key is valid");
    let address = signer.address();

    insert_wallet(
        pool,
        &WalletRecord {
            project_id: project_id.to_owned(),
            blockchain,
            address,
            private_key: Some(key.to_owned()),
            vault_ref: None,
            key_is_encrypted: false,
        },
        WalletType::Deployer,
    )
    .await
    .expect("failed to insert test wallet");

    address
}

/// Insert a token draft row with an arbitrary form payload.
pub async fn insert_test_token_with_form(
    pool: &SqlitePool,
    token_id: &str,
    project_id: &str,
    standard: &str,
    form: &serde_json::Value,
) {
    let name = form
        .get("name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("Test");
    let symbol = form
        .get("symbol")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("TST");

    sqlx::query(
        "INSERT INTO tokens
            (id, project_id, standard, name, symbol, blockchain, environment, form_json, status)
         VALUES (?1, ?2, ?3, ?4, ?5, 'base', 'testnet', ?6, 'draft')",
    )
    .bind(token_id)
    .bind(project_id)
    .bind(standard)
    .bind(name)
    .bind(symbol)
    .bind(form.to_string())
    .execute(pool)
    .await
    .expect("failed to insert test token");
}

/// Insert a minimal fungible-token draft on Base testnet.
pub async fn insert_test_token(pool: &SqlitePool, token_id: &str, project_id: &str) {
    let form = serde_json::json!({
        "standard": "erc-20",
        "name": "Test",
        "symbol": "TST",
        "initial_supply": "1000"
    });
    insert_test_token_with_form(pool, token_id, project_id, "erc-20", &form).await;
}
