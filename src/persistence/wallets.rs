//! Project wallet storage. Exactly one of `private_key` / `vault_ref` is
//! populated per row; key resolution decides which path to take.

use alloy::primitives::Address;
use sqlx::SqlitePool;
use std::fmt;

use crate::chain::Blockchain;
use crate::error::KeyResolutionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalletType {
    #[default]
    Deployer,
    Treasury,
}

impl WalletType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deployer => "deployer",
            Self::Treasury => "treasury",
        }
    }
}

impl fmt::Display for WalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct WalletRecord {
    pub project_id: String,
    pub blockchain: Blockchain,
    pub address: Address,
    pub private_key: Option<String>,
    pub vault_ref: Option<String>,
    pub key_is_encrypted: bool,
}

#[derive(sqlx::FromRow)]
struct WalletRow {
    project_id: String,
    blockchain: String,
    address: String,
    private_key: Option<String>,
    vault_ref: Option<String>,
    key_is_encrypted: bool,
}

impl WalletRow {
    fn into_record(self) -> Result<WalletRecord, KeyResolutionError> {
        let address = self
            .address
            .parse()
            .map_err(|_| KeyResolutionError::MalformedStoredField(self.address.clone()))?;
        let blockchain = self
            .blockchain
            .parse()
            .map_err(|e: crate::chain::UnknownBlockchainError| {
                KeyResolutionError::MalformedStoredField(e.0)
            })?;
        Ok(WalletRecord {
            project_id: self.project_id,
            blockchain,
            address,
            private_key: self.private_key,
            vault_ref: self.vault_ref,
            key_is_encrypted: self.key_is_encrypted,
        })
    }
}

const WALLET_COLUMNS: &str =
    "project_id, blockchain, address, private_key, vault_ref, key_is_encrypted";

/// Default wallet for a (project, chain, type) triple. First row wins when
/// a project has configured duplicates.
pub async fn find_wallet(
    pool: &SqlitePool,
    project_id: &str,
    blockchain: Blockchain,
    wallet_type: WalletType,
) -> Result<WalletRecord, KeyResolutionError> {
    let row = sqlx::query_as::<_, WalletRow>(&format!(
        "SELECT {WALLET_COLUMNS} FROM project_wallets
         WHERE project_id = ?1 AND blockchain = ?2 AND wallet_type = ?3
         ORDER BY id LIMIT 1"
    ))
    .bind(project_id)
    .bind(blockchain.as_str())
    .bind(wallet_type.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| KeyResolutionError::WalletNotFound {
        project_id: project_id.to_owned(),
        blockchain,
        wallet_type: wallet_type.to_string(),
    })?;

    row.into_record()
}

/// Exact-address lookup, chain-agnostic: the same EOA address is valid on
/// every EVM chain, so callers may reuse a wallet row recorded under a
/// different blockchain.
pub async fn find_wallet_by_address(
    pool: &SqlitePool,
    project_id: &str,
    address: Address,
) -> Result<WalletRecord, KeyResolutionError> {
    let row = sqlx::query_as::<_, WalletRow>(&format!(
        "SELECT {WALLET_COLUMNS} FROM project_wallets
         WHERE project_id = ?1 AND address = ?2 COLLATE NOCASE
         ORDER BY id LIMIT 1"
    ))
    .bind(project_id)
    .bind(address.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or(KeyResolutionError::WalletByAddressNotFound {
        project_id: project_id.to_owned(),
        address,
    })?;

    row.into_record()
}

pub async fn insert_wallet(
    pool: &SqlitePool,
    record: &WalletRecord,
    wallet_type: WalletType,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO project_wallets
            (project_id, blockchain, wallet_type, address, private_key, vault_ref, key_is_encrypted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(&record.project_id)
    .bind(record.blockchain.as_str())
    .bind(wallet_type.as_str())
    .bind(record.address.to_string())
    .bind(&record.private_key)
    .bind(&record.vault_ref)
    .bind(record.key_is_encrypted)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_DEPLOYER_KEY, insert_test_wallet, setup_test_db};
    use alloy::primitives::address;

    #[tokio::test]
    async fn lookup_by_project_and_chain() {
        let pool = setup_test_db().await;
        let addr = insert_test_wallet(&pool, "proj-1", Blockchain::Base).await;

        let wallet = find_wallet(&pool, "proj-1", Blockchain::Base, WalletType::Deployer)
            .await
            .unwrap();
        assert_eq!(wallet.address, addr);
        assert_eq!(wallet.private_key.as_deref(), Some(TEST_DEPLOYER_KEY));
    }

    #[tokio::test]
    async fn missing_wallet_names_the_triple() {
        let pool = setup_test_db().await;
        let err = find_wallet(&pool, "proj-1", Blockchain::Polygon, WalletType::Deployer)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KeyResolutionError::WalletNotFound { blockchain: Blockchain::Polygon, .. }
        ));
    }

    #[tokio::test]
    async fn address_lookup_ignores_case_and_chain() {
        let pool = setup_test_db().await;
        let addr = insert_test_wallet(&pool, "proj-1", Blockchain::Ethereum).await;

        // Recorded under Ethereum, found when deploying to Base.
        let wallet = find_wallet_by_address(&pool, "proj-1", addr).await.unwrap();
        assert_eq!(wallet.blockchain, Blockchain::Ethereum);
        assert_eq!(wallet.address, addr);
    }

    #[tokio::test]
    async fn address_lookup_is_scoped_to_the_project() {
        let pool = setup_test_db().await;
        insert_test_wallet(&pool, "proj-1", Blockchain::Base).await;

        let err = find_wallet_by_address(
            &pool,
            "other-project",
            address!("0x1111111111111111111111111111111111111111"),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            KeyResolutionError::WalletByAddressNotFound { .. }
        ));
    }
}
