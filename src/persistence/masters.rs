//! Registry of master implementation and factory addresses per
//! (blockchain, environment, standard).

use alloy::primitives::Address;
use sqlx::SqlitePool;

use crate::chain::{Blockchain, NetworkEnvironment};
use crate::error::DeploymentError;
use crate::standard::TokenStandard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterRecord {
    pub master_address: Address,
    /// `None` means no factory is registered on this network; the
    /// orchestrator falls back to direct deployment.
    pub factory_address: Option<Address>,
}

#[derive(sqlx::FromRow)]
struct MasterRow {
    master_address: String,
    factory_address: Option<String>,
}

pub async fn find_master(
    pool: &SqlitePool,
    blockchain: Blockchain,
    environment: NetworkEnvironment,
    standard: TokenStandard,
) -> Result<MasterRecord, DeploymentError> {
    let row = sqlx::query_as::<_, MasterRow>(
        "SELECT master_address, factory_address FROM contract_masters
         WHERE blockchain = ?1 AND environment = ?2 AND standard = ?3",
    )
    .bind(blockchain.as_str())
    .bind(environment.as_str())
    .bind(standard.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(DeploymentError::MissingMaster {
        blockchain,
        environment,
        standard,
    })?;

    let master_address = parse_address(&row.master_address)?;
    let factory_address = row
        .factory_address
        .as_deref()
        .map(parse_address)
        .transpose()?;

    Ok(MasterRecord {
        master_address,
        factory_address,
    })
}

fn parse_address(raw: &str) -> Result<Address, DeploymentError> {
    raw.parse()
        .map_err(|_| DeploymentError::MalformedStoredAddress(raw.to_owned()))
}

pub async fn upsert_master(
    pool: &SqlitePool,
    blockchain: Blockchain,
    environment: NetworkEnvironment,
    standard: TokenStandard,
    record: MasterRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO contract_masters (blockchain, environment, standard, master_address, factory_address)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (blockchain, environment, standard) DO UPDATE SET
            master_address = excluded.master_address,
            factory_address = excluded.factory_address",
    )
    .bind(blockchain.as_str())
    .bind(environment.as_str())
    .bind(standard.as_str())
    .bind(record.master_address.to_string())
    .bind(record.factory_address.map(|a| a.to_string()))
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use alloy::primitives::address;

    #[tokio::test]
    async fn upsert_then_find_round_trips() {
        let pool = setup_test_db().await;
        let record = MasterRecord {
            master_address: address!("0x1111111111111111111111111111111111111111"),
            factory_address: Some(address!("0x2222222222222222222222222222222222222222")),
        };
        upsert_master(
            &pool,
            Blockchain::Base,
            NetworkEnvironment::Testnet,
            TokenStandard::Erc20,
            record,
        )
        .await
        .unwrap();

        let found = find_master(
            &pool,
            Blockchain::Base,
            NetworkEnvironment::Testnet,
            TokenStandard::Erc20,
        )
        .await
        .unwrap();
        assert_eq!(found, record);
    }

    #[tokio::test]
    async fn second_upsert_replaces_the_first() {
        let pool = setup_test_db().await;
        let first = MasterRecord {
            master_address: address!("0x1111111111111111111111111111111111111111"),
            factory_address: None,
        };
        let second = MasterRecord {
            master_address: address!("0x3333333333333333333333333333333333333333"),
            factory_address: Some(address!("0x4444444444444444444444444444444444444444")),
        };
        for record in [first, second] {
            upsert_master(
                &pool,
                Blockchain::Polygon,
                NetworkEnvironment::Mainnet,
                TokenStandard::Erc1400,
                record,
            )
            .await
            .unwrap();
        }

        let found = find_master(
            &pool,
            Blockchain::Polygon,
            NetworkEnvironment::Mainnet,
            TokenStandard::Erc1400,
        )
        .await
        .unwrap();
        assert_eq!(found, second);
    }

    #[tokio::test]
    async fn missing_master_is_a_typed_error() {
        let pool = setup_test_db().await;
        let err = find_master(
            &pool,
            Blockchain::Avalanche,
            NetworkEnvironment::Mainnet,
            TokenStandard::Erc3525,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::MissingMaster {
                standard: TokenStandard::Erc3525,
                ..
            }
        ));
    }
}
