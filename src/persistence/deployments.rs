//! Deployment records and the append-only history trail. Writes here are
//! best-effort from the orchestrator's point of view: a chain-confirmed
//! deployment is never failed retroactively because a row insert lost a
//! race with the database.

use alloy::primitives::{Address, B256};
use sqlx::SqlitePool;
use std::fmt;

use crate::chain::{Blockchain, NetworkEnvironment};
use crate::standard::TokenStandard;
use crate::strategy::DeploymentStrategy;

#[derive(Debug, Clone)]
pub struct DeploymentRecord {
    pub token_id: String,
    pub project_id: String,
    pub standard: TokenStandard,
    pub blockchain: Blockchain,
    pub environment: NetworkEnvironment,
    pub contract_address: Address,
    pub deployer_address: Address,
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub strategy: DeploymentStrategy,
    pub gas_used: Option<u64>,
    pub config_snapshot: serde_json::Value,
}

pub async fn insert_deployment(
    pool: &SqlitePool,
    record: &DeploymentRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO token_deployments
            (token_id, project_id, standard, blockchain, environment, contract_address,
             deployer_address, tx_hash, block_number, strategy, gas_used, config_snapshot)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )
    .bind(&record.token_id)
    .bind(&record.project_id)
    .bind(record.standard.as_str())
    .bind(record.blockchain.as_str())
    .bind(record.environment.as_str())
    .bind(record.contract_address.to_string())
    .bind(record.deployer_address.to_string())
    .bind(record.tx_hash.to_string())
    .bind(record.block_number.map(|n| n as i64))
    .bind(record.strategy.as_str())
    .bind(record.gas_used.map(|n| n as i64))
    .bind(record.config_snapshot.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStatus {
    Pending,
    Deploying,
    Success,
    Failed,
}

impl HistoryStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Deploying => "deploying",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub token_id: String,
    pub status: HistoryStatus,
    pub contract_address: Option<Address>,
    pub tx_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub blockchain: Blockchain,
    pub environment: NetworkEnvironment,
    pub detail: Option<String>,
}

pub async fn record_history(pool: &SqlitePool, entry: &HistoryEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO deployment_history
            (token_id, status, contract_address, tx_hash, block_number, blockchain, environment, detail)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&entry.token_id)
    .bind(entry.status.as_str())
    .bind(entry.contract_address.map(|a| a.to_string()))
    .bind(entry.tx_hash.map(|h| h.to_string()))
    .bind(entry.block_number.map(|n| n as i64))
    .bind(entry.blockchain.as_str())
    .bind(entry.environment.as_str())
    .bind(&entry.detail)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use alloy::primitives::{address, b256};

    fn sample_record() -> DeploymentRecord {
        DeploymentRecord {
            token_id: "tok-1".to_owned(),
            project_id: "proj-1".to_owned(),
            standard: TokenStandard::Erc721,
            blockchain: Blockchain::Base,
            environment: NetworkEnvironment::Testnet,
            contract_address: address!("0x1111111111111111111111111111111111111111"),
            deployer_address: address!("0x2222222222222222222222222222222222222222"),
            tx_hash: b256!("0x3333333333333333333333333333333333333333333333333333333333333333"),
            block_number: Some(42),
            strategy: DeploymentStrategy::Enhanced,
            gas_used: Some(2_100_000),
            config_snapshot: serde_json::json!({"name": "Test"}),
        }
    }

    #[tokio::test]
    async fn deployment_insert_persists_all_columns() {
        let pool = setup_test_db().await;
        insert_deployment(&pool, &sample_record()).await.unwrap();

        let (standard, strategy, gas_used): (String, String, Option<i64>) = sqlx::query_as(
            "SELECT standard, strategy, gas_used FROM token_deployments WHERE token_id = 'tok-1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(standard, "erc-721");
        assert_eq!(strategy, "enhanced");
        assert_eq!(gas_used, Some(2_100_000));
    }

    #[tokio::test]
    async fn history_entries_accumulate_in_order() {
        let pool = setup_test_db().await;
        for (status, detail) in [
            (HistoryStatus::Pending, None),
            (HistoryStatus::Deploying, None),
            (HistoryStatus::Failed, Some("insufficient balance".to_owned())),
        ] {
            record_history(
                &pool,
                &HistoryEntry {
                    token_id: "tok-1".to_owned(),
                    status,
                    contract_address: None,
                    tx_hash: None,
                    block_number: None,
                    blockchain: Blockchain::Ethereum,
                    environment: NetworkEnvironment::Mainnet,
                    detail,
                },
            )
            .await
            .unwrap();
        }

        let statuses: Vec<(String,)> = sqlx::query_as(
            "SELECT status FROM deployment_history WHERE token_id = 'tok-1' ORDER BY id",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let statuses: Vec<_> = statuses.into_iter().map(|(s,)| s).collect();
        assert_eq!(statuses, ["pending", "deploying", "failed"]);
    }
}
