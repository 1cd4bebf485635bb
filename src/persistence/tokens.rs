//! Token draft storage. A token row carries the designer-facing form as
//! JSON; the mappers re-derive deployment configuration from it on demand.

use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;

use crate::chain::{Blockchain, NetworkEnvironment};
use crate::error::ServiceError;
use crate::forms::TokenForm;
use crate::standard::TokenStandard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Draft,
    Deploying,
    Deployed,
    Failed,
}

impl TokenStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Deploying => "deploying",
            Self::Deployed => "deployed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid token status: {0}")]
pub struct InvalidTokenStatusError(pub String);

impl FromStr for TokenStatus {
    type Err = InvalidTokenStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "deploying" => Ok(Self::Deploying),
            "deployed" => Ok(Self::Deployed),
            "failed" => Ok(Self::Failed),
            other => Err(InvalidTokenStatusError(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub id: String,
    pub project_id: String,
    pub standard: TokenStandard,
    pub name: String,
    pub symbol: String,
    pub blockchain: Blockchain,
    pub environment: NetworkEnvironment,
    pub form: TokenForm,
    pub status: TokenStatus,
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: String,
    project_id: String,
    standard: String,
    name: String,
    symbol: String,
    blockchain: String,
    environment: String,
    form_json: String,
    status: String,
}

impl TryFrom<TokenRow> for TokenRecord {
    type Error = ServiceError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        Ok(Self {
            standard: row.standard.parse()?,
            blockchain: row.blockchain.parse()?,
            environment: row
                .environment
                .parse()
                .map_err(|e: crate::chain::UnknownEnvironmentError| {
                    ServiceError::MalformedStoredField(e.to_string())
                })?,
            form: serde_json::from_str(&row.form_json)?,
            status: row
                .status
                .parse()
                .map_err(|e: InvalidTokenStatusError| {
                    ServiceError::MalformedStoredField(e.to_string())
                })?,
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            symbol: row.symbol,
        })
    }
}

pub async fn load_token(pool: &SqlitePool, token_id: &str) -> Result<TokenRecord, ServiceError> {
    let row = sqlx::query_as::<_, TokenRow>(
        "SELECT id, project_id, standard, name, symbol, blockchain, environment, form_json, status
         FROM tokens WHERE id = ?1",
    )
    .bind(token_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ServiceError::TokenNotFound {
        token_id: token_id.to_owned(),
    })?;

    row.try_into()
}

pub async fn update_token_status(
    pool: &SqlitePool,
    token_id: &str,
    status: TokenStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE tokens SET status = ?1 WHERE id = ?2")
        .bind(status.as_str())
        .bind(token_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{insert_test_token, setup_test_db};

    #[tokio::test]
    async fn load_round_trips_inserted_token() {
        let pool = setup_test_db().await;
        insert_test_token(&pool, "tok-1", "proj-1").await;

        let record = load_token(&pool, "tok-1").await.unwrap();
        assert_eq!(record.id, "tok-1");
        assert_eq!(record.project_id, "proj-1");
        assert_eq!(record.standard, TokenStandard::Erc20);
        assert_eq!(record.status, TokenStatus::Draft);
        assert_eq!(record.form.standard(), TokenStandard::Erc20);
    }

    #[tokio::test]
    async fn missing_token_is_a_typed_error() {
        let pool = setup_test_db().await;
        let err = load_token(&pool, "missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::TokenNotFound { token_id } if token_id == "missing"));
    }

    #[tokio::test]
    async fn status_update_is_visible_on_reload() {
        let pool = setup_test_db().await;
        insert_test_token(&pool, "tok-1", "proj-1").await;

        update_token_status(&pool, "tok-1", TokenStatus::Deployed)
            .await
            .unwrap();
        let record = load_token(&pool, "tok-1").await.unwrap();
        assert_eq!(record.status, TokenStatus::Deployed);
    }
}
