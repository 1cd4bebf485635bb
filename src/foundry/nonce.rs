//! Per-wallet nonce leasing. One deployment at a time may hold the nonce
//! for a (wallet, blockchain) pair; concurrent attempts fail fast instead
//! of racing each other into replaced transactions.

use alloy::primitives::Address;
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::chain::Blockchain;
use crate::error::NonceError;

#[async_trait]
pub trait NonceManager: Send + Sync {
    /// Record a lease for `nonce` on the (wallet, chain) pair. Fails with
    /// `AlreadyLeased` when another deployment holds the slot.
    async fn reserve(
        &self,
        wallet: Address,
        blockchain: Blockchain,
        nonce: u64,
    ) -> Result<(), NonceError>;

    /// The leased nonce was consumed by an accepted transaction.
    async fn confirm(&self, wallet: Address, blockchain: Blockchain) -> Result<(), NonceError>;

    /// The deployment failed before broadcasting; the nonce is free again.
    async fn release(&self, wallet: Address, blockchain: Blockchain) -> Result<(), NonceError>;
}

/// Scoped lease over a reserved nonce. Every reservation must end in
/// `confirm` or `release`; a lease dropped without either (early return,
/// panic unwind, timeout path) releases itself in the background so the
/// wallet never stays wedged until stale-lease cleanup.
pub struct NonceLease {
    manager: std::sync::Arc<dyn NonceManager>,
    wallet: Address,
    blockchain: Blockchain,
    nonce: u64,
    resolved: bool,
}

impl NonceLease {
    pub async fn reserve(
        manager: std::sync::Arc<dyn NonceManager>,
        wallet: Address,
        blockchain: Blockchain,
        nonce: u64,
    ) -> Result<Self, NonceError> {
        manager.reserve(wallet, blockchain, nonce).await?;
        Ok(Self {
            manager,
            wallet,
            blockchain,
            nonce,
            resolved: false,
        })
    }

    pub const fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The reserved nonce was consumed by an accepted transaction.
    pub async fn confirm(mut self) -> Result<(), NonceError> {
        self.resolved = true;
        self.manager.confirm(self.wallet, self.blockchain).await
    }

    /// No transaction consumed the nonce; free the slot immediately.
    pub async fn release(mut self) -> Result<(), NonceError> {
        self.resolved = true;
        self.manager.release(self.wallet, self.blockchain).await
    }
}

impl Drop for NonceLease {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        warn!(wallet = %self.wallet, blockchain = %self.blockchain, "nonce lease dropped unresolved");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let manager = std::sync::Arc::clone(&self.manager);
            let (wallet, blockchain) = (self.wallet, self.blockchain);
            handle.spawn(async move {
                if let Err(e) = manager.release(wallet, blockchain).await {
                    warn!(%wallet, %blockchain, error = %e, "background nonce release failed");
                }
            });
        }
    }
}

/// SQLite-backed lease table. Stale leases (an orchestrator that crashed
/// mid-deployment) are reclaimed on the next reserve attempt.
#[derive(Debug, Clone)]
pub struct SqliteNonceManager {
    pool: SqlitePool,
}

const LEASE_TIMEOUT_MINUTES: i32 = 5;

impl SqliteNonceManager {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn delete_lease(
        &self,
        wallet: Address,
        blockchain: Blockchain,
    ) -> Result<u64, NonceError> {
        let result =
            sqlx::query("DELETE FROM nonce_reservations WHERE wallet_address = ?1 AND blockchain = ?2")
                .bind(wallet.to_string())
                .bind(blockchain.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl NonceManager for SqliteNonceManager {
    async fn reserve(
        &self,
        wallet: Address,
        blockchain: Blockchain,
        nonce: u64,
    ) -> Result<(), NonceError> {
        let timeout_param = format!("-{LEASE_TIMEOUT_MINUTES} minutes");
        let cleanup = sqlx::query(
            "DELETE FROM nonce_reservations
             WHERE wallet_address = ?1 AND blockchain = ?2
               AND reserved_at < datetime('now', ?3)",
        )
        .bind(wallet.to_string())
        .bind(blockchain.as_str())
        .bind(&timeout_param)
        .execute(&self.pool)
        .await?;
        if cleanup.rows_affected() > 0 {
            warn!(
                %wallet, %blockchain,
                "reclaimed {} stale nonce lease(s) older than {LEASE_TIMEOUT_MINUTES} minutes",
                cleanup.rows_affected()
            );
        }

        let result = sqlx::query(
            "INSERT OR IGNORE INTO nonce_reservations (wallet_address, blockchain, nonce)
             VALUES (?1, ?2, ?3)",
        )
        .bind(wallet.to_string())
        .bind(blockchain.as_str())
        .bind(nonce as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NonceError::AlreadyLeased { wallet, blockchain });
        }
        info!(%wallet, %blockchain, nonce, "reserved deployment nonce");
        Ok(())
    }

    async fn confirm(&self, wallet: Address, blockchain: Blockchain) -> Result<(), NonceError> {
        if self.delete_lease(wallet, blockchain).await? > 0 {
            info!(%wallet, %blockchain, "confirmed nonce lease");
        }
        Ok(())
    }

    async fn release(&self, wallet: Address, blockchain: Blockchain) -> Result<(), NonceError> {
        if self.delete_lease(wallet, blockchain).await? > 0 {
            info!(%wallet, %blockchain, "released unused nonce lease");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use alloy::primitives::address;

    const WALLET: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");

    #[tokio::test]
    async fn reserve_then_conflict_then_release() {
        let pool = setup_test_db().await;
        let manager = SqliteNonceManager::new(pool);

        manager.reserve(WALLET, Blockchain::Base, 7).await.unwrap();

        let err = manager.reserve(WALLET, Blockchain::Base, 8).await.unwrap_err();
        assert!(matches!(err, NonceError::AlreadyLeased { blockchain: Blockchain::Base, .. }));

        manager.release(WALLET, Blockchain::Base).await.unwrap();
        manager.reserve(WALLET, Blockchain::Base, 8).await.unwrap();
    }

    #[tokio::test]
    async fn leases_are_per_chain() {
        let pool = setup_test_db().await;
        let manager = SqliteNonceManager::new(pool);

        manager.reserve(WALLET, Blockchain::Base, 1).await.unwrap();
        manager
            .reserve(WALLET, Blockchain::Polygon, 1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn confirm_frees_the_slot() {
        let pool = setup_test_db().await;
        let manager = SqliteNonceManager::new(pool.clone());

        manager.reserve(WALLET, Blockchain::Ethereum, 3).await.unwrap();
        manager.confirm(WALLET, Blockchain::Ethereum).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nonce_reservations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn stale_lease_is_reclaimed_on_reserve() {
        let pool = setup_test_db().await;
        let manager = SqliteNonceManager::new(pool.clone());

        manager.reserve(WALLET, Blockchain::Base, 5).await.unwrap();
        sqlx::query(
            "UPDATE nonce_reservations SET reserved_at = datetime('now', '-30 minutes')
             WHERE wallet_address = ?1",
        )
        .bind(WALLET.to_string())
        .execute(&pool)
        .await
        .unwrap();

        manager.reserve(WALLET, Blockchain::Base, 6).await.unwrap();
    }

    #[tokio::test]
    async fn dropped_lease_releases_itself() {
        let pool = setup_test_db().await;
        let manager: std::sync::Arc<dyn NonceManager> =
            std::sync::Arc::new(SqliteNonceManager::new(pool.clone()));

        let lease = NonceLease::reserve(std::sync::Arc::clone(&manager), WALLET, Blockchain::Base, 1)
            .await
            .unwrap();
        drop(lease);
        // Background release runs on the runtime; give it a tick.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nonce_reservations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn confirmed_lease_does_not_double_release() {
        let pool = setup_test_db().await;
        let manager: std::sync::Arc<dyn NonceManager> =
            std::sync::Arc::new(SqliteNonceManager::new(pool.clone()));

        let lease = NonceLease::reserve(std::sync::Arc::clone(&manager), WALLET, Blockchain::Base, 2)
            .await
            .unwrap();
        assert_eq!(lease.nonce(), 2);
        lease.confirm().await.unwrap();

        manager.reserve(WALLET, Blockchain::Base, 3).await.unwrap();
    }

    #[tokio::test]
    async fn fresh_lease_on_another_wallet_is_untouched() {
        let pool = setup_test_db().await;
        let manager = SqliteNonceManager::new(pool.clone());
        let other = address!("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

        manager.reserve(WALLET, Blockchain::Base, 1).await.unwrap();
        manager.reserve(other, Blockchain::Base, 9).await.unwrap();

        manager.release(WALLET, Blockchain::Base).await.unwrap();
        let err = manager.reserve(other, Blockchain::Base, 10).await.unwrap_err();
        assert!(matches!(err, NonceError::AlreadyLeased { .. }));
    }
}
