//! Deployment key resolution. Wallet rows either embed a private key
//! (plain or encrypted) or point at an external vault; both paths end in
//! a local signer the provider stack can use.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use crate::chain::Blockchain;
use crate::error::KeyResolutionError;
use crate::persistence::{WalletRecord, WalletType, find_wallet, find_wallet_by_address};

/// External key custody. `reveal` exchanges a vault reference for key
/// material; `decrypt` unwraps an encrypted in-row key.
#[async_trait]
pub trait KeyVault: Send + Sync {
    async fn reveal(&self, vault_ref: &str) -> Result<String, KeyResolutionError>;
    async fn decrypt(&self, ciphertext: &str) -> Result<String, KeyResolutionError>;
}

/// Stand-in for deployments that keep plain keys in the wallet table.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeyVault;

#[async_trait]
impl KeyVault for NoKeyVault {
    async fn reveal(&self, vault_ref: &str) -> Result<String, KeyResolutionError> {
        Err(KeyResolutionError::Vault {
            vault_ref: vault_ref.to_owned(),
            reason: "no key vault configured".to_owned(),
        })
    }

    async fn decrypt(&self, _ciphertext: &str) -> Result<String, KeyResolutionError> {
        Err(KeyResolutionError::Vault {
            vault_ref: String::new(),
            reason: "no key vault configured for encrypted keys".to_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub address: Address,
    pub signer: PrivateKeySigner,
}

pub struct KeyResolver<V> {
    pool: SqlitePool,
    vault: V,
}

impl<V: KeyVault> KeyResolver<V> {
    pub const fn new(pool: SqlitePool, vault: V) -> Self {
        Self { pool, vault }
    }

    /// Resolve the signing key for a deployment. `wallet_override` selects
    /// an exact wallet address; otherwise the project's default deployer
    /// wallet for the chain is used.
    pub async fn resolve(
        &self,
        project_id: &str,
        blockchain: Blockchain,
        wallet_override: Option<Address>,
    ) -> Result<ResolvedKey, KeyResolutionError> {
        let wallet = match wallet_override {
            Some(address) => find_wallet_by_address(&self.pool, project_id, address).await?,
            None => {
                find_wallet(&self.pool, project_id, blockchain, WalletType::Deployer).await?
            }
        };
        self.signer_for(wallet).await
    }

    async fn signer_for(&self, wallet: WalletRecord) -> Result<ResolvedKey, KeyResolutionError> {
        let raw_key = match (&wallet.private_key, &wallet.vault_ref) {
            (Some(key), _) if wallet.key_is_encrypted => self.vault.decrypt(key).await?,
            (Some(key), _) => key.clone(),
            (None, Some(vault_ref)) => self.vault.reveal(vault_ref).await?,
            (None, None) => {
                return Err(KeyResolutionError::MissingKeyMaterial {
                    address: wallet.address,
                });
            }
        };

        let signer: PrivateKeySigner =
            raw_key
                .parse()
                .map_err(|source| KeyResolutionError::InvalidPrivateKey {
                    address: wallet.address,
                    source,
                })?;

        if signer.address() != wallet.address {
            return Err(KeyResolutionError::MalformedStoredField(format!(
                "wallet row address {} does not match key address {}",
                wallet.address,
                signer.address()
            )));
        }

        debug!(address = %wallet.address, blockchain = %wallet.blockchain, "resolved deployment key");
        Ok(ResolvedKey {
            address: wallet.address,
            signer,
        })
    }
}
