mod deployments;
mod masters;
mod tokens;
mod wallets;

pub use deployments::{
    DeploymentRecord, HistoryEntry, HistoryStatus, insert_deployment, record_history,
};
pub use masters::{MasterRecord, find_master, upsert_master};
pub use tokens::{
    InvalidTokenStatusError, TokenRecord, TokenStatus, load_token, update_token_status,
};
pub use wallets::{
    WalletRecord, WalletType, find_wallet, find_wallet_by_address, insert_wallet,
};
