use thiserror::Error;

use crate::db_types::{Money, Wallet, WalletTransaction};

/// The wallet ledger.
///
/// Every mutating call is a single atomic transaction: the balance change and the ledger row that records it are
/// committed together, or not at all.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// Creates the wallet for the given user. If the user already has a wallet, the existing wallet is returned and
    /// nothing is changed.
    async fn create_wallet(&self, user_id: i64, withdrawal_account: Option<String>)
        -> Result<Wallet, WalletApiError>;

    async fn fetch_wallet_for_user(&self, user_id: i64) -> Result<Option<Wallet>, WalletApiError>;

    /// Sets (or clears) the destination that withdrawals are paid out to.
    async fn set_withdrawal_account(&self, user_id: i64, account: Option<String>) -> Result<Wallet, WalletApiError>;

    /// Adds `amount` to the user's wallet and records a `Deposit`.
    async fn deposit(&self, user_id: i64, amount: Money) -> Result<WalletTransaction, WalletApiError>;

    /// Removes `amount` from the user's wallet and records a `Withdrawal`.
    ///
    /// Fails with [`WalletApiError::MissingDestination`] if the wallet has no withdrawal account, and with
    /// [`WalletApiError::InsufficientFunds`] if the balance is lower than `amount`. Nothing changes in either case.
    async fn withdraw(&self, user_id: i64, amount: Money) -> Result<WalletTransaction, WalletApiError>;

    /// Returns `amount` to the user's wallet and records a `Refund`.
    async fn refund(&self, user_id: i64, amount: Money) -> Result<WalletTransaction, WalletApiError>;

    /// The wallet's ledger, oldest entry first.
    async fn fetch_transactions(&self, wallet_id: i64) -> Result<Vec<WalletTransaction>, WalletApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum WalletApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User {0} does not have a wallet")]
    WalletNotFound(i64),
    #[error("Ledger amounts must be positive, got {0}")]
    InvalidAmount(Money),
    #[error("Insufficient funds. The wallet holds {available}, but {requested} was requested")]
    InsufficientFunds { available: Money, requested: Money },
    #[error("Wallet of user {0} has no withdrawal account")]
    MissingDestination(i64),
}

impl From<sqlx::Error> for WalletApiError {
    fn from(e: sqlx::Error) -> Self {
        WalletApiError::DatabaseError(e.to_string())
    }
}
