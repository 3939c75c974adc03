use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Money, Wallet, WalletTransaction},
    traits::{WalletApiError, WalletManagement},
};

/// Read access to wallets, plus the account-management calls that do not move money.
#[derive(Clone)]
pub struct WalletApi<B> {
    db: B,
}

impl<B: Debug> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi ({:?})", self.db)
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> WalletApi<B>
where B: WalletManagement
{
    pub async fn wallet(&self, user_id: i64) -> Result<Wallet, WalletApiError> {
        self.db.fetch_wallet_for_user(user_id).await?.ok_or(WalletApiError::WalletNotFound(user_id))
    }

    /// The current balance of the user's wallet. Fails with [`WalletApiError::WalletNotFound`] if the user has no
    /// wallet.
    pub async fn balance(&self, user_id: i64) -> Result<Money, WalletApiError> {
        let wallet = self.wallet(user_id).await?;
        trace!("💰️ User {user_id} has a balance of {}", wallet.funds);
        Ok(wallet.funds)
    }

    pub async fn create_wallet(
        &self,
        user_id: i64,
        withdrawal_account: Option<String>,
    ) -> Result<Wallet, WalletApiError> {
        let wallet = self.db.create_wallet(user_id, withdrawal_account).await?;
        info!("💰️ Wallet #{} is ready for user {user_id}", wallet.id);
        Ok(wallet)
    }

    pub async fn set_withdrawal_account(
        &self,
        user_id: i64,
        account: Option<String>,
    ) -> Result<Wallet, WalletApiError> {
        self.db.set_withdrawal_account(user_id, account).await
    }

    /// The user's ledger, oldest entry first.
    pub async fn transactions(&self, user_id: i64) -> Result<Vec<WalletTransaction>, WalletApiError> {
        let wallet = self.wallet(user_id).await?;
        self.db.fetch_transactions(wallet.id).await
    }
}
