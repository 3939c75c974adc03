//! `SqliteDatabase` is a concrete implementation of a payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use sqlx::{migrate, migrate::MigrateError, SqlitePool};

use super::db::{db_url, new_pool, orders, participants, payments, reconcile, wallets};
use crate::{
    db_types::{
        GarbageOrder,
        Money,
        NewGarbageOrder,
        NewPaymentAttempt,
        OrderParticipant,
        OrderStatusType,
        PaymentAttempt,
        PaymentStatus,
        TransactionType,
        Wallet,
        WalletTransaction,
    },
    traits::{
        AcceptResult,
        OrderApiError,
        OrderManagement,
        OrderWithParticipants,
        PaymentCommit,
        PaymentGatewayDatabase,
        PaymentGatewayError,
        ReconcileResult,
        WalletApiError,
        WalletManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_payment_attempt(
        &self,
        attempt: NewPaymentAttempt,
    ) -> Result<(PaymentAttempt, bool), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        payments::idempotent_insert(attempt, &mut conn).await
    }

    async fn fetch_payment_attempt(&self, key: &str) -> Result<Option<PaymentAttempt>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_attempt(key, &mut conn).await
    }

    async fn complete_payment(&self, key: &str) -> Result<PaymentCommit, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let claimed = payments::settle_attempt(key, PaymentStatus::Completed, None, &mut tx).await?;
        let Some(attempt) = claimed else {
            let attempt = payments::fetch_attempt(key, &mut tx)
                .await?
                .ok_or_else(|| PaymentGatewayError::PaymentAttemptNotFound(key.to_string()))?;
            return match attempt.status {
                PaymentStatus::Completed => {
                    debug!("🗃️ Payment attempt [{key}] was already applied. Nothing to do");
                    Ok(PaymentCommit::Replayed(attempt))
                },
                PaymentStatus::Failed => Ok(PaymentCommit::PreviouslyFailed(attempt)),
                PaymentStatus::Pending => Err(PaymentGatewayError::DatabaseError(format!(
                    "Payment attempt {key} is pending, but could not be claimed"
                ))),
            };
        };
        let kind = TransactionType::from(attempt.method.kind());
        // A ledger refusal drops the transaction, which rolls back the claim as well
        let transaction = wallets::apply_ledger_entry(attempt.user_id, kind, attempt.amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment attempt [{key}] applied as ledger entry #{}", transaction.id);
        Ok(PaymentCommit::Applied { attempt, transaction })
    }

    async fn fail_payment_attempt(&self, key: &str, error_code: &str) -> Result<PaymentAttempt, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(attempt) = payments::settle_attempt(key, PaymentStatus::Failed, Some(error_code), &mut conn).await? {
            debug!("🗃️ Payment attempt [{key}] failed with {error_code}");
            return Ok(attempt);
        }
        payments::fetch_attempt(key, &mut conn)
            .await?
            .ok_or_else(|| PaymentGatewayError::PaymentAttemptNotFound(key.to_string()))
    }

    async fn reconcile_unpaid_orders(&self, unpaid_timeout: Duration) -> Result<ReconcileResult, PaymentGatewayError> {
        let cutoff = Utc::now() - unpaid_timeout;
        let mut tx = self.pool.begin().await?;
        let result = reconcile::reconcile_unpaid_orders(cutoff, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl WalletManagement for SqliteDatabase {
    async fn create_wallet(&self, user_id: i64, withdrawal_account: Option<String>) -> Result<Wallet, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let (wallet, _) = wallets::idempotent_insert(user_id, withdrawal_account, &mut conn).await?;
        Ok(wallet)
    }

    async fn fetch_wallet_for_user(&self, user_id: i64) -> Result<Option<Wallet>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        wallets::fetch_wallet_for_user(user_id, &mut conn).await
    }

    async fn set_withdrawal_account(&self, user_id: i64, account: Option<String>) -> Result<Wallet, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        wallets::update_withdrawal_account(user_id, account, &mut conn).await
    }

    async fn deposit(&self, user_id: i64, amount: Money) -> Result<WalletTransaction, WalletApiError> {
        self.apply_ledger_entry(user_id, TransactionType::Deposit, amount).await
    }

    async fn withdraw(&self, user_id: i64, amount: Money) -> Result<WalletTransaction, WalletApiError> {
        self.apply_ledger_entry(user_id, TransactionType::Withdrawal, amount).await
    }

    async fn refund(&self, user_id: i64, amount: Money) -> Result<WalletTransaction, WalletApiError> {
        self.apply_ledger_entry(user_id, TransactionType::Refund, amount).await
    }

    async fn fetch_transactions(&self, wallet_id: i64) -> Result<Vec<WalletTransaction>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        wallets::fetch_transactions(wallet_id, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(
        &self,
        order: NewGarbageOrder,
        cost: Money,
        shares: Vec<Money>,
    ) -> Result<OrderWithParticipants, OrderApiError> {
        if shares.len() != order.participants.len() {
            return Err(OrderApiError::InvalidShare(format!(
                "{} shares were given for {} participants",
                shares.len(),
                order.participants.len()
            )));
        }
        let shares = order.participants.iter().copied().zip(shares).collect::<Vec<_>>();
        let mut tx = self.pool.begin().await?;
        let stored = orders::insert_order(&order, cost, &mut tx).await?;
        let participants = participants::insert_participants(stored.id, &shares, &mut tx).await?;
        tx.commit().await?;
        Ok(OrderWithParticipants::new(stored, participants))
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<GarbageOrder>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn fetch_participants(&self, order_id: i64) -> Result<Vec<OrderParticipant>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        participants::fetch_participants(order_id, &mut conn).await
    }

    async fn mark_accepted(
        &self,
        order_id: i64,
        user_id: i64,
        share_amount: Option<Money>,
    ) -> Result<AcceptResult, OrderApiError> {
        if let Some(share) = share_amount.filter(|s| s.is_negative()) {
            return Err(OrderApiError::InvalidShare(format!("{share} is negative")));
        }
        let mut tx = self.pool.begin().await?;
        let accepted = participants::accept_payment(order_id, user_id, share_amount, &mut tx).await?;
        let Some(participant) = accepted else {
            // Nothing was written, so dropping the transaction is enough
            let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(OrderApiError::OrderNotFound(order_id))?;
            let participant = participants::fetch_participant(order_id, user_id, &mut tx)
                .await?
                .ok_or(OrderApiError::ParticipantNotFound { order_id, user_id })?;
            if participant.has_accepted_payment {
                debug!("🗃️ User {user_id} has already paid for order #{order_id}");
                return Ok(AcceptResult::AlreadyAccepted(participant));
            }
            return Err(OrderApiError::OrderNotPayable(order_id, order.status));
        };
        let transaction = if participant.share_amount.is_positive() {
            let entry = wallets::apply_ledger_entry(
                user_id,
                TransactionType::GarbageExpense,
                participant.share_amount,
                &mut tx,
            )
            .await?;
            Some(entry)
        } else {
            None
        };
        let outstanding = participants::count_unaccepted(order_id, &mut tx).await?;
        let moved = if outstanding == 0 {
            orders::transition_status(
                order_id,
                OrderStatusType::WaitingForPayment,
                OrderStatusType::WaitingForAccept,
                &mut tx,
            )
            .await?
        } else {
            None
        };
        let order = match moved {
            Some(order) => order,
            None => orders::fetch_order(order_id, &mut tx).await?.ok_or(OrderApiError::OrderNotFound(order_id))?,
        };
        tx.commit().await?;
        debug!("🗃️ User {user_id} paid {} for order #{order_id}. {outstanding} payments outstanding", participant.share_amount);
        Ok(AcceptResult::Accepted { participant, order, transaction })
    }

    async fn list_refundable(&self, order_ids: &[i64]) -> Result<Vec<OrderParticipant>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        let mut seen = std::collections::HashSet::new();
        let participants = participants::fetch_refundable(order_ids, &mut conn)
            .await?
            .into_iter()
            .filter(|p| seen.insert((p.order_id, p.user_id)))
            .collect();
        Ok(participants)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date by running the embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn apply_ledger_entry(
        &self,
        user_id: i64,
        kind: TransactionType,
        amount: Money,
    ) -> Result<WalletTransaction, WalletApiError> {
        let mut tx = self.pool.begin().await?;
        let entry = wallets::apply_ledger_entry(user_id, kind, amount, &mut tx).await?;
        tx.commit().await?;
        Ok(entry)
    }
}
