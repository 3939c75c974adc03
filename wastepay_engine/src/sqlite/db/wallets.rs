//! The wallet ledger.
//!
//! [`apply_ledger_entry`] is the only function in the crate that changes a wallet balance. It always changes the
//! balance and appends the matching ledger row on the same connection, so callers get both or neither by running it
//! inside a transaction.
use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Money, TransactionType, Wallet, WalletTransaction},
    traits::WalletApiError,
};

pub async fn fetch_wallet_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Wallet>, WalletApiError> {
    let wallet = sqlx::query_as("SELECT * FROM wallets WHERE user_id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(wallet)
}

/// Loads the wallets for all the given users in a single query. Users without a wallet are simply absent from the
/// result.
pub async fn fetch_wallets_for_users(
    user_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<Vec<Wallet>, WalletApiError> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM wallets WHERE user_id IN (");
    let mut ids = builder.separated(", ");
    for id in user_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(")");
    trace!("🗃️ Executing query: {}", builder.sql());
    let wallets = builder.build_query_as::<Wallet>().fetch_all(conn).await?;
    Ok(wallets)
}

/// Inserts a new, empty wallet for the user, returning `false` in the second parameter if the user already had one.
pub async fn idempotent_insert(
    user_id: i64,
    withdrawal_account: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<(Wallet, bool), WalletApiError> {
    let inserted: Option<Wallet> = sqlx::query_as(
        r#"
        INSERT INTO wallets (user_id, withdrawal_account) VALUES ($1, $2)
        ON CONFLICT (user_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(normalize_account(withdrawal_account))
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(wallet) => {
            debug!("🗃️ Wallet #{} created for user {user_id}", wallet.id);
            Ok((wallet, true))
        },
        None => {
            let wallet = fetch_wallet_for_user(user_id, conn).await?.ok_or(WalletApiError::WalletNotFound(user_id))?;
            Ok((wallet, false))
        },
    }
}

pub async fn update_withdrawal_account(
    user_id: i64,
    account: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Wallet, WalletApiError> {
    let wallet: Option<Wallet> = sqlx::query_as(
        "UPDATE wallets SET withdrawal_account = $1, updated_at = CURRENT_TIMESTAMP WHERE user_id = $2 RETURNING *",
    )
    .bind(normalize_account(account))
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    wallet.ok_or(WalletApiError::WalletNotFound(user_id))
}

fn normalize_account(account: Option<String>) -> Option<String> {
    account.map(|a| a.trim().to_string()).filter(|a| !a.is_empty())
}

/// Applies a single ledger entry to the user's wallet.
///
/// `amount` must be positive. The sign of the stored entry follows `kind`: deposits, refunds and income are credited,
/// withdrawals and expenses are debited. The balance update is a single conditional `UPDATE`, so a debit that would
/// take the balance below zero (or a withdrawal from a wallet without a withdrawal account) changes nothing.
///
/// This is not atomic on its own. Run it inside a transaction if it has to commit together with other changes.
pub async fn apply_ledger_entry(
    user_id: i64,
    kind: TransactionType,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, WalletApiError> {
    if !amount.is_positive() {
        return Err(WalletApiError::InvalidAmount(amount));
    }
    let delta = kind.signed(amount);
    let needs_destination = kind == TransactionType::Withdrawal;
    let updated: Option<Wallet> = sqlx::query_as(
        r#"
        UPDATE wallets SET funds = funds + $1, updated_at = CURRENT_TIMESTAMP
        WHERE user_id = $2
          AND funds + $3 >= 0
          AND ($4 = 0 OR withdrawal_account IS NOT NULL)
        RETURNING *
        "#,
    )
    .bind(delta)
    .bind(user_id)
    .bind(delta)
    .bind(needs_destination)
    .fetch_optional(&mut *conn)
    .await?;
    let wallet = match updated {
        Some(w) => w,
        None => return Err(explain_refusal(user_id, amount, needs_destination, conn).await),
    };
    let entry: WalletTransaction = sqlx::query_as(
        "INSERT INTO wallet_transactions (wallet_id, amount, kind) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(wallet.id)
    .bind(delta)
    .bind(kind)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ {kind} of {amount} applied to wallet #{} (user {user_id}). Balance is now {}", wallet.id, wallet.funds);
    Ok(entry)
}

async fn explain_refusal(
    user_id: i64,
    requested: Money,
    needs_destination: bool,
    conn: &mut SqliteConnection,
) -> WalletApiError {
    match fetch_wallet_for_user(user_id, conn).await {
        Err(e) => e,
        Ok(None) => WalletApiError::WalletNotFound(user_id),
        Ok(Some(w)) if needs_destination && w.withdrawal_account.is_none() => {
            WalletApiError::MissingDestination(user_id)
        },
        Ok(Some(w)) => {
            debug!("🗃️ Wallet #{} holds {}, which does not cover {requested}", w.id, w.funds);
            WalletApiError::InsufficientFunds { available: w.funds, requested }
        },
    }
}

pub async fn fetch_transactions(
    wallet_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, WalletApiError> {
    let entries = sqlx::query_as("SELECT * FROM wallet_transactions WHERE wallet_id = $1 ORDER BY id ASC")
        .bind(wallet_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
