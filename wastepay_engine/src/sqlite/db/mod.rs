//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Functions that are used inside a read-modify-write transaction are written so that the first statement of the
//! transaction is a write. SQLite then takes the write lock up front, and concurrent transactions queue on the busy
//! timeout instead of failing when they try to upgrade a read lock.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod orders;
pub mod participants;
pub mod payments;
pub mod reconcile;
pub mod wallets;

const SQLITE_DB_URL: &str = "sqlite://data/wastepay.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn db_url() -> String {
    let result = env::var("WPS_DATABASE_URL").unwrap_or_else(|_| {
        info!("WPS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true).busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Formats a timestamp the same way SQLite's `CURRENT_TIMESTAMP` does, so that it compares correctly against the
/// `created_at` and `updated_at` columns.
pub(crate) fn sqlite_timestamp(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
