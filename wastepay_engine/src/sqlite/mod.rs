//! SQLite storage backend for the payment engine.
//!
//! The schema lives in `migrations/` and is embedded in the binary. See [`SqliteDatabase::run_migrations`].
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
