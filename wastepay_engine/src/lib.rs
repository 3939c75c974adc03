//! Wastepay Engine
//!
//! The Wastepay Engine prices garbage collection orders, keeps every user's wallet ledger, and makes sure that orders
//! that are not paid in time are cancelled and their paying participants refunded.
//!
//! The library is divided into these sections:
//! 1. The data types ([`mod@db_types`]) and the backend traits ([`mod@traits`]). [`SqliteDatabase`] is the only
//!    backend. You should never need to access the database directly. Use the public API instead.
//! 2. The public API ([`mod@wpe_api`]): [`WalletApi`], [`OrderApi`], [`PaymentApi`] and [`ReconcilerApi`].
//! 3. The [`mod@dispatcher`], which routes typed commands to fresh handlers and wraps each outcome in an
//!    [`Envelope`](dispatcher::Envelope). This is how the server talks to the engine.
//! 4. The pure [`mod@cost_estimator`].
//!
//! The engine also publishes events when payments complete and when unpaid orders are cancelled. See [`mod@events`].
pub mod cost_estimator;
pub mod db_types;
pub mod dispatcher;
pub mod events;
pub mod provider;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;
pub mod wpe_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{OrderManagement, PaymentGatewayDatabase, WalletManagement};
pub use wpe_api::{
    errors::{ErrorCode, PaymentApiError},
    order_api::OrderApi,
    payment_api::PaymentApi,
    reconciler_api::ReconcilerApi,
    wallet_api::WalletApi,
};
