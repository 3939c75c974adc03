//! #  Storage backend contracts.
//!
//! This module provides the interfaces that define the interface contracts of the payment engine database *backends*.
//!
//! ## Wallets
//! Every user owns exactly one wallet. The wallet balance only ever changes through a ledger entry, and every ledger
//! entry is written in the same atomic transaction as the balance change.
//!
//! ## Traits
//! * [`PaymentGatewayDatabase`] defines the highest level of behavior for backends: payment attempts, and the
//!   reconciliation of orders that were not paid in time.
//! * [`WalletManagement`] defines the wallet ledger.
//! * [`OrderManagement`] defines order submission and tracking of the participants' payments.
mod data_objects;
mod order_management;
mod payment_gateway_database;
mod wallet_management;

pub use data_objects::{AcceptResult, OrderWithParticipants, PaymentCommit, ReconcileResult, Refund};
pub use order_management::{OrderApiError, OrderManagement};
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
pub use wallet_management::{WalletApiError, WalletManagement};
