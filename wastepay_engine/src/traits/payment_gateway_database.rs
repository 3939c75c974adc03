use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{NewPaymentAttempt, PaymentAttempt},
    traits::{OrderApiError, OrderManagement, PaymentCommit, ReconcileResult, WalletApiError, WalletManagement},
};

/// This trait defines the highest level of behaviour for backends supporting the payment engine.
///
/// This behaviour includes:
/// * The wallet ledger and order tracking, through the [`WalletManagement`] and [`OrderManagement`] supertraits.
/// * Recording payment attempts, so that a payment is applied to the ledger at most once.
/// * Cancelling orders that were not paid in time, and refunding the participants that did pay.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone + WalletManagement + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Records a new `Pending` payment attempt.
    ///
    /// If an attempt with the same idempotency key already exists it is returned unchanged, together with `false`.
    async fn insert_payment_attempt(
        &self,
        attempt: NewPaymentAttempt,
    ) -> Result<(PaymentAttempt, bool), PaymentGatewayError>;

    async fn fetch_payment_attempt(&self, key: &str) -> Result<Option<PaymentAttempt>, PaymentGatewayError>;

    /// Applies a pending payment attempt to the ledger.
    ///
    /// In a single atomic transaction, the attempt is moved from `Pending` to `Completed`, and the deposit or
    /// withdrawal is applied to the user's wallet. If the ledger refuses the payment, the transaction is rolled back and
    /// the attempt stays `Pending`.
    async fn complete_payment(&self, key: &str) -> Result<PaymentCommit, PaymentGatewayError>;

    /// Marks a pending payment attempt as `Failed`, with the reason in `error_code`. Failed attempts are final.
    async fn fail_payment_attempt(&self, key: &str, error_code: &str) -> Result<PaymentAttempt, PaymentGatewayError>;

    /// Cancels every order that is still waiting for payment more than `unpaid_timeout` after it was submitted, and
    /// refunds the participants that had already paid.
    ///
    /// The cancellation, the refunds and the participant updates are committed in one transaction. Refund candidates
    /// without a wallet are logged and skipped.
    async fn reconcile_unpaid_orders(&self, unpaid_timeout: Duration) -> Result<ReconcileResult, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError>;
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The payment attempt {0} does not exist")]
    PaymentAttemptNotFound(String),
    #[error("{0}")]
    WalletError(#[from] WalletApiError),
    #[error("{0}")]
    OrderError(#[from] OrderApiError),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
