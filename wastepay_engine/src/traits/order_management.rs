use thiserror::Error;

use crate::{
    db_types::{GarbageOrder, Money, NewGarbageOrder, OrderParticipant, OrderStatusType},
    traits::{AcceptResult, OrderWithParticipants, WalletApiError},
};

/// Order submission, and tracking of which participants have paid their share.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order with the given total `cost`, in `WaitingForPayment` status. Each participant is added with
    /// the matching entry of `shares` and has not accepted payment yet.
    async fn insert_order(
        &self,
        order: NewGarbageOrder,
        cost: Money,
        shares: Vec<Money>,
    ) -> Result<OrderWithParticipants, OrderApiError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<GarbageOrder>, OrderApiError>;

    async fn fetch_participants(&self, order_id: i64) -> Result<Vec<OrderParticipant>, OrderApiError>;

    /// Records that the participant accepted payment of their share, and charges the share to their wallet as a
    /// `GarbageExpense` in the same transaction. If `share_amount` is given it replaces the stored share.
    ///
    /// Calling this again for a participant that has already accepted changes nothing and returns
    /// [`AcceptResult::AlreadyAccepted`]. When the last participant accepts, the order moves on to
    /// `WaitingForAccept`.
    async fn mark_accepted(
        &self,
        order_id: i64,
        user_id: i64,
        share_amount: Option<Money>,
    ) -> Result<AcceptResult, OrderApiError>;

    /// The participants of the given orders that have paid a non-zero share, one entry per (order, user).
    async fn list_refundable(&self, order_ids: &[i64]) -> Result<Vec<OrderParticipant>, OrderApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("User {user_id} is not a participant of order {order_id}")]
    ParticipantNotFound { order_id: i64, user_id: i64 },
    #[error("Order {0} is {1}, so it cannot accept payments")]
    OrderNotPayable(i64, OrderStatusType),
    #[error("An order needs at least one participant")]
    NoParticipants,
    #[error("User {0} appears more than once in the participant list")]
    DuplicateParticipant(i64),
    #[error("Invalid share: {0}")]
    InvalidShare(String),
    #[error("{0}")]
    Wallet(#[from] WalletApiError),
}

impl From<sqlx::Error> for OrderApiError {
    fn from(e: sqlx::Error) -> Self {
        OrderApiError::DatabaseError(e.to_string())
    }
}
