use serde::{Deserialize, Serialize};

use crate::{
    db_types::{GarbageOrder, PaymentAttempt, WalletTransaction},
    traits::Refund,
};

/// Published after the reconciler has cancelled an order, once the cancellation has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: GarbageOrder,
    /// The refunds that were made for this order
    pub refunds: Vec<Refund>,
}

impl OrderCancelledEvent {
    pub fn new(order: GarbageOrder, refunds: Vec<Refund>) -> Self {
        Self { order, refunds }
    }
}

/// Published after a payment has been applied to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCompletedEvent {
    pub attempt: PaymentAttempt,
    pub transaction: WalletTransaction,
}

impl PaymentCompletedEvent {
    pub fn new(attempt: PaymentAttempt, transaction: WalletTransaction) -> Self {
        Self { attempt, transaction }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCancelled(OrderCancelledEvent),
    PaymentCompleted(PaymentCompletedEvent),
}
