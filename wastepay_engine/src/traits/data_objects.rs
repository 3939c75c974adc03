use serde::{Deserialize, Serialize};

use crate::db_types::{GarbageOrder, Money, OrderParticipant, PaymentAttempt, WalletTransaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithParticipants {
    pub order: GarbageOrder,
    pub participants: Vec<OrderParticipant>,
}

impl OrderWithParticipants {
    pub fn new(order: GarbageOrder, participants: Vec<OrderParticipant>) -> Self {
        Self { order, participants }
    }

    pub fn total_shares(&self) -> Money {
        self.participants.iter().map(|p| p.share_amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptResult {
    /// The participant's share was charged. `order` is the order after the acceptance, so its status shows whether
    /// this was the last outstanding payment. A zero share is accepted without a ledger entry.
    Accepted { participant: OrderParticipant, order: GarbageOrder, transaction: Option<WalletTransaction> },
    /// The participant had already accepted. Nothing was changed.
    AlreadyAccepted(OrderParticipant),
}

impl AcceptResult {
    pub fn participant(&self) -> &OrderParticipant {
        match self {
            AcceptResult::Accepted { participant, .. } => participant,
            AcceptResult::AlreadyAccepted(participant) => participant,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, AcceptResult::Accepted { .. })
    }
}

/// The outcome of committing a payment attempt to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentCommit {
    /// The attempt was pending, and has now been applied to the ledger.
    Applied { attempt: PaymentAttempt, transaction: WalletTransaction },
    /// The attempt had already been applied. Nothing was changed.
    Replayed(PaymentAttempt),
    /// The attempt had failed earlier. Nothing was changed.
    PreviouslyFailed(PaymentAttempt),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub order_id: i64,
    pub user_id: i64,
    pub amount: Money,
    pub transaction: WalletTransaction,
}

/// The outcome of one sweep of the unpaid-order reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub cancelled: Vec<GarbageOrder>,
    pub refunds: Vec<Refund>,
    /// Participants that should have been refunded, but do not have a wallet
    pub skipped: Vec<OrderParticipant>,
}

impl ReconcileResult {
    pub fn new(cancelled: Vec<GarbageOrder>, refunds: Vec<Refund>, skipped: Vec<OrderParticipant>) -> Self {
        Self { cancelled, refunds, skipped }
    }

    pub fn is_empty(&self) -> bool {
        self.cancelled.is_empty()
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled.len()
    }

    pub fn total_refunded(&self) -> Money {
        self.refunds.iter().map(|r| r.amount).sum()
    }
}
