use std::{collections::HashSet, fmt::Debug};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    cost_estimator::{estimate_cost, CostBreakdown, CostEstimateRequest},
    db_types::{GarbageOrder, Money, NewGarbageOrder, OrderParticipant},
    traits::{AcceptResult, OrderApiError, OrderManagement},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedOrder {
    pub order: GarbageOrder,
    pub participants: Vec<OrderParticipant>,
    pub cost: CostBreakdown,
}

/// `OrderApi` handles order submission and the participants' payments towards an order.
#[derive(Clone)]
pub struct OrderApi<B> {
    db: B,
}

impl<B: Debug> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi ({:?})", self.db)
    }
}

impl<B> OrderApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderApi<B>
where B: OrderManagement
{
    /// Prices the order and stores it, waiting for payment.
    ///
    /// The total cost is split as evenly as possible between the participants. Shares differ by at most one cent, and
    /// always add up to the total exactly.
    pub async fn submit_order(&self, order: NewGarbageOrder) -> Result<SubmittedOrder, OrderApiError> {
        validate_participants(&order.participants)?;
        let cost = estimate_cost(&CostEstimateRequest::from(&order));
        let shares = cost.total_cost.split(order.participants.len());
        let stored = self.db.insert_order(order, cost.total_cost, shares).await?;
        info!(
            "💰️ Order #{} submitted for group {}. {} is split between {} participants",
            stored.order.id,
            stored.order.group_id,
            cost.total_cost,
            stored.participants.len()
        );
        Ok(SubmittedOrder { order: stored.order, participants: stored.participants, cost })
    }

    /// The participant pays their share of the order. See [`OrderManagement::mark_accepted`].
    pub async fn accept_payment(
        &self,
        order_id: i64,
        user_id: i64,
        share_amount: Option<Money>,
    ) -> Result<AcceptResult, OrderApiError> {
        let result = self.db.mark_accepted(order_id, user_id, share_amount).await?;
        match &result {
            AcceptResult::Accepted { participant, order, .. } => {
                info!("💰️ User {user_id} paid {} towards order #{order_id}", participant.share_amount);
                debug!("💰️ Order #{order_id} is now {}", order.status);
            },
            AcceptResult::AlreadyAccepted(_) => {
                debug!("💰️ User {user_id} had already paid for order #{order_id}");
            },
        }
        Ok(result)
    }

    pub async fn fetch_order(&self, order_id: i64) -> Result<(GarbageOrder, Vec<OrderParticipant>), OrderApiError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderApiError::OrderNotFound(order_id))?;
        let participants = self.db.fetch_participants(order_id).await?;
        Ok((order, participants))
    }

    pub async fn list_refundable(&self, order_ids: &[i64]) -> Result<Vec<OrderParticipant>, OrderApiError> {
        self.db.list_refundable(order_ids).await
    }
}

fn validate_participants(participants: &[i64]) -> Result<(), OrderApiError> {
    if participants.is_empty() {
        return Err(OrderApiError::NoParticipants);
    }
    let mut seen = HashSet::with_capacity(participants.len());
    match participants.iter().find(|id| !seen.insert(**id)) {
        Some(id) => Err(OrderApiError::DuplicateParticipant(*id)),
        None => Ok(()),
    }
}
