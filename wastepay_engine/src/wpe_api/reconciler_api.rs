use std::{collections::HashMap, fmt::Debug};

use chrono::Duration;
use log::*;

use crate::{
    events::{EventProducers, OrderCancelledEvent},
    traits::{PaymentGatewayDatabase, PaymentGatewayError, ReconcileResult, Refund},
};

/// `ReconcilerApi` cancels orders that were not paid in time and refunds the participants that had paid.
///
/// A sweep is safe to run at any time, and as often as you like: an order is only ever cancelled (and its
/// participants refunded) once, and a sweep that finds nothing to do changes nothing.
pub struct ReconcilerApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for ReconcilerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcilerApi ({:?})", self.db)
    }
}

impl<B> ReconcilerApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> ReconcilerApi<B>
where B: PaymentGatewayDatabase
{
    /// Cancels every order that has been waiting for payment for longer than `unpaid_timeout`. See
    /// [`PaymentGatewayDatabase::reconcile_unpaid_orders`].
    ///
    /// Subscribers to the order-cancelled hook are notified once the sweep has been committed.
    pub async fn reconcile_unpaid_orders(&self, unpaid_timeout: Duration) -> Result<ReconcileResult, PaymentGatewayError> {
        let result = self.db.reconcile_unpaid_orders(unpaid_timeout).await?;
        if result.is_empty() {
            debug!("🧹️ No unpaid orders to reconcile");
            return Ok(result);
        }
        info!(
            "🧹️ {} unpaid orders cancelled. {} participants refunded a total of {}. {} refunds skipped",
            result.cancelled_count(),
            result.refunds.len(),
            result.total_refunded(),
            result.skipped.len()
        );
        self.call_order_cancelled_hook(&result).await;
        Ok(result)
    }

    async fn call_order_cancelled_hook(&self, result: &ReconcileResult) {
        if self.producers.order_cancelled_producer.is_empty() {
            return;
        }
        let mut refunds: HashMap<i64, Vec<Refund>> = HashMap::new();
        for refund in &result.refunds {
            refunds.entry(refund.order_id).or_default().push(refund.clone());
        }
        for emitter in &self.producers.order_cancelled_producer {
            debug!("🧹️ Notifying order cancelled hook subscribers");
            for order in &result.cancelled {
                let order_refunds = refunds.get(&order.id).cloned().unwrap_or_default();
                emitter.publish_event(OrderCancelledEvent::new(order.clone(), order_refunds)).await;
            }
        }
    }
}
