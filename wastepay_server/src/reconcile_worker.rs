use std::time::Duration;

use chrono::Duration as ChronoDuration;
use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use wastepay_engine::{db_types::GarbageOrder, events::EventProducers, ReconcilerApi, SqliteDatabase};

/// Starts the unpaid-order reconciler. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Each sweep is awaited before the next tick, and missed ticks are skipped, so sweeps never overlap.
pub fn start_reconcile_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    interval: Duration,
    unpaid_timeout: ChronoDuration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let api = ReconcilerApi::new(db, producers);
        info!("🧹️ Unpaid order reconciler started. Orders are cancelled after {} minutes", unpaid_timeout.num_minutes());
        loop {
            timer.tick().await;
            debug!("🧹️ Running unpaid order sweep");
            match api.reconcile_unpaid_orders(unpaid_timeout).await {
                Ok(result) if result.is_empty() => trace!("🧹️ Nothing to reconcile"),
                Ok(result) => {
                    info!("🧹️ {} orders cancelled", result.cancelled_count());
                    debug!("🧹️ Cancelled orders: {}", order_list(&result.cancelled));
                },
                Err(e) => {
                    error!("🧹️ Error running the unpaid order sweep. Trying again at the next tick. {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[GarbageOrder]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] group: {} cost: {}", o.id, o.group_id, o.cost))
        .collect::<Vec<String>>()
        .join(", ")
}
