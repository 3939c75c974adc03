use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use super::{orders, participants, sqlite_timestamp, wallets};
use crate::{
    db_types::{TransactionType, Wallet},
    traits::{PaymentGatewayError, ReconcileResult, Refund},
};

/// One reconciler sweep. Run this inside a transaction: the cancellations, refunds and participant updates must
/// commit together.
///
/// The first statement cancels the orders, which also takes the database write lock, so a concurrent sweep or a live
/// payment acceptance waits for this one to finish rather than seeing a half-reconciled order.
pub async fn reconcile_unpaid_orders(
    created_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<ReconcileResult, PaymentGatewayError> {
    let cutoff = sqlite_timestamp(created_before);
    let cancelled = orders::cancel_unpaid_orders(&cutoff, conn).await?;
    if cancelled.is_empty() {
        trace!("🧹️ No unpaid orders older than {cutoff}");
        return Ok(ReconcileResult::default());
    }
    let order_ids = cancelled.iter().map(|o| o.id).collect::<Vec<_>>();
    let mut seen = HashSet::new();
    let candidates = participants::fetch_refundable(&order_ids, conn)
        .await?
        .into_iter()
        .filter(|p| seen.insert((p.order_id, p.user_id)))
        .collect::<Vec<_>>();
    let mut user_ids = candidates.iter().map(|p| p.user_id).collect::<Vec<_>>();
    user_ids.sort_unstable();
    user_ids.dedup();
    let wallets: HashMap<i64, Wallet> = wallets::fetch_wallets_for_users(&user_ids, conn)
        .await?
        .into_iter()
        .map(|w| (w.user_id, w))
        .collect();
    let mut refunds = Vec::with_capacity(candidates.len());
    let mut skipped = Vec::new();
    for participant in candidates {
        if !wallets.contains_key(&participant.user_id) {
            warn!(
                "🧹️ User {} paid {} towards order #{} but has no wallet. The refund is skipped.",
                participant.user_id, participant.share_amount, participant.order_id
            );
            skipped.push(participant);
            continue;
        }
        let transaction =
            wallets::apply_ledger_entry(participant.user_id, TransactionType::Refund, participant.share_amount, conn)
                .await?;
        participants::revoke_acceptance(participant.id, conn).await?;
        debug!(
            "🧹️ Refunded {} to user {} for cancelled order #{}",
            participant.share_amount, participant.user_id, participant.order_id
        );
        refunds.push(Refund {
            order_id: participant.order_id,
            user_id: participant.user_id,
            amount: participant.share_amount,
            transaction,
        });
    }
    Ok(ReconcileResult::new(cancelled, refunds, skipped))
}
