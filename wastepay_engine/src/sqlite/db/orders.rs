use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{GarbageOrder, Money, NewGarbageOrder, OrderStatusType},
    traits::OrderApiError,
};

/// Inserts a new order in `WaitingForPayment` status using the given connection. This is not atomic. You can embed
/// this call inside a transaction if you need to.
pub async fn insert_order(
    order: &NewGarbageOrder,
    cost: Money,
    conn: &mut SqliteConnection,
) -> Result<GarbageOrder, OrderApiError> {
    let order: GarbageOrder = sqlx::query_as(
        r#"
        INSERT INTO garbage_orders (
            group_id,
            pickup_option,
            container_size,
            pickup_date,
            drop_off_date,
            is_high_priority,
            collecting_service,
            cost,
            status
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(order.group_id)
    .bind(order.pickup_option)
    .bind(order.container_size)
    .bind(order.pickup_date)
    .bind(order.drop_off_date)
    .bind(order.is_high_priority)
    .bind(order.collecting_service)
    .bind(cost)
    .bind(OrderStatusType::WaitingForPayment)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order #{} for group {} saved with a cost of {}", order.id, order.group_id, order.cost);
    Ok(order)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<GarbageOrder>, OrderApiError> {
    let order = sqlx::query_as("SELECT * FROM garbage_orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

/// Moves the order from `from` to `to`. Returns `None` if the order was not in the `from` status, in which case
/// nothing changes.
pub async fn transition_status(
    order_id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<GarbageOrder>, OrderApiError> {
    if !from.can_transition_to(to) {
        warn!("🗃️ Refusing to move order #{order_id} from {from} to {to}");
        return Ok(None);
    }
    let order: Option<GarbageOrder> = sqlx::query_as(
        r#"
        UPDATE garbage_orders SET status = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status = $3
        RETURNING *
        "#,
    )
    .bind(to)
    .bind(order_id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    if order.is_some() {
        debug!("🗃️ Order #{order_id} moved from {from} to {to}");
    }
    Ok(order)
}

/// Cancels every order in `WaitingForPayment` that was created before `cutoff` and still has at least one participant
/// that has not accepted payment. The selection and the status change are one statement, so an order can only be
/// cancelled by one caller.
pub async fn cancel_unpaid_orders(cutoff: &str, conn: &mut SqliteConnection) -> Result<Vec<GarbageOrder>, OrderApiError> {
    let orders: Vec<GarbageOrder> = sqlx::query_as(
        r#"
        UPDATE garbage_orders SET status = $1, updated_at = CURRENT_TIMESTAMP
        WHERE status = $2
          AND created_at < $3
          AND EXISTS (
            SELECT 1 FROM order_participants
            WHERE order_participants.order_id = garbage_orders.id AND has_accepted_payment = 0
          )
        RETURNING *
        "#,
    )
    .bind(OrderStatusType::Cancelled)
    .bind(OrderStatusType::WaitingForPayment)
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    trace!("🗃️ {} unpaid orders created before {cutoff} were cancelled", orders.len());
    Ok(orders)
}
