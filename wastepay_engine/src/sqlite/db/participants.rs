use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Money, OrderParticipant, OrderStatusType},
    traits::OrderApiError,
};

pub async fn insert_participants(
    order_id: i64,
    shares: &[(i64, Money)],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderParticipant>, OrderApiError> {
    let mut result = Vec::with_capacity(shares.len());
    for (user_id, share) in shares {
        let participant: OrderParticipant = sqlx::query_as(
            "INSERT INTO order_participants (order_id, user_id, share_amount) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(order_id)
        .bind(*user_id)
        .bind(*share)
        .fetch_one(&mut *conn)
        .await?;
        result.push(participant);
    }
    trace!("🗃️ {} participants added to order #{order_id}", result.len());
    Ok(result)
}

pub async fn fetch_participants(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderParticipant>, OrderApiError> {
    let participants = sqlx::query_as("SELECT * FROM order_participants WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(participants)
}

pub async fn fetch_participant(
    order_id: i64,
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderParticipant>, OrderApiError> {
    let participant = sqlx::query_as("SELECT * FROM order_participants WHERE order_id = $1 AND user_id = $2")
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(participant)
}

/// Flips `has_accepted_payment` to true for the participant, provided that they have not accepted yet and that the
/// order is still waiting for payment. If `share` is given, it replaces the stored share.
///
/// Returns `None` if nothing was changed.
pub async fn accept_payment(
    order_id: i64,
    user_id: i64,
    share: Option<Money>,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderParticipant>, OrderApiError> {
    let participant = sqlx::query_as(
        r#"
        UPDATE order_participants SET has_accepted_payment = 1, share_amount = COALESCE($1, share_amount)
        WHERE order_id = $2
          AND user_id = $3
          AND has_accepted_payment = 0
          AND EXISTS (SELECT 1 FROM garbage_orders WHERE id = $4 AND status = $5)
        RETURNING *
        "#,
    )
    .bind(share)
    .bind(order_id)
    .bind(user_id)
    .bind(order_id)
    .bind(OrderStatusType::WaitingForPayment)
    .fetch_optional(conn)
    .await?;
    Ok(participant)
}

/// Reverses an earlier acceptance. Only the reconciler calls this, in the same transaction as the refund.
pub async fn revoke_acceptance(participant_id: i64, conn: &mut SqliteConnection) -> Result<bool, OrderApiError> {
    let result = sqlx::query(
        "UPDATE order_participants SET has_accepted_payment = 0 WHERE id = $1 AND has_accepted_payment = 1",
    )
    .bind(participant_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn count_unaccepted(order_id: i64, conn: &mut SqliteConnection) -> Result<i64, OrderApiError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM order_participants WHERE order_id = $1 AND has_accepted_payment = 0")
            .bind(order_id)
            .fetch_one(conn)
            .await?;
    Ok(count)
}

/// The participants of the given orders that have accepted payment of a non-zero share.
pub async fn fetch_refundable(
    order_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderParticipant>, OrderApiError> {
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT * FROM order_participants WHERE has_accepted_payment = 1 AND share_amount > 0 AND order_id IN (",
    );
    let mut ids = builder.separated(", ");
    for id in order_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY order_id ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let participants = builder.build_query_as::<OrderParticipant>().fetch_all(conn).await?;
    Ok(participants)
}
