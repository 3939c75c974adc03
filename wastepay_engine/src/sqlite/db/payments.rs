use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPaymentAttempt, PaymentAttempt, PaymentStatus},
    traits::PaymentGatewayError,
};

/// Inserts the payment attempt, returning `false` in the second parameter if an attempt with the same idempotency key
/// already exists. The existing attempt is returned unchanged in that case.
pub async fn idempotent_insert(
    attempt: NewPaymentAttempt,
    conn: &mut SqliteConnection,
) -> Result<(PaymentAttempt, bool), PaymentGatewayError> {
    let inserted: Option<PaymentAttempt> = sqlx::query_as(
        r#"
        INSERT INTO payment_attempts (idempotency_key, user_id, method, amount, status)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (idempotency_key) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(&attempt.idempotency_key)
    .bind(attempt.user_id)
    .bind(attempt.method)
    .bind(attempt.amount)
    .bind(PaymentStatus::Pending)
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(a) => {
            debug!("🗃️ Payment attempt [{}] recorded for user {}", a.idempotency_key, a.user_id);
            Ok((a, true))
        },
        None => {
            let existing = fetch_attempt(&attempt.idempotency_key, conn)
                .await?
                .ok_or_else(|| PaymentGatewayError::PaymentAttemptNotFound(attempt.idempotency_key.clone()))?;
            Ok((existing, false))
        },
    }
}

pub async fn fetch_attempt(key: &str, conn: &mut SqliteConnection) -> Result<Option<PaymentAttempt>, PaymentGatewayError> {
    let attempt =
        sqlx::query_as("SELECT * FROM payment_attempts WHERE idempotency_key = $1").bind(key).fetch_optional(conn).await?;
    Ok(attempt)
}

/// Moves a `Pending` attempt to `new_status`. Returns `None` if the attempt is not pending (or does not exist).
pub async fn settle_attempt(
    key: &str,
    new_status: PaymentStatus,
    error_code: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAttempt>, PaymentGatewayError> {
    let attempt = sqlx::query_as(
        r#"
        UPDATE payment_attempts SET status = $1, error_code = $2, updated_at = CURRENT_TIMESTAMP
        WHERE idempotency_key = $3 AND status = $4
        RETURNING *
        "#,
    )
    .bind(new_status)
    .bind(error_code)
    .bind(key)
    .bind(PaymentStatus::Pending)
    .fetch_optional(conn)
    .await?;
    Ok(attempt)
}
