use serde::{Deserialize, Serialize};
use wastepay_common::Money;

/// The body of `POST /api/orders/{order_id}/accept`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptPaymentParams {
    pub user_id: i64,
    /// Overrides the share that was fixed when the order was submitted
    #[serde(default)]
    pub share_amount: Option<Money>,
}
