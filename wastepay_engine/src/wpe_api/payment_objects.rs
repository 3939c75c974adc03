use serde::{Deserialize, Serialize};

use crate::db_types::{Money, PaymentStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessPaymentRequest {
    pub user_id: i64,
    /// The payment method code, e.g. `BLIK` or `IBAN`
    pub method_code: String,
    pub amount: Money,
    /// Method-specific data. For top-ups, this is the confirmation code issued by the payment provider.
    #[serde(default)]
    pub property: String,
    /// Retrying a request with the same key never applies the payment twice. A random key is used if none is given.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl ProcessPaymentRequest {
    pub fn new<S: Into<String>>(user_id: i64, method_code: S, amount: Money) -> Self {
        Self { user_id, method_code: method_code.into(), amount, property: String::new(), idempotency_key: None }
    }

    pub fn with_property<S: Into<String>>(mut self, property: S) -> Self {
        self.property = property.into();
        self
    }

    pub fn with_idempotency_key<S: Into<String>>(mut self, key: S) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub amount: Money,
}
