use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::Money,
    traits::{OrderApiError, PaymentGatewayError, WalletApiError},
};

/// The codes that callers see when a request fails. Every code except [`ErrorCode::GenericFailure`] is a business
/// outcome that the UI can localize. `GenericFailure` means something broke on our side and nothing was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    GenericFailure,
    /// The thing that was asked for does not exist (e.g. a user without a wallet)
    GenericError,
    InvalidPaymentCode,
    InvalidTopupCode,
    MissingAccountNumber,
    NotEnoughFunds,
    InvalidAmount,
    IdempotencyConflict,
    InvalidOrder,
    OrderNotPayable,
}

impl ErrorCode {
    /// The HTTP status that goes with the code
    pub fn status(&self) -> u16 {
        match self {
            ErrorCode::GenericFailure => 500,
            ErrorCode::GenericError => 404,
            ErrorCode::InvalidPaymentCode |
            ErrorCode::InvalidTopupCode |
            ErrorCode::InvalidAmount |
            ErrorCode::InvalidOrder => 400,
            ErrorCode::NotEnoughFunds => 402,
            ErrorCode::IdempotencyConflict | ErrorCode::OrderNotPayable => 409,
            ErrorCode::MissingAccountNumber => 422,
        }
    }

    pub fn is_business_error(&self) -> bool {
        !matches!(self, ErrorCode::GenericFailure)
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::GenericFailure => "GenericFailure",
            ErrorCode::GenericError => "GenericError",
            ErrorCode::InvalidPaymentCode => "InvalidPaymentCode",
            ErrorCode::InvalidTopupCode => "InvalidTopupCode",
            ErrorCode::MissingAccountNumber => "MissingAccountNumber",
            ErrorCode::NotEnoughFunds => "NotEnoughFunds",
            ErrorCode::InvalidAmount => "InvalidAmount",
            ErrorCode::IdempotencyConflict => "IdempotencyConflict",
            ErrorCode::InvalidOrder => "InvalidOrder",
            ErrorCode::OrderNotPayable => "OrderNotPayable",
        };
        f.write_str(s)
    }
}

impl FromStr for ErrorCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GenericFailure" => Ok(ErrorCode::GenericFailure),
            "GenericError" => Ok(ErrorCode::GenericError),
            "InvalidPaymentCode" => Ok(ErrorCode::InvalidPaymentCode),
            "InvalidTopupCode" => Ok(ErrorCode::InvalidTopupCode),
            "MissingAccountNumber" => Ok(ErrorCode::MissingAccountNumber),
            "NotEnoughFunds" => Ok(ErrorCode::NotEnoughFunds),
            "InvalidAmount" => Ok(ErrorCode::InvalidAmount),
            "IdempotencyConflict" => Ok(ErrorCode::IdempotencyConflict),
            "InvalidOrder" => Ok(ErrorCode::InvalidOrder),
            "OrderNotPayable" => Ok(ErrorCode::OrderNotPayable),
            _ => Err(format!("Unknown error code: {s}")),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Unknown payment method: {0}")]
    InvalidPaymentCode(String),
    #[error("The top-up confirmation code was rejected by the payment provider")]
    InvalidTopupCode,
    #[error("User {0} has not set up a withdrawal account")]
    MissingAccountNumber(i64),
    #[error("Not enough funds. The wallet holds {available}, but {requested} was requested")]
    NotEnoughFunds { available: Money, requested: Money },
    #[error("Payment amounts must be positive, got {0}")]
    InvalidAmount(Money),
    #[error("User {0} does not have a wallet")]
    WalletNotFound(i64),
    #[error("The idempotency key {0} was already used for a different payment")]
    IdempotencyConflict(String),
    #[error("Payment attempt {key} failed earlier with {code}")]
    AttemptFailed { key: String, code: ErrorCode },
}

impl PaymentApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentApiError::DatabaseError(_) => ErrorCode::GenericFailure,
            PaymentApiError::InvalidPaymentCode(_) => ErrorCode::InvalidPaymentCode,
            PaymentApiError::InvalidTopupCode => ErrorCode::InvalidTopupCode,
            PaymentApiError::MissingAccountNumber(_) => ErrorCode::MissingAccountNumber,
            PaymentApiError::NotEnoughFunds { .. } => ErrorCode::NotEnoughFunds,
            PaymentApiError::InvalidAmount(_) => ErrorCode::InvalidAmount,
            PaymentApiError::WalletNotFound(_) => ErrorCode::GenericError,
            PaymentApiError::IdempotencyConflict(_) => ErrorCode::IdempotencyConflict,
            PaymentApiError::AttemptFailed { code, .. } => *code,
        }
    }
}

impl From<WalletApiError> for PaymentApiError {
    fn from(e: WalletApiError) -> Self {
        match e {
            WalletApiError::DatabaseError(s) => PaymentApiError::DatabaseError(s),
            WalletApiError::WalletNotFound(user_id) => PaymentApiError::WalletNotFound(user_id),
            WalletApiError::InvalidAmount(amount) => PaymentApiError::InvalidAmount(amount),
            WalletApiError::InsufficientFunds { available, requested } => {
                PaymentApiError::NotEnoughFunds { available, requested }
            },
            WalletApiError::MissingDestination(user_id) => PaymentApiError::MissingAccountNumber(user_id),
        }
    }
}

impl From<PaymentGatewayError> for PaymentApiError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::WalletError(e) => e.into(),
            e => PaymentApiError::DatabaseError(e.to_string()),
        }
    }
}

impl WalletApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            WalletApiError::DatabaseError(_) => ErrorCode::GenericFailure,
            WalletApiError::WalletNotFound(_) => ErrorCode::GenericError,
            WalletApiError::InvalidAmount(_) => ErrorCode::InvalidAmount,
            WalletApiError::InsufficientFunds { .. } => ErrorCode::NotEnoughFunds,
            WalletApiError::MissingDestination(_) => ErrorCode::MissingAccountNumber,
        }
    }
}

impl OrderApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderApiError::DatabaseError(_) => ErrorCode::GenericFailure,
            OrderApiError::OrderNotFound(_) | OrderApiError::ParticipantNotFound { .. } => ErrorCode::GenericError,
            OrderApiError::OrderNotPayable(..) => ErrorCode::OrderNotPayable,
            OrderApiError::NoParticipants |
            OrderApiError::DuplicateParticipant(_) |
            OrderApiError::InvalidShare(_) => ErrorCode::InvalidOrder,
            OrderApiError::Wallet(e) => e.code(),
        }
    }
}

impl PaymentGatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentGatewayError::DatabaseError(_) => ErrorCode::GenericFailure,
            PaymentGatewayError::PaymentAttemptNotFound(_) => ErrorCode::GenericError,
            PaymentGatewayError::WalletError(e) => e.code(),
            PaymentGatewayError::OrderError(e) => e.code(),
        }
    }
}
