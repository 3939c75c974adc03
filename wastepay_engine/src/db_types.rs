use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
pub use wastepay_common::Money;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(&'static str, String);

//--------------------------------------        Wallet         ---------------------------------------------------------
/// A user's wallet. `funds` is never negative, and only changes through the wallet ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub id: i64,
    pub user_id: i64,
    pub funds: Money,
    /// The destination for withdrawals (e.g. an IBAN). Withdrawals are refused while this is unset.
    pub withdrawal_account: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   TransactionType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum TransactionType {
    /// Funds added to the wallet from an external payment provider
    Deposit,
    /// Funds paid out to the wallet's withdrawal account
    Withdrawal,
    /// An order share returned to the wallet after the order was cancelled
    Refund,
    /// A participant's share of a garbage order
    GarbageExpense,
    /// Payment received by a collecting service for a garbage order
    GarbageIncome,
}

impl TransactionType {
    /// True if transactions of this kind add funds to the wallet.
    pub fn is_credit(&self) -> bool {
        match self {
            TransactionType::Deposit | TransactionType::Refund | TransactionType::GarbageIncome => true,
            TransactionType::Withdrawal | TransactionType::GarbageExpense => false,
        }
    }

    /// Applies the sign convention of this kind to a (positive) amount.
    pub fn signed(&self, amount: Money) -> Money {
        if self.is_credit() {
            amount.abs()
        } else {
            -amount.abs()
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Deposit => write!(f, "Deposit"),
            TransactionType::Withdrawal => write!(f, "Withdrawal"),
            TransactionType::Refund => write!(f, "Refund"),
            TransactionType::GarbageExpense => write!(f, "GarbageExpense"),
            TransactionType::GarbageIncome => write!(f, "GarbageIncome"),
        }
    }
}

//--------------------------------------  WalletTransaction    ---------------------------------------------------------
/// An immutable ledger row. The amount is signed: credits are positive and debits are negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WalletTransaction {
    pub id: i64,
    pub wallet_id: i64,
    pub amount: Money,
    pub kind: TransactionType,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     PickupOption      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(from = "String")]
pub enum PickupOption {
    SmallPickup,
    Pickup,
    Container,
    SpecialOrder,
}

impl Display for PickupOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickupOption::SmallPickup => write!(f, "SmallPickup"),
            PickupOption::Pickup => write!(f, "Pickup"),
            PickupOption::Container => write!(f, "Container"),
            PickupOption::SpecialOrder => write!(f, "SpecialOrder"),
        }
    }
}

impl FromStr for PickupOption {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SmallPickup" => Ok(Self::SmallPickup),
            "Pickup" => Ok(Self::Pickup),
            "Container" => Ok(Self::Container),
            "SpecialOrder" => Ok(Self::SpecialOrder),
            s => Err(ConversionError("pickup option", s.to_string())),
        }
    }
}

impl From<String> for PickupOption {
    /// Lenient conversion used at the request boundary. Unknown options are priced as a small pickup.
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            warn!("Unknown pickup option '{value}'. Pricing it as a SmallPickup.");
            PickupOption::SmallPickup
        })
    }
}

//--------------------------------------     ContainerSize     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum ContainerSize {
    Small,
    Medium,
    Large,
}

impl Display for ContainerSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerSize::Small => write!(f, "Small"),
            ContainerSize::Medium => write!(f, "Medium"),
            ContainerSize::Large => write!(f, "Large"),
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum OrderStatusType {
    /// The order has been submitted, and is waiting for every participant to pay their share.
    WaitingForPayment,
    /// Every participant has paid. The collecting service still has to accept the order.
    WaitingForAccept,
    /// The order was accepted and the pickup is scheduled.
    WaitingForPickup,
    /// The garbage was collected and the utilization fee is outstanding.
    WaitingForUtilizationFee,
    /// Terminal. The order is done.
    Completed,
    /// A participant lodged a complaint about the order.
    Complained,
    /// The complaint has been resolved.
    Resolved,
    /// Terminal. The order was not paid in time.
    Cancelled,
}

impl OrderStatusType {
    /// The order lifecycle. Only `WaitingForPayment` orders can be cancelled.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, next),
            (WaitingForPayment, WaitingForAccept) |
                (WaitingForPayment, Cancelled) |
                (WaitingForAccept, WaitingForPickup) |
                (WaitingForPickup, WaitingForUtilizationFee) |
                (WaitingForPickup, Complained) |
                (WaitingForUtilizationFee, Completed) |
                (WaitingForUtilizationFee, Complained) |
                (Complained, Resolved)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Completed | OrderStatusType::Cancelled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::WaitingForPayment => write!(f, "WaitingForPayment"),
            OrderStatusType::WaitingForAccept => write!(f, "WaitingForAccept"),
            OrderStatusType::WaitingForPickup => write!(f, "WaitingForPickup"),
            OrderStatusType::WaitingForUtilizationFee => write!(f, "WaitingForUtilizationFee"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Complained => write!(f, "Complained"),
            OrderStatusType::Resolved => write!(f, "Resolved"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WaitingForPayment" => Ok(Self::WaitingForPayment),
            "WaitingForAccept" => Ok(Self::WaitingForAccept),
            "WaitingForPickup" => Ok(Self::WaitingForPickup),
            "WaitingForUtilizationFee" => Ok(Self::WaitingForUtilizationFee),
            "Completed" => Ok(Self::Completed),
            "Complained" => Ok(Self::Complained),
            "Resolved" => Ok(Self::Resolved),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError("order status", s.to_string())),
        }
    }
}

//--------------------------------------     GarbageOrder      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GarbageOrder {
    pub id: i64,
    pub group_id: i64,
    pub pickup_option: PickupOption,
    pub container_size: Option<ContainerSize>,
    pub pickup_date: NaiveDate,
    pub drop_off_date: Option<NaiveDate>,
    pub is_high_priority: bool,
    pub collecting_service: bool,
    /// The total cost (including the prepaid utilization fee) at the time the order was submitted
    pub cost: Money,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGarbageOrder {
    pub group_id: i64,
    pub pickup_option: PickupOption,
    pub container_size: Option<ContainerSize>,
    pub pickup_date: NaiveDate,
    pub drop_off_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_high_priority: bool,
    #[serde(default)]
    pub collecting_service: bool,
    /// The user ids of everyone that shares the cost of the order
    pub participants: Vec<i64>,
}

//--------------------------------------   OrderParticipant    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderParticipant {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub share_amount: Money,
    pub has_accepted_payment: bool,
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
/// The payment methods known to the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum PaymentMethod {
    /// Mobile top-up. Adds funds to the wallet.
    Blik,
    /// Bank transfer. Pays funds out to the wallet's withdrawal account.
    Iban,
}

/// The direction of a payment. Every [`PaymentMethod`] maps onto exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentKind {
    Deposit,
    Withdrawal,
}

impl PaymentMethod {
    pub fn kind(&self) -> PaymentKind {
        match self {
            PaymentMethod::Blik => PaymentKind::Deposit,
            PaymentMethod::Iban => PaymentKind::Withdrawal,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PaymentMethod::Blik => "BLIK",
            PaymentMethod::Iban => "IBAN",
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BLIK" => Ok(Self::Blik),
            "IBAN" => Ok(Self::Iban),
            _ => Err(ConversionError("payment method", s.to_string())),
        }
    }
}

impl From<PaymentKind> for TransactionType {
    fn from(kind: PaymentKind) -> Self {
        match kind {
            PaymentKind::Deposit => TransactionType::Deposit,
            PaymentKind::Withdrawal => TransactionType::Withdrawal,
        }
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum PaymentStatus {
    /// The attempt has been recorded, but the provider round-trip has not completed yet.
    Pending,
    Completed,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

//--------------------------------------    PaymentAttempt     ---------------------------------------------------------
/// The idempotency record for a single payment request. It is written before the provider round-trip and is
/// completed in the same transaction that applies the payment to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PaymentAttempt {
    pub id: i64,
    pub idempotency_key: String,
    pub user_id: i64,
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
    pub error_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentAttempt {
    /// True if this attempt was made with the same parameters as `other`.
    pub fn matches(&self, other: &NewPaymentAttempt) -> bool {
        self.user_id == other.user_id && self.method == other.method && self.amount == other.amount
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaymentAttempt {
    pub idempotency_key: String,
    pub user_id: i64,
    pub method: PaymentMethod,
    pub amount: Money,
}
