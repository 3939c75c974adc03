use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "PLN";

/// Number of minor units (grosz / cents) in one major unit.
const MINOR_UNITS: i64 = 100;

//--------------------------------------       Money         ---------------------------------------------------------
/// A fixed-point monetary amount, stored as a whole number of minor units (1/100th of the currency unit).
///
/// Money is stored in the database as an integer, so that balances never accumulate floating point error. On the wire it
/// is rendered as a decimal string with two places, e.g. `"12.50"`.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as money: {0}")]
pub struct MoneyConversionError(String);

impl Money {
    pub const ZERO: Self = Self(0);

    /// Creates a new amount from a number of minor units (cents).
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a new amount from a whole number of currency units.
    pub fn from_major(units: i64) -> Self {
        Self(units * MINOR_UNITS)
    }

    /// The amount in minor units
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Splits this amount into `parts` shares that differ by at most one cent, and that always sum to the original
    /// amount. The leftover cents go to the first shares.
    pub fn split(&self, parts: usize) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let n = parts as i64;
        let base = self.0 / n;
        let remainder = self.0 % n;
        (0..n).map(|i| Money(base + i64::from(i < remainder))).collect()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let cents = value * Decimal::from(MINOR_UNITS);
        if !cents.fract().is_zero() {
            return Err(MoneyConversionError(format!("{value} has more than two decimal places")));
        }
        cents.to_i64().map(Self).ok_or_else(|| MoneyConversionError(format!("{value} is out of range")))
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.to_decimal()
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::try_from(value).map_err(serde::de::Error::custom)
    }
}
