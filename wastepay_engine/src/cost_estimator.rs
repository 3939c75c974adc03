//! Pricing for garbage orders.
//!
//! [`estimate_cost`] is a pure function of the order attributes. The estimate is recalculated whenever it is needed and
//! is never stored, apart from the total that is fixed on the order when it is submitted.
use chrono::NaiveDate;
use log::error;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use wastepay_common::Money;

use crate::db_types::{ContainerSize, NewGarbageOrder, PickupOption};

const SMALL_PICKUP_COST: i64 = 50;
const PICKUP_COST: i64 = 80;
const CONTAINER_COST: i64 = 120;
const SPECIAL_ORDER_COST: i64 = 200;
const CONTAINER_DAILY_RATE: i64 = 15;
const COLLECTING_SERVICE_FEE: i64 = 35;
/// 1.25
const PRIORITY_MULTIPLIER: Decimal = Decimal::from_parts(125, 0, 0, false, 2);
/// 1.25
const UTILIZATION_MULTIPLIER: Decimal = Decimal::from_parts(125, 0, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimateRequest {
    pub pickup_option: PickupOption,
    pub container_size: Option<ContainerSize>,
    pub drop_off_date: Option<NaiveDate>,
    pub pickup_date: NaiveDate,
    #[serde(default)]
    pub is_high_priority: bool,
    #[serde(default)]
    pub collecting_service: bool,
}

impl From<&NewGarbageOrder> for CostEstimateRequest {
    fn from(order: &NewGarbageOrder) -> Self {
        Self {
            pickup_option: order.pickup_option,
            container_size: order.container_size,
            drop_off_date: order.drop_off_date,
            pickup_date: order.pickup_date,
            is_high_priority: order.is_high_priority,
            collecting_service: order.collecting_service,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub base_cost: Money,
    pub prepaid_utilization_fee: Money,
    pub total_cost: Money,
}

fn size_fee(size: Option<ContainerSize>) -> i64 {
    match size {
        Some(ContainerSize::Small) => 40,
        Some(ContainerSize::Medium) => 60,
        Some(ContainerSize::Large) => 90,
        None => 0,
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn to_money(value: Decimal) -> Money {
    // Values are rounded to 2dp before conversion, so this can only fail on overflow
    Money::try_from(value).unwrap_or_else(|e| {
        error!("🧮️ Cost estimate overflowed. {e}");
        Money::ZERO
    })
}

/// Calculates the cost of a garbage order.
///
/// The base cost depends on the pickup option. Containers add a size fee, and a daily rate for every day the container
/// stands between drop-off and pickup. The collecting service is a flat fee, and priority orders cost 25% more. The
/// total adds the prepaid utilization fee (25% of the base cost). All rounding is to 2 decimal places, half away from
/// zero.
pub fn estimate_cost(request: &CostEstimateRequest) -> CostBreakdown {
    let mut running = match request.pickup_option {
        PickupOption::SmallPickup => SMALL_PICKUP_COST,
        PickupOption::Pickup => PICKUP_COST,
        PickupOption::Container => CONTAINER_COST + size_fee(request.container_size),
        PickupOption::SpecialOrder => SPECIAL_ORDER_COST,
    };
    if request.pickup_option == PickupOption::Container {
        if let Some(drop_off) = request.drop_off_date {
            let days = (request.pickup_date - drop_off).num_days().max(0);
            running += days * CONTAINER_DAILY_RATE;
        }
    }
    if request.collecting_service {
        running += COLLECTING_SERVICE_FEE;
    }
    let mut cost = Decimal::from(running);
    if request.is_high_priority {
        cost *= PRIORITY_MULTIPLIER;
    }
    let base_cost = round_money(cost);
    let total_with_utilization = round_money(base_cost * UTILIZATION_MULTIPLIER);
    CostBreakdown {
        base_cost: to_money(base_cost),
        prepaid_utilization_fee: to_money(total_with_utilization - base_cost),
        total_cost: to_money(total_with_utilization),
    }
}
