//! The external payment provider.
//!
//! There is no real gateway integration. [`SimulatedProvider`] stands in for one: it accepts any top-up confirmation
//! code that starts with `777`, and each round-trip takes a fixed amount of time.
use std::time::Duration;

/// Prefix that marks a top-up confirmation code as genuine.
pub const TOPUP_CODE_PREFIX: &str = "777";

#[cfg_attr(test, mockall::automock)]
pub trait PaymentProvider: Send + Sync {
    /// How long a call to the provider takes.
    fn round_trip(&self) -> Duration;

    /// Checks the confirmation code the provider issued for a top-up.
    fn verify_topup_code(&self, code: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    latency: Duration,
}

impl SimulatedProvider {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl PaymentProvider for SimulatedProvider {
    fn round_trip(&self) -> Duration {
        self.latency
    }

    fn verify_topup_code(&self, code: &str) -> bool {
        code.starts_with(TOPUP_CODE_PREFIX)
    }
}
