//! The payment engine public API.
//!
//! Each API object wraps a storage backend and adds the behaviour that does not belong in the backend: input
//! validation, pricing, the payment provider round-trip, logging and event hooks.
pub mod errors;
pub mod order_api;
pub mod payment_api;
pub mod payment_objects;
pub mod reconciler_api;
pub mod wallet_api;
