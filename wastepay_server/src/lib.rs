//! # Wastepay server
//! This crate hosts the HTTP server for the Wastepay engine. It is responsible for:
//! Accepting wallet, pricing, payment and order requests, and handing them to the engine's command dispatcher.
//! Running the reconciler that cancels unpaid orders and refunds their participants.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: The engine commands. See [routes](routes/index.html).

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod reconcile_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
