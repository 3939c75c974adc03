//! # Command dispatcher
//!
//! Every request that enters the engine from the outside goes through a [`Dispatcher`]. Each request type has exactly
//! one handler, registered once at startup on a [`DispatcherBuilder`]. Registering a second handler for the same
//! request type is a configuration error reported by [`DispatcherBuilder::build`], and dispatching a request type that
//! has no handler fails with [`DispatchError::NoHandler`]. Neither is a business failure.
//!
//! A fresh handler is built for every call, from a fresh [`RequestScope`], so no handler state survives a request.
//! Business errors come back inside the [`Envelope`] along with their HTTP status.
#[cfg(feature = "sqlite")]
mod commands;
mod envelope;
mod registry;

use std::time::Instant;

#[cfg(feature = "sqlite")]
pub use commands::{
    register_commands,
    AcceptOrderPayment,
    AcceptedPayment,
    CreateWallet,
    EngineContext,
    EstimateCost,
    GetBalance,
    GetTransactions,
    ProcessPayment,
    SubmitOrder,
};
pub use envelope::Envelope;
use futures_util::future::BoxFuture;
pub use registry::{DispatchError, Dispatcher, DispatcherBuilder};
use thiserror::Error;

use crate::{
    traits::{OrderApiError, PaymentGatewayError, WalletApiError},
    wpe_api::errors::{ErrorCode, PaymentApiError},
};

/// A request that can be dispatched. `Response` is the payload of a successful [`Envelope`].
pub trait Request: Send + 'static {
    type Response: Send + 'static;
}

/// Handles a single request. Handlers are consumed by the call.
pub trait Handler<R: Request>: Send + 'static {
    fn handle(self, request: R) -> BoxFuture<'static, Result<R::Response, CommandError>>;
}

/// Per-call context. A new scope is created for every dispatch.
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub request_id: u64,
    pub started_at: Instant,
}

impl RequestScope {
    pub fn new(request_id: u64) -> Self {
        Self { request_id, started_at: Instant::now() }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error("{code}: {message}")]
    Business { code: ErrorCode, message: String },
    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),
}

impl CommandError {
    pub fn business<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self::Business { code, message: message.into() }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CommandError::Business { code, .. } => *code,
            CommandError::Infrastructure(_) => ErrorCode::GenericFailure,
        }
    }

    fn from_code<E: std::error::Error>(code: ErrorCode, e: E) -> Self {
        if code.is_business_error() {
            CommandError::Business { code, message: e.to_string() }
        } else {
            CommandError::Infrastructure(e.to_string())
        }
    }
}

impl From<PaymentApiError> for CommandError {
    fn from(e: PaymentApiError) -> Self {
        CommandError::from_code(e.code(), e)
    }
}

impl From<WalletApiError> for CommandError {
    fn from(e: WalletApiError) -> Self {
        CommandError::from_code(e.code(), e)
    }
}

impl From<OrderApiError> for CommandError {
    fn from(e: OrderApiError) -> Self {
        CommandError::from_code(e.code(), e)
    }
}

impl From<PaymentGatewayError> for CommandError {
    fn from(e: PaymentGatewayError) -> Self {
        CommandError::from_code(e.code(), e)
    }
}
