//! Request handler definitions
//!
//! Define each route and its handler here. Every handler turns the request into an engine command and hands it to the
//! [`Dispatcher`]. The response body is the command's [`Envelope`], and the HTTP status is the envelope's status.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Payments wait for the payment provider, so they MUST only ever
//! await that delay, never block on it.
//!
//! If a client disconnects while its payment is waiting for the provider, the handler future is dropped. The payment
//! attempt stays pending and the ledger is untouched. Retrying with the same idempotency key picks it up again.
use actix_web::{get, http::StatusCode, post, web, HttpResponse, Responder};
use log::*;
use serde::Serialize;
use wastepay_engine::{
    cost_estimator::CostEstimateRequest,
    db_types::NewGarbageOrder,
    dispatcher::{
        AcceptOrderPayment,
        CreateWallet,
        DispatchError,
        Dispatcher,
        Envelope,
        EstimateCost,
        GetBalance,
        GetTransactions,
        ProcessPayment,
        SubmitOrder,
    },
    wpe_api::payment_objects::ProcessPaymentRequest,
};

use crate::{data_objects::AcceptPaymentParams, errors::ServerError};

fn envelope_response<T: Serialize>(result: Result<Envelope<T>, DispatchError>) -> Result<HttpResponse, ServerError> {
    let envelope = result.map_err(|e| {
        error!("💻️ Request could not be dispatched. {e}");
        ServerError::from(e)
    })?;
    let status = StatusCode::from_u16(envelope.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(HttpResponse::build(status).json(envelope))
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Wallets  ----------------------------------------------------
#[get("/wallet/{user_id}/balance")]
pub async fn balance(path: web::Path<i64>, dispatcher: web::Data<Dispatcher>) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    trace!("💻️ GET balance for user {user_id}");
    envelope_response(dispatcher.dispatch(GetBalance { user_id }).await)
}

#[get("/wallet/{user_id}/transactions")]
pub async fn transactions(
    path: web::Path<i64>,
    dispatcher: web::Data<Dispatcher>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    trace!("💻️ GET transactions for user {user_id}");
    envelope_response(dispatcher.dispatch(GetTransactions { user_id }).await)
}

#[post("/wallet")]
pub async fn create_wallet(
    body: web::Json<CreateWallet>,
    dispatcher: web::Data<Dispatcher>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST create wallet for user {}", request.user_id);
    envelope_response(dispatcher.dispatch(request).await)
}

//----------------------------------------------   Pricing  ----------------------------------------------------
#[post("/estimate")]
pub async fn estimate(
    body: web::Json<CostEstimateRequest>,
    dispatcher: web::Data<Dispatcher>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ POST cost estimate for {}", body.pickup_option);
    envelope_response(dispatcher.dispatch(EstimateCost(body.into_inner())).await)
}

//----------------------------------------------   Payments  ----------------------------------------------------
/// Route handler for payments.
///
/// The body is a [`ProcessPaymentRequest`]. Top-ups (`BLIK`) need the provider's confirmation code in `property`.
/// Pay-outs (`IBAN`) go to the wallet's withdrawal account. Supply an `idempotency_key` to make retries safe.
#[post("/payment")]
pub async fn payment(
    body: web::Json<ProcessPaymentRequest>,
    dispatcher: web::Data<Dispatcher>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST {} payment of {} for user {}", request.method_code, request.amount, request.user_id);
    envelope_response(dispatcher.dispatch(ProcessPayment(request)).await)
}

//----------------------------------------------   Orders  ----------------------------------------------------
#[post("/orders")]
pub async fn submit_order(
    body: web::Json<NewGarbageOrder>,
    dispatcher: web::Data<Dispatcher>,
) -> Result<HttpResponse, ServerError> {
    let order = body.into_inner();
    debug!("💻️ POST new order for group {} with {} participants", order.group_id, order.participants.len());
    envelope_response(dispatcher.dispatch(SubmitOrder(order)).await)
}

/// A participant pays their share of the order. Paying twice is harmless: the second call changes nothing.
#[post("/orders/{order_id}/accept")]
pub async fn accept_order_payment(
    path: web::Path<i64>,
    body: web::Json<AcceptPaymentParams>,
    dispatcher: web::Data<Dispatcher>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let AcceptPaymentParams { user_id, share_amount } = body.into_inner();
    debug!("💻️ POST accept payment from user {user_id} for order #{order_id}");
    envelope_response(dispatcher.dispatch(AcceptOrderPayment { order_id, user_id, share_amount }).await)
}
