use std::time::Duration;

use actix_web::http::StatusCode;
use wastepay_engine::{
    db_types::PaymentStatus,
    dispatcher::{CommandError, Dispatcher, EstimateCost, ProcessPayment},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    wpe_api::{errors::ErrorCode, payment_objects::PaymentResponse},
};

use super::helpers::{get_request, post_request};
use crate::{config::ServerConfig, server::build_dispatcher};

fn dispatcher() -> Dispatcher {
    Dispatcher::builder()
        .register_fn(|req: ProcessPayment| async move {
            let request = req.0;
            match request.method_code.as_str() {
                "BLIK" => Ok(PaymentResponse { status: PaymentStatus::Completed }),
                "IBAN" => Err(CommandError::business(ErrorCode::NotEnoughFunds, "not enough funds")),
                _ => Err(CommandError::business(ErrorCode::InvalidPaymentCode, request.method_code)),
            }
        })
        .build()
        .unwrap()
}

#[actix_web::test]
async fn successful_payment() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"user_id": 1, "method_code": "BLIK", "amount": "25.00", "property": "777123"}"#;
    let (status, body) = post_request("/api/payment", body, dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"result":"success","data":{"status":"Completed"}}"#);
}

#[actix_web::test]
async fn business_failures_carry_their_status() {
    let body = r#"{"user_id": 1, "method_code": "IBAN", "amount": "150.00"}"#;
    let (status, body) = post_request("/api/payment", body, dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body, r#"{"result":"failure","code":"NotEnoughFunds","status":402}"#);

    let body = r#"{"user_id": 1, "method_code": "PAYPAL", "amount": "1.00"}"#;
    let (status, body) = post_request("/api/payment", body, dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"result":"failure","code":"InvalidPaymentCode","status":400}"#);
}

#[actix_web::test]
async fn malformed_bodies_are_rejected() {
    let (status, body) = post_request("/api/payment", r#"{"user_id": "#, dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"error":"Could not read request body"#), "{body}");
}

#[actix_web::test]
async fn commands_without_a_handler_are_server_errors() {
    let body = r#"{"pickup_option": "Pickup", "pickup_date": "2024-06-01"}"#;
    let (status, body) = post_request("/api/estimate", body, dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("No handler is registered"), "{body}");
    assert!(body.contains(std::any::type_name::<EstimateCost>()), "{body}");
}

#[actix_web::test]
async fn top_up_and_check_the_balance() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_env(&random_db_path()).await;
    let config = ServerConfig { provider_latency: Duration::ZERO, ..ServerConfig::default() };
    let dispatcher = build_dispatcher(&config, db, EventProducers::default()).unwrap();

    let (status, _) = post_request("/api/wallet", r#"{"user_id": 5}"#, dispatcher.clone()).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let payment = r#"{"user_id": 5, "method_code": "blik", "amount": "40.00", "property": "777999",
                      "idempotency_key": "topup-5-1"}"#;
    for _ in 0..2 {
        let (status, body) = post_request("/api/payment", payment, dispatcher.clone()).await.unwrap();
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    let (status, body) = get_request("/api/wallet/5/balance", dispatcher.clone()).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"result":"success","data":{"amount":"40.00"}}"#);

    let bad_code = r#"{"user_id": 5, "method_code": "BLIK", "amount": "10.00", "property": "123"}"#;
    let (status, body) = post_request("/api/payment", bad_code, dispatcher.clone()).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"result":"failure","code":"InvalidTopupCode","status":400}"#);

    let payout = r#"{"user_id": 5, "method_code": "IBAN", "amount": "10.00"}"#;
    let (status, body) = post_request("/api/payment", payout, dispatcher).await.unwrap();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, r#"{"result":"failure","code":"MissingAccountNumber","status":422}"#);
}
