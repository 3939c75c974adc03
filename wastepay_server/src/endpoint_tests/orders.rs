use std::time::Duration;

use actix_web::http::StatusCode;
use serde_json::Value;
use wastepay_engine::{
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    WalletManagement,
};
use wastepay_common::Money;

use super::helpers::post_request;
use crate::{config::ServerConfig, server::build_dispatcher};

const ORDER: &str = r#"{
    "group_id": 12,
    "pickup_option": "Container",
    "container_size": "Medium",
    "pickup_date": "2024-01-04",
    "drop_off_date": "2024-01-01",
    "participants": [1, 2]
}"#;

#[actix_web::test]
async fn estimate_cost() {
    let db = prepare_test_env(&random_db_path()).await;
    let dispatcher = build_dispatcher(&ServerConfig::default(), db, EventProducers::default()).unwrap();
    let (status, body) = post_request("/api/estimate", ORDER, dispatcher).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"{"result":"success","data":{"base_cost":"225.00","prepaid_utilization_fee":"56.25","total_cost":"281.25"}}"#
    );
}

#[actix_web::test]
async fn submit_and_pay_for_an_order() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_env(&random_db_path()).await;
    db.create_wallet(1, None).await.unwrap();
    db.deposit(1, Money::from_major(200)).await.unwrap();
    let config = ServerConfig { provider_latency: Duration::ZERO, ..ServerConfig::default() };
    let dispatcher = build_dispatcher(&config, db.clone(), EventProducers::default()).unwrap();

    let (status, body) = post_request("/api/orders", ORDER, dispatcher.clone()).await.unwrap();
    assert_eq!(status, StatusCode::OK, "{body}");
    let submitted: Value = serde_json::from_str(&body).unwrap();
    let order_id = submitted["data"]["order"]["id"].as_i64().unwrap();
    assert_eq!(submitted["data"]["order"]["cost"], "281.25");
    assert_eq!(submitted["data"]["participants"][0]["share_amount"], "140.63");
    assert_eq!(submitted["data"]["participants"][1]["share_amount"], "140.62");

    let path = format!("/api/orders/{order_id}/accept");
    let (status, body) = post_request(&path, r#"{"user_id": 1}"#, dispatcher.clone()).await.unwrap();
    assert_eq!(status, StatusCode::OK, "{body}");
    let accepted: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(accepted["data"]["order_status"], "WaitingForPayment");
    let (status, body) = post_request(&path, r#"{"user_id": 1}"#, dispatcher.clone()).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let again: Value = serde_json::from_str(&body).unwrap();
    assert!(again["data"]["order_status"].is_null());
    let funds = db.fetch_wallet_for_user(1).await.unwrap().unwrap().funds;
    assert_eq!(funds, Money::from_cents(20000 - 14063));

    let (status, body) = post_request(&path, r#"{"user_id": 2}"#, dispatcher.clone()).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"result":"failure","code":"GenericError","status":404}"#);

    let empty = r#"{"group_id": 1, "pickup_option": "Pickup", "pickup_date": "2024-01-04", "participants": []}"#;
    let (status, body) = post_request("/api/orders", empty, dispatcher).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"result":"failure","code":"InvalidOrder","status":400}"#);
}
