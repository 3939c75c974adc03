use actix_web::http::StatusCode;
use chrono::{TimeZone, Utc};
use wastepay_common::Money;
use wastepay_engine::{
    db_types::{TransactionType, Wallet, WalletTransaction},
    dispatcher::{CommandError, CreateWallet, Dispatcher, GetBalance, GetTransactions},
    wpe_api::{errors::ErrorCode, payment_objects::BalanceResponse},
};

use super::helpers::{get_request, post_request};

fn dispatcher() -> Dispatcher {
    Dispatcher::builder()
        .register_fn(|req: GetBalance| async move {
            match req.user_id {
                1 => Ok(BalanceResponse { amount: Money::from_cents(1250) }),
                2 => Err(CommandError::Infrastructure("database is locked".into())),
                _ => Err(CommandError::business(ErrorCode::GenericError, "no wallet")),
            }
        })
        .register_fn(|req: GetTransactions| async move {
            let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
            Ok::<_, CommandError>(vec![WalletTransaction {
                id: 1,
                wallet_id: req.user_id,
                amount: Money::from_major(20),
                kind: TransactionType::Deposit,
                created_at,
            }])
        })
        .register_fn(|req: CreateWallet| async move {
            let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
            Ok::<_, CommandError>(Wallet {
                id: 10,
                user_id: req.user_id,
                funds: Money::ZERO,
                withdrawal_account: req.withdrawal_account,
                created_at,
                updated_at: created_at,
            })
        })
        .build()
        .unwrap()
}

#[actix_web::test]
async fn health() {
    let (status, body) = get_request("/health", dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn fetch_balance() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/api/wallet/1/balance", dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"result":"success","data":{"amount":"12.50"}}"#);
}

#[actix_web::test]
async fn fetch_balance_without_wallet() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/api/wallet/3/balance", dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"result":"failure","code":"GenericError","status":404}"#);
}

#[actix_web::test]
async fn backend_failures_are_generic() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/api/wallet/2/balance", dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"result":"failure","code":"GenericFailure","status":500}"#);
}

#[actix_web::test]
async fn fetch_transactions() {
    let (status, body) = get_request("/api/wallet/4/transactions", dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(r#"{"result":"success","data":[{"id":1,"wallet_id":4,"amount":"20.00","kind":"Deposit""#));
}

#[actix_web::test]
async fn create_wallet() {
    let body = r#"{"user_id": 8, "withdrawal_account": "PL61109010140000071219812874"}"#;
    let (status, body) = post_request("/api/wallet", body, dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""user_id":8"#));
    assert!(body.contains(r#""withdrawal_account":"PL61109010140000071219812874""#));
}

#[actix_web::test]
async fn bad_paths_are_rejected() {
    let (status, _) = get_request("/api/wallet/alice/balance", dispatcher()).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}
