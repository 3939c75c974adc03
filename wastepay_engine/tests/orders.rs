use wastepay_engine::{
    db_types::{Money, OrderStatusType, TransactionType},
    test_utils::prepare_env::{new_order, prepare_test_env, random_db_path, tear_down},
    traits::{AcceptResult, OrderApiError},
    OrderApi,
    OrderManagement,
    WalletManagement,
};

#[tokio::test]
async fn shares_add_up_to_the_order_cost() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderApi::new(db.clone());
    for n in 1..=7 {
        let participants = (1..=n).collect::<Vec<i64>>();
        let submitted = api.submit_order(new_order(n, participants)).await.unwrap();
        let shares: Money = submitted.participants.iter().map(|p| p.share_amount).sum();
        assert_eq!(shares, submitted.order.cost);
        assert_eq!(submitted.order.cost, submitted.cost.total_cost);
        assert_eq!(submitted.order.status, OrderStatusType::WaitingForPayment);
        let (min, max) = submitted
            .participants
            .iter()
            .fold((i64::MAX, i64::MIN), |(lo, hi), p| (lo.min(p.share_amount.value()), hi.max(p.share_amount.value())));
        assert!(max - min <= 1, "shares differ by more than a cent: {min} {max}");
    }
    tear_down(db).await;
}

#[tokio::test]
async fn invalid_participant_lists_are_rejected() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderApi::new(db.clone());
    assert!(matches!(api.submit_order(new_order(1, vec![])).await, Err(OrderApiError::NoParticipants)));
    assert!(matches!(
        api.submit_order(new_order(1, vec![4, 5, 4])).await,
        Err(OrderApiError::DuplicateParticipant(4))
    ));
    tear_down(db).await;
}

#[tokio::test]
async fn accepting_twice_charges_once() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderApi::new(db.clone());
    db.create_wallet(1, None).await.unwrap();
    db.deposit(1, Money::from_major(200)).await.unwrap();
    let submitted = api.submit_order(new_order(3, vec![1, 2])).await.unwrap();
    let order_id = submitted.order.id;

    let first = api.accept_payment(order_id, 1, None).await.unwrap();
    assert!(first.is_new());
    let second = api.accept_payment(order_id, 1, None).await.unwrap();
    assert!(matches!(second, AcceptResult::AlreadyAccepted(_)));

    let wallet = db.fetch_wallet_for_user(1).await.unwrap().unwrap();
    let expenses = db
        .fetch_transactions(wallet.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TransactionType::GarbageExpense)
        .collect::<Vec<_>>();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, -first.participant().share_amount);
    assert_eq!(wallet.funds, Money::from_major(200) - first.participant().share_amount);
    tear_down(db).await;
}

#[tokio::test]
async fn orders_wait_for_acceptance_once_everyone_has_paid() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderApi::new(db.clone());
    for user_id in [1, 2] {
        db.create_wallet(user_id, None).await.unwrap();
        db.deposit(user_id, Money::from_major(100)).await.unwrap();
    }
    let order_id = api.submit_order(new_order(8, vec![1, 2])).await.unwrap().order.id;
    let AcceptResult::Accepted { order, .. } = api.accept_payment(order_id, 1, None).await.unwrap() else {
        panic!("Expected the first payment to be accepted");
    };
    assert_eq!(order.status, OrderStatusType::WaitingForPayment);
    let AcceptResult::Accepted { order, .. } = api.accept_payment(order_id, 2, None).await.unwrap() else {
        panic!("Expected the second payment to be accepted");
    };
    assert_eq!(order.status, OrderStatusType::WaitingForAccept);

    let (stored, participants) = api.fetch_order(order_id).await.unwrap();
    assert_eq!(stored.status, OrderStatusType::WaitingForAccept);
    assert!(participants.iter().all(|p| p.has_accepted_payment));
    tear_down(db).await;
}

#[tokio::test]
async fn a_participant_without_funds_cannot_accept() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderApi::new(db.clone());
    db.create_wallet(1, None).await.unwrap();
    let order_id = api.submit_order(new_order(2, vec![1])).await.unwrap().order.id;
    let err = api.accept_payment(order_id, 1, None).await.unwrap_err();
    assert!(matches!(err, OrderApiError::Wallet(_)), "unexpected error {err}");
    let participants = db.fetch_participants(order_id).await.unwrap();
    assert!(!participants[0].has_accepted_payment);

    let err = api.accept_payment(order_id, 77, None).await.unwrap_err();
    assert!(matches!(err, OrderApiError::ParticipantNotFound { user_id: 77, .. }));
    let err = api.accept_payment(order_id + 100, 1, None).await.unwrap_err();
    assert!(matches!(err, OrderApiError::OrderNotFound(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn explicit_shares_override_the_split() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderApi::new(db.clone());
    db.create_wallet(1, None).await.unwrap();
    db.deposit(1, Money::from_major(30)).await.unwrap();
    let order_id = api.submit_order(new_order(4, vec![1, 2])).await.unwrap().order.id;
    let result = api.accept_payment(order_id, 1, Some(Money::from_major(25))).await.unwrap();
    assert_eq!(result.participant().share_amount, Money::from_major(25));
    assert_eq!(db.fetch_wallet_for_user(1).await.unwrap().unwrap().funds, Money::from_major(5));
    let err = api.accept_payment(order_id, 2, Some(Money::from_major(-1))).await.unwrap_err();
    assert!(matches!(err, OrderApiError::InvalidShare(_)));
    tear_down(db).await;
}
