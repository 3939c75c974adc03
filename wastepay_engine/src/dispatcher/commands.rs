//! The commands the engine answers, and their handlers.
//!
//! Handlers are built for the SQLite backend. Every handler owns a fresh API object built from the shared
//! [`EngineContext`], and is dropped when its request completes.
use std::sync::Arc;

use futures_util::future::BoxFuture;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    cost_estimator::{estimate_cost, CostBreakdown, CostEstimateRequest},
    db_types::{Money, NewGarbageOrder, OrderParticipant, OrderStatusType, Wallet, WalletTransaction},
    dispatcher::{CommandError, DispatcherBuilder, Handler, Request, RequestScope},
    events::EventProducers,
    provider::PaymentProvider,
    traits::AcceptResult,
    wpe_api::{
        order_api::{OrderApi, SubmittedOrder},
        payment_api::PaymentApi,
        payment_objects::{BalanceResponse, PaymentResponse, ProcessPaymentRequest},
        wallet_api::WalletApi,
    },
    SqliteDatabase,
};

/// Everything a handler may need. Cloned into each handler factory.
#[derive(Clone)]
pub struct EngineContext {
    pub db: SqliteDatabase,
    pub provider: Arc<dyn PaymentProvider>,
    pub producers: EventProducers,
}

impl EngineContext {
    pub fn new(db: SqliteDatabase, provider: Arc<dyn PaymentProvider>, producers: EventProducers) -> Self {
        Self { db, provider, producers }
    }
}

//--------------------------------------       Requests        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EstimateCost(pub CostEstimateRequest);

impl Request for EstimateCost {
    type Response = CostBreakdown;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessPayment(pub ProcessPaymentRequest);

impl Request for ProcessPayment {
    type Response = PaymentResponse;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBalance {
    pub user_id: i64,
}

impl Request for GetBalance {
    type Response = BalanceResponse;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTransactions {
    pub user_id: i64,
}

impl Request for GetTransactions {
    type Response = Vec<WalletTransaction>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWallet {
    pub user_id: i64,
    #[serde(default)]
    pub withdrawal_account: Option<String>,
}

impl Request for CreateWallet {
    type Response = Wallet;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmitOrder(pub NewGarbageOrder);

impl Request for SubmitOrder {
    type Response = SubmittedOrder;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptOrderPayment {
    pub order_id: i64,
    pub user_id: i64,
    /// Overrides the share fixed when the order was submitted
    #[serde(default)]
    pub share_amount: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedPayment {
    pub participant: OrderParticipant,
    /// `None` when the participant had already paid, and nothing changed
    pub order_status: Option<OrderStatusType>,
}

impl Request for AcceptOrderPayment {
    type Response = AcceptedPayment;
}

//--------------------------------------       Handlers        ---------------------------------------------------------
pub struct EstimateCostHandler;

impl Handler<EstimateCost> for EstimateCostHandler {
    fn handle(self, request: EstimateCost) -> BoxFuture<'static, Result<CostBreakdown, CommandError>> {
        Box::pin(async move { Ok(estimate_cost(&request.0)) })
    }
}

pub struct PaymentHandler {
    api: PaymentApi<SqliteDatabase>,
    request_id: u64,
}

impl PaymentHandler {
    pub fn new(context: &EngineContext, scope: &RequestScope) -> Self {
        let api = PaymentApi::new(context.db.clone(), context.provider.clone(), context.producers.clone());
        Self { api, request_id: scope.request_id }
    }
}

impl Handler<ProcessPayment> for PaymentHandler {
    fn handle(self, request: ProcessPayment) -> BoxFuture<'static, Result<PaymentResponse, CommandError>> {
        Box::pin(async move {
            let request = request.0;
            debug!(
                "📨️ [{}] {} payment of {} for user {}",
                self.request_id, request.method_code, request.amount, request.user_id
            );
            let status = self.api.process_payment(request).await?;
            Ok(PaymentResponse { status })
        })
    }
}

pub struct WalletHandler {
    api: WalletApi<SqliteDatabase>,
    request_id: u64,
}

impl WalletHandler {
    pub fn new(db: SqliteDatabase, scope: &RequestScope) -> Self {
        Self { api: WalletApi::new(db), request_id: scope.request_id }
    }
}

impl Handler<GetBalance> for WalletHandler {
    fn handle(self, request: GetBalance) -> BoxFuture<'static, Result<BalanceResponse, CommandError>> {
        Box::pin(async move {
            let amount = self.api.balance(request.user_id).await?;
            Ok(BalanceResponse { amount })
        })
    }
}

impl Handler<GetTransactions> for WalletHandler {
    fn handle(self, request: GetTransactions) -> BoxFuture<'static, Result<Vec<WalletTransaction>, CommandError>> {
        Box::pin(async move { Ok(self.api.transactions(request.user_id).await?) })
    }
}

impl Handler<CreateWallet> for WalletHandler {
    fn handle(self, request: CreateWallet) -> BoxFuture<'static, Result<Wallet, CommandError>> {
        Box::pin(async move {
            debug!("📨️ [{}] Creating a wallet for user {}", self.request_id, request.user_id);
            Ok(self.api.create_wallet(request.user_id, request.withdrawal_account).await?)
        })
    }
}

pub struct OrderHandler {
    api: OrderApi<SqliteDatabase>,
    request_id: u64,
}

impl OrderHandler {
    pub fn new(db: SqliteDatabase, scope: &RequestScope) -> Self {
        Self { api: OrderApi::new(db), request_id: scope.request_id }
    }
}

impl Handler<SubmitOrder> for OrderHandler {
    fn handle(self, request: SubmitOrder) -> BoxFuture<'static, Result<SubmittedOrder, CommandError>> {
        Box::pin(async move {
            debug!("📨️ [{}] Submitting an order for group {}", self.request_id, request.0.group_id);
            Ok(self.api.submit_order(request.0).await?)
        })
    }
}

impl Handler<AcceptOrderPayment> for OrderHandler {
    fn handle(self, request: AcceptOrderPayment) -> BoxFuture<'static, Result<AcceptedPayment, CommandError>> {
        Box::pin(async move {
            debug!(
                "📨️ [{}] User {} accepts payment for order #{}",
                self.request_id, request.user_id, request.order_id
            );
            let result = self.api.accept_payment(request.order_id, request.user_id, request.share_amount).await?;
            let response = match result {
                AcceptResult::Accepted { participant, order, .. } => {
                    AcceptedPayment { participant, order_status: Some(order.status) }
                },
                AcceptResult::AlreadyAccepted(participant) => AcceptedPayment { participant, order_status: None },
            };
            Ok(response)
        })
    }
}

/// Registers a handler for every engine command.
pub fn register_commands(builder: DispatcherBuilder, context: EngineContext) -> DispatcherBuilder {
    let payments = context.clone();
    let wallets = context.db.clone();
    let transactions = context.db.clone();
    let new_wallets = context.db.clone();
    let orders = context.db.clone();
    let accepts = context.db;
    builder
        .register::<EstimateCost, _, _>(|_| EstimateCostHandler)
        .register::<ProcessPayment, _, _>(move |scope| PaymentHandler::new(&payments, scope))
        .register::<GetBalance, _, _>(move |scope| WalletHandler::new(wallets.clone(), scope))
        .register::<GetTransactions, _, _>(move |scope| WalletHandler::new(transactions.clone(), scope))
        .register::<CreateWallet, _, _>(move |scope| WalletHandler::new(new_wallets.clone(), scope))
        .register::<SubmitOrder, _, _>(move |scope| OrderHandler::new(orders.clone(), scope))
        .register::<AcceptOrderPayment, _, _>(move |scope| OrderHandler::new(accepts.clone(), scope))
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use chrono::NaiveDate;

    use super::*;
    use crate::{
        db_types::{PaymentStatus, PickupOption},
        dispatcher::{Dispatcher, Envelope},
        provider::SimulatedProvider,
        test_utils::prepare_env::{prepare_test_env, random_db_path},
        wpe_api::errors::ErrorCode,
    };

    async fn dispatcher() -> Dispatcher {
        let db = prepare_test_env(&random_db_path()).await;
        let provider = Arc::new(SimulatedProvider::new(Duration::ZERO));
        let context = EngineContext::new(db, provider, EventProducers::default());
        register_commands(Dispatcher::builder(), context).build().unwrap()
    }

    #[tokio::test]
    async fn every_command_has_a_handler() {
        let dispatcher = dispatcher().await;
        assert!(dispatcher.handles::<EstimateCost>());
        assert!(dispatcher.handles::<ProcessPayment>());
        assert!(dispatcher.handles::<GetBalance>());
        assert!(dispatcher.handles::<GetTransactions>());
        assert!(dispatcher.handles::<CreateWallet>());
        assert!(dispatcher.handles::<SubmitOrder>());
        assert!(dispatcher.handles::<AcceptOrderPayment>());
    }

    #[tokio::test]
    async fn handlers_are_built_for_their_request() {
        let db = prepare_test_env(&random_db_path()).await;
        let provider = Arc::new(SimulatedProvider::new(Duration::ZERO));
        let context = EngineContext::new(db.clone(), provider, EventProducers::default());
        let scope = RequestScope::new(41);
        assert_eq!(PaymentHandler::new(&context, &scope).request_id, 41);
        assert_eq!(WalletHandler::new(db.clone(), &scope).request_id, 41);
        assert_eq!(OrderHandler::new(db, &RequestScope::new(42)).request_id, 42);
    }

    #[tokio::test]
    async fn wallets_and_payments() {
        let dispatcher = dispatcher().await;
        let missing = dispatcher.dispatch(GetBalance { user_id: 7 }).await.unwrap();
        assert_eq!(missing, Envelope::Failure { code: ErrorCode::GenericError, status: 404 });

        let wallet = dispatcher.dispatch(CreateWallet { user_id: 7, withdrawal_account: None }).await.unwrap();
        assert!(wallet.is_success());
        let topup = ProcessPaymentRequest::new(7, "BLIK", Money::from_cents(1250)).with_property("777555");
        let paid = dispatcher.dispatch(ProcessPayment(topup)).await.unwrap();
        assert_eq!(paid, Envelope::success(PaymentResponse { status: PaymentStatus::Completed }));
        let balance = dispatcher.dispatch(GetBalance { user_id: 7 }).await.unwrap();
        assert_eq!(balance, Envelope::success(BalanceResponse { amount: Money::from_cents(1250) }));

        let payout = ProcessPaymentRequest::new(7, "IBAN", Money::from_major(5));
        let refused = dispatcher.dispatch(ProcessPayment(payout)).await.unwrap();
        assert_eq!(refused, Envelope::Failure { code: ErrorCode::MissingAccountNumber, status: 422 });
        let history = dispatcher.dispatch(GetTransactions { user_id: 7 }).await.unwrap().into_result().unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn orders_are_priced_and_paid() {
        let dispatcher = dispatcher().await;
        let estimate = EstimateCost(CostEstimateRequest {
            pickup_option: PickupOption::Pickup,
            container_size: None,
            drop_off_date: None,
            pickup_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            is_high_priority: false,
            collecting_service: false,
        });
        let cost = dispatcher.dispatch(estimate).await.unwrap().into_result().unwrap();
        assert_eq!(cost.total_cost, Money::from_major(100));

        for user_id in [1, 2, 3] {
            dispatcher.dispatch(CreateWallet { user_id, withdrawal_account: None }).await.unwrap();
            let topup = ProcessPaymentRequest::new(user_id, "BLIK", Money::from_major(50)).with_property("777");
            dispatcher.dispatch(ProcessPayment(topup)).await.unwrap();
        }
        let order = NewGarbageOrder {
            group_id: 10,
            pickup_option: PickupOption::Pickup,
            container_size: None,
            pickup_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            drop_off_date: None,
            is_high_priority: false,
            collecting_service: false,
            participants: vec![1, 2, 3],
        };
        let submitted = dispatcher.dispatch(SubmitOrder(order)).await.unwrap().into_result().unwrap();
        let shares: Money = submitted.participants.iter().map(|p| p.share_amount).sum();
        assert_eq!(shares, submitted.order.cost);

        let order_id = submitted.order.id;
        let accepted = dispatcher
            .dispatch(AcceptOrderPayment { order_id, user_id: 2, share_amount: None })
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert!(accepted.participant.has_accepted_payment);
        assert_eq!(accepted.order_status, Some(OrderStatusType::WaitingForPayment));
        let again = dispatcher
            .dispatch(AcceptOrderPayment { order_id, user_id: 2, share_amount: None })
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(again.order_status, None);

        let stranger = dispatcher.dispatch(AcceptOrderPayment { order_id, user_id: 9, share_amount: None }).await;
        assert_eq!(stranger.unwrap().into_result().unwrap_err(), ErrorCode::GenericError);
    }
}
