use std::{fmt::Debug, str::FromStr, sync::Arc};

use log::*;

use crate::{
    db_types::{NewPaymentAttempt, PaymentAttempt, PaymentKind, PaymentMethod, PaymentStatus},
    events::{EventProducers, PaymentCompletedEvent},
    provider::PaymentProvider,
    traits::{PaymentCommit, PaymentGatewayDatabase},
    wpe_api::{
        errors::{ErrorCode, PaymentApiError},
        payment_objects::ProcessPaymentRequest,
    },
};

/// `PaymentApi` moves money between a user's wallet and the outside world, through the payment provider.
///
/// Every request is recorded as a payment attempt before the provider is called. The attempt is keyed by an
/// idempotency key, and is completed in the same database transaction that writes the ledger entry, so a payment is
/// applied at most once however often it is retried. If the caller goes away while the provider call is in flight,
/// the attempt simply stays pending and the ledger is untouched.
#[derive(Clone)]
pub struct PaymentApi<B> {
    db: B,
    provider: Arc<dyn PaymentProvider>,
    producers: EventProducers,
}

impl<B: Debug> Debug for PaymentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi ({:?})", self.db)
    }
}

impl<B> PaymentApi<B> {
    pub fn new(db: B, provider: Arc<dyn PaymentProvider>, producers: EventProducers) -> Self {
        Self { db, provider, producers }
    }
}

impl<B> PaymentApi<B>
where B: PaymentGatewayDatabase
{
    pub async fn process_payment(&self, request: ProcessPaymentRequest) -> Result<PaymentStatus, PaymentApiError> {
        let method = PaymentMethod::from_str(&request.method_code)
            .map_err(|_| PaymentApiError::InvalidPaymentCode(request.method_code.clone()))?;
        if !request.amount.is_positive() {
            return Err(PaymentApiError::InvalidAmount(request.amount));
        }
        let key = request.idempotency_key.clone().unwrap_or_else(new_idempotency_key);
        let new_attempt =
            NewPaymentAttempt { idempotency_key: key.clone(), user_id: request.user_id, method, amount: request.amount };
        let (attempt, inserted) = self.db.insert_payment_attempt(new_attempt.clone()).await?;
        if !inserted {
            if !attempt.matches(&new_attempt) {
                warn!("💰️ Idempotency key [{key}] was reused for a different payment");
                return Err(PaymentApiError::IdempotencyConflict(key));
            }
            match attempt.status {
                PaymentStatus::Completed => {
                    debug!("💰️ Payment [{key}] was already completed. Returning the earlier result");
                    return Ok(PaymentStatus::Completed);
                },
                PaymentStatus::Failed => return Err(previously_failed(attempt)),
                PaymentStatus::Pending => debug!("💰️ Resuming pending payment [{key}]"),
            }
        }
        if let Err(e) = self.check_preconditions(method, &request).await {
            if e.code().is_business_error() {
                self.record_failure(&key, &e).await;
            } else {
                warn!("💰️ Payment [{key}] could not be checked. It stays pending. {e}");
            }
            return Err(e);
        }
        let delay = self.provider.round_trip();
        trace!("💰️ Waiting {}ms for the payment provider", delay.as_millis());
        tokio::time::sleep(delay).await;
        match self.db.complete_payment(&key).await {
            Ok(PaymentCommit::Applied { attempt, transaction }) => {
                info!("💰️ {method} payment of {} for user {} completed", attempt.amount, attempt.user_id);
                self.call_payment_completed_hook(PaymentCompletedEvent::new(attempt, transaction)).await;
                Ok(PaymentStatus::Completed)
            },
            Ok(PaymentCommit::Replayed(_)) => Ok(PaymentStatus::Completed),
            Ok(PaymentCommit::PreviouslyFailed(attempt)) => Err(previously_failed(attempt)),
            Err(e) => {
                let e = PaymentApiError::from(e);
                if e.code().is_business_error() {
                    self.record_failure(&key, &e).await;
                } else {
                    error!("💰️ Could not commit payment [{key}]. {e}");
                }
                Err(e)
            },
        }
    }

    /// Checks that the payment can go ahead. The ledger checks the balance and the withdrawal account again when the
    /// payment is committed, so these checks only let us fail before calling the provider.
    async fn check_preconditions(
        &self,
        method: PaymentMethod,
        request: &ProcessPaymentRequest,
    ) -> Result<(), PaymentApiError> {
        let user_id = request.user_id;
        let wallet =
            self.db.fetch_wallet_for_user(user_id).await?.ok_or(PaymentApiError::WalletNotFound(user_id))?;
        match method.kind() {
            PaymentKind::Deposit => {
                if !self.provider.verify_topup_code(&request.property) {
                    return Err(PaymentApiError::InvalidTopupCode);
                }
            },
            PaymentKind::Withdrawal => {
                if wallet.withdrawal_account.is_none() {
                    return Err(PaymentApiError::MissingAccountNumber(user_id));
                }
                if wallet.funds < request.amount {
                    return Err(PaymentApiError::NotEnoughFunds { available: wallet.funds, requested: request.amount });
                }
            },
        }
        Ok(())
    }

    async fn record_failure(&self, key: &str, e: &PaymentApiError) {
        let code = e.code().to_string();
        debug!("💰️ Payment [{key}] failed. {e}");
        if let Err(err) = self.db.fail_payment_attempt(key, &code).await {
            warn!("💰️ Could not mark payment attempt [{key}] as failed. {err}");
        }
    }

    async fn call_payment_completed_hook(&self, event: PaymentCompletedEvent) {
        for emitter in &self.producers.payment_completed_producer {
            debug!("💰️ Notifying payment completed hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }
}

fn previously_failed(attempt: PaymentAttempt) -> PaymentApiError {
    let code = attempt.error_code.as_deref().and_then(|c| c.parse().ok()).unwrap_or(ErrorCode::GenericFailure);
    PaymentApiError::AttemptFailed { key: attempt.idempotency_key, code }
}

fn new_idempotency_key() -> String {
    format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::{
        db_types::Money,
        provider::MockPaymentProvider,
        test_utils::prepare_env::{prepare_test_env, random_db_path},
        traits::WalletManagement,
        SqliteDatabase,
    };

    fn provider(latency_ms: u64) -> MockPaymentProvider {
        let mut provider = MockPaymentProvider::new();
        provider.expect_round_trip().returning(move || Duration::from_millis(latency_ms));
        provider.expect_verify_topup_code().returning(|code| code.starts_with("777"));
        provider
    }

    async fn setup(provider: MockPaymentProvider) -> (PaymentApi<SqliteDatabase>, SqliteDatabase) {
        let db = prepare_test_env(&random_db_path()).await;
        db.create_wallet(1, None).await.unwrap();
        db.create_wallet(2, Some("PL61109010140000071219812874".into())).await.unwrap();
        let api = PaymentApi::new(db.clone(), Arc::new(provider), EventProducers::default());
        (api, db)
    }

    async fn balance(db: &SqliteDatabase, user_id: i64) -> Money {
        db.fetch_wallet_for_user(user_id).await.unwrap().unwrap().funds
    }

    #[tokio::test]
    async fn topup_codes_are_checked_before_the_provider_call() {
        let mut mock = MockPaymentProvider::new();
        mock.expect_verify_topup_code().times(1).returning(|_| false);
        mock.expect_round_trip().never();
        let (api, db) = setup(mock).await;
        let request = ProcessPaymentRequest::new(1, "BLIK", Money::from_major(50)).with_property("123456");
        let err = api.process_payment(request).await.unwrap_err();
        assert!(matches!(err, PaymentApiError::InvalidTopupCode));
        assert_eq!(balance(&db, 1).await, Money::ZERO);
    }

    #[tokio::test]
    async fn unknown_methods_and_bad_amounts() {
        let (api, _db) = setup(provider(0)).await;
        let err = api.process_payment(ProcessPaymentRequest::new(1, "PAYPAL", Money::from_major(5))).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPaymentCode);
        let err = api.process_payment(ProcessPaymentRequest::new(1, "BLIK", Money::from_major(-5))).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAmount);
    }

    #[tokio::test]
    async fn withdrawals_need_an_account_and_funds() {
        let (api, db) = setup(provider(0)).await;
        let err = api.process_payment(ProcessPaymentRequest::new(1, "IBAN", Money::from_major(5))).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingAccountNumber);

        let topup = ProcessPaymentRequest::new(2, "BLIK", Money::from_major(100)).with_property("777000");
        assert_eq!(api.process_payment(topup).await.unwrap(), PaymentStatus::Completed);
        let err = api.process_payment(ProcessPaymentRequest::new(2, "IBAN", Money::from_major(150))).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotEnoughFunds);
        assert_eq!(balance(&db, 2).await, Money::from_major(100));
        let wallet = db.fetch_wallet_for_user(2).await.unwrap().unwrap();
        assert_eq!(db.fetch_transactions(wallet.id).await.unwrap().len(), 1);

        let payout = ProcessPaymentRequest::new(2, "iban", Money::from_major(60));
        assert_eq!(api.process_payment(payout).await.unwrap(), PaymentStatus::Completed);
        assert_eq!(balance(&db, 2).await, Money::from_major(40));
    }

    #[tokio::test]
    async fn a_cancelled_payment_leaves_the_ledger_alone_and_can_be_retried() {
        let (api, db) = setup(provider(1000)).await;
        let request =
            ProcessPaymentRequest::new(1, "BLIK", Money::from_major(30)).with_property("777123").with_idempotency_key("k1");
        let cancelled = tokio::time::timeout(Duration::from_millis(250), api.process_payment(request.clone())).await;
        assert!(cancelled.is_err());
        assert_eq!(balance(&db, 1).await, Money::ZERO);
        let attempt = db.fetch_payment_attempt("k1").await.unwrap().unwrap();
        assert_eq!(attempt.status, PaymentStatus::Pending);

        assert_eq!(api.process_payment(request.clone()).await.unwrap(), PaymentStatus::Completed);
        assert_eq!(api.process_payment(request).await.unwrap(), PaymentStatus::Completed);
        assert_eq!(balance(&db, 1).await, Money::from_major(30));
        let wallet = db.fetch_wallet_for_user(1).await.unwrap().unwrap();
        assert_eq!(db.fetch_transactions(wallet.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn idempotency_keys_are_bound_to_their_payment() {
        let (api, _db) = setup(provider(0)).await;
        let request =
            ProcessPaymentRequest::new(1, "BLIK", Money::from_major(10)).with_property("777").with_idempotency_key("k2");
        api.process_payment(request.clone()).await.unwrap();
        let other = ProcessPaymentRequest { amount: Money::from_major(11), ..request };
        let err = api.process_payment(other).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdempotencyConflict);
    }

    #[tokio::test]
    async fn failed_attempts_are_final() {
        let (api, db) = setup(provider(0)).await;
        let payout = ProcessPaymentRequest::new(2, "IBAN", Money::from_major(20)).with_idempotency_key("k3");
        let err = api.process_payment(payout.clone()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotEnoughFunds);
        db.deposit(2, Money::from_major(50)).await.unwrap();
        let err = api.process_payment(payout).await.unwrap_err();
        assert!(matches!(err, PaymentApiError::AttemptFailed { code: ErrorCode::NotEnoughFunds, .. }));
        assert_eq!(balance(&db, 2).await, Money::from_major(50));
    }

    #[tokio::test]
    async fn storage_failures_do_not_burn_the_idempotency_key() {
        let (api, db) = setup(provider(0)).await;
        let request =
            ProcessPaymentRequest::new(1, "BLIK", Money::from_major(15)).with_property("777321").with_idempotency_key("k4");
        sqlx::query("ALTER TABLE wallets RENAME TO wallets_offline").execute(db.pool()).await.unwrap();
        let err = api.process_payment(request.clone()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::GenericFailure);
        let attempt = db.fetch_payment_attempt("k4").await.unwrap().unwrap();
        assert_eq!(attempt.status, PaymentStatus::Pending);

        sqlx::query("ALTER TABLE wallets_offline RENAME TO wallets").execute(db.pool()).await.unwrap();
        assert_eq!(api.process_payment(request).await.unwrap(), PaymentStatus::Completed);
        assert_eq!(balance(&db, 1).await, Money::from_major(15));
    }
}
