//! Ledger flows against the in-memory store with scripted adapters.

use rust_decimal::Decimal;
use std::sync::Arc;

use super::*;
use crate::adapter::mock::MockGateway;
use crate::adapter::{AdapterRegistry, GatewayOutcome, Instructions, ManualTransfer};
use crate::auth::Identity;
use crate::balance::{BalanceLedger, PayoutTable};
use crate::config::ManualConfig;
use crate::error::PaymentError;
use crate::notify::OrderPaymentState;
use crate::notify::mock::RecordingSink;
use crate::store::{LedgerStore, MemoryStore, PaymentStore};
use crate::vault::test_vault;

const BUYER: UserId = 1001;
const SELLER: UserId = 2002;
const REVIEWER: UserId = 9001;

struct TestHarness {
    ledger: Arc<PaymentLedger>,
    store: Arc<MemoryStore>,
    balances: Arc<BalanceLedger>,
    hosted: Arc<MockGateway>,
    sink: Arc<RecordingSink>,
}

impl TestHarness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn LedgerStore> = store.clone();
        let hosted = Arc::new(MockGateway::new());
        let manual = Arc::new(ManualTransfer::new(ManualConfig::default()));

        let mut adapters = AdapterRegistry::new();
        adapters.register(PaymentMethod::HostedCard, hosted.clone());
        adapters.register(PaymentMethod::HostedWallet, hosted.clone());
        adapters.register(PaymentMethod::ManualBankTransfer, manual.clone());
        adapters.register(PaymentMethod::ManualWalletTransfer, manual);

        let balances = Arc::new(BalanceLedger::new(dyn_store.clone(), PayoutTable::default()));
        let sink = Arc::new(RecordingSink::default());
        let ledger = Arc::new(PaymentLedger::new(
            dyn_store,
            adapters,
            Arc::new(test_vault()),
            balances.clone(),
            sink.clone(),
        ));

        Self {
            ledger,
            store,
            balances,
            hosted,
            sink,
        }
    }

    fn request(method: PaymentMethod, amount: Decimal, currency: &str) -> CreatePayment {
        CreatePayment {
            user_id: BUYER,
            recipient_id: Some(SELLER),
            order_id: Some("ORD-1".into()),
            payment_type: PaymentType::Order,
            method,
            amount,
            currency: currency.into(),
            details: SensitiveDetails::default(),
            context: RequestContext::new("203.0.113.7", "test-agent/1.0"),
        }
    }

    async fn manual_payment(&self) -> Payment {
        self.ledger
            .create_payment(Self::request(
                PaymentMethod::ManualBankTransfer,
                Decimal::from(100_000),
                "IDR",
            ))
            .await
            .unwrap()
            .payment
    }

    async fn hosted_payment(&self) -> Payment {
        self.ledger
            .create_payment(Self::request(
                PaymentMethod::HostedCard,
                Decimal::new(1250, 2),
                "usd",
            ))
            .await
            .unwrap()
            .payment
    }

    fn proof() -> SensitiveDetails {
        SensitiveDetails {
            proof_image_ref: Some("uploads/proof/1.png".into()),
            payer_account_name: Some("Budi".into()),
            payer_account_number: Some("1234567890".into()),
            ..Default::default()
        }
    }
}

// ========================================================================
// Manual flow
// ========================================================================

#[tokio::test]
async fn test_manual_happy_path_credits_recipient() {
    let h = TestHarness::new();
    let payment = h.manual_payment().await;
    assert_eq!(payment.status, PaymentStatus::PendingVerification);
    assert!(payment.gateway_ref.as_deref().unwrap().starts_with("MAN-"));

    let submitted = h
        .ledger
        .submit_proof(
            payment.id,
            &Identity::user(BUYER),
            TestHarness::proof(),
            RequestContext::new("198.51.100.2", "mobile/2.0"),
        )
        .await
        .unwrap();
    assert_eq!(submitted.status, PaymentStatus::Processing);
    assert_eq!(submitted.confirmed_from.ip.as_deref(), Some("198.51.100.2"));
    assert!(
        submitted
            .sealed
            .payer_account_number
            .as_deref()
            .unwrap()
            .starts_with("v1.")
    );

    let reviewed = h
        .ledger
        .review(payment.id, &Identity::reviewer(REVIEWER), ReviewDecision::Approve)
        .await
        .unwrap();
    assert_eq!(reviewed.status, PaymentStatus::Completed);
    assert_eq!(reviewed.reviewed_by, Some(REVIEWER));
    assert!(reviewed.completed_at.is_some());

    let balance = h.balances.balance(SELLER).await.unwrap();
    assert_eq!(balance.available(), Decimal::from(80_000));
    assert_eq!(balance.lifetime_earned(), Decimal::from(80_000));

    let statuses: Vec<_> = h.sink.events().iter().map(|e| e.new_status).collect();
    assert_eq!(
        statuses,
        vec![PaymentStatus::Processing, PaymentStatus::Completed]
    );
    let orders: Vec<_> = h.sink.orders().iter().map(|o| o.state).collect();
    assert_eq!(
        orders,
        vec![OrderPaymentState::Processing, OrderPaymentState::Paid]
    );
}

#[tokio::test]
async fn test_manual_instructions_returned() {
    let h = TestHarness::new();
    let created = h
        .ledger
        .create_payment(TestHarness::request(
            PaymentMethod::ManualWalletTransfer,
            Decimal::from(75_000),
            "IDR",
        ))
        .await
        .unwrap();
    match created.intent.instructions {
        Instructions::Manual(instructions) => {
            assert_eq!(instructions.provider, "DANA");
            assert_eq!(instructions.reference_code.len(), 8);
        }
        other => panic!("expected manual instructions, got {:?}", other),
    }
}

#[tokio::test]
async fn test_review_rejection_does_not_credit() {
    let h = TestHarness::new();
    let payment = h.manual_payment().await;
    h.ledger
        .submit_proof(
            payment.id,
            &Identity::user(BUYER),
            TestHarness::proof(),
            RequestContext::default(),
        )
        .await
        .unwrap();

    let err = h
        .ledger
        .review(
            payment.id,
            &Identity::reviewer(REVIEWER),
            ReviewDecision::Reject { reason: "  ".into() },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let rejected = h
        .ledger
        .review(
            payment.id,
            &Identity::reviewer(REVIEWER),
            ReviewDecision::Reject {
                reason: "proof unreadable".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, PaymentStatus::Failed);
    assert_eq!(rejected.failure_reason.as_deref(), Some("proof unreadable"));
    assert_eq!(
        h.balances.balance(SELLER).await.unwrap().available(),
        Decimal::ZERO
    );
}

#[tokio::test]
async fn test_proof_requires_image_and_owner() {
    let h = TestHarness::new();
    let payment = h.manual_payment().await;

    let err = h
        .ledger
        .submit_proof(
            payment.id,
            &Identity::user(BUYER),
            SensitiveDetails::default(),
            RequestContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));

    let err = h
        .ledger
        .submit_proof(
            payment.id,
            &Identity::user(SELLER),
            TestHarness::proof(),
            RequestContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Forbidden(_)));
}

#[tokio::test]
async fn test_double_proof_is_invalid_transition() {
    let h = TestHarness::new();
    let payment = h.manual_payment().await;
    let buyer = Identity::user(BUYER);
    h.ledger
        .submit_proof(payment.id, &buyer, TestHarness::proof(), RequestContext::default())
        .await
        .unwrap();
    let err = h
        .ledger
        .submit_proof(payment.id, &buyer, TestHarness::proof(), RequestContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_review_guards() {
    let h = TestHarness::new();
    let payment = h.manual_payment().await;

    // Not yet processing
    let err = h
        .ledger
        .review(payment.id, &Identity::reviewer(REVIEWER), ReviewDecision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidTransition(_)));

    h.ledger
        .submit_proof(
            payment.id,
            &Identity::user(BUYER),
            TestHarness::proof(),
            RequestContext::default(),
        )
        .await
        .unwrap();

    let err = h
        .ledger
        .review(payment.id, &Identity::user(SELLER), ReviewDecision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Forbidden(_)));

    let err = h
        .ledger
        .review(payment.id, &Identity::reviewer(BUYER), ReviewDecision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Forbidden(_)));

    // The recipient cannot approve their own credit either
    let err = h
        .ledger
        .review(payment.id, &Identity::reviewer(SELLER), ReviewDecision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Forbidden(_)));
    let current = h.store.get_payment(payment.id).await.unwrap().unwrap();
    assert_eq!(current.status, PaymentStatus::Processing);
    assert_eq!(
        h.balances.balance(SELLER).await.unwrap().available(),
        Decimal::ZERO
    );
}

#[tokio::test]
async fn test_concurrent_reviews_credit_once() {
    let h = TestHarness::new();
    let payment = h.manual_payment().await;
    h.ledger
        .submit_proof(
            payment.id,
            &Identity::user(BUYER),
            TestHarness::proof(),
            RequestContext::default(),
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let ledger = h.ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .review(
                    payment.id,
                    &Identity::reviewer(REVIEWER + i),
                    ReviewDecision::Approve,
                )
                .await
        }));
    }
    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            ok += 1;
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(
        h.balances.balance(SELLER).await.unwrap().available(),
        Decimal::from(80_000)
    );
}

// ========================================================================
// Hosted flow
// ========================================================================

#[tokio::test]
async fn test_hosted_create_normalizes_currency() {
    let h = TestHarness::new();
    let payment = h.hosted_payment().await;
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.currency, "USD");
    assert_eq!(payment.created_from.ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(h.hosted.create_count(), 1);
}

#[tokio::test]
async fn test_create_failure_persists_nothing() {
    let h = TestHarness::new();
    h.hosted
        .set_fail_create(Some(PaymentError::GatewayUnavailable("down".into())));
    let err = h
        .ledger
        .create_payment(TestHarness::request(
            PaymentMethod::HostedCard,
            Decimal::from(10),
            "USD",
        ))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(
        h.store
            .list_payments_by_status(PaymentStatus::Pending, 10)
            .await
            .unwrap()
            .is_empty()
    );

    // Below adapter minimum: never reaches the provider
    h.hosted.set_fail_create(None);
    let err = h
        .ledger
        .create_payment(TestHarness::request(
            PaymentMethod::HostedCard,
            Decimal::new(10, 2),
            "USD",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));
    assert_eq!(h.hosted.create_count(), 1);
}

#[tokio::test]
async fn test_gateway_outcome_applied_once() {
    let h = TestHarness::new();
    let payment = h.hosted_payment().await;
    let gateway_ref = payment.gateway_ref.clone().unwrap();
    let reported = ProviderAmount {
        minor: 1250,
        currency: "usd".into(),
    };

    let first = h
        .ledger
        .apply_gateway_outcome(&gateway_ref, &GatewayOutcome::Succeeded, Some(&reported))
        .await
        .unwrap();
    assert_eq!(first, ReconcileOutcome::Applied);

    let replay = h
        .ledger
        .apply_gateway_outcome(&gateway_ref, &GatewayOutcome::Succeeded, Some(&reported))
        .await
        .unwrap();
    assert_eq!(replay, ReconcileOutcome::AlreadyApplied);

    let late_failure = h
        .ledger
        .apply_gateway_outcome(
            &gateway_ref,
            &GatewayOutcome::Failed { reason: None },
            None,
        )
        .await
        .unwrap();
    assert_eq!(late_failure, ReconcileOutcome::Conflict);

    let balance = h.balances.balance(SELLER).await.unwrap();
    assert_eq!(balance.available(), Decimal::new(1000, 2));
}

#[tokio::test]
async fn test_gateway_outcome_edge_cases() {
    let h = TestHarness::new();
    let hosted = h.hosted_payment().await;
    let manual = h.manual_payment().await;

    let unknown = h
        .ledger
        .apply_gateway_outcome("pi_unknown", &GatewayOutcome::Succeeded, None)
        .await
        .unwrap();
    assert_eq!(unknown, ReconcileOutcome::NotFound);

    let pending = h
        .ledger
        .apply_gateway_outcome(
            hosted.gateway_ref.as_deref().unwrap(),
            &GatewayOutcome::Pending,
            None,
        )
        .await
        .unwrap();
    assert_eq!(pending, ReconcileOutcome::Ignored);

    let mismatch = h
        .ledger
        .apply_gateway_outcome(
            hosted.gateway_ref.as_deref().unwrap(),
            &GatewayOutcome::Succeeded,
            Some(&ProviderAmount {
                minor: 999,
                currency: "USD".into(),
            }),
        )
        .await
        .unwrap();
    assert_eq!(mismatch, ReconcileOutcome::Conflict);

    let on_manual = h
        .ledger
        .apply_gateway_outcome(
            manual.gateway_ref.as_deref().unwrap(),
            &GatewayOutcome::Succeeded,
            None,
        )
        .await
        .unwrap();
    assert_eq!(on_manual, ReconcileOutcome::Conflict);

    let current = h.store.get_payment(hosted.id).await.unwrap().unwrap();
    assert_eq!(current.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_concurrent_outcomes_apply_once() {
    let h = TestHarness::new();
    let payment = h.hosted_payment().await;
    let gateway_ref = payment.gateway_ref.clone().unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let ledger = h.ledger.clone();
        let gateway_ref = gateway_ref.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .apply_gateway_outcome(&gateway_ref, &GatewayOutcome::Succeeded, None)
                .await
                .unwrap()
        }));
    }
    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            ReconcileOutcome::Applied => applied += 1,
            ReconcileOutcome::AlreadyApplied => {}
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(
        h.balances.balance(SELLER).await.unwrap().available(),
        Decimal::new(1000, 2)
    );
}

#[tokio::test]
async fn test_sync_with_gateway() {
    let h = TestHarness::new();
    let payment = h.hosted_payment().await;
    let buyer = Identity::user(BUYER);

    let (outcome, current) = h.ledger.sync_with_gateway(payment.id, &buyer).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Ignored);
    assert_eq!(current.status, PaymentStatus::Pending);

    h.hosted.set_outcome(GatewayOutcome::Cancelled);
    let (outcome, current) = h.ledger.sync_with_gateway(payment.id, &buyer).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied);
    assert_eq!(current.status, PaymentStatus::Cancelled);

    // Terminal: no provider call
    let calls = h.hosted.confirm_count();
    h.ledger.sync_with_gateway(payment.id, &buyer).await.unwrap();
    assert_eq!(h.hosted.confirm_count(), calls);
}

// ========================================================================
// Refunds, reads
// ========================================================================

#[tokio::test]
async fn test_partial_then_full_refund() {
    let h = TestHarness::new();
    let payment = h.hosted_payment().await;
    h.ledger
        .apply_gateway_outcome(
            payment.gateway_ref.as_deref().unwrap(),
            &GatewayOutcome::Succeeded,
            None,
        )
        .await
        .unwrap();
    let admin = Identity::admin(1);

    let err = h
        .ledger
        .refund(payment.id, &Identity::reviewer(REVIEWER), Decimal::ONE)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Forbidden(_)));

    let partial = h
        .ledger
        .refund(payment.id, &admin, Decimal::new(250, 2))
        .await
        .unwrap();
    assert_eq!(partial.status, PaymentStatus::PartiallyRefunded);
    assert_eq!(partial.refundable(), Decimal::from(10));

    let err = h
        .ledger
        .refund(payment.id, &admin, Decimal::new(1001, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));

    let full = h
        .ledger
        .refund(payment.id, &admin, Decimal::from(10))
        .await
        .unwrap();
    assert_eq!(full.status, PaymentStatus::Refunded);
    assert_eq!(full.refund_amount, full.amount);

    let err = h
        .ledger
        .refund(payment.id, &admin, Decimal::new(1, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));
}

#[tokio::test]
async fn test_refund_of_pending_is_invalid() {
    let h = TestHarness::new();
    let payment = h.hosted_payment().await;
    let err = h
        .ledger
        .refund(payment.id, &Identity::admin(1), Decimal::ONE)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_visibility_and_decryption() {
    let h = TestHarness::new();
    let payment = h.manual_payment().await;
    h.ledger
        .submit_proof(
            payment.id,
            &Identity::user(BUYER),
            TestHarness::proof(),
            RequestContext::default(),
        )
        .await
        .unwrap();

    assert!(h.ledger.get_payment(payment.id, &Identity::user(SELLER)).await.is_ok());
    let err = h
        .ledger
        .get_payment(payment.id, &Identity::user(4242))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NotFound(_)));

    let details = h
        .ledger
        .decrypt_sensitive(payment.id, &Identity::reviewer(REVIEWER))
        .await
        .unwrap();
    assert_eq!(details, TestHarness::proof());

    let err = h
        .ledger
        .decrypt_sensitive(payment.id, &Identity::user(SELLER))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Forbidden(_)));

    let queue = h
        .ledger
        .list_by_status(PaymentStatus::Processing, &Identity::reviewer(REVIEWER), 10)
        .await
        .unwrap();
    assert_eq!(queue.len(), 1);
    assert!(
        h.ledger
            .list_by_status(PaymentStatus::Processing, &Identity::user(BUYER), 10)
            .await
            .is_err()
    );
}
