mod common;

use catering_orders::application::orders::{PaymentConfirmation, SettlementRow};
use catering_orders::domain::money::Money;
use catering_orders::domain::order::{LedgerOutcome, OrderId, PaymentStatus, RecordedBy};
use catering_orders::domain::payment::{GatewayTxStatus, IntentState};
use catering_orders::error::OrderError;
use common::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn confirmation(order: OrderId, amount: Decimal, tx: &str) -> PaymentConfirmation {
    PaymentConfirmation {
        order,
        amount,
        transaction_id: tx.into(),
        method: "cbebirr".into(),
    }
}

#[tokio::test]
async fn test_paid_amount_is_the_sum_of_recorded_payments() {
    let h = harness();
    let id = h.place(dec!(50), 2).await.order.id;

    for (i, amount) in [dec!(10), dec!(25.50), dec!(4.50)].into_iter().enumerate() {
        h.service
            .record_payment(confirmation(id, amount, &format!("tx-{i}")), RecordedBy::Gateway)
            .await
            .unwrap();
    }

    let order = h.service.get_order(id).await.unwrap();
    assert_eq!(order.paid_amount, Money::new(dec!(40)));
    assert_eq!(order.ledger_total(), order.paid_amount);
    assert_eq!(order.payment_history.len(), 3);
    assert_eq!(order.payment_status, PaymentStatus::PartiallyPaid);
    assert_eq!(order.outstanding(), Money::new(dec!(60)));
}

#[tokio::test]
async fn test_payment_status_follows_the_ledger() {
    let h = harness();
    let id = h.place(dec!(50), 2).await.order.id;
    assert_eq!(
        h.service.get_order(id).await.unwrap().payment_status,
        PaymentStatus::Pending
    );

    let receipt = h
        .service
        .record_payment(confirmation(id, dec!(40), "tx-dep"), RecordedBy::Gateway)
        .await
        .unwrap();
    assert_eq!(receipt.order.payment_status, PaymentStatus::PartiallyPaid);

    let receipt = h
        .service
        .record_payment(confirmation(id, dec!(60), "tx-fin"), RecordedBy::Gateway)
        .await
        .unwrap();
    assert_eq!(receipt.order.payment_status, PaymentStatus::Paid);
    assert_eq!(receipt.order.outstanding(), Money::ZERO);
}

#[tokio::test]
async fn test_duplicate_transaction_is_counted_once() {
    let h = harness();
    let id = h.place(dec!(50), 2).await.order.id;

    let first = h
        .service
        .record_payment(confirmation(id, dec!(40), "tx-dup"), RecordedBy::Gateway)
        .await
        .unwrap();
    let second = h
        .service
        .record_payment(confirmation(id, dec!(40), "tx-dup"), RecordedBy::Settlement)
        .await
        .unwrap();

    assert_eq!(first.outcome, LedgerOutcome::Recorded);
    assert_eq!(second.outcome, LedgerOutcome::AlreadyRecorded);
    assert_eq!(second.order.paid_amount, Money::new(dec!(40)));
    assert_eq!(second.order.payment_history.len(), 1);
    assert_eq!(second.order.version, first.order.version);
}

#[tokio::test]
async fn test_non_positive_amounts_are_rejected() {
    let h = harness();
    let id = h.place(dec!(50), 2).await.order.id;

    for amount in [dec!(0), dec!(-5)] {
        let err = h
            .service
            .record_payment(confirmation(id, amount, "tx-bad"), RecordedBy::Gateway)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }
    let err = h
        .service
        .record_payment(confirmation(id, dec!(5), "  "), RecordedBy::Gateway)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
    assert!(h.service.get_order(id).await.unwrap().payment_history.is_empty());
}

#[tokio::test]
async fn test_overpayment_is_accepted_as_paid() {
    let h = harness();
    let id = h.place(dec!(50), 2).await.order.id;

    let receipt = h
        .service
        .record_payment(confirmation(id, dec!(120), "tx-over"), RecordedBy::Gateway)
        .await
        .unwrap();
    assert_eq!(receipt.order.payment_status, PaymentStatus::Paid);
    assert_eq!(receipt.order.outstanding(), Money::ZERO);
}

#[tokio::test]
async fn test_confirm_checkout_records_the_verified_deposit() {
    let h = harness();
    let placed = h.place(dec!(50), 2).await;

    let receipt = h.service.confirm_checkout(&placed.tx_ref).await.unwrap();
    assert_eq!(receipt.outcome, LedgerOutcome::Recorded);
    assert_eq!(receipt.order.paid_amount, Money::new(dec!(40)));
    assert_eq!(receipt.order.payment_history[0].transaction_id, placed.tx_ref);
    assert_eq!(receipt.order.payment_history[0].recorded_by, RecordedBy::Gateway);

    let intent = h.stores.intents.get(&placed.tx_ref).await.unwrap().unwrap();
    assert_eq!(intent.state, IntentState::Confirmed);

    let again = h.service.confirm_checkout(&placed.tx_ref).await.unwrap();
    assert_eq!(again.outcome, LedgerOutcome::AlreadyRecorded);
    assert_eq!(again.order.paid_amount, Money::new(dec!(40)));
}

#[tokio::test]
async fn test_unsettled_checkout_is_not_recorded() {
    let h = harness();
    let placed = h.place(dec!(50), 2).await;
    *h.gateway.verify_status.lock().unwrap() = Some(GatewayTxStatus::Pending);

    let err = h.service.confirm_checkout(&placed.tx_ref).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
    let order = h.service.get_order(placed.order.id).await.unwrap();
    assert_eq!(order.paid_amount, Money::ZERO);
}

#[tokio::test]
async fn test_unknown_checkout_is_not_found() {
    let h = harness();
    let err = h.service.confirm_checkout("dep-missing").await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound { .. }));
}

#[tokio::test]
async fn test_settlement_applies_good_rows_and_reports_bad_ones() {
    let h = harness();
    let placed = h.place(dec!(50), 2).await;

    let report = h
        .service
        .reconcile_settlement(vec![
            SettlementRow {
                tx_ref: placed.tx_ref.clone(),
                amount: dec!(40),
                method: "telebirr".into(),
            },
            SettlementRow {
                tx_ref: "dep-unknown".into(),
                amount: dec!(10),
                method: "telebirr".into(),
            },
            SettlementRow {
                tx_ref: placed.tx_ref.clone(),
                amount: dec!(40),
                method: "telebirr".into(),
            },
        ])
        .await;

    assert_eq!(report.applied.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "dep-unknown");

    let touched = report.touched_orders();
    assert_eq!(touched.len(), 1);
    assert_eq!(touched[0].paid_amount, Money::new(dec!(40)));
    assert_eq!(
        touched[0].payment_history[0].recorded_by,
        RecordedBy::Settlement
    );
}

#[tokio::test]
async fn test_concurrent_payments_are_not_lost() {
    let h = harness();
    let id = h.place(dec!(50), 2).await.order.id;

    let (a, b) = tokio::join!(
        h.service
            .record_payment(confirmation(id, dec!(30), "tx-a"), RecordedBy::Gateway),
        h.service
            .record_payment(confirmation(id, dec!(20), "tx-b"), RecordedBy::Gateway),
    );
    a.unwrap();
    b.unwrap();

    let order = h.service.get_order(id).await.unwrap();
    assert_eq!(order.paid_amount, Money::new(dec!(50)));
    assert_eq!(order.payment_history.len(), 2);
}
