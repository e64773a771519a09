mod support;

use ltx_common::Money;
use ticket_invoice_engine::{
    db_types::{PaymentId, TransactionSide},
    helpers::{is_valid_invoice_number, InvoicePeriod},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    DatabaseError,
    InvoiceFlowApi,
    InvoiceFlowError,
    InvoicingDatabase,
    PreviewResult,
    RecordLookup,
    SqliteDatabase,
    SqliteDatabaseError,
};

async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

#[tokio::test]
async fn finalize_issues_numbered_invoice_with_transaction_rows() {
    let db = new_test_db().await;
    db.upsert_payment(support::stripe_payment("pay-001", "pi_abc123", 10_000)).await.unwrap();
    db.upsert_registration(support::registration_with_tickets("reg-001", "Winter Gala", "pi_abc123")).await.unwrap();
    let api = InvoiceFlowApi::new(db);
    let id = PaymentId("pay-001".to_string());

    let preview = match api.preview(&id).await.unwrap() {
        PreviewResult::Ready(p) => *p,
        other => panic!("Expected a ready preview, got {other:?}"),
    };
    assert_eq!(preview.customer_invoice.total, Money::from_cents(10_000));

    let receipt = api.finalize(preview).await.unwrap();
    let yymm = InvoicePeriod::current().yymm();
    assert_eq!(receipt.invoice_number, format!("LTIV-{yymm}001"));
    assert_eq!(receipt.supplier_number, format!("LTSP-{yymm}001"));
    assert!(is_valid_invoice_number(&receipt.invoice_number));
    // 2 ticket lines on the customer copy, the same 2 plus the fee line on the supplier copy, ids dense from 1.
    assert_eq!(receipt.transaction_ids, vec![1, 2, 3, 4, 5]);

    let rows = api.db().fetch_transactions_for_invoice(&receipt.invoice_number).await.unwrap();
    assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), receipt.transaction_ids);
    let customer_total: Money =
        rows.iter().filter(|r| r.side == TransactionSide::Customer).map(|r| r.amount).sum();
    assert_eq!(customer_total, Money::from_cents(10_000));
    // Stripe estimate on $100.00 is $3.20, so the supplier side nets out lower.
    let supplier_total: Money =
        rows.iter().filter(|r| r.side == TransactionSide::Supplier).map(|r| r.amount).sum();
    assert_eq!(supplier_total, Money::from_cents(10_000 - 320));

    // The pair is interchangeable for lookups.
    let invoice = api.db().fetch_invoice_by_number(&receipt.supplier_number).await.unwrap().unwrap();
    assert_eq!(invoice.invoice_number, receipt.invoice_number);
    assert!(invoice.finalized);
}

#[tokio::test]
async fn finalize_is_idempotent() {
    let db = new_test_db().await;
    db.upsert_payment(support::square_payment("pay-002", "SQTOKEN42", 6_000)).await.unwrap();
    db.upsert_registration(support::bare_registration("reg-002", "Open Mic", "SQTOKEN42")).await.unwrap();
    let api = InvoiceFlowApi::new(db);
    let id = PaymentId("pay-002".to_string());

    let receipt = api.finalize_payment(&id).await.unwrap();
    // Repeat calls return the same reference and create nothing new.
    let again = api.finalize_payment(&id).await.unwrap();
    assert_eq!(receipt, again);
    match api.preview(&id).await.unwrap() {
        PreviewResult::AlreadyFinalized(existing) => assert_eq!(existing, receipt),
        other => panic!("Expected the existing invoice reference, got {other:?}"),
    }
    let rows = api.db().fetch_transactions_for_invoice(&receipt.invoice_number).await.unwrap();
    assert_eq!(rows.len(), receipt.transaction_ids.len());
}

#[tokio::test]
async fn abandoned_numbers_are_never_reused() {
    let db = new_test_db().await;
    db.upsert_payment(support::stripe_payment("pay-003", "pi_first", 5_000)).await.unwrap();
    db.upsert_registration(support::registration_with_tickets("reg-003", "Winter Gala", "pi_first")).await.unwrap();
    db.upsert_payment(support::stripe_payment("pay-004", "pi_second", 5_000)).await.unwrap();
    db.upsert_registration(support::registration_with_tickets("reg-004", "Winter Gala", "pi_second")).await.unwrap();
    let api = InvoiceFlowApi::new(db.clone());
    let yymm = InvoicePeriod::current().yymm();

    let first = api.finalize_payment(&PaymentId("pay-003".to_string())).await.unwrap();
    assert_eq!(first.invoice_number, format!("LTIV-{yymm}001"));

    // A reservation that never reaches commit (crash, abort) burns its value. The next finalize skips it.
    let sequence = InvoicePeriod::current().sequence_name();
    let abandoned = db.next_in_sequence(&sequence).await.unwrap();
    assert_eq!(abandoned, 1002);

    let second = api.finalize_payment(&PaymentId("pay-004".to_string())).await.unwrap();
    assert_eq!(second.invoice_number, format!("LTIV-{yymm}003"));
    assert!(api.db().fetch_invoice_by_number(&format!("LTIV-{yymm}002")).await.unwrap().is_none());
}

#[tokio::test]
async fn unmatched_payment_requires_operator_review() {
    let db = new_test_db().await;
    db.upsert_payment(support::stripe_payment("pay-005", "pi_orphan", 2_500)).await.unwrap();
    let api = InvoiceFlowApi::new(db);
    let id = PaymentId("pay-005".to_string());

    match api.preview(&id).await.unwrap() {
        PreviewResult::NoMatch(m) => assert_eq!(m.confidence, 0),
        other => panic!("Expected no match, got {other:?}"),
    }
    let err = api.finalize_payment(&id).await.unwrap_err();
    assert!(matches!(err, InvoiceFlowError::NotAutoApprovable(_, 0)));

    // Declining takes it off the queue without touching the sequence.
    let declined = api.decline(&id, "chargeback").await.unwrap();
    assert!(declined.declined);
    assert!(api.db().fetch_uninvoiced_payments().await.unwrap().is_empty());
}

#[tokio::test]
async fn decline_is_forbidden_after_invoicing() {
    let db = new_test_db().await;
    db.upsert_payment(support::square_payment("pay-006", "SQTOKEN77", 3_000)).await.unwrap();
    db.upsert_registration(support::bare_registration("reg-006", "Open Mic", "SQTOKEN77")).await.unwrap();
    let api = InvoiceFlowApi::new(db);
    let id = PaymentId("pay-006".to_string());

    let _ = api.finalize_payment(&id).await.unwrap();
    let err = api.decline(&id, "too late").await.unwrap_err();
    assert!(matches!(err, InvoiceFlowError::PaymentAlreadyInvoiced(_)));
}

#[tokio::test]
async fn stale_preview_against_an_invoiced_registration_is_not_retriable() {
    let db = new_test_db().await;
    // Two payments carrying the same provider key both match the one registration.
    db.upsert_payment(support::stripe_payment("pay-008", "pi_shared", 10_000)).await.unwrap();
    db.upsert_payment(support::stripe_payment("pay-009", "pi_shared", 10_000)).await.unwrap();
    db.upsert_registration(support::registration_with_tickets("reg-008", "Winter Gala", "pi_shared")).await.unwrap();
    let api = InvoiceFlowApi::new(db);

    // Take a preview for the second payment, then invoice the registration through the first.
    let stale = match api.preview(&PaymentId("pay-009".to_string())).await.unwrap() {
        PreviewResult::Ready(p) => *p,
        other => panic!("Expected a ready preview, got {other:?}"),
    };
    let winner = api.finalize_payment(&PaymentId("pay-008".to_string())).await.unwrap();

    // Finalizing the stale preview cannot ever succeed, so the error must not invite a retry: each attempt
    // would burn a fresh invoice number for nothing.
    let err = api.finalize(stale).await.unwrap_err();
    match err {
        InvoiceFlowError::DatabaseError(e) => {
            assert!(!e.is_retriable());
            assert!(matches!(e, SqliteDatabaseError::RegistrationConflict(ref id) if id.as_str() == "reg-008"));
        },
        other => panic!("Expected a registration conflict, got {other:?}"),
    }

    // The failed attempt rolled everything back: the second payment is still open and the registration still
    // belongs to the winner's invoice.
    let open = api.db().fetch_uninvoiced_payments().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id.as_str(), "pay-009");
    let registration =
        api.db().fetch_registration(&"reg-008".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(registration.invoice_number.as_deref(), Some(winner.invoice_number.as_str()));
}

#[tokio::test]
async fn fallback_line_for_pre_rework_registrations() {
    let db = new_test_db().await;
    db.upsert_payment(support::square_payment("pay-007", "SQTOKEN88", 8_800)).await.unwrap();
    db.upsert_registration(support::bare_registration("reg-007", "Jazz Evening", "SQTOKEN88")).await.unwrap();
    let api = InvoiceFlowApi::new(db);

    let preview = match api.preview(&PaymentId("pay-007".to_string())).await.unwrap() {
        PreviewResult::Ready(p) => *p,
        other => panic!("Expected a ready preview, got {other:?}"),
    };
    assert_eq!(preview.customer_invoice.lines.len(), 1);
    assert_eq!(preview.customer_invoice.lines[0].description, "Event registration: Jazz Evening");
    assert_eq!(preview.customer_invoice.total, Money::from_cents(8_800));
}
