mod support;

use ticket_invoice_engine::{
    db_types::{PaymentId, Provider},
    import_new_payments,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    GatewayError,
    ImportError,
    InvoicingDatabase,
    PaymentGateway,
    PaymentPage,
    RecordLookup,
    SqliteDatabase,
};

async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// A canned gateway: cursors are page indices, and one page can be configured to fail as a flaky API would.
struct CannedGateway {
    pages: Vec<PaymentPage>,
    fail_at: Option<usize>,
}

impl CannedGateway {
    fn new(pages: Vec<PaymentPage>) -> Self {
        Self { pages, fail_at: None }
    }

    fn failing_at(mut self, page: usize) -> Self {
        self.fail_at = Some(page);
        self
    }
}

impl PaymentGateway for CannedGateway {
    fn provider(&self) -> Provider {
        Provider::Square
    }

    async fn list_payments(&self, cursor: Option<&str>) -> Result<PaymentPage, GatewayError> {
        let index = cursor.map(|c| c.parse::<usize>().expect("canned cursors are indices")).unwrap_or(0);
        if self.fail_at == Some(index) {
            return Err(GatewayError::ApiError { status: 503, message: "scheduled maintenance".to_string() });
        }
        Ok(self.pages[index].clone())
    }
}

fn two_pages() -> Vec<PaymentPage> {
    vec![
        PaymentPage {
            items: vec![
                support::square_payment("square:sq_001", "sq_001", 4_000),
                support::square_payment("square:sq_002", "sq_002", 5_500),
            ],
            next_cursor: Some("1".to_string()),
        },
        PaymentPage {
            items: vec![
                support::square_payment("square:sq_003", "sq_003", 2_000),
                support::square_payment("square:sq_004", "sq_004", 7_500),
            ],
            next_cursor: None,
        },
    ]
}

#[tokio::test]
async fn importing_twice_skips_everything() {
    let db = new_test_db().await;
    let gateway = CannedGateway::new(two_pages());

    let first = import_new_payments(&db, &gateway, None).await.unwrap();
    assert_eq!(first.imported, 4);
    assert_eq!(first.skipped, 0);
    assert_eq!(first.next_cursor, None);

    // Same range again, e.g. an overlapping date window on a later run.
    let second = import_new_payments(&db, &gateway, None).await.unwrap();
    assert_eq!(second.imported, 0);
    assert_eq!(second.skipped, 4);

    assert_eq!(db.fetch_uninvoiced_payments().await.unwrap().len(), 4);
}

#[tokio::test]
async fn keyless_records_are_skipped_not_inserted() {
    let db = new_test_db().await;
    let keyless = ticket_invoice_engine::db_types::NewPayment::new(
        PaymentId("square:mystery".to_string()),
        Provider::Square,
        ltx_common::Money::from_cents(1_000),
        serde_json::json!({ "note": "no identifiers at all" }),
    );
    let gateway = CannedGateway::new(vec![PaymentPage {
        items: vec![keyless, support::square_payment("square:sq_005", "sq_005", 3_000)],
        next_cursor: None,
    }]);

    let summary = import_new_payments(&db, &gateway, None).await.unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 1);
    assert!(db.fetch_payment(&PaymentId("square:mystery".to_string())).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_page_reports_a_resume_cursor() {
    let db = new_test_db().await;
    let gateway = CannedGateway::new(two_pages()).failing_at(1);

    let err = import_new_payments(&db, &gateway, None).await.unwrap_err();
    let resume = match err {
        ImportError::Gateway { resume_cursor, .. } => resume_cursor,
        other => panic!("Expected a gateway error, got {other:?}"),
    };
    assert_eq!(resume.as_deref(), Some("1"));
    // The first page was committed before the failure.
    assert!(db.payment_exists_by_key("sq_001").await.unwrap());
    assert!(!db.payment_exists_by_key("sq_003").await.unwrap());

    // Resuming from the reported cursor picks up exactly the missing records.
    let gateway = CannedGateway::new(two_pages());
    let summary = import_new_payments(&db, &gateway, resume.as_deref()).await.unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 0);
}
