//! Gateway import reconciliation.
//!
//! The reconciler pages through a payment gateway's payment list and upserts records that are not in the raw
//! payment store yet. Deduplication is by normalized payment key, so running overlapping date ranges (or the same
//! range twice) imports nothing the second time. The gateway's cursor is opaque: it is carried forward exactly as
//! the page envelope returned it, with no assumptions about page size.

use log::*;
use thiserror::Error;

use crate::{
    db::common::{InsertPaymentResult, InvoicingDatabase},
    db_types::{NewPayment, Provider},
    helpers::{extract_payment_key, KeyRole},
};

/// One page of a gateway's payment listing, already mapped into the store's record shape by the gateway client.
/// `next_cursor` is the provider's own continuation token, verbatim.
#[derive(Debug, Clone)]
pub struct PaymentPage {
    pub items: Vec<NewPayment>,
    pub next_cursor: Option<String>,
}

/// A payment gateway's payment-list API. Authentication and pagination mechanics live behind this trait; the
/// reconciler only consumes pages.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    fn provider(&self) -> Provider;

    async fn list_payments(&self, cursor: Option<&str>) -> Result<PaymentPage, GatewayError>;
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Gateway client initialization failed: {0}")]
    Initialization(String),
    #[error("Gateway request failed: {0}")]
    RequestError(String),
    #[error("Gateway returned {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("Could not decode gateway response: {0}")]
    JsonError(String),
}

#[derive(Debug, Error)]
pub enum ImportError<B: InvoicingDatabase> {
    #[error("Database error: {0}")]
    Database(B::Error),
    #[error("Gateway import aborted (resume from {resume_cursor:?}): {source}")]
    Gateway { source: GatewayError, resume_cursor: Option<String> },
}

/// The result of an import run. `imported` counts new raw-payment rows, `skipped` counts records that were already
/// present (or carried no extractable key). `next_cursor` is the continuation token for a follow-up run; `None`
/// when the listing was drained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub next_cursor: Option<String>,
}

/// Pages through the gateway's payment list from `since_cursor` and upserts payments that have not been imported
/// yet.
///
/// Each record's key is normalized with the same probe order the matcher uses, and looked up in the payment store;
/// only absent keys are inserted. Records without an extractable key are skipped and counted, never inserted: a
/// keyless raw payment could never be matched or deduplicated later.
///
/// A page fetch failure aborts the run and reports the cursor of the failed page, so the caller resumes without
/// losing previously-committed pages. Re-fetching an already-processed page is harmless (everything dedups).
pub async fn import_new_payments<B, G>(
    db: &B,
    gateway: &G,
    since_cursor: Option<&str>,
) -> Result<ImportSummary, ImportError<B>>
where
    B: InvoicingDatabase,
    G: PaymentGateway,
{
    let provider = gateway.provider();
    let mut cursor: Option<String> = since_cursor.map(String::from);
    let mut summary = ImportSummary::default();
    loop {
        let page = match gateway.list_payments(cursor.as_deref()).await {
            Ok(page) => page,
            Err(source) => {
                warn!("📥️ {provider} import aborted at cursor {cursor:?}: {source}");
                return Err(ImportError::Gateway { source, resume_cursor: cursor });
            },
        };
        let count = page.items.len();
        for payment in page.items {
            match extract_payment_key(&payment.original_data, KeyRole::Payment) {
                None => {
                    warn!("📥️ {provider} record {} has no extractable payment key. Skipped.", payment.id);
                    summary.skipped += 1;
                },
                Some(key) => {
                    if db.payment_exists_by_key(&key).await.map_err(ImportError::Database)? {
                        summary.skipped += 1;
                    } else {
                        match db.upsert_payment(payment).await.map_err(ImportError::Database)? {
                            InsertPaymentResult::Inserted(_) => summary.imported += 1,
                            InsertPaymentResult::AlreadyExists(_) => summary.skipped += 1,
                        }
                    }
                },
            }
        }
        debug!(
            "📥️ {provider} page of {count} processed ({} imported, {} skipped so far)",
            summary.imported, summary.skipped
        );
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    info!(
        "📥️ {provider} import complete. {} imported, {} skipped.",
        summary.imported, summary.skipped
    );
    summary.next_cursor = None;
    Ok(summary)
}
