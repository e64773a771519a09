use std::fmt::Debug;

use log::*;
use thiserror::Error;

use crate::{
    db::common::{DatabaseError, InvoicingDatabase},
    db_types::{InvoiceReceipt, Payment, PaymentId},
    helpers::{InvoiceNumberPair, InvoicePeriod, SEQUENCE_BASE},
    matcher::{match_payment, Match},
    preview::{build_preview, InvoicePreview, PreviewError},
};

/// `InvoiceFlowApi` is the primary API for reconciling imported payments and issuing invoices: previewing a draft
/// for an operator, finalizing it into a numbered invoice with its accounting rows, or declining the payment.
pub struct InvoiceFlowApi<B> {
    db: B,
}

impl<B> Debug for InvoiceFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InvoiceFlowApi")
    }
}

impl<B> InvoiceFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

/// The outcome of a preview request. No match is an expected steady-state outcome, not a fault, so it is a variant
/// rather than an error.
#[derive(Debug)]
pub enum PreviewResult {
    /// A draft invoice, ready for operator review or auto-approval.
    Ready(Box<InvoicePreview>),
    /// No registration matched with sufficient confidence. The match result carries the audit detail.
    NoMatch(Box<Match>),
    /// The payment has already been invoiced; the existing reference is returned instead of a new draft.
    AlreadyFinalized(InvoiceReceipt),
}

impl<B> InvoiceFlowApi<B>
where B: InvoicingDatabase
{
    /// Builds a draft invoice for the given payment against the current uninvoiced registrations.
    ///
    /// Matching and preview assembly are pure; the only database work here is loading the payment and the candidate
    /// set. Nothing is persisted.
    pub async fn preview(&self, payment_id: &PaymentId) -> Result<PreviewResult, InvoiceFlowError<B>> {
        let payment = self.fetch_payment_checked(payment_id).await?;
        if payment.invoice_created {
            let receipt = self.existing_receipt(&payment).await?;
            return Ok(PreviewResult::AlreadyFinalized(receipt));
        }
        let candidates = self.db.fetch_candidate_registrations().await.map_err(InvoiceFlowError::DatabaseError)?;
        let m = match_payment(&payment, &candidates);
        debug!(
            "🧾️🔍️ Payment {payment_id} matched via {} with confidence {}",
            m.method, m.confidence
        );
        if m.registration.is_none() {
            return Ok(PreviewResult::NoMatch(Box::new(m)));
        }
        let preview = build_preview(&m)?;
        Ok(PreviewResult::Ready(Box::new(preview)))
    }

    /// Finalizes a previewed invoice. As a single logical operation this:
    /// 1. reserves the next customer/supplier invoice number pair for the current period,
    /// 2. persists the invoice, its derived transaction rows, and the payment/registration invoicing-state stamps
    ///    in one atomic backend transaction.
    ///
    /// The call is idempotent: if the payment is already invoiced (before the call, or because a concurrent
    /// finalize wins the race mid-call), the existing invoice reference is returned and no new number is reserved.
    ///
    /// The number reservation happens *outside* the backend transaction because a counter increment cannot be
    /// rolled back. A crash or abort between reservation and commit therefore abandons that number permanently;
    /// a retry reserves a fresh one. Abandoned numbers are the documented cost of never reusing or duplicating one.
    pub async fn finalize(&self, preview: InvoicePreview) -> Result<InvoiceReceipt, InvoiceFlowError<B>> {
        let payment_id = preview.payment.id.clone();
        // Idempotence check before reserving a number. The backend re-checks inside the transaction; this early
        // exit just avoids burning a number on the common double-submit case.
        let payment = self.fetch_payment_checked(&payment_id).await?;
        if payment.invoice_created {
            debug!("🧾️ Payment {payment_id} is already invoiced. Returning the existing reference.");
            return self.existing_receipt(&payment).await;
        }

        let period = InvoicePeriod::current();
        let sequence = period.sequence_name();
        self.db
            .initialize_sequence(&sequence, SEQUENCE_BASE)
            .await
            .map_err(InvoiceFlowError::DatabaseError)?;
        let value = self.db.next_in_sequence(&sequence).await.map_err(InvoiceFlowError::DatabaseError)?;
        let numbers = InvoiceNumberPair::from_sequence_value(period, value);
        trace!("🧾️ Reserved invoice number {} for payment {payment_id}", numbers.customer);

        match self.db.commit_invoice(&preview, &numbers).await {
            Ok(receipt) => {
                info!(
                    "🧾️✅️ Invoice {} issued for payment {payment_id} ({} transaction rows)",
                    receipt.invoice_number,
                    receipt.transaction_ids.len()
                );
                Ok(receipt)
            },
            Err(e) if e.is_already_invoiced() => {
                warn!(
                    "🧾️ Payment {payment_id} was invoiced concurrently. Number {} is abandoned; returning the \
                     winner's reference.",
                    numbers.customer
                );
                let payment = self.fetch_payment_checked(&payment_id).await?;
                self.existing_receipt(&payment).await
            },
            Err(e) if e.is_retriable() => {
                warn!(
                    "🧾️ Invoice transaction for payment {payment_id} aborted. Number {} is abandoned; a retry will \
                     reserve a fresh one. Cause: {e}",
                    numbers.customer
                );
                Err(InvoiceFlowError::TransactionAborted(e.to_string()))
            },
            Err(e) => Err(InvoiceFlowError::DatabaseError(e)),
        }
    }

    /// Convenience wrapper for the operator tooling: previews the payment and finalizes it when the match clears
    /// the auto-approval threshold.
    pub async fn finalize_payment(&self, payment_id: &PaymentId) -> Result<InvoiceReceipt, InvoiceFlowError<B>> {
        match self.preview(payment_id).await? {
            PreviewResult::AlreadyFinalized(receipt) => Ok(receipt),
            PreviewResult::Ready(preview) if preview.match_confidence >= crate::matcher::AUTO_APPROVE_THRESHOLD => {
                self.finalize(*preview).await
            },
            PreviewResult::Ready(preview) => {
                Err(InvoiceFlowError::NotAutoApprovable(payment_id.clone(), preview.match_confidence))
            },
            PreviewResult::NoMatch(_) => Err(InvoiceFlowError::NotAutoApprovable(payment_id.clone(), 0)),
        }
    }

    /// Marks a payment as declined so it drops out of the reconciliation queue. Declining an invoiced payment is
    /// forbidden; issue a correcting invoice instead.
    pub async fn decline(&self, payment_id: &PaymentId, reason: &str) -> Result<Payment, InvoiceFlowError<B>> {
        let payment = self.fetch_payment_checked(payment_id).await?;
        if payment.invoice_created {
            return Err(InvoiceFlowError::PaymentAlreadyInvoiced(payment_id.clone()));
        }
        self.db.mark_payment_declined(payment_id, reason).await.map_err(InvoiceFlowError::DatabaseError)
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    async fn fetch_payment_checked(&self, payment_id: &PaymentId) -> Result<Payment, InvoiceFlowError<B>> {
        self.db
            .fetch_payment(payment_id)
            .await
            .map_err(InvoiceFlowError::DatabaseError)?
            .ok_or_else(|| InvoiceFlowError::PaymentNotFound(payment_id.clone()))
    }

    async fn existing_receipt(&self, payment: &Payment) -> Result<InvoiceReceipt, InvoiceFlowError<B>> {
        let invoice_id = payment
            .invoice_id
            .ok_or_else(|| InvoiceFlowError::InvoiceMissing(0, payment.id.clone()))?;
        let invoice = self
            .db
            .fetch_invoice(invoice_id)
            .await
            .map_err(InvoiceFlowError::DatabaseError)?
            .ok_or_else(|| InvoiceFlowError::InvoiceMissing(invoice_id, payment.id.clone()))?;
        Ok(InvoiceReceipt {
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number,
            supplier_number: invoice.supplier_number,
            transaction_ids: invoice.transaction_ids.0,
        })
    }
}

#[derive(Debug, Error)]
pub enum InvoiceFlowError<B: InvoicingDatabase> {
    #[error("Database error: {0}")]
    DatabaseError(B::Error),
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),
    #[error("Invoice #{0} does not exist, even though payment {1} references it")]
    InvoiceMissing(i64, PaymentId),
    #[error("Payment {0} already has an invoice and cannot be declined")]
    PaymentAlreadyInvoiced(PaymentId),
    #[error("Payment {0} did not clear the auto-approval threshold (confidence {1}). An operator must review it.")]
    NotAutoApprovable(PaymentId, u8),
    #[error("{0}")]
    Preview(#[from] PreviewError),
    #[error("Invoice transaction aborted; the reserved number was abandoned and a retry will reserve a fresh one: {0}")]
    TransactionAborted(String),
}
