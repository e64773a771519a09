use crate::{
    db_types::{
        Invoice,
        InvoiceReceipt,
        NewPayment,
        NewRegistration,
        Payment,
        PaymentId,
        Registration,
        RegistrationId,
        TransactionRecord,
    },
    helpers::InvoiceNumberPair,
    preview::InvoicePreview,
};

pub enum InsertPaymentResult {
    Inserted(PaymentId),
    AlreadyExists(PaymentId),
}

pub enum InsertRegistrationResult {
    Inserted(RegistrationId),
    AlreadyExists(RegistrationId),
}

/// Classification hooks the invoice flow needs on a backend error. The flow cannot match on a backend's concrete
/// error enum, but it must tell a retriable transaction abort apart from a lost idempotence race.
pub trait DatabaseError: std::error::Error {
    /// The underlying multi-document transaction failed (conflict, timeout, connectivity) and the operation may be
    /// safely retried.
    fn is_retriable(&self) -> bool;

    /// A concurrent finalize for the same payment won the race. The caller should fetch and return the existing
    /// invoice instead of treating this as a failure.
    fn is_already_invoiced(&self) -> bool;
}

/// Read-side queries over the document stores.
#[allow(async_fn_in_trait)]
pub trait RecordLookup {
    type Error: DatabaseError;

    /// Fetches the payment with the given internal id, or `None` if it does not exist.
    async fn fetch_payment(&self, id: &PaymentId) -> Result<Option<Payment>, Self::Error>;

    async fn fetch_registration(&self, id: &RegistrationId) -> Result<Option<Registration>, Self::Error>;

    /// All registrations that have not been invoiced yet. These are the candidate set handed to the matcher.
    async fn fetch_candidate_registrations(&self) -> Result<Vec<Registration>, Self::Error>;

    /// All payments that have neither been invoiced nor declined.
    async fn fetch_uninvoiced_payments(&self) -> Result<Vec<Payment>, Self::Error>;

    async fn fetch_invoice(&self, id: i64) -> Result<Option<Invoice>, Self::Error>;

    async fn fetch_invoice_by_number(&self, number: &str) -> Result<Option<Invoice>, Self::Error>;

    async fn fetch_transactions_for_invoice(&self, number: &str) -> Result<Vec<TransactionRecord>, Self::Error>;
}

/// This trait defines the behaviour a storage backend must provide to drive the invoice flow and the gateway import
/// reconciler:
/// * idempotent inserts of imported payment and registration records,
/// * named, atomically incremented sequences for invoice numbers and transaction ids,
/// * the all-or-nothing invoice commit,
/// * invoicing-state mutation on payments (decline).
#[allow(async_fn_in_trait)]
pub trait InvoicingDatabase: Clone + RecordLookup {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Inserts the payment if no payment with its id exists yet. Never overwrites: imported payments are immutable
    /// financial facts, so a repeated import of the same record is a no-op.
    async fn upsert_payment(&self, payment: NewPayment) -> Result<InsertPaymentResult, Self::Error>;

    async fn upsert_registration(&self, registration: NewRegistration)
        -> Result<InsertRegistrationResult, Self::Error>;

    /// Whether a payment with the given normalized key has already been imported. Used by the reconciler to
    /// deduplicate overlapping gateway imports.
    async fn payment_exists_by_key(&self, key: &str) -> Result<bool, Self::Error>;

    /// Atomically increments the named sequence and returns the new value. Two concurrent callers never observe the
    /// same value, and no value is skipped by the generator itself; skipped invoice numbers can only arise from an
    /// issuance that reserved a number and then never committed (see [`crate::InvoiceFlowApi::finalize`]).
    ///
    /// The sequence must have been initialized first.
    async fn next_in_sequence(&self, name: &str) -> Result<i64, Self::Error>;

    /// Returns the last-issued value of the named sequence without incrementing it.
    async fn current_in_sequence(&self, name: &str) -> Result<i64, Self::Error>;

    /// Creates the named sequence starting at `start`. A no-op when the sequence already exists, so it is always
    /// safe to call before [`next_in_sequence`].
    async fn initialize_sequence(&self, name: &str, start: i64) -> Result<(), Self::Error>;

    /// Persists a finalized invoice as a single atomic unit of work:
    /// * inserts the invoice document carrying the pre-reserved number pair, with `finalized = true`,
    /// * derives and inserts one transaction row per customer-copy and per supplier-copy line item, with ids from
    ///   the transaction sequence,
    /// * stamps `invoice_created`, `invoice_number` and `invoice_id` on the source payment and registration.
    ///
    /// All of the above commit together or not at all. If the payment was already invoiced when the transaction ran
    /// (a concurrent finalize won), the backend returns an error for which
    /// [`DatabaseError::is_already_invoiced`] is true and leaves the store untouched.
    ///
    /// Number reservation is deliberately *not* part of this call: a counter increment cannot be rolled back, so
    /// the caller reserves the number first and accepts that an abort abandons it.
    async fn commit_invoice(
        &self,
        preview: &InvoicePreview,
        numbers: &InvoiceNumberPair,
    ) -> Result<InvoiceReceipt, Self::Error>;

    /// Marks a payment as declined so it no longer appears in the uninvoiced work queue. The reason is recorded in
    /// the audit log only.
    async fn mark_payment_declined(&self, id: &PaymentId, reason: &str) -> Result<Payment, Self::Error>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
