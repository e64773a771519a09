use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    db::{
        common::{
            DatabaseError,
            InsertPaymentResult,
            InsertRegistrationResult,
            InvoicingDatabase,
            RecordLookup,
        },
        sqlite::{
            counters,
            db_url,
            invoices,
            new_pool,
            payments,
            registrations,
            transactions,
            transactions::NewTransactionRow,
            SqliteDatabaseError,
        },
    },
    db_types::{
        Invoice,
        InvoiceBody,
        InvoiceReceipt,
        NewPayment,
        NewRegistration,
        Payment,
        PaymentId,
        Registration,
        RegistrationId,
        TransactionRecord,
        TransactionSide,
    },
    helpers::{InvoiceNumberPair, TRANSACTION_SEQUENCE},
    preview::InvoicePreview,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fetches payments matching the given filter. Exposed for the operator tooling.
    pub async fn fetch_payments(
        &self,
        filter: payments::PaymentQueryFilter,
    ) -> Result<Vec<Payment>, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payments(filter, &mut conn).await
    }
}

impl RecordLookup for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn fetch_payment(&self, id: &PaymentId) -> Result<Option<Payment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment(id, &mut conn).await
    }

    async fn fetch_registration(&self, id: &RegistrationId) -> Result<Option<Registration>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        registrations::fetch_registration(id, &mut conn).await
    }

    async fn fetch_candidate_registrations(&self) -> Result<Vec<Registration>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        registrations::fetch_candidates(&mut conn).await
    }

    async fn fetch_uninvoiced_payments(&self) -> Result<Vec<Payment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_uninvoiced(&mut conn).await
    }

    async fn fetch_invoice(&self, id: i64) -> Result<Option<Invoice>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        invoices::fetch_invoice(id, &mut conn).await
    }

    async fn fetch_invoice_by_number(&self, number: &str) -> Result<Option<Invoice>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        invoices::fetch_invoice_by_number(number, &mut conn).await
    }

    async fn fetch_transactions_for_invoice(&self, number: &str) -> Result<Vec<TransactionRecord>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_for_invoice(number, &mut conn).await
    }
}

impl InvoicingDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn upsert_payment(&self, payment: NewPayment) -> Result<InsertPaymentResult, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let result = payments::idempotent_insert(payment, &mut conn).await?;
        if let InsertPaymentResult::Inserted(id) = &result {
            debug!("🧾️ Payment {id} has been saved in the DB");
        }
        Ok(result)
    }

    async fn upsert_registration(
        &self,
        registration: NewRegistration,
    ) -> Result<InsertRegistrationResult, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let result = registrations::idempotent_insert(registration, &mut conn).await?;
        if let InsertRegistrationResult::Inserted(id) = &result {
            debug!("🧾️ Registration {id} has been saved in the DB");
        }
        Ok(result)
    }

    async fn payment_exists_by_key(&self, key: &str) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::payment_exists_by_key(key, &mut conn).await
    }

    async fn next_in_sequence(&self, name: &str) -> Result<i64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        counters::next_value(name, &mut conn).await
    }

    async fn current_in_sequence(&self, name: &str) -> Result<i64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        counters::current_value(name, &mut conn).await
    }

    async fn initialize_sequence(&self, name: &str, start: i64) -> Result<(), Self::Error> {
        let mut conn = self.pool.acquire().await?;
        counters::initialize(name, start, &mut conn).await
    }

    async fn commit_invoice(
        &self,
        preview: &InvoicePreview,
        numbers: &InvoiceNumberPair,
    ) -> Result<InvoiceReceipt, Self::Error> {
        let mut tx = self.pool.begin().await?;
        match build_invoice(preview, numbers, &mut tx).await {
            Ok(receipt) => {
                tx.commit().await.map_err(|e| SqliteDatabaseError::TransactionAborted(e.to_string()))?;
                debug!(
                    "🧾️ Invoice {} committed for payment {} with {} transaction rows",
                    receipt.invoice_number,
                    preview.payment.id,
                    receipt.transaction_ids.len()
                );
                Ok(receipt)
            },
            // Losing the idempotence race is not an abort: the invoice exists, the caller just has to go and
            // fetch it. A registration conflict can never succeed on retry (the registration stays invoiced), so
            // it keeps its non-retriable identity. Every other failure rolls the whole unit of work back and is
            // safe to retry.
            Err(e) if e.is_already_invoiced() => Err(e),
            Err(e @ SqliteDatabaseError::RegistrationConflict(_)) => Err(e),
            Err(e) => Err(SqliteDatabaseError::TransactionAborted(e.to_string())),
        }
    }

    async fn mark_payment_declined(&self, id: &PaymentId, reason: &str) -> Result<Payment, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::mark_declined(id, &mut conn).await?;
        info!("🧾️ Payment {id} declined: {reason}");
        Ok(payment)
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}

/// Runs the invoice unit of work on the given transaction connection. The caller owns the commit/rollback decision.
async fn build_invoice(
    preview: &InvoicePreview,
    numbers: &InvoiceNumberPair,
    conn: &mut SqliteConnection,
) -> Result<InvoiceReceipt, SqliteDatabaseError> {
    let payment_id = &preview.payment.id;
    // Idempotence guard, re-checked inside the transaction: a concurrent finalize may have invoiced this payment
    // between the caller's check and now.
    let payment = payments::fetch_payment(payment_id, conn)
        .await?
        .ok_or_else(|| SqliteDatabaseError::PaymentNotFound(payment_id.clone()))?;
    if payment.invoice_created {
        return Err(SqliteDatabaseError::PaymentAlreadyInvoiced(payment_id.clone()));
    }

    let invoice_id = invoices::insert_invoice(preview, numbers, conn).await?;

    counters::initialize(TRANSACTION_SEQUENCE, 0, conn).await?;
    let mut transaction_ids =
        Vec::with_capacity(preview.customer_invoice.lines.len() + preview.supplier_invoice.lines.len());
    insert_side(preview, &numbers.customer, &preview.customer_invoice, TransactionSide::Customer, &mut transaction_ids, conn)
        .await?;
    insert_side(preview, &numbers.customer, &preview.supplier_invoice, TransactionSide::Supplier, &mut transaction_ids, conn)
        .await?;
    invoices::stamp_transaction_ids(invoice_id, &transaction_ids, conn).await?;

    let stamped = payments::stamp_invoice_state(payment_id, &numbers.customer, invoice_id, conn).await?;
    if !stamped {
        return Err(SqliteDatabaseError::PaymentAlreadyInvoiced(payment_id.clone()));
    }
    let stamped =
        registrations::stamp_invoice_state(&preview.registration.id, &numbers.customer, invoice_id, conn).await?;
    if !stamped {
        return Err(SqliteDatabaseError::RegistrationConflict(preview.registration.id.clone()));
    }

    Ok(InvoiceReceipt {
        invoice_id,
        invoice_number: numbers.customer.clone(),
        supplier_number: numbers.supplier.clone(),
        transaction_ids,
    })
}

/// Derives one transaction row per line item of one invoice side. Row ids come from the shared transaction
/// sequence, incremented on the transaction connection so that an abort rolls the ids back with everything else and
/// the series stays dense.
async fn insert_side(
    preview: &InvoicePreview,
    invoice_number: &str,
    body: &InvoiceBody,
    side: TransactionSide,
    transaction_ids: &mut Vec<i64>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let now = Utc::now();
    for line in &body.lines {
        let id = counters::next_value(TRANSACTION_SEQUENCE, conn).await?;
        transactions::insert_transaction(
            NewTransactionRow {
                id,
                invoice_number,
                side,
                description: &line.description,
                amount: line.amount,
                payment_id: &preview.payment.id,
                customer_name: preview.payment.customer_name.as_deref(),
                customer_email: preview.payment.customer_email.as_deref(),
                created_at: now,
            },
            conn,
        )
        .await?;
        transaction_ids.push(id);
    }
    Ok(())
}
