use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, Row, SqliteConnection};

use crate::{
    db::{common::InsertPaymentResult, sqlite::SqliteDatabaseError},
    db_types::{NewPayment, Payment, PaymentId, Provider},
    helpers::{extract_payment_key, KeyRole},
};

const PAYMENT_COLUMNS: &str = "id, provider, payment_key, amount, currency, created_at, customer_name, \
                               customer_email, original_data, invoice_created, invoice_number, invoice_id, declined";

pub async fn idempotent_insert(
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<InsertPaymentResult, SqliteDatabaseError> {
    let id = payment.id.clone();
    // The normalized key is extracted once at insert time so that import dedup can run in SQL. Legacy records keep
    // their loose documents; the matcher always re-probes `original_data`.
    let key = extract_payment_key(&payment.original_data, KeyRole::Payment);
    match sqlx::query(
        r#"
            INSERT INTO payments (id, provider, payment_key, amount, currency, created_at, customer_name,
                customer_email, original_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id;
        "#,
    )
    .bind(payment.id)
    .bind(payment.provider)
    .bind(key)
    .bind(payment.amount)
    .bind(payment.currency)
    .bind(payment.created_at)
    .bind(payment.customer_name)
    .bind(payment.customer_email)
    .bind(Json(payment.original_data))
    .fetch_one(conn)
    .await
    {
        Ok(row) => Ok(InsertPaymentResult::Inserted(PaymentId(row.get(0)))),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(InsertPaymentResult::AlreadyExists(id)),
        Err(e) => Err(SqliteDatabaseError::from(e)),
    }
}

pub async fn fetch_payment(
    id: &PaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SqliteDatabaseError> {
    let payment = sqlx::query_as::<_, Payment>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// Checks whether a payment with the given normalized key has already been imported.
pub async fn payment_exists_by_key(key: &str, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let row = sqlx::query("SELECT 1 FROM payments WHERE payment_key = $1 LIMIT 1")
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

pub async fn fetch_uninvoiced(conn: &mut SqliteConnection) -> Result<Vec<Payment>, SqliteDatabaseError> {
    let payments = sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_created = 0 AND declined = 0 ORDER BY created_at ASC"
    ))
    .fetch_all(conn)
    .await?;
    Ok(payments)
}

/// Stamps the invoicing-state fields. The `invoice_created = 0` guard makes the stamp race-safe: if a concurrent
/// finalize already invoiced this payment, no row matches and the caller must treat the attempt as lost.
pub async fn stamp_invoice_state(
    id: &PaymentId,
    invoice_number: &str,
    invoice_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let res = sqlx::query(
        "UPDATE payments SET invoice_created = 1, invoice_number = $1, invoice_id = $2 \
         WHERE id = $3 AND invoice_created = 0",
    )
    .bind(invoice_number)
    .bind(invoice_id)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn mark_declined(id: &PaymentId, conn: &mut SqliteConnection) -> Result<Payment, SqliteDatabaseError> {
    let res = sqlx::query("UPDATE payments SET declined = 1 WHERE id = $1").bind(id).execute(&mut *conn).await?;
    if res.rows_affected() == 0 {
        return Err(SqliteDatabaseError::PaymentNotFound(id.clone()));
    }
    fetch_payment(id, conn).await?.ok_or_else(|| SqliteDatabaseError::PaymentNotFound(id.clone()))
}

#[derive(Debug, Clone, Default)]
pub struct PaymentQueryFilter {
    provider: Option<Provider>,
    invoiced: Option<bool>,
    declined: Option<bool>,
}

impl PaymentQueryFilter {
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_invoiced(mut self, invoiced: bool) -> Self {
        self.invoiced = Some(invoiced);
        self
    }

    pub fn with_declined(mut self, declined: bool) -> Self {
        self.declined = Some(declined);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.provider.is_none() && self.invoiced.is_none() && self.declined.is_none()
    }
}

/// Fetches payments according to criteria specified in the `PaymentQueryFilter`
///
/// Resulting payments are ordered by `created_at` in ascending order
pub async fn fetch_payments(
    query: PaymentQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new(format!("SELECT {PAYMENT_COLUMNS} FROM payments "));
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(provider) = query.provider {
        where_clause.push("provider = ");
        where_clause.push_bind_unseparated(provider.to_string());
    }
    if let Some(invoiced) = query.invoiced {
        where_clause.push("invoice_created = ");
        where_clause.push_bind_unseparated(invoiced);
    }
    if let Some(declined) = query.declined {
        where_clause.push("declined = ");
        where_clause.push_bind_unseparated(declined);
    }
    builder.push(" ORDER BY created_at ASC");

    trace!("🧾️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Payment>();
    let payments = query.fetch_all(conn).await?;
    debug!("🧾️ fetch_payments returned {} rows", payments.len());
    Ok(payments)
}
