use sqlx::{types::Json, Row, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::Invoice,
    helpers::InvoiceNumberPair,
    preview::InvoicePreview,
};

const INVOICE_COLUMNS: &str = "id, invoice_number, supplier_number, payment_id, registration_id, customer_invoice, \
                               supplier_invoice, finalized, transaction_ids, created_at";

/// Inserts a finalized invoice carrying the pre-reserved number pair and returns its id. The transaction id list is
/// stamped in a second step once the rows exist; both steps run inside the caller's transaction.
pub async fn insert_invoice(
    preview: &InvoicePreview,
    numbers: &InvoiceNumberPair,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let row = sqlx::query(
        r#"
            INSERT INTO invoices (invoice_number, supplier_number, payment_id, registration_id, customer_invoice,
                supplier_invoice, finalized)
            VALUES ($1, $2, $3, $4, $5, $6, 1)
            RETURNING id;
        "#,
    )
    .bind(&numbers.customer)
    .bind(&numbers.supplier)
    .bind(&preview.payment.id)
    .bind(&preview.registration.id)
    .bind(Json(&preview.customer_invoice))
    .bind(Json(&preview.supplier_invoice))
    .fetch_one(conn)
    .await?;
    Ok(row.get(0))
}

pub async fn stamp_transaction_ids(
    invoice_id: i64,
    transaction_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let _ = sqlx::query("UPDATE invoices SET transaction_ids = $1 WHERE id = $2")
        .bind(Json(transaction_ids))
        .bind(invoice_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_invoice(id: i64, conn: &mut SqliteConnection) -> Result<Option<Invoice>, SqliteDatabaseError> {
    let invoice = sqlx::query_as::<_, Invoice>(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(invoice)
}

/// Fetches an invoice by either its customer number or its supplier number; the two are interchangeable lookups
/// since they are always issued as a pair.
pub async fn fetch_invoice_by_number(
    number: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Invoice>, SqliteDatabaseError> {
    let invoice = sqlx::query_as::<_, Invoice>(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_number = $1 OR supplier_number = $1"
    ))
    .bind(number)
    .fetch_optional(conn)
    .await?;
    Ok(invoice)
}
