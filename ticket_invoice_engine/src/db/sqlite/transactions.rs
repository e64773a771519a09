use chrono::{DateTime, Utc};
use ltx_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{PaymentId, TransactionRecord, TransactionSide},
};

const TRANSACTION_COLUMNS: &str =
    "id, invoice_number, side, description, amount, payment_id, customer_name, customer_email, created_at";

pub struct NewTransactionRow<'a> {
    pub id: i64,
    pub invoice_number: &'a str,
    pub side: TransactionSide,
    pub description: &'a str,
    pub amount: Money,
    pub payment_id: &'a PaymentId,
    pub customer_name: Option<&'a str>,
    pub customer_email: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_transaction(
    row: NewTransactionRow<'_>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let _ = sqlx::query(
        r#"
            INSERT INTO transactions (id, invoice_number, side, description, amount, payment_id, customer_name,
                customer_email, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9);
        "#,
    )
    .bind(row.id)
    .bind(row.invoice_number)
    .bind(row.side)
    .bind(row.description)
    .bind(row.amount)
    .bind(row.payment_id)
    .bind(row.customer_name)
    .bind(row.customer_email)
    .bind(row.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_for_invoice(
    invoice_number: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<TransactionRecord>, SqliteDatabaseError> {
    let rows = sqlx::query_as::<_, TransactionRecord>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE invoice_number = $1 ORDER BY id ASC"
    ))
    .bind(invoice_number)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
