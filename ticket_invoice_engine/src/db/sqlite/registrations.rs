use sqlx::{types::Json, Row, SqliteConnection};

use crate::{
    db::{common::InsertRegistrationResult, sqlite::SqliteDatabaseError},
    db_types::{NewRegistration, Registration, RegistrationId},
};

const REGISTRATION_COLUMNS: &str =
    "id, event_name, created_at, registration_data, invoice_created, invoice_number, invoice_id";

pub async fn idempotent_insert(
    registration: NewRegistration,
    conn: &mut SqliteConnection,
) -> Result<InsertRegistrationResult, SqliteDatabaseError> {
    let id = registration.id.clone();
    match sqlx::query(
        r#"
            INSERT INTO registrations (id, event_name, created_at, registration_data)
            VALUES ($1, $2, $3, $4)
            RETURNING id;
        "#,
    )
    .bind(registration.id)
    .bind(registration.event_name)
    .bind(registration.created_at)
    .bind(Json(registration.registration_data))
    .fetch_one(conn)
    .await
    {
        Ok(row) => Ok(InsertRegistrationResult::Inserted(RegistrationId(row.get(0)))),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(InsertRegistrationResult::AlreadyExists(id)),
        Err(e) => Err(SqliteDatabaseError::from(e)),
    }
}

pub async fn fetch_registration(
    id: &RegistrationId,
    conn: &mut SqliteConnection,
) -> Result<Option<Registration>, SqliteDatabaseError> {
    let registration =
        sqlx::query_as::<_, Registration>(&format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"))
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(registration)
}

/// All registrations that have not been invoiced yet, in creation order. This is the candidate set for the matcher.
pub async fn fetch_candidates(conn: &mut SqliteConnection) -> Result<Vec<Registration>, SqliteDatabaseError> {
    let registrations = sqlx::query_as::<_, Registration>(&format!(
        "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE invoice_created = 0 ORDER BY created_at ASC, id ASC"
    ))
    .fetch_all(conn)
    .await?;
    Ok(registrations)
}

/// Mirrors [`crate::db::sqlite::payments::stamp_invoice_state`] for the registration side.
pub async fn stamp_invoice_state(
    id: &RegistrationId,
    invoice_number: &str,
    invoice_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let res = sqlx::query(
        "UPDATE registrations SET invoice_created = 1, invoice_number = $1, invoice_id = $2 \
         WHERE id = $3 AND invoice_created = 0",
    )
    .bind(invoice_number)
    .bind(invoice_id)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}
