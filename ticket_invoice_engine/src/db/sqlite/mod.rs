pub mod db;
mod errors;

pub mod counters;
pub mod invoices;
pub mod payments;
pub mod registrations;
pub mod transactions;

use std::env;

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
pub use payments::PaymentQueryFilter;
use log::info;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

const SQLITE_DB_URL: &str = "sqlite://data/ltx_store.db";

pub fn db_url() -> String {
    let result = env::var("LTX_DATABASE_URL").unwrap_or_else(|_| {
        info!("LTX_DATABASE_URL is not set, falling back to {SQLITE_DB_URL}");
        SQLITE_DB_URL.to_string()
    });
    info!("Payments store: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
