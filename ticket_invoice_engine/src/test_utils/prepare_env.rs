use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

/// Creates a fresh throwaway database at `url` and brings its schema up to date. Loads `.env.test` first so that
/// `RUST_LOG` settings apply to the test run. Any leftover database at the same path is dropped.
pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        Sqlite::drop_database(url).await.expect("Could not drop leftover test database");
    }
    Sqlite::create_database(url).await.expect("Could not create test database");
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Could not connect to test database");
    migrate!("./src/db/sqlite/migrations").run(db.pool()).await.expect("Migrations failed");
    debug!("🧪️ Test database ready at {url}");
}

/// A unique sqlite url under the workspace `data/` directory, so that concurrently running tests never share a
/// store.
pub fn random_db_path() -> String {
    format!("sqlite://../data/test_ltx_store_{}.db", rand::random::<u64>())
}
