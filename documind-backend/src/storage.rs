//! Database bootstrap
//!

use std::path::Path;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, ConnectionTrait};
use sea_orm_migration::MigratorTrait;
use tracing::debug;

use crate::error::Error;
use crate::migration::Migrator;

pub async fn new(db_path: &Path) -> Result<DatabaseConnection, Error> {
    start_db(Some(db_path)).await
}

/// Open (creating if needed) the database and bring the schema up to date.
/// `None` opens an in-memory database, used by tests.
pub async fn start_db(db_path: Option<&Path>) -> Result<DatabaseConnection, Error> {
    let db_url = match db_path {
        Some(path) => format!("sqlite://{}?mode=rwc", path.display()),
        None => "sqlite::memory:".to_string(),
    };
    debug!("Opening database: {db_url}");

    let mut options = ConnectOptions::new(db_url);
    options
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Trace)
        .sqlx_slow_statements_logging_settings(log::LevelFilter::Warn, Duration::from_millis(500));
    if db_path.is_none() {
        // Every pooled connection to :memory: would get its own database
        options.max_connections(1);
    }

    let conn = Database::connect(options)
        .await
        .map_err(|err| Error::Storage(format!("connection failed: {err:?}")))?;

    conn.execute_unprepared("PRAGMA foreign_keys = ON")
        .await
        .map_err(|err| Error::Storage(format!("Failed to enable foreign keys: {err:?}")))?;

    Migrator::up(&conn, None).await?;

    Ok(conn)
}
