//! # Schema Bootstrap
//!
//! Creates the `autos`, `clientes` and `ventas` tables on first open.
//!
//! ## How It Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Bootstrap Process                                  │
//! │                                                                         │
//! │  Database::open                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  schema/schema.sql (embedded at compile time)                           │
//! │       │                                                                 │
//! │       ├── CREATE TABLE IF NOT EXISTS autos / clientes / ventas          │
//! │       └── CREATE INDEX IF NOT EXISTS ...                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Existing tables are left untouched                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no version table: the script is the whole schema and every
//! statement is idempotent.

use sqlx::SqliteConnection;
use tracing::info;

use crate::error::{DbError, DbResult};

/// The schema script, embedded in the binary.
pub const SCHEMA_SQL: &str = include_str!("../schema/schema.sql");

/// Runs the schema script on `conn`.
pub async fn bootstrap(conn: &mut SqliteConnection) -> DbResult<()> {
    info!("Bootstrapping database schema");

    sqlx::raw_sql(SCHEMA_SQL)
        .execute(conn)
        .await
        .map_err(|e| DbError::SchemaFailed(e.to_string()))?;

    info!("Schema ready");
    Ok(())
}
