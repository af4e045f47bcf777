//! # Connection Gateway
//!
//! The one shared SQLite connection and the three primitives every
//! repository is built on: `execute`, `fetch_all` and `fetch_one`.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection                                │
//! │                                                                         │
//! │  CLI startup                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure connection                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::open(config).await ← Connect + bootstrap schema              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                            │
//! │  │  Arc<Mutex<Option<SqliteConnection>>>   │                            │
//! │  │  one statement in flight at a time      │                            │
//! │  │  None after close()                     │                            │
//! │  └─────────────────────────────────────────┘                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.cars() / db.customers() / db.sales() share the same handle          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Parameters
//! Statements use `?` placeholders bound from a slice of [`SqlParam`].
//! The [`params!`](crate::params) macro builds that slice from plain values:
//!
//! ```rust,ignore
//! let rows: Vec<Car> = db
//!     .fetch_all("SELECT ... WHERE marca LIKE ?", &params![pattern])
//!     .await?;
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqliteRow, SqliteSynchronous,
};
use sqlx::{ConnectOptions, Connection, FromRow, Sqlite, SqliteConnection};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use autogest_core::{FuelType, PaymentMethod, Transmission};

use crate::error::{DbError, DbResult};
use crate::repository::car::CarRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::sale::SaleRepository;
use crate::schema;

const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/venta_autos_db.db")
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// How long a statement waits on a locked database file.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run the schema script on open.
    /// Default: true
    pub bootstrap_schema: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. The file and its parent
    ///   directory are created if they don't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            busy_timeout: Duration::from_secs(5),
            bootstrap_schema: true,
        }
    }

    /// Sets the busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run the schema script on open.
    pub fn bootstrap_schema(mut self, run: bool) -> Self {
        self.bootstrap_schema = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::open(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig::new(IN_MEMORY_PATH)
    }

    /// Whether this configuration points at a private in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY_PATH)
    }
}

// =============================================================================
// Parameters
// =============================================================================

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Int(i64),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(i64::from(v))
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<&String> for SqlParam {
    fn from(v: &String) -> Self {
        SqlParam::Text(v.clone())
    }
}

impl From<NaiveDate> for SqlParam {
    fn from(v: NaiveDate) -> Self {
        SqlParam::Date(v)
    }
}

impl From<DateTime<Utc>> for SqlParam {
    fn from(v: DateTime<Utc>) -> Self {
        SqlParam::Timestamp(v)
    }
}

impl From<Transmission> for SqlParam {
    fn from(v: Transmission) -> Self {
        SqlParam::Text(v.as_str().to_string())
    }
}

impl From<FuelType> for SqlParam {
    fn from(v: FuelType) -> Self {
        SqlParam::Text(v.as_str().to_string())
    }
}

impl From<PaymentMethod> for SqlParam {
    fn from(v: PaymentMethod) -> Self {
        SqlParam::Text(v.as_str().to_string())
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlParam::Null, Into::into)
    }
}

/// Builds a `Vec<SqlParam>` from plain values.
///
/// ```rust
/// use autogest_db::{params, SqlParam};
///
/// let p = params![1_i64, "Toyota", None::<String>];
/// assert_eq!(p[2], SqlParam::Null);
/// ```
#[macro_export]
macro_rules! params {
    () => { Vec::<$crate::SqlParam>::new() };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::SqlParam::from($value)),+]
    };
}

fn bind_query<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[SqlParam],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params.iter().cloned().fold(query, |q, param| match param {
        SqlParam::Null => q.bind(None::<String>),
        SqlParam::Int(v) => q.bind(v),
        SqlParam::Text(v) => q.bind(v),
        SqlParam::Date(v) => q.bind(v),
        SqlParam::Timestamp(v) => q.bind(v),
    })
}

fn bind_query_as<'q, T>(
    query: QueryAs<'q, Sqlite, T, SqliteArguments<'q>>,
    params: &[SqlParam],
) -> QueryAs<'q, Sqlite, T, SqliteArguments<'q>> {
    params.iter().cloned().fold(query, |q, param| match param {
        SqlParam::Null => q.bind(None::<String>),
        SqlParam::Int(v) => q.bind(v),
        SqlParam::Text(v) => q.bind(v),
        SqlParam::Date(v) => q.bind(v),
        SqlParam::Timestamp(v) => q.bind(v),
    })
}

/// What a write statement did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Row id of the last insert on this connection.
    pub last_insert_id: i64,
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap and every clone shares the same connection, which is
/// how the repositories returned by [`Database::cars`] and friends reach it.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::open(DbConfig::new("./venta_autos_db.db")).await?;
/// let cars = db.cars().search("toyota").await?;
/// db.close().await;
/// ```
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Option<SqliteConnection>>>,
    path: PathBuf,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Opens the database.
    ///
    /// ## What This Does
    /// 1. Creates the database file (and parent directory) if missing
    /// 2. Configures SQLite:
    ///    - WAL mode for file databases
    ///    - Foreign keys enabled
    /// 3. Opens a single connection
    /// 4. Runs the schema script (if enabled)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection or bootstrap failed
    pub async fn open(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening database connection"
        );

        let options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            if let Some(parent) = config.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                }
            }

            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                // WAL mode: readers don't block the writer
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        // SQLite has foreign keys disabled by default
        let options = options
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout);

        let mut conn = options
            .connect()
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!("Connection established");

        if config.bootstrap_schema {
            schema::bootstrap(&mut conn).await?;
        }

        Ok(Database {
            conn: Arc::new(Mutex::new(Some(conn))),
            path: config.database_path,
        })
    }

    /// Where this database lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs a write statement.
    ///
    /// ## Arguments
    /// * `sql` - Statement with `?` placeholders
    /// * `params` - One value per placeholder, in order
    pub async fn execute(&self, sql: &str, params: &[SqlParam]) -> DbResult<ExecOutcome> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(DbError::ConnectionClosed)?;

        debug!(sql = %first_line(sql), params = params.len(), "Executing statement");

        let result = bind_query(sqlx::query(sql), params)
            .execute(&mut *conn)
            .await?;

        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_rowid(),
        })
    }

    /// Runs a query and maps every row.
    pub async fn fetch_all<T>(&self, sql: &str, params: &[SqlParam]) -> DbResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(DbError::ConnectionClosed)?;

        debug!(sql = %first_line(sql), params = params.len(), "Fetching rows");

        let rows = bind_query_as(sqlx::query_as::<_, T>(sql), params)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows)
    }

    /// Runs a query and maps the first row, if any.
    pub async fn fetch_one<T>(&self, sql: &str, params: &[SqlParam]) -> DbResult<Option<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(DbError::ConnectionClosed)?;

        debug!(sql = %first_line(sql), params = params.len(), "Fetching one row");

        let row = bind_query_as(sqlx::query_as::<_, T>(sql), params)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row)
    }

    /// Returns the car repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let cars = db.cars().list_all().await?;
    /// ```
    pub fn cars(&self) -> CarRepository {
        CarRepository::new(self.clone())
    }

    /// Returns the customer repository.
    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.clone())
    }

    /// Returns the sale repository.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.clone())
    }

    /// Closes the connection.
    ///
    /// ## Note
    /// After calling close, every operation on this handle (and its clones)
    /// fails with [`DbError::ConnectionClosed`]. Closing twice is a no-op.
    pub async fn close(&self) {
        let conn = self.conn.lock().await.take();

        if let Some(conn) = conn {
            info!("Closing database connection");
            if let Err(e) = conn.close().await {
                warn!(error = %e, "Database connection did not close cleanly");
            }
        }
    }

    /// Checks if the database is healthy (can execute queries).
    ///
    /// ## Returns
    /// * `true` - Database is responsive
    /// * `false` - Closed or unavailable
    pub async fn health_check(&self) -> bool {
        let mut guard = self.conn.lock().await;
        match guard.as_mut() {
            Some(conn) => sqlx::query("SELECT 1").execute(&mut *conn).await.is_ok(),
            None => false,
        }
    }
}

/// Statements are multi-line literals; the log only needs the first
/// meaningful line.
fn first_line(sql: &str) -> &str {
    sql.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::open(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("venta_autos_db.db");

        let db = Database::open(DbConfig::new(&path)).await.unwrap();
        assert!(db.health_check().await);
        assert!(path.exists());
        db.close().await;
    }

    #[tokio::test]
    async fn test_execute_and_fetch() {
        let db = Database::open(DbConfig::in_memory()).await.unwrap();

        db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", &[])
            .await
            .unwrap();
        let outcome = db
            .execute("INSERT INTO t (name) VALUES (?)", &params!["uno"])
            .await
            .unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.last_insert_id, 1);

        let rows: Vec<(i64, String)> = db.fetch_all("SELECT id, name FROM t", &[]).await.unwrap();
        assert_eq!(rows, vec![(1, "uno".to_string())]);

        let missing: Option<(i64,)> = db
            .fetch_one("SELECT id FROM t WHERE id = ?", &params![99_i64])
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_null_parameter() {
        let db = Database::open(DbConfig::in_memory()).await.unwrap();
        let row: Option<(Option<String>,)> = db
            .fetch_one("SELECT ?", &params![None::<String>])
            .await
            .unwrap();
        assert_eq!(row, Some((None,)));
    }

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let db = Database::open(DbConfig::in_memory()).await.unwrap();
        let clone = db.clone();

        db.close().await;
        db.close().await;

        assert!(!clone.health_check().await);
        let err = clone.execute("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, DbError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_sql_errors_are_mapped() {
        let db = Database::open(DbConfig::in_memory()).await.unwrap();
        let err = db.execute("SELEC nonsense", &[]).await.unwrap_err();
        assert!(matches!(err, DbError::QueryFailed(_)));
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .busy_timeout(Duration::from_secs(1))
            .bootstrap_schema(false);

        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.bootstrap_schema);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[test]
    fn test_option_params() {
        assert_eq!(SqlParam::from(Some("x")), SqlParam::Text("x".to_string()));
        assert_eq!(SqlParam::from(None::<i64>), SqlParam::Null);
        assert_eq!(
            SqlParam::from(Transmission::Automatic),
            SqlParam::Text("Automática".to_string())
        );
    }
}
