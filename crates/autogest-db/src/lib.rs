//! # autogest-db: Database Layer for AutoGest
//!
//! This crate provides database access for the dealership tracker.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AutoGest Data Flow                               │
//! │                                                                         │
//! │  CLI command (car add)                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    autogest-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │    Schema    │   │   │
//! │  │   │(connection.rs)│    │               │    │  (embedded)  │   │   │
//! │  │   │               │    │ CarRepo       │    │              │   │   │
//! │  │   │ one conn      │◄───│ CustomerRepo  │    │  schema.sql  │   │   │
//! │  │   │ behind Mutex  │    │ SaleRepo      │    │              │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/autogest/venta_autos_db.db                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`connection`] - The shared connection and statement primitives
//! - [`schema`] - Embedded schema bootstrap
//! - [`error`] - Database error types
//! - [`repository`] - Car, customer and sale repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use autogest_db::{Database, DbConfig};
//!
//! let db = Database::open(DbConfig::new("path/to/venta_autos_db.db")).await?;
//!
//! let cars = db.cars().search("toyota").await?;
//! let sales = db.sales().list_all().await?;
//!
//! db.close().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod connection;
pub mod error;
pub mod repository;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use connection::{Database, DbConfig, ExecOutcome, SqlParam};
pub use error::{DbError, DbResult};

// Repository re-exports for convenience
pub use repository::car::CarRepository;
pub use repository::customer::CustomerRepository;
pub use repository::sale::SaleRepository;
