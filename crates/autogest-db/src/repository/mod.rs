//! # Repository Module
//!
//! Database repository implementations for AutoGest.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CLI command                                                            │
//! │       │                                                                 │
//! │       │  db.cars().search("toyota")                                     │
//! │       ▼                                                                 │
//! │  CarRepository                                                          │
//! │  ├── create(&self, car, image)                                          │
//! │  ├── get_by_id(&self, id)                                               │
//! │  ├── update(&self, id, car, image)                                      │
//! │  └── delete(&self, id)                                                  │
//! │       │                                                                 │
//! │       │  One parameterised statement per call                           │
//! │       ▼                                                                 │
//! │  Database (execute / fetch_all / fetch_one)                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories do not validate: callers pass drafts that already went
//! through `autogest_core::validation`.
//!
//! ## Available Repositories
//!
//! - [`CarRepository`](car::CarRepository) - Inventory CRUD and search
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer CRUD and search
//! - [`SaleRepository`](sale::SaleRepository) - Sale create/read/delete/search

pub mod car;
pub mod customer;
pub mod sale;

/// Wraps a search term for `LIKE ? ` matching anywhere in the column.
///
/// `%` and `_` typed by the user are kept as wildcards.
pub(crate) fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}
