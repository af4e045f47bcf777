//! # autogest-core: Pure Business Logic for AutoGest
//!
//! Domain types, money handling and form validation for the dealership
//! tracker. Nothing in this crate performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AutoGest Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    autogest CLI (apps/cli)                      │   │
//! │  │      car add ──► validate ──► upload photo ──► persist          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ autogest-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐                 │   │
//! │  │   │   types   │  │   money   │  │ validation │                 │   │
//! │  │   │ Car       │  │   Money   │  │ forms      │                 │   │
//! │  │   │ Customer  │  │ parse/fmt │  │ year range │                 │   │
//! │  │   │ Sale      │  │           │  │            │                 │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         autogest-db / autogest-media / autogest-report          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Car, Customer, Sale) and their enums
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Validation error type
//! - [`validation`] - Field checks and form validators
//!
//! ## Example Usage
//!
//! ```rust
//! use autogest_core::money::Money;
//!
//! let price: Money = "18000.00".parse().unwrap();
//! assert_eq!(price.cents(), 1_800_000);
//! assert_eq!(price.to_string(), "$18,000.00");
//! ```

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

pub use error::ValidationError;
pub use money::Money;
pub use types::*;
pub use validation::YearRange;

/// Earliest model year accepted by the default [`YearRange`].
pub const DEFAULT_MIN_YEAR: i32 = 1900;
