//! # Commands Module
//!
//! Every operation the CLI exposes. Commands take the [`AppContext`] by
//! reference and return DTOs or [`ApiError`], so they are tested without
//! going through argument parsing.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── car.rs       ◄─── Inventory CRUD, photos, car sheet
//! ├── customer.rs  ◄─── Customer CRUD, customer list
//! ├── sale.rs      ◄─── Sale registration, receipt
//! └── printer.rs   ◄─── Printer discovery, open and print
//! ```
//!
//! [`AppContext`]: crate::context::AppContext
//! [`ApiError`]: crate::error::ApiError

pub mod car;
pub mod customer;
pub mod printer;
pub mod sale;

#[cfg(test)]
pub(crate) mod test_support;
