//! # autogest-report: Printable Documents for AutoGest
//!
//! Renders car sheets, the customer list and sale receipts as PDF files,
//! and passes them to the system viewer or printer.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AutoGest Document Flow                           │
//! │                                                                         │
//! │  SaleDetail (autogest-db)          photo (autogest-media, optional)     │
//! │       │                                  │                              │
//! │       └──────────────┬───────────────────┘                              │
//! │                      ▼                                                  │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 autogest-report (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   documents ──► layout (page flow) ──► pdf (PDF 1.4 writer)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  reportes/venta_12_comprobante.pdf ──► PrintDispatcher (lpr, open)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`documents`] - `ReportGenerator` and the file naming rules
//! - [`pdf`] - Minimal PDF writer
//! - [`printer`] - `PrintDispatcher` and `lpstat` parsing
//! - [`error`] - Report error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod documents;
pub mod error;
mod layout;
pub mod pdf;
pub mod printer;

// =============================================================================
// Re-exports
// =============================================================================

pub use documents::{ReportGenerator, CUSTOMER_LIST_FILE_NAME};
pub use error::{ReportError, ReportResult};
pub use printer::{Platform, PrintDispatcher};
