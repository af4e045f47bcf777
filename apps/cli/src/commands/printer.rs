//! Printer commands: list printers, open or print a generated document.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::context::AppContext;
use crate::error::ApiError;

/// Installed printers and which one is the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintersDto {
    pub printers: Vec<String>,
    pub default_printer: Option<String>,
}

/// How a finished document should be delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Open the document in the system viewer.
    pub open: bool,
    /// Send the document to a printer.
    pub print: bool,
    /// Printer to use, `None` for the default.
    pub printer: Option<String>,
    pub copies: u32,
}

pub async fn list_printers(ctx: &AppContext) -> Result<PrintersDto, ApiError> {
    let printers = ctx.printer.available_printers().await?;
    let default_printer = ctx.printer.default_printer().await?;
    debug!(count = printers.len(), "list_printers command");

    Ok(PrintersDto {
        printers,
        default_printer,
    })
}

pub async fn open_document(ctx: &AppContext, path: &Path) -> Result<(), ApiError> {
    Ok(ctx.printer.open(path).await?)
}

pub async fn print_document(
    ctx: &AppContext,
    path: &Path,
    printer: Option<&str>,
    copies: u32,
) -> Result<(), ApiError> {
    Ok(ctx.printer.print(path, printer, copies).await?)
}

/// Opens and/or prints a document that was just generated.
pub async fn deliver(ctx: &AppContext, path: &Path, delivery: &Delivery) -> Result<(), ApiError> {
    if delivery.open {
        open_document(ctx, path).await?;
    }
    if delivery.print {
        print_document(ctx, path, delivery.printer.as_deref(), delivery.copies).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::TestApp;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_missing_document_is_a_document_error() {
        let app = TestApp::new().await;
        let missing = app.ctx.reports.output_dir().join("nada.pdf");

        let err = print_document(&app.ctx, &missing, None, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentError);

        let delivery = Delivery {
            open: true,
            ..Default::default()
        };
        assert_eq!(
            deliver(&app.ctx, &missing, &delivery).await.unwrap_err().code,
            ErrorCode::DocumentError
        );
    }

    #[tokio::test]
    async fn test_empty_delivery_does_nothing() {
        let app = TestApp::new().await;
        let delivery = Delivery::default();

        assert!(!delivery.open && !delivery.print);
        // Nothing is checked or spawned, so even a missing path is fine
        deliver(&app.ctx, Path::new("/nowhere.pdf"), &delivery).await.unwrap();
    }
}
