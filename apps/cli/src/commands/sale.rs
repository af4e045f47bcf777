//! # Sale Commands
//!
//! Sales link a car and a customer. They are recorded and deleted, never
//! edited; the receipt is generated from the joined [`SaleDetail`].

use autogest_core::validation::{validate_sale_form, SaleForm};
use autogest_core::SaleDetail;
use autogest_media::ImageSize;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::context::AppContext;
use crate::error::ApiError;

/// Size the provider is asked for when a photo goes on a receipt.
const RECEIPT_PHOTO_SIZE: ImageSize = ImageSize::new(480, 320);

/// Sale DTO for output, with the car and customer it links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDto {
    pub id: i64,
    pub car_id: i64,
    /// `"Toyota Corolla (2020)"`.
    pub car: String,
    pub customer_id: i64,
    pub customer: String,
    pub amount_cents: i64,
    /// Formatted amount, e.g. `$18,000.00`.
    pub amount: String,
    pub payment_method: String,
    pub sale_date: NaiveDate,
    pub registered_at: DateTime<Utc>,
}

impl From<SaleDetail> for SaleDto {
    fn from(s: SaleDetail) -> Self {
        SaleDto {
            id: s.id,
            car_id: s.car_id,
            car: s.car_description(),
            customer_id: s.customer_id,
            amount_cents: s.amount_cents,
            amount: s.amount().to_string(),
            payment_method: s.payment_method.to_string(),
            sale_date: s.sale_date,
            registered_at: s.registered_at,
            customer: s.customer_name,
        }
    }
}

/// Today's date in the form's format, the default for new sales.
pub fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

async fn load_sale(ctx: &AppContext, id: i64) -> Result<SaleDetail, ApiError> {
    ctx.db
        .sales()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", id))
}

/// Records a sale.
///
/// ## Returns
/// * `Err(ValidationError)` - Bad ids, amount, payment method or date
/// * `Err(Conflict)` - The car or the customer does not exist
pub async fn create_sale(ctx: &AppContext, form: SaleForm) -> Result<SaleDto, ApiError> {
    let new_sale = validate_sale_form(&form)?;
    debug!(
        car_id = new_sale.car_id,
        customer_id = new_sale.customer_id,
        "create_sale command"
    );

    let id = ctx.db.sales().create(&new_sale).await.map_err(|e| {
        if e.is_foreign_key_violation() {
            ApiError::conflict(format!(
                "Car {} or customer {} does not exist",
                new_sale.car_id, new_sale.customer_id
            ))
        } else {
            e.into()
        }
    })?;

    info!(id = id, amount = %new_sale.amount(), "Sale registered");
    Ok(load_sale(ctx, id).await?.into())
}

pub async fn delete_sale(ctx: &AppContext, id: i64) -> Result<(), ApiError> {
    debug!(id = id, "delete_sale command");
    ctx.db.sales().delete(id).await?;
    info!(id = id, "Sale deleted");
    Ok(())
}

/// All sales, latest first.
pub async fn list_sales(ctx: &AppContext) -> Result<Vec<SaleDto>, ApiError> {
    let sales = ctx.db.sales().list_all().await?;
    debug!(count = sales.len(), "list_sales command");
    Ok(sales.into_iter().map(SaleDto::from).collect())
}

pub async fn get_sale(ctx: &AppContext, id: i64) -> Result<SaleDto, ApiError> {
    Ok(load_sale(ctx, id).await?.into())
}

/// Sales whose customer name, car make or car model contains `criterion`.
pub async fn search_sales(ctx: &AppContext, criterion: &str) -> Result<Vec<SaleDto>, ApiError> {
    let sales = ctx.db.sales().search(criterion).await?;
    debug!(criterion = %criterion, count = sales.len(), "search_sales command");
    Ok(sales.into_iter().map(SaleDto::from).collect())
}

/// Writes the receipt of a sale, with the car photo when it loads.
pub async fn sale_receipt(ctx: &AppContext, id: i64) -> Result<PathBuf, ApiError> {
    let sale = load_sale(ctx, id).await?;

    let photo = match sale.car_image_url.as_deref() {
        Some(url) => ctx.thumbnails.load(url, RECEIPT_PHOTO_SIZE).await,
        None => None,
    };

    Ok(ctx.reports.sale_receipt(&sale, photo.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::car::create_car;
    use crate::commands::customer::{create_customer, delete_customer};
    use crate::commands::test_support::TestApp;
    use crate::error::ErrorCode;
    use autogest_core::validation::{CarForm, CustomerForm};

    struct Fixture {
        app: TestApp,
        car_id: i64,
        customer_id: i64,
    }

    async fn fixture() -> Fixture {
        let app = TestApp::new().await;
        let car = create_car(
            &app.ctx,
            CarForm {
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                year: "2020".to_string(),
                price: "18500".to_string(),
                color: "Blanco".to_string(),
                transmission: "Manual".to_string(),
                fuel: "Gasolina".to_string(),
            },
            None,
        )
        .await
        .unwrap();
        let customer = create_customer(
            &app.ctx,
            CustomerForm {
                name: "Ana Pérez".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        Fixture {
            app,
            car_id: car.car.id,
            customer_id: customer.id,
        }
    }

    fn form(car_id: i64, customer_id: i64) -> SaleForm {
        SaleForm {
            car_id: car_id.to_string(),
            customer_id: customer_id.to_string(),
            amount: "18,000.00".to_string(),
            payment_method: "efectivo".to_string(),
            sale_date: "2024-03-15".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_sale_joins_car_and_customer() {
        let f = fixture().await;

        let sale = create_sale(&f.app.ctx, form(f.car_id, f.customer_id)).await.unwrap();

        assert_eq!(sale.car, "Toyota Corolla (2020)");
        assert_eq!(sale.customer, "Ana Pérez");
        assert_eq!(sale.amount, "$18,000.00");
        assert_eq!(sale.amount_cents, 1_800_000);
        assert_eq!(sale.payment_method, "Efectivo");
        assert_eq!(sale.sale_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[tokio::test]
    async fn test_unknown_car_is_a_conflict() {
        let f = fixture().await;

        let err = create_sale(&f.app.ctx, form(999, f.customer_id)).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(list_sales(&f.app.ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_form() {
        let f = fixture().await;

        let mut bad = form(f.car_id, f.customer_id);
        bad.sale_date = "15/03/2024".to_string();
        assert_eq!(
            create_sale(&f.app.ctx, bad).await.unwrap_err().code,
            ErrorCode::ValidationError
        );

        let mut bad = form(f.car_id, f.customer_id);
        bad.payment_method = "Cheque".to_string();
        assert_eq!(
            create_sale(&f.app.ctx, bad).await.unwrap_err().code,
            ErrorCode::ValidationError
        );
    }

    #[tokio::test]
    async fn test_customer_with_sale_cannot_be_deleted_until_sale_is() {
        let f = fixture().await;
        let sale = create_sale(&f.app.ctx, form(f.car_id, f.customer_id)).await.unwrap();

        assert_eq!(
            delete_customer(&f.app.ctx, f.customer_id).await.unwrap_err().code,
            ErrorCode::Conflict
        );

        delete_sale(&f.app.ctx, sale.id).await.unwrap();
        delete_customer(&f.app.ctx, f.customer_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_sale() {
        let f = fixture().await;
        assert_eq!(delete_sale(&f.app.ctx, 3).await.unwrap_err().code, ErrorCode::NotFound);
        assert_eq!(get_sale(&f.app.ctx, 3).await.unwrap_err().code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_search_by_customer_and_model() {
        let f = fixture().await;
        create_sale(&f.app.ctx, form(f.car_id, f.customer_id)).await.unwrap();

        assert_eq!(search_sales(&f.app.ctx, "pérez").await.unwrap().len(), 1);
        assert_eq!(search_sales(&f.app.ctx, "coroll").await.unwrap().len(), 1);
        assert!(search_sales(&f.app.ctx, "Honda").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sale_receipt() {
        let f = fixture().await;
        let sale = create_sale(&f.app.ctx, form(f.car_id, f.customer_id)).await.unwrap();

        let path = sale_receipt(&f.app.ctx, sale.id).await.unwrap();

        assert!(path.file_name().unwrap().to_string_lossy().contains(&sale.id.to_string()));
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF-"));
    }

    #[test]
    fn test_today_is_a_valid_form_date() {
        assert!(NaiveDate::parse_from_str(&today(), "%Y-%m-%d").is_ok());
    }
}
