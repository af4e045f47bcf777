//! # Sale Repository
//!
//! Database operations for the `ventas` table.
//!
//! ## Reads Are Joined
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SaleDetail                                      │
//! │                                                                         │
//! │   ventas v ──► autos a      (marca, modelo, anio, color, imagen)        │
//! │            └─► clientes c   (nombre, telefono, correo, direccion)       │
//! │                                                                         │
//! │   Listings and receipts need both sides, so every read returns the      │
//! │   joined row instead of bare foreign keys.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales are never edited: create, read, delete and search only.

use chrono::Utc;
use tracing::debug;

use autogest_core::{NewSale, SaleDetail};

use crate::connection::Database;
use crate::error::{DbError, DbResult};
use crate::params;
use crate::repository::like_pattern;

macro_rules! select_sale_details {
    () => {
        r#"
        SELECT
            v.id_venta       AS id,
            v.id_auto        AS car_id,
            v.id_cliente     AS customer_id,
            v.monto          AS amount_cents,
            v.metodo_pago    AS payment_method,
            v.fecha_venta    AS sale_date,
            v.fecha_registro AS registered_at,
            a.marca          AS car_make,
            a.modelo         AS car_model,
            a.anio           AS car_year,
            a.color          AS car_color,
            a.imagen         AS car_image_url,
            c.nombre         AS customer_name,
            c.telefono       AS customer_phone,
            c.correo         AS customer_email,
            c.direccion      AS customer_address
        FROM ventas v
        INNER JOIN autos a ON a.id_auto = v.id_auto
        INNER JOIN clientes c ON c.id_cliente = v.id_cliente
        "#
    };
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    db: Database,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(db: Database) -> Self {
        SaleRepository { db }
    }

    /// Records a sale and returns its id.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - Car or customer doesn't exist
    pub async fn create(&self, sale: &NewSale) -> DbResult<i64> {
        debug!(
            car_id = sale.car_id,
            customer_id = sale.customer_id,
            amount_cents = sale.amount_cents,
            "Creating sale"
        );

        let outcome = self
            .db
            .execute(
                r#"
                INSERT INTO ventas (
                    id_auto, id_cliente, monto, metodo_pago, fecha_venta, fecha_registro
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
                &params![
                    sale.car_id,
                    sale.customer_id,
                    sale.amount_cents,
                    sale.payment_method,
                    sale.sale_date,
                    Utc::now(),
                ],
            )
            .await?;

        Ok(outcome.last_insert_id)
    }

    /// Lists every sale, latest sale date first.
    pub async fn list_all(&self) -> DbResult<Vec<SaleDetail>> {
        self.db
            .fetch_all(
                concat!(
                    select_sale_details!(),
                    "ORDER BY v.fecha_venta DESC, v.id_venta DESC"
                ),
                &[],
            )
            .await
    }

    /// Gets a sale with its car and customer.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<SaleDetail>> {
        debug!(id = id, "Getting sale by ID");

        self.db
            .fetch_one(
                concat!(select_sale_details!(), "WHERE v.id_venta = ?"),
                &params![id],
            )
            .await
    }

    /// Deletes a sale.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Sale doesn't exist
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = id, "Deleting sale");

        let outcome = self
            .db
            .execute("DELETE FROM ventas WHERE id_venta = ?", &params![id])
            .await?;

        if outcome.rows_affected == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }

    /// Finds sales by customer name, car make or car model.
    ///
    /// A blank criterion returns every sale.
    pub async fn search(&self, criterion: &str) -> DbResult<Vec<SaleDetail>> {
        let criterion = criterion.trim();

        debug!(criterion = %criterion, "Searching sales");

        if criterion.is_empty() {
            return self.list_all().await;
        }

        let pattern = like_pattern(criterion);
        self.db
            .fetch_all(
                concat!(
                    select_sale_details!(),
                    "WHERE c.nombre LIKE ? OR a.marca LIKE ? OR a.modelo LIKE ? ",
                    "ORDER BY v.fecha_venta DESC, v.id_venta DESC"
                ),
                &params![&pattern, &pattern, &pattern],
            )
            .await
    }

    /// Counts sales.
    pub async fn count(&self) -> DbResult<i64> {
        let row: Option<(i64,)> = self.db.fetch_one("SELECT COUNT(*) FROM ventas", &[]).await?;
        Ok(row.map_or(0, |(n,)| n))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use autogest_core::{CarImage, FuelType, NewCar, NewCustomer, PaymentMethod, Transmission};
    use chrono::NaiveDate;

    struct Fixture {
        db: Database,
        car_id: i64,
        customer_id: i64,
    }

    async fn fixture() -> Fixture {
        let db = Database::open(DbConfig::in_memory()).await.unwrap();

        let car_id = db
            .cars()
            .create(
                &NewCar {
                    make: "Mazda".to_string(),
                    model: "3".to_string(),
                    year: 2021,
                    price_cents: 2_000_000,
                    color: "Gris".to_string(),
                    transmission: Transmission::Manual,
                    fuel: FuelType::Gasoline,
                },
                Some(&CarImage {
                    url: "https://res.cloudinary.com/demo/image/upload/mazda.jpg".to_string(),
                    remote_id: "gestion-autos/autos/mazda".to_string(),
                }),
            )
            .await
            .unwrap();

        let customer_id = db
            .customers()
            .create(&NewCustomer {
                name: "Carla Ruiz".to_string(),
                phone: Some("555-0199".to_string()),
                email: None,
                address: Some("Av. Juárez 10".to_string()),
            })
            .await
            .unwrap();

        Fixture {
            db,
            car_id,
            customer_id,
        }
    }

    fn sale(f: &Fixture, day: u32) -> NewSale {
        NewSale {
            car_id: f.car_id,
            customer_id: f.customer_id,
            amount_cents: 1_950_000,
            payment_method: PaymentMethod::Transfer,
            sale_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_and_read_denormalised_detail() {
        let f = fixture().await;
        let repo = f.db.sales();

        let id = repo.create(&sale(&f, 1)).await.unwrap();
        let detail = repo.get_by_id(id).await.unwrap().unwrap();

        assert_eq!(detail.amount_cents, 1_950_000);
        assert_eq!(detail.payment_method, PaymentMethod::Transfer);
        assert_eq!(detail.sale_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(detail.car_make, "Mazda");
        assert_eq!(detail.car_year, 2021);
        assert_eq!(
            detail.car_image_url.as_deref(),
            Some("https://res.cloudinary.com/demo/image/upload/mazda.jpg")
        );
        assert_eq!(detail.customer_name, "Carla Ruiz");
        assert_eq!(detail.customer_address.as_deref(), Some("Av. Juárez 10"));
    }

    #[tokio::test]
    async fn test_list_latest_sale_date_first() {
        let f = fixture().await;
        let repo = f.db.sales();

        let older = repo.create(&sale(&f, 1)).await.unwrap();
        let newer = repo.create(&sale(&f, 20)).await.unwrap();

        let ids: Vec<i64> = repo.list_all().await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer, older]);
    }

    #[tokio::test]
    async fn test_sale_requires_existing_car_and_customer() {
        let f = fixture().await;
        let mut bad = sale(&f, 1);
        bad.car_id = 999;

        let err = f.db.sales().create(&bad).await.unwrap_err();
        assert!(err.is_foreign_key_violation());
    }

    #[tokio::test]
    async fn test_referenced_car_and_customer_cannot_be_deleted() {
        let f = fixture().await;
        f.db.sales().create(&sale(&f, 1)).await.unwrap();

        let err = f.db.cars().delete(f.car_id).await.unwrap_err();
        assert!(err.is_foreign_key_violation());

        let err = f.db.customers().delete(f.customer_id).await.unwrap_err();
        assert!(err.is_foreign_key_violation());

        assert_eq!(f.db.cars().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_sale_frees_the_car() {
        let f = fixture().await;
        let id = f.db.sales().create(&sale(&f, 1)).await.unwrap();

        f.db.sales().delete(id).await.unwrap();
        assert!(matches!(
            f.db.sales().delete(id).await,
            Err(DbError::NotFound { .. })
        ));

        f.db.cars().delete(f.car_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_search_by_customer_or_car() {
        let f = fixture().await;
        let repo = f.db.sales();
        repo.create(&sale(&f, 1)).await.unwrap();

        assert_eq!(repo.search("carla").await.unwrap().len(), 1);
        assert_eq!(repo.search("mazda").await.unwrap().len(), 1);
        assert!(repo.search("Ferrari").await.unwrap().is_empty());
        assert_eq!(repo.search("").await.unwrap().len(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
