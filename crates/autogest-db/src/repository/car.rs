//! # Car Repository
//!
//! Database operations for the `autos` table.
//!
//! ## Image Columns
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  imagen / cloudinary_id handling                        │
//! │                                                                         │
//! │  create(car, Some(image))  → both columns written                       │
//! │  create(car, None)         → both columns NULL                          │
//! │                                                                         │
//! │  update(id, car, Some(image)) → UPDATE ... all columns incl. image      │
//! │  update(id, car, None)        → UPDATE ... image columns untouched      │
//! │                                                                         │
//! │  The statement is chosen by whether an image came with the call;        │
//! │  nothing is skipped per field.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::debug;

use autogest_core::{Car, CarImage, NewCar};

use crate::connection::Database;
use crate::error::{DbError, DbResult};
use crate::params;
use crate::repository::like_pattern;

/// Column list mapping the stored names onto [`Car`]'s fields.
macro_rules! select_cars {
    () => {
        r#"
        SELECT
            id_auto        AS id,
            marca          AS make,
            modelo         AS model,
            anio           AS year,
            precio         AS price_cents,
            color,
            transmision    AS transmission,
            combustible    AS fuel,
            imagen         AS image_url,
            cloudinary_id  AS remote_image_id,
            fecha_registro AS registered_at
        FROM autos
        "#
    };
}

/// Repository for car database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.cars();
///
/// let id = repo.create(&new_car, None).await?;
/// let car = repo.get_by_id(id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CarRepository {
    db: Database,
}

impl CarRepository {
    /// Creates a new CarRepository.
    pub fn new(db: Database) -> Self {
        CarRepository { db }
    }

    /// Inserts a car and returns its new id.
    ///
    /// ## Arguments
    /// * `car` - Validated car fields
    /// * `image` - Hosted photo, if one was uploaded
    pub async fn create(&self, car: &NewCar, image: Option<&CarImage>) -> DbResult<i64> {
        debug!(make = %car.make, model = %car.model, has_image = image.is_some(), "Creating car");

        let outcome = self
            .db
            .execute(
                r#"
                INSERT INTO autos (
                    marca, modelo, anio, precio, color, transmision, combustible,
                    imagen, cloudinary_id, fecha_registro
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                &params![
                    &car.make,
                    &car.model,
                    car.year,
                    car.price_cents,
                    &car.color,
                    car.transmission,
                    car.fuel,
                    image.map(|i| i.url.as_str()),
                    image.map(|i| i.remote_id.as_str()),
                    Utc::now(),
                ],
            )
            .await?;

        debug!(id = outcome.last_insert_id, "Car created");
        Ok(outcome.last_insert_id)
    }

    /// Lists every car, most recently registered first.
    pub async fn list_all(&self) -> DbResult<Vec<Car>> {
        let cars: Vec<Car> = self
            .db
            .fetch_all(
                concat!(select_cars!(), "ORDER BY fecha_registro DESC, id_auto DESC"),
                &[],
            )
            .await?;

        debug!(count = cars.len(), "Listed cars");
        Ok(cars)
    }

    /// Gets a car by id.
    ///
    /// ## Returns
    /// * `Ok(Some(car))` - Car found
    /// * `Ok(None)` - No car with that id
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Car>> {
        debug!(id = id, "Getting car by ID");

        self.db
            .fetch_one(concat!(select_cars!(), "WHERE id_auto = ?"), &params![id])
            .await
    }

    /// Overwrites a car's fields.
    ///
    /// With `Some(image)` both image columns are replaced too; with `None`
    /// they keep their current values.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Car doesn't exist
    pub async fn update(&self, id: i64, car: &NewCar, image: Option<&CarImage>) -> DbResult<()> {
        debug!(id = id, has_image = image.is_some(), "Updating car");

        let outcome = match image {
            Some(image) => {
                self.db
                    .execute(
                        r#"
                        UPDATE autos SET
                            marca = ?, modelo = ?, anio = ?, precio = ?, color = ?,
                            transmision = ?, combustible = ?,
                            imagen = ?, cloudinary_id = ?
                        WHERE id_auto = ?
                        "#,
                        &params![
                            &car.make,
                            &car.model,
                            car.year,
                            car.price_cents,
                            &car.color,
                            car.transmission,
                            car.fuel,
                            &image.url,
                            &image.remote_id,
                            id,
                        ],
                    )
                    .await?
            }
            None => {
                self.db
                    .execute(
                        r#"
                        UPDATE autos SET
                            marca = ?, modelo = ?, anio = ?, precio = ?, color = ?,
                            transmision = ?, combustible = ?
                        WHERE id_auto = ?
                        "#,
                        &params![
                            &car.make,
                            &car.model,
                            car.year,
                            car.price_cents,
                            &car.color,
                            car.transmission,
                            car.fuel,
                            id,
                        ],
                    )
                    .await?
            }
        };

        if outcome.rows_affected == 0 {
            return Err(DbError::not_found("Car", id));
        }

        Ok(())
    }

    /// Deletes a car.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Car doesn't exist
    /// * `Err(DbError::ForeignKeyViolation)` - A sale still references it
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = id, "Deleting car");

        let outcome = self
            .db
            .execute("DELETE FROM autos WHERE id_auto = ?", &params![id])
            .await?;

        if outcome.rows_affected == 0 {
            return Err(DbError::not_found("Car", id));
        }

        Ok(())
    }

    /// Finds cars whose make, model or color contains `criterion`.
    ///
    /// A blank criterion returns every car.
    pub async fn search(&self, criterion: &str) -> DbResult<Vec<Car>> {
        let criterion = criterion.trim();

        debug!(criterion = %criterion, "Searching cars");

        if criterion.is_empty() {
            return self.list_all().await;
        }

        let pattern = like_pattern(criterion);
        let cars: Vec<Car> = self
            .db
            .fetch_all(
                concat!(
                    select_cars!(),
                    "WHERE marca LIKE ? OR modelo LIKE ? OR color LIKE ? ",
                    "ORDER BY fecha_registro DESC, id_auto DESC"
                ),
                &params![&pattern, &pattern, &pattern],
            )
            .await?;

        debug!(count = cars.len(), "Search returned cars");
        Ok(cars)
    }

    /// Counts cars in inventory.
    pub async fn count(&self) -> DbResult<i64> {
        let row: Option<(i64,)> = self.db.fetch_one("SELECT COUNT(*) FROM autos", &[]).await?;
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
    use autogest_core::{FuelType, Transmission};

    async fn test_db() -> Database {
        Database::open(DbConfig::in_memory()).await.unwrap()
    }

    fn corolla() -> NewCar {
        NewCar {
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2020,
            price_cents: 1_800_000,
            color: "Rojo".to_string(),
            transmission: Transmission::Manual,
            fuel: FuelType::Gasoline,
        }
    }

    fn civic() -> NewCar {
        NewCar {
            make: "Honda".to_string(),
            model: "Civic".to_string(),
            year: 2022,
            price_cents: 2_250_000,
            color: "Azul".to_string(),
            transmission: Transmission::Automatic,
            fuel: FuelType::Hybrid,
        }
    }

    fn image(n: u32) -> CarImage {
        CarImage {
            url: format!(
                "https://res.cloudinary.com/demo/image/upload/v1/gestion-autos/autos/{n}.jpg"
            ),
            remote_id: format!("gestion-autos/autos/{n}"),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let repo = db.cars();

        let id = repo.create(&corolla(), None).await.unwrap();
        assert!(id > 0);

        let car = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(car.make, "Toyota");
        assert_eq!(car.year, 2020);
        assert_eq!(car.price_cents, 1_800_000);
        assert_eq!(car.transmission, Transmission::Manual);
        assert!(car.image_url.is_none());
        assert!(car.remote_image_id.is_none());
    }

    #[tokio::test]
    async fn test_create_with_image_stores_both_fields() {
        let db = test_db().await;
        let repo = db.cars();

        let id = repo.create(&civic(), Some(&image(1))).await.unwrap();
        let car = repo.get_by_id(id).await.unwrap().unwrap();

        assert_eq!(car.image(), Some(image(1)));
        assert_eq!(car.fuel, FuelType::Hybrid);
        assert_eq!(car.transmission, Transmission::Automatic);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let db = test_db().await;
        assert!(db.cars().get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let db = test_db().await;
        let repo = db.cars();

        let first = repo.create(&corolla(), None).await.unwrap();
        let second = repo.create(&civic(), None).await.unwrap();

        let ids: Vec<i64> = repo.list_all().await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_update_without_image_keeps_image() {
        let db = test_db().await;
        let repo = db.cars();
        let id = repo.create(&corolla(), Some(&image(1))).await.unwrap();

        let mut changed = corolla();
        changed.price_cents = 1_700_000;
        repo.update(id, &changed, None).await.unwrap();

        let car = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(car.price_cents, 1_700_000);
        assert_eq!(car.image(), Some(image(1)));
    }

    #[tokio::test]
    async fn test_update_with_image_replaces_both_fields() {
        let db = test_db().await;
        let repo = db.cars();
        let id = repo.create(&corolla(), Some(&image(1))).await.unwrap();

        repo.update(id, &corolla(), Some(&image(2))).await.unwrap();

        let car = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(car.image(), Some(image(2)));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_car() {
        let db = test_db().await;
        let repo = db.cars();

        let err = repo.update(42, &corolla(), None).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = repo.delete(42).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = test_db().await;
        let repo = db.cars();
        let id = repo.create(&corolla(), None).await.unwrap();

        repo.delete(id).await.unwrap();
        assert!(repo.get_by_id(id).await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_matches_make_model_or_color() {
        let db = test_db().await;
        let repo = db.cars();
        repo.create(&corolla(), None).await.unwrap();
        repo.create(&civic(), None).await.unwrap();

        let by_make = repo.search("toyota").await.unwrap();
        assert_eq!(by_make.len(), 1);
        assert_eq!(by_make[0].model, "Corolla");

        let by_color = repo.search("azu").await.unwrap();
        assert_eq!(by_color.len(), 1);
        assert_eq!(by_color[0].make, "Honda");

        assert!(repo.search("Ferrari").await.unwrap().is_empty());
        assert_eq!(repo.search("   ").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_negative_price_is_rejected_by_schema() {
        let db = test_db().await;
        let mut car = corolla();
        car.price_cents = -1;

        let err = db.cars().create(&car, None).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
