//! # Customer Repository
//!
//! Database operations for the `clientes` table.

use chrono::Utc;
use tracing::debug;

use autogest_core::{Customer, NewCustomer};

use crate::connection::Database;
use crate::error::{DbError, DbResult};
use crate::params;
use crate::repository::like_pattern;

macro_rules! select_customers {
    () => {
        r#"
        SELECT
            id_cliente     AS id,
            nombre         AS name,
            telefono       AS phone,
            correo         AS email,
            direccion      AS address,
            fecha_registro AS registered_at
        FROM clientes
        "#
    };
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    db: Database,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(db: Database) -> Self {
        CustomerRepository { db }
    }

    /// Inserts a customer and returns the new id.
    pub async fn create(&self, customer: &NewCustomer) -> DbResult<i64> {
        debug!(name = %customer.name, "Creating customer");

        let outcome = self
            .db
            .execute(
                r#"
                INSERT INTO clientes (nombre, telefono, correo, direccion, fecha_registro)
                VALUES (?, ?, ?, ?, ?)
                "#,
                &params![
                    &customer.name,
                    customer.phone.as_deref(),
                    customer.email.as_deref(),
                    customer.address.as_deref(),
                    Utc::now(),
                ],
            )
            .await?;

        Ok(outcome.last_insert_id)
    }

    /// Lists every customer by name.
    pub async fn list_all(&self) -> DbResult<Vec<Customer>> {
        self.db
            .fetch_all(
                concat!(select_customers!(), "ORDER BY nombre, id_cliente"),
                &[],
            )
            .await
    }

    /// Gets a customer by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        debug!(id = id, "Getting customer by ID");

        self.db
            .fetch_one(
                concat!(select_customers!(), "WHERE id_cliente = ?"),
                &params![id],
            )
            .await
    }

    /// Overwrites every field of a customer.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Customer doesn't exist
    pub async fn update(&self, id: i64, customer: &NewCustomer) -> DbResult<()> {
        debug!(id = id, "Updating customer");

        let outcome = self
            .db
            .execute(
                r#"
                UPDATE clientes SET
                    nombre = ?, telefono = ?, correo = ?, direccion = ?
                WHERE id_cliente = ?
                "#,
                &params![
                    &customer.name,
                    customer.phone.as_deref(),
                    customer.email.as_deref(),
                    customer.address.as_deref(),
                    id,
                ],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Deletes a customer.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Customer doesn't exist
    /// * `Err(DbError::ForeignKeyViolation)` - A sale still references it
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = id, "Deleting customer");

        let outcome = self
            .db
            .execute("DELETE FROM clientes WHERE id_cliente = ?", &params![id])
            .await?;

        if outcome.rows_affected == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Finds customers whose name, phone or email contains `criterion`.
    ///
    /// A blank criterion returns everyone.
    pub async fn search(&self, criterion: &str) -> DbResult<Vec<Customer>> {
        let criterion = criterion.trim();

        debug!(criterion = %criterion, "Searching customers");

        if criterion.is_empty() {
            return self.list_all().await;
        }

        let pattern = like_pattern(criterion);
        self.db
            .fetch_all(
                concat!(
                    select_customers!(),
                    "WHERE nombre LIKE ? OR telefono LIKE ? OR correo LIKE ? ",
                    "ORDER BY nombre, id_cliente"
                ),
                &params![&pattern, &pattern, &pattern],
            )
            .await
    }

    /// Counts customers.
    pub async fn count(&self) -> DbResult<i64> {
        let row: Option<(i64,)> = self
            .db
            .fetch_one("SELECT COUNT(*) FROM clientes", &[])
            .await?;
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

    async fn test_db() -> Database {
        Database::open(DbConfig::in_memory()).await.unwrap()
    }

    fn customer(name: &str, phone: Option<&str>, email: Option<&str>) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            phone: phone.map(str::to_string),
            email: email.map(str::to_string),
            address: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let repo = db.customers();

        let id = repo
            .create(&customer("Ana Pérez", Some("555-0101"), None))
            .await
            .unwrap();

        let found = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.name, "Ana Pérez");
        assert_eq!(found.phone.as_deref(), Some("555-0101"));
        assert_eq!(found.email, None);
        assert_eq!(found.address, None);
    }

    #[tokio::test]
    async fn test_list_all_sorted_by_name() {
        let db = test_db().await;
        let repo = db.customers();
        repo.create(&customer("Luis", None, None)).await.unwrap();
        repo.create(&customer("Ana", None, None)).await.unwrap();

        let names: Vec<String> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Ana", "Luis"]);
    }

    #[tokio::test]
    async fn test_update_overwrites_optional_fields() {
        let db = test_db().await;
        let repo = db.customers();
        let id = repo
            .create(&customer("Ana", Some("555-0101"), Some("ana@example.com")))
            .await
            .unwrap();

        repo.update(id, &customer("Ana María", None, Some("ana@example.com")))
            .await
            .unwrap();

        let found = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.name, "Ana María");
        assert_eq!(found.phone, None);
    }

    #[tokio::test]
    async fn test_missing_customer() {
        let db = test_db().await;
        let repo = db.customers();

        assert!(repo.get_by_id(7).await.unwrap().is_none());
        assert!(matches!(
            repo.update(7, &customer("X", None, None)).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(repo.delete(7).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_search_by_name_phone_or_email() {
        let db = test_db().await;
        let repo = db.customers();
        repo.create(&customer("Ana Pérez", Some("555-0101"), None))
            .await
            .unwrap();
        repo.create(&customer("Luis Gómez", None, Some("luis@correo.mx")))
            .await
            .unwrap();

        assert_eq!(repo.search("ANA").await.unwrap().len(), 1);
        assert_eq!(repo.search("0101").await.unwrap()[0].name, "Ana Pérez");
        assert_eq!(repo.search("correo.mx").await.unwrap()[0].name, "Luis Gómez");
        assert_eq!(repo.search("").await.unwrap().len(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
