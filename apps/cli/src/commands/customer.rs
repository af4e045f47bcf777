//! Customer commands.

use autogest_core::validation::{validate_customer_form, CustomerForm};
use autogest_core::Customer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::context::AppContext;
use crate::error::ApiError;

/// Customer DTO for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl From<Customer> for CustomerDto {
    fn from(c: Customer) -> Self {
        CustomerDto {
            id: c.id,
            name: c.name,
            phone: c.phone,
            email: c.email,
            address: c.address,
            registered_at: c.registered_at,
        }
    }
}

/// Pre-fills an edit form with the stored values.
pub fn form_from_customer(customer: &Customer) -> CustomerForm {
    CustomerForm {
        name: customer.name.clone(),
        phone: customer.phone.clone().unwrap_or_default(),
        email: customer.email.clone().unwrap_or_default(),
        address: customer.address.clone().unwrap_or_default(),
    }
}

/// Edit form for customer `id`, holding its current values.
pub async fn edit_form(ctx: &AppContext, id: i64) -> Result<CustomerForm, ApiError> {
    Ok(form_from_customer(&load_customer(ctx, id).await?))
}

async fn load_customer(ctx: &AppContext, id: i64) -> Result<Customer, ApiError> {
    ctx.db
        .customers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", id))
}

pub async fn create_customer(
    ctx: &AppContext,
    form: CustomerForm,
) -> Result<CustomerDto, ApiError> {
    let new_customer = validate_customer_form(&form)?;
    debug!(name = %new_customer.name, "create_customer command");

    let id = ctx.db.customers().create(&new_customer).await?;
    info!(id = id, "Customer registered");

    Ok(load_customer(ctx, id).await?.into())
}

/// Replaces every field of a customer. Blank optional fields are cleared.
pub async fn update_customer(
    ctx: &AppContext,
    id: i64,
    form: CustomerForm,
) -> Result<CustomerDto, ApiError> {
    let new_customer = validate_customer_form(&form)?;
    debug!(id = id, "update_customer command");

    ctx.db.customers().update(id, &new_customer).await?;
    info!(id = id, "Customer updated");

    Ok(load_customer(ctx, id).await?.into())
}

/// Deletes a customer that has no sales.
///
/// ## Returns
/// * `Err(NotFound)` - No such customer
/// * `Err(Conflict)` - A sale references the customer
pub async fn delete_customer(ctx: &AppContext, id: i64) -> Result<(), ApiError> {
    debug!(id = id, "delete_customer command");

    ctx.db.customers().delete(id).await.map_err(|e| {
        if e.is_foreign_key_violation() {
            ApiError::conflict(format!(
                "Customer {} has registered sales and cannot be deleted",
                id
            ))
        } else {
            e.into()
        }
    })?;

    info!(id = id, "Customer deleted");
    Ok(())
}

pub async fn list_customers(ctx: &AppContext) -> Result<Vec<CustomerDto>, ApiError> {
    let customers = ctx.db.customers().list_all().await?;
    debug!(count = customers.len(), "list_customers command");
    Ok(customers.into_iter().map(CustomerDto::from).collect())
}

pub async fn get_customer(ctx: &AppContext, id: i64) -> Result<CustomerDto, ApiError> {
    Ok(load_customer(ctx, id).await?.into())
}

/// Customers whose name, phone or email contains `criterion`.
pub async fn search_customers(
    ctx: &AppContext,
    criterion: &str,
) -> Result<Vec<CustomerDto>, ApiError> {
    let customers = ctx.db.customers().search(criterion).await?;
    debug!(criterion = %criterion, count = customers.len(), "search_customers command");
    Ok(customers.into_iter().map(CustomerDto::from).collect())
}

/// Writes the customer list document with every customer.
pub async fn customer_report(ctx: &AppContext) -> Result<PathBuf, ApiError> {
    let customers = ctx.db.customers().list_all().await?;
    Ok(ctx.reports.customer_list(&customers)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::TestApp;
    use crate::error::ErrorCode;

    fn form(name: &str) -> CustomerForm {
        CustomerForm {
            name: name.to_string(),
            phone: "555-1234".to_string(),
            email: "ana@example.com".to_string(),
            address: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_trims_and_blanks_become_none() {
        let app = TestApp::new().await;

        let customer = create_customer(&app.ctx, form("  Ana Pérez ")).await.unwrap();

        assert_eq!(customer.name, "Ana Pérez");
        assert_eq!(customer.phone.as_deref(), Some("555-1234"));
        assert!(customer.address.is_none());
    }

    #[tokio::test]
    async fn test_name_is_required() {
        let app = TestApp::new().await;

        let err = create_customer(&app.ctx, form(" ")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Nombre is required");
        assert!(list_customers(&app.ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_missing() {
        let app = TestApp::new().await;
        let customer = create_customer(&app.ctx, form("Ana")).await.unwrap();

        let mut edited = form("Ana María");
        edited.email = String::new();
        let updated = update_customer(&app.ctx, customer.id, edited).await.unwrap();
        assert_eq!(updated.name, "Ana María");
        assert!(updated.email.is_none());

        let err = update_customer(&app.ctx, 404, form("X")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_delete() {
        let app = TestApp::new().await;
        let customer = create_customer(&app.ctx, form("Ana")).await.unwrap();

        delete_customer(&app.ctx, customer.id).await.unwrap();

        assert_eq!(
            get_customer(&app.ctx, customer.id).await.unwrap_err().code,
            ErrorCode::NotFound
        );
        assert_eq!(
            delete_customer(&app.ctx, customer.id).await.unwrap_err().code,
            ErrorCode::NotFound
        );
    }

    #[tokio::test]
    async fn test_search() {
        let app = TestApp::new().await;
        create_customer(&app.ctx, form("Ana")).await.unwrap();
        let mut other = form("Luis");
        other.phone = "777".to_string();
        other.email = String::new();
        create_customer(&app.ctx, other).await.unwrap();

        let found = search_customers(&app.ctx, "777").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Luis");
    }

    #[tokio::test]
    async fn test_form_from_customer() {
        let app = TestApp::new().await;
        let id = create_customer(&app.ctx, form("Ana")).await.unwrap().id;
        let customer = app.ctx.db.customers().get_by_id(id).await.unwrap().unwrap();

        let form = form_from_customer(&customer);
        assert_eq!(form.phone, "555-1234");
        assert_eq!(form.address, "");
    }

    #[tokio::test]
    async fn test_customer_report() {
        let app = TestApp::new().await;
        create_customer(&app.ctx, form("Ana")).await.unwrap();

        let path = customer_report(&app.ctx).await.unwrap();

        assert!(path.ends_with("lista_clientes.pdf"));
        assert!(path.starts_with(app.ctx.reports.output_dir()));
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF-"));
    }
}
