//! # Validation Module
//!
//! Input validation for the car, customer and sale forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI arguments (clap)                                          │
//! │  └── Raw strings, exactly as typed                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Required fields, numeric parsing, ranges                           │
//! │  └── First failing check wins (sequential `?`)                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use autogest_core::validation::{validate_car_form, CarForm, YearRange};
//!
//! let form = CarForm {
//!     make: "Toyota".into(),
//!     model: "Corolla".into(),
//!     year: "2020".into(),
//!     price: "18000".into(),
//!     color: "Rojo".into(),
//!     transmission: "Manual".into(),
//!     fuel: "Gasolina".into(),
//! };
//! let car = validate_car_form(&form, YearRange::new(1900, 2027)).unwrap();
//! assert_eq!(car.price_cents, 1_800_000);
//! ```

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{FuelType, NewCar, NewCustomer, NewSale, PaymentMethod, Transmission};
use crate::DEFAULT_MIN_YEAR;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Year Range
// =============================================================================

/// Accepted model years, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub const fn new(min: i32, max: i32) -> Self {
        YearRange { min, max }
    }

    /// The default range as seen from `current_year`: 1900 through next
    /// year's models.
    pub const fn for_current_year(current_year: i32) -> Self {
        YearRange::new(DEFAULT_MIN_YEAR, current_year + 1)
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        YearRange::for_current_year(Utc::now().year())
    }
}

// =============================================================================
// Field Validators
// =============================================================================

/// Requires a non-blank value.
///
/// ## Returns
/// The trimmed value.
///
/// ## Example
/// ```rust
/// use autogest_core::validation::require_non_empty;
///
/// assert_eq!(require_non_empty("  Toyota ", "Marca").unwrap(), "Toyota");
/// assert!(require_non_empty("   ", "Marca").is_err());
/// ```
pub fn require_non_empty(value: &str, label: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: label.to_string(),
        });
    }

    Ok(value.to_string())
}

/// Parses a number and checks it against `min` and an optional `max`.
///
/// Works for any type that parses from text and orders, so the same check
/// covers years (`i32`), ids (`i64`) and amounts ([`Money`]).
///
/// ## Arguments
/// * `value` - Raw input
/// * `label` - Field label used in the message
/// * `min` - Smallest accepted value
/// * `max` - Largest accepted value, if bounded
///
/// ## Errors
/// - `Required` for blank input
/// - `NotANumber` when the text does not parse
/// - `BelowMinimum` / `OutOfRange` when outside the bounds
pub fn require_number_in_range<T>(
    value: &str,
    label: &str,
    min: T,
    max: Option<T>,
) -> ValidationResult<T>
where
    T: FromStr + PartialOrd + Display,
{
    let raw = require_non_empty(value, label)?;

    let number: T = raw.parse().map_err(|_| ValidationError::NotANumber {
        field: label.to_string(),
    })?;

    match max {
        Some(max) if number < min || number > max => Err(ValidationError::OutOfRange {
            field: label.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }),
        None if number < min => Err(ValidationError::BelowMinimum {
            field: label.to_string(),
            min: min.to_string(),
        }),
        _ => Ok(number),
    }
}

/// Validates a model year against the configured range (label "Año").
pub fn require_year_in_range(value: &str, range: YearRange) -> ValidationResult<i32> {
    require_number_in_range(value, "Año", range.min, Some(range.max))
}

/// Trims an optional field; blank input becomes `None`.
pub fn optional_text(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str, label: &str) -> ValidationResult<NaiveDate> {
    let raw = require_non_empty(value, label)?;

    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| ValidationError::InvalidFormat {
        field: label.to_string(),
        reason: "expected a date as YYYY-MM-DD".to_string(),
    })
}

// =============================================================================
// Forms
// =============================================================================

/// Car form input, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarForm {
    pub make: String,
    pub model: String,
    pub year: String,
    pub price: String,
    pub color: String,
    pub transmission: String,
    pub fuel: String,
}

/// Customer form input, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

/// Sale form input, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleForm {
    pub car_id: String,
    pub customer_id: String,
    pub amount: String,
    pub payment_method: String,
    pub sale_date: String,
}

/// Validates the car form.
///
/// Checks run in form order (Marca, Modelo, Año, Precio, Color,
/// Transmisión, Combustible) and stop at the first failure.
pub fn validate_car_form(form: &CarForm, years: YearRange) -> ValidationResult<NewCar> {
    let make = require_non_empty(&form.make, "Marca")?;
    let model = require_non_empty(&form.model, "Modelo")?;
    let year = require_year_in_range(&form.year, years)?;
    let price = require_number_in_range(&form.price, "Precio", Money::zero(), None)?;
    let color = require_non_empty(&form.color, "Color")?;
    let transmission: Transmission = form.transmission.parse()?;
    let fuel: FuelType = form.fuel.parse()?;

    Ok(NewCar {
        make,
        model,
        year,
        price_cents: price.cents(),
        color,
        transmission,
        fuel,
    })
}

/// Validates the customer form. Only the name is required.
pub fn validate_customer_form(form: &CustomerForm) -> ValidationResult<NewCustomer> {
    Ok(NewCustomer {
        name: require_non_empty(&form.name, "Nombre")?,
        phone: optional_text(&form.phone),
        email: optional_text(&form.email),
        address: optional_text(&form.address),
    })
}

/// Validates the sale form.
pub fn validate_sale_form(form: &SaleForm) -> ValidationResult<NewSale> {
    let car_id = require_number_in_range::<i64>(&form.car_id, "Auto", 1, None)?;
    let customer_id = require_number_in_range::<i64>(&form.customer_id, "Cliente", 1, None)?;
    let amount = require_number_in_range(&form.amount, "Monto", Money::zero(), None)?;
    let payment_method: PaymentMethod = form.payment_method.parse()?;
    let sale_date = parse_date(&form.sale_date, "Fecha")?;

    Ok(NewSale {
        car_id,
        customer_id,
        amount_cents: amount.cents(),
        payment_method,
        sale_date,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const YEARS: YearRange = YearRange::new(1900, 2027);

    fn car_form() -> CarForm {
        CarForm {
            make: "Toyota".into(),
            model: "Corolla".into(),
            year: "2020".into(),
            price: "18000.00".into(),
            color: "Rojo".into(),
            transmission: "Manual".into(),
            fuel: "Gasolina".into(),
        }
    }

    #[test]
    fn test_require_non_empty() {
        assert_eq!(require_non_empty(" Rojo ", "Color").unwrap(), "Rojo");
        assert_eq!(
            require_non_empty("", "Color").unwrap_err().to_string(),
            "Color is required"
        );
    }

    #[test]
    fn test_number_in_range() {
        assert_eq!(require_number_in_range::<i32>("5", "N", 1, Some(10)).unwrap(), 5);
        assert!(matches!(
            require_number_in_range::<i32>("abc", "N", 1, Some(10)),
            Err(ValidationError::NotANumber { .. })
        ));
        assert!(matches!(
            require_number_in_range::<i32>("11", "N", 1, Some(10)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            require_number_in_range::<i64>("0", "Auto", 1, None),
            Err(ValidationError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn test_year_range_boundaries() {
        assert_eq!(require_year_in_range("1900", YEARS).unwrap(), 1900);
        assert_eq!(require_year_in_range("2027", YEARS).unwrap(), 2027);
        assert_eq!(
            require_year_in_range("1899", YEARS).unwrap_err().to_string(),
            "Año must be between 1900 and 2027"
        );
        assert!(require_year_in_range("2028", YEARS).is_err());
    }

    #[test]
    fn test_default_year_range_allows_next_year() {
        let range = YearRange::for_current_year(2026);
        assert!(range.contains(2027));
        assert!(!range.contains(2028));
        assert!(range.contains(1900));
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("   "), None);
        assert_eq!(optional_text(" a@b.c "), Some("a@b.c".to_string()));
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("2024-03-15", "Fecha").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert!(matches!(
            parse_date("15/03/2024", "Fecha"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_valid_car_form() {
        let car = validate_car_form(&car_form(), YEARS).unwrap();
        assert_eq!(car.make, "Toyota");
        assert_eq!(car.year, 2020);
        assert_eq!(car.price_cents, 1_800_000);
        assert_eq!(car.transmission, Transmission::Manual);
    }

    #[test]
    fn test_car_form_reports_first_failure() {
        let mut form = car_form();
        form.make = String::new();
        form.year = "1800".into();
        let err = validate_car_form(&form, YEARS).unwrap_err();
        assert_eq!(err.to_string(), "Marca is required");

        let mut form = car_form();
        form.year = "1800".into();
        form.price = "-1".into();
        let err = validate_car_form(&form, YEARS).unwrap_err();
        assert_eq!(err.field(), "Año");
    }

    #[test]
    fn test_car_form_rejects_negative_price() {
        let mut form = car_form();
        form.price = "-5".into();
        let err = validate_car_form(&form, YEARS).unwrap_err();
        assert_eq!(err.to_string(), "Precio must be at least $0.00");

        form.price = "abc".into();
        let err = validate_car_form(&form, YEARS).unwrap_err();
        assert_eq!(err.to_string(), "Precio must be a valid number");
    }

    #[test]
    fn test_zero_price_is_accepted() {
        let mut form = car_form();
        form.price = "0".into();
        assert_eq!(validate_car_form(&form, YEARS).unwrap().price_cents, 0);
    }

    #[test]
    fn test_customer_form() {
        let form = CustomerForm {
            name: " Ana Pérez ".into(),
            phone: "".into(),
            email: "ana@example.com".into(),
            address: "  ".into(),
        };
        let customer = validate_customer_form(&form).unwrap();
        assert_eq!(customer.name, "Ana Pérez");
        assert_eq!(customer.phone, None);
        assert_eq!(customer.email.as_deref(), Some("ana@example.com"));
        assert_eq!(customer.address, None);

        let err = validate_customer_form(&CustomerForm::default()).unwrap_err();
        assert_eq!(err.to_string(), "Nombre is required");
    }

    #[test]
    fn test_sale_form() {
        let form = SaleForm {
            car_id: "3".into(),
            customer_id: "7".into(),
            amount: "17500.50".into(),
            payment_method: "transferencia".into(),
            sale_date: "2024-05-01".into(),
        };
        let sale = validate_sale_form(&form).unwrap();
        assert_eq!(sale.car_id, 3);
        assert_eq!(sale.customer_id, 7);
        assert_eq!(sale.amount_cents, 1_750_050);
        assert_eq!(sale.payment_method, PaymentMethod::Transfer);

        let mut bad = form.clone();
        bad.amount = "-1".into();
        assert_eq!(validate_sale_form(&bad).unwrap_err().field(), "Monto");

        let mut bad = form;
        bad.car_id = "0".into();
        assert_eq!(validate_sale_form(&bad).unwrap_err().field(), "Auto");
    }
}
