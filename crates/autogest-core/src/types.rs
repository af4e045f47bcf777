//! # Domain Types
//!
//! Core domain types used throughout AutoGest.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Car        │   │    Customer     │   │   SaleDetail    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (autos)     │   │  id (clientes)  │   │  id (ventas)    │       │
//! │  │  make / model   │   │  name           │   │  car_* fields   │       │
//! │  │  price_cents    │   │  phone / email  │   │  customer_*     │       │
//! │  │  image_url      │   │  address        │   │  amount_cents   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Transmission   │   │    FuelType     │   │ PaymentMethod   │       │
//! │  │  Manual         │   │  Gasolina       │   │  Efectivo       │       │
//! │  │  Automática     │   │  Diésel ...     │   │  Tarjeta ...    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Records vs. Drafts
//! Every entity comes in two shapes:
//! - the stored record (`Car`, `Customer`, `SaleDetail`) with its database id
//!   and registration timestamp
//! - the draft (`NewCar`, `NewCustomer`, `NewSale`) produced by validation
//!   and consumed by the repositories
//!
//! Enum values are stored with the exact labels the forms show
//! (`Automática`, `Diésel`, ...), so the database stays readable.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

/// Lowercases and strips Spanish accents so `"automatica"` matches `"Automática"`.
fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' => 'u',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Declares a closed set of stored labels with `as_str`, `ALL`, `Display`
/// and an accent-insensitive `FromStr`.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, field = $field:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $label)]
                #[cfg_attr(feature = "sqlx", sqlx(rename = $label))]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in the order the form offers them.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Form label of the field this value belongs to.
            pub const FIELD: &'static str = $field;

            /// The stored/displayed label.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = fold(s);
                if wanted.is_empty() {
                    return Err(ValidationError::Required {
                        field: $field.to_string(),
                    });
                }
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| fold(v.as_str()) == wanted)
                    .ok_or_else(|| ValidationError::NotAllowed {
                        field: $field.to_string(),
                        allowed: $name::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    })
            }
        }
    };
}

// =============================================================================
// Enumerations
// =============================================================================

labelled_enum! {
    /// Gearbox type of a car.
    Transmission, field = "Transmisión" {
        Manual => "Manual",
        Automatic => "Automática",
    }
}

labelled_enum! {
    /// Fuel a car runs on.
    FuelType, field = "Combustible" {
        Gasoline => "Gasolina",
        Diesel => "Diésel",
        Electric => "Eléctrico",
        Hybrid => "Híbrido",
    }
}

labelled_enum! {
    /// How a sale was paid.
    PaymentMethod, field = "Método de pago" {
        /// Physical cash payment.
        Cash => "Efectivo",
        /// Debit or credit card.
        Card => "Tarjeta",
        /// Bank transfer.
        Transfer => "Transferencia",
    }
}

impl Default for Transmission {
    fn default() -> Self {
        Transmission::Manual
    }
}

impl Default for FuelType {
    fn default() -> Self {
        FuelType::Gasoline
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Car
// =============================================================================

/// A car in the dealership inventory (`autos` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Car {
    /// Database id (`id_auto`), always positive.
    pub id: i64,
    pub make: String,
    pub model: String,
    /// Model year.
    pub year: i32,
    /// Price in cents (smallest currency unit).
    pub price_cents: i64,
    pub color: String,
    pub transmission: Transmission,
    pub fuel: FuelType,
    /// Delivery URL of the hosted photo.
    pub image_url: Option<String>,
    /// Provider-side id of the hosted photo, needed to delete it.
    pub remote_image_id: Option<String>,
    /// Set once on insert.
    pub registered_at: DateTime<Utc>,
}

impl Car {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// The photo attached to this car, if any.
    ///
    /// Both columns are written together, so either both are set or
    /// neither is.
    pub fn image(&self) -> Option<CarImage> {
        match (&self.image_url, &self.remote_image_id) {
            (Some(url), Some(remote_id)) => Some(CarImage {
                url: url.clone(),
                remote_id: remote_id.clone(),
            }),
            _ => None,
        }
    }

    /// `"Toyota Corolla (2020)"`, used in listings and pickers.
    pub fn display_name(&self) -> String {
        format!("{} {} ({})", self.make, self.model, self.year)
    }
}

/// Validated car fields, ready to insert or to overwrite an existing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCar {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price_cents: i64,
    pub color: String,
    pub transmission: Transmission,
    pub fuel: FuelType,
}

impl NewCar {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// A hosted photo: where to show it and how to delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarImage {
    pub url: String,
    pub remote_id: String,
}

// =============================================================================
// Customer
// =============================================================================

/// A dealership customer (`clientes` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub registered_at: DateTime<Utc>,
}

/// Validated customer fields. Blank optional fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// Validated sale fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub car_id: i64,
    pub customer_id: i64,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub sale_date: NaiveDate,
}

impl NewSale {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// A sale joined with the car and customer it references.
///
/// This is what every sale read returns: listings and receipts need the
/// car and customer fields next to the sale's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleDetail {
    pub id: i64,
    pub car_id: i64,
    pub customer_id: i64,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub sale_date: NaiveDate,
    pub registered_at: DateTime<Utc>,

    // Car snapshot (joined)
    pub car_make: String,
    pub car_model: String,
    pub car_year: i32,
    pub car_color: String,
    pub car_image_url: Option<String>,

    // Customer snapshot (joined)
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
}

impl SaleDetail {
    /// Returns the sale amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// `"Toyota Corolla (2020)"`.
    pub fn car_description(&self) -> String {
        format!("{} {} ({})", self.car_make, self.car_model, self.car_year)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_car() -> Car {
        Car {
            id: 1,
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2020,
            price_cents: 1_800_000,
            color: "Rojo".to_string(),
            transmission: Transmission::Manual,
            fuel: FuelType::Gasoline,
            image_url: None,
            remote_image_id: None,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_enum_labels_round_trip_through_from_str() {
        for t in Transmission::ALL {
            assert_eq!(t.as_str().parse::<Transmission>().unwrap(), *t);
        }
        for f in FuelType::ALL {
            assert_eq!(f.as_str().parse::<FuelType>().unwrap(), *f);
        }
        for p in PaymentMethod::ALL {
            assert_eq!(p.to_string().parse::<PaymentMethod>().unwrap(), *p);
        }
    }

    #[test]
    fn test_enum_parsing_ignores_case_and_accents() {
        assert_eq!("automatica".parse::<Transmission>().unwrap(), Transmission::Automatic);
        assert_eq!(" DIESEL ".parse::<FuelType>().unwrap(), FuelType::Diesel);
        assert_eq!("híbrido".parse::<FuelType>().unwrap(), FuelType::Hybrid);
    }

    #[test]
    fn test_enum_parsing_rejects_unknown_values() {
        let err = "Cheque".parse::<PaymentMethod>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Método de pago must be one of: Efectivo, Tarjeta, Transferencia"
        );

        let err = "  ".parse::<Transmission>().unwrap_err();
        assert_eq!(err, ValidationError::Required { field: "Transmisión".to_string() });
    }

    #[test]
    fn test_enum_serializes_as_label() {
        let json = serde_json::to_string(&FuelType::Electric).unwrap();
        assert_eq!(json, "\"Eléctrico\"");
    }

    #[test]
    fn test_car_image_requires_both_fields() {
        let mut car = sample_car();
        assert!(car.image().is_none());

        car.image_url = Some("https://res.cloudinary.com/demo/image/upload/a.jpg".to_string());
        assert!(car.image().is_none());

        car.remote_image_id = Some("gestion-autos/autos/a".to_string());
        let image = car.image().unwrap();
        assert_eq!(image.remote_id, "gestion-autos/autos/a");
    }

    #[test]
    fn test_car_helpers() {
        let car = sample_car();
        assert_eq!(car.price().to_string(), "$18,000.00");
        assert_eq!(car.display_name(), "Toyota Corolla (2020)");
    }
}
