//! # Car Commands
//!
//! Inventory management, including the photo kept on the image provider.
//!
//! ## Photo Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Car Photo Orchestration                              │
//! │                                                                         │
//! │  create_car(form, Some(photo))                                          │
//! │    validate ──► upload ──ok──► INSERT with url + remote id              │
//! │                   └──fail──► warn, INSERT without photo                 │
//! │                                                                         │
//! │  update_car(id, form, Some(photo))                                      │
//! │    validate ──► load current ──► upload                                 │
//! │                                   ├─ok──► UPDATE all columns            │
//! │                                   │       └─► delete previous photo     │
//! │                                   └─fail─► UPDATE data, keep old photo  │
//! │                                                                         │
//! │  delete_car(id)                                                         │
//! │    load ──► DELETE row ──ok──► delete photo (failure only logged)       │
//! │                 └─ referenced by a sale ──► Conflict, photo untouched   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use autogest_core::validation::{validate_car_form, CarForm};
use autogest_core::{Car, CarImage};
use autogest_media::ImageSize;
use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::context::AppContext;
use crate::error::ApiError;

/// Size the provider is asked for when a photo goes on a car sheet.
const SHEET_PHOTO_SIZE: ImageSize = ImageSize::new(600, 400);

/// Car DTO for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarDto {
    pub id: i64,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price_cents: i64,
    /// Formatted price, e.g. `$18,500.00`.
    pub price: String,
    pub color: String,
    pub transmission: String,
    pub fuel: String,
    pub image_url: Option<String>,
    pub remote_image_id: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl From<Car> for CarDto {
    fn from(c: Car) -> Self {
        CarDto {
            id: c.id,
            price: c.price().to_string(),
            transmission: c.transmission.to_string(),
            fuel: c.fuel.to_string(),
            make: c.make,
            model: c.model,
            year: c.year,
            price_cents: c.price_cents,
            color: c.color,
            image_url: c.image_url,
            remote_image_id: c.remote_image_id,
            registered_at: c.registered_at,
        }
    }
}

/// What happened to the photo during a create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ImageOutcome {
    /// No photo was given.
    Unchanged,
    /// The photo was uploaded and stored with the car.
    Uploaded,
    /// The upload failed; the car was saved without the new photo.
    UploadFailed { message: String },
}

/// Result of a create or update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCar {
    pub car: CarDto,
    pub image: ImageOutcome,
}

/// Pre-fills an edit form with the stored values.
pub fn form_from_car(car: &Car) -> CarForm {
    CarForm {
        make: car.make.clone(),
        model: car.model.clone(),
        year: car.year.to_string(),
        price: car.price().to_plain_string(),
        color: car.color.clone(),
        transmission: car.transmission.to_string(),
        fuel: car.fuel.to_string(),
    }
}

/// Edit form for car `id`, holding its current values.
pub async fn edit_form(ctx: &AppContext, id: i64) -> Result<CarForm, ApiError> {
    Ok(form_from_car(&load_car(ctx, id).await?))
}

async fn load_car(ctx: &AppContext, id: i64) -> Result<Car, ApiError> {
    ctx.db
        .cars()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Car", id))
}

/// Uploads `path`, logging instead of failing.
async fn upload_photo(ctx: &AppContext, path: &Path) -> Result<CarImage, String> {
    match ctx.images.upload(path, &ctx.config.image_folder).await {
        Ok(uploaded) => {
            info!(remote_id = %uploaded.remote_id, "Car photo uploaded");
            Ok(uploaded.into())
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Car photo upload failed; saving without it");
            Err(e.to_string())
        }
    }
}

/// Deletes a remote photo, logging instead of failing.
async fn discard_photo(ctx: &AppContext, remote_id: &str) {
    match ctx.images.delete(remote_id).await {
        Ok(()) => debug!(remote_id = %remote_id, "Car photo deleted"),
        Err(e) => warn!(remote_id = %remote_id, error = %e, "Car photo could not be deleted"),
    }
}

// =============================================================================
// Write Commands
// =============================================================================

/// Registers a car, optionally with a photo.
///
/// ## Arguments
/// * `form` - Raw form input
/// * `image_path` - Local photo to upload
///
/// ## Returns
/// The stored car. A failed upload does not fail the command; it is
/// reported in [`SavedCar::image`].
pub async fn create_car(
    ctx: &AppContext,
    form: CarForm,
    image_path: Option<&Path>,
) -> Result<SavedCar, ApiError> {
    let new_car = validate_car_form(&form, ctx.config.year_range)?;
    debug!(make = %new_car.make, model = %new_car.model, "create_car command");

    let (image, outcome) = match image_path {
        None => (None, ImageOutcome::Unchanged),
        Some(path) => match upload_photo(ctx, path).await {
            Ok(image) => (Some(image), ImageOutcome::Uploaded),
            Err(message) => (None, ImageOutcome::UploadFailed { message }),
        },
    };

    let id = match ctx.db.cars().create(&new_car, image.as_ref()).await {
        Ok(id) => id,
        Err(e) => {
            if let Some(image) = &image {
                discard_photo(ctx, &image.remote_id).await;
            }
            return Err(e.into());
        }
    };

    info!(id = id, "Car registered");
    Ok(SavedCar {
        car: load_car(ctx, id).await?.into(),
        image: outcome,
    })
}

/// Replaces every field of a car, and its photo when `image_path` is given.
///
/// The previous photo is deleted only after the new one is uploaded and
/// stored; if the upload fails the car keeps its old photo.
pub async fn update_car(
    ctx: &AppContext,
    id: i64,
    form: CarForm,
    image_path: Option<&Path>,
) -> Result<SavedCar, ApiError> {
    let new_car = validate_car_form(&form, ctx.config.year_range)?;
    let current = load_car(ctx, id).await?;
    debug!(id = id, has_new_image = image_path.is_some(), "update_car command");

    let (image, outcome) = match image_path {
        None => (None, ImageOutcome::Unchanged),
        Some(path) => match upload_photo(ctx, path).await {
            Ok(image) => (Some(image), ImageOutcome::Uploaded),
            Err(message) => (None, ImageOutcome::UploadFailed { message }),
        },
    };

    if let Err(e) = ctx.db.cars().update(id, &new_car, image.as_ref()).await {
        if let Some(image) = &image {
            discard_photo(ctx, &image.remote_id).await;
        }
        return Err(e.into());
    }

    if let (Some(new_image), Some(old_id)) = (&image, current.remote_image_id.as_deref()) {
        if !old_id.is_empty() && old_id != new_image.remote_id {
            discard_photo(ctx, old_id).await;
        }
    }

    info!(id = id, "Car updated");
    Ok(SavedCar {
        car: load_car(ctx, id).await?.into(),
        image: outcome,
    })
}

/// Deletes a car and then its photo.
///
/// ## Returns
/// * `Err(NotFound)` - No such car
/// * `Err(Conflict)` - A sale references the car; nothing is deleted
pub async fn delete_car(ctx: &AppContext, id: i64) -> Result<(), ApiError> {
    debug!(id = id, "delete_car command");
    let car = load_car(ctx, id).await?;

    ctx.db.cars().delete(id).await.map_err(|e| {
        if e.is_foreign_key_violation() {
            ApiError::conflict(format!("Car {} has registered sales and cannot be deleted", id))
        } else {
            e.into()
        }
    })?;

    if let Some(remote_id) = car.remote_image_id.as_deref().filter(|r| !r.is_empty()) {
        discard_photo(ctx, remote_id).await;
    }

    info!(id = id, "Car deleted");
    Ok(())
}

// =============================================================================
// Read Commands
// =============================================================================

/// All cars, newest first.
pub async fn list_cars(ctx: &AppContext) -> Result<Vec<CarDto>, ApiError> {
    let cars = ctx.db.cars().list_all().await?;
    debug!(count = cars.len(), "list_cars command");
    Ok(cars.into_iter().map(CarDto::from).collect())
}

pub async fn get_car(ctx: &AppContext, id: i64) -> Result<CarDto, ApiError> {
    Ok(load_car(ctx, id).await?.into())
}

/// Cars whose make, model or color contains `criterion` (blank lists all).
pub async fn search_cars(ctx: &AppContext, criterion: &str) -> Result<Vec<CarDto>, ApiError> {
    let cars = ctx.db.cars().search(criterion).await?;
    debug!(criterion = %criterion, count = cars.len(), "search_cars command");
    Ok(cars.into_iter().map(CarDto::from).collect())
}

/// Writes the technical sheet of a car, with its photo when it loads.
pub async fn car_report(ctx: &AppContext, id: i64) -> Result<PathBuf, ApiError> {
    let car = load_car(ctx, id).await?;

    let photo = match car.image_url.as_deref() {
        Some(url) => ctx.thumbnails.load(url, SHEET_PHOTO_SIZE).await,
        None => None,
    };

    Ok(ctx.reports.car_sheet(&car, photo.as_ref())?)
}

/// Thumbnail of a car's photo. `None` when it has none or it can't be loaded.
pub async fn car_thumbnail(
    ctx: &AppContext,
    id: i64,
    size: ImageSize,
) -> Result<Option<DynamicImage>, ApiError> {
    let car = load_car(ctx, id).await?;

    Ok(match car.image_url.as_deref() {
        Some(url) => ctx.thumbnails.load(url, size).await,
        None => None,
    })
}

/// Loads the thumbnails of `cars` in the background and reports, per car,
/// whether one is available.
pub async fn thumbnail_availability(
    ctx: &AppContext,
    cars: &[CarDto],
    size: ImageSize,
) -> Vec<bool> {
    let results = Arc::new(Mutex::new(vec![false; cars.len()]));

    let subscriptions: Vec<_> = cars
        .iter()
        .enumerate()
        .filter_map(|(i, car)| car.image_url.clone().map(|url| (i, url)))
        .map(|(i, url)| {
            let results = results.clone();
            ctx.thumbnails.load_async(url, size, move |image| {
                if let Ok(mut results) = results.lock() {
                    results[i] = image.is_some();
                }
            })
        })
        .collect();

    for subscription in subscriptions {
        subscription.wait().await;
    }

    let availability = results.lock().unwrap_or_else(PoisonError::into_inner);
    availability.clone()
}

// =============================================================================
// Unit Tests
// =============================================================================
