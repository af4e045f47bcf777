//! # Application Configuration
//!
//! Loaded once at startup from environment variables (a `.env` file in the
//! working directory is read first) with platform defaults.
//!
//! ## Environment Variables
//! - `AUTOGEST_DB_PATH`: database file (default `{data_dir}/{DB_NAME}.db`)
//! - `DB_NAME`: database name when no path is given (default `venta_autos_db`)
//! - `AUTOGEST_REPORT_DIR`: where PDFs are written (default `{data_dir}/reportes`)
//! - `AUTOGEST_IMAGE_FOLDER`: remote folder for photos (default `gestion-autos/autos`)
//! - `AUTOGEST_YEAR_MIN` / `AUTOGEST_YEAR_MAX`: accepted model years
//!   (default 1900 through next year)
//! - `AUTOGEST_IMAGE_CACHE_CAPACITY`: thumbnails kept in memory (default 256)
//!
//! Cloudinary credentials are read by `autogest-media` on first use, not here.
//!
//! ## Thread Safety
//! Read-only after `load`, shared by reference through the `AppContext`.

use autogest_core::YearRange;
use autogest_media::{DEFAULT_CACHE_CAPACITY, DEFAULT_FOLDER};
use directories::ProjectDirs;
use serde::Serialize;
use std::path::PathBuf;

const DEFAULT_DB_NAME: &str = "venta_autos_db";

/// Application configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Output directory for generated documents.
    pub report_dir: PathBuf,

    /// Remote folder that car photos are uploaded into.
    pub image_folder: String,

    /// Accepted model years.
    pub year_range: YearRange,

    /// Maximum number of cached thumbnails.
    pub image_cache_capacity: usize,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let data_dir = ProjectDirs::from("com", "autogest", "autogest")
            .map(|dirs| dirs.data_dir().to_path_buf());
        Self::from_lookup(|key| std::env::var(key).ok(), data_dir)
    }

    /// Loads configuration through `lookup`, with `data_dir` as the base of
    /// every default path.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        data_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let data_dir = || data_dir.clone().ok_or(ConfigError::NoDataDirectory);

        let database_path = match read("AUTOGEST_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => {
                let name = read("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string());
                data_dir()?.join(format!("{}.db", name))
            }
        };

        let report_dir = match read("AUTOGEST_REPORT_DIR") {
            Some(path) => PathBuf::from(path),
            None => data_dir()?.join("reportes"),
        };

        let image_folder = read("AUTOGEST_IMAGE_FOLDER")
            .map(|folder| folder.trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_FOLDER.to_string());

        let defaults = YearRange::default();
        let year_range = YearRange::new(
            parse_or(read("AUTOGEST_YEAR_MIN"), "AUTOGEST_YEAR_MIN", defaults.min)?,
            parse_or(read("AUTOGEST_YEAR_MAX"), "AUTOGEST_YEAR_MAX", defaults.max)?,
        );
        if year_range.min > year_range.max {
            return Err(ConfigError::InvalidValue(format!(
                "AUTOGEST_YEAR_MIN ({}) is after AUTOGEST_YEAR_MAX ({})",
                year_range.min, year_range.max
            )));
        }

        let image_cache_capacity = parse_or(
            read("AUTOGEST_IMAGE_CACHE_CAPACITY"),
            "AUTOGEST_IMAGE_CACHE_CAPACITY",
            DEFAULT_CACHE_CAPACITY,
        )?;
        if image_cache_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "AUTOGEST_IMAGE_CACHE_CAPACITY must be at least 1".to_string(),
            ));
        }

        Ok(AppConfig {
            database_path,
            report_dir,
            image_folder,
            year_range,
            image_cache_capacity,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{} = '{}'", key, raw))),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine the application data directory; set AUTOGEST_DB_PATH and AUTOGEST_REPORT_DIR")]
    NoDataDirectory,
}
