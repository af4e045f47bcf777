//! # Application Context
//!
//! Everything a command needs, built once in `main` and passed by reference.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         AppContext                                      │
//! │                                                                         │
//! │  ┌──────────────┐ ┌──────────────────┐ ┌──────────────────────────┐    │
//! │  │  Database    │ │ Arc<dyn          │ │  ImageLoader             │    │
//! │  │  (one conn)  │ │   ImageHost>     │ │  (LRU thumbnails)        │    │
//! │  └──────────────┘ └──────────────────┘ └──────────────────────────┘    │
//! │  ┌──────────────┐ ┌──────────────────┐ ┌──────────────────────────┐    │
//! │  │ReportGenerator│ │ PrintDispatcher │ │  AppConfig               │    │
//! │  └──────────────┘ └──────────────────┘ └──────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use autogest_db::{Database, DbConfig};
use autogest_media::{CloudinaryService, ImageHost, ImageLoader};
use autogest_report::{PrintDispatcher, ReportGenerator};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::error::ApiError;

/// Composition root for the CLI.
pub struct AppContext {
    pub config: AppConfig,
    pub db: Database,
    pub images: Arc<dyn ImageHost>,
    pub thumbnails: ImageLoader,
    pub reports: ReportGenerator,
    pub printer: PrintDispatcher,
}

impl AppContext {
    /// Opens the database and wires the production services.
    ///
    /// Cloudinary credentials are not checked here; the first upload or
    /// delete reports them if they are missing.
    pub async fn open(config: AppConfig) -> Result<Self, ApiError> {
        let db = Database::open(DbConfig::new(&config.database_path)).await?;
        info!(path = %config.database_path.display(), "Database ready");

        Self::with_parts(config, db, Arc::new(CloudinaryService::from_env()))
    }

    /// Builds a context around an existing database and image host.
    pub fn with_parts(
        config: AppConfig,
        db: Database,
        images: Arc<dyn ImageHost>,
    ) -> Result<Self, ApiError> {
        let thumbnails = ImageLoader::new(config.image_cache_capacity)?;
        let reports = ReportGenerator::new(config.report_dir.clone());

        Ok(AppContext {
            config,
            db,
            images,
            thumbnails,
            reports,
            printer: PrintDispatcher::new(),
        })
    }

    /// Releases the database connection.
    pub async fn close(&self) {
        self.db.close().await;
        info!("AutoGest shut down");
    }
}
