//! In-memory image host and context for command tests.

use async_trait::async_trait;
use autogest_core::YearRange;
use autogest_db::{Database, DbConfig};
use autogest_media::{ImageHost, MediaError, MediaResult, UploadedImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::context::AppContext;

/// Records every call; uploads and deletes can be switched to fail.
#[derive(Default)]
pub struct FakeImageHost {
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
    uploads: Mutex<Vec<(PathBuf, String)>>,
    deletes: Mutex<Vec<String>>,
}

impl FakeImageHost {
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// `(local path, folder)` of every upload attempt.
    pub fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().unwrap().clone()
    }

    /// Remote ids of every delete attempt.
    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageHost for FakeImageHost {
    async fn upload(&self, local_path: &Path, folder: &str) -> MediaResult<UploadedImage> {
        let n = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((local_path.to_path_buf(), folder.to_string()));
            uploads.len()
        };

        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MediaError::Http("connection refused".to_string()));
        }

        Ok(UploadedImage {
            url: format!(
                "https://res.cloudinary.com/demo/image/upload/v1/{}/foto{}.jpg",
                folder, n
            ),
            remote_id: format!("{}/foto{}", folder, n),
        })
    }

    async fn delete(&self, remote_id: &str) -> MediaResult<()> {
        self.deletes.lock().unwrap().push(remote_id.to_string());

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(MediaError::Provider {
                status: 500,
                message: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// A context on an in-memory database, writing documents under `report_dir`.
pub struct TestApp {
    pub ctx: AppContext,
    pub host: Arc<FakeImageHost>,
    _report_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let report_dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_path: PathBuf::from(":memory:"),
            report_dir: report_dir.path().join("reportes"),
            image_folder: "pruebas/autos".to_string(),
            year_range: YearRange::new(1900, 2030),
            image_cache_capacity: 8,
        };

        let db = Database::open(DbConfig::in_memory()).await.unwrap();
        let host = Arc::new(FakeImageHost::default());
        let ctx = AppContext::with_parts(config, db, host.clone()).unwrap();

        TestApp {
            ctx,
            host,
            _report_dir: report_dir,
        }
    }
}
