//! # Remote Image Service
//!
//! Upload and delete of vehicle photos on Cloudinary.
//!
//! ## Call Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Upload / Destroy                                   │
//! │                                                                         │
//! │  CLI command                                                            │
//! │       │  host.upload(path, "gestion-autos/autos")                       │
//! │       ▼                                                                 │
//! │  CloudinaryService ── first call ──► CloudinaryConfig::from_env()       │
//! │       │                 (memoised: Ok client or the same error forever) │
//! │       ▼                                                                 │
//! │  CloudinaryClient                                                       │
//! │       │  params sorted ─► "k=v&k=v" + secret ─► SHA-256 hex signature   │
//! │       ▼                                                                 │
//! │  POST {api}/{cloud}/image/upload   (multipart: file + params)           │
//! │  POST {api}/{cloud}/image/destroy  (form: public_id + params)           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use autogest_core::CarImage;

use crate::config::CloudinaryConfig;
use crate::error::{MediaError, MediaResult};

/// Stored images are capped at 600×600 and compressed.
pub const UPLOAD_TRANSFORMATION: &str = "w_600,h_600,c_limit/q_auto:eco";

/// Thumbnail generated eagerly at upload time, matching the table rows.
pub const EAGER_THUMBNAIL: &str = "w_50,h_50,c_fill,q_auto:low";

/// Default folder for vehicle photos.
pub const DEFAULT_FOLDER: &str = "gestion-autos/autos";

/// Sent unsigned next to every signature.
const SIGNATURE_ALGORITHM: &str = "sha256";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Image Host Seam
// =============================================================================

/// A hosted photo, as returned by an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Secure delivery URL.
    pub url: String,
    /// Provider id, needed to delete the image later.
    pub remote_id: String,
}

impl From<UploadedImage> for CarImage {
    fn from(image: UploadedImage) -> Self {
        CarImage {
            url: image.url,
            remote_id: image.remote_id,
        }
    }
}

/// Where vehicle photos are stored.
///
/// The CLI holds an `Arc<dyn ImageHost>` so commands can be tested against
/// an in-memory host.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Uploads a local file into `folder`.
    ///
    /// ## Errors
    /// - `FileNotFound` before any network call when `local_path` is missing
    /// - `MissingCredentials`, `Http`, `Provider`, `InvalidResponse`
    async fn upload(&self, local_path: &Path, folder: &str) -> MediaResult<UploadedImage>;

    /// Deletes a hosted image. An empty id means there is nothing to delete.
    async fn delete(&self, remote_id: &str) -> MediaResult<()>;
}

// =============================================================================
// Signing
// =============================================================================

/// Signs request parameters: sorted `k=v` pairs joined by `&`, then the
/// secret appended, hashed with SHA-256.
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Signed Cloudinary upload/destroy client.
#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    config: CloudinaryConfig,
    http: reqwest::Client,
}

impl CloudinaryClient {
    /// Creates a client for `config`.
    pub fn new(config: CloudinaryConfig) -> MediaResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MediaError::Client(e.to_string()))?;

        Ok(CloudinaryClient { config, http })
    }

    pub fn config(&self) -> &CloudinaryConfig {
        &self.config
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.config.api_url, self.config.cloud_name, action
        )
    }

    /// Reads the body and turns non-2xx answers into `MediaError::Provider`.
    async fn read_body(response: reqwest::Response) -> MediaResult<String> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(MediaError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(&self, local_path: &Path, folder: &str) -> MediaResult<UploadedImage> {
        let is_file = tokio::fs::metadata(local_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(MediaError::FileNotFound(local_path.to_path_buf()));
        }

        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| MediaError::Io(e.to_string()))?;

        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        info!(file = %file_name, folder = %folder, size = bytes.len(), "Uploading image");

        let mut params: BTreeMap<&str, String> = BTreeMap::new();
        params.insert("eager", EAGER_THUMBNAIL.to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());
        params.insert("transformation", UPLOAD_TRANSFORMATION.to_string());
        if !folder.is_empty() {
            params.insert("folder", folder.to_string());
        }
        let signature = sign(&params, &self.config.api_secret);

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", SIGNATURE_ALGORITHM);
        for (key, value) in params {
            form = form.text(key.to_string(), value);
        }

        let response = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let body = Self::read_body(response).await?;

        let uploaded: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| MediaError::InvalidResponse(e.to_string()))?;

        info!(remote_id = %uploaded.public_id, "Image uploaded");

        Ok(UploadedImage {
            url: uploaded.secure_url,
            remote_id: uploaded.public_id,
        })
    }

    async fn delete(&self, remote_id: &str) -> MediaResult<()> {
        if remote_id.trim().is_empty() {
            debug!("No remote image to delete");
            return Ok(());
        }

        info!(remote_id = %remote_id, "Deleting image");

        let mut params: BTreeMap<&str, String> = BTreeMap::new();
        params.insert("public_id", remote_id.to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret);

        let mut fields: Vec<(&str, String)> = params.into_iter().collect();
        fields.push(("api_key", self.config.api_key.clone()));
        fields.push(("signature", signature));
        fields.push(("signature_algorithm", SIGNATURE_ALGORITHM.to_string()));

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&fields)
            .send()
            .await?;
        let body = Self::read_body(response).await?;

        let destroyed: DestroyResponse = serde_json::from_str(&body)
            .map_err(|e| MediaError::InvalidResponse(e.to_string()))?;

        if destroyed.result != "ok" {
            warn!(remote_id = %remote_id, result = %destroyed.result, "Image was not deleted");
            return Err(MediaError::DeleteRejected {
                remote_id: remote_id.to_string(),
                result: destroyed.result,
            });
        }

        Ok(())
    }
}

// =============================================================================
// Lazy Service
// =============================================================================

type ConfigLoader = Box<dyn Fn() -> MediaResult<CloudinaryConfig> + Send + Sync>;

/// Cloudinary client that reads its credentials on first use.
///
/// ## Initialisation
/// - Credentials are read once per service instance, on the first upload or
///   delete (not at startup, so the app runs without a provider configured)
/// - A configuration failure is logged once at error level and then
///   returned unchanged by every later call
pub struct CloudinaryService {
    loader: ConfigLoader,
    client: OnceLock<MediaResult<CloudinaryClient>>,
}

impl CloudinaryService {
    /// Service configured from `CLOUDINARY_*` environment variables.
    pub fn from_env() -> Self {
        Self::with_loader(CloudinaryConfig::from_env)
    }

    /// Service configured by `loader`, called at most once.
    pub fn with_loader(
        loader: impl Fn() -> MediaResult<CloudinaryConfig> + Send + Sync + 'static,
    ) -> Self {
        CloudinaryService {
            loader: Box::new(loader),
            client: OnceLock::new(),
        }
    }

    /// The initialised client, or the memoised initialisation error.
    pub fn client(&self) -> MediaResult<&CloudinaryClient> {
        self.client
            .get_or_init(|| {
                let client = (self.loader)().and_then(CloudinaryClient::new);
                match &client {
                    Ok(c) => info!(cloud = %c.config().cloud_name, "Cloudinary initialised"),
                    Err(e) => error!(error = %e, "Cloudinary initialisation failed"),
                }
                client
            })
            .as_ref()
            .map_err(|e| e.clone())
    }
}

impl fmt::Debug for CloudinaryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryService")
            .field("initialised", &self.client.get().is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ImageHost for CloudinaryService {
    async fn upload(&self, local_path: &Path, folder: &str) -> MediaResult<UploadedImage> {
        self.client()?.upload(local_path, folder).await
    }

    async fn delete(&self, remote_id: &str) -> MediaResult<()> {
        if remote_id.trim().is_empty() {
            return Ok(());
        }
        self.client()?.delete(remote_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
