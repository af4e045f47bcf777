//! # Provider Configuration
//!
//! Cloudinary credentials, read from the environment.
//!
//! ## Environment Variables
//! - `CLOUDINARY_CLOUD_NAME` - required
//! - `CLOUDINARY_API_KEY` - required
//! - `CLOUDINARY_API_SECRET` - required
//! - `CLOUDINARY_API_URL` - API base (default: `https://api.cloudinary.com/v1_1`)

use std::fmt;

use crate::error::{MediaError, MediaResult};

/// Default upload API base.
pub const DEFAULT_API_URL: &str = "https://api.cloudinary.com/v1_1";

/// Credentials and endpoint of a Cloudinary account.
#[derive(Clone, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_url: String,
}

impl CloudinaryConfig {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        CloudinaryConfig {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Points the client at another API base (a mock server in tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// ## Errors
    /// `MissingCredentials` naming every unset or blank variable.
    pub fn from_env() -> MediaResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, one call per variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MediaResult<Self> {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let cloud_name = read("CLOUDINARY_CLOUD_NAME");
        let api_key = read("CLOUDINARY_API_KEY");
        let api_secret = read("CLOUDINARY_API_SECRET");

        match (cloud_name, api_key, api_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => {
                let config = CloudinaryConfig::new(cloud_name, api_key, api_secret);
                Ok(match read("CLOUDINARY_API_URL") {
                    Some(url) => config.with_api_url(url),
                    None => config,
                })
            }
            (cloud_name, api_key, api_secret) => {
                let missing = [
                    ("CLOUDINARY_CLOUD_NAME", cloud_name.is_none()),
                    ("CLOUDINARY_API_KEY", api_key.is_none()),
                    ("CLOUDINARY_API_SECRET", api_secret.is_none()),
                ]
                .into_iter()
                .filter(|(_, is_missing)| *is_missing)
                .map(|(name, _)| name.to_string())
                .collect();

                Err(MediaError::MissingCredentials { missing })
            }
        }
    }
}

// The secret stays out of logs.
impl fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .finish()
    }
}
