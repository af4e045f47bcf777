//! # Media Error Types
//!
//! Failures of the remote image service.
//!
//! The thumbnail loader never returns these: a thumbnail that cannot be
//! fetched is simply absent. Only upload and delete surface errors.

use std::path::PathBuf;
use thiserror::Error;

/// Remote image service errors.
///
/// `Clone` so the memoised initialisation failure can be handed out on
/// every call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// Provider credentials are not configured.
    #[error("Cloudinary credentials missing: {}", missing.join(", "))]
    MissingCredentials { missing: Vec<String> },

    /// The local image to upload does not exist.
    #[error("Image file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Reading the local file failed.
    #[error("Could not read image file: {0}")]
    Io(String),

    /// Transport failure (DNS, TLS, timeout, connection reset).
    #[error("Image service request failed: {0}")]
    Http(String),

    /// The provider answered with an error status.
    #[error("Image service returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// The provider answered a destroy call with something other than "ok".
    #[error("Image '{remote_id}' was not deleted: {result}")]
    DeleteRejected { remote_id: String, result: String },

    /// The provider's response could not be understood.
    #[error("Unexpected image service response: {0}")]
    InvalidResponse(String),

    /// HTTP client could not be built.
    #[error("Image client initialisation failed: {0}")]
    Client(String),
}

impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self {
        MediaError::Http(err.to_string())
    }
}

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_message() {
        let err = MediaError::MissingCredentials {
            missing: vec![
                "CLOUDINARY_API_KEY".to_string(),
                "CLOUDINARY_API_SECRET".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Cloudinary credentials missing: CLOUDINARY_API_KEY, CLOUDINARY_API_SECRET"
        );
    }
}
