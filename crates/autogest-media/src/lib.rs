//! # autogest-media: Remote Images for AutoGest
//!
//! Uploads car photos to Cloudinary, deletes them again, and serves small
//! cached thumbnails of the stored URLs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AutoGest Image Flow                              │
//! │                                                                         │
//! │  car add --image photo.jpg                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ImageHost::upload ──► Cloudinary ──► (secure_url, public_id)           │
//! │                                            │                            │
//! │                                            ▼                            │
//! │                                     autogest-db (autos row)             │
//! │                                            │                            │
//! │  car list ──► ImageLoader::load(url, 50x50) ◄┘                          │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │              LRU thumbnail cache                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`cloudinary`] - `ImageHost` trait, signed client, lazy service
//! - [`config`] - Credentials from the environment
//! - [`loader`] - Thumbnail download, resize and cache
//! - [`url`] - Delivery URL helpers
//! - [`error`] - Media error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cloudinary;
pub mod config;
pub mod error;
pub mod loader;
pub mod url;

// =============================================================================
// Re-exports
// =============================================================================

pub use cloudinary::{CloudinaryClient, CloudinaryService, ImageHost, UploadedImage, DEFAULT_FOLDER};
pub use config::CloudinaryConfig;
pub use error::{MediaError, MediaResult};
pub use loader::{FetchState, ImageLoader, ImageSize, ImageSubscription, DEFAULT_CACHE_CAPACITY};
