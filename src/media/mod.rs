//! Media host integration for product images
//!
//! Uploads image files to Cloudinary and hands back the public HTTPS URL
//! that gets stored on the product record.

pub mod cloudinary;
pub mod mime;
pub mod mock;

pub use cloudinary::CloudinaryClient;
pub use mock::MockMediaUploader;

use crate::error::UploadError;
use crate::models::ImageFile;
use async_trait::async_trait;

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub secure_url: String,
    /// Host-side asset id, used to remove the asset again.
    pub public_id: Option<String>,
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, file: &ImageFile) -> Result<UploadedImage, UploadError>;
    async fn destroy(&self, public_id: &str) -> Result<(), UploadError>;
}
