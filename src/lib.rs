//! Product catalog persistence for a storefront
//!
//! Uploads product images to a hosted media service (Cloudinary) and stores
//! product records in a hosted document database (Cloud Firestore).

pub mod catalog;
pub mod error;
pub mod media;
pub mod models;
pub mod store;

pub use error::{Error, Result, StoreError, UploadError};
