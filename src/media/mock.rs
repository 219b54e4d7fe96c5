use super::{MediaUploader, UploadedImage};
use crate::error::UploadError;
use crate::models::ImageFile;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory uploader. Clones share state, so a test can keep a second clone
/// after handing the uploader to a [`crate::catalog::Catalog`].
#[derive(Clone)]
pub struct MockMediaUploader {
    assets: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    base_url: String,
    fixed_url: Option<String>,
    failure: Option<(u16, String)>,
    upload_count: Arc<Mutex<usize>>,
    destroyed: Arc<Mutex<Vec<String>>>,
}

impl MockMediaUploader {
    pub fn new() -> Self {
        Self {
            assets: Arc::new(Mutex::new(HashMap::new())),
            base_url: "https://mock-media.example.com".to_string(),
            fixed_url: None,
            failure: None,
            upload_count: Arc::new(Mutex::new(0)),
            destroyed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Every upload returns this URL instead of one derived from the file name.
    pub fn with_secure_url(mut self, url: String) -> Self {
        self.fixed_url = Some(url);
        self
    }

    /// Every upload is rejected with this status and body.
    pub fn with_failure(mut self, status: u16, body: String) -> Self {
        self.failure = Some((status, body));
        self
    }

    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    pub fn get_assets(&self) -> HashMap<String, Vec<u8>> {
        self.assets.lock().unwrap().clone()
    }

    pub fn get_destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

impl Default for MockMediaUploader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaUploader for MockMediaUploader {
    async fn upload(&self, file: &ImageFile) -> Result<UploadedImage, UploadError> {
        *self.upload_count.lock().unwrap() += 1;

        if let Some((status, body)) = &self.failure {
            return Err(UploadError::Rejected {
                status: *status,
                body: body.clone(),
            });
        }

        let public_id = file
            .file_name
            .rsplit_once('.')
            .map_or(file.file_name.as_str(), |(stem, _)| stem)
            .to_string();
        self.assets
            .lock()
            .unwrap()
            .insert(public_id.clone(), file.bytes.clone());

        let secure_url = self
            .fixed_url
            .clone()
            .unwrap_or_else(|| format!("{}/{}", self.base_url, file.file_name));
        Ok(UploadedImage {
            secure_url,
            public_id: Some(public_id),
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), UploadError> {
        self.assets.lock().unwrap().remove(public_id);
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}
