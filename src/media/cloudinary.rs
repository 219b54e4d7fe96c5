use super::{MediaUploader, UploadedImage};
use crate::error::UploadError;
use crate::models::{ImageFile, MediaConfig, MediaCredentials};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary upload API client.
///
/// Uploads are signed when API credentials are configured, otherwise they
/// rely on the (unsigned) upload preset alone.
pub struct CloudinaryClient {
    client: Client,
    cloud_name: String,
    upload_preset: String,
    base_url: String,
    credentials: Option<MediaCredentials>,
    timeout: Duration,
}

impl CloudinaryClient {
    pub fn new(config: MediaConfig) -> Self {
        Self::new_with_client(config, Client::new())
    }

    pub fn new_with_client(config: MediaConfig, client: Client) -> Self {
        Self {
            client,
            cloud_name: config.cloud_name,
            upload_preset: config.upload_preset,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config.credentials,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_signed(&self) -> bool {
        self.credentials.is_some()
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1_1/{}/image/{}", self.base_url, self.cloud_name, action)
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, UploadError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            tracing::error!("Cloudinary API error (status {}): {}", status, body);
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Cloudinary response: {}\nBody: {}", e, body);
            UploadError::InvalidResponse(format!("Failed to parse Cloudinary response: {}", e))
        })
    }
}

/// Append `timestamp`, `signature` and `api_key` to the params to be signed.
fn signed_params(
    mut params: Vec<(&'static str, String)>,
    credentials: &MediaCredentials,
    timestamp: i64,
) -> Vec<(&'static str, String)> {
    params.push(("timestamp", timestamp.to_string()));
    let signature = sign(&params, &credentials.api_secret);
    params.push(("signature", signature));
    params.push(("api_key", credentials.api_key.clone()));
    params
}

/// Hex SHA-1 over `k=v` pairs sorted by key, joined with `&`, secret appended.
fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaUploader for CloudinaryClient {
    async fn upload(&self, file: &ImageFile) -> Result<UploadedImage, UploadError> {
        tracing::debug!(
            "Uploading {} ({} bytes, {}) to Cloudinary",
            file.file_name,
            file.bytes.len(),
            file.content_type
        );

        let mut params = vec![("upload_preset", self.upload_preset.clone())];
        if let Some(credentials) = &self.credentials {
            params = signed_params(params, credentials, Utc::now().timestamp());
        }

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| {
                tracing::error!(
                    "Refusing to upload {}: invalid content type {:?}: {}",
                    file.file_name,
                    file.content_type,
                    e
                );
                UploadError::InvalidContentType(file.content_type.clone())
            })?;
        let form = params
            .into_iter()
            .fold(Form::new().part("file", part), |form, (key, value)| {
                form.text(key, value)
            });

        let response = self
            .client
            .post(self.endpoint("upload"))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error uploading image: {}", e);
                e
            })?;

        let body: UploadResponse = self.read_json(response).await?;
        let secure_url = body.secure_url.ok_or_else(|| {
            tracing::error!("Cloudinary response is missing secure_url");
            UploadError::InvalidResponse("Missing secure_url in upload response".to_string())
        })?;

        tracing::info!("Image uploaded: {}", secure_url);
        Ok(UploadedImage {
            secure_url,
            public_id: body.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), UploadError> {
        let credentials = self.credentials.as_ref().ok_or(UploadError::Unsigned)?;
        let params = signed_params(
            vec![("public_id", public_id.to_string())],
            credentials,
            Utc::now().timestamp(),
        );

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .timeout(self.timeout)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error deleting image {}: {}", public_id, e);
                e
            })?;

        let body: DestroyResponse = self.read_json(response).await?;
        match body.result.as_str() {
            "ok" | "not found" => {
                tracing::info!("Deleted image {} ({})", public_id, body.result);
                Ok(())
            }
            other => Err(UploadError::InvalidResponse(format!(
                "Unexpected destroy result for {}: {}",
                public_id, other
            ))),
        }
    }
}
