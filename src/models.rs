//! Data models and structures
//!
//! Defines the product records persisted in the catalog, the image file
//! handed to the media host, and process configuration.

use crate::media::mime::detect_image_mime;
use crate::{Error, Result};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// Opaque document identifier assigned by the store at write time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A product as written by the caller. Missing or `null` fields decode to
/// their defaults rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sizes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub available_sizes: Vec<String>,
    #[serde(default, deserialize_with = "category_tags")]
    pub category: Vec<String>,
}

impl Product {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            ..Self::default()
        }
    }

    pub fn with_sizes<S: Into<String>>(mut self, sizes: impl IntoIterator<Item = S>) -> Self {
        self.sizes = sizes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_available_sizes<S: Into<String>>(
        mut self,
        sizes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.available_sizes = sizes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.category = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    /// Decode stored document fields without failing.
    ///
    /// A field holding the wrong JSON type falls back to its default and its
    /// name is returned alongside the product. A `price` saved as a numeric
    /// string (as form inputs produce) is parsed.
    pub fn from_fields(fields: &Map<String, Value>) -> (Self, Vec<&'static str>) {
        let mut rejected = Vec::new();
        let product = Self {
            name: lenient(fields, "name", &mut rejected, serde_json::from_value),
            price: lenient(fields, "price", &mut rejected, price_value),
            image: lenient(fields, "image", &mut rejected, serde_json::from_value),
            sizes: lenient(fields, "sizes", &mut rejected, serde_json::from_value),
            available_sizes: lenient(
                fields,
                "availableSizes",
                &mut rejected,
                serde_json::from_value,
            ),
            category: lenient(fields, "category", &mut rejected, category_tags),
        };
        (product, rejected)
    }
}

fn lenient<T: Default>(
    fields: &Map<String, Value>,
    key: &'static str,
    rejected: &mut Vec<&'static str>,
    decode: impl FnOnce(Value) -> serde_json::Result<T>,
) -> T {
    match fields.get(key) {
        None | Some(Value::Null) => T::default(),
        Some(value) => decode(value.clone()).unwrap_or_else(|_| {
            rejected.push(key);
            T::default()
        }),
    }
}

fn price_value(value: Value) -> serde_json::Result<f64> {
    match value {
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|price| price.is_finite())
            .ok_or_else(|| de::Error::custom(format!("not a price: {:?}", text))),
        other => serde_json::from_value(other),
    }
}

/// A product read back from the store together with its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProduct {
    pub id: ProductId,
    #[serde(flatten)]
    pub product: Product,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Older documents stored `category` as a single string.
fn category_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Single(String),
    }

    Ok(match Option::<Tags>::deserialize(deserializer)? {
        Some(Tags::List(tags)) => tags,
        Some(Tags::Single(tag)) if tag.is_empty() => Vec::new(),
        Some(Tags::Single(tag)) => vec![tag],
        None => Vec::new(),
    })
}

/// Binary image handed to the media uploader.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Content type is sniffed from the leading bytes.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: detect_image_mime(&bytes).to_string(),
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self::new(file_name, bytes))
    }
}

// Configuration

const DEFAULT_UPLOAD_PRESET: &str = "ml_default";
const DEFAULT_CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com";
const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";
const DEFAULT_FIRESTORE_DATABASE: &str = "(default)";
const DEFAULT_COLLECTION: &str = "products";

/// API key and secret used to sign media host requests.
#[derive(Clone)]
pub struct MediaCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for MediaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    pub base_url: String,
    /// `None` means unsigned preset uploads.
    pub credentials: Option<MediaCredentials>,
}

/// Firebase web app bundle plus the Firestore location of the catalog.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: Option<String>,
    pub project_id: String,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    pub measurement_id: Option<String>,
    pub database: String,
    pub base_url: String,
    pub collection: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub media: MediaConfig,
    pub firebase: FirebaseConfig,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source. Every key is also accepted with
    /// the `VITE_` prefix the web front end uses; blank values count as unset.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| get(key).filter(|value| !value.trim().is_empty());
        let var = |key: &str| {
            non_blank(key).or_else(|| non_blank(format!("VITE_{}", key).as_str()))
        };
        let required =
            |key: &str| var(key).ok_or_else(|| Error::Config(format!("{} not set", key)));

        let credentials = match (var("CLOUDINARY_API_KEY"), var("CLOUDINARY_API_SECRET")) {
            (Some(api_key), Some(api_secret)) => Some(MediaCredentials {
                api_key,
                api_secret,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::Config(
                    "CLOUDINARY_API_KEY set without CLOUDINARY_API_SECRET".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(Error::Config(
                    "CLOUDINARY_API_SECRET set without CLOUDINARY_API_KEY".to_string(),
                ))
            }
        };

        let media = MediaConfig {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            upload_preset: var("CLOUDINARY_UPLOAD_PRESET")
                .unwrap_or_else(|| DEFAULT_UPLOAD_PRESET.to_string()),
            base_url: var("CLOUDINARY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CLOUDINARY_BASE_URL.to_string()),
            credentials,
        };

        let firebase = FirebaseConfig {
            api_key: required("FIREBASE_API_KEY")?,
            auth_domain: var("FIREBASE_AUTH_DOMAIN"),
            project_id: required("FIREBASE_PROJECT_ID")?,
            storage_bucket: var("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: var("FIREBASE_MESSAGING_SENDER_ID"),
            app_id: var("FIREBASE_APP_ID"),
            measurement_id: var("FIREBASE_MEASUREMENT_ID"),
            database: var("FIRESTORE_DATABASE")
                .unwrap_or_else(|| DEFAULT_FIRESTORE_DATABASE.to_string()),
            base_url: var("FIRESTORE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.to_string()),
            collection: var("CATALOG_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
        };

        Ok(Self { media, firebase })
    }
}
