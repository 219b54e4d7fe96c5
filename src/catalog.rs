//! Product catalog operations: save products (optionally with an uploaded
//! image) and read the whole catalog back.

use crate::error::StoreError;
use crate::media::{CloudinaryClient, MediaUploader, UploadedImage};
use crate::models::{Config, ImageFile, Product, ProductId, StoredProduct};
use crate::store::{Document, DocumentStore, StoreHandle};
use crate::Result;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Saves and reads product records, uploading product images on the way in.
pub struct Catalog {
    uploader: Box<dyn MediaUploader>,
    store: StoreHandle,
}

/// Injectable service bundle used to construct [`Catalog`] in tests/harnesses.
pub struct CatalogServices {
    pub uploader: Box<dyn MediaUploader>,
    pub store: StoreHandle,
}

impl Catalog {
    pub fn with_services(services: CatalogServices) -> Self {
        Self {
            uploader: services.uploader,
            store: services.store,
        }
    }

    /// Convenience for tests: an already-initialized store.
    pub fn with_store(uploader: Box<dyn MediaUploader>, store: Arc<dyn DocumentStore>) -> Self {
        Self::with_services(CatalogServices {
            uploader,
            store: StoreHandle::with_store(store),
        })
    }

    /// Build against Cloudinary and Firestore. The store connects on first use.
    pub fn from_config(config: Config) -> Self {
        // Reuse one HTTP connection pool across both services.
        let http_client = reqwest::Client::new();

        let uploader = CloudinaryClient::new_with_client(config.media, http_client.clone());
        if uploader.is_signed() {
            info!("Media uploads: signed");
        } else {
            info!("Media uploads: unsigned (upload preset only)");
        }

        Self::with_services(CatalogServices {
            uploader: Box::new(uploader),
            store: StoreHandle::new_with_client(config.firebase, http_client),
        })
    }

    /// Construct from environment configuration (`Config::from_env`).
    pub fn new() -> Result<Self> {
        Ok(Self::from_config(Config::from_env()?))
    }

    /// Insert `product` as a new document and return its generated id.
    pub async fn save_product(&self, product: Product) -> Result<ProductId> {
        Ok(self.insert_product(&product).await?)
    }

    /// Upload `file` (if any), point `product.image` at it, then insert.
    ///
    /// An upload failure aborts before anything is written. If the write
    /// fails after a successful upload the uploaded asset is deleted again
    /// when the media host allows it.
    pub async fn save_product_with_image(
        &self,
        mut product: Product,
        file: Option<&ImageFile>,
    ) -> Result<ProductId> {
        let uploaded = match file {
            Some(file) => {
                let uploaded = self.uploader.upload(file).await.map_err(|e| {
                    error!("Error saving product: image upload failed: {}", e);
                    e
                })?;
                product.image = Some(uploaded.secure_url.clone());
                Some(uploaded)
            }
            None => None,
        };

        match self.insert_product(&product).await {
            Ok(id) => Ok(id),
            Err(e) => {
                if let Some(uploaded) = uploaded {
                    self.discard_upload(&uploaded).await;
                }
                Err(e.into())
            }
        }
    }

    /// Every stored product, in store order.
    pub async fn get_products(&self) -> Result<Vec<StoredProduct>> {
        let documents = self.list_documents().await?;

        let products: Vec<StoredProduct> = documents.into_iter().map(decode_product).collect();

        info!("Fetched {} products from the catalog", products.len());
        Ok(products)
    }

    async fn insert_product(&self, product: &Product) -> std::result::Result<ProductId, StoreError> {
        let result: std::result::Result<String, StoreError> = async {
            let fields: Map<String, Value> = serde_json::from_value(serde_json::to_value(product)?)?;
            self.store.get().await?.insert(fields).await
        }
        .await;

        match result {
            Ok(id) => {
                info!("Product saved with id: {}", id);
                Ok(ProductId::new(id))
            }
            Err(e) => {
                error!("Error saving product: {}", e);
                Err(e)
            }
        }
    }

    async fn list_documents(&self) -> std::result::Result<Vec<Document>, StoreError> {
        let result: std::result::Result<Vec<Document>, StoreError> =
            async { self.store.get().await?.list().await }.await;
        result.map_err(|e| {
            error!("Error fetching products: {}", e);
            e
        })
    }

    async fn discard_upload(&self, uploaded: &UploadedImage) {
        let Some(public_id) = &uploaded.public_id else {
            warn!(
                "Image {} left orphaned: media host returned no asset id",
                uploaded.secure_url
            );
            return;
        };

        match self.uploader.destroy(public_id).await {
            Ok(()) => info!("Removed image {} after failed product write", public_id),
            Err(e) => warn!(
                "Image {} ({}) left orphaned: {}",
                public_id, uploaded.secure_url, e
            ),
        }
    }
}

// One malformed document must not hide the rest of the catalog.
fn decode_product(document: Document) -> StoredProduct {
    let Document { id, fields } = document;
    let (product, rejected) = Product::from_fields(&fields);
    if !rejected.is_empty() {
        warn!(
            "Document {}: malformed fields [{}] read as defaults",
            id,
            rejected.join(", ")
        );
    }

    StoredProduct {
        id: ProductId::new(id),
        product,
    }
}
