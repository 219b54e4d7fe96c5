//! Document store integration for product records
//!
//! Products live as documents in a Cloud Firestore collection. The store is
//! reached through [`StoreHandle`], which builds the Firestore client once on
//! first use and hands the same instance to every later caller.

pub mod firestore;
pub mod mock;
pub mod value;

pub use firestore::FirestoreClient;
pub use mock::MockDocumentStore;

use crate::error::StoreError;
use crate::models::FirebaseConfig;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A stored document: store-assigned id plus its fields as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// A single document collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Add a new document and return the id the store generated for it.
    async fn insert(&self, fields: Map<String, Value>) -> Result<String, StoreError>;
    /// Every document in the collection, in store order.
    async fn list(&self) -> Result<Vec<Document>, StoreError>;
}

/// Init-once handle to the backing store.
pub struct StoreHandle {
    config: Option<FirebaseConfig>,
    client: reqwest::Client,
    store: OnceCell<Arc<dyn DocumentStore>>,
}

impl StoreHandle {
    /// Lazily connects to Firestore on first [`StoreHandle::get`].
    pub fn new(config: FirebaseConfig) -> Self {
        Self::new_with_client(config, reqwest::Client::new())
    }

    pub fn new_with_client(config: FirebaseConfig, client: reqwest::Client) -> Self {
        Self {
            config: Some(config),
            client,
            store: OnceCell::new(),
        }
    }

    /// A handle that is already initialized with `store`.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config: None,
            client: reqwest::Client::new(),
            store: OnceCell::new_with(Some(store)),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.store.initialized()
    }

    /// The shared store, creating it if this is the first call.
    /// Concurrent first calls wait for a single initialization.
    pub async fn get(&self) -> Result<&Arc<dyn DocumentStore>, StoreError> {
        self.store
            .get_or_try_init(|| async {
                let config = self.config.as_ref().ok_or_else(|| {
                    StoreError::Unavailable("No document store configured".to_string())
                })?;
                let client = FirestoreClient::new_with_client(config, self.client.clone())?;
                tracing::info!(
                    "Initialized Firestore store (project: {}, collection: {})",
                    client.project_id(),
                    client.collection()
                );
                Ok::<_, StoreError>(Arc::new(client) as Arc<dyn DocumentStore>)
            })
            .await
    }
}
