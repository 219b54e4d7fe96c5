use super::{Document, DocumentStore};
use crate::error::StoreError;
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

const AUTO_ID_LEN: usize = 20;

fn auto_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LEN)
        .map(char::from)
        .collect()
}

/// In-memory collection. Clones share state.
#[derive(Clone, Default)]
pub struct MockDocumentStore {
    documents: Arc<Mutex<Vec<Document>>>,
    insert_failure: Option<(u16, String)>,
    list_failure: Option<(u16, String)>,
    insert_count: Arc<Mutex<usize>>,
    list_count: Arc<Mutex<usize>>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw document, bypassing [`DocumentStore::insert`].
    pub fn with_document(self, id: &str, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.documents.lock().unwrap().push(Document {
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn with_insert_failure(mut self, status: u16, body: String) -> Self {
        self.insert_failure = Some((status, body));
        self
    }

    pub fn with_list_failure(mut self, status: u16, body: String) -> Self {
        self.list_failure = Some((status, body));
        self
    }

    pub fn get_insert_count(&self) -> usize {
        *self.insert_count.lock().unwrap()
    }

    pub fn get_list_count(&self) -> usize {
        *self.list_count.lock().unwrap()
    }

    pub fn get_documents(&self) -> Vec<Document> {
        self.documents.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn insert(&self, fields: Map<String, Value>) -> Result<String, StoreError> {
        *self.insert_count.lock().unwrap() += 1;

        if let Some((status, body)) = &self.insert_failure {
            return Err(StoreError::Rejected {
                status: *status,
                body: body.clone(),
            });
        }

        let id = auto_id();
        self.documents.lock().unwrap().push(Document {
            id: id.clone(),
            fields,
        });
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        *self.list_count.lock().unwrap() += 1;

        if let Some((status, body)) = &self.list_failure {
            return Err(StoreError::Rejected {
                status: *status,
                body: body.clone(),
            });
        }

        Ok(self.documents.lock().unwrap().clone())
    }
}
