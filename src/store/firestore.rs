use super::value::{fields_from_json, fields_into_json, Value};
use super::{Document, DocumentStore};
use crate::error::StoreError;
use crate::models::FirebaseConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PAGE_SIZE: u32 = 300;

#[derive(Debug, Serialize)]
struct WriteRequest {
    fields: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

impl FirestoreDocument {
    fn id(&self) -> Result<&str, StoreError> {
        self.name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::Decode(format!("Invalid document name: {}", self.name)))
    }

    fn into_document(self) -> Result<Document, StoreError> {
        let id = self.id()?.to_string();
        Ok(Document {
            id,
            fields: fields_into_json(self.fields),
        })
    }
}

/// Cloud Firestore REST client scoped to a single collection.
pub struct FirestoreClient {
    client: Client,
    api_key: String,
    project_id: String,
    collection: String,
    collection_url: String,
    page_size: u32,
    timeout: Duration,
}

impl FirestoreClient {
    pub fn new(config: &FirebaseConfig) -> Result<Self, StoreError> {
        Self::new_with_client(config, Client::new())
    }

    pub fn new_with_client(config: &FirebaseConfig, client: Client) -> Result<Self, StoreError> {
        if config.project_id.trim().is_empty() {
            return Err(StoreError::Unavailable("Firebase project id is empty".to_string()));
        }
        if config.collection.trim().is_empty() {
            return Err(StoreError::Unavailable("Collection name is empty".to_string()));
        }

        let collection_url = format!(
            "{}/v1/projects/{}/databases/{}/documents/{}",
            config.base_url.trim_end_matches('/'),
            config.project_id,
            config.database,
            config.collection
        );

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            project_id: config.project_id.clone(),
            collection: config.collection.clone(),
            collection_url,
            page_size: DEFAULT_PAGE_SIZE,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn send<Resp: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<Resp, StoreError> {
        let response = request
            .timeout(self.timeout)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send {} request to Firestore: {}", action, e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            tracing::error!("Firestore {} error (status {}): {}", action, status, body);
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Firestore {} response: {}\nBody: {}", action, e, body);
            StoreError::Decode(format!("Failed to parse Firestore response: {}", e))
        })
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn insert(&self, fields: Map<String, serde_json::Value>) -> Result<String, StoreError> {
        let request = WriteRequest {
            fields: fields_from_json(fields),
        };

        let created: FirestoreDocument = self
            .send(self.client.post(&self.collection_url).json(&request), "create")
            .await?;

        let id = created.id()?.to_string();
        tracing::debug!("Created document {}/{}", self.collection, id);
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&self.collection_url)
                .query(&[("pageSize", self.page_size.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListDocumentsResponse = self.send(request, "list").await?;
            tracing::debug!(
                "Fetched page of {} documents from {}",
                page.documents.len(),
                self.collection
            );

            for document in page.documents {
                documents.push(document.into_document()?);
            }

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COLLECTION_PATH: &str = "/v1/projects/shop/databases/(default)/documents/products";

    fn config(base_url: String) -> FirebaseConfig {
        FirebaseConfig {
            api_key: "fb-key".to_string(),
            auth_domain: None,
            project_id: "shop".to_string(),
            storage_bucket: None,
            messaging_sender_id: None,
            app_id: None,
            measurement_id: None,
            database: "(default)".to_string(),
            base_url,
            collection: "products".to_string(),
        }
    }

    fn document(id: &str, name: &str) -> serde_json::Value {
        json!({
            "name": format!("projects/shop/databases/(default)/documents/products/{}", id),
            "fields": { "name": { "stringValue": name } },
            "createTime": "2024-01-01T00:00:00.000000Z",
            "updateTime": "2024-01-01T00:00:00.000000Z"
        })
    }

    #[test]
    fn test_rejects_empty_project() {
        let mut config = config("http://localhost".to_string());
        config.project_id = String::new();
        assert!(matches!(
            FirestoreClient::new(&config),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_insert_returns_generated_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(COLLECTION_PATH))
            .and(query_param("key", "fb-key"))
            .and(body_partial_json(json!({
                "fields": {
                    "name": { "stringValue": "Tee" },
                    "image": { "nullValue": null }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(document("AbC123", "Tee")))
            .expect(1)
            .mount(&server)
            .await;

        let client = FirestoreClient::new(&config(server.uri())).unwrap();
        let fields = json!({ "name": "Tee", "image": null })
            .as_object()
            .unwrap()
            .clone();

        let id = client.insert(fields).await.unwrap();
        assert_eq!(id, "AbC123");
    }

    #[tokio::test]
    async fn test_insert_rejected_keeps_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(COLLECTION_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let client = FirestoreClient::new(&config(server.uri())).unwrap();
        let err = client.insert(Map::new()).await.unwrap_err();

        match err {
            StoreError::Rejected { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("PERMISSION_DENIED"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_empty_collection() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(COLLECTION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = FirestoreClient::new(&config(server.uri())).unwrap();
        assert!(client.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_follows_page_tokens() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(COLLECTION_PATH))
            .and(query_param("pageSize", "2"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [document("a", "Tee"), document("b", "Cap")],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(COLLECTION_PATH))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [document("c", "Sock")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = FirestoreClient::new(&config(server.uri()))
            .unwrap()
            .with_page_size(2);
        let documents = client.list().await.unwrap();

        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(documents[2].fields["name"], json!("Sock"));
    }

    #[tokio::test]
    async fn test_list_malformed_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(COLLECTION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = FirestoreClient::new(&config(server.uri())).unwrap();
        let err = client.list().await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
