use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use storefront_catalog::{
    catalog::{Catalog, CatalogServices},
    media::{CloudinaryClient, MockMediaUploader},
    models::{Config, ImageFile, Product},
    store::{DocumentStore, MockDocumentStore, StoreHandle},
    Error, UploadError,
};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tee() -> Product {
    Product::new("Tee", 20.0)
        .with_sizes(["S", "M"])
        .with_available_sizes(["S"])
}

fn mock_catalog(uploader: &MockMediaUploader, store: &MockDocumentStore) -> Catalog {
    Catalog::with_services(CatalogServices {
        uploader: Box::new(uploader.clone()),
        store: StoreHandle::with_store(Arc::new(store.clone())),
    })
}

#[tokio::test]
async fn test_save_without_file_then_list() {
    let catalog = mock_catalog(&MockMediaUploader::new(), &MockDocumentStore::new());

    let id = catalog.save_product_with_image(tee(), None).await.unwrap();
    assert!(!id.as_str().is_empty());

    let products = catalog.get_products().await.unwrap();
    let saved = products.iter().find(|p| p.id == id).unwrap();
    assert_eq!(saved.product.image, None);
    assert_eq!(saved.product.sizes, vec!["S", "M"]);
    assert_eq!(saved.product.available_sizes, vec!["S"]);
}

#[tokio::test]
async fn test_save_with_file_stores_upload_url() {
    let uploader = MockMediaUploader::new().with_secure_url("https://host/img123.png".to_string());
    let catalog = mock_catalog(&uploader, &MockDocumentStore::new());

    let file = ImageFile::new("img123.png", vec![0x89, 0x50, 0x4E, 0x47]);
    let id = catalog
        .save_product_with_image(tee(), Some(&file))
        .await
        .unwrap();

    let products = catalog.get_products().await.unwrap();
    let saved = products.iter().find(|p| p.id == id).unwrap();
    assert_eq!(saved.product.image.as_deref(), Some("https://host/img123.png"));
}

#[tokio::test]
async fn test_failed_upload_creates_no_document() {
    let uploader = MockMediaUploader::new().with_failure(500, "upload exploded".to_string());
    let store = MockDocumentStore::new();
    let catalog = mock_catalog(&uploader, &store);

    let file = ImageFile::new("img.png", vec![1, 2, 3]);
    let err = catalog
        .save_product_with_image(tee(), Some(&file))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Upload(UploadError::Rejected { .. })));
    assert!(err.to_string().contains("upload exploded"));
    assert!(catalog.get_products().await.unwrap().is_empty());
    assert_eq!(store.get_insert_count(), 0);
}

#[tokio::test]
async fn test_stored_fields_identical_with_and_without_image_path() {
    let store = MockDocumentStore::new();
    let catalog = mock_catalog(&MockMediaUploader::new(), &store);

    catalog.save_product(tee()).await.unwrap();
    catalog.save_product_with_image(tee(), None).await.unwrap();

    let documents = store.list().await.unwrap();
    assert_eq!(documents[0].fields, documents[1].fields);
    assert_eq!(
        serde_json::Value::Object(documents[0].fields.clone()),
        json!({
            "name": "Tee",
            "price": 20.0,
            "image": null,
            "sizes": ["S", "M"],
            "availableSizes": ["S"],
            "category": []
        })
    );
}

/// Full path through the real HTTP clients against stubbed services.
#[tokio::test]
async fn test_catalog_over_http_services() {
    let media = MockServer::start().await;
    let firestore = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "img123",
            "secure_url": "https://host/img123.png"
        })))
        .expect(1)
        .mount(&media)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/projects/shop/databases/.+/documents/products$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/shop/databases/(default)/documents/products/NewDoc1",
            "fields": {}
        })))
        .expect(1)
        .mount(&firestore)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/projects/shop/databases/.+/documents/products$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [{
                "name": "projects/shop/databases/(default)/documents/products/NewDoc1",
                "fields": {
                    "name": { "stringValue": "Tee" },
                    "price": { "integerValue": "20" },
                    "image": { "stringValue": "https://host/img123.png" },
                    "sizes": { "arrayValue": { "values": [
                        { "stringValue": "S" }, { "stringValue": "M" }
                    ] } }
                }
            }]
        })))
        .mount(&firestore)
        .await;

    let (media_uri, firestore_uri) = (media.uri(), firestore.uri());
    let config = Config::from_lookup(move |key| match key {
        "CLOUDINARY_CLOUD_NAME" => Some("demo".to_string()),
        "CLOUDINARY_BASE_URL" => Some(media_uri.clone()),
        "FIREBASE_API_KEY" => Some("fb-key".to_string()),
        "FIREBASE_PROJECT_ID" => Some("shop".to_string()),
        "FIRESTORE_BASE_URL" => Some(firestore_uri.clone()),
        _ => None,
    })
    .unwrap();

    let catalog = Catalog::from_config(config);
    let file = ImageFile::new("tee.png", vec![0x89, 0x50, 0x4E, 0x47]);

    let id = catalog
        .save_product_with_image(tee(), Some(&file))
        .await
        .unwrap();
    assert_eq!(id.as_str(), "NewDoc1");

    let products = catalog.get_products().await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].product.price, 20.0);
    assert_eq!(products[0].product.image.as_deref(), Some("https://host/img123.png"));
    assert!(products[0].product.available_sizes.is_empty());
}

#[tokio::test]
async fn test_unsigned_client_cannot_remove_orphans() {
    let media = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "img123",
            "secure_url": "https://host/img123.png"
        })))
        .mount(&media)
        .await;

    let media_uri = media.uri();
    let config = Config::from_lookup(move |key| match key {
        "CLOUDINARY_CLOUD_NAME" => Some("demo".to_string()),
        "CLOUDINARY_BASE_URL" => Some(media_uri.clone()),
        "FIREBASE_API_KEY" => Some("fb-key".to_string()),
        "FIREBASE_PROJECT_ID" => Some("shop".to_string()),
        _ => None,
    })
    .unwrap();

    let catalog = Catalog::with_services(CatalogServices {
        uploader: Box::new(CloudinaryClient::new(config.media)),
        store: StoreHandle::with_store(Arc::new(
            MockDocumentStore::new().with_insert_failure(503, "unavailable".to_string()),
        )),
    });

    let file = ImageFile::new("tee.png", vec![0x89, 0x50, 0x4E, 0x47]);
    let err = catalog
        .save_product_with_image(tee(), Some(&file))
        .await
        .unwrap_err();

    // The write error is reported even though the image could not be removed.
    assert!(matches!(err, Error::Store(_)));
}
