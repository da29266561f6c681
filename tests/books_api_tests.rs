//! HTTP-level tests for the book catalog
//!
//! Every test builds a fresh router over the in-memory store, a geocoder that
//! never touches the network and a temporary upload directory.

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use catalog::prelude::*;
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;

const SECRET: &str = "integration-test-secret";
const MAX_UPLOAD: usize = 1024;

/// Geocoder placing every address in a city of the same name
struct CityGeocoder;

#[async_trait]
impl Geocoder for CityGeocoder {
    async fn geocode(&self, address: &str) -> CatalogResult<Option<GeocodedAddress>> {
        Ok(Some(GeocodedAddress {
            latitude: 42.36,
            longitude: -71.06,
            formatted_address: Some(format!("{}, MA", address)),
            city: Some(address.to_string()),
            state_code: Some("MA".to_string()),
            country_code: Some("US".to_string()),
            ..Default::default()
        }))
    }
}

struct Harness {
    server: TestServer,
    uploads: TempDir,
    token: String,
}

fn config(uploads: &TempDir, pagination_total: PaginationTotal) -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = Some(SECRET.to_string());
    config.uploads.max_file_upload = MAX_UPLOAD;
    config.uploads.path = uploads.path().join("uploads");
    config.uploads.public_dir = uploads.path().to_path_buf();
    config.pagination_total = pagination_total;
    config
}

fn harness_with(pagination_total: PaginationTotal) -> Harness {
    build_harness(pagination_total, CityGeocoder)
}

fn harness_geocoding(geocoder: impl Geocoder + 'static) -> Harness {
    build_harness(PaginationTotal::Collection, geocoder)
}

fn build_harness(pagination_total: PaginationTotal, geocoder: impl Geocoder + 'static) -> Harness {
    let uploads = tempfile::tempdir().unwrap();
    let config = config(&uploads, pagination_total);
    let token = JwtAuthProvider::new(SECRET, "token", 30)
        .issue_token("publisher-1", "publisher")
        .unwrap();

    let app = ServerBuilder::new()
        .with_config(config)
        .with_store(InMemoryBookStore::new())
        .with_geocoder(geocoder)
        .build()
        .expect("Failed to build router");

    Harness {
        server: TestServer::try_new(app).expect("Failed to create test server"),
        uploads,
        token,
    }
}

fn harness() -> Harness {
    harness_with(PaginationTotal::Collection)
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn auth_header() -> HeaderName {
    header::AUTHORIZATION
}

fn book(author: &str, rating: f64, city: &str) -> Value {
    json!({
        "author": author,
        "rating": rating,
        "description": format!("A novel by {}", author),
        "address": city,
        "averageCost": 20
    })
}

impl Harness {
    async fn create(&self, payload: Value) -> Value {
        let response = self
            .server
            .post("/api/v1/books")
            .add_header(auth_header(), bearer(&self.token))
            .json(&payload)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["data"].clone()
    }

    async fn list(&self, params: &[(&str, &str)]) -> Value {
        let mut request = self.server.get("/api/v1/books");
        for (key, value) in params {
            request = request.add_query_param(key, value);
        }
        let response = request.await;
        response.assert_status_ok();
        response.json()
    }
}

fn authors(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["author"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// CRUD
// =============================================================================

#[tokio::test]
async fn test_create_book_runs_save_hooks() {
    let h = harness();
    let created = h.create(book("Ursula K. Le Guin", 9.0, "Boston")).await;

    assert_eq!(created["author"], "Ursula K. Le Guin");
    assert_eq!(created["slug"], "ursula-k-le-guin");
    assert_eq!(created["photo"], "no-photo.jpg");
    assert_eq!(created["location"]["type"], "Point");
    assert_eq!(created["location"]["coordinates"], json!([-71.06, 42.36]));
    assert_eq!(created["location"]["city"], "Boston");
    assert!(created.get("address").is_none());
    assert!(created["createdAt"].as_str().is_some());
    uuid::Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();
}

#[tokio::test]
async fn test_create_book_missing_fields() {
    let h = harness();
    let response = h
        .server
        .post("/api/v1/books")
        .add_header(auth_header(), bearer(&h.token))
        .json(&json!({ "rating": 5 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Please add an author"));
    assert!(message.contains("Please add a description"));
}

#[tokio::test]
async fn test_create_book_duplicate_author() {
    let h = harness();
    h.create(book("Italo Calvino", 8.0, "Sanremo")).await;

    let response = h
        .server
        .post("/api/v1/books")
        .add_header(auth_header(), bearer(&h.token))
        .json(&book("Italo Calvino", 7.0, "Turin"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({
        "success": false,
        "error": "Duplicate field value entered"
    }));
}

#[tokio::test]
async fn test_get_book() {
    let h = harness();
    let created = h.create(book("Toni Morrison", 9.5, "Lorain")).await;
    let id = created["id"].as_str().unwrap();

    let response = h.server.get(&format!("/api/v1/books/{}", id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], created);
}

#[tokio::test]
async fn test_get_book_not_found() {
    let h = harness();
    let id = uuid::Uuid::new_v4();

    let response = h.server.get(&format!("/api/v1/books/{}", id)).await;
    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_json(&json!({
        "success": false,
        "error": format!("Book not found with id of {}", id)
    }));
}

#[tokio::test]
async fn test_get_book_malformed_id() {
    let h = harness();
    let response = h.server.get("/api/v1/books/5d725a1b7b292f5f8ceff788").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body["error"],
        "Book not found with id of 5d725a1b7b292f5f8ceff788"
    );
}

#[tokio::test]
async fn test_update_book() {
    let h = harness();
    let created = h.create(book("Iain Banks", 8.0, "Dunfermline")).await;
    let id = created["id"].as_str().unwrap();

    let response = h
        .server
        .put(&format!("/api/v1/books/{}", id))
        .add_header(auth_header(), bearer(&h.token))
        .json(&json!({ "rating": 9.5, "author": "Iain M. Banks" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["rating"], 9.5);
    assert_eq!(body["data"]["author"], "Iain M. Banks");
    assert_eq!(body["data"]["slug"], "iain-m-banks");
    assert_eq!(body["data"]["createdAt"], created["createdAt"]);
}

#[tokio::test]
async fn test_update_book_not_found() {
    let h = harness();
    let response = h
        .server
        .put(&format!("/api/v1/books/{}", uuid::Uuid::new_v4()))
        .add_header(auth_header(), bearer(&h.token))
        .json(&json!({ "rating": 1 }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_book() {
    let h = harness();
    let created = h.create(book("Stanisław Lem", 8.5, "Lviv")).await;
    let path = format!("/api/v1/books/{}", created["id"].as_str().unwrap());

    let response = h
        .server
        .delete(&path)
        .add_header(auth_header(), bearer(&h.token))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({ "success": true, "data": {} }));

    h.server.get(&path).await.assert_status(StatusCode::NOT_FOUND);

    let again = h
        .server
        .delete(&path)
        .add_header(auth_header(), bearer(&h.token))
        .await;
    again.assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// Listing: filters, projection, sort, pagination
// =============================================================================

async fn seeded() -> Harness {
    let h = harness();
    for (author, rating, city) in [
        ("Anne Carson", 6.0, "Toronto"),
        ("Ted Chiang", 9.0, "Port Jefferson"),
        ("Jorge Luis Borges", 8.0, "Buenos Aires"),
        ("Clarice Lispector", 7.0, "Rio de Janeiro"),
        ("Samuel Delany", 4.0, "New York"),
    ] {
        h.create(book(author, rating, city)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    h
}

#[tokio::test]
async fn test_list_default_sort_newest_first() {
    let h = seeded().await;
    let body = h.list(&[]).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 5);
    assert_eq!(
        authors(&body),
        vec![
            "Samuel Delany",
            "Clarice Lispector",
            "Jorge Luis Borges",
            "Ted Chiang",
            "Anne Carson"
        ]
    );
    assert_eq!(body["pagination"], json!({}));
}

#[tokio::test]
async fn test_list_filter_comparison() {
    let h = seeded().await;
    let body = h.list(&[("rating[gte]", "8"), ("sort", "-rating")]).await;

    assert_eq!(body["count"], 2);
    assert_eq!(authors(&body), vec!["Ted Chiang", "Jorge Luis Borges"]);

    let body = h.list(&[("rating[lt]", "6")]).await;
    assert_eq!(authors(&body), vec!["Samuel Delany"]);
}

#[tokio::test]
async fn test_list_filter_range() {
    let h = seeded().await;
    let body = h
        .list(&[("rating[gt]", "4"), ("rating[lte]", "7"), ("sort", "rating")])
        .await;
    assert_eq!(authors(&body), vec!["Anne Carson", "Clarice Lispector"]);
}

#[tokio::test]
async fn test_list_filter_nested_equality() {
    let h = seeded().await;
    let body = h.list(&[("location[city]", "Toronto")]).await;
    assert_eq!(authors(&body), vec!["Anne Carson"]);
}

#[tokio::test]
async fn test_list_filter_membership() {
    let h = seeded().await;
    let body = h
        .list(&[("author[in]", "Ted Chiang,Anne Carson"), ("sort", "author")])
        .await;
    assert_eq!(authors(&body), vec!["Anne Carson", "Ted Chiang"]);
}

#[tokio::test]
async fn test_list_repeated_key_matches_any_value() {
    let h = seeded().await;
    let body = h
        .list(&[("rating", "6"), ("rating", "9"), ("sort", "author")])
        .await;
    assert_eq!(body["count"], 2);
    assert_eq!(authors(&body), vec!["Anne Carson", "Ted Chiang"]);

    // equality values are never split on commas
    let body = h.list(&[("author", "Ted Chiang,Anne Carson"), ("author", "Nobody")]).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_list_select_projects_fields() {
    let h = seeded().await;
    let body = h.list(&[("select", "author,rating"), ("limit", "1")]).await;

    let first = body["data"][0].as_object().unwrap();
    let mut keys: Vec<&str> = first.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["author", "id", "rating"]);
}

#[tokio::test]
async fn test_list_pagination_links() {
    let h = seeded().await;

    let first = h.list(&[("limit", "2")]).await;
    assert_eq!(first["count"], 2);
    assert_eq!(first["pagination"], json!({ "next": { "page": 2, "limit": 2 } }));

    let middle = h.list(&[("limit", "2"), ("page", "2")]).await;
    assert_eq!(middle["count"], 2);
    assert_eq!(
        middle["pagination"],
        json!({
            "next": { "page": 3, "limit": 2 },
            "prev": { "page": 1, "limit": 2 }
        })
    );

    let last = h.list(&[("limit", "2"), ("page", "3")]).await;
    assert_eq!(last["count"], 1);
    assert_eq!(last["pagination"], json!({ "prev": { "page": 2, "limit": 2 } }));
}

#[tokio::test]
async fn test_list_pagination_ignores_garbage_window() {
    let h = seeded().await;
    let body = h.list(&[("limit", "abc"), ("page", "-3")]).await;
    assert_eq!(body["count"], 5);
    assert_eq!(body["pagination"], json!({}));
}

#[tokio::test]
async fn test_pagination_total_counts_collection_by_default() {
    let h = seeded().await;
    // two matches fit in one page, but the whole collection has five
    let body = h.list(&[("rating[gte]", "8"), ("limit", "2")]).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["pagination"]["next"], json!({ "page": 2, "limit": 2 }));
}

#[tokio::test]
async fn test_pagination_total_can_count_filtered_subset() {
    let h = harness_with(PaginationTotal::Filtered);
    for (author, rating) in [("A One", 9.0), ("B Two", 8.0), ("C Three", 2.0)] {
        h.create(book(author, rating, "Boston")).await;
    }

    let body = h.list(&[("rating[gte]", "8"), ("limit", "2")]).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["pagination"], json!({}));
}

#[tokio::test]
async fn test_list_invalid_query() {
    let h = seeded().await;

    let response = h
        .server
        .get("/api/v1/books")
        .add_query_param("rating[gte]", "lots")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid query"));

    let response = h
        .server
        .get("/api/v1/books")
        .add_query_param("rating[gte", "4")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_rejects_operator_field_names() {
    let h = seeded().await;

    for (key, value) in [("$where", "1"), ("rating[$ne]", "4"), ("$or[0][rating]", "4")] {
        let response = h.server.get("/api/v1/books").add_query_param(key, value).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(
            body["error"].as_str().unwrap().starts_with("Invalid query"),
            "{}: {}",
            key,
            body
        );
    }

    // select and sort quietly drop them
    let body = h.list(&[("select", "author,$where"), ("sort", "$natural"), ("limit", "1")]).await;
    let first = body["data"][0].as_object().unwrap();
    let mut keys: Vec<&str> = first.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["author", "id"]);
    assert_eq!(first["author"], "Samuel Delany");
}

// =============================================================================
// Photo upload
// =============================================================================

fn photo_form(name: &str, mime: &str, size: usize) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![0u8; size]).file_name(name).mime_type(mime),
    )
}

async fn upload_target(h: &Harness) -> String {
    let created = h.create(book("Octavia Butler", 9.0, "Pasadena")).await;
    created["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_upload_photo() {
    let h = harness();
    let id = upload_target(&h).await;

    let response = h
        .server
        .put(&format!("/api/v1/books/{}/photo", id))
        .add_header(auth_header(), bearer(&h.token))
        .multipart(photo_form("cover.png", "image/png", 512))
        .await;

    response.assert_status_ok();
    let expected = format!("photo_{}.png", id);
    response.assert_json(&json!({ "success": true, "data": expected }));

    let stored = h.uploads.path().join("uploads").join(&expected);
    assert_eq!(std::fs::metadata(&stored).unwrap().len(), 512);

    let body: Value = h.server.get(&format!("/api/v1/books/{}", id)).await.json();
    assert_eq!(body["data"]["photo"], expected);
}

#[tokio::test]
async fn test_upload_rejects_non_image() {
    let h = harness();
    let id = upload_target(&h).await;

    let response = h
        .server
        .put(&format!("/api/v1/books/{}/photo", id))
        .add_header(auth_header(), bearer(&h.token))
        .multipart(photo_form("notes.txt", "text/plain", 16))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({
        "success": false,
        "error": "Please upload an image file"
    }));
    assert!(!h.uploads.path().join("uploads").exists());
}

#[tokio::test]
async fn test_upload_rejects_oversized_image() {
    let h = harness();
    let id = upload_target(&h).await;

    let response = h
        .server
        .put(&format!("/api/v1/books/{}/photo", id))
        .add_header(auth_header(), bearer(&h.token))
        .multipart(photo_form("huge.jpg", "image/jpeg", MAX_UPLOAD + 1))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body["error"],
        format!("Please upload an image less than {} bytes", MAX_UPLOAD)
    );
    assert!(!h.uploads.path().join("uploads").exists());
}

#[tokio::test]
async fn test_upload_requires_file_part() {
    let h = harness();
    let id = upload_target(&h).await;

    let form = MultipartForm::new().add_text("caption", "no file here");
    let response = h
        .server
        .put(&format!("/api/v1/books/{}/photo", id))
        .add_header(auth_header(), bearer(&h.token))
        .multipart(form)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Please upload a file");
}

#[tokio::test]
async fn test_upload_unknown_book() {
    let h = harness();
    let response = h
        .server
        .put(&format!("/api/v1/books/{}/photo", uuid::Uuid::new_v4()))
        .add_header(auth_header(), bearer(&h.token))
        .multipart(photo_form("cover.png", "image/png", 8))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// Geocoding through MapQuest
// =============================================================================

/// Local MapQuest stand-in: "Atlantis" finds nothing, anything else fails
async fn fake_mapquest() -> String {
    use axum::{Json, Router, extract::Query, response::IntoResponse, routing::get};
    use std::collections::HashMap;

    let app = Router::new().route(
        "/geocoding/v1/address",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            match params.get("location").map(String::as_str) {
                Some("Atlantis") => Json(json!({ "results": [] })).into_response(),
                _ => StatusCode::SERVICE_UNAVAILABLE.into_response(),
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/geocoding/v1/address", addr)
}

async fn mapquest_harness() -> Harness {
    let geocoder = MapQuestGeocoder::new("test-key")
        .unwrap()
        .with_endpoint(fake_mapquest().await);
    harness_geocoding(geocoder)
}

#[tokio::test]
async fn test_unknown_address_is_validation_error() {
    let h = mapquest_harness().await;
    let response = h
        .server
        .post("/api/v1/books")
        .add_header(auth_header(), bearer(&h.token))
        .json(&book("Italo Calvino", 8.0, "Atlantis"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Could not geocode address 'Atlantis'");
    assert_eq!(h.list(&[]).await["count"], 0);
}

#[tokio::test]
async fn test_geocoder_outage_is_server_error() {
    let h = mapquest_harness().await;
    let response = h
        .server
        .post("/api/v1/books")
        .add_header(auth_header(), bearer(&h.token))
        .json(&book("Italo Calvino", 8.0, "Sanremo"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body, json!({ "success": false, "error": "Server Error" }));
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_mutations_require_token() {
    let h = harness();
    let response = h
        .server
        .post("/api/v1/books")
        .json(&book("Nobody", 1.0, "Nowhere"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({
        "success": false,
        "error": "Not authorized to access this route"
    }));
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let h = harness();
    let forged = JwtAuthProvider::new("some-other-secret", "token", 30)
        .issue_token("mallory", "admin")
        .unwrap();

    h.server
        .post("/api/v1/books")
        .add_header(auth_header(), bearer(&forged))
        .json(&book("Nobody", 1.0, "Nowhere"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_role_is_forbidden() {
    let h = harness();
    let reader = JwtAuthProvider::new(SECRET, "token", 30)
        .issue_token("reader-1", "user")
        .unwrap();

    let response = h
        .server
        .post("/api/v1/books")
        .add_header(auth_header(), bearer(&reader))
        .json(&book("Nobody", 1.0, "Nowhere"))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    response.assert_json(&json!({
        "success": false,
        "error": "User role user is not authorized to access this route"
    }));
}

#[tokio::test]
async fn test_token_accepted_from_cookie() {
    let h = harness();
    let cookie = HeaderValue::from_str(&format!("theme=dark; token={}", h.token)).unwrap();

    let response = h.server.get("/api/v1/auth/me").add_header(header::COOKIE, cookie).await;

    response.assert_status_ok();
    response.assert_json(&json!({
        "success": true,
        "data": { "kind": "user", "user_id": "publisher-1", "role": "publisher" }
    }));
}

#[tokio::test]
async fn test_reads_are_public() {
    let h = harness();
    h.server.get("/api/v1/books").await.assert_status_ok();
    h.server
        .get("/api/v1/auth/me")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Misc
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let h = harness();
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({
        "status": "ok",
        "service": "shelfkeep",
        "store": "in-memory"
    }));
}

#[tokio::test]
async fn test_static_files_served_from_public_dir() {
    let h = harness();
    std::fs::write(h.uploads.path().join("index.html"), "<h1>shelfkeep</h1>").unwrap();

    let response = h.server.get("/index.html").await;
    response.assert_status_ok();
    response.assert_text("<h1>shelfkeep</h1>");
}
