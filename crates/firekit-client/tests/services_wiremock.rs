//! Service surfaces against a mock server.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use firekit_client::{
    Auth, AuthSession, Connection, Database, Error, Firestore, RetryConfig, Storage, Token,
    Transport, TransportConfig,
};
use firekit_wire::{FromWireValue, ToWireValue};

fn transport() -> Transport {
    Transport::new(TransportConfig {
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(1),
        retry: RetryConfig {
            max_retries: 0,
            base_delay: Duration::from_millis(10),
        },
    })
    .unwrap()
}

fn connection(server: &MockServer) -> Connection {
    // A real key file here would win over the attached test token.
    std::env::remove_var("GOOGLE_APPLICATION_CREDENTIALS");
    let token = Token::new("test-token", Utc::now(), Duration::from_secs(3600), None);
    Connection::builder()
        .project_id("demo")
        .api_key("test-api-key")
        .firestore_url(format!("{}/documents", server.uri()))
        .database_url(server.uri())
        .storage_url(server.uri())
        .identity_url(server.uri())
        .links_url(server.uri())
        .build()
        .unwrap()
        .with_token(token)
}

// =============================================================================
// Document store
// =============================================================================

#[tokio::test]
async fn get_document_decodes_fields_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents/users/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/demo/databases/(default)/documents/users/alice",
            "fields": {
                "name": {"stringValue": "Alice"},
                "age": {"integerValue": "30"}
            },
            "createTime": "2024-06-01T12:00:00Z",
            "updateTime": "2024-06-02T12:00:00Z"
        })))
        .mount(&server)
        .await;

    let store = Firestore::new(transport(), connection(&server));
    let doc = store.get_document("users", "alice").await.unwrap().unwrap();

    assert_eq!(doc.id(), Some("alice"));
    assert!(doc.created_at().is_some());
    let fields = doc.fields.unwrap();
    assert_eq!(String::from_wire_value(&fields["name"]), Some("Alice".to_string()));
    assert_eq!(i64::from_wire_value(&fields["age"]), Some(30));
}

#[tokio::test]
async fn get_missing_document_softens_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents/users/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "Document not found"}
        })))
        .mount(&server)
        .await;

    let store = Firestore::new(transport(), connection(&server));
    assert!(store.get_document("users", "ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_missing_document_propagates_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/documents/users/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "Document not found"}
        })))
        .mount(&server)
        .await;

    let store = Firestore::new(transport(), connection(&server));
    let err = store.delete_document("users", "ghost").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn patch_with_merge_sends_update_mask() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/documents/users/alice"))
        .and(query_param("updateMask.fieldPaths", "age"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/demo/databases/(default)/documents/users/alice",
            "fields": {"age": {"integerValue": "31"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Firestore::new(transport(), connection(&server));
    let mut fields = std::collections::HashMap::new();
    fields.insert("age".to_string(), 31i64.to_wire_value());

    let doc = store.patch_document("users", "alice", fields, true).await.unwrap();
    assert_eq!(doc.id(), Some("alice"));
}

#[tokio::test]
async fn query_compiles_filters_and_decodes_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents:runQuery"))
        .and(body_partial_json(json!({
            "structuredQuery": {
                "from": [{"collectionId": "users"}],
                "where": {
                    "fieldFilter": {
                        "field": {"fieldPath": "age"},
                        "op": "GREATER_THAN_OR_EQUAL",
                        "value": {"integerValue": "18"}
                    }
                },
                "limit": 5
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": {
                "name": ".../users/alice",
                "fields": {"age": {"integerValue": "30"}}
            }},
            {"readTime": "2024-06-01T12:00:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Firestore::new(transport(), connection(&server));
    let query = store
        .query("users")
        .filter("age", ">=", 18i64)
        .unwrap()
        .limit(5);

    let docs = store.run(query).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id(), Some("alice"));
}

#[tokio::test]
async fn query_with_no_matches_returns_empty_vec() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents:runQuery"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"readTime": "2024-06-01T12:00:00Z"}])),
        )
        .mount(&server)
        .await;

    let store = Firestore::new(transport(), connection(&server));
    let docs = store.run(store.query("users")).await.unwrap();
    assert!(docs.is_empty());
}

// =============================================================================
// JSON tree store
// =============================================================================

#[tokio::test]
async fn database_push_returns_generated_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rooms/general.json"))
        .and(query_param("auth", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "-Nabc123"})))
        .expect(1)
        .mount(&server)
        .await;

    let db = Database::new(transport(), connection(&server));
    let key = db.push("/rooms/general/", &json!({"text": "hi"})).await.unwrap();
    assert_eq!(key, "-Nabc123");
}

#[tokio::test]
async fn database_get_reads_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings.json"))
        .and(query_param("auth", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"theme": "dark"})))
        .mount(&server)
        .await;

    let db = Database::new(transport(), connection(&server));
    assert_eq!(db.get("settings").await.unwrap(), json!({"theme": "dark"}));
}

// =============================================================================
// Identity
// =============================================================================

#[tokio::test]
async fn sign_in_returns_session_with_key_param() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .and(query_param("key", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idToken": "id-tok",
            "refreshToken": "refresh-tok",
            "expiresIn": "3600",
            "localId": "user-1",
            "email": "a@example.test"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = Auth::new(transport(), connection(&server));
    let session = auth.sign_in_email("a@example.test", "hunter2").await.unwrap();
    assert_eq!(session.local_id, "user-1");
    assert_eq!(session.lifetime(), Duration::from_secs(3600));
}

#[tokio::test]
async fn refresh_id_token_exchanges_at_secure_token_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(query_param("key", "test-api-key"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "acc-tok-2",
            "id_token": "id-tok-2",
            "refresh_token": "refresh-tok-2",
            "expires_in": "3600"
        })))
        .expect(1)
        .mount(&server)
        .await;

    std::env::remove_var("GOOGLE_APPLICATION_CREDENTIALS");
    let conn = Connection::builder()
        .project_id("demo")
        .api_key("test-api-key")
        .secure_token_url(format!("{}/token", server.uri()))
        .build()
        .unwrap();
    let auth = Auth::new(transport(), conn);

    let token = auth.refresh_id_token("refresh-tok").await.unwrap();
    assert_eq!(token.access_token(), "id-tok-2");
    assert!(!token.is_expired());
}

#[tokio::test]
async fn expired_session_token_refreshes_through_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(query_param("key", "test-api-key"))
        .and(body_string_contains("refresh_token=refresh-tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "acc-tok-2",
            "id_token": "id-tok-2",
            "expires_in": "3600"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // A 1s lifetime is already inside the freshness margin.
    let session = AuthSession {
        id_token: "id-tok".to_string(),
        refresh_token: "refresh-tok".to_string(),
        expires_in: "1".to_string(),
        local_id: "user-1".to_string(),
        email: None,
    };
    let stale = session.into_token("test-api-key", format!("{}/token", server.uri()).as_str());
    assert!(stale.is_expired());

    let fresh = stale.fresh(&transport()).await.unwrap();
    assert_eq!(fresh.access_token(), "id-tok-2");
    assert!(!fresh.is_expired());
}

#[tokio::test]
async fn sign_in_bad_credentials_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS"}
        })))
        .mount(&server)
        .await;

    let auth = Auth::new(transport(), connection(&server));
    let err = auth.sign_in_email("a@example.test", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

// =============================================================================
// Blob storage
// =============================================================================

#[tokio::test]
async fn storage_download_missing_object_softens_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/o/photos%2Fghost.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let storage = Storage::new(transport(), connection(&server));
    assert!(storage.download("photos/ghost.png").await.unwrap().is_none());
}

#[tokio::test]
async fn storage_upload_posts_raw_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/o"))
        .and(query_param("name", "notes/a.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "notes/a.txt",
            "size": "5"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Storage::new(transport(), connection(&server));
    let meta = storage
        .upload("notes/a.txt", b"hello".to_vec(), "text/plain")
        .await
        .unwrap();
    assert_eq!(meta.name, "notes/a.txt");
}
