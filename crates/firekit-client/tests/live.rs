//! Live integration tests against real project endpoints.
//!
//! These need credentials in the environment (or a `.env` file):
//! `FIREKIT_PROJECT_ID` plus `GOOGLE_APPLICATION_CREDENTIALS`, and
//! `FIREKIT_API_KEY` for the identity tests. Run with `cargo test -- --ignored`.

use std::collections::HashMap;

use firekit_client::{Connection, Transport, TransportConfig};
use firekit_wire::{ToWireValue, WireValue};

fn live_setup() -> (Transport, Connection) {
    dotenvy::dotenv().ok();

    let transport = Transport::new(TransportConfig::from_env()).expect("build transport");
    let conn = Connection::builder()
        .build()
        .expect("credentials in environment");
    (transport, conn)
}

/// Round-trip a document through the live document store.
#[tokio::test]
#[ignore = "requires live project credentials"]
async fn test_live_document_round_trip() {
    let (transport, conn) = live_setup();
    let firestore = firekit_client::Firestore::new(transport, conn);

    let mut fields: HashMap<String, WireValue> = HashMap::new();
    fields.insert("probe".to_string(), "integration".to_wire_value());
    fields.insert("count".to_string(), 1i64.to_wire_value());

    let doc = firestore
        .create_document("_health", "_firekit_probe", fields)
        .await
        .expect("create probe document");
    assert_eq!(doc.id(), Some("_firekit_probe"));

    let fetched = firestore
        .get_document("_health", "_firekit_probe")
        .await
        .expect("read probe document");
    assert!(fetched.is_some());

    firestore
        .delete_document("_health", "_firekit_probe")
        .await
        .expect("delete probe document");

    let gone = firestore
        .get_document("_health", "_firekit_probe")
        .await
        .expect("read after delete");
    assert!(gone.is_none());
}

/// Anonymous sign-in issues a usable session.
#[tokio::test]
#[ignore = "requires live project credentials"]
async fn test_live_anonymous_sign_in() {
    let (transport, conn) = live_setup();
    let auth = firekit_client::Auth::new(transport, conn);

    let session = auth.sign_in_anonymous().await.expect("anonymous sign-in");
    assert!(!session.id_token.is_empty());
    assert!(session.lifetime() > std::time::Duration::ZERO);
}
