//! Document envelope and list/query response types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{decode_fields, parse_timestamp, WireValue};

/// A stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name; the generated id is its trailing path segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Document fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<HashMap<String, WireValue>>,
    /// Create time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Update time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: HashMap<String, WireValue>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }

    /// Document id: the trailing segment of the resource name.
    pub fn id(&self) -> Option<&str> {
        self.name.as_deref().and_then(|n| n.rsplit('/').next())
    }

    /// Parsed create time.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.create_time.as_deref().and_then(parse_timestamp)
    }

    /// Parsed update time.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.update_time.as_deref().and_then(parse_timestamp)
    }

    /// Decode the field container to untyped JSON.
    pub fn decoded(&self) -> serde_json::Map<String, serde_json::Value> {
        self.fields
            .as_ref()
            .map(decode_fields)
            .unwrap_or_default()
    }
}

/// List documents response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    pub documents: Option<Vec<Document>>,
    pub next_page_token: Option<String>,
}

/// One result envelope in a streamed query response.
///
/// The query endpoint answers with a JSON array of these; envelopes carrying
/// only `readTime` (no document) are progress markers and are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_results: Option<i64>,
}
