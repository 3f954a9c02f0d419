//! JSON tree store operations.
//!
//! The tree store addresses values by slash-separated paths and takes its
//! credential as an `auth` query parameter. Bodies are plain JSON, no tagged
//! value encoding.

use reqwest::Method;
use tracing::{info, warn};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::transport::{ApiRequest, CredentialMode, Transport};

/// Characters the store forbids inside a path segment.
const FORBIDDEN_PATH_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

/// Normalize a tree path: strip surrounding slashes and forbidden
/// characters. Returns the cleaned string.
pub fn clean_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !FORBIDDEN_PATH_CHARS.contains(c))
        .collect();
    if cleaned != trimmed {
        warn!("path {:?} contained forbidden characters, using {:?}", path, cleaned);
    }
    cleaned
}

/// JSON tree store client.
#[derive(Debug, Clone)]
pub struct Database {
    transport: Transport,
    conn: Connection,
}

impl Database {
    pub fn new(transport: Transport, conn: Connection) -> Self {
        Self { transport, conn }
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.conn.database_url(), clean_path(path))
    }

    async fn authed(&self, req: ApiRequest) -> Result<ApiRequest> {
        let bearer = self.conn.fresh_bearer(&self.transport).await?;
        Ok(req.credential(Some(bearer), CredentialMode::QueryParam("auth")))
    }

    /// Read the value at a path. An absent node reads as JSON null.
    pub async fn get(&self, path: &str) -> Result<serde_json::Value> {
        let req = ApiRequest::new("db_get", Method::GET, self.node_url(path));
        match self.transport.request(self.authed(req).await?).await {
            Ok(value) => Ok(value),
            Err(Error::NotFound(_)) => {
                warn!("database path {:?} not found", path);
                Ok(serde_json::Value::Null)
            }
            Err(e) => Err(e),
        }
    }

    /// Write (replace) the value at a path.
    pub async fn set(&self, path: &str, value: &serde_json::Value) -> Result<serde_json::Value> {
        let req = ApiRequest::new("db_set", Method::PUT, self.node_url(path)).json(value.clone());
        self.transport.request(self.authed(req).await?).await
    }

    /// Append a value under a server-generated key; returns the key.
    pub async fn push(&self, path: &str, value: &serde_json::Value) -> Result<String> {
        let req = ApiRequest::new("db_push", Method::POST, self.node_url(path)).json(value.clone());
        let body = self.transport.request(self.authed(req).await?).await?;

        let key = body["name"]
            .as_str()
            .ok_or_else(|| Error::service("push response did not carry a generated key"))?
            .to_string();
        info!("pushed value under {}/{}", clean_path(path), key);
        Ok(key)
    }

    /// Merge the given children into the value at a path.
    pub async fn update(&self, path: &str, value: &serde_json::Value) -> Result<serde_json::Value> {
        let req =
            ApiRequest::new("db_update", Method::PATCH, self.node_url(path)).json(value.clone());
        self.transport.request(self.authed(req).await?).await
    }

    /// Remove the value at a path. Propagates `NotFound`.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let req = ApiRequest::new("db_delete", Method::DELETE, self.node_url(path));
        self.transport.request(self.authed(req).await?).await?;
        info!("deleted database path {:?}", clean_path(path));
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
