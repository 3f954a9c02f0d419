//! Blob storage operations.

use reqwest::Method;
use serde::Deserialize;
use tracing::{info, warn};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::transport::{ApiRequest, CredentialMode, Transport};

/// Metadata for one stored object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub name: String,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub time_created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsResponse {
    #[serde(default)]
    pub items: Option<Vec<ObjectMetadata>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Blob storage client.
#[derive(Debug, Clone)]
pub struct Storage {
    transport: Transport,
    conn: Connection,
}

impl Storage {
    pub fn new(transport: Transport, conn: Connection) -> Self {
        Self { transport, conn }
    }

    fn object_url(&self, object_path: &str) -> String {
        format!(
            "{}/o/{}",
            self.conn.storage_url(),
            urlencoding::encode(object_path)
        )
    }

    async fn bearer(&self) -> Result<String> {
        self.conn.fresh_bearer(&self.transport).await
    }

    /// Upload raw bytes to an object path.
    pub async fn upload(
        &self,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ObjectMetadata> {
        let url = format!("{}/o", self.conn.storage_url());
        let size = bytes.len();
        let req = ApiRequest::new("storage_upload", Method::POST, url)
            .query("name", object_path)
            .raw(bytes, content_type.to_string())
            .credential(Some(self.bearer().await?), CredentialMode::BearerHeader);

        let meta: ObjectMetadata = serde_json::from_value(self.transport.request(req).await?)?;
        info!(object = %object_path, size, "uploaded object");
        Ok(meta)
    }

    /// Download an object's bytes. A missing object is a valid "no data"
    /// outcome.
    pub async fn download(&self, object_path: &str) -> Result<Option<Vec<u8>>> {
        let req = ApiRequest::new("storage_download", Method::GET, self.object_url(object_path))
            .query("alt", "media")
            .credential(Some(self.bearer().await?), CredentialMode::BearerHeader);

        match self.transport.request_raw(req).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(Error::NotFound(_)) => {
                warn!("object {:?} not found", object_path);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// List objects, optionally under a prefix.
    pub async fn list(
        &self,
        prefix: Option<&str>,
        max_results: Option<u32>,
    ) -> Result<ListObjectsResponse> {
        let url = format!("{}/o", self.conn.storage_url());
        let mut req = ApiRequest::new("storage_list", Method::GET, url);
        if let Some(prefix) = prefix {
            req = req.query("prefix", prefix);
        }
        if let Some(max) = max_results {
            req = req.query("maxResults", max.to_string());
        }
        let req = req.credential(Some(self.bearer().await?), CredentialMode::BearerHeader);

        Ok(serde_json::from_value(self.transport.request(req).await?)?)
    }

    /// Delete an object. Propagates `NotFound`.
    pub async fn delete(&self, object_path: &str) -> Result<()> {
        let req = ApiRequest::new(
            "storage_delete",
            Method::DELETE,
            self.object_url(object_path),
        )
        .credential(Some(self.bearer().await?), CredentialMode::BearerHeader);

        self.transport.request(req).await?;
        info!(object = %object_path, "deleted object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_deserializes() {
        let response: ListObjectsResponse = serde_json::from_str(
            r#"{"items": [{"name": "photos/cat.png", "size": "1024"}], "nextPageToken": "t"}"#,
        )
        .unwrap();
        let items = response.items.unwrap();
        assert_eq!(items[0].name, "photos/cat.png");
        assert_eq!(response.next_page_token.as_deref(), Some("t"));
    }
}
