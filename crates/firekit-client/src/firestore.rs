//! Document store operations.
//!
//! Thin parameter assembly over the transport and codec: each method builds a
//! URL plus body and lets the transport do the exchange. Reads soften a
//! missing document into `Ok(None)`; writes and deletes propagate `NotFound`.

use std::collections::HashMap;

use reqwest::Method;
use tracing::{info, warn};

use firekit_wire::{Document, ListDocumentsResponse, WireValue};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::query::QueryBuilder;
use crate::transport::{ApiRequest, CredentialMode, Transport};

/// Document store client.
#[derive(Debug, Clone)]
pub struct Firestore {
    transport: Transport,
    conn: Connection,
}

impl Firestore {
    pub fn new(transport: Transport, conn: Connection) -> Self {
        Self { transport, conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.conn.firestore_url(), collection, doc_id)
    }

    async fn bearer(&self) -> Result<String> {
        self.conn.fresh_bearer(&self.transport).await
    }

    /// Get a document. A missing document is a valid "no data" outcome.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> Result<Option<Document>> {
        let req = ApiRequest::new(
            "get_document",
            Method::GET,
            self.document_url(collection, doc_id),
        )
        .credential(Some(self.bearer().await?), CredentialMode::BearerHeader);

        match self.transport.request(req).await {
            Ok(body) => Ok(Some(serde_json::from_value(body)?)),
            Err(Error::NotFound(_)) => {
                warn!("document {}/{} not found", collection, doc_id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Create a document with an explicit id.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, WireValue>,
    ) -> Result<Document> {
        let url = format!("{}/{}", self.conn.firestore_url(), collection);
        let body = Document::new(fields);

        let req = ApiRequest::new("create_document", Method::POST, url)
            .query("documentId", doc_id)
            .json(serde_json::to_value(&body)?)
            .credential(Some(self.bearer().await?), CredentialMode::BearerHeader);

        let created: Document = serde_json::from_value(self.transport.request(req).await?)?;
        info!("created document {}/{}", collection, doc_id);
        Ok(created)
    }

    /// Add a document with a server-assigned id; the generated id is the
    /// trailing segment of the returned document name.
    pub async fn add_document(
        &self,
        collection: &str,
        fields: HashMap<String, WireValue>,
    ) -> Result<Document> {
        let url = format!("{}/{}", self.conn.firestore_url(), collection);
        let body = Document::new(fields);

        let req = ApiRequest::new("add_document", Method::POST, url)
            .json(serde_json::to_value(&body)?)
            .credential(Some(self.bearer().await?), CredentialMode::BearerHeader);

        Ok(serde_json::from_value(self.transport.request(req).await?)?)
    }

    /// Patch a document. With `merge`, only the supplied fields are touched
    /// (`updateMask` per field); otherwise the whole document is replaced.
    pub async fn patch_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, WireValue>,
        merge: bool,
    ) -> Result<Document> {
        let mut req = ApiRequest::new(
            "patch_document",
            Method::PATCH,
            self.document_url(collection, doc_id),
        );
        if merge {
            let mut paths: Vec<&String> = fields.keys().collect();
            paths.sort();
            for path in paths {
                req = req.query("updateMask.fieldPaths", path);
            }
        }
        let body = Document::new(fields);
        let req = req
            .json(serde_json::to_value(&body)?)
            .credential(Some(self.bearer().await?), CredentialMode::BearerHeader);

        Ok(serde_json::from_value(self.transport.request(req).await?)?)
    }

    /// Delete a document. Deleting a missing document surfaces `NotFound`.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> Result<()> {
        let req = ApiRequest::new(
            "delete_document",
            Method::DELETE,
            self.document_url(collection, doc_id),
        )
        .credential(Some(self.bearer().await?), CredentialMode::BearerHeader);

        self.transport.request(req).await?;
        info!("deleted document {}/{}", collection, doc_id);
        Ok(())
    }

    /// List documents in a collection.
    pub async fn list_documents(
        &self,
        collection: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<ListDocumentsResponse> {
        let url = format!("{}/{}", self.conn.firestore_url(), collection);
        let mut req = ApiRequest::new("list_documents", Method::GET, url);
        if let Some(size) = page_size {
            req = req.query("pageSize", size.to_string());
        }
        if let Some(token) = page_token {
            req = req.query("pageToken", token);
        }
        let req = req.credential(Some(self.bearer().await?), CredentialMode::BearerHeader);

        Ok(serde_json::from_value(self.transport.request(req).await?)?)
    }

    /// Start a structured query on a collection path.
    pub fn query(&self, collection_path: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new(collection_path)
    }

    /// Execute a built query.
    pub async fn run(&self, query: QueryBuilder) -> Result<Vec<Document>> {
        query.run(&self.transport, &self.conn).await
    }
}
