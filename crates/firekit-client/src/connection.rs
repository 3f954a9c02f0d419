//! Connection: the immutable configuration bundle every call threads through.

use std::sync::Arc;

use crate::config::{resolve, ConfigKey};
use crate::credentials::{ServiceAccount, Token};
use crate::error::{Error, Result};
use crate::session::{ConfigFile, SessionStore};
use crate::transport::Transport;

/// Immutable snapshot of endpoint identifiers and current credentials.
///
/// Attaching a token produces a derived copy; a snapshot another caller holds
/// is never mutated.
#[derive(Debug, Clone)]
pub struct Connection {
    project_id: String,
    api_key: Option<String>,
    firestore_url: String,
    database_url: String,
    storage_url: String,
    identity_url: String,
    secure_token_url: String,
    links_url: String,
    links_domain: Option<String>,
    service_account: Option<Arc<ServiceAccount>>,
    token: Option<Token>,
}

impl Connection {
    /// Start building a connection.
    pub fn builder<'a>() -> ConnectionBuilder<'a> {
        ConnectionBuilder::default()
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Document store root (`.../documents`).
    pub fn firestore_url(&self) -> &str {
        &self.firestore_url
    }

    /// JSON tree store base URL.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Blob storage bucket base URL.
    pub fn storage_url(&self) -> &str {
        &self.storage_url
    }

    /// Identity endpoint base URL.
    pub fn identity_url(&self) -> &str {
        &self.identity_url
    }

    /// Secure-token endpoint for user refresh-token exchanges.
    pub fn secure_token_url(&self) -> &str {
        &self.secure_token_url
    }

    /// Short-link endpoint base URL.
    pub fn links_url(&self) -> &str {
        &self.links_url
    }

    pub fn links_domain(&self) -> Option<&str> {
        self.links_domain.as_deref()
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Derived snapshot with the token replaced.
    pub fn with_token(&self, token: Token) -> Self {
        Self {
            token: Some(token),
            ..self.clone()
        }
    }

    /// Derived snapshot with all credential fields removed.
    pub fn cleared(&self) -> Self {
        Self {
            api_key: None,
            service_account: None,
            token: None,
            ..self.clone()
        }
    }

    /// Resolve a bearer credential whose remaining lifetime exceeds the
    /// safety margin. Service-account material takes precedence over an
    /// attached user token.
    pub async fn fresh_bearer(&self, transport: &Transport) -> Result<String> {
        if let Some(account) = &self.service_account {
            return Arc::clone(account).access_token(transport).await;
        }
        if let Some(token) = &self.token {
            let fresh = token.fresh(transport).await?;
            return Ok(fresh.access_token().to_string());
        }
        Err(Error::auth("no credential attached to the connection"))
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds a [`Connection`], running every field through the resolution
/// cascade (explicit value, session store, environment, config file).
#[derive(Debug, Default)]
pub struct ConnectionBuilder<'a> {
    project_id: Option<String>,
    api_key: Option<String>,
    database_url: Option<String>,
    storage_bucket: Option<String>,
    links_domain: Option<String>,
    service_account_path: Option<String>,
    firestore_url: Option<String>,
    storage_url: Option<String>,
    identity_url: Option<String>,
    secure_token_url: Option<String>,
    links_url: Option<String>,
    session: Option<&'a SessionStore>,
    config_file: Option<&'a ConfigFile>,
}

impl<'a> ConnectionBuilder<'a> {
    pub fn project_id(mut self, value: impl Into<String>) -> Self {
        self.project_id = Some(value.into());
        self
    }

    pub fn api_key(mut self, value: impl Into<String>) -> Self {
        self.api_key = Some(value.into());
        self
    }

    pub fn database_url(mut self, value: impl Into<String>) -> Self {
        self.database_url = Some(value.into());
        self
    }

    pub fn storage_bucket(mut self, value: impl Into<String>) -> Self {
        self.storage_bucket = Some(value.into());
        self
    }

    pub fn links_domain(mut self, value: impl Into<String>) -> Self {
        self.links_domain = Some(value.into());
        self
    }

    pub fn service_account_path(mut self, value: impl Into<String>) -> Self {
        self.service_account_path = Some(value.into());
        self
    }

    /// Explicit document-store endpoint base, instead of the derived one.
    pub fn firestore_url(mut self, value: impl Into<String>) -> Self {
        self.firestore_url = Some(value.into());
        self
    }

    /// Explicit blob storage endpoint base, instead of the derived one.
    pub fn storage_url(mut self, value: impl Into<String>) -> Self {
        self.storage_url = Some(value.into());
        self
    }

    /// Explicit identity endpoint base, instead of the default one.
    pub fn identity_url(mut self, value: impl Into<String>) -> Self {
        self.identity_url = Some(value.into());
        self
    }

    /// Explicit secure-token endpoint, instead of the default one.
    pub fn secure_token_url(mut self, value: impl Into<String>) -> Self {
        self.secure_token_url = Some(value.into());
        self
    }

    /// Explicit short-link endpoint base, instead of the default one.
    pub fn links_url(mut self, value: impl Into<String>) -> Self {
        self.links_url = Some(value.into());
        self
    }

    pub fn session(mut self, session: &'a SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn config_file(mut self, config_file: &'a ConfigFile) -> Self {
        self.config_file = Some(config_file);
        self
    }

    pub fn build(self) -> Result<Connection> {
        let empty_session = SessionStore::new();
        let session = self.session.unwrap_or(&empty_session);
        let file = self.config_file;

        let service_account = resolve(
            ConfigKey::ServiceAccount,
            self.service_account_path.as_deref(),
            session,
            file,
            None,
        )
        .map(|path| ServiceAccount::from_file(&path).map(Arc::new))
        .transpose()?;

        let project_id = resolve(
            ConfigKey::ProjectId,
            self.project_id.as_deref(),
            session,
            file,
            None,
        )
        .or_else(|| {
            service_account
                .as_ref()
                .and_then(|a| a.project_id().map(str::to_string))
        })
        .ok_or_else(|| Error::validation("project id could not be resolved"))?;

        let api_key = resolve(ConfigKey::ApiKey, self.api_key.as_deref(), session, file, None);

        let database_url = resolve(
            ConfigKey::DatabaseUrl,
            self.database_url.as_deref(),
            session,
            file,
            None,
        )
        .unwrap_or_else(|| format!("https://{}-default-rtdb.firebaseio.com", project_id))
        .trim_end_matches('/')
        .to_string();

        let storage_bucket = resolve(
            ConfigKey::StorageBucket,
            self.storage_bucket.as_deref(),
            session,
            file,
            None,
        )
        .unwrap_or_else(|| format!("{}.appspot.com", project_id));

        let links_domain = resolve(
            ConfigKey::LinksDomain,
            self.links_domain.as_deref(),
            session,
            file,
            None,
        );

        Ok(Connection {
            firestore_url: self.firestore_url.unwrap_or_else(|| {
                format!(
                    "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
                    project_id
                )
            }),
            storage_url: self.storage_url.unwrap_or_else(|| {
                format!(
                    "https://firebasestorage.googleapis.com/v0/b/{}",
                    storage_bucket
                )
            }),
            identity_url: self
                .identity_url
                .unwrap_or_else(|| "https://identitytoolkit.googleapis.com/v1".to_string()),
            secure_token_url: self
                .secure_token_url
                .unwrap_or_else(|| crate::credentials::SECURE_TOKEN_URL.to_string()),
            links_url: self
                .links_url
                .unwrap_or_else(|| "https://firebasedynamiclinks.googleapis.com/v1".to_string()),
            project_id,
            api_key,
            database_url,
            links_domain,
            service_account,
            token: None,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
