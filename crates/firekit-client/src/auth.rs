//! Identity endpoints: email/password and anonymous sign-in.
//!
//! These endpoints want the api key as a `key` query parameter. Credential
//! failures (bad password, disabled user, existing email, ...) come back as
//! `Error::Auth` from the transport's envelope translation.

use std::time::Duration;

use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::connection::Connection;
use crate::credentials::{refresh_user_token, RefreshMaterial, Token};
use crate::error::{Error, Result};
use crate::transport::{ApiRequest, CredentialMode, Transport};

/// A signed-in user session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub id_token: String,
    pub refresh_token: String,
    /// Declared lifetime in seconds (the endpoint stringifies it).
    pub expires_in: String,
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthSession {
    /// Lifetime as a duration, defaulting to an hour when unparseable.
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.expires_in.parse().unwrap_or(3600))
    }

    /// Turn the session into a bearer token that refreshes itself at the
    /// given secure-token endpoint.
    pub fn into_token(self, api_key: &str, token_url: &str) -> Token {
        let lifetime = self.lifetime();
        Token::new(
            self.id_token,
            Utc::now(),
            lifetime,
            Some(RefreshMaterial::RefreshToken {
                refresh_token: self.refresh_token,
                api_key: api_key.to_string(),
                token_url: token_url.to_string(),
            }),
        )
    }
}

/// Identity client.
#[derive(Debug, Clone)]
pub struct Auth {
    transport: Transport,
    conn: Connection,
}

impl Auth {
    pub fn new(transport: Transport, conn: Connection) -> Self {
        Self { transport, conn }
    }

    fn api_key(&self) -> Result<String> {
        self.conn
            .api_key()
            .map(str::to_string)
            .ok_or_else(|| Error::validation("identity operations require an api key"))
    }

    async fn account_call(
        &self,
        operation: &'static str,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<AuthSession> {
        let url = format!("{}/accounts:{}", self.conn.identity_url(), endpoint);
        let req = ApiRequest::new(operation, Method::POST, url)
            .json(body)
            .credential(Some(self.api_key()?), CredentialMode::QueryParam("key"));

        let session: AuthSession = serde_json::from_value(self.transport.request(req).await?)?;
        info!(user = %session.local_id, "signed in");
        Ok(session)
    }

    /// Create an email/password account and sign it in.
    pub async fn sign_up_email(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.account_call(
            "sign_up",
            "signUp",
            json!({"email": email, "password": password, "returnSecureToken": true}),
        )
        .await
    }

    /// Sign in with email and password.
    pub async fn sign_in_email(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.account_call(
            "sign_in",
            "signInWithPassword",
            json!({"email": email, "password": password, "returnSecureToken": true}),
        )
        .await
    }

    /// Sign in anonymously.
    pub async fn sign_in_anonymous(&self) -> Result<AuthSession> {
        self.account_call("sign_in_anonymous", "signUp", json!({"returnSecureToken": true}))
            .await
    }

    /// Exchange a refresh token for a fresh id token at the secure-token
    /// endpoint.
    pub async fn refresh_id_token(&self, refresh_token: &str) -> Result<Token> {
        let api_key = self.api_key()?;
        refresh_user_token(
            &self.transport,
            self.conn.secure_token_url(),
            refresh_token,
            &api_key,
        )
        .await
    }

    /// A connection carrying the session's token, for the other services.
    pub fn authorized_connection(&self, session: AuthSession) -> Result<Connection> {
        let api_key = self.api_key()?;
        let token = session.into_token(&api_key, self.conn.secure_token_url());
        Ok(self.conn.with_token(token))
    }
}

// =============================================================================
// Tests
// =============================================================================
