//! Short-link generation.

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::transport::{ApiRequest, CredentialMode, Transport};

/// Suffix style for generated short links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuffixOption {
    #[default]
    Short,
    Unguessable,
}

impl SuffixOption {
    const fn wire_name(&self) -> &'static str {
        match self {
            Self::Short => "SHORT",
            Self::Unguessable => "UNGUESSABLE",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    pub short_link: String,
    #[serde(default)]
    pub preview_link: Option<String>,
}

/// Short-link client.
#[derive(Debug, Clone)]
pub struct Links {
    transport: Transport,
    conn: Connection,
}

impl Links {
    pub fn new(transport: Transport, conn: Connection) -> Self {
        Self { transport, conn }
    }

    /// Shorten a fully-formed long link.
    pub async fn shorten_long_link(
        &self,
        long_link: &str,
        suffix: SuffixOption,
    ) -> Result<ShortLink> {
        let api_key = self
            .conn
            .api_key()
            .map(str::to_string)
            .ok_or_else(|| Error::validation("link shortening requires an api key"))?;

        let url = format!("{}/shortLinks", self.conn.links_url());
        let req = ApiRequest::new("shorten_link", Method::POST, url)
            .json(json!({
                "longDynamicLink": long_link,
                "suffix": {"option": suffix.wire_name()}
            }))
            .credential(Some(api_key), CredentialMode::QueryParam("key"));

        let link: ShortLink = serde_json::from_value(self.transport.request(req).await?)?;
        info!(short = %link.short_link, "shortened link");
        Ok(link)
    }

    /// Shorten a target URL using the connection's configured link domain.
    pub async fn shorten(&self, target_url: &str, suffix: SuffixOption) -> Result<ShortLink> {
        let domain = self
            .conn
            .links_domain()
            .ok_or_else(|| Error::validation("link shortening requires a links domain"))?;

        let long_link = format!("https://{}/?link={}", domain, urlencoding::encode(target_url));
        self.shorten_long_link(&long_link, suffix).await
    }
}
