//! Configuration keys and the credential resolution cascade.

use crate::session::{ConfigFile, SessionStore};

/// Marker an interactive caller passes to mean "no explicit value".
pub const UNSET: &str = "unset";

/// Well-known configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ProjectId,
    ApiKey,
    DatabaseUrl,
    StorageBucket,
    LinksDomain,
    ServiceAccount,
}

impl ConfigKey {
    /// Fixed key→environment-variable table.
    pub const fn env_var(&self) -> &'static str {
        match self {
            Self::ProjectId => "FIREKIT_PROJECT_ID",
            Self::ApiKey => "FIREKIT_API_KEY",
            Self::DatabaseUrl => "FIREKIT_DATABASE_URL",
            Self::StorageBucket => "FIREKIT_STORAGE_BUCKET",
            Self::LinksDomain => "FIREKIT_LINKS_DOMAIN",
            Self::ServiceAccount => "GOOGLE_APPLICATION_CREDENTIALS",
        }
    }

    /// Key name inside a config-file profile.
    pub const fn file_key(&self) -> &'static str {
        match self {
            Self::ProjectId => "project_id",
            Self::ApiKey => "api_key",
            Self::DatabaseUrl => "database_url",
            Self::StorageBucket => "storage_bucket",
            Self::LinksDomain => "links_domain",
            Self::ServiceAccount => "service_account",
        }
    }
}

/// Resolve a configuration value. First non-empty source wins:
/// explicit argument, session store, environment, config file, caller default.
///
/// Read-only cascade; absence at every level yields the default (or `None`).
pub fn resolve(
    key: ConfigKey,
    explicit: Option<&str>,
    session: &SessionStore,
    config_file: Option<&ConfigFile>,
    default: Option<&str>,
) -> Option<String> {
    if let Some(value) = explicit {
        if !value.is_empty() && value != UNSET {
            return Some(value.to_string());
        }
    }

    if let Some(value) = session.get(key) {
        if !value.is_empty() {
            return Some(value);
        }
    }

    if let Ok(value) = std::env::var(key.env_var()) {
        if !value.is_empty() {
            return Some(value);
        }
    }

    if let Some(file) = config_file {
        if let Some(value) = file.lookup(key) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    default.map(str::to_string)
}

// =============================================================================
// Tests
// =============================================================================
