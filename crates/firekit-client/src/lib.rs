//! REST client for Firebase-style backend services.
//!
//! This crate provides:
//! - A shared transport with credential injection, bounded retry with
//!   backoff, and typed error translation
//! - Credential resolution across explicit arguments, session state,
//!   environment, and a config file
//! - Service-account and user token minting with lazy refresh
//! - A structured query builder for the document store
//! - Thin clients for the document store, JSON tree store, identity,
//!   blob storage, and short links

pub mod auth;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod database;
pub mod error;
pub mod firestore;
pub mod links;
pub mod metrics;
pub mod query;
pub mod retry;
pub mod session;
pub mod storage;
pub mod transport;

pub use auth::{Auth, AuthSession};
pub use config::{resolve, ConfigKey, UNSET};
pub use connection::{Connection, ConnectionBuilder};
pub use credentials::{RefreshMaterial, ServiceAccount, Token, TOKEN_SAFETY_MARGIN};
pub use database::{clean_path, Database};
pub use error::{Error, Result, ServiceFault};
pub use firestore::Firestore;
pub use links::{Links, ShortLink, SuffixOption};
pub use query::QueryBuilder;
pub use retry::{backoff_delay, RetryConfig};
pub use session::{ConfigFile, SessionStore};
pub use storage::Storage;
pub use transport::{ApiRequest, CredentialMode, RequestBody, Transport, TransportConfig};
