//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{BlobRef, Post, PostRecord, RecordRef, Session, SessionGrant};

/// Error type for post source operations
#[derive(Debug, Error)]
pub enum PostSourceError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Port for fetching posts from the upstream source
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch up to `limit` recent posts for an identity, newest first.
    /// Replies and reposts are already filtered out.
    async fn fetch_recent(&self, identity: &str, limit: usize)
    -> Result<Vec<Post>, PostSourceError>;

    /// Whether the source has the credentials it needs
    fn is_configured(&self) -> bool {
        true
    }
}

/// Error type for schedule source operations
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("HTTP {status}")]
    Status { status: u16 },
    #[error("Network error: {0}")]
    Network(String),
}

/// Port for fetching the raw schedule document
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_schedule_text(&self) -> Result<String, ScheduleError>;
}

/// Error type for media fetches
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("Network error: {0}")]
    Network(String),
}

/// Bytes fetched from a media URL
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    /// Content type as reported by the server, empty if absent
    pub content_type: String,
}

/// Port for downloading media by URL
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, MediaError>;
}

/// Error type for destination operations
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl DestinationError {
    /// Whether a fresh session and a second attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DestinationError::Auth(_)
                | DestinationError::Server { .. }
                | DestinationError::Network(_)
        )
    }
}

/// Account credentials for the destination
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.identifier.trim().is_empty() && !self.password.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Port for the destination social network
#[async_trait]
pub trait Destination: Send + Sync {
    /// Exchange credentials for a session
    async fn create_session(
        &self,
        credentials: &Credentials,
    ) -> Result<SessionGrant, DestinationError>;

    /// Upload raw bytes, returning a blob reference for embedding
    async fn upload_blob(
        &self,
        session: &Session,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<BlobRef, DestinationError>;

    /// Create a post record in the session's repo
    async fn create_record(
        &self,
        session: &Session,
        record: &PostRecord,
    ) -> Result<RecordRef, DestinationError>;
}

/// Error type for state store operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for persisting application state as string values under string keys
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get a value; expired entries read as absent
    async fn get(&self, key: &str) -> Result<Option<String>, StateError>;

    /// Insert or replace a value, optionally expiring after `ttl`
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StateError>;

    /// Remove a value; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<(), StateError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_destination_errors() {
        assert!(DestinationError::Auth("expired".into()).is_retryable());
        assert!(
            DestinationError::Server {
                status: 502,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(DestinationError::Network("reset".into()).is_retryable());
        assert!(
            !DestinationError::Rejected {
                status: 400,
                message: "InvalidRequest".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_credentials_completeness() {
        let creds = Credentials {
            identifier: "bot.bsky.social".to_string(),
            password: SecretString::new("app-password".into()),
        };
        assert!(creds.is_complete());

        let missing = Credentials {
            identifier: "bot.bsky.social".to_string(),
            password: SecretString::new("".into()),
        };
        assert!(!missing.is_complete());
    }
}
