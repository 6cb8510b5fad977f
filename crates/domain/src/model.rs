//! Domain models and value objects

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A post fetched from the upstream source (e.g., X/Twitter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Source-assigned post ID
    pub id: String,
    /// Post text with entities decoded and links expanded
    pub text: String,
    /// URL to the original post
    pub url: String,
    /// Creation time exactly as reported by the source
    pub timestamp_source: String,
    /// Image URLs, in source order
    #[serde(default)]
    pub images: Vec<String>,
    /// Video URLs, in source order
    #[serde(default)]
    pub videos: Vec<String>,
    /// Alt text aligned by index with `images`
    #[serde(default)]
    pub alt_text: Vec<String>,
}

/// Polling mode derived from the game schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollMode {
    /// Default, low-frequency polling
    Baseline,
    /// Inside a game window, high-frequency polling
    Game,
}

impl std::fmt::Display for PollMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollMode::Baseline => f.write_str("baseline"),
            PollMode::Game => f.write_str("game"),
        }
    }
}

/// Orchestrator rate-limiting state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollState {
    /// When the last successful poll cycle started
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_poll_at: Option<OffsetDateTime>,
    /// Mode of the last successful poll cycle
    #[serde(default)]
    pub last_mode: Option<PollMode>,
}

/// Cached schedule of game start instants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCache {
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
    /// Game start times as absolute UTC instants
    #[serde(with = "rfc3339_vec")]
    pub games: Vec<OffsetDateTime>,
}

/// An authenticated destination session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_jwt: String,
    /// Account identifier (DID) used as the record repo
    pub did: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_jwt", &"[redacted]")
            .field("did", &self.did)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Credentials returned by a session exchange, before the domain stamps them
#[derive(Clone)]
pub struct SessionGrant {
    pub access_jwt: String,
    pub did: String,
}

/// Opaque blob reference returned by the destination; sent back verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(pub serde_json::Value);

/// An uploaded image ready to be embedded
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMedia {
    pub blob: BlobRef,
    pub alt_text: String,
}

/// A byte-range annotation marking a link in post text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFacet {
    /// UTF-8 byte offset of the first byte of the link
    pub byte_start: usize,
    /// UTF-8 byte offset one past the last byte of the link
    pub byte_end: usize,
    pub uri: String,
}

/// Attachment on a destination post
#[derive(Debug, Clone, PartialEq)]
pub enum Embed {
    /// Image gallery of uploaded blobs
    Images(Vec<UploadedMedia>),
    /// External link card; the destination fetches the target lazily
    External {
        uri: String,
        title: String,
        description: String,
    },
}

/// A post record as submitted to the destination
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub text: String,
    pub facets: Vec<LinkFacet>,
    pub embed: Option<Embed>,
    pub created_at: OffsetDateTime,
}

/// Reference to a created destination record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRef {
    pub uri: String,
}

/// Sanitized content ready for publishing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPost {
    /// Reference to the original post
    pub source_post_id: String,
    pub source_url: String,
    /// Destination-safe text
    pub text: String,
    pub facets: Vec<LinkFacet>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub alt_text: Vec<String>,
}

/// What to do when no cursor has been persisted yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstRunPolicy {
    /// Mirror only the newest fetched post
    #[default]
    Newest,
    /// Mirror everything fetched (still capped per run)
    All,
}

/// Why an invocation did not poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    IntervalNotReached,
    RunInProgress,
}

/// Result of a single orchestrator invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Absent when the run was skipped before the mode was determined
    pub mode: Option<PollMode>,
    pub dry_run: bool,
    /// Set when the invocation did not poll at all
    pub skipped: Option<SkipReason>,
    /// False when a publish failed and the cycle must be retried
    pub ok: bool,
    /// Source post IDs published in this run, oldest first
    pub published: Vec<String>,
    /// Source post IDs left for a later run
    pub pending: Vec<String>,
    /// The persisted cursor was not in the fetched window
    pub cursor_stale: bool,
    /// Cursor value after the run
    pub cursor: Option<String>,
}

impl RunReport {
    pub fn new(mode: PollMode, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode: Some(mode),
            dry_run,
            skipped: None,
            ok: true,
            published: vec![],
            pending: vec![],
            cursor_stale: false,
            cursor: None,
        }
    }

    pub fn skipped(mode: Option<PollMode>, dry_run: bool, reason: SkipReason) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            dry_run,
            skipped: Some(reason),
            ok: true,
            published: vec![],
            pending: vec![],
            cursor_stale: false,
            cursor: None,
        }
    }
}

/// Would-be result of a dry run, persisted for inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryRunReport {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub mode: PollMode,
    pub cursor: Option<String>,
    pub cursor_stale: bool,
    pub posts: Vec<RenderedPost>,
}

mod rfc3339_vec {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    pub fn serialize<S: Serializer>(
        values: &[OffsetDateTime],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let formatted = values
            .iter()
            .map(|v| v.format(&Rfc3339))
            .collect::<Result<Vec<_>, _>>()
            .map_err(S::Error::custom)?;
        serializer.collect_seq(formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<OffsetDateTime>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| OffsetDateTime::parse(s, &Rfc3339).map_err(D::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_schedule_cache_persists_utc_instants() {
        let cache = ScheduleCache {
            fetched_at: datetime!(2025-11-01 12:00 UTC),
            games: vec![datetime!(2025-11-11 00:00 UTC)],
        };

        let json = serde_json::to_value(&cache).unwrap();
        assert_eq!(json["games"][0], "2025-11-11T00:00:00Z");

        let back: ScheduleCache = serde_json::from_value(json).unwrap();
        assert_eq!(back, cache);
    }

    #[test]
    fn test_poll_state_defaults_when_fields_missing() {
        let state: PollState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, PollState::default());
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session {
            access_jwt: "secret-jwt".to_string(),
            did: "did:plc:abc".to_string(),
            created_at: datetime!(2025-11-01 12:00 UTC),
        };
        let debug = format!("{:?}", session);
        assert!(!debug.contains("secret-jwt"));
        assert!(debug.contains("did:plc:abc"));
    }
}
