//! Configuration loading and management

use anyhow::{Context, Result};
use courtside_adapters::{
    bluesky::DEFAULT_SERVICE_URL,
    http::DEFAULT_SCHEDULE_URL,
    x_api::DEFAULT_RAPIDAPI_HOST,
};
use courtside_domain::FirstRunPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub schedule: ScheduleSection,

    #[serde(default)]
    pub polling: PollingSection,

    #[serde(default)]
    pub bluesky: BlueskyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_db_path")]
    pub state_db_path: PathBuf,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Account handle to mirror, without the leading @
    #[serde(default)]
    pub identity: String,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_rapidapi_host")]
    pub rapidapi_host: String,

    /// Defaults to `https://<rapidapi_host>`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Read this list's timeline instead of the account's own
    #[serde(default)]
    pub list_id: Option<String>,

    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSection {
    #[serde(default = "default_schedule_url")]
    pub url: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_schedule_cache_ttl")]
    pub cache_ttl_mins: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSection {
    #[serde(default = "default_baseline_interval")]
    pub baseline_interval_mins: i64,

    #[serde(default = "default_game_interval")]
    pub game_interval_mins: i64,

    #[serde(default = "default_window_before")]
    pub window_before_mins: i64,

    #[serde(default = "default_window_after")]
    pub window_after_mins: i64,

    #[serde(default = "default_max_posts_per_run")]
    pub max_posts_per_run: usize,

    #[serde(default)]
    pub first_run: FirstRunPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Handle or email used to log in
    #[serde(default)]
    pub identifier: String,

    #[serde(default = "default_password_env")]
    pub password_env: String,

    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default = "default_max_images")]
    pub max_images: usize,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

// Default value functions
fn default_state_db_path() -> PathBuf {
    PathBuf::from("./courtside.sqlite")
}

fn default_request_timeout() -> u64 {
    30
}

fn default_tick_interval() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("courtside/{}", env!("CARGO_PKG_VERSION"))
}

fn default_api_key_env() -> String {
    "RAPIDAPI_KEY".to_string()
}

fn default_rapidapi_host() -> String {
    DEFAULT_RAPIDAPI_HOST.to_string()
}

fn default_fetch_limit() -> usize {
    10
}

fn default_schedule_url() -> String {
    DEFAULT_SCHEDULE_URL.to_string()
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_schedule_cache_ttl() -> i64 {
    360
}

fn default_baseline_interval() -> i64 {
    60
}

fn default_game_interval() -> i64 {
    5
}

fn default_window_before() -> i64 {
    90
}

fn default_window_after() -> i64 {
    210
}

fn default_max_posts_per_run() -> usize {
    3
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

fn default_password_env() -> String {
    "BLUESKY_APP_PASSWORD".to_string()
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_max_chars() -> usize {
    300
}

fn default_max_images() -> usize {
    4
}

fn default_max_image_bytes() -> usize {
    1_000_000
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_db_path: default_state_db_path(),
            dry_run: false,
            request_timeout_secs: default_request_timeout(),
            tick_interval_secs: default_tick_interval(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            identity: String::new(),
            api_key_env: default_api_key_env(),
            rapidapi_host: default_rapidapi_host(),
            base_url: None,
            list_id: None,
            fetch_limit: default_fetch_limit(),
        }
    }
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            url: default_schedule_url(),
            timezone: default_timezone(),
            cache_ttl_mins: default_schedule_cache_ttl(),
        }
    }
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            baseline_interval_mins: default_baseline_interval(),
            game_interval_mins: default_game_interval(),
            window_before_mins: default_window_before(),
            window_after_mins: default_window_after(),
            max_posts_per_run: default_max_posts_per_run(),
            first_run: FirstRunPolicy::default(),
        }
    }
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            identifier: String::new(),
            password_env: default_password_env(),
            session_ttl_secs: default_session_ttl(),
            max_chars: default_max_chars(),
            max_images: default_max_images(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // COURTSIDE__SOURCE__IDENTITY=DukeMBB etc.
        builder = builder.add_source(
            config::Environment::with_prefix("COURTSIDE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        format!(
            r#"# courtside configuration
#
# Secrets never go in this file: `source.api_key_env` and
# `bluesky.password_env` name the environment variables that hold them.

[general]
state_db_path = "./courtside.sqlite"
dry_run = false
request_timeout_secs = 30
# Tick of `courtside watch`; the polling intervals below decide whether a tick polls
tick_interval_secs = 60

[source]
identity = "DukeMBB"
api_key_env = "RAPIDAPI_KEY"
rapidapi_host = "{rapidapi_host}"
# list_id = "1234567890"
fetch_limit = 10

[schedule]
url = "{schedule_url}"
timezone = "America/New_York"
cache_ttl_mins = 360

[polling]
baseline_interval_mins = 60
game_interval_mins = 5
window_before_mins = 90
window_after_mins = 210
max_posts_per_run = 3
first_run = "newest"  # newest, all

[bluesky]
service_url = "{service_url}"
identifier = "your-handle.bsky.social"
password_env = "BLUESKY_APP_PASSWORD"
session_ttl_secs = 3600
max_chars = 300
max_images = 4
max_image_bytes = 1000000
"#,
            rapidapi_host = DEFAULT_RAPIDAPI_HOST,
            schedule_url = DEFAULT_SCHEDULE_URL,
            service_url = DEFAULT_SERVICE_URL,
        )
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
