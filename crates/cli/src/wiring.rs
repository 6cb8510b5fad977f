//! Builds adapters and use cases from configuration

use anyhow::{Context, Result};
use courtside_adapters::{
    bluesky::BlueskyClient,
    http::{HttpMediaFetcher, HttpScheduleSource, build_client},
    state::{InMemoryStateStore, SqliteStateStore},
    x_api::{RapidApiConfig, RapidApiPostSource},
};
use courtside_domain::{
    Credentials, StateStore, SystemClock,
    schedule::GameWindow,
    state::AppState,
    usecases::{
        MediaConfig, PollingConfig, PublishConfig, RenderConfig, RunLoop, RunLoopConfig,
        ScheduleConfig, ScheduleOracle,
    },
};
use reqwest::Client;
use secrecy::SecretString;
use std::sync::Arc;

use crate::config::AppConfig;

pub type AppRunLoop = RunLoop<
    RapidApiPostSource,
    HttpScheduleSource,
    BlueskyClient,
    HttpMediaFetcher,
    dyn StateStore,
    SystemClock,
>;

pub type AppScheduleOracle = ScheduleOracle<HttpScheduleSource, dyn StateStore>;

/// Read a secret from the named environment variable.
/// Returns `None` when the name is blank or the variable is unset or empty.
pub fn read_secret(env_var: &str) -> Option<SecretString> {
    if env_var.trim().is_empty() {
        return None;
    }

    std::env::var(env_var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(|value| SecretString::new(value.into()))
}

/// Like [`read_secret`], but a missing value becomes an empty secret so the
/// run loop can report it as a configuration error
fn secret_or_empty(env_var: &str, what: &str) -> SecretString {
    read_secret(env_var).unwrap_or_else(|| {
        tracing::warn!(env_var = %env_var, "{} is not set", what);
        SecretString::new("".into())
    })
}

pub fn http_client(config: &AppConfig) -> Result<Client> {
    build_client(
        &config.general.user_agent,
        std::time::Duration::from_secs(config.general.request_timeout_secs),
    )
    .context("Failed to build HTTP client")
}

pub async fn open_state_store(config: &AppConfig, memory: bool) -> Result<Arc<dyn StateStore>> {
    if memory {
        tracing::info!("Using in-memory state");
        return Ok(Arc::new(InMemoryStateStore::new()));
    }

    let store = SqliteStateStore::new(&config.general.state_db_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open state database: {}",
                config.general.state_db_path.display()
            )
        })?;
    Ok(Arc::new(store))
}

/// Config minutes as a duration, saturating instead of overflowing
fn minutes(value: i64) -> time::Duration {
    time::Duration::seconds(value.saturating_mul(60))
}

/// Config seconds as a session TTL that stays comparable with signed durations
fn session_ttl(secs: u64) -> std::time::Duration {
    std::time::Duration::from_secs(secs.min(i64::MAX as u64))
}

pub fn schedule_config(config: &AppConfig) -> ScheduleConfig {
    ScheduleConfig {
        timezone: config.schedule.timezone.clone(),
        cache_ttl: minutes(config.schedule.cache_ttl_mins),
    }
}

pub fn game_window(config: &AppConfig) -> GameWindow {
    GameWindow {
        before: minutes(config.polling.window_before_mins),
        after: minutes(config.polling.window_after_mins),
    }
}

pub fn run_loop_config(
    config: &AppConfig,
    dry_run: bool,
    credentials: Credentials,
) -> RunLoopConfig {
    RunLoopConfig {
        identity: config.source.identity.trim().trim_start_matches('@').to_string(),
        dry_run,
        credentials,
        polling: PollingConfig {
            baseline_interval: minutes(config.polling.baseline_interval_mins),
            game_interval: minutes(config.polling.game_interval_mins),
            window: game_window(config),
            fetch_limit: config.source.fetch_limit,
            max_posts_per_run: config.polling.max_posts_per_run,
            first_run: config.polling.first_run,
        },
        schedule: schedule_config(config),
        publish: PublishConfig {
            session_ttl: session_ttl(config.bluesky.session_ttl_secs),
            media: MediaConfig {
                max_count: config.bluesky.max_images,
                max_bytes: config.bluesky.max_image_bytes,
            },
        },
        render: RenderConfig {
            max_chars: config.bluesky.max_chars,
        },
    }
}

pub fn schedule_oracle(
    config: &AppConfig,
    client: Client,
    store: Arc<dyn StateStore>,
) -> AppScheduleOracle {
    let source = Arc::new(HttpScheduleSource::new(client, config.schedule.url.clone()));
    ScheduleOracle::new(source, AppState::new(store), schedule_config(config))
}

pub fn build_run_loop(
    config: &AppConfig,
    store: Arc<dyn StateStore>,
    dry_run: bool,
) -> Result<AppRunLoop> {
    let client = http_client(config)?;

    let api_key = secret_or_empty(&config.source.api_key_env, "RapidAPI key");
    let host = config.source.rapidapi_host.clone();
    let source = RapidApiPostSource::new(
        client.clone(),
        api_key,
        RapidApiConfig {
            base_url: config
                .source
                .base_url
                .clone()
                .unwrap_or_else(|| format!("https://{}", host)),
            host,
            list_id: config.source.list_id.clone(),
        },
    );

    let password = if dry_run {
        read_secret(&config.bluesky.password_env).unwrap_or_else(|| SecretString::new("".into()))
    } else {
        secret_or_empty(&config.bluesky.password_env, "Bluesky app password")
    };
    let credentials = Credentials {
        identifier: config.bluesky.identifier.clone(),
        password,
    };

    let schedule_source = HttpScheduleSource::new(client.clone(), config.schedule.url.clone());
    let destination = BlueskyClient::new(client.clone(), config.bluesky.service_url.clone());
    let media_fetcher = HttpMediaFetcher::new(client);

    Ok(RunLoop::new(
        Arc::new(source),
        Arc::new(schedule_source),
        Arc::new(destination),
        Arc::new(media_fetcher),
        store,
        Arc::new(SystemClock),
        run_loop_config(config, dry_run, credentials),
    ))
}
