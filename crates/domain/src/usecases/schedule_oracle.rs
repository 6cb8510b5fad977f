//! Schedule oracle - game start instants, cached in the state store

use std::sync::Arc;
use time::{Duration, OffsetDateTime};

use crate::model::ScheduleCache;
use crate::ports::{ScheduleSource, StateStore};
use crate::schedule::parse_schedule;
use crate::state::AppState;

/// Configuration for schedule lookups
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// IANA zone the schedule's wall-clock times are written in
    pub timezone: String,
    /// How long a fetched schedule stays fresh
    pub cache_ttl: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            cache_ttl: Duration::minutes(360),
        }
    }
}

/// Answers "when are the games?" without ever failing the caller
pub struct ScheduleOracle<Sch, St>
where
    Sch: ScheduleSource + ?Sized,
    St: StateStore + ?Sized,
{
    source: Arc<Sch>,
    state: AppState<St>,
    config: ScheduleConfig,
}

impl<Sch, St> ScheduleOracle<Sch, St>
where
    Sch: ScheduleSource + ?Sized,
    St: StateStore + ?Sized,
{
    pub fn new(source: Arc<Sch>, state: AppState<St>, config: ScheduleConfig) -> Self {
        Self {
            source,
            state,
            config,
        }
    }

    /// Game start instants, served from cache while fresh.
    ///
    /// Fetch or parse failures degrade to an empty list, which keeps the
    /// caller in baseline mode.
    pub async fn upcoming_game_instants(&self, now: OffsetDateTime) -> Vec<OffsetDateTime> {
        match self.state.schedule_cache().await {
            Ok(Some(cache)) if now - cache.fetched_at < self.config.cache_ttl => {
                tracing::debug!(games = cache.games.len(), "Using cached schedule");
                return cache.games;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable schedule cache, refetching");
            }
        }

        let text = match self.source.fetch_schedule_text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Schedule fetch failed, assuming no games");
                return vec![];
            }
        };

        let games = match parse_schedule(&text, &self.config.timezone, now) {
            Ok(games) => games,
            Err(e) => {
                tracing::error!(error = %e, "Cannot resolve schedule times, assuming no games");
                return vec![];
            }
        };

        tracing::info!(games = games.len(), "Fetched schedule");

        let cache = ScheduleCache {
            fetched_at: now,
            games: games.clone(),
        };
        if let Err(e) = self.state.set_schedule_cache(&cache).await {
            tracing::warn!(error = %e, "Failed to cache schedule");
        }

        games
    }
}
