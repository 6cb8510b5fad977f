//! Run loop use case - orchestrates one adaptive poll cycle

use secrecy::SecretString;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use crate::{
    cursor::{NewPosts, advances, compute_new},
    model::{
        DryRunReport, FirstRunPolicy, PollMode, PollState, Post, RenderedPost, RunReport,
        SkipReason,
    },
    ports::{Clock, Credentials, Destination, MediaFetcher, PostSource, ScheduleSource, StateStore},
    schedule::GameWindow,
    state::AppState,
    usecases::{
        publish::{CrossPoster, PublishConfig, PublishOutcome},
        render::{RenderConfig, Renderer},
        schedule_oracle::{ScheduleConfig, ScheduleOracle},
    },
};

/// Polling cadence and batch limits
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub baseline_interval: Duration,
    pub game_interval: Duration,
    pub window: GameWindow,
    /// Posts requested from the source per poll
    pub fetch_limit: usize,
    /// New posts published per poll; the rest wait for the next one
    pub max_posts_per_run: usize,
    pub first_run: FirstRunPolicy,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            baseline_interval: Duration::minutes(60),
            game_interval: Duration::minutes(5),
            window: GameWindow::default(),
            fetch_limit: 10,
            max_posts_per_run: 3,
            first_run: FirstRunPolicy::default(),
        }
    }
}

impl PollingConfig {
    pub fn interval_for(&self, mode: PollMode) -> Duration {
        match mode {
            PollMode::Baseline => self.baseline_interval,
            PollMode::Game => self.game_interval,
        }
    }
}

/// Configuration for the run loop
#[derive(Debug, Clone)]
pub struct RunLoopConfig {
    /// Source account to mirror
    pub identity: String,
    /// Dry run mode (render and report, never publish)
    pub dry_run: bool,
    pub credentials: Credentials,
    pub polling: PollingConfig,
    pub schedule: ScheduleConfig,
    pub publish: PublishConfig,
    pub render: RenderConfig,
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            identity: String::new(),
            dry_run: false,
            credentials: Credentials {
                identifier: String::new(),
                password: SecretString::new("".into()),
            },
            polling: PollingConfig::default(),
            schedule: ScheduleConfig::default(),
            publish: PublishConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

/// Whether a poll is due: always on a mode change, otherwise once the
/// mode's interval has elapsed since the last successful poll
pub fn should_poll(
    state: &PollState,
    mode: PollMode,
    now: OffsetDateTime,
    interval: Duration,
) -> bool {
    if state.last_mode != Some(mode) {
        return true;
    }
    match state.last_poll_at {
        Some(last) => now - last >= interval,
        None => true,
    }
}

/// Run loop orchestrator
pub struct RunLoop<S, Sch, D, M, St, Cl>
where
    S: PostSource + ?Sized,
    Sch: ScheduleSource + ?Sized,
    D: Destination + ?Sized,
    M: MediaFetcher + ?Sized,
    St: StateStore + ?Sized,
    Cl: Clock + ?Sized,
{
    source: Arc<S>,
    state: AppState<St>,
    oracle: ScheduleOracle<Sch, St>,
    publisher: CrossPoster<D, M, St, Cl>,
    renderer: Renderer,
    clock: Arc<Cl>,
    config: RunLoopConfig,
    in_flight: Mutex<()>,
}

impl<S, Sch, D, M, St, Cl> RunLoop<S, Sch, D, M, St, Cl>
where
    S: PostSource + ?Sized,
    Sch: ScheduleSource + ?Sized,
    D: Destination + ?Sized,
    M: MediaFetcher + ?Sized,
    St: StateStore + ?Sized,
    Cl: Clock + ?Sized,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<S>,
        schedule_source: Arc<Sch>,
        destination: Arc<D>,
        media_fetcher: Arc<M>,
        state_store: Arc<St>,
        clock: Arc<Cl>,
        config: RunLoopConfig,
    ) -> Self {
        let state = AppState::new(state_store);
        let oracle = ScheduleOracle::new(schedule_source, state.clone(), config.schedule.clone());
        let publisher = CrossPoster::new(
            destination,
            media_fetcher,
            state.clone(),
            Arc::clone(&clock),
            config.credentials.clone(),
            config.publish.clone(),
        );
        let renderer = Renderer::new(config.render.clone());
        Self {
            source,
            state,
            oracle,
            publisher,
            renderer,
            clock,
            config,
            in_flight: Mutex::new(()),
        }
    }

    /// Run one invocation: decide the mode, gate on the interval, then poll
    pub async fn run_once(&self) -> Result<RunReport, RunLoopError> {
        self.validate()?;

        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::warn!("Poll cycle already in progress, skipping");
            return Ok(RunReport::skipped(
                None,
                self.config.dry_run,
                SkipReason::RunInProgress,
            ));
        };

        let now = self.clock.now();
        let games = self.oracle.upcoming_game_instants(now).await;
        let mode = self.config.polling.window.mode_at(&games, now);

        if self.config.dry_run {
            return self.dry_run(mode, now).await;
        }

        let poll_state = self.state.poll_state().await.map_err(state_error)?;
        let interval = self.config.polling.interval_for(mode);
        if !should_poll(&poll_state, mode, now, interval) {
            tracing::debug!(
                mode = %mode,
                last_poll_at = ?poll_state.last_poll_at,
                "Interval not reached, skipping"
            );
            return Ok(RunReport::skipped(
                Some(mode),
                false,
                SkipReason::IntervalNotReached,
            ));
        }

        tracing::info!(mode = %mode, "Starting poll cycle");

        let mut report = RunReport::new(mode, false);
        let batch = self.collect_new(&mut report).await?;
        self.publish_batch(&batch, &mut report).await?;

        if report.ok {
            let poll_state = PollState {
                last_poll_at: Some(now),
                last_mode: Some(mode),
            };
            self.state
                .set_poll_state(&poll_state)
                .await
                .map_err(state_error)?;
        } else {
            tracing::error!(
                published = report.published.len(),
                pending = report.pending.len(),
                "Poll cycle failed, will retry on the next invocation"
            );
        }

        tracing::info!(
            mode = %mode,
            published = report.published.len(),
            pending = report.pending.len(),
            ok = report.ok,
            "Poll cycle finished"
        );

        Ok(report)
    }

    /// Missing configuration fails the run before any state is touched
    fn validate(&self) -> Result<(), RunLoopError> {
        if self.config.identity.trim().is_empty() {
            return Err(RunLoopError::Config("source identity is not set".to_string()));
        }
        if !self.source.is_configured() {
            return Err(RunLoopError::Config("source API key is not set".to_string()));
        }
        if !self.config.dry_run && !self.config.credentials.is_complete() {
            return Err(RunLoopError::Config(
                "destination credentials are not set".to_string(),
            ));
        }
        Ok(())
    }

    /// Fetch, order oldest first, and cut the batch for this run.
    /// Posts beyond the per-run cap are recorded as pending.
    async fn collect_new(&self, report: &mut RunReport) -> Result<Vec<Post>, RunLoopError> {
        let polling = &self.config.polling;

        let fetched = match self
            .source
            .fetch_recent(&self.config.identity, polling.fetch_limit)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(error = %e, "Source fetch failed, treating as empty");
                vec![]
            }
        };

        let cursor = self.state.cursor().await.map_err(state_error)?;
        report.cursor = cursor.clone();

        if fetched.is_empty() {
            tracing::debug!("No posts fetched");
            return Ok(vec![]);
        }

        let mut chronological = fetched;
        chronological.reverse();

        let mut batch = match compute_new(&chronological, cursor.as_deref(), polling.first_run) {
            NewPosts::Fresh(posts) => posts,
            NewPosts::Stale => {
                tracing::warn!(
                    cursor = ?cursor,
                    fetched = chronological.len(),
                    "Cursor not in fetched window, skipping to avoid duplicates"
                );
                report.cursor_stale = true;
                return Ok(vec![]);
            }
        };

        let cap = polling.max_posts_per_run;
        if batch.len() > cap {
            report.pending = batch.split_off(cap).into_iter().map(|p| p.id).collect();
        }

        tracing::info!(
            fetched = chronological.len(),
            batch = batch.len(),
            deferred = report.pending.len(),
            "Selected new posts"
        );

        Ok(batch)
    }

    /// Publish oldest first, stopping at the first failure.
    /// The cursor follows each confirmed success.
    async fn publish_batch(
        &self,
        batch: &[Post],
        report: &mut RunReport,
    ) -> Result<(), RunLoopError> {
        for (index, post) in batch.iter().enumerate() {
            let rendered = self.renderer.render(post);

            if let PublishOutcome::Failed { reason } = self.publisher.publish(&rendered).await {
                tracing::error!(post_id = %post.id, reason = %reason, "Publish failed, halting batch");
                report.ok = false;
                let mut pending: Vec<String> =
                    batch[index..].iter().map(|p| p.id.clone()).collect();
                pending.append(&mut report.pending);
                report.pending = pending;
                break;
            }

            report.published.push(post.id.clone());
            self.advance_cursor(&post.id, report).await?;
        }
        Ok(())
    }

    async fn advance_cursor(&self, id: &str, report: &mut RunReport) -> Result<(), RunLoopError> {
        if !advances(report.cursor.as_deref(), id) {
            tracing::warn!(cursor = ?report.cursor, candidate = %id, "Refusing to move cursor backwards");
            return Ok(());
        }
        self.state.set_cursor(id).await.map_err(|e| {
            tracing::error!(post_id = %id, error = %e, "Published but failed to persist cursor");
            state_error(e)
        })?;
        report.cursor = Some(id.to_string());
        Ok(())
    }

    /// Render what would be published and persist it for inspection
    async fn dry_run(&self, mode: PollMode, now: OffsetDateTime) -> Result<RunReport, RunLoopError> {
        tracing::info!(mode = %mode, "Starting dry run");

        let mut report = RunReport::new(mode, true);
        let batch = self.collect_new(&mut report).await?;
        let posts: Vec<RenderedPost> = batch.iter().map(|p| self.renderer.render(p)).collect();

        for post in &posts {
            tracing::info!(
                post_id = %post.source_post_id,
                rendered_text = %post.text,
                images = post.images.len(),
                videos = post.videos.len(),
                "[DRY RUN] Would publish"
            );
        }

        let mut pending: Vec<String> = posts.iter().map(|p| p.source_post_id.clone()).collect();
        pending.append(&mut report.pending);
        report.pending = pending;

        let dry_run = DryRunReport {
            generated_at: now,
            mode,
            cursor: report.cursor.clone(),
            cursor_stale: report.cursor_stale,
            posts,
        };
        self.state
            .set_dry_run_report(&dry_run)
            .await
            .map_err(state_error)?;

        Ok(report)
    }
}

fn state_error(e: crate::ports::StateError) -> RunLoopError {
    RunLoopError::State(e.to_string())
}

/// Errors from the run loop
#[derive(Debug, thiserror::Error)]
pub enum RunLoopError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("State error: {0}")]
    State(String),
}
