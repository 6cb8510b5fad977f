//! Watch command - tick until Ctrl-C, letting the run loop decide when to poll

use anyhow::Result;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

use crate::args::WatchArgs;
use crate::commands::GlobalOpts;
use crate::config::AppConfig;
use crate::wiring::{build_run_loop, open_state_store};

pub async fn execute(args: WatchArgs, global: GlobalOpts) -> Result<()> {
    let config = AppConfig::load(global.config_path.as_deref())?;
    let dry_run = args.dry_run || config.general.dry_run;
    let tick_secs = args
        .tick_secs
        .unwrap_or(config.general.tick_interval_secs)
        .max(1);

    let store = open_state_store(&config, global.memory_state).await?;
    let run_loop = build_run_loop(&config, store, dry_run)?;

    tracing::info!(
        dry_run = dry_run,
        identity = %config.source.identity,
        tick_secs,
        "Starting courtside watch"
    );

    let mut ticker = interval(Duration::from_secs(tick_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match run_loop.run_once().await {
                    Ok(report) if report.skipped.is_some() => {
                        tracing::debug!(skipped = ?report.skipped, mode = ?report.mode, "Tick skipped");
                    }
                    Ok(report) => {
                        tracing::info!(
                            mode = ?report.mode,
                            published = report.published.len(),
                            pending = report.pending.len(),
                            ok = report.ok,
                            "Tick complete"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Poll cycle failed");
                    }
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }

    tracing::info!("courtside watch stopped");
    Ok(())
}
