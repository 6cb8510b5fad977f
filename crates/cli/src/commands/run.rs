//! Run command - one poll cycle, report printed as JSON

use anyhow::{Context, Result, bail};
use courtside_domain::RunReport;

use crate::args::RunArgs;
use crate::commands::GlobalOpts;
use crate::config::AppConfig;
use crate::wiring::{build_run_loop, open_state_store};

pub async fn execute(args: RunArgs, global: GlobalOpts) -> Result<()> {
    let config = AppConfig::load(global.config_path.as_deref())?;
    let dry_run = args.dry_run || config.general.dry_run;

    tracing::info!(
        dry_run = dry_run,
        identity = %config.source.identity,
        list_id = ?config.source.list_id,
        "Starting courtside run"
    );

    let store = open_state_store(&config, global.memory_state).await?;
    let run_loop = build_run_loop(&config, store, dry_run)?;

    let report = run_loop.run_once().await.context("Poll cycle failed")?;
    print_report(&report)?;

    if !report.ok {
        bail!(
            "Publishing failed; {} post(s) left pending for the next run",
            report.pending.len()
        );
    }

    Ok(())
}

fn print_report(report: &RunReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
