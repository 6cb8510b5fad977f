//! Schedule command - current polling mode and upcoming games

use anyhow::Result;
use courtside_domain::PollMode;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::args::ScheduleArgs;
use crate::commands::GlobalOpts;
use crate::config::AppConfig;
use crate::wiring::{game_window, http_client, open_state_store, schedule_oracle};

#[derive(Debug, Serialize)]
struct ScheduleReport {
    #[serde(with = "time::serde::rfc3339")]
    now: OffsetDateTime,
    mode: PollMode,
    timezone: String,
    next_game: Option<String>,
    upcoming: Vec<String>,
}

pub async fn execute(args: ScheduleArgs, global: GlobalOpts) -> Result<()> {
    let config = AppConfig::load(global.config_path.as_deref())?;
    let store = open_state_store(&config, global.memory_state).await?;
    let oracle = schedule_oracle(&config, http_client(&config)?, store);
    let window = game_window(&config);

    let now = OffsetDateTime::now_utc();
    let games = oracle.upcoming_game_instants(now).await;
    let mode = window.mode_at(&games, now);

    let mut upcoming: Vec<OffsetDateTime> = games
        .into_iter()
        .filter(|start| *start + window.after >= now)
        .collect();
    upcoming.sort();

    let report = ScheduleReport {
        now,
        mode,
        timezone: config.schedule.timezone.clone(),
        next_game: upcoming.iter().find(|start| **start >= now).map(rfc3339),
        upcoming: upcoming.iter().map(rfc3339).collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn rfc3339(at: &OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

fn print_report(report: &ScheduleReport) {
    println!("Mode: {}", report.mode);
    match &report.next_game {
        Some(next) => println!("Next game: {}", next),
        None => println!("Next game: none scheduled"),
    }
    println!();
    println!("Upcoming games (UTC, times written in {}):", report.timezone);
    if report.upcoming.is_empty() {
        println!("  (none)");
    }
    for start in &report.upcoming {
        println!("  {}", start);
    }
}
