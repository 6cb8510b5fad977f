//! State command - inspect persisted state

use anyhow::{Context, Result};
use courtside_domain::state::AppState;
use serde_json::json;

use crate::args::{StateArgs, StateCommands};
use crate::commands::GlobalOpts;
use crate::config::AppConfig;
use crate::wiring::open_state_store;

pub async fn execute(args: StateArgs, global: GlobalOpts) -> Result<()> {
    match args.command {
        StateCommands::Show { json } => show(json, global).await,
    }
}

async fn show(as_json: bool, global: GlobalOpts) -> Result<()> {
    let config = AppConfig::load(global.config_path.as_deref())?;
    let state = AppState::new(open_state_store(&config, global.memory_state).await?);

    let cursor = state.cursor().await.context("Failed to read cursor")?;
    let poll_state = state.poll_state().await.context("Failed to read poll state")?;
    let schedule = state
        .schedule_cache()
        .await
        .context("Failed to read schedule cache")?;
    let session = state.session().await.context("Failed to read session")?;
    let dry_run = state
        .dry_run_report()
        .await
        .context("Failed to read dry run result")?;

    if as_json {
        let value = json!({
            "cursor": cursor,
            "poll_state": poll_state,
            "schedule_cache": schedule,
            "session": session.as_ref().map(|s| json!({ "did": s.did, "created_at": s.created_at.to_string() })),
            "dry_run": dry_run,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("courtside state");
    println!("===============");
    println!();
    println!("Cursor: {}", cursor.as_deref().unwrap_or("(none)"));
    match (poll_state.last_poll_at, poll_state.last_mode) {
        (Some(at), Some(mode)) => println!("Last poll: {} ({})", at, mode),
        (Some(at), None) => println!("Last poll: {}", at),
        _ => println!("Last poll: never"),
    }
    match schedule {
        Some(cache) => println!(
            "Schedule cache: {} game(s), fetched {}",
            cache.games.len(),
            cache.fetched_at
        ),
        None => println!("Schedule cache: empty"),
    }
    match session {
        Some(session) => println!("Session: {} (created {})", session.did, session.created_at),
        None => println!("Session: none"),
    }
    match dry_run {
        Some(report) => {
            println!(
                "Last dry run: {} ({}), {} post(s) would be published",
                report.generated_at,
                report.mode,
                report.posts.len()
            );
            for post in &report.posts {
                println!("  - {}: {}", post.source_post_id, post.text);
            }
        }
        None => println!("Last dry run: none"),
    }

    Ok(())
}
