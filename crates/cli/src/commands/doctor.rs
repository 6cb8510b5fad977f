//! Doctor command - validate configuration and show status

use anyhow::Result;
use courtside_domain::schedule::validate_time_zone;
use serde::Serialize;

use crate::args::DoctorArgs;
use crate::commands::GlobalOpts;
use crate::config::AppConfig;
use crate::wiring::{open_state_store, read_secret};

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    source: CheckResult,
    schedule: CheckResult,
    polling: CheckResult,
    bluesky: CheckResult,
    state: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, global: GlobalOpts) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        source: CheckResult::error("Not checked"),
        schedule: CheckResult::error("Not checked"),
        polling: CheckResult::error("Not checked"),
        bluesky: CheckResult::error("Not checked"),
        state: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(global.config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.source = check_source(config);
        report.schedule = check_schedule(config);
        report.polling = check_polling(config);
        report.bluesky = check_bluesky(config);
        report.state = check_state(config, global.memory_state).await;
    }

    let checks = [
        &report.config,
        &report.source,
        &report.schedule,
        &report.polling,
        &report.bluesky,
        &report.state,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_source(config: &AppConfig) -> CheckResult {
    let source = &config.source;

    if source.identity.trim().is_empty() {
        return CheckResult::error("source.identity is not set");
    }

    if source.api_key_env.trim().is_empty() {
        return CheckResult::error("No RapidAPI key env var configured");
    }

    let target = match &source.list_id {
        Some(list_id) => format!("list {}", list_id),
        None => format!("@{}", source.identity.trim_start_matches('@')),
    };

    let details = serde_json::json!({
        "identity": source.identity,
        "list_id": source.list_id,
        "host": source.rapidapi_host,
        "fetch_limit": source.fetch_limit,
    });

    match read_secret(&source.api_key_env) {
        Some(_) => CheckResult::ok(format!(
            "Reading {}, API key: {} (set)",
            target, source.api_key_env
        ))
        .with_details(details),
        None => CheckResult::error(format!(
            "Reading {}, API key: {} (not set)",
            target, source.api_key_env
        ))
        .with_details(details),
    }
}

fn check_schedule(config: &AppConfig) -> CheckResult {
    let schedule = &config.schedule;

    if let Err(e) = validate_time_zone(&schedule.timezone) {
        return CheckResult::error(e.to_string());
    }

    if schedule.url.trim().is_empty() {
        return CheckResult::warn("No schedule URL configured; polling stays in baseline mode");
    }

    CheckResult::ok(format!(
        "{} ({}), cached {} min",
        schedule.url, schedule.timezone, schedule.cache_ttl_mins
    ))
}

fn check_polling(config: &AppConfig) -> CheckResult {
    let polling = &config.polling;

    if polling.baseline_interval_mins <= 0 || polling.game_interval_mins <= 0 {
        return CheckResult::error("Polling intervals must be positive");
    }

    if polling.window_before_mins < 0 || polling.window_after_mins < 0 {
        return CheckResult::error("Game window offsets must not be negative");
    }

    if polling.max_posts_per_run == 0 {
        return CheckResult::warn("max_posts_per_run is 0; nothing will be published");
    }

    if polling.game_interval_mins > polling.baseline_interval_mins {
        return CheckResult::warn(format!(
            "Game interval ({} min) is longer than baseline ({} min)",
            polling.game_interval_mins, polling.baseline_interval_mins
        ));
    }

    CheckResult::ok(format!(
        "Baseline every {} min, game every {} min, window -{}/+{} min",
        polling.baseline_interval_mins,
        polling.game_interval_mins,
        polling.window_before_mins,
        polling.window_after_mins
    ))
}

fn check_bluesky(config: &AppConfig) -> CheckResult {
    let bluesky = &config.bluesky;

    if bluesky.identifier.trim().is_empty() {
        return if config.general.dry_run {
            CheckResult::warn("bluesky.identifier is not set (dry run only)")
        } else {
            CheckResult::error("bluesky.identifier is not set")
        };
    }

    match read_secret(&bluesky.password_env) {
        Some(_) => CheckResult::ok(format!(
            "{} on {}, password: {} (set)",
            bluesky.identifier, bluesky.service_url, bluesky.password_env
        )),
        None if config.general.dry_run => CheckResult::warn(format!(
            "{} on {}, password: {} (not set, dry run only)",
            bluesky.identifier, bluesky.service_url, bluesky.password_env
        )),
        None => CheckResult::error(format!(
            "{} on {}, password: {} (not set)",
            bluesky.identifier, bluesky.service_url, bluesky.password_env
        )),
    }
}

async fn check_state(config: &AppConfig, memory: bool) -> CheckResult {
    match open_state_store(config, memory).await {
        Ok(_) if memory => CheckResult::warn("In-memory state; nothing persists between runs"),
        Ok(_) => CheckResult::ok(format!(
            "SQLite state at {}",
            config.general.state_db_path.display()
        )),
        Err(e) => CheckResult::error(format!("{:#}", e)),
    }
}

fn print_report(report: &DoctorReport) {
    println!("courtside Doctor Report");
    println!("=======================");
    println!();

    print_check("Config", &report.config);
    print_check("Source", &report.source);
    print_check("Schedule", &report.schedule);
    print_check("Polling", &report.polling);
    print_check("Bluesky", &report.bluesky);
    print_check("State", &report.state);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: courtside run --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
