//! Schedule parsing and game-window math
//!
//! Everything here is pure: text in, UTC instants out. Fetching and caching
//! live in [`crate::usecases::schedule_oracle`].

use regex::Regex;
use std::sync::LazyLock;
use time::{Duration, Month, OffsetDateTime};

use crate::model::PollMode;

static GAME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(\d{1,2})\s+\([A-Za-z]{3}\)")
        .expect("valid game line regex")
});

static VENUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Home|Away|Neutral").expect("valid venue regex"));

static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2})(?::(\d{2}))?\s*(a\.m\.|p\.m\.)").expect("valid time regex")
});

static SEASON_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(20\d{2})-\d{2}\b[^\n]*?Schedule").expect("valid season header regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Month number (1-12) at which a new season starts counting; 6 is June
const SEASON_FLIP_MONTH: u8 = 6;

/// A local wall-clock time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

/// A game line reduced to its calendar fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSlot {
    pub month: Month,
    pub day: u8,
    pub time: TimeOfDay,
}

/// Error converting a local time to UTC
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("Unknown time zone '{0}'")]
    UnknownZone(String),
    #[error("Invalid local time: {0}")]
    InvalidLocalTime(String),
}

/// Parse `H[:MM] a.m.|p.m.`; `None` for TBA or anything unrecognized
pub fn parse_time(raw: &str) -> Option<TimeOfDay> {
    if raw.trim().is_empty() || raw.to_ascii_uppercase().contains("TBA") {
        return None;
    }

    let caps = TIME_OF_DAY.captures(raw)?;
    let mut hour: u8 = caps[1].parse().ok()?;
    let minute: u8 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if hour == 0 || hour > 12 || minute > 59 {
        return None;
    }

    let is_pm = caps[3].to_ascii_lowercase().starts_with('p');
    if is_pm && hour != 12 {
        hour += 12;
    }
    if !is_pm && hour == 12 {
        hour = 0;
    }

    Some(TimeOfDay { hour, minute })
}

fn month_from_abbrev(name: &str) -> Option<Month> {
    let month = match name {
        "Jan" => Month::January,
        "Feb" => Month::February,
        "Mar" => Month::March,
        "Apr" => Month::April,
        "May" => Month::May,
        "Jun" => Month::June,
        "Jul" => Month::July,
        "Aug" => Month::August,
        "Sep" => Month::September,
        "Oct" => Month::October,
        "Nov" => Month::November,
        "Dec" => Month::December,
        _ => return None,
    };
    Some(month)
}

/// Parse a single schedule line into its calendar fields
pub fn parse_game_line(raw_line: &str) -> Option<GameSlot> {
    let line = WHITESPACE.replace_all(raw_line, " ");
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let caps = GAME_LINE.captures(line)?;
    let month = month_from_abbrev(&caps[1])?;
    let day: u8 = caps[2].parse().ok()?;
    let rest = line[caps[0].len()..].trim();

    let venue = VENUE.find(rest)?;
    let time = parse_time(rest[..venue.start()].trim())?;

    Some(GameSlot { month, day, time })
}

/// Season start year from a `YYYY-YY ... Schedule` header, else from `now`
pub fn infer_season_start_year(text: &str, now: OffsetDateTime) -> i32 {
    if let Some(year) = SEASON_HEADER
        .captures(text)
        .and_then(|caps| caps[1].parse::<i32>().ok())
    {
        return year;
    }

    if u8::from(now.month()) >= SEASON_FLIP_MONTH {
        now.year()
    } else {
        now.year() - 1
    }
}

/// Calendar year a month falls in for a season starting in `season_start_year`
pub fn year_for_month(month: Month, season_start_year: i32) -> i32 {
    if u8::from(month) >= SEASON_FLIP_MONTH {
        season_start_year
    } else {
        season_start_year + 1
    }
}

/// Convert a local wall-clock time in `tz_name` to a UTC instant.
///
/// The offset is the one in effect at the target instant, so games on either
/// side of a daylight-saving change land correctly. Nonexistent or repeated
/// local times are resolved with the "compatible" strategy.
pub fn zoned_to_utc(
    tz_name: &str,
    year: i32,
    month: Month,
    day: u8,
    time: TimeOfDay,
) -> Result<OffsetDateTime, ZoneError> {
    let tz = jiff::tz::TimeZone::get(tz_name)
        .map_err(|_| ZoneError::UnknownZone(tz_name.to_string()))?;

    let year = i16::try_from(year).map_err(|e| ZoneError::InvalidLocalTime(e.to_string()))?;
    let local = jiff::civil::DateTime::new(
        year,
        u8::from(month) as i8,
        day as i8,
        time.hour as i8,
        time.minute as i8,
        0,
        0,
    )
    .map_err(|e| ZoneError::InvalidLocalTime(e.to_string()))?;

    let zoned = tz
        .to_zoned(local)
        .map_err(|e| ZoneError::InvalidLocalTime(e.to_string()))?;

    OffsetDateTime::from_unix_timestamp(zoned.timestamp().as_second())
        .map_err(|e| ZoneError::InvalidLocalTime(e.to_string()))
}

/// Check that a time zone name resolves
pub fn validate_time_zone(tz_name: &str) -> Result<(), ZoneError> {
    jiff::tz::TimeZone::get(tz_name)
        .map(|_| ())
        .map_err(|_| ZoneError::UnknownZone(tz_name.to_string()))
}

/// Parse a schedule document into game start instants (UTC), in document order
pub fn parse_schedule(
    text: &str,
    tz_name: &str,
    now: OffsetDateTime,
) -> Result<Vec<OffsetDateTime>, ZoneError> {
    validate_time_zone(tz_name)?;
    let season_start_year = infer_season_start_year(text, now);

    let mut games = Vec::new();
    for line in text.lines() {
        let Some(slot) = parse_game_line(line) else {
            continue;
        };
        let year = year_for_month(slot.month, season_start_year);
        match zoned_to_utc(tz_name, year, slot.month, slot.day, slot.time) {
            Ok(instant) => games.push(instant),
            Err(error) => {
                tracing::debug!(line = %line.trim(), error = %error, "Skipping schedule line");
            }
        }
    }

    Ok(games)
}

/// Window around each game start during which polling speeds up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameWindow {
    pub before: Duration,
    pub after: Duration,
}

impl Default for GameWindow {
    fn default() -> Self {
        Self {
            before: Duration::minutes(90),
            after: Duration::minutes(210),
        }
    }
}

impl GameWindow {
    /// Whether `now` falls in `[start - before, start + after]`.
    ///
    /// An edge beyond the representable date range leaves that side open.
    pub fn contains(&self, start: OffsetDateTime, now: OffsetDateTime) -> bool {
        let opened = start.checked_sub(self.before).is_none_or(|from| now >= from);
        let closed = start.checked_add(self.after).is_none_or(|until| now <= until);
        opened && closed
    }

    /// Polling mode for `now` given all known game starts
    pub fn mode_at(&self, games: &[OffsetDateTime], now: OffsetDateTime) -> PollMode {
        if games.iter().any(|start| self.contains(*start, now)) {
            PollMode::Game
        } else {
            PollMode::Baseline
        }
    }
}
