use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Timelike,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "tminus-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "TMINUS_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "TMINUS_TIME_CONFIG";
const DEFAULT_PROJECT_TIMEZONE: &str =
  "UTC";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

pub fn project_timezone() -> &'static Tz
{
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  PROJECT_TZ.get_or_init(
    resolve_project_timezone
  )
}

/// Wall-clock reading of `dt` in the
/// project timezone.
#[must_use]
pub fn to_project_local(
  dt: DateTime<Utc>
) -> NaiveDateTime {
  dt.with_timezone(project_timezone())
    .naive_local()
}

#[must_use]
pub fn format_project_datetime(
  dt: DateTime<Utc>
) -> String {
  dt.with_timezone(project_timezone())
    .format("%Y-%m-%d %H:%M")
    .to_string()
}

fn resolve_project_timezone() -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_PROJECT_TIMEZONE,
    "DEFAULT_PROJECT_TIMEZONE"
  )
  .unwrap_or(chrono_tz::UTC)
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

pub fn to_utc_from_project_local(
  local_naive: NaiveDateTime,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match project_timezone()
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in configured \
         timezone: {context}"
      ))
    }
  }
}

/// Today at `hour`:00 in the project
/// timezone. Used as the starting
/// target of a new event.
pub fn default_target(
  now: DateTime<Utc>,
  hour: u32
) -> anyhow::Result<DateTime<Utc>> {
  let date =
    to_project_local(now).date();
  let time = NaiveTime::from_hms_opt(
    hour.min(23),
    0,
    0
  )
  .ok_or_else(|| {
    anyhow!(
      "invalid default hour: {hour}"
    )
  })?;
  to_utc_from_project_local(
    date.and_time(time),
    "default-target"
  )
}

#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<DateTime<Utc>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "now" => return Ok(now),
    | "today" => {
      let midnight =
        to_project_local(now)
          .date()
          .and_time(NaiveTime::MIN);
      return to_utc_from_project_local(
        midnight, "today"
      );
    }
    | "tomorrow" => {
      let today =
        parse_date_expr("today", now)?;
      return Ok(
        today + Duration::days(1)
      );
    }
    | _ => {}
  }

  if let Some(offset) =
    parse_relative_offset(&lower)
  {
    return Ok(now + offset);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return to_utc_from_project_local(
      date.and_time(NaiveTime::MIN),
      "date"
    );
  }

  for format in
    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
  {
    if let Ok(local) =
      NaiveDateTime::parse_from_str(
        token, format
      )
    {
      return to_utc_from_project_local(
        local, "datetime"
      );
    }
  }

  if let Some((hour, minute)) =
    parse_clock_time(&lower)
  {
    let time = NaiveTime::from_hms_opt(
      hour, minute, 0
    )
    .context("invalid clock time")?;
    let local = to_project_local(now)
      .date()
      .and_time(time);
    return to_utc_from_project_local(
      local,
      "clock-time"
    );
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {token}"
  ))
}

fn parse_relative_offset(
  token: &str
) -> Option<Duration> {
  let relative_re = Regex::new(
    r"^\+(?P<count>\d{1,6})(?P<unit>[mhdw])$"
  )
  .ok()?;
  let captures =
    relative_re.captures(token)?;
  let count = captures
    .name("count")?
    .as_str()
    .parse::<i64>()
    .ok()?;

  match captures.name("unit")?.as_str()
  {
    | "m" => Some(Duration::minutes(count)),
    | "h" => Some(Duration::hours(count)),
    | "d" => Some(Duration::days(count)),
    | "w" => Some(Duration::weeks(count)),
    | _ => None
  }
}

fn parse_clock_time(
  token: &str
) -> Option<(u32, u32)> {
  let clock_re = Regex::new(
    r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$",
  )
  .ok()?;
  let captures =
    clock_re.captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    let ampm = ampm_match
      .as_str()
      .to_ascii_lowercase();
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm.as_str() {
      | "am" => raw_hour % 12,
      | "pm" => raw_hour % 12 + 12,
      | _ => return None
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  Some((hour, minute))
}

/// Calendar date for a year, month and
/// day that may overflow their ranges.
/// Month 13 is January of the next
/// year; day 31 of a 30-day month is
/// the 1st of the next one.
pub fn rollover_date(
  year: i32,
  month: i64,
  day: i64
) -> Option<NaiveDate> {
  let months = i64::from(year) * 12
    + (month - 1);
  let year =
    i32::try_from(months.div_euclid(12))
      .ok()?;
  let month =
    u32::try_from(months.rem_euclid(12))
      .ok()?
      + 1;
  NaiveDate::from_ymd_opt(year, month, 1)?
    .checked_add_signed(Duration::days(
      day - 1
    ))
}

/// Set the day of month, rolling into
/// the next month when it overflows.
pub fn with_day_rollover(
  dt: NaiveDateTime,
  day: u32
) -> Option<NaiveDateTime> {
  rollover_date(
    dt.year(),
    i64::from(dt.month()),
    i64::from(day)
  )
  .map(|date| date.and_time(dt.time()))
}

/// Set the month (1-12), keeping the
/// day and rolling over when the day
/// does not exist in that month.
pub fn with_month_rollover(
  dt: NaiveDateTime,
  month: u32
) -> Option<NaiveDateTime> {
  rollover_date(
    dt.year(),
    i64::from(month),
    i64::from(dt.day())
  )
  .map(|date| date.and_time(dt.time()))
}

pub fn with_year_rollover(
  dt: NaiveDateTime,
  year: i32
) -> Option<NaiveDateTime> {
  rollover_date(
    year,
    i64::from(dt.month()),
    i64::from(dt.day())
  )
  .map(|date| date.and_time(dt.time()))
}

pub fn with_hour_rollover(
  dt: NaiveDateTime,
  hour: u32
) -> Option<NaiveDateTime> {
  let midnight =
    dt.date().and_time(NaiveTime::MIN);
  midnight.checked_add_signed(
    Duration::hours(i64::from(hour))
      + Duration::minutes(i64::from(
        dt.minute()
      ))
      + Duration::seconds(i64::from(
        dt.second()
      ))
  )
}

pub fn with_minute_rollover(
  dt: NaiveDateTime,
  minute: u32
) -> Option<NaiveDateTime> {
  let hour_start = dt
    .date()
    .and_hms_opt(dt.hour(), 0, 0)?;
  hour_start.checked_add_signed(
    Duration::minutes(i64::from(minute))
      + Duration::seconds(i64::from(
        dt.second()
      ))
  )
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveDateTime,
    TimeZone,
    Utc
  };

  use super::{
    parse_date_expr,
    rollover_date,
    to_project_local,
    with_day_rollover,
    with_hour_rollover,
    with_minute_rollover,
    with_month_rollover,
    with_year_rollover
  };

  fn local(
    raw: &str
  ) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(
      raw,
      "%Y-%m-%dT%H:%M"
    )
    .expect("valid datetime")
  }

  #[test]
  fn day_overflow_rolls_into_next_month()
  {
    let rolled = with_day_rollover(
      local("2025-02-28T08:00"),
      31
    )
    .expect("rolled");
    assert_eq!(
      rolled,
      local("2025-03-03T08:00")
    );
  }

  #[test]
  fn month_change_keeps_day_with_rollover()
  {
    assert_eq!(
      with_month_rollover(
        local("2025-01-31T10:15"),
        2
      ),
      Some(local("2025-03-03T10:15"))
    );
    assert_eq!(
      with_month_rollover(
        local("2025-01-15T10:15"),
        12
      ),
      Some(local("2025-12-15T10:15"))
    );
  }

  #[test]
  fn leap_day_rolls_in_common_year() {
    assert_eq!(
      with_year_rollover(
        local("2024-02-29T00:00"),
        2025
      ),
      Some(local("2025-03-01T00:00"))
    );
    assert_eq!(
      with_year_rollover(
        local("2024-02-29T00:00"),
        2028
      ),
      Some(local("2028-02-29T00:00"))
    );
  }

  #[test]
  fn month_arithmetic_wraps_years() {
    assert_eq!(
      rollover_date(2025, 13, 1),
      NaiveDate::from_ymd_opt(
        2026, 1, 1
      )
    );
    assert_eq!(
      rollover_date(2025, 0, 1),
      NaiveDate::from_ymd_opt(
        2024, 12, 1
      )
    );
    assert_eq!(
      rollover_date(2025, 3, 0),
      NaiveDate::from_ymd_opt(
        2025, 2, 28
      )
    );
  }

  #[test]
  fn time_fields_replace_in_place() {
    let dt = local("2025-06-10T08:45");
    assert_eq!(
      with_hour_rollover(dt, 23),
      Some(local("2025-06-10T23:45"))
    );
    assert_eq!(
      with_minute_rollover(dt, 0),
      Some(local("2025-06-10T08:00"))
    );
  }

  #[test]
  fn parses_dates_and_times() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now");

    let parsed = parse_date_expr(
      "2026-03-01 09:30",
      now
    )
    .expect("parse datetime");
    assert_eq!(
      to_project_local(parsed)
        .format("%Y-%m-%d %H:%M")
        .to_string(),
      "2026-03-01 09:30"
    );

    let parsed =
      parse_date_expr("2027-01-05", now)
        .expect("parse date");
    assert_eq!(
      to_project_local(parsed)
        .format("%Y-%m-%d %H:%M")
        .to_string(),
      "2027-01-05 00:00"
    );

    let parsed =
      parse_date_expr("3:23pm", now)
        .expect("parse clock time");
    assert_eq!(
      to_project_local(parsed)
        .format("%H:%M")
        .to_string(),
      "15:23"
    );
  }

  #[test]
  fn parses_relative_offsets() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now");
    assert_eq!(
      parse_date_expr("+2d", now)
        .expect("days"),
      now + chrono::Duration::days(2)
    );
    assert_eq!(
      parse_date_expr("+90m", now)
        .expect("minutes"),
      now + chrono::Duration::minutes(90)
    );
    assert_eq!(
      parse_date_expr("now", now)
        .expect("now"),
      now
    );
    assert!(
      parse_date_expr("someday", now)
        .is_err()
    );
  }
}
