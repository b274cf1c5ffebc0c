//! Timestamp parsing and civil-time conversion shared by all adapters.
//!
//! Providers publish instants in many shapes. Anything carrying an explicit
//! offset is taken at face value; naive values are read in the adapter's
//! civil zone.

use chrono::{
  DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;

/// Naive layouts tried in order after the offset-aware ones.
const NAIVE_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M",
  "%d.%m.%Y %H:%M",
  "%H:%M %d.%m.%Y",
];

/// Resolve a civil time in `tz` to an instant.
///
/// Times inside a DST gap shift forward by the gap; ambiguous times take the
/// earlier instant.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
  tz.from_local_datetime(&naive)
    .earliest()
    .or_else(|| {
      let shifted = naive.checked_add_signed(TimeDelta::hours(1))?;
      tz.from_local_datetime(&shifted).earliest()
    })
    .map(|t| t.with_timezone(&Utc))
}

/// Local midnight starting `date` in `tz`.
pub fn local_midnight(tz: Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
  localize(tz, date.and_time(NaiveTime::MIN))
}

/// The civil date `at` falls on in `tz`.
pub fn local_date(tz: Tz, at: DateTime<Utc>) -> NaiveDate {
  at.with_timezone(&tz).date_naive()
}

/// Parse a provider timestamp.
///
/// Accepted: unix seconds (integer or fractional), RFC 3339 / ISO 8601 with
/// offset or `Z`, naive ISO 8601, `DD.MM.YYYY HH:MM` and `HH:MM DD.MM.YYYY`.
pub fn parse_timestamp(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  if let Some(t) = parse_unix(raw) {
    return Some(t);
  }
  if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
    return Some(t.with_timezone(&Utc));
  }
  if let Ok(t) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
    return Some(t.with_timezone(&Utc));
  }
  NAIVE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .and_then(|naive| localize(tz, naive))
}

/// Parse a JSON scalar holding a timestamp (string or number).
pub fn parse_timestamp_value(
  value: &serde_json::Value,
  tz: Tz,
) -> Option<DateTime<Utc>> {
  match value {
    serde_json::Value::String(s) => parse_timestamp(s, tz),
    serde_json::Value::Number(n) => parse_timestamp(&n.to_string(), tz),
    _ => None,
  }
}

fn parse_unix(raw: &str) -> Option<DateTime<Utc>> {
  let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
  let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
  if whole.is_empty() || !digits(whole) || !digits(frac) {
    return None;
  }
  let secs: i64 = whole.parse().ok()?;
  let nanos = if frac.is_empty() {
    0
  } else {
    let padded = format!("{:0<9}", &frac[..frac.len().min(9)]);
    padded.parse().ok()?
  };
  DateTime::from_timestamp(secs, nanos)
}

/// Parse `HH:MM` where `24:00` denotes the end of the day.
///
/// Returns the offset from local midnight.
pub fn parse_clock(raw: &str) -> Option<TimeDelta> {
  let (h, m) = raw.trim().split_once(':')?;
  let (h, m): (i64, i64) = (h.parse().ok()?, m.get(..2).unwrap_or(m).parse().ok()?);
  match (h, m) {
    (24, 0) => Some(TimeDelta::days(1)),
    (0..=23, 0..=59) => Some(TimeDelta::hours(h) + TimeDelta::minutes(m)),
    _ => None,
  }
}

/// The instant `offset` after local midnight of `date`.
///
/// Whole days roll over to the following date's midnight; the remainder is
/// resolved as wall-clock time on that date.
pub fn at_offset(tz: Tz, date: NaiveDate, offset: TimeDelta) -> Option<DateTime<Utc>> {
  let days = offset.num_days();
  let date = date.checked_add_signed(TimeDelta::days(days))?;
  let rest = offset - TimeDelta::days(days);
  localize(tz, date.and_time(NaiveTime::MIN).checked_add_signed(rest)?)
}
