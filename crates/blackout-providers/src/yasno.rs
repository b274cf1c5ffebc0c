//! Yasno REST adapter.
//!
//! One document covers a region/DSO pair and is keyed by group:
//!
//! ```json
//! { "3.1": {
//!     "today":    { "slots": [{"start": 960, "end": 1200, "type": "Definite"}],
//!                   "date": "2025-10-27T00:00:00+02:00",
//!                   "status": "ScheduleApplies" },
//!     "tomorrow": { "slots": [], "date": "...", "status": "WaitingForSchedule" },
//!     "updatedOn": "2025-10-27T13:42:41+00:00" } }
//! ```
//!
//! Slot bounds are minutes from local midnight; `1440` is the next midnight.

use blackout_core::{
  event::{EventKind, OutageEvent},
  payload::ParsedPayload,
  selector::{GroupKey, Selector},
};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value};

use crate::{
  ProviderAdapter,
  error::{Error, Result},
  json,
  time,
};

const UPDATED_ON: &str = "updatedOn";
const DEFINITE_SLOT: &str = "Definite";
const MINUTES_PER_DAY: i64 = 24 * 60;

/// Day-level status of a group's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
enum DayStatus {
  /// Slots are confirmed.
  ScheduleApplies,
  /// Schedules are suspended; the whole day is an emergency.
  EmergencyShutdowns,
  /// Slots are published but not confirmed yet.
  WaitingForSchedule,
}

pub struct YasnoAdapter {
  tz: Tz,
}

impl YasnoAdapter {
  pub fn new(tz: Tz) -> Self { Self { tz } }

  fn parse_day(
    &self,
    day: &Value,
    path: &str,
    selector: &Selector,
    updated_at: Option<DateTime<Utc>>,
    out: &mut ParsedPayload,
  ) {
    let Some(day) = day.as_object() else {
      out.warn(path, format!("expected object, found {}", json::kind(day)));
      return;
    };
    let Some(date) = day
      .get("date")
      .and_then(|v| time::parse_timestamp_value(v, self.tz))
    else {
      out.warn(json::child(path, "date"), "missing or unparseable day date");
      return;
    };
    let date = time::local_date(self.tz, date);

    let status = day.get("status").and_then(Value::as_str).unwrap_or_default();
    match status.parse::<DayStatus>() {
      Ok(DayStatus::ScheduleApplies) => {
        let events = self.slots(day, path, date, selector, updated_at, out);
        out.events.extend(events);
      }
      Ok(DayStatus::WaitingForSchedule) => {
        let events = self.slots(day, path, date, selector, updated_at, out);
        out.tentative.extend(events);
      }
      Ok(DayStatus::EmergencyShutdowns) => {
        let whole_day = time::local_midnight(self.tz, date).zip(
          date
            .succ_opt()
            .and_then(|next| time::local_midnight(self.tz, next)),
        );
        let event = whole_day
          .ok_or_else(|| "day boundaries do not exist in civil zone".to_string())
          .and_then(|(start, end)| {
            OutageEvent::new(selector, EventKind::Emergency, start, end)
              .map_err(|e| e.to_string())
          });
        match event {
          Ok(event) => out.events.push(event.with_source_updated_at(updated_at)),
          Err(message) => out.warn(path, message),
        }
      }
      Err(_) => tracing::debug!(path, status, "ignoring day with unknown status"),
    }
  }

  fn slots(
    &self,
    day: &Map<String, Value>,
    path: &str,
    date: NaiveDate,
    selector: &Selector,
    updated_at: Option<DateTime<Utc>>,
    out: &mut ParsedPayload,
  ) -> Vec<OutageEvent> {
    let slots_path = json::child(path, "slots");
    let slots = match day.get("slots") {
      None | Some(Value::Null) => return Vec::new(),
      Some(Value::Array(slots)) => slots,
      Some(other) => {
        out.warn(slots_path, format!("expected array, found {}", json::kind(other)));
        return Vec::new();
      }
    };

    let mut events = Vec::new();
    for (i, slot) in slots.iter().enumerate() {
      let path = json::index(&slots_path, i);
      if slot.get("type").and_then(Value::as_str) != Some(DEFINITE_SLOT) {
        continue;
      }
      let bound = |key: &str| {
        slot
          .get(key)
          .and_then(Value::as_i64)
          .filter(|m| (0..=MINUTES_PER_DAY).contains(m))
      };
      let (Some(start), Some(end)) = (bound("start"), bound("end")) else {
        out.warn(path, "slot bounds must be minutes within the day");
        continue;
      };
      let instants = time::at_offset(self.tz, date, TimeDelta::minutes(start))
        .zip(time::at_offset(self.tz, date, TimeDelta::minutes(end)));
      let Some((start, end)) = instants else {
        out.warn(path, "slot does not exist in civil zone");
        continue;
      };
      match OutageEvent::new(selector, EventKind::Definite, start, end) {
        Ok(event) => events.push(event.with_source_updated_at(updated_at)),
        Err(e) => out.warn(path, e.to_string()),
      }
    }
    events
  }
}

impl ProviderAdapter for YasnoAdapter {
  fn name(&self) -> &str { "Yasno" }

  fn parse(
    &self,
    raw: &[u8],
    selector: &Selector,
    _fetch_time: DateTime<Utc>,
  ) -> Result<ParsedPayload> {
    check_region(selector)?;
    let root = json::parse(raw)?;
    let groups = json::object(&root, "$")?;

    let group_path = json::child("$", selector.group.as_str());
    let Some(group) = groups.get(selector.group.as_str()) else {
      return Err(Error::unsupported(selector, "group not present in payload"));
    };
    let group = json::object(group, &group_path)?;

    let mut out = ParsedPayload::default();
    let updated_at = group
      .get(UPDATED_ON)
      .and_then(|v| time::parse_timestamp_value(v, self.tz));
    if updated_at.is_none() && group.contains_key(UPDATED_ON) {
      out.warn(json::child(&group_path, UPDATED_ON), "unparseable timestamp");
    }
    out.provider_updated_at = updated_at;

    for (key, day) in group.iter().filter(|(k, _)| *k != UPDATED_ON) {
      self.parse_day(day, &json::child(&group_path, key), selector, updated_at, &mut out);
    }

    tracing::debug!(
      %selector,
      events = out.events.len(),
      tentative = out.tentative.len(),
      "parsed yasno payload"
    );
    Ok(out)
  }

  fn groups(&self, raw: &[u8]) -> Result<Vec<GroupKey>> {
    let root = json::parse(raw)?;
    let groups = json::object(&root, "$")?;
    Ok(groups.keys().map(|k| GroupKey::from(k.as_str())).collect())
  }
}

/// Yasno regions are numeric ids, optionally paired with a DSO id.
fn check_region(selector: &Selector) -> Result<()> {
  let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
  let region = selector.region.as_str();
  let valid = match region.split_once('/') {
    Some((region, dso)) => numeric(region) && numeric(dso),
    None => numeric(region),
  };
  if valid {
    Ok(())
  } else {
    Err(Error::unsupported(selector, "expected a numeric region id or `region/dso`"))
  }
}
