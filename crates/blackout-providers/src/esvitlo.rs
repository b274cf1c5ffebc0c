//! E-Svitlo adapter.
//!
//! The account API answers for a single account, so the payload is already
//! scoped to one group:
//!
//! ```json
//! { "data": {
//!     "date_today": "13.12.2025",
//!     "lst_time_disc": [{"start_time": "08:00", "end_time": "12:00"}],
//!     "dict_tom": { "date_today": "14.12.2025", "lst_time_disc": [],
//!                   "last_update": "Оновлено: 13.12.2025 10:59" } } }
//! ```

use blackout_core::{
  event::{EventKind, OutageEvent},
  payload::ParsedPayload,
  selector::{GroupKey, Selector},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value};

use crate::{ProviderAdapter, error::Result, json, time};

const UPDATED_PREFIX: &str = "Оновлено:";
const TOMORROW: &str = "dict_tom";

pub struct ESvitloAdapter {
  tz: Tz,
}

impl ESvitloAdapter {
  pub fn new(tz: Tz) -> Self { Self { tz } }

  /// `last_update` lives under tomorrow's block, or at the top level.
  fn last_update(
    &self,
    data: &Map<String, Value>,
    out: &mut ParsedPayload,
  ) -> Option<DateTime<Utc>> {
    let candidates = [
      (
        format!("$.data.{TOMORROW}.last_update"),
        data.get(TOMORROW).and_then(|t| t.get("last_update")),
      ),
      ("$.data.last_update".to_string(), data.get("last_update")),
    ];
    let found = candidates.into_iter().find_map(|(path, v)| {
      let raw = v.and_then(Value::as_str).filter(|s| !s.is_empty())?;
      Some((path, raw))
    });
    let Some((path, raw)) = found else {
      out.warn("$.data.last_update", "no update stamp");
      return None;
    };

    let stamp = raw.trim_start_matches(UPDATED_PREFIX).trim();
    let parsed = NaiveDateTime::parse_from_str(stamp, "%d.%m.%Y %H:%M")
      .ok()
      .and_then(|naive| time::localize(self.tz, naive));
    if parsed.is_none() {
      out.warn(path, format!("unparseable update stamp {raw:?}"));
    }
    parsed
  }

  fn parse_day(
    &self,
    day: &Map<String, Value>,
    path: &str,
    selector: &Selector,
    updated_at: Option<DateTime<Utc>>,
    out: &mut ParsedPayload,
  ) {
    let periods_path = json::child(path, "lst_time_disc");
    let periods = match day.get("lst_time_disc") {
      None | Some(Value::Null) => return,
      Some(Value::Array(periods)) if periods.is_empty() => return,
      Some(Value::Array(periods)) => periods,
      Some(other) => {
        out.warn(periods_path, format!("expected array, found {}", json::kind(other)));
        return;
      }
    };

    let date = day
      .get("date_today")
      .and_then(Value::as_str)
      .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%d.%m.%Y").ok());
    let Some(date) = date else {
      out.warn(json::child(path, "date_today"), "missing or unparseable date");
      return;
    };

    for (i, period) in periods.iter().enumerate() {
      let path = json::index(&periods_path, i);
      let clock = |key: &str| period.get(key).and_then(Value::as_str).and_then(time::parse_clock);
      let (Some(start), Some(mut end)) = (clock("start_time"), clock("end_time")) else {
        out.warn(path, "period needs `start_time` and `end_time` as HH:MM");
        continue;
      };
      if end < start {
        end += TimeDelta::days(1);
      }
      let instants = time::at_offset(self.tz, date, start).zip(time::at_offset(self.tz, date, end));
      let Some((start, end)) = instants else {
        out.warn(path, "period does not exist in civil zone");
        continue;
      };
      match OutageEvent::new(selector, EventKind::Definite, start, end) {
        Ok(event) => out.events.push(event.with_source_updated_at(updated_at)),
        Err(e) => out.warn(path, e.to_string()),
      }
    }
  }
}

impl ProviderAdapter for ESvitloAdapter {
  fn name(&self) -> &str { "E-Svitlo" }

  fn parse(
    &self,
    raw: &[u8],
    selector: &Selector,
    _fetch_time: DateTime<Utc>,
  ) -> Result<ParsedPayload> {
    let root = json::parse(raw)?;
    let root = json::object(&root, "$")?;
    let data = json::object(json::field(root, "$", "data")?, "$.data")?;

    let mut out = ParsedPayload::default();
    if data.is_empty() {
      tracing::warn!(%selector, "e-svitlo response carries no data");
      return Ok(out);
    }

    let updated_at = self.last_update(data, &mut out);
    out.provider_updated_at = updated_at;

    self.parse_day(data, "$.data", selector, updated_at, &mut out);
    match data.get(TOMORROW) {
      Some(Value::Object(tomorrow)) => {
        let path = json::child("$.data", TOMORROW);
        self.parse_day(tomorrow, &path, selector, updated_at, &mut out);
      }
      None | Some(Value::Null) => {}
      Some(other) => {
        let message = format!("expected object, found {}", json::kind(other));
        out.warn(json::child("$.data", TOMORROW), message);
      }
    }

    tracing::debug!(%selector, events = out.events.len(), "parsed e-svitlo payload");
    Ok(out)
  }

  /// Reads the account details payload, whose `lst_cherga` starts with the
  /// account's group.
  fn groups(&self, raw: &[u8]) -> Result<Vec<GroupKey>> {
    let root = json::parse(raw)?;
    let group = root
      .pointer("/data/lst_cherga/0")
      .and_then(Value::as_str)
      .map(GroupKey::from);
    Ok(group.into_iter().collect())
  }
}
