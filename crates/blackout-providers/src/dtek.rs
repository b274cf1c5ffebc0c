//! DTEK adapters: the JSON feed and the schedule embedded in DTEK's page.
//!
//! Both carry the same `fact` document:
//!
//! ```json
//! { "data": { "1761688800": { "GPV1.1": { "1": "yes", "13": "second", ... } } },
//!   "update": "29.10.2025 13:51",
//!   "today": 1761688800 }
//! ```
//!
//! Day keys are unix timestamps of local midnight. Hour maps are keyed
//! `"1".."24"` or `"0".."23"`; each value says whether power is on for that
//! hour or for one of its halves.

use std::{collections::BTreeSet, sync::LazyLock};

use blackout_core::{
  event::{EventKind, OutageEvent},
  payload::ParsedPayload,
  selector::{GroupKey, Selector},
};
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde_json::{Map, Value};

use crate::{
  ProviderAdapter,
  error::{Error, Result},
  json,
  time,
};

/// Default age after which a feed document is reported as stale.
pub const STALE_AFTER_DAYS: i64 = 2;

/// Regions served by the JSON feed.
pub const FEED_REGIONS: &[&str] = &[
  "kyiv_region",
  "dnipro",
  "odesa",
  "khmelnytskyi",
  "ivano_frankivsk",
  "uzhhorod",
  "lviv",
  "ternopil",
  "chernihiv",
  "zaporizhzhia",
];

/// The page scrape only covers Kyiv city.
pub const PAGE_REGIONS: &[&str] = &["kyiv"];

const GROUP_PREFIX: &str = "GPV";

static FACT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?s)DisconSchedule\.fact\s*=\s*(\{.*?\})</script>")
    .expect("fact marker pattern is valid")
});

// ─── Hour maps ───────────────────────────────────────────────────────────────

/// Power status for one hour slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
enum HourStatus {
  /// Power on.
  Yes,
  /// Power off for the whole hour.
  No,
  /// Power off for the first half.
  First,
  /// Power off for the second half.
  Second,
  /// Possibly off for the first half; counted as a full hour.
  Mfirst,
  /// Possibly off for the second half; counted as a full hour.
  Msecond,
}

/// Outage ranges in minutes from local midnight, plus the keys whose status
/// was not recognised (those hours count as powered).
fn outage_ranges(hours: &Map<String, Value>) -> (Vec<(i64, i64)>, Vec<String>) {
  let zero_based = hours.contains_key("0");
  let mut ranges = Vec::new();
  let mut unknown = Vec::new();
  let mut open: Option<i64> = None;

  for hour in 0..24_i64 {
    let key = if zero_based { hour } else { hour + 1 };
    let key = key.to_string();
    let status = match hours.get(&key) {
      None => HourStatus::Yes,
      Some(v) => match v.as_str().and_then(|s| s.parse().ok()) {
        Some(status) => status,
        None => {
          unknown.push(key);
          HourStatus::Yes
        }
      },
    };
    let top = hour * 60;

    match status {
      HourStatus::Yes => {
        if let Some(start) = open.take() {
          ranges.push((start, top));
        }
      }
      HourStatus::No | HourStatus::Mfirst | HourStatus::Msecond => {
        open.get_or_insert(top);
      }
      HourStatus::Second => {
        open.get_or_insert(top + 30);
      }
      HourStatus::First => {
        let start = open.take().unwrap_or(top);
        ranges.push((start, top + 30));
      }
    }
  }

  if let Some(start) = open {
    ranges.push((start, 24 * 60));
  }
  (ranges, unknown)
}

// ─── Adapter ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
  Feed,
  Page,
}

pub struct DtekAdapter {
  tz:          Tz,
  source:      Source,
  stale_after: TimeDelta,
}

impl DtekAdapter {
  /// Adapter for the JSON feed (`{"fact": {...}}` or the bare fact).
  pub fn json(tz: Tz) -> Self {
    Self {
      tz,
      source: Source::Feed,
      stale_after: TimeDelta::days(STALE_AFTER_DAYS),
    }
  }

  /// Adapter for the schedule embedded in the provider's HTML page.
  pub fn html(tz: Tz) -> Self {
    Self {
      source: Source::Page,
      ..Self::json(tz)
    }
  }

  pub fn with_stale_after(mut self, window: TimeDelta) -> Self {
    self.stale_after = window;
    self
  }

  fn regions(&self) -> &'static [&'static str] {
    match self.source {
      Source::Feed => FEED_REGIONS,
      Source::Page => PAGE_REGIONS,
    }
  }

  fn fact(&self, raw: &[u8]) -> Result<Value> {
    match self.source {
      Source::Feed => {
        let mut root = json::parse(raw)?;
        match root.get_mut("fact") {
          Some(fact) => Ok(fact.take()),
          None => Ok(root),
        }
      }
      Source::Page => extract_fact(raw),
    }
  }
}

/// Pull the `DisconSchedule.fact` object out of a scraped page.
pub fn extract_fact(raw: &[u8]) -> Result<Value> {
  let html = std::str::from_utf8(raw)
    .map_err(|e| Error::format("$", format!("page is not UTF-8: {e}")))?;
  let Some(found) = FACT_MARKER.captures(html).and_then(|c| c.get(1)) else {
    return Err(Error::format(
      "$",
      "DisconSchedule.fact not found; the request may have been filtered",
    ));
  };
  serde_json::from_str(found.as_str())
    .map_err(|e| Error::format("$", format!("embedded schedule: {e}")))
}

impl ProviderAdapter for DtekAdapter {
  fn name(&self) -> &str { "DTEK" }

  fn parse(
    &self,
    raw: &[u8],
    selector: &Selector,
    fetch_time: DateTime<Utc>,
  ) -> Result<ParsedPayload> {
    if !self.regions().contains(&selector.region.as_str()) {
      return Err(Error::unsupported(selector, "region not served by this feed"));
    }

    let fact = self.fact(raw)?;
    let fact = json::object(&fact, "$")?;
    let data = json::object(json::field(fact, "$", "data")?, "$.data")?;
    let mut out = ParsedPayload::default();

    let updated_at = fact.get("update").and_then(|v| {
      let parsed = time::parse_timestamp_value(v, self.tz);
      if parsed.is_none() {
        tracing::debug!(update = %v, "unparseable update stamp");
      }
      parsed
    });
    match updated_at {
      Some(at) if fetch_time - at > self.stale_after => {
        out.warn("$.update", format!("stale: last updated {at}"));
      }
      None if fact.contains_key("update") => {
        out.warn("$.update", "unparseable timestamp");
      }
      _ => {}
    }
    out.provider_updated_at = updated_at;

    let group_key = format!("{GROUP_PREFIX}{}", selector.group);
    let mut group_seen = false;

    for (day_key, day) in data {
      let day_path = json::child("$.data", day_key);
      let Some(hours) = day.get(&group_key) else {
        continue;
      };
      group_seen = true;
      let path = json::child(&day_path, &group_key);

      let Some(date) = time::parse_timestamp(day_key, self.tz) else {
        out.warn(day_path, "day key is not a timestamp");
        continue;
      };
      let date = time::local_date(self.tz, date);
      let Some(hours) = hours.as_object() else {
        out.warn(path, format!("expected object, found {}", json::kind(hours)));
        continue;
      };

      let (ranges, unknown) = outage_ranges(hours);
      for key in unknown {
        out.warn(json::child(&path, &key), "unrecognised hour status");
      }
      for (start, end) in ranges {
        let instants = time::at_offset(self.tz, date, TimeDelta::minutes(start))
          .zip(time::at_offset(self.tz, date, TimeDelta::minutes(end)));
        let Some((start, end)) = instants else {
          out.warn(&path, "range does not exist in civil zone");
          continue;
        };
        match OutageEvent::new(selector, EventKind::Definite, start, end) {
          Ok(event) => out.events.push(event.with_source_updated_at(updated_at)),
          Err(e) => out.warn(&path, e.to_string()),
        }
      }
    }

    if !group_seen && !data.is_empty() {
      return Err(Error::unsupported(selector, "group not present in payload"));
    }

    tracing::debug!(%selector, events = out.events.len(), "parsed dtek payload");
    Ok(out)
  }

  fn groups(&self, raw: &[u8]) -> Result<Vec<GroupKey>> {
    let fact = self.fact(raw)?;
    let Some(data) = fact.get("data").and_then(Value::as_object) else {
      return Ok(Vec::new());
    };
    let groups: BTreeSet<&str> = data
      .values()
      .filter_map(Value::as_object)
      .flat_map(|day| day.keys())
      .filter_map(|k| k.strip_prefix(GROUP_PREFIX))
      .collect();
    Ok(groups.into_iter().map(GroupKey::from).collect())
  }
}
