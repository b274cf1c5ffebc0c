//! The `(region, group)` selector naming one schedule stream.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a provider's geographic scope.
///
/// Providers key regions by numeric id (`25`), by id pairs (`25/902`) or by
/// slug (`kyiv_region`); all of them are carried as text.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RegionKey(String);

impl RegionKey {
  pub fn new(key: impl Into<String>) -> Self { Self(key.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for RegionKey {
  fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl From<String> for RegionKey {
  fn from(s: String) -> Self { Self(s) }
}

impl From<u32> for RegionKey {
  fn from(id: u32) -> Self { Self(id.to_string()) }
}

impl fmt::Display for RegionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Identifier of a sub-schedule group within a region, e.g. `"3.1"`.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
  pub fn new(key: impl Into<String>) -> Self { Self(key.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for GroupKey {
  fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl From<String> for GroupKey {
  fn from(s: String) -> Self { Self(s) }
}

impl fmt::Display for GroupKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// The configured `(region, group)` stream. Every snapshot, timeline and
/// notification is scoped to exactly one selector.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Selector {
  pub region: RegionKey,
  pub group:  GroupKey,
}

impl Selector {
  pub fn new(region: impl Into<RegionKey>, group: impl Into<GroupKey>) -> Self {
    Self {
      region: region.into(),
      group:  group.into(),
    }
  }
}

impl fmt::Display for Selector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.region, self.group)
  }
}
