//! JSON persistence for the snapshot store between runs.

use std::{
  io::{ErrorKind, Write as _},
  path::Path,
};

use anyhow::Context as _;
use blackout_core::{change::Snapshot, selector::Selector};
use blackout_store::MemoryStore;
use serde::{Deserialize, Serialize};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
  version:   u32,
  snapshots: Vec<StoredSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSnapshot {
  selector: Selector,
  snapshot: Snapshot,
}

/// Load the store persisted at `path`. A missing file is an empty store.
pub fn load(path: &Path) -> anyhow::Result<MemoryStore> {
  let raw = match std::fs::read(path) {
    Ok(raw) => raw,
    Err(e) if e.kind() == ErrorKind::NotFound => {
      tracing::debug!(path = %path.display(), "no state file yet");
      return Ok(MemoryStore::new());
    }
    Err(e) => {
      return Err(e).with_context(|| format!("failed to read {}", path.display()));
    }
  };

  let file: StateFile = serde_json::from_slice(&raw)
    .with_context(|| format!("failed to parse state file {}", path.display()))?;
  anyhow::ensure!(
    file.version == FORMAT_VERSION,
    "unsupported state file version {} in {}",
    file.version,
    path.display()
  );

  Ok(MemoryStore::from_snapshots(
    file.snapshots.into_iter().map(|s| (s.selector, s.snapshot)),
  ))
}

/// Write every snapshot in `store` to `path`, replacing it atomically.
pub fn save(path: &Path, store: &MemoryStore) -> anyhow::Result<()> {
  let file = StateFile {
    version:   FORMAT_VERSION,
    snapshots: store
      .export()
      .into_iter()
      .map(|(selector, snapshot)| StoredSnapshot { selector, snapshot })
      .collect(),
  };
  let json = serde_json::to_vec_pretty(&file).context("failed to serialise state")?;

  let dir = match path.parent() {
    Some(dir) if !dir.as_os_str().is_empty() => dir,
    _ => Path::new("."),
  };
  std::fs::create_dir_all(dir)
    .with_context(|| format!("failed to create {}", dir.display()))?;
  let mut tmp = tempfile::NamedTempFile::new_in(dir)
    .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
  tmp.write_all(&json).context("failed to write state")?;
  tmp
    .persist(path)
    .with_context(|| format!("failed to replace {}", path.display()))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use blackout_core::{
    event::{EventKind, OutageEvent},
    payload::ParsedPayload,
    store::SnapshotStore,
  };
  use blackout_store::run_cycle;
  use chrono::{TimeZone, Utc};

  use super::*;

  #[test]
  fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = load(&dir.path().join("state.json")).unwrap();
    assert!(store.selectors().is_empty());
  }

  #[test]
  fn saved_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    let sel = Selector::new(25u32, "3.1");
    let at = |h| Utc.with_ymd_and_hms(2025, 10, 27, h, 0, 0).unwrap();

    let store = MemoryStore::new();
    let event = OutageEvent::new(&sel, EventKind::Definite, at(8), at(10)).unwrap();
    let payload = ParsedPayload {
      events: vec![event],
      provider_updated_at: Some(at(7)),
      ..Default::default()
    };
    run_cycle(&store, &sel, payload, at(7)).unwrap();
    save(&path, &store).unwrap();

    let reloaded = load(&path).unwrap();
    assert_eq!(reloaded.get(&sel), store.get(&sel));
  }

  #[test]
  fn unknown_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, br#"{"version": 99, "snapshots": []}"#).unwrap();
    assert!(load(&path).is_err());
  }
}
