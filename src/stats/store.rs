//! Stats persistence
//!
//! The ledger does not own a file format; it hands a player's full event list
//! to a store and takes one back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::ledger::StatEvent;
use crate::error::StoreError;

/// Load/save of a player's complete stat event list
pub trait StatsStore {
    fn load(&self, player_id: &str) -> Result<Vec<StatEvent>, StoreError>;
    fn save(&mut self, player_id: &str, events: &[StatEvent]) -> Result<(), StoreError>;
}

/// Keeps event lists in memory, for tests and hosts that persist elsewhere
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    players: HashMap<String, Vec<StatEvent>>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsStore for MemoryStatsStore {
    fn load(&self, player_id: &str) -> Result<Vec<StatEvent>, StoreError> {
        Ok(self.players.get(player_id).cloned().unwrap_or_default())
    }

    fn save(&mut self, player_id: &str, events: &[StatEvent]) -> Result<(), StoreError> {
        self.players.insert(player_id.to_string(), events.to_vec());
        Ok(())
    }
}

/// One JSON file per player inside a directory
#[derive(Debug, Clone)]
pub struct JsonFileStatsStore {
    dir: PathBuf,
}

impl JsonFileStatsStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Player IDs are hex-encoded so distinct IDs never share a file, even on
    /// case-insensitive file systems.
    fn path_for(&self, player_id: &str) -> PathBuf {
        self.dir
            .join(format!("stats_{}.json", hex::encode(player_id.as_bytes())))
    }
}

impl StatsStore for JsonFileStatsStore {
    fn load(&self, player_id: &str) -> Result<Vec<StatEvent>, StoreError> {
        let path = self.path_for(player_id);
        if !path.exists() {
            warn!("No stats file for player {} at {:?}", player_id, path);
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path)?;
        let events: Vec<StatEvent> = serde_json::from_str(&content)?;
        debug!("Read {} stat events from {:?}", events.len(), path);
        Ok(events)
    }

    fn save(&mut self, player_id: &str, events: &[StatEvent]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(player_id);
        let json = serde_json::to_string_pretty(events)?;
        std::fs::write(&path, json)?;
        debug!("Wrote {} stat events to {:?}", events.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ledger::StatKind;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_events() -> Vec<StatEvent> {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        vec![
            StatEvent::new("ownerA.FetchWood", StatKind::Accepted, ts, "1"),
            StatEvent::new("ownerA.FetchWood", StatKind::Completed, ts, "1"),
        ]
    }

    #[test]
    fn test_json_store_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonFileStatsStore::new(&temp_dir.path().join("stats"));

        store.save("1", &sample_events()).unwrap();
        assert_eq!(store.load("1").unwrap(), sample_events());
        assert!(store.load("2").unwrap().is_empty());
    }

    #[test]
    fn test_json_store_stays_in_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStatsStore::new(temp_dir.path());
        let path = store.path_for("../evil");
        assert_eq!(path.parent(), Some(temp_dir.path()));
    }

    #[test]
    fn test_json_store_keeps_similar_ids_apart() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonFileStatsStore::new(temp_dir.path());
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let dotted = vec![StatEvent::new("ownerA.FetchWood", StatKind::Accepted, ts, "a.b")];
        let underscored = vec![StatEvent::new("ownerA.FetchWood", StatKind::Removed, ts, "a_b")];
        store.save("a.b", &dotted).unwrap();
        store.save("a_b", &underscored).unwrap();
        store.save("A.B", &[]).unwrap();

        assert_eq!(store.load("a.b").unwrap(), dotted);
        assert_eq!(store.load("a_b").unwrap(), underscored);
        for id in ["a.b", "a_b", "a/b", "a b", "A.B"] {
            for other in ["a.b", "a_b", "a/b", "a b", "A.B"] {
                if id != other {
                    let (a, b) = (store.path_for(id), store.path_for(other));
                    assert_ne!(a.to_string_lossy().to_lowercase(), b.to_string_lossy().to_lowercase());
                }
            }
        }
    }

    #[test]
    fn test_json_store_reports_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStatsStore::new(temp_dir.path());
        std::fs::write(store.path_for("1"), "not json").unwrap();
        assert!(matches!(store.load("1"), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStatsStore::new();
        store.save("1", &sample_events()).unwrap();
        assert_eq!(store.load("1").unwrap().len(), 2);
        assert!(store.load("2").unwrap().is_empty());
    }
}
