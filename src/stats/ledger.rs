//! Quest Statistics Ledger
//!
//! Append-only log of quest lifecycle events, partitioned by player, with
//! per-quest summaries kept up to date on every write.

use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{QuestError, QuestResult};

/// Kind of lifecycle transition a stat event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Accepted,
    Completed,
    Removed,
}

impl StatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Accepted => "accepted",
            StatKind::Completed => "completed",
            StatKind::Removed => "removed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(StatKind::Accepted),
            "completed" => Some(StatKind::Completed),
            "removed" => Some(StatKind::Removed),
            _ => None,
        }
    }
}

/// A single recorded lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEvent {
    pub full_name: String,
    pub kind: StatKind,
    pub timestamp: DateTime<Utc>,
    pub player_id: String,
}

impl StatEvent {
    pub fn new(full_name: &str, kind: StatKind, timestamp: DateTime<Utc>, player_id: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            kind,
            timestamp,
            player_id: player_id.to_string(),
        }
    }

    pub fn validate(&self) -> QuestResult<()> {
        if self.full_name.is_empty() {
            return Err(QuestError::validation("stat event has no quest name"));
        }
        if self.player_id.is_empty() {
            return Err(QuestError::validation(format!(
                "stat event for '{}' has no player",
                self.full_name
            )));
        }
        Ok(())
    }
}

/// Folded statistics for one quest and one player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuestStatSummary {
    pub acceptal_count: u32,
    pub completion_count: u32,
    pub removal_count: u32,
    pub last_accepted: Option<DateTime<Utc>>,
    pub last_completed: Option<DateTime<Utc>>,
    pub last_removed: Option<DateTime<Utc>>,
}

impl QuestStatSummary {
    fn apply(&mut self, event: &StatEvent) {
        let (count, last) = match event.kind {
            StatKind::Accepted => (&mut self.acceptal_count, &mut self.last_accepted),
            StatKind::Completed => (&mut self.completion_count, &mut self.last_completed),
            StatKind::Removed => (&mut self.removal_count, &mut self.last_removed),
        };
        *count += 1;
        if last.map_or(true, |ts| ts <= event.timestamp) {
            *last = Some(event.timestamp);
        }
    }
}

/// Per-player event totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayerStatTotals {
    pub accepted: usize,
    pub completed: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Default)]
struct PlayerLedger {
    /// Ordered by timestamp, insertion order among equal timestamps
    events: Vec<StatEvent>,
    /// full name -> summary
    summaries: HashMap<String, QuestStatSummary>,
    totals: PlayerStatTotals,
}

impl PlayerLedger {
    fn push(&mut self, event: StatEvent) {
        let summary = self.summaries.entry(event.full_name.clone()).or_default();
        summary.apply(&event);

        match event.kind {
            StatKind::Accepted => self.totals.accepted += 1,
            StatKind::Completed => self.totals.completed += 1,
            StatKind::Removed => self.totals.removed += 1,
        }

        let at = self.events.partition_point(|e| e.timestamp <= event.timestamp);
        self.events.insert(at, event);
    }
}

/// Sole writer of quest statistics
///
/// Not internally synchronised. A host that calls into it from more than one
/// thread must serialise access itself.
#[derive(Debug, Clone, Default)]
pub struct StatsLedger {
    players: HashMap<String, PlayerLedger>,
}

impl StatsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn record(&mut self, event: StatEvent) -> QuestResult<()> {
        event.validate()?;
        debug!(
            "Quest stat: {} {} (player {})",
            event.full_name,
            event.kind.as_str(),
            event.player_id
        );
        self.players
            .entry(event.player_id.clone())
            .or_default()
            .push(event);
        Ok(())
    }

    /// Summary for one quest and player; empty if nothing was recorded
    pub fn summary_for(&self, full_name: &str, player_id: &str) -> QuestStatSummary {
        self.players
            .get(player_id)
            .and_then(|p| p.summaries.get(full_name))
            .cloned()
            .unwrap_or_default()
    }

    /// Events of one kind for a player, oldest first
    pub fn all_events_of_kind<'a>(
        &'a self,
        kind: StatKind,
        player_id: &str,
    ) -> impl Iterator<Item = &'a StatEvent> + 'a {
        self.players
            .get(player_id)
            .into_iter()
            .flat_map(|p| p.events.iter())
            .filter(move |e| e.kind == kind)
    }

    /// Every event of a player, oldest first
    pub fn events_for(&self, player_id: &str) -> &[StatEvent] {
        self.players
            .get(player_id)
            .map(|p| p.events.as_slice())
            .unwrap_or_default()
    }

    pub fn stats_for(&self, player_id: &str) -> PlayerStatTotals {
        self.players
            .get(player_id)
            .map(|p| p.totals)
            .unwrap_or_default()
    }

    /// Replace a player's whole event list, e.g. after loading a save
    pub fn load_player(&mut self, player_id: &str, events: Vec<StatEvent>) -> QuestResult<()> {
        for event in &events {
            event.validate()?;
            if event.player_id != player_id {
                return Err(QuestError::validation(format!(
                    "event for player '{}' loaded into ledger of '{}'",
                    event.player_id, player_id
                )));
            }
        }

        let mut ledger = PlayerLedger::default();
        let count = events.len();
        for event in events {
            ledger.push(event);
        }
        self.players.insert(player_id.to_string(), ledger);

        info!("Loaded {} quest stat events for player {}", count, player_id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.players.values().map(|p| p.events.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_record_rejects_empty_fields() {
        let mut ledger = StatsLedger::new();
        let result = ledger.record(StatEvent::new("", StatKind::Accepted, at(0), "1"));
        assert!(matches!(result, Err(QuestError::Validation(_))));

        let result = ledger.record(StatEvent::new("ownerA.FetchWood", StatKind::Accepted, at(0), ""));
        assert!(matches!(result, Err(QuestError::Validation(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_summary_counts_match_events() {
        let mut ledger = StatsLedger::new();
        let kinds = [
            StatKind::Accepted,
            StatKind::Completed,
            StatKind::Accepted,
            StatKind::Removed,
            StatKind::Accepted,
        ];
        for (i, kind) in kinds.iter().enumerate() {
            ledger
                .record(StatEvent::new("ownerA.FetchWood", *kind, at(i as i64), "1"))
                .unwrap();
            ledger
                .record(StatEvent::new("ownerA.Other", StatKind::Accepted, at(i as i64), "2"))
                .unwrap();

            let summary = ledger.summary_for("ownerA.FetchWood", "1");
            for kind in [StatKind::Accepted, StatKind::Completed, StatKind::Removed] {
                let expected = ledger
                    .all_events_of_kind(kind, "1")
                    .filter(|e| e.full_name == "ownerA.FetchWood")
                    .count() as u32;
                let actual = match kind {
                    StatKind::Accepted => summary.acceptal_count,
                    StatKind::Completed => summary.completion_count,
                    StatKind::Removed => summary.removal_count,
                };
                assert_eq!(actual, expected);
            }
        }

        let summary = ledger.summary_for("ownerA.FetchWood", "1");
        assert_eq!(summary.acceptal_count, 3);
        assert_eq!(summary.completion_count, 1);
        assert_eq!(summary.removal_count, 1);
        assert_eq!(summary.last_accepted, Some(at(4)));
        assert_eq!(summary.last_completed, Some(at(1)));
        assert_eq!(summary.last_removed, Some(at(3)));

        // Player partitioning
        assert_eq!(ledger.summary_for("ownerA.FetchWood", "2"), QuestStatSummary::default());
        assert_eq!(ledger.summary_for("ownerA.Other", "2").acceptal_count, 5);
    }

    #[test]
    fn test_events_ordered_by_timestamp() {
        let mut ledger = StatsLedger::new();
        ledger.record(StatEvent::new("a.Late", StatKind::Accepted, at(10), "1")).unwrap();
        ledger.record(StatEvent::new("a.Early", StatKind::Accepted, at(1), "1")).unwrap();
        ledger.record(StatEvent::new("a.Tie", StatKind::Accepted, at(10), "1")).unwrap();

        let names: Vec<&str> = ledger
            .all_events_of_kind(StatKind::Accepted, "1")
            .map(|e| e.full_name.as_str())
            .collect();
        assert_eq!(names, vec!["a.Early", "a.Late", "a.Tie"]);
        assert_eq!(ledger.summary_for("a.Late", "1").last_accepted, Some(at(10)));
    }

    #[test]
    fn test_totals_and_reload() {
        let mut ledger = StatsLedger::new();
        ledger.record(StatEvent::new("a.Q", StatKind::Accepted, at(0), "1")).unwrap();
        ledger.record(StatEvent::new("a.Q", StatKind::Completed, at(1), "1")).unwrap();

        let totals = ledger.stats_for("1");
        assert_eq!(totals.accepted, 1);
        assert_eq!(totals.completed, 1);
        assert_eq!(totals.removed, 0);

        let saved = ledger.events_for("1").to_vec();
        let mut restored = StatsLedger::new();
        restored.load_player("1", saved).unwrap();
        assert_eq!(restored.summary_for("a.Q", "1"), ledger.summary_for("a.Q", "1"));
        assert_eq!(restored.stats_for("1"), totals);
    }

    #[test]
    fn test_load_player_rejects_foreign_events() {
        let mut ledger = StatsLedger::new();
        let events = vec![StatEvent::new("a.Q", StatKind::Accepted, at(0), "2")];
        assert!(matches!(
            ledger.load_player("1", events),
            Err(QuestError::Validation(_))
        ));
    }

    #[test]
    fn test_stat_kind_parsing() {
        assert_eq!(StatKind::from_str("completed"), Some(StatKind::Completed));
        assert_eq!(StatKind::from_str("summary"), None);
    }
}
