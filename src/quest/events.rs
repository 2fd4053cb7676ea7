//! Host Quest Log Types
//!
//! What the host reports about a player's quest log on each refresh, and what
//! reconciliation did with it.

use serde::{Deserialize, Serialize};

use super::state::RuntimeId;

/// One quest currently in a player's log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveQuest {
    pub runtime_id: RuntimeId,
    /// Full or bare quest name the host associates with this entry, if any.
    /// Native quests usually have none.
    #[serde(default)]
    pub quest_name: Option<String>,
}

impl LiveQuest {
    pub fn new(runtime_id: RuntimeId, quest_name: &str) -> Self {
        Self {
            runtime_id,
            quest_name: Some(quest_name.to_string()),
        }
    }

    /// A host quest with no associated name
    pub fn native(runtime_id: RuntimeId) -> Self {
        Self {
            runtime_id,
            quest_name: None,
        }
    }
}

/// Snapshot of a player's quest log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostQuestLog {
    /// Quests currently in the log
    #[serde(default)]
    pub live: Vec<LiveQuest>,
    /// Runtime IDs the host has signalled as completed since the last refresh
    #[serde(default)]
    pub completed: Vec<RuntimeId>,
}

impl HostQuestLog {
    pub fn new(live: Vec<LiveQuest>) -> Self {
        Self {
            live,
            completed: Vec::new(),
        }
    }

    pub fn with_completed(mut self, completed: Vec<RuntimeId>) -> Self {
        self.completed = completed;
        self
    }
}

/// What a reconciliation changed for one player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub player_id: String,
    /// Newly tracked quests (full names)
    pub accepted: Vec<String>,
    pub completed: Vec<String>,
    pub removed: Vec<String>,
    /// Quests whose runtime ID was reassigned by the host
    pub reassigned: Vec<String>,
    /// Bindings dropped because their template was unregistered
    pub orphaned: usize,
}

impl ReconcileOutcome {
    pub fn new(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            ..Default::default()
        }
    }

    /// True when nothing changed
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
            && self.completed.is_empty()
            && self.removed.is_empty()
            && self.reassigned.is_empty()
            && self.orphaned == 0
    }
}
