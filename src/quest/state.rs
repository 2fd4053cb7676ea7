//! Managed Quest State
//!
//! Tracks which players currently hold a managed quest in their quest log,
//! and under which host-assigned runtime ID.

use std::collections::BTreeMap;
use std::sync::Arc;
use serde::Serialize;

use super::definition::QuestTemplate;

/// Host-assigned quest ID inside a player's quest log
pub type RuntimeId = i32;

/// Reported as the current ID of a quest that is not in any quest log
pub const INACTIVE_ID: RuntimeId = -1;

/// A template known to the registry, active or not
#[derive(Debug, Clone)]
pub struct ManagedQuest {
    pub template: Arc<QuestTemplate>,
    /// player_id -> runtime ID, at most one per player
    runtime_ids: BTreeMap<String, RuntimeId>,
}

impl ManagedQuest {
    pub fn new(template: Arc<QuestTemplate>) -> Self {
        Self {
            template,
            runtime_ids: BTreeMap::new(),
        }
    }

    pub fn full_name(&self) -> String {
        self.template.full_name()
    }

    /// Runtime ID in the player's log, if active for that player
    pub fn runtime_id(&self, player_id: &str) -> Option<RuntimeId> {
        self.runtime_ids.get(player_id).copied()
    }

    /// Runtime ID for display, `INACTIVE_ID` when not active
    pub fn current_id(&self, player_id: &str) -> RuntimeId {
        self.runtime_id(player_id).unwrap_or(INACTIVE_ID)
    }

    /// Active for at least one player
    pub fn is_active(&self) -> bool {
        !self.runtime_ids.is_empty()
    }

    pub fn is_active_for(&self, player_id: &str) -> bool {
        self.runtime_ids.contains_key(player_id)
    }

    /// `(player_id, runtime_id)` pairs, ordered by player
    pub fn bindings(&self) -> impl Iterator<Item = (&str, RuntimeId)> {
        self.runtime_ids.iter().map(|(player, id)| (player.as_str(), *id))
    }

    /// Bind a runtime ID, returning the one it replaced
    pub(crate) fn bind(&mut self, player_id: &str, runtime_id: RuntimeId) -> Option<RuntimeId> {
        self.runtime_ids.insert(player_id.to_string(), runtime_id)
    }

    pub(crate) fn unbind(&mut self, player_id: &str) -> Option<RuntimeId> {
        self.runtime_ids.remove(player_id)
    }
}

/// Entry of the derived active-quest view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveQuest {
    pub full_name: String,
    pub player_id: String,
    pub runtime_id: RuntimeId,
}
