//! Quest Registry
//!
//! Authoritative set of managed quests. Maps host-assigned runtime IDs to
//! templates, drives the accept/complete/remove state machine, and
//! reconciles itself against the host's quest log.

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::definition::{split_full_name, QuestTemplate};
use super::events::{HostQuestLog, ReconcileOutcome};
use super::state::{ActiveQuest, ManagedQuest, RuntimeId};
use super::store::QuestDefinitionStore;
use crate::error::{QuestError, QuestResult};
use crate::stats::{StatEvent, StatKind, StatsLedger};

/// Owner of a runtime ID
#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    full_name: String,
    player_id: String,
}

/// Result of binding a runtime ID to a quest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// First activation in a continuous active period
    Accepted,
    /// Host moved the quest to a new runtime ID
    Reassigned { previous: RuntimeId },
    /// Already bound to exactly this runtime ID
    Unchanged,
}

/// Registry contents that a reconciliation may replace as a whole
#[derive(Debug, Clone, Default)]
struct RegistryState {
    /// Instances in the order templates were first observed
    quests: Vec<ManagedQuest>,
    /// full name -> index into `quests`
    by_name: HashMap<String, usize>,
    by_runtime_id: HashMap<RuntimeId, Binding>,
}

impl RegistryState {
    fn get(&self, full_name: &str) -> Option<&ManagedQuest> {
        self.by_name.get(full_name).map(|&slot| &self.quests[slot])
    }

    /// Get or create the instance for a template, refreshing its template
    fn ensure(&mut self, template: &Arc<QuestTemplate>) -> usize {
        let full_name = template.full_name();
        if let Some(&slot) = self.by_name.get(&full_name) {
            self.quests[slot].template = Arc::clone(template);
            return slot;
        }

        let slot = self.quests.len();
        self.quests.push(ManagedQuest::new(Arc::clone(template)));
        self.by_name.insert(full_name, slot);
        slot
    }

    fn bind(
        &mut self,
        template: &Arc<QuestTemplate>,
        player_id: &str,
        runtime_id: RuntimeId,
        at: DateTime<Utc>,
        events: &mut Vec<StatEvent>,
    ) -> QuestResult<BindOutcome> {
        let full_name = template.full_name();

        if let Some(owner) = self.by_runtime_id.get(&runtime_id) {
            if owner.full_name == full_name && owner.player_id == player_id {
                return Ok(BindOutcome::Unchanged);
            }
            return Err(QuestError::consistency(format!(
                "runtime ID {} is held by '{}' for player {}, cannot bind '{}' for player {}",
                runtime_id, owner.full_name, owner.player_id, full_name, player_id
            )));
        }

        let slot = self.ensure(template);
        let outcome = match self.quests[slot].bind(player_id, runtime_id) {
            Some(previous) => {
                self.by_runtime_id.remove(&previous);
                BindOutcome::Reassigned { previous }
            }
            None => {
                events.push(StatEvent::new(&full_name, StatKind::Accepted, at, player_id));
                BindOutcome::Accepted
            }
        };

        self.by_runtime_id.insert(
            runtime_id,
            Binding {
                full_name,
                player_id: player_id.to_string(),
            },
        );
        Ok(outcome)
    }

    /// Deactivate a binding and emit `kind`, returning the quest's full name
    fn release(
        &mut self,
        runtime_id: RuntimeId,
        player_id: &str,
        kind: StatKind,
        at: DateTime<Utc>,
        events: &mut Vec<StatEvent>,
    ) -> QuestResult<String> {
        let binding = match self.by_runtime_id.get(&runtime_id) {
            Some(b) if b.player_id == player_id => b.clone(),
            _ => return Err(QuestError::NotManaged(runtime_id)),
        };

        self.by_runtime_id.remove(&runtime_id);
        if let Some(&slot) = self.by_name.get(&binding.full_name) {
            self.quests[slot].unbind(player_id);
        }

        events.push(StatEvent::new(&binding.full_name, kind, at, player_id));
        Ok(binding.full_name)
    }

    /// Runtime IDs bound for a player with their quest, lowest ID first
    fn bindings_of(&self, player_id: &str) -> Vec<(RuntimeId, String)> {
        let mut bindings: Vec<(RuntimeId, String)> = self
            .by_runtime_id
            .iter()
            .filter(|(_, b)| b.player_id == player_id)
            .map(|(id, b)| (*id, b.full_name.clone()))
            .collect();
        bindings.sort();
        bindings
    }

    /// Drop instances whose template left the store and pick up replaced
    /// templates. Returns the number of active bindings dropped.
    fn sync(&mut self, store: &QuestDefinitionStore) -> usize {
        let before = self.by_runtime_id.len();

        self.quests.retain(|q| store.contains(&q.full_name()));
        for quest in &mut self.quests {
            if let Some(template) = store.get(&quest.full_name()) {
                quest.template = Arc::clone(template);
            }
        }
        self.by_name = self
            .quests
            .iter()
            .enumerate()
            .map(|(slot, q)| (q.full_name(), slot))
            .collect();

        let by_name = &self.by_name;
        self.by_runtime_id.retain(|_, b| by_name.contains_key(&b.full_name));

        for template in store.all() {
            self.ensure(template);
        }

        before - self.by_runtime_id.len()
    }
}

/// Registry of managed quest instances
///
/// Not internally synchronised; intended to be driven from the host's game
/// thread. Callers on other threads must provide their own locking.
#[derive(Debug, Clone)]
pub struct QuestRegistry {
    state: RegistryState,
    /// Derived view of active quests, rebuilt lazily
    active_cache: OnceCell<Vec<ActiveQuest>>,
    /// Resolve names without an owner prefix by bare name
    bare_name_fallback: bool,
}

impl QuestRegistry {
    pub fn new(bare_name_fallback: bool) -> Self {
        Self {
            state: RegistryState::default(),
            active_cache: OnceCell::new(),
            bare_name_fallback,
        }
    }

    /// Whether some managed quest currently holds this runtime ID
    pub fn is_managed(&self, runtime_id: RuntimeId) -> bool {
        self.state.by_runtime_id.contains_key(&runtime_id)
    }

    pub fn get_by_runtime_id(&self, runtime_id: RuntimeId) -> QuestResult<&ManagedQuest> {
        self.state
            .by_runtime_id
            .get(&runtime_id)
            .and_then(|b| self.state.get(&b.full_name))
            .ok_or_else(|| QuestError::NotFound(runtime_id.to_string()))
    }

    /// Known instance for a template, active or not
    pub fn get(&self, full_name: &str) -> Option<&ManagedQuest> {
        self.state.get(full_name)
    }

    /// Resolve a quest by full name, or by bare name when no owner is given.
    ///
    /// A bare name matching templates of several owners resolves to the
    /// first one registered.
    pub fn fetch(
        &self,
        store: &QuestDefinitionStore,
        name: &str,
    ) -> QuestResult<Arc<QuestTemplate>> {
        if let Some(template) = store.get(name) {
            return Ok(Arc::clone(template));
        }

        if self.bare_name_fallback && split_full_name(name).is_none() {
            if let Some(template) = store.find_by_bare_name(name) {
                return Ok(Arc::clone(template));
            }
        }

        Err(QuestError::NotFound(name.to_string()))
    }

    /// Bind a template to a host-assigned runtime ID for a player
    pub fn activate(
        &mut self,
        store: &QuestDefinitionStore,
        ledger: &mut StatsLedger,
        full_name: &str,
        runtime_id: RuntimeId,
        player_id: &str,
        at: DateTime<Utc>,
    ) -> QuestResult<BindOutcome> {
        validate_transition(runtime_id, player_id)?;
        let template = store
            .get(full_name)
            .cloned()
            .ok_or_else(|| QuestError::UnknownTemplate(full_name.to_string()))?;

        let mut events = Vec::new();
        let outcome = self
            .state
            .bind(&template, player_id, runtime_id, at, &mut events)?;

        match outcome {
            BindOutcome::Accepted => {
                info!("Quest '{}' accepted by player {} as #{}", full_name, player_id, runtime_id)
            }
            BindOutcome::Reassigned { previous } => debug!(
                "Quest '{}' of player {} moved from #{} to #{}",
                full_name, player_id, previous, runtime_id
            ),
            BindOutcome::Unchanged => {}
        }

        self.commit(ledger, events)?;
        Ok(outcome)
    }

    /// Mark a quest completed and deactivate it
    pub fn complete(
        &mut self,
        ledger: &mut StatsLedger,
        runtime_id: RuntimeId,
        player_id: &str,
        at: DateTime<Utc>,
    ) -> QuestResult<String> {
        self.transition(ledger, runtime_id, player_id, StatKind::Completed, at)
    }

    /// Deactivate a quest that left the log without completion
    pub fn remove(
        &mut self,
        ledger: &mut StatsLedger,
        runtime_id: RuntimeId,
        player_id: &str,
        at: DateTime<Utc>,
    ) -> QuestResult<String> {
        self.transition(ledger, runtime_id, player_id, StatKind::Removed, at)
    }

    fn transition(
        &mut self,
        ledger: &mut StatsLedger,
        runtime_id: RuntimeId,
        player_id: &str,
        kind: StatKind,
        at: DateTime<Utc>,
    ) -> QuestResult<String> {
        validate_transition(runtime_id, player_id)?;

        let mut events = Vec::new();
        let full_name = self
            .state
            .release(runtime_id, player_id, kind, at, &mut events)?;
        info!("Quest '{}' {} by player {}", full_name, kind.as_str(), player_id);

        self.commit(ledger, events)?;
        Ok(full_name)
    }

    /// Resynchronise with the host's view of a player's quest log.
    ///
    /// Works on a copy of the registry; on error nothing is committed and no
    /// stat events are recorded.
    pub fn refresh_from_host_log(
        &mut self,
        store: &QuestDefinitionStore,
        ledger: &mut StatsLedger,
        player_id: &str,
        log: &HostQuestLog,
        at: DateTime<Utc>,
    ) -> QuestResult<ReconcileOutcome> {
        if player_id.is_empty() {
            return Err(QuestError::validation("refresh without player"));
        }

        let mut next = self.state.clone();
        let mut events = Vec::new();
        let mut outcome = ReconcileOutcome::new(player_id);

        outcome.orphaned = next.sync(store);
        if outcome.orphaned > 0 {
            warn!("Dropped {} orphaned quest bindings", outcome.orphaned);
        }

        let mut live_ids = HashSet::new();
        for entry in &log.live {
            if !live_ids.insert(entry.runtime_id) {
                return Err(QuestError::consistency(format!(
                    "runtime ID {} appears twice in the quest log of player {}",
                    entry.runtime_id, player_id
                )));
            }
        }
        let completed: HashSet<RuntimeId> = log.completed.iter().copied().collect();

        // Quests this player already holds under a live runtime ID
        let mut claimed = HashSet::new();
        for entry in &log.live {
            if let Some(owner) = next.by_runtime_id.get(&entry.runtime_id) {
                if owner.player_id != player_id {
                    return Err(QuestError::consistency(format!(
                        "runtime ID {} of player {} is bound to player {}",
                        entry.runtime_id, player_id, owner.player_id
                    )));
                }
                if !completed.contains(&entry.runtime_id) {
                    claimed.insert(owner.full_name.clone());
                }
            }
        }

        // Untracked live entries that resolve to a known template
        let mut fresh: Vec<(RuntimeId, Arc<QuestTemplate>)> = Vec::new();
        for entry in &log.live {
            if next.by_runtime_id.contains_key(&entry.runtime_id)
                || completed.contains(&entry.runtime_id)
            {
                continue;
            }
            let Some(name) = entry.quest_name.as_deref() else {
                continue;
            };
            let Ok(template) = self.fetch(store, name) else {
                debug!("Quest #{} ('{}') is not managed", entry.runtime_id, name);
                continue;
            };
            if !claimed.insert(template.full_name()) {
                return Err(QuestError::consistency(format!(
                    "quest '{}' is in the log of player {} more than once",
                    template.full_name(),
                    player_id
                )));
            }
            fresh.push((entry.runtime_id, template));
        }

        for (runtime_id, full_name) in next.bindings_of(player_id) {
            if completed.contains(&runtime_id) {
                next.release(runtime_id, player_id, StatKind::Completed, at, &mut events)?;
                outcome.completed.push(full_name);
            } else if live_ids.contains(&runtime_id) {
                continue;
            } else if let Some(pos) = fresh.iter().position(|(_, t)| t.full_name() == full_name) {
                let (new_id, template) = fresh.remove(pos);
                next.bind(&template, player_id, new_id, at, &mut events)?;
                outcome.reassigned.push(full_name);
            } else {
                next.release(runtime_id, player_id, StatKind::Removed, at, &mut events)?;
                outcome.removed.push(full_name);
            }
        }

        for (runtime_id, template) in fresh {
            next.bind(&template, player_id, runtime_id, at, &mut events)?;
            outcome.accepted.push(template.full_name());
        }

        self.state = next;
        self.commit(ledger, events)?;

        if !outcome.is_empty() {
            info!(
                "Reconciled quest log of player {}: {} accepted, {} completed, {} removed, {} reassigned",
                player_id,
                outcome.accepted.len(),
                outcome.completed.len(),
                outcome.removed.len(),
                outcome.reassigned.len()
            );
        }
        Ok(outcome)
    }

    /// Observe the store: add newly registered templates as inactive
    /// instances and drop orphans. Returns the number of bindings dropped.
    pub fn prune_orphans(&mut self, store: &QuestDefinitionStore) -> usize {
        let dropped = self.state.sync(store);
        self.active_cache.take();
        if dropped > 0 {
            warn!("Deactivated {} quests whose template was unregistered", dropped);
        }
        dropped
    }

    /// Every known instance, active and inactive, in observation order
    pub fn list_managed(&self) -> impl Iterator<Item = &ManagedQuest> {
        self.state.quests.iter()
    }

    /// Currently active managed quests across all players
    pub fn active_quests(&self) -> &[ActiveQuest] {
        self.active_cache.get_or_init(|| {
            self.state
                .quests
                .iter()
                .flat_map(|q| {
                    let full_name = q.full_name();
                    q.bindings()
                        .map(|(player, id)| ActiveQuest {
                            full_name: full_name.clone(),
                            player_id: player.to_string(),
                            runtime_id: id,
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        })
    }

    /// Drop the derived active-quest view
    pub fn invalidate(&mut self) {
        self.active_cache.take();
    }

    pub fn len(&self) -> usize {
        self.state.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.quests.is_empty()
    }

    fn commit(&mut self, ledger: &mut StatsLedger, events: Vec<StatEvent>) -> QuestResult<()> {
        self.active_cache.take();
        for event in events {
            ledger.record(event)?;
        }
        Ok(())
    }
}

impl Default for QuestRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

fn validate_transition(runtime_id: RuntimeId, player_id: &str) -> QuestResult<()> {
    if runtime_id < 0 {
        return Err(QuestError::validation(format!("invalid runtime ID {}", runtime_id)));
    }
    if player_id.is_empty() {
        return Err(QuestError::validation("transition without player"));
    }
    Ok(())
}
