//! Quest Framework Coordinator
//!
//! Owns the template store, both registries and the stats ledger, and is the
//! single entry point for content loading, lifecycle calls and refreshes.
//! Dependent extensions read through it and subscribe to refresh
//! notifications instead of reaching into global state.

use std::collections::BTreeMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::FrameworkConfig;
use crate::content::ContentPack;
use crate::error::{QuestError, QuestResult};
use crate::offer::{OfferRegistry, QuestOffer};
use crate::quest::{
    BindOutcome, HostQuestLog, ManagedQuest, QuestDefinitionStore, QuestRegistry,
    QuestTemplate, ReconcileOutcome, RuntimeId,
};
use crate::stats::{QuestStatSummary, StatsLedger, StatsStore};

/// The host game as seen by a refresh
pub trait QuestHost {
    /// Players whose quest logs should be reconciled
    fn players(&self) -> Vec<String>;
    /// Current quest log of a player
    fn quest_log(&self, player_id: &str) -> HostQuestLog;
    /// Current time for offer evaluation and stat timestamps
    fn now(&self) -> DateTime<Utc>;
}

/// Lifecycle status of the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameworkStatus {
    /// No content has been loaded yet
    Initializing,
    /// Content is loaded and the framework accepts lifecycle calls
    Ready,
}

/// Summary handed to refresh listeners
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub as_of: Option<DateTime<Utc>>,
    /// Reconciliation result per player
    pub players: Vec<ReconcileOutcome>,
    /// player_id -> eligible offers after the refresh
    pub offers: BTreeMap<String, Vec<QuestOffer>>,
}

pub type RefreshListener = Box<dyn FnMut(&RefreshReport)>;

/// Not `Sync`: all calls are expected from the host's game thread.
pub struct QuestFramework {
    config: FrameworkConfig,
    clock: Box<dyn Clock>,
    store: QuestDefinitionStore,
    registry: QuestRegistry,
    offers: OfferRegistry,
    ledger: StatsLedger,
    listeners: Vec<RefreshListener>,
    status: FrameworkStatus,
}

impl QuestFramework {
    pub fn new(config: FrameworkConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_clock(config: FrameworkConfig, clock: impl Clock + 'static) -> Self {
        let registry = QuestRegistry::new(config.bare_name_fallback);
        Self {
            config,
            clock: Box::new(clock),
            store: QuestDefinitionStore::new(),
            registry,
            offers: OfferRegistry::new(),
            ledger: StatsLedger::new(),
            listeners: Vec::new(),
            status: FrameworkStatus::Initializing,
        }
    }

    pub fn status(&self) -> FrameworkStatus {
        self.status
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn store(&self) -> &QuestDefinitionStore {
        &self.store
    }

    pub fn registry(&self) -> &QuestRegistry {
        &self.registry
    }

    pub fn offers(&self) -> &OfferRegistry {
        &self.offers
    }

    pub fn ledger(&self) -> &StatsLedger {
        &self.ledger
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Register a provider's quests and offers, replacing whatever it had
    /// registered before. Nothing changes if any definition is invalid.
    pub fn load_content(&mut self, pack: &ContentPack) -> QuestResult<usize> {
        if pack.owner.is_empty() {
            return Err(QuestError::validation("content pack has no owner"));
        }

        let templates = pack
            .quests
            .iter()
            .map(|raw| QuestTemplate::from_raw(&pack.owner, raw))
            .collect::<QuestResult<Vec<_>>>()?;
        for offer in &pack.offers {
            offer.validate()?;
        }

        self.store.unregister_all(&pack.owner);
        self.offers.unregister_all(&pack.owner);

        let count = templates.len();
        for template in templates {
            self.store.register(template)?;
        }
        for offer in &pack.offers {
            self.offers.register(&pack.owner, offer.clone())?;
        }

        self.registry.prune_orphans(&self.store);
        self.offers.refresh();
        self.status = FrameworkStatus::Ready;

        info!(
            "Loaded {} quests and {} offers from '{}'",
            count,
            pack.offers.len(),
            pack.owner
        );
        Ok(count)
    }

    /// Drop everything a provider registered; its active quests are deactivated
    pub fn unload_content(&mut self, owner_id: &str) -> usize {
        let removed = self.store.unregister_all(owner_id);
        self.offers.unregister_all(owner_id);
        self.registry.prune_orphans(&self.store);
        self.offers.refresh();
        removed.len()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn fetch(&self, name: &str) -> QuestResult<Arc<QuestTemplate>> {
        self.registry.fetch(&self.store, name)
    }

    pub fn is_managed(&self, runtime_id: RuntimeId) -> bool {
        self.registry.is_managed(runtime_id)
    }

    pub fn get_by_runtime_id(&self, runtime_id: RuntimeId) -> QuestResult<&ManagedQuest> {
        self.registry.get_by_runtime_id(runtime_id)
    }

    pub fn list_managed(&self) -> impl Iterator<Item = &ManagedQuest> {
        self.registry.list_managed()
    }

    pub fn activate(
        &mut self,
        full_name: &str,
        runtime_id: RuntimeId,
        player_id: &str,
    ) -> QuestResult<BindOutcome> {
        let now = self.clock.now();
        self.registry.activate(
            &self.store,
            &mut self.ledger,
            full_name,
            runtime_id,
            player_id,
            now,
        )
    }

    pub fn complete(&mut self, runtime_id: RuntimeId, player_id: &str) -> QuestResult<String> {
        let now = self.clock.now();
        self.registry
            .complete(&mut self.ledger, runtime_id, player_id, now)
            .inspect_err(|e| log_unmanaged(e, "complete"))
    }

    pub fn remove(&mut self, runtime_id: RuntimeId, player_id: &str) -> QuestResult<String> {
        let now = self.clock.now();
        self.registry
            .remove(&mut self.ledger, runtime_id, player_id, now)
            .inspect_err(|e| log_unmanaged(e, "remove"))
    }

    pub fn summary_for(&self, full_name: &str, player_id: &str) -> QuestStatSummary {
        self.ledger.summary_for(full_name, player_id)
    }

    // ------------------------------------------------------------------
    // Offers
    // ------------------------------------------------------------------

    pub fn compute_offers(
        &mut self,
        player_id: &str,
        as_of: DateTime<Utc>,
    ) -> QuestResult<Vec<QuestOffer>> {
        self.offers.compute_offers(&self.store, player_id, as_of)
    }

    pub fn mark_used(&mut self, full_name: &str, player_id: &str) -> QuestResult<()> {
        let now = self.clock.now();
        self.offers.mark_used(full_name, player_id, now)
    }

    // ------------------------------------------------------------------
    // Cache and refresh
    // ------------------------------------------------------------------

    /// Clear derived views without touching templates or statistics
    pub fn invalidate(&mut self) {
        self.registry.invalidate();
        self.offers.refresh();
        debug!("Quest caches invalidated");
    }

    /// Rebuild all derived state from the host and notify listeners.
    ///
    /// Every player is reconciled against a copy of the registry and ledger.
    /// The copy replaces the live state only once all players succeed; a
    /// consistency error leaves the framework as it was before the call and
    /// listeners are not notified.
    pub fn force_refresh(&mut self, host: &dyn QuestHost) -> QuestResult<RefreshReport> {
        info!("Force refresh requested");
        self.invalidate();

        let as_of = host.now();
        let mut report = RefreshReport {
            as_of: Some(as_of),
            ..Default::default()
        };

        let players = host.players();
        let mut registry = self.registry.clone();
        let mut ledger = self.ledger.clone();
        for player_id in &players {
            let log = host.quest_log(player_id);
            let outcome = registry
                .refresh_from_host_log(&self.store, &mut ledger, player_id, &log, as_of)
                .inspect_err(|e| warn!("Refresh of player {} failed: {}", player_id, e))?;
            report.players.push(outcome);
        }
        self.registry = registry;
        self.ledger = ledger;

        for player_id in players {
            let offers = self.offers.compute_offers(&self.store, &player_id, as_of)?;
            report.offers.insert(player_id, offers);
        }

        for listener in &mut self.listeners {
            listener(&report);
        }
        Ok(report)
    }

    /// Call `listener` after every successful `force_refresh`
    pub fn subscribe(&mut self, listener: impl FnMut(&RefreshReport) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn load_stats(&mut self, store: &dyn StatsStore, player_id: &str) -> QuestResult<usize> {
        let events = store.load(player_id)?;
        let count = events.len();
        self.ledger.load_player(player_id, events)?;
        Ok(count)
    }

    pub fn save_stats(&self, store: &mut dyn StatsStore, player_id: &str) -> QuestResult<()> {
        store.save(player_id, self.ledger.events_for(player_id))?;
        Ok(())
    }
}

fn log_unmanaged(error: &QuestError, action: &str) {
    if let QuestError::NotManaged(id) = error {
        debug!("Ignoring {} of unmanaged quest #{}", action, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::offer::{OfferDefinition, OfferSchedule};
    use crate::quest::{LiveQuest, RawQuestTemplate};
    use crate::stats::{MemoryStatsStore, StatKind};
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    struct TestHost {
        logs: HashMap<String, HostQuestLog>,
        now: DateTime<Utc>,
    }

    impl QuestHost for TestHost {
        fn players(&self) -> Vec<String> {
            let mut players: Vec<String> = self.logs.keys().cloned().collect();
            players.sort();
            players
        }

        fn quest_log(&self, player_id: &str) -> HostQuestLog {
            self.logs.get(player_id).cloned().unwrap_or_default()
        }

        fn now(&self) -> DateTime<Utc> {
            self.now
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    fn raw(name: &str, base_type: &str, custom_type: Option<&str>) -> RawQuestTemplate {
        RawQuestTemplate {
            name: name.to_string(),
            base_type: base_type.to_string(),
            custom_type: custom_type.map(str::to_string),
            trigger: None,
            cancelable: false,
        }
    }

    fn pack_a() -> ContentPack {
        let mut pack = ContentPack::new("ownerA");
        pack.quests.push(raw("FetchWood", "custom", Some("fetch")));
        pack.quests.push(raw("CatchCarp", "fishing", None));
        pack.offers
            .push(OfferDefinition::new("CatchCarp", OfferSchedule::Always));
        pack
    }

    fn framework() -> QuestFramework {
        let mut framework = QuestFramework::with_clock(FrameworkConfig::default(), FixedClock(now()));
        framework.load_content(&pack_a()).unwrap();
        framework
    }

    fn host(player: &str, log: HostQuestLog) -> TestHost {
        TestHost {
            logs: HashMap::from([(player.to_string(), log)]),
            now: now(),
        }
    }

    #[test]
    fn test_fetch_wood_scenario() {
        let mut framework = framework();
        assert_eq!(framework.status(), FrameworkStatus::Ready);

        framework.activate("ownerA.FetchWood", 7, "1").unwrap();
        let template = framework.fetch("ownerA.FetchWood").unwrap();
        assert_eq!(template.custom_type_id.as_deref(), Some("fetch"));
        assert!(framework.is_managed(7));

        framework.complete(7, "1").unwrap();
        let summary = framework.summary_for("ownerA.FetchWood", "1");
        assert_eq!(summary.acceptal_count, 1);
        assert_eq!(summary.completion_count, 1);

        let kinds: Vec<StatKind> = framework.ledger().events_for("1").iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![StatKind::Accepted, StatKind::Completed]);
    }

    #[test]
    fn test_orphan_after_unregister() {
        let mut framework = framework();
        framework.activate("ownerA.FetchWood", 7, "1").unwrap();

        assert_eq!(framework.unload_content("ownerA"), 2);
        assert!(!framework.is_managed(7));

        let host = host("1", HostQuestLog::new(vec![LiveQuest::new(7, "ownerA.FetchWood")]));
        let report = framework.force_refresh(&host).unwrap();
        assert!(report.players[0].is_empty());
        assert!(!framework.is_managed(7));
        assert_eq!(framework.ledger().len(), 1);
        assert!(framework.list_managed().next().is_none());
    }

    #[test]
    fn test_reload_replaces_templates() {
        let mut framework = framework();
        framework.activate("ownerA.FetchWood", 7, "1").unwrap();

        let mut reloaded = ContentPack::new("ownerA");
        reloaded.quests.push(raw("FetchWood", "custom", Some("gather")));
        framework.load_content(&reloaded).unwrap();

        assert_eq!(
            framework.fetch("ownerA.FetchWood").unwrap().custom_type_id.as_deref(),
            Some("gather")
        );
        assert!(matches!(framework.fetch("ownerA.CatchCarp"), Err(QuestError::NotFound(_))));
        // The surviving quest keeps its binding and sees the new template
        assert!(framework.is_managed(7));
        let quest = framework.get_by_runtime_id(7).unwrap();
        assert_eq!(quest.template.custom_type_id.as_deref(), Some("gather"));
        assert!(framework.offers().is_empty());
    }

    #[test]
    fn test_invalid_pack_changes_nothing() {
        let mut framework = framework();
        let mut broken = ContentPack::new("ownerA");
        broken.quests.push(raw("Broken", "custom", None));

        assert!(matches!(framework.load_content(&broken), Err(QuestError::Validation(_))));
        assert!(framework.fetch("ownerA.FetchWood").is_ok());
        assert_eq!(framework.store().len(), 2);
    }

    #[test]
    fn test_force_refresh_notifies_listeners() {
        let mut framework = framework();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        framework.subscribe(move |report| {
            sink.borrow_mut().push(report.players.len());
        });

        let host = host(
            "1",
            HostQuestLog::new(vec![LiveQuest::new(3, "FetchWood"), LiveQuest::native(4)]),
        );
        let report = framework.force_refresh(&host).unwrap();

        assert_eq!(report.players[0].accepted, vec!["ownerA.FetchWood"]);
        assert_eq!(report.offers["1"].len(), 1);
        assert_eq!(report.offers["1"][0].full_name(), "ownerA.CatchCarp");
        assert!(framework.is_managed(3));
        assert!(!framework.is_managed(4));
        assert_eq!(*seen.borrow(), vec![1]);

        // Second refresh with the same log records nothing new
        framework.force_refresh(&host).unwrap();
        assert_eq!(framework.ledger().len(), 1);
        assert_eq!(*seen.borrow(), vec![1, 1]);
    }

    #[test]
    fn test_failed_refresh_skips_listeners() {
        let mut framework = framework();
        let fired = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&fired);
        framework.subscribe(move |_| *sink.borrow_mut() += 1);

        let host = host(
            "1",
            HostQuestLog::new(vec![LiveQuest::native(3), LiveQuest::native(3)]),
        );
        assert!(matches!(framework.force_refresh(&host), Err(QuestError::Consistency(_))));
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn test_failed_refresh_reverts_every_player() {
        let mut framework = framework();
        framework.activate("ownerA.FetchWood", 7, "2").unwrap();

        // Player 1 reconciles cleanly, player 2 reports a duplicate ID
        let host = TestHost {
            logs: HashMap::from([
                ("1".to_string(), HostQuestLog::new(vec![LiveQuest::new(3, "CatchCarp")])),
                ("2".to_string(), HostQuestLog::new(vec![LiveQuest::native(5), LiveQuest::native(5)])),
            ]),
            now: now(),
        };
        assert!(matches!(framework.force_refresh(&host), Err(QuestError::Consistency(_))));

        assert!(!framework.is_managed(3));
        assert!(framework.is_managed(7));
        assert!(framework.ledger().events_for("1").is_empty());
        assert_eq!(framework.ledger().len(), 1);
    }

    #[test]
    fn test_mark_used_hides_offer() {
        let mut framework = framework();
        assert_eq!(framework.compute_offers("1", now()).unwrap().len(), 1);
        framework.mark_used("ownerA.CatchCarp", "1").unwrap();
        framework.mark_used("ownerA.CatchCarp", "1").unwrap();
        assert!(framework.compute_offers("1", now()).unwrap().is_empty());
    }

    #[test]
    fn test_unmanaged_transition_is_signalled() {
        let mut framework = framework();
        assert!(matches!(framework.complete(42, "1"), Err(QuestError::NotManaged(42))));
        assert!(matches!(framework.remove(42, "1"), Err(QuestError::NotManaged(42))));
        assert!(framework.ledger().is_empty());
    }

    #[test]
    fn test_stats_persistence() {
        let mut framework = framework();
        framework.activate("ownerA.FetchWood", 7, "1").unwrap();
        framework.remove(7, "1").unwrap();

        let mut store = MemoryStatsStore::new();
        framework.save_stats(&mut store, "1").unwrap();

        let mut restored = QuestFramework::with_clock(FrameworkConfig::default(), FixedClock(now()));
        assert_eq!(restored.load_stats(&store, "1").unwrap(), 2);
        assert_eq!(restored.summary_for("ownerA.FetchWood", "1").removal_count, 1);
        assert_eq!(restored.status(), FrameworkStatus::Initializing);
    }
}
