//! Quest framework core
//!
//! Registry, lifecycle state machine and statistics ledger for quests that
//! third-party content providers add to a host game's quest log and bulletin
//! board.
//!
//! Everything here is synchronous and in-memory, and nothing is internally
//! synchronised: drive it from the host's game thread, or guard it with your
//! own lock.

pub mod clock;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod framework;
pub mod offer;
pub mod quest;
pub mod stats;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::FrameworkConfig;
pub use content::ContentPack;
pub use error::{QuestError, QuestResult, StoreError};
pub use framework::{FrameworkStatus, QuestFramework, QuestHost, RefreshReport};
pub use offer::{AvailabilityWindow, OfferDefinition, OfferRegistry, OfferSchedule, QuestOffer};
pub use quest::{
    HostQuestLog, LiveQuest, ManagedQuest, QuestDefinitionStore, QuestRegistry, QuestTemplate,
    QuestType, RuntimeId,
};
pub use stats::{QuestStatSummary, StatEvent, StatKind, StatsLedger, StatsStore};
