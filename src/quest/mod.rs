//! Quest Module
//!
//! Template store, managed-quest registry and the host quest log types the
//! registry reconciles against.

pub mod definition;
pub mod events;
pub mod registry;
pub mod state;
pub mod store;

pub use definition::{QuestTemplate, QuestType, RawQuestTemplate};
pub use events::{HostQuestLog, LiveQuest, ReconcileOutcome};
pub use registry::{BindOutcome, QuestRegistry};
pub use state::{ActiveQuest, ManagedQuest, RuntimeId, INACTIVE_ID};
pub use store::QuestDefinitionStore;
