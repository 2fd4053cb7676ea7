pub mod definition;
pub mod registry;

pub use definition::{AvailabilityWindow, OfferDefinition, OfferSchedule, QuestOffer};
pub use registry::OfferRegistry;
