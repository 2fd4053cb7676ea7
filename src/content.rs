//! Content Pack Model
//!
//! The already-parsed output of the content pipeline: one provider's quests
//! and offers.

use serde::Deserialize;

use crate::offer::OfferDefinition;
use crate::quest::RawQuestTemplate;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentPack {
    /// Identifier of the providing content source
    pub owner: String,
    #[serde(default)]
    pub quests: Vec<RawQuestTemplate>,
    #[serde(default)]
    pub offers: Vec<OfferDefinition>,
}

impl ContentPack {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            ..Default::default()
        }
    }
}
