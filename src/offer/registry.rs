//! Quest Offer Registry
//!
//! Holds offer definitions per owner and works out which offers a player
//! sees on the board at a given time.

use std::collections::HashMap;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::definition::{OfferDefinition, OfferSchedule, QuestOffer};
use crate::error::{QuestError, QuestResult};
use crate::quest::QuestDefinitionStore;

#[derive(Debug, Clone)]
struct RegisteredOffer {
    owner_id: String,
    full_name: String,
    definition: OfferDefinition,
}

/// Registry for quest offers
#[derive(Debug, Default)]
pub struct OfferRegistry {
    /// Offers in registration order, one per offered quest
    offers: Vec<RegisteredOffer>,
    /// (full name, player) -> when the offer was used
    used: HashMap<(String, String), DateTime<Utc>>,
    /// player -> eligible offers at the last instant asked for
    cache: HashMap<String, (DateTime<Utc>, Vec<QuestOffer>)>,
}

impl OfferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an offer; a later offer for the same quest replaces it
    pub fn register(&mut self, owner_id: &str, definition: OfferDefinition) -> QuestResult<()> {
        definition.validate()?;
        if owner_id.is_empty() {
            return Err(QuestError::validation(format!(
                "offer of '{}' has no owner",
                definition.quest
            )));
        }

        let full_name = definition.full_name(owner_id);
        let offer = RegisteredOffer {
            owner_id: owner_id.to_string(),
            full_name: full_name.clone(),
            definition,
        };

        match self.offers.iter_mut().find(|o| o.full_name == full_name) {
            Some(existing) => {
                warn!("Duplicate offer for '{}', overwriting", full_name);
                *existing = offer;
            }
            None => self.offers.push(offer),
        }

        self.cache.clear();
        Ok(())
    }

    /// Remove every offer registered by `owner_id`
    pub fn unregister_all(&mut self, owner_id: &str) -> usize {
        let before = self.offers.len();
        self.offers.retain(|o| o.owner_id != owner_id);
        let removed = before - self.offers.len();

        if removed > 0 {
            info!("Unregistered {} quest offers of '{}'", removed, owner_id);
            self.cache.clear();
        }
        removed
    }

    /// Offers on the board for a player at `as_of`, excluding used ones.
    ///
    /// Offers whose quest template is no longer registered are skipped.
    pub fn compute_offers(
        &mut self,
        store: &QuestDefinitionStore,
        player_id: &str,
        as_of: DateTime<Utc>,
    ) -> QuestResult<Vec<QuestOffer>> {
        if player_id.is_empty() {
            return Err(QuestError::validation("offers requested without player"));
        }

        if let Some((cached_at, cached)) = self.cache.get(player_id) {
            if *cached_at == as_of {
                return Ok(cached.clone());
            }
        }

        let mut eligible = Vec::new();
        for offer in &self.offers {
            let definition = &offer.definition;
            if !definition.window.contains(as_of)
                || !definition.schedule.is_scheduled(&offer.full_name, player_id, as_of)
                || self.is_used(offer, player_id, as_of)
            {
                continue;
            }

            let Some(template) = store.get(&offer.full_name) else {
                debug!("Offer for unknown quest '{}' skipped", offer.full_name);
                continue;
            };

            eligible.push(QuestOffer {
                template: template.clone(),
                owner_id: offer.owner_id.clone(),
                window: definition.window,
                schedule: definition.schedule.clone(),
            });
        }

        debug!(
            "Computed {} quest offers for player {} at {}",
            eligible.len(),
            player_id,
            as_of
        );
        self.cache
            .insert(player_id.to_string(), (as_of, eligible.clone()));
        Ok(eligible)
    }

    fn is_used(&self, offer: &RegisteredOffer, player_id: &str, as_of: DateTime<Utc>) -> bool {
        let key = (offer.full_name.clone(), player_id.to_string());
        match self.used.get(&key) {
            None => false,
            // Daily offers come back the next day
            Some(used_at) if offer.definition.schedule == OfferSchedule::Daily => {
                used_at.date_naive() == as_of.date_naive()
            }
            Some(_) => true,
        }
    }

    /// Mark an offer as accepted or expired for a player. Marking an already
    /// used offer again changes nothing.
    pub fn mark_used(
        &mut self,
        full_name: &str,
        player_id: &str,
        at: DateTime<Utc>,
    ) -> QuestResult<()> {
        if full_name.is_empty() || player_id.is_empty() {
            return Err(QuestError::validation("mark_used needs a quest and a player"));
        }

        let Some(offer) = self.offers.iter().find(|o| o.full_name == full_name) else {
            return Err(QuestError::NotFound(full_name.to_string()));
        };
        if self.is_used(offer, player_id, at) {
            return Ok(());
        }

        self.used
            .insert((full_name.to_string(), player_id.to_string()), at);
        self.cache.remove(player_id);
        debug!("Offer '{}' used by player {}", full_name, player_id);
        Ok(())
    }

    /// Whether the player has used the offer as of `as_of`
    pub fn is_used_by(&self, full_name: &str, player_id: &str, as_of: DateTime<Utc>) -> bool {
        self.offers
            .iter()
            .find(|o| o.full_name == full_name)
            .is_some_and(|offer| self.is_used(offer, player_id, as_of))
    }

    /// Drop cached results; the next `compute_offers` starts from scratch
    pub fn refresh(&mut self) {
        self.cache.clear();
    }

    /// Number of players with a cached result
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}
