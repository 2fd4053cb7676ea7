//! Quest Offer Definitions
//!
//! Offers are time-windowed opportunities to accept a quest, declared by
//! content providers next to their quests.

use chrono::{DateTime, Datelike, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::error::{QuestError, QuestResult};
use crate::quest::definition::{split_full_name, QuestTemplate, NAME_SEPARATOR};

/// When, inside its window, an offer is on the board
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OfferSchedule {
    /// Every moment of the window
    #[default]
    Always,
    /// Every day of the window; acceptance only uses it up for that day
    Daily,
    /// On the listed weekdays
    Weekly { days: Vec<Weekday> },
    /// During the listed months (1-12)
    Seasonal { months: Vec<u32> },
    /// Each day with the given probability, reproducible per player and date
    Random { chance: f64 },
}

impl OfferSchedule {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferSchedule::Always => "always",
            OfferSchedule::Daily => "daily",
            OfferSchedule::Weekly { .. } => "weekly",
            OfferSchedule::Seasonal { .. } => "seasonal",
            OfferSchedule::Random { .. } => "random",
        }
    }

    /// Whether the schedule puts the offer on the board at `as_of`
    pub fn is_scheduled(&self, full_name: &str, player_id: &str, as_of: DateTime<Utc>) -> bool {
        match self {
            OfferSchedule::Always | OfferSchedule::Daily => true,
            OfferSchedule::Weekly { days } => days.contains(&as_of.weekday()),
            OfferSchedule::Seasonal { months } => months.contains(&as_of.month()),
            OfferSchedule::Random { chance } => {
                let mut rng = StdRng::seed_from_u64(offer_seed(full_name, player_id, as_of));
                rng.gen_range(0.0..1.0) < *chance
            }
        }
    }

    fn validate(&self) -> QuestResult<()> {
        match self {
            OfferSchedule::Random { chance } if !(0.0..=1.0).contains(chance) => Err(
                QuestError::validation(format!("offer chance {} is not within 0..=1", chance)),
            ),
            OfferSchedule::Seasonal { months } if months.iter().any(|m| !(1..=12).contains(m)) => {
                Err(QuestError::validation("offer months must be within 1..=12"))
            }
            _ => Ok(()),
        }
    }
}

/// Seed for randomized schedules, stable across runs and platforms
fn offer_seed(full_name: &str, player_id: &str, as_of: DateTime<Utc>) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(full_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(player_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(as_of.date_naive().num_days_from_ce().to_le_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Half-open availability window, unbounded where a side is absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl AvailabilityWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, as_of: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| start <= as_of) && self.end.map_or(true, |end| as_of < end)
    }
}

/// An offer as declared by a content provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferDefinition {
    /// Quest to offer; a bare name refers to a quest of the same owner
    pub quest: String,
    #[serde(default)]
    pub schedule: OfferSchedule,
    #[serde(default)]
    pub window: AvailabilityWindow,
}

impl OfferDefinition {
    pub fn new(quest: &str, schedule: OfferSchedule) -> Self {
        Self {
            quest: quest.to_string(),
            schedule,
            window: AvailabilityWindow::default(),
        }
    }

    pub fn with_window(mut self, window: AvailabilityWindow) -> Self {
        self.window = window;
        self
    }

    /// Fully-qualified name of the offered quest
    pub fn full_name(&self, owner_id: &str) -> String {
        match split_full_name(&self.quest) {
            Some(_) => self.quest.clone(),
            None => format!("{}{}{}", owner_id, NAME_SEPARATOR, self.quest),
        }
    }

    pub fn validate(&self) -> QuestResult<()> {
        if self.quest.is_empty() {
            return Err(QuestError::validation("offer has no quest"));
        }
        if let (Some(start), Some(end)) = (self.window.start, self.window.end) {
            if start >= end {
                return Err(QuestError::validation(format!(
                    "offer window of '{}' ends before it starts",
                    self.quest
                )));
            }
        }
        self.schedule.validate()
    }
}

/// An offer currently on the board for a player
#[derive(Debug, Clone, PartialEq)]
pub struct QuestOffer {
    pub template: Arc<QuestTemplate>,
    pub owner_id: String,
    pub window: AvailabilityWindow,
    pub schedule: OfferSchedule,
}

impl QuestOffer {
    pub fn full_name(&self) -> String {
        self.template.full_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_window_is_half_open() {
        let window = AvailabilityWindow::new(Some(day(2024, 3, 1)), Some(day(2024, 3, 5)));
        assert!(!window.contains(day(2024, 2, 29)));
        assert!(window.contains(day(2024, 3, 1)));
        assert!(window.contains(day(2024, 3, 4)));
        assert!(!window.contains(day(2024, 3, 5)));
        assert!(AvailabilityWindow::default().contains(day(1999, 1, 1)));
    }

    #[test]
    fn test_weekly_and_seasonal() {
        // 2024-03-04 is a Monday
        let weekly = OfferSchedule::Weekly {
            days: vec![Weekday::Mon, Weekday::Fri],
        };
        assert!(weekly.is_scheduled("a.Q", "1", day(2024, 3, 4)));
        assert!(!weekly.is_scheduled("a.Q", "1", day(2024, 3, 5)));

        let seasonal = OfferSchedule::Seasonal { months: vec![12, 1, 2] };
        assert!(seasonal.is_scheduled("a.Q", "1", day(2024, 1, 15)));
        assert!(!seasonal.is_scheduled("a.Q", "1", day(2024, 6, 15)));
    }

    #[test]
    fn test_random_is_reproducible() {
        let schedule = OfferSchedule::Random { chance: 0.5 };
        for d in 1..=28 {
            let as_of = day(2024, 2, d);
            let first = schedule.is_scheduled("a.Q", "1", as_of);
            assert_eq!(first, schedule.is_scheduled("a.Q", "1", as_of));
        }
        assert!(OfferSchedule::Random { chance: 1.0 }.is_scheduled("a.Q", "1", day(2024, 2, 1)));
        assert!(!OfferSchedule::Random { chance: 0.0 }.is_scheduled("a.Q", "1", day(2024, 2, 1)));
    }

    #[test]
    fn test_full_name_resolution() {
        let offer = OfferDefinition::new("FetchWood", OfferSchedule::Daily);
        assert_eq!(offer.full_name("ownerA"), "ownerA.FetchWood");
        let offer = OfferDefinition::new("ownerB.Fishing", OfferSchedule::Daily);
        assert_eq!(offer.full_name("ownerA"), "ownerB.Fishing");
    }

    #[test]
    fn test_validation() {
        assert!(OfferDefinition::new("Q", OfferSchedule::Random { chance: 1.5 }).validate().is_err());
        assert!(OfferDefinition::new("Q", OfferSchedule::Seasonal { months: vec![13] }).validate().is_err());
        assert!(OfferDefinition::new("", OfferSchedule::Always).validate().is_err());
        let inverted = OfferDefinition::new("Q", OfferSchedule::Always)
            .with_window(AvailabilityWindow::new(Some(day(2024, 3, 5)), Some(day(2024, 3, 1))));
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_schedule_from_toml() {
        let offer: OfferDefinition = toml::from_str(
            r#"
quest = "FetchWood"

[schedule]
kind = "weekly"
days = ["Mon", "Thu"]

[window]
start = "2024-03-01T00:00:00Z"
"#,
        )
        .unwrap();
        assert_eq!(
            offer.schedule,
            OfferSchedule::Weekly {
                days: vec![Weekday::Mon, Weekday::Thu]
            }
        );
        assert!(offer.window.start.is_some());
        assert!(offer.window.end.is_none());
    }
}
