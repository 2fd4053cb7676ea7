//! Quest Template Structures
//!
//! Templates arrive from the content pipeline already parsed. The raw form
//! mirrors what a content pack declares; the resolved form carries the owner.

use serde::{Deserialize, Serialize};

use crate::error::{QuestError, QuestResult};

/// Separator between owner and quest name in a fully-qualified name
pub const NAME_SEPARATOR: char = '.';

/// Raw quest data as it appears in a content pack
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestTemplate {
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub base_type: String,
    /// Required when `type = "custom"`
    #[serde(default)]
    pub custom_type: Option<String>,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub cancelable: bool,
}

fn default_type() -> String {
    "basic".to_string()
}

/// Host-native quest kinds, plus `Custom` for provider-defined ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestType {
    Basic,
    Crafting,
    ItemDelivery,
    ItemHarvest,
    Location,
    LostItem,
    SecretLostItem,
    Fishing,
    Building,
    Monster,
    Social,
    Custom,
}

impl QuestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestType::Basic => "Basic",
            QuestType::Crafting => "Crafting",
            QuestType::ItemDelivery => "ItemDelivery",
            QuestType::ItemHarvest => "ItemHarvest",
            QuestType::Location => "Location",
            QuestType::LostItem => "LostItem",
            QuestType::SecretLostItem => "SecretLostItem",
            QuestType::Fishing => "Fishing",
            QuestType::Building => "Building",
            QuestType::Monster => "Monster",
            QuestType::Social => "Social",
            QuestType::Custom => "Custom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "basic" => Some(QuestType::Basic),
            "crafting" => Some(QuestType::Crafting),
            "itemdelivery" | "item_delivery" | "delivery" => Some(QuestType::ItemDelivery),
            "itemharvest" | "item_harvest" | "harvest" => Some(QuestType::ItemHarvest),
            "location" => Some(QuestType::Location),
            "lostitem" | "lost_item" => Some(QuestType::LostItem),
            "secretlostitem" | "secret_lost_item" => Some(QuestType::SecretLostItem),
            "fishing" => Some(QuestType::Fishing),
            "building" => Some(QuestType::Building),
            "monster" | "slay_monster" => Some(QuestType::Monster),
            "social" => Some(QuestType::Social),
            "custom" => Some(QuestType::Custom),
            _ => None,
        }
    }
}

/// A registered quest template, identified by `owner_id.name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestTemplate {
    pub base_type: QuestType,
    /// Present iff `base_type` is `Custom`
    pub custom_type_id: Option<String>,
    pub name: String,
    /// Content provider that registered this template
    pub owner_id: String,
    /// Activation condition, opaque to the core
    pub trigger: Option<String>,
    pub cancelable: bool,
}

impl QuestTemplate {
    pub fn new(owner_id: &str, name: &str, base_type: QuestType) -> Self {
        Self {
            base_type,
            custom_type_id: None,
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            trigger: None,
            cancelable: false,
        }
    }

    /// Shorthand for a `Custom` template
    pub fn custom(owner_id: &str, name: &str, custom_type_id: &str) -> Self {
        Self {
            custom_type_id: Some(custom_type_id.to_string()),
            ..Self::new(owner_id, name, QuestType::Custom)
        }
    }

    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    /// Create a template from raw content-pack data
    pub fn from_raw(owner_id: &str, raw: &RawQuestTemplate) -> QuestResult<Self> {
        let base_type = QuestType::from_str(&raw.base_type).ok_or_else(|| {
            QuestError::validation(format!(
                "Invalid quest type '{}' for quest '{}'",
                raw.base_type, raw.name
            ))
        })?;

        let template = Self {
            base_type,
            custom_type_id: raw.custom_type.clone(),
            name: raw.name.clone(),
            owner_id: owner_id.to_string(),
            trigger: raw.trigger.clone(),
            cancelable: raw.cancelable,
        };
        template.validate()?;
        Ok(template)
    }

    /// `owner_id.name`
    pub fn full_name(&self) -> String {
        format!("{}{}{}", self.owner_id, NAME_SEPARATOR, self.name)
    }

    pub fn is_custom(&self) -> bool {
        self.base_type == QuestType::Custom
    }

    pub fn validate(&self) -> QuestResult<()> {
        if self.name.is_empty() {
            return Err(QuestError::validation("quest name is empty"));
        }
        if self.owner_id.is_empty() {
            return Err(QuestError::validation(format!(
                "quest '{}' has no owner",
                self.name
            )));
        }
        if self.name.contains(NAME_SEPARATOR) {
            return Err(QuestError::validation(format!(
                "quest name '{}' must not contain '{}'",
                self.name, NAME_SEPARATOR
            )));
        }
        let custom_missing = self
            .custom_type_id
            .as_deref()
            .map_or(true, str::is_empty);
        if self.is_custom() && custom_missing {
            return Err(QuestError::validation(format!(
                "custom quest '{}' has no custom type id",
                self.full_name()
            )));
        }
        if !self.is_custom() && self.custom_type_id.is_some() {
            return Err(QuestError::validation(format!(
                "{} quest '{}' must not carry a custom type id",
                self.base_type.as_str(),
                self.full_name()
            )));
        }
        Ok(())
    }
}

/// Split a possibly-qualified quest name into `(owner, name)`
pub fn split_full_name(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once(NAME_SEPARATOR)
        .filter(|(owner, bare)| !owner.is_empty() && !bare.is_empty())
}
