//! Quest Definition Store
//!
//! Holds every registered quest template keyed by its fully-qualified name.
//! Iteration follows registration order.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::definition::QuestTemplate;
use crate::error::QuestResult;

/// Table of quest templates registered by content providers
#[derive(Debug, Default)]
pub struct QuestDefinitionStore {
    /// Templates in registration order
    templates: Vec<Arc<QuestTemplate>>,
    /// full name -> index into `templates`
    index: HashMap<String, usize>,
}

impl QuestDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a template, replacing any earlier one with the same full name.
    /// A replacement keeps the slot of the template it replaces.
    pub fn register(&mut self, template: QuestTemplate) -> QuestResult<Arc<QuestTemplate>> {
        template.validate()?;

        let full_name = template.full_name();
        let template = Arc::new(template);

        match self.index.get(&full_name) {
            Some(&slot) => {
                debug!("Replacing quest template '{}'", full_name);
                self.templates[slot] = Arc::clone(&template);
            }
            None => {
                debug!("Registered quest template '{}'", full_name);
                self.index.insert(full_name, self.templates.len());
                self.templates.push(Arc::clone(&template));
            }
        }

        Ok(template)
    }

    /// Remove every template owned by `owner_id`, returning their full names
    pub fn unregister_all(&mut self, owner_id: &str) -> Vec<String> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.templates)
            .into_iter()
            .partition(|t| t.owner_id == owner_id);

        self.templates = kept;
        self.rebuild_index();

        let removed: Vec<String> = removed.iter().map(|t| t.full_name()).collect();
        if !removed.is_empty() {
            info!("Unregistered {} quest templates of '{}'", removed.len(), owner_id);
        }
        removed
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .templates
            .iter()
            .enumerate()
            .map(|(slot, t)| (t.full_name(), slot))
            .collect();
    }

    /// Get a template by fully-qualified name
    pub fn get(&self, full_name: &str) -> Option<&Arc<QuestTemplate>> {
        self.index.get(full_name).map(|&slot| &self.templates[slot])
    }

    /// First registered template whose bare name matches
    pub fn find_by_bare_name(&self, name: &str) -> Option<&Arc<QuestTemplate>> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// All templates in registration order
    pub fn all(&self) -> impl Iterator<Item = &Arc<QuestTemplate>> {
        self.templates.iter()
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.index.contains_key(full_name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
