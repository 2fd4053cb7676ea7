//! Console Reports
//!
//! Text reports over the framework's read-only surface, for console commands
//! of the host adapter.

use chrono::{DateTime, Utc};

use crate::framework::QuestFramework;
use crate::quest::{HostQuestLog, ManagedQuest, INACTIVE_ID};
use crate::stats::{StatEvent, StatKind};

/// Arguments accepted by `quest_stats`, besides a quest name
pub const STATS_CHOICES: &str = "accepted, completed, removed, summary, <fullQualifiedQuestName>";

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn format_last(date: Option<DateTime<Utc>>) -> String {
    date.as_ref().map(format_date).unwrap_or_else(|| "never".to_string())
}

fn describe(quest: &ManagedQuest, out: &mut String) {
    let template = &quest.template;
    out.push_str(&format!("{}\n", quest.full_name()));
    out.push_str(&format!("    Type: {}\n", template.base_type.as_str()));
    out.push_str(&format!(
        "    Custom type: {}\n",
        template.custom_type_id.as_deref().unwrap_or("")
    ));
    out.push_str(&format!("    Name: {}\n", template.name));
    out.push_str(&format!("    Owned by: {}\n", template.owner_id));
}

/// Every quest under management with its current runtime IDs
pub fn list_quests(framework: &QuestFramework) -> String {
    let registry = framework.registry();
    let mut out = format!(
        "Quest framework has {} quests under management:\n",
        registry.len()
    );

    for quest in registry.list_managed() {
        describe(quest, &mut out);

        let ids: Vec<String> = quest
            .bindings()
            .map(|(player, id)| format!("{} (player {})", id, player))
            .collect();
        let current = if ids.is_empty() {
            INACTIVE_ID.to_string()
        } else {
            ids.join(", ")
        };
        out.push_str(&format!("    Current ID: {}\n", current));
        out.push_str(&format!(
            "    Trigger: {}\n",
            quest.template.trigger.as_deref().unwrap_or("null")
        ));
        out.push_str(&format!(
            "    Active: {}\n",
            if quest.is_active() { "Yes" } else { "No" }
        ));
    }

    out
}

/// Managed quests present in a player's quest log
pub fn list_log(framework: &QuestFramework, player_id: &str, log: &HostQuestLog) -> String {
    let managed: Vec<&ManagedQuest> = log
        .live
        .iter()
        .filter_map(|entry| framework.get_by_runtime_id(entry.runtime_id).ok())
        .filter(|quest| quest.is_active_for(player_id))
        .collect();

    let mut out = format!(
        "Quest framework has {} managed quests in player's quest log:\n",
        managed.len()
    );

    for quest in managed {
        describe(quest, &mut out);
        out.push_str(&format!("    Current ID: {}\n", quest.current_id(player_id)));
        out.push_str(&format!(
            "    Trigger: {}\n",
            quest.template.trigger.as_deref().unwrap_or("null")
        ));
        out.push_str(&format!("    Cancelable: {}\n", quest.template.cancelable));
    }

    out
}

fn list_events<'a>(
    label: &str,
    events: impl Iterator<Item = &'a StatEvent>,
    out: &mut String,
) {
    let events: Vec<&StatEvent> = events.collect();
    out.push_str(&format!("Show {} {} quests.\n\n", events.len(), label));
    for event in events {
        out.push_str(&format!(
            "{}\t{}\n",
            event.full_name,
            format_date(&event.timestamp)
        ));
    }
}

/// Statistics report: `accepted`, `completed`, `removed`, `summary`, or a quest name
pub fn quest_stats(framework: &QuestFramework, player_id: &str, choice: Option<&str>) -> String {
    let Some(choice) = choice else {
        return format!("Choose one of these statistics: {}\n", STATS_CHOICES);
    };

    let ledger = framework.ledger();
    let mut out = format!("{} quest stats:\n", choice);

    if let Some(kind) = StatKind::from_str(choice) {
        list_events(choice, ledger.all_events_of_kind(kind, player_id), &mut out);
        return out;
    }

    if choice == "summary" {
        let totals = ledger.stats_for(player_id);
        out.push_str(&format!("{} accepted quests\n", totals.accepted));
        out.push_str(&format!("{} completed quests\n", totals.completed));
        out.push_str(&format!("{} removed quests\n", totals.removed));
        return out;
    }

    let Ok(template) = framework.fetch(choice) else {
        out.push_str(&format!("`{}` is not known managed quest\n", choice));
        return out;
    };

    let summary = ledger.summary_for(&template.full_name(), player_id);
    out.push_str(&format!(
        "Last accepted:                  {}\n",
        format_last(summary.last_accepted)
    ));
    out.push_str(&format!(
        "Last completed:                 {}\n",
        format_last(summary.last_completed)
    ));
    out.push_str(&format!(
        "Last removed from quest log:    {}\n",
        format_last(summary.last_removed)
    ));
    out.push('\n');
    out.push_str(&format!("{} times accepted\n", summary.acceptal_count));
    out.push_str(&format!("{} times completed\n", summary.completion_count));
    out.push_str(&format!("{} times removed from quest log\n", summary.removal_count));
    out
}

/// Clear the framework's derived caches
pub fn invalidate_cache(framework: &mut QuestFramework) -> String {
    framework.invalidate();
    "Quest assets cache invalidated.".to_string()
}
