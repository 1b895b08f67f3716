use crate::output::{print_json, print_table};
use rhythm_core::config::{Config, DEFAULT_MAX_MANUAL_PRIORITY};
use rhythm_core::display::{priority_display, status_catalog, PriorityDisplay, FALLBACK_STATUS};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let max = Config::load(root)
        .map(|c| c.priorities.max_manual)
        .unwrap_or(DEFAULT_MAX_MANUAL_PRIORITY);
    let priorities: Vec<PriorityDisplay> = (1..=max).map(priority_display).collect();

    if json {
        return print_json(&serde_json::json!({
            "statuses": status_catalog(),
            "fallback": FALLBACK_STATUS,
            "priorities": priorities,
        }));
    }

    let rows = status_catalog()
        .iter()
        .chain(std::iter::once(&FALLBACK_STATUS))
        .map(|s| {
            vec![
                s.value.to_string(),
                s.label.to_string(),
                s.color.to_string(),
                s.icon.to_string(),
            ]
        })
        .collect();
    print_table(&["STATUS", "LABEL", "COLOR", "ICON"], rows);
    println!();

    let rows = priorities
        .iter()
        .map(|p| vec![p.level.to_string(), p.label.to_string(), p.color.to_string()])
        .collect();
    print_table(&["PRIORITY", "LABEL", "COLOR"], rows);
    Ok(())
}
