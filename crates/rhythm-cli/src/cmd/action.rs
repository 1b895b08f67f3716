use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use chrono::NaiveDate;
use clap::Subcommand;
use rhythm_core::{
    action::{Action, ActionPatch},
    circle::SupportMember,
    config::Config,
    display::{priority_display, status_display},
    editor::{ActionField, FieldValue},
    order::{next_priority, DragEnd},
    persist::{ActionStore, FileStore, Scope, WriteOutcome},
    recording::Recording,
    types::ActionStatus,
    viewer::ActionViewer,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum ActionSubcommand {
    /// Enter an action by hand
    Add {
        text: String,
        /// Attach to a recording
        #[arg(long)]
        recording: Option<String>,
        /// Priority level (default: after the last action in the list)
        #[arg(long)]
        priority: Option<u32>,
        #[arg(long)]
        status: Option<String>,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target: Option<NaiveDate>,
        #[arg(long)]
        assign: Option<String>,
    },
    /// List actions in priority order
    List {
        #[arg(long)]
        recording: Option<String>,
    },
    /// Show one action in full
    Show { id: String },
    /// Edit one field; omit the value to clear it
    Edit {
        id: String,
        /// text, status, priority, start_date, target_date, end_date,
        /// assigned_to, confidence, success_criteria, motivation
        field: String,
        value: Option<String>,
    },
    /// Change an action's status
    Status { id: String, status: String },
    /// Pick a priority by hand
    Priority { id: String, level: u32 },
    /// Move the action at position FROM to position TO (1-based)
    Move {
        /// Reorder within one recording (default: every action)
        #[arg(long)]
        recording: Option<String>,
        from: usize,
        to: usize,
    },
    /// Set the full order of a list of actions
    Reorder {
        /// Reorder within one recording (default: every action)
        #[arg(long)]
        recording: Option<String>,
        ids: Vec<String>,
    },
    /// Toggle whether a support-circle member watches an action
    Watch { id: String, member: String },
    /// Add or tick off micro-tasks
    Micro {
        id: String,
        #[arg(long)]
        add: Option<String>,
        /// 1-based index of the micro-task to toggle
        #[arg(long)]
        toggle: Option<usize>,
    },
}

pub fn run(root: &Path, subcmd: ActionSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ActionSubcommand::Add {
            text,
            recording,
            priority,
            status,
            target,
            assign,
        } => add(
            root,
            text,
            recording,
            priority,
            status.as_deref(),
            target,
            assign,
            json,
        ),
        ActionSubcommand::List { recording } => list(root, recording, json),
        ActionSubcommand::Show { id } => show(root, &id, json),
        ActionSubcommand::Edit { id, field, value } => {
            edit(root, &id, &field, value.as_deref(), json)
        }
        ActionSubcommand::Status { id, status } => set_status(root, &id, &status, json),
        ActionSubcommand::Priority { id, level } => set_priority(root, &id, level, json),
        ActionSubcommand::Move { recording, from, to } => move_action(root, recording.as_deref(), from, to, json),
        ActionSubcommand::Reorder { recording, ids } => reorder(root, recording.as_deref(), &ids, json),
        ActionSubcommand::Watch { id, member } => watch(root, &id, &member, json),
        ActionSubcommand::Micro { id, add, toggle } => micro(root, &id, add, toggle, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One recording's actions, or every action when no recording is named.
fn scope_for(root: &Path, recording: Option<&str>) -> anyhow::Result<Scope> {
    let Some(recording_id) = recording else {
        return Ok(Scope::All);
    };
    let rec = Recording::load(root, recording_id)
        .with_context(|| format!("recording '{recording_id}' not found"))?;
    Ok(Scope::Recording(rec.id))
}

fn scope_of(action: &Action) -> Scope {
    match &action.recording_id {
        Some(id) => Scope::Recording(id.clone()),
        None => Scope::All,
    }
}

/// A viewer over the list that holds `id`, opened from disk.
fn viewer_for(root: &Path, store: &FileStore, id: &str) -> anyhow::Result<(Config, ActionViewer)> {
    let config = Config::load(root)?;
    let action = store.load(id)?;
    let mut viewer = ActionViewer::from_config(scope_of(&action), &config);
    viewer.open(store)?;
    Ok((config, viewer))
}

fn viewer_for_scope(root: &Path, store: &FileStore, recording: Option<&str>) -> anyhow::Result<ActionViewer> {
    let config = Config::load(root)?;
    let mut viewer = ActionViewer::from_config(scope_for(root, recording)?, &config);
    viewer.open(store)?;
    Ok(viewer)
}

/// Report a write-back. A failure notice becomes the command's error.
fn finish(outcome: WriteOutcome, viewer: &ActionViewer, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&serde_json::json!({
            "notice": outcome.notice,
            "written": outcome.written,
            "rolled_back": outcome.rolled_back,
            "error": outcome.error,
            "actions": viewer.actions(),
        }))?;
    } else if outcome.notice.is_success() {
        println!("{}", outcome.notice.message);
    }

    if !outcome.notice.is_success() {
        if let Some(err) = &outcome.error {
            tracing::warn!(error = %err, "write-back failed");
        }
        anyhow::bail!("{}", outcome.notice.message);
    }
    Ok(())
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn add(
    root: &Path,
    text: String,
    recording: Option<String>,
    priority: Option<u32>,
    status: Option<&str>,
    target: Option<NaiveDate>,
    assign: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    Config::load(root)?;
    let store = FileStore::new(root);
    let scope = scope_for(root, recording.as_deref())?;
    let priority = match priority {
        Some(p) => p,
        None => next_priority(&store.list(&scope)?),
    };
    let status: Option<ActionStatus> = status.map(str::parse).transpose()?;

    let mut action = Action::new(text.clone(), 1);
    action.recording_id = recording;
    action.apply(&ActionPatch {
        text: Some(text),
        status,
        priority_level: Some(priority),
        target_date: Some(target),
        assigned_to: Some(assign),
        ..ActionPatch::default()
    })?;
    store.insert(&action).context("failed to save action")?;

    if json {
        print_json(&action)?;
    } else {
        println!("Added action [{}] at priority {}", action.id, action.priority_level);
    }
    Ok(())
}

fn list(root: &Path, recording: Option<String>, json: bool) -> anyhow::Result<()> {
    let scope = scope_for(root, recording.as_deref())?;
    let actions = FileStore::new(root).list(&scope)?;

    if json {
        return print_json(&actions);
    }
    if actions.is_empty() {
        println!("No actions.");
        return Ok(());
    }

    let rows = actions
        .iter()
        .map(|a| {
            vec![
                a.priority_level.to_string(),
                status_display(&a.status).label.to_string(),
                truncate(&a.text, 48),
                or_dash(a.target_date.map(|d| d.to_string())),
                a.watchers.len().to_string(),
                a.id.clone(),
            ]
        })
        .collect();
    print_table(&["PRI", "STATUS", "TEXT", "TARGET", "WATCHERS", "ID"], rows);
    Ok(())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let action = FileStore::new(root).load(id)?;
    if json {
        return print_json(&action);
    }

    let config = Config::load(root)?;
    println!("Action:   {}", action.id);
    println!("Text:     {}", action.text);
    println!(
        "Status:   {}",
        status_display(&action.status).label
    );
    println!(
        "Priority: {} ({})",
        action.priority_level,
        priority_display(action.priority_level).label
    );
    if let Some(rec) = &action.recording_id {
        println!("From:     {rec}");
    }

    for field in [
        ActionField::StartDate,
        ActionField::TargetDate,
        ActionField::EndDate,
        ActionField::AssignedTo,
        ActionField::Confidence,
        ActionField::SuccessCriteria,
        ActionField::Motivation,
    ] {
        let editor = field.editor(&action, config.priorities.max_manual);
        if !editor.value().is_empty() {
            println!("{:<9} {}", format!("{field}:"), editor.display_text("-"));
        }
    }

    if !action.watchers.is_empty() {
        println!("Watchers: {}", action.watchers.join(", "));
    }
    if !action.micro_tasks.is_empty() {
        println!(
            "\nMicro-tasks ({}):",
            action.micro_task_progress().unwrap_or_default()
        );
        for (i, task) in action.micro_tasks.iter().enumerate() {
            let mark = if task.done { "x" } else { " " };
            println!("  {}. [{mark}] {}", i + 1, task.text);
        }
    }
    Ok(())
}

fn edit(root: &Path, id: &str, field: &str, value: Option<&str>, json: bool) -> anyhow::Result<()> {
    let field: ActionField = field.parse()?;
    let store = FileStore::new(root);
    let (config, mut viewer) = viewer_for(root, &store, id)?;
    let action = store.load(id)?;

    let mut editor = field.editor(&action, config.priorities.max_manual);
    editor.click();
    editor.input(value.unwrap_or_default())?;
    let mut committed: Option<FieldValue> = None;
    editor
        .save(|v| committed = Some(v))
        .with_context(|| format!("invalid value for {field}"))?;

    let value = committed.unwrap_or(FieldValue::Empty);
    let outcome = viewer.edit(&store, id, field, &value)?;
    finish(outcome, &viewer, json)
}

fn set_status(root: &Path, id: &str, status: &str, json: bool) -> anyhow::Result<()> {
    let status: ActionStatus = status.parse()?;
    let store = FileStore::new(root);
    let (_, mut viewer) = viewer_for(root, &store, id)?;
    let outcome = viewer.set_status(&store, id, status)?;
    finish(outcome, &viewer, json)
}

fn set_priority(root: &Path, id: &str, level: u32, json: bool) -> anyhow::Result<()> {
    let store = FileStore::new(root);
    let (_, mut viewer) = viewer_for(root, &store, id)?;
    let outcome = viewer.set_priority(&store, id, level)?;
    finish(outcome, &viewer, json)
}

fn move_action(root: &Path, recording: Option<&str>, from: usize, to: usize, json: bool) -> anyhow::Result<()> {
    if from == 0 || to == 0 {
        anyhow::bail!("positions start at 1");
    }
    let store = FileStore::new(root);
    let mut viewer = viewer_for_scope(root, &store, recording)?;
    let outcome = viewer.drag(&store, DragEnd::new(from - 1, to - 1))?;
    finish(outcome, &viewer, json)
}

fn reorder(root: &Path, recording: Option<&str>, ids: &[String], json: bool) -> anyhow::Result<()> {
    let store = FileStore::new(root);
    let mut viewer = viewer_for_scope(root, &store, recording)?;
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let outcome = viewer.reorder(&store, &refs)?;
    finish(outcome, &viewer, json)
}

fn watch(root: &Path, id: &str, member: &str, json: bool) -> anyhow::Result<()> {
    let store = FileStore::new(root);
    let (_, mut viewer) = viewer_for(root, &store, id)?;
    let members = SupportMember::list(root)?;
    let (watching, outcome) = viewer.toggle_watcher(&store, &members, id, member)?;

    if !json && outcome.notice.is_success() {
        let verb = if watching { "now watching" } else { "no longer watching" };
        println!("{member} is {verb} {id}");
    }
    finish(outcome, &viewer, json)
}

fn micro(
    root: &Path,
    id: &str,
    add: Option<String>,
    toggle: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    if add.is_none() && toggle.is_none() {
        anyhow::bail!("nothing to do: pass --add <text> or --toggle <n>");
    }
    let store = FileStore::new(root);
    let mut action = store.load(id)?;
    let version = action.version;

    if let Some(text) = add {
        action.add_micro_task(text);
    }
    if let Some(n) = toggle {
        if n == 0 {
            anyhow::bail!("micro-tasks are numbered from 1");
        }
        action.toggle_micro_task(n - 1)?;
    }

    let patch = ActionPatch {
        micro_tasks: Some(action.micro_tasks),
        ..ActionPatch::default()
    }
    .expecting(version);
    let stored = store.update(id, &patch).context("failed to save micro-tasks")?;

    if json {
        print_json(&stored)?;
    } else {
        println!(
            "Micro-tasks: {}",
            stored.micro_task_progress().unwrap_or_default()
        );
    }
    Ok(())
}
