use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use rhythm_core::{
    circle::SupportMember,
    note::{add_note, list_notes},
    types::NoteType,
};
use std::collections::HashMap;
use std::path::Path;

#[derive(Subcommand)]
pub enum NoteSubcommand {
    /// Leave a note on an action
    Add {
        action_id: String,
        body: String,
        /// Author member id
        #[arg(long)]
        by: String,
        /// comment, encouragement, question, concern
        #[arg(long = "type", default_value = "comment")]
        note_type: String,
        /// Keep the note within the support circle
        #[arg(long)]
        hidden: bool,
    },
    /// List notes on an action
    List {
        action_id: String,
        /// Include hidden notes
        #[arg(long)]
        all: bool,
    },
}

pub fn run(root: &Path, subcmd: NoteSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        NoteSubcommand::Add {
            action_id,
            body,
            by,
            note_type,
            hidden,
        } => add(root, &action_id, &body, &by, &note_type, hidden, json),
        NoteSubcommand::List { action_id, all } => list(root, &action_id, all, json),
    }
}

fn add(
    root: &Path,
    action_id: &str,
    body: &str,
    by: &str,
    note_type: &str,
    hidden: bool,
    json: bool,
) -> anyhow::Result<()> {
    let note_type: NoteType = note_type.parse()?;
    let note = add_note(root, action_id, by, note_type, body, !hidden)
        .with_context(|| format!("failed to add note to action '{action_id}'"))?;

    if json {
        print_json(&note)?;
    } else {
        println!("Added {} [{}]", note.note_type, note.id);
    }
    Ok(())
}

fn list(root: &Path, action_id: &str, all: bool, json: bool) -> anyhow::Result<()> {
    let notes = list_notes(root, action_id, !all)?;
    if json {
        return print_json(&notes);
    }
    if notes.is_empty() {
        println!("No notes on {action_id}.");
        return Ok(());
    }

    let names: HashMap<String, String> = SupportMember::list(root)?
        .into_iter()
        .map(|m| (m.id, m.name))
        .collect();
    let rows = notes
        .iter()
        .map(|n| {
            vec![
                n.created_at.format("%Y-%m-%d %H:%M").to_string(),
                names.get(&n.member_id).cloned().unwrap_or_else(|| n.member_id.clone()),
                n.note_type.to_string(),
                if n.visible_to_user { "" } else { "hidden" }.to_string(),
                n.body.clone(),
            ]
        })
        .collect();
    print_table(&["WHEN", "BY", "TYPE", "", "NOTE"], rows);
    Ok(())
}
