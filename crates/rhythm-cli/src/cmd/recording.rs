use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use rhythm_core::{
    persist::{ActionStore, FileStore, Scope},
    recording::{self, ExtractedAction, Recording},
};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum RecordingSubcommand {
    /// Register a recording
    Create {
        id: String,
        #[arg(long)]
        title: String,
        /// Repeat for each participant
        #[arg(long = "participant")]
        participants: Vec<String>,
        #[arg(long)]
        duration_secs: Option<u32>,
    },
    /// List recordings, newest first
    List,
    /// Show a recording and how many actions it produced
    Show { id: String },
    /// Import extracted actions from a JSON array (`-` reads stdin)
    Import { id: String, file: PathBuf },
}

pub fn run(root: &Path, subcmd: RecordingSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RecordingSubcommand::Create {
            id,
            title,
            participants,
            duration_secs,
        } => create(root, id, title, participants, duration_secs, json),
        RecordingSubcommand::List => list(root, json),
        RecordingSubcommand::Show { id } => show(root, &id, json),
        RecordingSubcommand::Import { id, file } => import(root, &id, &file, json),
    }
}

fn create(
    root: &Path,
    id: String,
    title: String,
    participants: Vec<String>,
    duration_secs: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let mut rec = Recording::new(id, title);
    rec.participants = participants;
    rec.duration_secs = duration_secs;
    let rec = Recording::create(root, rec).context("failed to create recording")?;

    if json {
        print_json(&rec)?;
    } else {
        println!("Created recording '{}': {}", rec.id, rec.title);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let recordings = Recording::list(root)?;
    if json {
        return print_json(&recordings);
    }
    if recordings.is_empty() {
        println!("No recordings.");
        return Ok(());
    }

    let rows = recordings
        .iter()
        .map(|r| {
            vec![
                r.id.clone(),
                r.recorded_at.format("%Y-%m-%d").to_string(),
                if r.processed { "yes" } else { "no" }.to_string(),
                r.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "RECORDED", "PROCESSED", "TITLE"], rows);
    Ok(())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let rec = Recording::load(root, id)?;
    let count = FileStore::new(root)
        .list(&Scope::Recording(rec.id.clone()))?
        .len();

    if json {
        return print_json(&serde_json::json!({
            "recording": rec,
            "action_count": count,
        }));
    }

    println!("Recording: {}", rec.id);
    println!("Title:     {}", rec.title);
    println!("Recorded:  {}", rec.recorded_at.format("%Y-%m-%d %H:%M"));
    if let Some(secs) = rec.duration_secs {
        println!("Duration:  {}m {:02}s", secs / 60, secs % 60);
    }
    if !rec.participants.is_empty() {
        println!("With:      {}", rec.participants.join(", "));
    }
    println!("Processed: {}", if rec.processed { "yes" } else { "no" });
    println!("Actions:   {count}");
    Ok(())
}

fn import(root: &Path, id: &str, file: &Path, json: bool) -> anyhow::Result<()> {
    let raw = if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?
    };
    let extracted: Vec<ExtractedAction> =
        serde_json::from_str(&raw).context("expected a JSON array of extracted actions")?;

    let store = FileStore::new(root);
    let imported = recording::import_actions(root, &store, id, extracted)
        .with_context(|| format!("failed to import actions into '{id}'"))?;

    if json {
        print_json(&imported)?;
    } else {
        println!("Imported {} action(s) into '{id}'", imported.len());
    }
    Ok(())
}
