use crate::error::{Result, RhythmError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const RHYTHM_DIR: &str = ".rhythm";
pub const ACTIONS_DIR: &str = ".rhythm/actions";
pub const MEMBERS_DIR: &str = ".rhythm/members";
pub const NOTES_DIR: &str = ".rhythm/notes";
pub const RECORDINGS_DIR: &str = ".rhythm/recordings";

pub const CONFIG_FILE: &str = ".rhythm/config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn rhythm_dir(root: &Path) -> PathBuf {
    root.join(RHYTHM_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn actions_dir(root: &Path) -> PathBuf {
    root.join(ACTIONS_DIR)
}

pub fn action_path(root: &Path, id: &str) -> PathBuf {
    actions_dir(root).join(format!("{id}.yaml"))
}

pub fn members_dir(root: &Path) -> PathBuf {
    root.join(MEMBERS_DIR)
}

pub fn member_path(root: &Path, id: &str) -> PathBuf {
    members_dir(root).join(format!("{id}.yaml"))
}

pub fn notes_path(root: &Path, action_id: &str) -> PathBuf {
    root.join(NOTES_DIR).join(format!("{action_id}.yaml"))
}

pub fn recordings_dir(root: &Path) -> PathBuf {
    root.join(RECORDINGS_DIR)
}

pub fn recording_path(root: &Path, id: &str) -> PathBuf {
    recordings_dir(root).join(format!("{id}.yaml"))
}

/// Every directory `rhythm init` creates.
pub fn all_dirs(root: &Path) -> [PathBuf; 5] {
    [
        rhythm_dir(root),
        actions_dir(root),
        members_dir(root),
        root.join(NOTES_DIR),
        recordings_dir(root),
    ]
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

/// Ids become file names, so they are restricted to lowercase slugs.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !id_re().is_match(id) {
        return Err(RhythmError::InvalidId(id.to_string()));
    }
    Ok(())
}
