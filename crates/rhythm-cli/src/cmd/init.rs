use anyhow::Context;
use rhythm_core::{config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rhythm".to_string());

    println!("Initializing rhythm in: {}", root.display());

    for dir in paths::all_dirs(root) {
        io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    if paths::config_path(root).exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
    } else {
        Config::new(&project_name)
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    }

    println!("\nrhythm initialized. Next: rhythm recording create <id> --title <title>");
    Ok(())
}
