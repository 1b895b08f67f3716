mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    action::ActionSubcommand, config::ConfigSubcommand, member::MemberSubcommand,
    note::NoteSubcommand, recording::RecordingSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rhythm",
    about = "Track, reorder and share the actions that come out of your conversations",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .rhythm/ or .git/)
    #[arg(long, global = true, env = "RHYTHM_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the .rhythm/ store in the current project
    Init,

    /// Add, edit and reorder actions
    Action {
        #[command(subcommand)]
        subcommand: ActionSubcommand,
    },

    /// Manage the support circle
    Member {
        #[command(subcommand)]
        subcommand: MemberSubcommand,
    },

    /// Comments left on actions by support-circle members
    Note {
        #[command(subcommand)]
        subcommand: NoteSubcommand,
    },

    /// Manage recordings and import their extracted actions
    Recording {
        #[command(subcommand)]
        subcommand: RecordingSubcommand,
    },

    /// Show the status and priority display tables
    Statuses,

    /// Show or validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Serve the JSON API
    Ui {
        /// Port to listen on (default: server.port from config, 0 = OS-assigned)
        #[arg(long)]
        port: Option<u16>,

        /// Don't open a browser
        #[arg(long)]
        no_open: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Ui { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Action { subcommand } => cmd::action::run(&root, subcommand, cli.json),
        Commands::Member { subcommand } => cmd::member::run(&root, subcommand, cli.json),
        Commands::Note { subcommand } => cmd::note::run(&root, subcommand, cli.json),
        Commands::Recording { subcommand } => cmd::recording::run(&root, subcommand, cli.json),
        Commands::Statuses => cmd::statuses::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Ui { port, no_open } => cmd::ui::run(&root, port, no_open),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
