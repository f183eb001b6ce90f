mod cmd;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "shunt",
    about = "Release pipeline daemon: advance one project row at a time through a fixed task pipeline",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .shunt/ or .git/)
    #[arg(long, global = true, env = "SHUNT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize shunt in the current project
    Init,

    /// Start the daemon in the background
    Up,

    /// Stop the running daemon
    Down,

    /// Show daemon liveness and the state of every row
    Status,

    /// Show the tail of the daemon log
    Logs {
        /// Number of trailing lines to show
        #[arg(long, short = 'n', default_value = "50")]
        lines: usize,
    },

    /// Execute one pipeline pass in the foreground, then exit
    Run,

    /// Run the daemon in the foreground (what `shunt up` launches)
    #[command(hide = true)]
    Daemon,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Daemon | Commands::Run => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root_path = cli.root.as_deref();
    let root = root::resolve_root(root_path);

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Up => cmd::up::run(&root),
        Commands::Down => cmd::down::run(&root),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Logs { lines } => cmd::logs::run(&root, lines),
        Commands::Run => cmd::run::run(&root),
        Commands::Daemon => cmd::daemon::run(&root),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
