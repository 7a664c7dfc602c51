use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use novelsmith::config::ProjectPaths;
use novelsmith::novel_config::NovelToml;

mod cmd;

#[derive(Parser)]
#[command(name = "novelsmith")]
#[command(version, about = "Multi-role novel writing orchestrator")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Commit every output without stopping for review
    #[arg(long, global = true)]
    pub yes: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Delay between tasks in milliseconds. Overrides novel.toml.
    #[arg(long, global = true)]
    pub task_interval: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the .novelsmith directory and a default novel.toml
    Init,
    /// Start writing a new novel
    Start {
        #[arg(long)]
        title: String,
        /// Initial concept or premise
        #[arg(long)]
        concept: String,
        #[arg(long, default_value = "fantasy")]
        genre: String,
        /// short, medium, long or infinite
        #[arg(long, default_value = "medium")]
        length: String,
        /// Style guide name from .novelsmith/styles, or a file path
        #[arg(long)]
        style: Option<String>,
        /// Override the chapter target implied by --length
        #[arg(long)]
        chapters: Option<u32>,
    },
    /// Resume the saved project
    Resume {
        /// Load a specific save file instead of project.json
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Pause the running novel at the next task boundary
    Pause,
    /// Continue a paused run
    Continue,
    /// Stop the running novel at the next task boundary and save
    Stop,
    /// Ask the running novel to save at the next task boundary
    Save,
    /// Show progress of the current or last run
    Status,
    /// Export chapters to Markdown
    Export {
        /// Export only this chapter
        #[arg(long)]
        chapter: Option<u32>,
        /// Output file for the full export
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default novel.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    dotenvy::dotenv().ok();
    dotenvy::from_path(project_dir.join(".env")).ok();

    let logs_to_file = matches!(cli.command, Commands::Start { .. } | Commands::Resume { .. });
    let _guard = init_tracing(&project_dir, cli.verbose, logs_to_file);

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Start {
            title,
            concept,
            genre,
            length,
            style,
            chapters,
        } => {
            let request = cmd::StartRequest {
                title: title.clone(),
                concept: concept.clone(),
                genre: genre.clone(),
                length: length.clone(),
                style: style.clone(),
                chapters: *chapters,
            };
            cmd::cmd_start(&cli, &project_dir, request).await?;
        }
        Commands::Resume { from } => cmd::cmd_resume(&cli, &project_dir, from.as_deref()).await?,
        Commands::Pause => cmd::cmd_pause(&project_dir)?,
        Commands::Continue => cmd::cmd_continue(&project_dir)?,
        Commands::Stop => cmd::cmd_stop(&project_dir)?,
        Commands::Save => cmd::cmd_save(&project_dir)?,
        Commands::Status => cmd::cmd_status(&project_dir)?,
        Commands::Export { chapter, output } => {
            cmd::cmd_export(&project_dir, *chapter, output.as_deref())?
        }
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}

/// Install the global subscriber.
///
/// Runs log to `.novelsmith/logs/novelsmith.log` so the progress bars stay
/// intact; other commands log warnings to stderr. `NOVELSMITH_LOG` overrides
/// the level from novel.toml, and `--verbose` raises it to debug.
fn init_tracing(project_dir: &Path, verbose: bool, to_file: bool) -> Option<WorkerGuard> {
    let paths = ProjectPaths::new(project_dir);
    let logging = NovelToml::load_or_default(&paths.state_dir)
        .map(|t| t.logging)
        .unwrap_or_default();

    let default_level = if verbose {
        "debug".to_string()
    } else if to_file {
        logging.level.clone()
    } else {
        "warn".to_string()
    };
    let filter = EnvFilter::try_from_env("NOVELSMITH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("novelsmith={}", default_level)));

    if to_file && std::fs::create_dir_all(paths.log_dir()).is_ok() {
        let appender = tracing_appender::rolling::never(paths.log_dir(), "novelsmith.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let registry = tracing_subscriber::registry().with(filter);
        if logging.json {
            registry
                .with(fmt::layer().json().with_writer(writer).with_ansi(false))
                .init();
        } else {
            registry
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
        }
        return Some(guard);
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .init();
    None
}
