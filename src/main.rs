use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "handoff")]
#[command(version, about = "Human-gated multi-agent pipeline coordinator")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace directory (defaults to the current directory)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new pipeline run (legal from idle or completed)
    Start {
        /// The task description, word by word
        #[arg(required = true)]
        task: Vec<String>,
    },
    /// Show the current phase, gate, and recent activity
    Status,
    /// Record the active agent's output from a file or stdin
    Submit {
        /// Read the output from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Accept the gated output and advance the pipeline
    Approve,
    /// Reject the gated output and return to the retry stage
    Reject {
        /// Why the output was rejected; recorded in history
        #[arg(short = 'm', long)]
        feedback: Option<String>,
    },
    /// Show the pipeline's audit history
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Delete all pipeline state and outputs
    Reset {
        #[arg(long)]
        force: bool,
    },
    /// Run the synchronization watcher and inactivity auto-completion
    Watch {
        /// Disable inactivity-based stage auto-completion
        #[arg(long)]
        no_autocomplete: bool,
        /// Override the quiet period (seconds, clamped to 2-30)
        #[arg(long)]
        quiet_secs: Option<u64>,
    },
    /// Print the generated prompt for the active (or named) agent
    Prompt {
        /// planner, implementer, reviewer, or test
        agent: Option<String>,
    },
    /// View or scaffold configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Worker tool surface: store-direct operations for the agent process
    Agent {
        #[command(subcommand)]
        command: AgentCommands,
    },
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Read the task description and pipeline status as JSON
    Task,
    /// Read one agent's output (or all, as JSON)
    Read {
        /// planner, implementer, reviewer, or test
        agent: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Record an agent's output and advance to its review phase
    Submit {
        /// planner, implementer, reviewer, or test
        agent: String,
        /// Read the output from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print a scan of the project's tree and tech stack
    Context,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default handoff.toml to the workspace root
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "handoff=debug"
    } else {
        "handoff=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let workspace = match cli.workspace.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Start { task } => cmd::cmd_start(&workspace, &task.join(" "))?,
        Commands::Status => cmd::cmd_status(&workspace)?,
        Commands::Submit { file } => cmd::cmd_submit(&workspace, file.as_deref())?,
        Commands::Approve => cmd::cmd_approve(&workspace)?,
        Commands::Reject { feedback } => cmd::cmd_reject(&workspace, feedback.as_deref())?,
        Commands::History { limit } => cmd::cmd_history(&workspace, *limit)?,
        Commands::Reset { force } => cmd::cmd_reset(&workspace, *force)?,
        Commands::Watch {
            no_autocomplete,
            quiet_secs,
        } => cmd::cmd_watch(&workspace, *no_autocomplete, *quiet_secs).await?,
        Commands::Prompt { agent } => cmd::cmd_prompt(&workspace, agent.as_deref())?,
        Commands::Config { command } => cmd::cmd_config(&workspace, command.as_ref())?,
        Commands::Agent { command } => cmd::cmd_agent(&workspace, command)?,
    }

    Ok(())
}
