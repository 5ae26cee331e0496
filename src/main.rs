use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sprintboard::config::BoardConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "sprintboard")]
#[command(version, about = "Sprint board client with AI-assisted task division")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Base URL of the REST API. Overrides config and SPRINTBOARD_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List, inspect and delete tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// List and complete sprints
    Sprints {
        #[command(subcommand)]
        command: SprintCommands,
    },
    /// Divide tasks into AI-proposed subtasks
    Divide {
        /// Ids of the tasks to divide
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Subtasks per task (clamped to 2..=5)
        #[arg(short, long)]
        subtasks: Option<String>,

        /// Extra instructions for the division
        #[arg(short, long)]
        context: Option<String>,

        /// Accept every proposal and commit without prompting
        #[arg(long)]
        yes: bool,
    },
    /// Let the AI suggest which backlog tasks to divide, then divide them
    Suggest {
        /// Subtasks per task (clamped to 2..=5)
        #[arg(short, long)]
        subtasks: Option<String>,

        /// Accept every suggestion and proposal without prompting
        #[arg(long)]
        yes: bool,
    },
    /// Log in and store the session token
    Login {
        #[arg(long)]
        email: String,

        /// Read from the prompt when omitted
        #[arg(long, env = "SPRINTBOARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Serve an in-memory sprint board API
    MockServer {
        #[arg(short, long, default_value = "8080")]
        port: u16,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Start with an empty board instead of demo data
        #[arg(long)]
        empty: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum TaskCommands {
    /// List tasks
    List {
        /// Only tasks in this status (e.g. "Backlog")
        #[arg(long)]
        status: Option<String>,

        /// Only tasks of this team
        #[arg(long)]
        team: Option<i64>,
    },
    /// Show one task with its comments
    Show { id: i64 },
    /// Delete tasks
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum SprintCommands {
    /// List sprints
    List {
        #[arg(long)]
        team: Option<i64>,
    },
    /// Complete a sprint and move its unfinished tasks
    Complete {
        id: i64,

        /// Move unfinished tasks to the backlog
        #[arg(long, conflicts_with = "next")]
        backlog: bool,

        /// Move unfinished tasks to this sprint
        #[arg(long)]
        next: Option<i64>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default project config file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = BoardConfig::load(&project_dir)?.with_cli_args(
        cli.api_url.clone(),
        cli.verbose,
        cli.json_logs,
    );
    let _log_guard = sprintboard::logging::init(config.logging(), config.log_level());

    match &cli.command {
        Commands::Tasks { command } => cmd::cmd_tasks(&config, command.clone()).await?,
        Commands::Sprints { command } => cmd::cmd_sprints(&config, command.clone()).await?,
        Commands::Divide {
            ids,
            subtasks,
            context,
            yes,
        } => {
            cmd::cmd_divide(
                &config,
                ids,
                subtasks.as_deref(),
                context.as_deref().unwrap_or(""),
                *yes,
            )
            .await?
        }
        Commands::Suggest { subtasks, yes } => {
            cmd::cmd_suggest(&config, subtasks.as_deref(), *yes).await?
        }
        Commands::Login { email, password } => {
            cmd::cmd_login(&config, email, password.clone()).await?
        }
        Commands::Logout => cmd::cmd_logout()?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, &config, command.clone())?,
        Commands::MockServer { port, host, empty } => {
            cmd::cmd_mock_server(host, *port, !*empty).await?
        }
    }

    Ok(())
}
