//! ChatRelay CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP API
//! - `ask`: Send one question through the chat path
//! - `history`: Print a session's stored exchanges
//! - `init-db`: Create the history table and exit
//! - `config`: Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(
    name = "chatrelay",
    about = "ChatRelay, a session-aware chat relay for LLM backends",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.chatrelay/config.toml)
    #[arg(short, long, global = true, env = "CHATRELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Ask one question from the terminal
    Ask {
        /// The question
        #[arg(short, long)]
        question: String,

        /// Session to continue (a new one is generated when omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Model to use instead of the configured default
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Print stored exchanges for a session
    History {
        #[arg(short, long)]
        session: String,

        /// Number of most recent exchanges to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Create the history table if it does not exist
    InitDb,

    /// Show the effective configuration (secrets redacted)
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = commands::config_path(cli.config.as_deref());
    let config = commands::load_config(&config_path)?;
    let _log_guard = logging::init(&config.logging, cli.verbose)?;
    if let Some(notice) = commands::missing_config_notice(&config_path) {
        tracing::info!("{notice}");
    }

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(config, port, host).await?,
        Commands::Ask {
            question,
            session,
            model,
        } => commands::ask::run(&config, question, session, model).await?,
        Commands::History { session, limit } => {
            commands::history::run(&config, &session, limit).await?
        }
        Commands::InitDb => commands::init_db::run(&config).await?,
        Commands::Config => commands::config_cmd::run(&config, &config_path)?,
    }

    Ok(())
}
