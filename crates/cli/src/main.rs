//! Documentor CLI, the main entry point.
//!
//! Commands:
//! - `init`: Write a default config file
//! - `serve`: Start the HTTP gateway
//! - `ask`: Ask one question from the terminal
//! - `clear`: Clear a session's history
//! - `migrate`: Create the persistent history schema

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use documentor_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "documentor",
    about = "Documentor: ask questions about your API documentation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.documentor/config.toml)
    #[arg(short, long, global = true, env = "DOCUMENTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,

    /// Start the HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask one question
    Ask {
        question: String,

        /// Session to continue (defaults to the shared default session)
        #[arg(short, long)]
        session: Option<String>,

        /// Use the tool-using agent instead of plain retrieval Q&A
        #[arg(long)]
        agent: bool,

        /// Print the answer as it is produced
        #[arg(long)]
        stream: bool,
    },

    /// Clear a session's history
    Clear { session: String },

    /// Create the persistent history schema
    Migrate,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_with_overrides(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    if let Commands::Init = cli.command {
        return commands::init::run(cli.config.as_deref());
    }

    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Commands::Init => {}
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Ask {
            question,
            session,
            agent,
            stream,
        } => commands::ask::run(config, &question, session.as_deref(), agent, stream).await?,
        Commands::Clear { session } => commands::clear::run(config, &session).await?,
        Commands::Migrate => commands::migrate::run(config).await?,
    }

    Ok(())
}
