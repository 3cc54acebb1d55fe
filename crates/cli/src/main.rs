//! shopagent CLI: the main entry point.
//!
//! Commands:
//! - `ask`    : Answer one shopping question
//! - `models` : List supported providers and models
//! - `config` : Show, locate, validate or initialize the configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "shopagent",
    about = "shopagent — a retrieval-grounded shopping assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the assistant a question about the catalogue
    Ask {
        /// The question
        question: String,

        /// Provider for the agent step (openai, groq, google)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model for the agent step
        #[arg(short, long)]
        model: Option<String>,

        /// Print progress while the agent works
        #[arg(long)]
        stream: bool,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported providers and their models
    Models {
        /// Also query each configured provider for its live model list
        #[arg(long)]
        remote: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Load and validate the configuration
    Validate,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask {
            question,
            provider,
            model,
            stream,
            json,
        } => {
            commands::ask::run(commands::ask::AskOptions {
                question,
                provider,
                model,
                stream,
                json,
            })
            .await?
        }
        Commands::Models { remote } => commands::models::run(remote).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Init => commands::config_cmd::init().await?,
        },
    }

    Ok(())
}
