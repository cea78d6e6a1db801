//! LingoChat CLI, the main entry point.
//!
//! Commands:
//! - `serve`      Start the web chat page and HTTP API
//! - `chat`       Chat in the terminal (interactive or single message)
//! - `languages`  List the supported output languages
//! - `doctor`     Diagnose configuration and connectivity
//! - `init`       Write a default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "lingochat",
    about = "LingoChat: a multilingual chat assistant",
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
    /// Start the web chat page and HTTP API
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat in the terminal
    Chat {
        /// Output language (defaults to the configured one)
        #[arg(short, long)]
        language: Option<String>,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List the supported output languages
    Languages,

    /// Diagnose configuration and connectivity
    Doctor,

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { language, message } => commands::chat::run(language, message).await?,
        Commands::Languages => commands::languages::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Init { force } => commands::init::run(force).await?,
    }

    Ok(())
}
