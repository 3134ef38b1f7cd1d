//! CRUD API - Application entry point
//!
//! CLI-based entry point that dispatches to the commands.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crud_api_template::{
    cli::{Cli, Commands},
    commands,
    config::Config,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(cli.verbose, None);
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(cli.verbose, Some(&config.log_level));
    tracing::debug!(?config, "Configuration loaded");

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Migrate(args) => commands::migrate::execute(args, config).await,
        Commands::Tokens(args) => commands::tokens::execute(args, config).await,
        Commands::Users(args) => commands::users::execute(args, config).await,
        Commands::Secrets(args) => commands::secrets::execute(args, config).await,
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing subscriber.
///
/// `--verbose` wins, then `RUST_LOG`, then `LOG_LEVEL`, then `info`.
fn init_tracing(verbose: bool, log_level: Option<&str>) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(log_level.map(str::to_lowercase).unwrap_or_else(|| "info".into()))
        })
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}
