mod args;
mod commands;
mod output;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use grapevine_core::{Config, Grapevine};
use grapevine_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging - helps when things go sideways.
    // Targets match by prefix, so "grapevine" covers every workspace crate.
    let default_filter = if cli.verbose {
        "grapevine=debug"
    } else {
        "grapevine=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(command) = cli.command else {
        println!("No command specified. Try --help");
        return Ok(());
    };

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&config_path)?;
    config.apply_env_overrides();
    if let Some(token) = cli.token {
        config.github.token = Some(token);
    }

    let db_path = config.database_path()?;
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    let mut grapevine = Grapevine::init(config, Arc::new(store))?;

    let result = run(&mut grapevine, command, &config_path).await;
    grapevine.dispose();
    result
}

async fn run(
    grapevine: &mut Grapevine,
    command: Commands,
    config_path: &Path,
) -> anyhow::Result<()> {
    match command {
        Commands::Browse {
            category,
            page,
            per_page,
            filter,
            criteria,
            json,
        } => {
            let request = commands::BrowseRequest {
                category,
                page,
                per_page,
                saved_filter: filter,
                criteria,
            };
            commands::browse(grapevine, request, json).await
        }
        Commands::View {
            source,
            number,
            json,
        } => commands::view(grapevine, &source, number, json).await,
        Commands::Sources { action } => commands::sources(grapevine, action, config_path),
        Commands::Categories { action } => commands::categories(grapevine, action, config_path),
        Commands::Filters { action } => commands::filters(grapevine, action),
        Commands::Analytics {
            action,
            author,
            top,
            json,
        } => commands::analytics(grapevine, action, author, top, json),
        Commands::Login { action } => commands::login(grapevine, action).await,
        Commands::Logout { forget } => commands::logout(grapevine, forget),
        Commands::Locate { lat, lon } => commands::locate(grapevine, lat, lon).await,
    }
}
