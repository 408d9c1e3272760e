//! 🚀 m2e-cli: the front door, the bouncer, the maitre d' of m2e.
//!
//! 📦 Thin wrapper: load `.env`, set up logging, load config, run, print the tally.
//! The real work lives in the library. Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🍃➡️🔍 Index every document of a MongoDB collection into Elasticsearch.
///
/// Settings come from the environment (a `.env` file in the working directory is
/// loaded first): MONGODB_URI, ELASTICSEARCH_PORT, MONGO_DB_NAME,
/// MONGO_COLLECTION_NAME, ELASTICSEARCH_INDEX_NAME.
#[derive(Debug, Parser)]
#[command(name = "m2e", version)]
struct Cli {
    /// Optional TOML file layered over the environment. Defaults to `m2e.toml` if it exists.
    config: Option<PathBuf>,
}

/// 🔧 Steps:
/// 1. Load `.env` (missing is fine, the real env may have everything)
/// 2. Init tracing (so we can see what goes wrong, and when)
/// 3. Load config (the moment of truth)
/// 4. Run the thing
/// 5. Print the summary, or log the error chain and exit 1
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 🌱 .env first, so RUST_LOG in it counts too
    dotenv::dotenv().ok();

    // 📡 info by default: the per-document lines ARE the progress report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match resolve_config_path(cli.config) {
        Ok(config_path) => run(config_path).await,
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("onnection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
                || cause_str.contains("Server selection timeout")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: looks like a service isn't reachable. \
                Double-check that MongoDB and Elasticsearch are actually running. \
                If you're using Docker, try `docker ps` to see what's up, \
                or `docker compose up -d` to resurrect them. ☕"
            );
        }

        std::process::exit(1);
    }

    Ok(())
}

/// 🎯 An explicit path must exist. No path means `m2e.toml` if it's there, env-only otherwise.
fn resolve_config_path(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let exists = path.try_exists().with_context(|| {
                format!("💀 Couldn't check whether '{}' exists", path.display())
            })?;
            if !exists {
                anyhow::bail!(
                    "💀 Configuration file '{}' doesn't exist. If it's a relative path, \
                     check your working directory, or use an absolute path to be absolutely certain.",
                    path.display()
                );
            }
            Ok(Some(path))
        }
        None => {
            let default_path = PathBuf::from("m2e.toml");
            Ok(default_path.is_file().then_some(default_path))
        }
    }
}

async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let app_config = m2e::app_config::load_config(config_path.as_deref())
        .context("💀 Couldn't load the configuration. Check the environment (and .env) for the five required settings.")?;

    let report = m2e::run(&app_config).await?;

    // 🍽️ the last thing on screen should be a number, not a log line
    println!("{}", report.to_table());
    Ok(())
}
