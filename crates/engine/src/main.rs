//! EmberRPG Engine - Main entry point.
//!
//! Runs the progression tracker behind a console host: player commands are
//! read from stdin, feedback goes to stdout and logs to stderr.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emberrpg_engine::api::{console, ConsoleHost};
use emberrpg_engine::infrastructure::config::AppConfig;
use emberrpg_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root as well as the working directory.
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emberrpg_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting EmberRPG Engine");

    // Load configuration
    let config_path = AppConfig::path_from_env();
    let config = AppConfig::load_or_create(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let app = App::start(&config, Arc::new(ConsoleHost::stdout())).await?;
    tracing::info!("Ready for commands: connect|cast|stats|disconnect <id>, quit");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = console::run(app.events(), stdin) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Console input failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, shutting down");
        }
    }

    app.shutdown().await;
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
    let _ = dotenvy::dotenv();
}
