//! repotally service entry point.
//!
//! Initialization order matters: configuration, then the language
//! registry, then the task queue, then the HTTP server. A failure in any
//! of the first three aborts the process; the service is useless without
//! them.

use clap::Parser;
use repotally::clone::GixCloner;
use repotally::config::Config;
use repotally::github::GithubProbe;
use repotally::queue::TaskQueue;
use repotally::registry::{self, LanguageRegistry};
use repotally::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repotally")]
#[command(about = "Per-language line counts for hosted repositories, as a service")]
#[command(version)]
struct Cli {
    /// HTTP listen port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Path to the language table (default: languages.json next to the binary)
    #[arg(long)]
    languages: Option<PathBuf>,

    /// Scratch root for clone directories (default: system temp dir)
    #[arg(long)]
    scratch_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = cli.scratch_dir {
        config.scratch_dir = dir;
    }

    let default_filter = if config.debug {
        "repotally=debug"
    } else {
        "repotally=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let asset = cli.languages.unwrap_or_else(registry::default_asset_path);
    let registry = Arc::new(LanguageRegistry::load(&asset)?);
    tracing::info!(
        languages = registry.len(),
        asset = %asset.display(),
        "language registry loaded"
    );

    let queue = Arc::new(TaskQueue::start(
        &config,
        Arc::clone(&registry),
        Arc::new(GixCloner),
    ));

    let probe = Arc::new(GithubProbe::new(config.github_token.clone())?);

    server::serve(AppState { queue, probe }, config.port).await?;

    Ok(())
}
