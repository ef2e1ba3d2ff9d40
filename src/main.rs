use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;
use typesplit::core::Engine;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    debug!("Starting typesplit v{}", env!("CARGO_PKG_VERSION"));

    let engine = Engine::new(cli.config.as_deref(), Some(cli.root.as_path())).await?;

    cli.execute(engine).await
}
