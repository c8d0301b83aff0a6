//! Liedwyser - liturgical song recommendations from sermon themes
//!
//! Usage:
//!   liedwyser recommend "a sermon about grace and forgiveness"
//!   liedwyser warm                 Precompute song embeddings
//!   liedwyser status               Corpus, cache, and model overview
//!   liedwyser --help               Show all commands

use anyhow::Result;
use clap::Parser;

use liedwyser::cli::{execute, Cli};
use liedwyser::init::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("liedwyser=info".parse()?),
        )
        .init();

    let ctx = AppContext::new(cli.corpus.clone(), cli.data_path.clone())?;
    execute(&cli.command, &ctx, cli.json).await?;

    Ok(())
}
