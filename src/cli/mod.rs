//! CLI for Liedwyser — the thin presentation layer over the engine.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::init::AppContext;
use crate::services::{RecommendOptions, SongView, DEFAULT_TOP_K};

/// Liedwyser - liturgical song recommendations for sermons and themes
#[derive(Parser)]
#[command(name = "liedwyser", version, about, long_about = None)]
pub struct Cli {
    /// Path to the song corpus (JSON array of song records)
    #[arg(long, env = "LIEDWYSER_CORPUS", default_value = "songs.json", global = true)]
    pub corpus: PathBuf,

    /// Override data directory (default: ~/.liedwyser)
    #[arg(long, env = "LIEDWYSER_DATA_PATH", global = true)]
    pub data_path: Option<PathBuf>,

    /// Output as JSON instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend songs matching a sermon text, scripture reference, or theme
    Recommend {
        /// The query text
        query: String,
        /// Maximum results returned
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Minimum similarity score, results below are dropped
        #[arg(long, default_value_t = 0.0)]
        min_score: f32,
    },

    /// Precompute and cache embeddings for every song in the corpus
    Warm,

    /// Show corpus, cache, and model status
    Status,
}

/// Execute a parsed command against the application context.
pub async fn execute(command: &Commands, ctx: &AppContext, json: bool) -> Result<()> {
    match command {
        Commands::Recommend {
            query,
            top_k,
            min_score,
        } => {
            let options = RecommendOptions {
                top_k: *top_k,
                min_score: *min_score,
            };
            let results = ctx.recommender.recommend(query, &options).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                render_recommendations(&results);
            }
        }
        Commands::Warm => {
            let computed = ctx.recommender.warm().await?;
            println!(
                "{} {} embeddings computed",
                "Cache warmed:".green().bold(),
                computed
            );
        }
        Commands::Status => {
            let corpus = ctx.store.snapshot();
            let cached = ctx.cache.count_for_version(corpus.version());
            if json {
                let status = serde_json::json!({
                    "songs": corpus.len(),
                    "corpus_version": corpus.version(),
                    "cached_embeddings": cached,
                    "cache_persistent": ctx.cache.is_persistent(),
                    "model_available": ctx.embedding_service.is_available(),
                    "dimensions": ctx.embedding_service.dimensions(),
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                render_status(ctx, corpus.len(), corpus.version(), cached);
            }
        }
    }
    Ok(())
}

fn render_recommendations(results: &[SongView]) {
    if results.is_empty() {
        println!("{}", "No sufficiently similar songs found.".yellow());
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Song", "Number", "Category", "Score"]);
    for (rank, song) in results.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&song.title),
            Cell::new(song.number.map(|n| n.to_string()).unwrap_or_default()),
            Cell::new(song.category.as_deref().unwrap_or("")),
            Cell::new(format!("{:.3}", song.score)),
        ]);
    }
    println!("{table}");
}

fn render_status(ctx: &AppContext, songs: usize, version: &str, cached: usize) {
    println!("{}", "Liedwyser status".bold());
    println!("  corpus:     {} songs ({})", songs, ctx.corpus_path.display());
    println!("  version:    {}", &version[..16.min(version.len())]);
    println!(
        "  cache:      {}/{} embeddings ({})",
        cached,
        songs,
        if ctx.cache.is_persistent() {
            "persistent".green()
        } else {
            "in-memory only".yellow()
        }
    );
    if ctx.embedding_service.is_available() {
        println!(
            "  model:      {} ({} dims)",
            "available".green(),
            ctx.embedding_service.dimensions()
        );
    } else {
        println!("  model:      {}", "unavailable (degraded)".red());
    }
}
