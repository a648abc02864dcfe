//! EthioHomes launcher.
//!
//! # Commands
//!
//! ```bash
//! # Build the index if the dataset changed, then report its size
//! ethiohomes index
//!
//! # Drop the persisted index and embed everything again
//! ethiohomes index --rebuild
//!
//! # Ask one question
//! ethiohomes ask "3 bedroom house in Addis Ababa"
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ethiohomes_rag::{
    AnswerComposer, IndexOutcome, OllamaEmbeddingProvider, OllamaGenerationProvider, QueryService,
    Retriever, VectorIndex, document, record,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "ethiohomes")]
#[command(about = "Property recommendations for Addis Ababa and Bahir Dar")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "ETHIOHOMES_CONFIG")]
    config: Option<PathBuf>,

    /// CSV listing table (overrides the config file)
    #[arg(long, env = "ETHIOHOMES_DATA")]
    data: Option<PathBuf>,

    /// Index directory (overrides the config file)
    #[arg(long, env = "ETHIOHOMES_INDEX_DIR")]
    index_dir: Option<PathBuf>,

    /// Ollama server URL (overrides the config file)
    #[arg(long, env = "OLLAMA_HOST")]
    ollama_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or refresh the listing index
    Index {
        /// Discard the persisted index first
        #[arg(long)]
        rebuild: bool,
    },

    /// Answer a question about the listings
    Ask {
        /// The question, e.g. "apartments in Bahir Dar"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

impl Cli {
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(index_dir) = &self.index_dir {
            config.index_location = index_dir.clone();
        }
        if let Some(url) = &self.ollama_url {
            config.ollama.base_url = url.clone();
        }
        Ok(config)
    }
}

/// Load the listings and bring the persisted index up to date.
async fn open_index(
    config: &AppConfig,
    client: &reqwest::Client,
    rebuild: bool,
) -> Result<(Arc<VectorIndex>, IndexOutcome)> {
    let records = record::load(&config.data_path)
        .with_context(|| format!("failed to load listings from {}", config.data_path.display()))?;
    let documents = document::build_all(&records);

    let embedder = Arc::new(OllamaEmbeddingProvider::with_client(
        client.clone(),
        config.ollama.clone(),
    ));
    let index = VectorIndex::open_or_create(&config.index_location, embedder)
        .await
        .with_context(|| format!("failed to open index at {}", config.index_location.display()))?
        .with_policy(config.embedding_policy);

    if rebuild {
        index.clear().await.context("failed to clear the index")?;
    }
    let outcome = index.ensure_indexed(&documents).await.context("failed to build the index")?;
    Ok((Arc::new(index), outcome))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Index { rebuild } => {
            let (index, outcome) = open_index(&config, &client, rebuild).await?;
            println!(
                "{:?}: {} listings indexed at {}",
                outcome,
                index.len().await,
                index.location().unwrap_or(&config.index_location).display()
            );
        }

        Commands::Ask { question } => {
            let (index, outcome) = open_index(&config, &client, false).await?;
            info!(?outcome, "index ready");

            let retriever = Retriever::with_config(index, config.retrieval)?;
            let generator =
                Arc::new(OllamaGenerationProvider::with_client(client, config.ollama.clone()));
            let composer = AnswerComposer::new(generator).with_policy(config.generation_policy);
            let service = QueryService::new(Arc::new(retriever), Arc::new(composer));

            println!("{}", service.answer_query(&question.join(" ")).await);
        }
    }

    Ok(())
}
