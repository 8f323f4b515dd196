use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use health_rag::commands::{EXAMPLE_QUERIES, ask, build_index, run_chat, show_status};
use health_rag::config::{Config, get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "health-rag")]
#[command(about = "A health information assistant that answers from a local document corpus")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, content and the vector index
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding and answer models
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build the vector index from the content directory
    Build {
        /// Read documents from this directory instead of the configured one
        #[arg(long)]
        content_dir: Option<PathBuf>,
    },
    /// Ask one question and print the answer
    Ask {
        /// The question to answer
        #[arg(required_unless_present = "examples")]
        question: Option<String>,
        /// Run the built-in sample questions
        #[arg(long, conflicts_with = "question")]
        examples: bool,
    },
    /// Start an interactive chat session
    Chat {
        /// Save the conversation as JSON when the session ends
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
    /// Show index, model and configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().context("Failed to locate configuration directory")?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Build { content_dir } => {
            let config = Config::load(&config_dir)?;
            build_index(&config, content_dir).await?;
        }
        Commands::Ask { question, examples } => {
            let config = Config::load(&config_dir)?;
            let questions = if examples {
                EXAMPLE_QUERIES.iter().map(|q| (*q).to_string()).collect()
            } else {
                question.into_iter().collect::<Vec<_>>()
            };
            ask(&config, &questions, examples).await?;
        }
        Commands::Chat { transcript } => {
            let config = Config::load(&config_dir)?;
            run_chat(&config, transcript).await?;
        }
        Commands::Status => {
            let config = Config::load(&config_dir)?;
            show_status(&config).await?;
        }
    }

    Ok(())
}
