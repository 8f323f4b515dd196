
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password};

use super::{Config, ConfigError, GroqConfig, OllamaConfig};
use crate::embeddings::ollama::OllamaEmbedder;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🩺 Health RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Embedding Configuration").bold().yellow());
    eprintln!("Configure the local Ollama instance used to embed documents and questions.");
    eprintln!(
        "{}",
        style("Changing the model or dimension requires rebuilding the index.").dim()
    );
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Answer Model Configuration").bold().yellow());
    eprintln!("Configure the hosted model that writes answers.");
    eprintln!();

    configure_groq(&mut config.groq)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach Ollama or the model is not installed").yellow()
        );
        eprintln!(
            "You can continue, but run `ollama pull {}` before building the index.",
            config.ollama.model
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embeddings (Ollama):").bold().yellow());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Server: {}", style(url).cyan()),
        Err(e) => eprintln!("  Server: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Embedding Model: {}", style(&config.ollama.model).cyan());
    eprintln!(
        "  Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );
    eprintln!(
        "  Chunks per Request: {}",
        style(config.ollama.batch_size).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Answer Model:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.groq.base_url).cyan());
    eprintln!("  Model: {}", style(&config.groq.model).cyan());
    eprintln!(
        "  API Key: {}",
        style(mask_secret(config.groq_api_key().as_deref())).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retrieval & Chat:").bold().yellow());
    eprintln!(
        "  Chunk Size / Overlap: {} / {}",
        style(config.chunking.chunk_size).cyan(),
        style(config.chunking.chunk_overlap).cyan()
    );
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  Max Response Tokens: {}",
        style(config.chat.max_response_tokens).cyan()
    );
    eprintln!(
        "  History Turns Kept: {}",
        style(config.chat.max_history_turns).cyan()
    );
    eprintln!(
        "  Max Question Length: {}",
        style(config.chat.max_query_length).cyan()
    );

    eprintln!();
    eprintln!(
        "Content directory: {}",
        style(config.content_dir().display()).dim()
    );
    eprintln!("Index directory: {}", style(config.index_dir().display()).dim());
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load_file(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("Existing configuration could not be read. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            if config.config_file_path().exists() {
                eprintln!("{}", style("Found existing configuration.").green());
            } else {
                eprintln!(
                    "{}",
                    style("No existing configuration found. Using defaults.").yellow()
                );
            }
            Ok(config)
        },
    )
}

/// Render a credential for display without revealing it
fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None => "not set".to_string(),
        Some(value) if value.chars().count() <= 8 => "********".to_string(),
        Some(value) => {
            let prefix: String = value.chars().take(4).collect();
            format!("{}********", prefix)
        }
    }
}

fn non_empty(label: &'static str) -> impl Fn(&String) -> Result<(), String> {
    move |input: &String| {
        if input.trim().is_empty() {
            Err(format!("{} cannot be empty", label))
        } else {
            Ok(())
        }
    }
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let current_url = ollama
        .ollama_url()
        .map_or_else(|_| String::new(), |url| url.to_string());

    let url: String = Input::new()
        .with_prompt("Ollama URL")
        .default(current_url)
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            ollama.clone().set_url(input)
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model (must be pulled with `ollama pull`)")
        .default(ollama.model.clone())
        .validate_with(non_empty("Model name"))
        .interact_text()?;

    let dimension_presets = &[
        ("all-minilm", 384),
        ("nomic-embed-text", 768),
        ("mxbai-embed-large", 1024),
    ];
    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(
            dimension_presets
                .iter()
                .find(|(name, _)| model.starts_with(name))
                .map_or(ollama.embedding_dimension, |(_, dimension)| *dimension),
        )
        .validate_with(|input: &u32| -> Result<(), String> {
            OllamaConfig::default()
                .set_embedding_dimension(*input)
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Chunks per embedding request")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), String> {
            OllamaConfig::default()
                .set_batch_size(*input)
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    ollama.set_url(&url)?;
    ollama.set_model(model)?;
    ollama.set_embedding_dimension(embedding_dimension)?;
    ollama.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_groq(groq: &mut GroqConfig) -> Result<()> {
    let endpoint: String = Input::new()
        .with_prompt("OpenAI-compatible endpoint")
        .default(groq.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            GroqConfig {
                base_url: input.clone(),
                ..groq.clone()
            }
            .validate()
        })
        .interact_text()?;
    groq.base_url = endpoint;

    let model: String = Input::new()
        .with_prompt("Answer model")
        .default(groq.model.clone())
        .validate_with(non_empty("Model name"))
        .interact_text()?;
    groq.set_model(model)?;

    eprintln!(
        "{}",
        style("The API key can also be supplied through GROQ_API_KEY, which takes precedence.")
            .dim()
    );
    let api_key = Password::new()
        .with_prompt("API key (leave empty to keep the current value)")
        .allow_empty_password(true)
        .interact()?;
    if !api_key.trim().is_empty() {
        groq.set_api_key(Some(api_key));
    }

    Ok(())
}

fn test_ollama_connection(config: &Config) -> bool {
    match OllamaEmbedder::new(config) {
        Ok(embedder) => embedder
            .with_timeout(std::time::Duration::from_secs(5))
            .health_check()
            .is_ok(),
        Err(_) => false,
    }
}
