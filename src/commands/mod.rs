#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::chatbot::{
    Assistant, ChatOutcome, DISCLAIMER, DISCLAIMER_FOOTER, INDEX_MISSING_MESSAGE, RejectionKind,
};
use crate::config::Config;
use crate::conversation::Conversation;
use crate::database::{IndexManifest, VectorIndex};
use crate::embeddings::{Embedder, OllamaEmbedder, split_documents};
use crate::generation::GroqClient;
use crate::generation::groq::MISSING_API_KEY_MESSAGE;
use crate::ingest::load_all;

/// Sample questions for a quick end-to-end check
pub const EXAMPLE_QUERIES: &[&str] = &[
    "What are common flu symptoms?",
    "How much water should I drink per day?",
    "Can I take ibuprofen with aspirin?",
    "When should I see a doctor for a headache?",
    "What are signs of dehydration?",
];

const PREVIEW_LENGTH: usize = 400;

/// Counts reported after an index build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub documents: usize,
    pub chunks: usize,
}

/// Load, chunk and embed the content directory, replacing the index on disk
#[inline]
pub async fn build_index(config: &Config, content_dir: Option<PathBuf>) -> Result<BuildSummary> {
    let embedder = OllamaEmbedder::new(config)?;
    let content_dir = content_dir.unwrap_or_else(|| config.content_dir());

    println!("📚 Building knowledge base");
    println!("   Content: {}", content_dir.display());
    println!("   Index:   {}", config.index_dir().display());

    let summary = build_index_with(config, &content_dir, &embedder).await?;

    println!(
        "{}",
        style(format!(
            "✓ Indexed {} chunks from {} documents",
            summary.chunks, summary.documents
        ))
        .green()
    );
    Ok(summary)
}

/// Build the index with a caller-supplied embedder
#[inline]
pub async fn build_index_with(
    config: &Config,
    content_dir: &Path,
    embedder: &dyn Embedder,
) -> Result<BuildSummary> {
    let documents = load_all(content_dir);
    let chunks = split_documents(&documents, &config.chunking);

    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(format!("Embedding {} chunks", chunks.len()));
    bar.enable_steady_tick(Duration::from_millis(120));

    let result = VectorIndex::build(&config.index_dir(), &chunks, embedder, config.chunking).await;
    bar.finish_and_clear();

    let index = result.with_context(|| {
        format!(
            "Failed to build the index from {}",
            content_dir.display()
        )
    })?;

    info!(
        "Built index with {} chunks at {}",
        index.manifest().chunk_count,
        index.path().display()
    );
    Ok(BuildSummary {
        documents: documents.len(),
        chunks: chunks.len(),
    })
}

/// Open the assistant backed by the configured local embedder and hosted model
#[inline]
pub async fn open_assistant(config: &Config) -> Result<Assistant> {
    let embedder = OllamaEmbedder::new(config)?;
    let model = GroqClient::from_config(config)?;
    Assistant::open(config, Box::new(embedder), Box::new(model))
        .await
        .context("Failed to load the assistant")
}

/// Answer each question once, without shared history.
///
/// With `shorten` set, long answers are cut to a preview that still ends with the disclaimer.
#[inline]
pub async fn ask(config: &Config, questions: &[String], shorten: bool) -> Result<()> {
    let assistant = open_assistant(config).await?;
    if report_missing_setup(config, &assistant) {
        return Ok(());
    }

    for question in questions {
        println!("{} {}", style("Q:").bold().cyan(), question);
        match assistant.chat(Some(question), &[]).await {
            ChatOutcome::Answered(answer) => {
                let answer = if shorten { preview(&answer) } else { answer };
                println!("{} {}", style("A:").bold().green(), answer);
            }
            ChatOutcome::Rejected { kind, message } => {
                println!("{} [Error] {}", style("A:").bold().red(), message);
                if let Some((index_ready, has_key)) = setup_gaps(kind) {
                    print_setup_steps(config, index_ready, has_key);
                    break;
                }
            }
        }
        println!();
    }

    Ok(())
}

/// Interactive chat session on the terminal
#[inline]
pub async fn run_chat(config: &Config, transcript: Option<PathBuf>) -> Result<()> {
    println!("{}", style("🩺 Health Information Assistant").bold().cyan());
    println!("{}", style(DISCLAIMER).yellow());
    println!();

    let assistant = open_assistant(config).await?;
    if report_missing_setup(config, &assistant) {
        return Ok(());
    }

    println!(
        "{}",
        style("Type a question. /clear resets the conversation, /quit exits.").dim()
    );

    let mut conversation = Conversation::new();
    loop {
        let line: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input")?;

        let question = match parse_chat_input(&line) {
            ChatInput::Quit => break,
            ChatInput::Clear => {
                conversation.clear();
                println!("{}", style("Conversation cleared.").dim());
                continue;
            }
            ChatInput::Blank => continue,
            ChatInput::Question(question) => question,
        };

        let spinner = ProgressBar::new_spinner().with_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(120));
        let outcome = assistant.chat(Some(question), conversation.turns()).await;
        spinner.finish_and_clear();

        match &outcome {
            ChatOutcome::Answered(answer) => {
                println!("{} {}", style("Assistant:").bold().green(), answer);
            }
            ChatOutcome::Rejected { kind, message } => {
                println!("{} {}", style("Error:").bold().red(), message);
                if let Some((index_ready, has_key)) = setup_gaps(*kind) {
                    print_setup_steps(config, index_ready, has_key);
                }
            }
        }
        record_exchange(&mut conversation, question, outcome);
        println!();
    }

    if let Some(path) = transcript {
        conversation
            .save_transcript(&path)
            .with_context(|| format!("Failed to save transcript to {}", path.display()))?;
        println!("Transcript saved to {}", style(path.display()).cyan());
    }

    Ok(())
}

/// Report index, model and configuration health
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("📊 Health RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Ollama Status:");
    match OllamaEmbedder::new(config) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
            }
            Err(e) => match client.ping() {
                Ok(()) => println!("   ⚠️  Ollama: Connected but unhealthy - {}", e),
                Err(_) => println!("   ❌ Ollama: Unreachable - {}", e),
            },
        },
        Err(e) => println!("   ❌ Ollama: Invalid configuration - {}", e),
    }

    println!();
    println!("🔑 Answer Model:");
    println!("   📋 Model: {}", config.groq.model);
    if config.groq_api_key().is_some() {
        println!("   ✅ API key: configured");
    } else {
        println!("   ❌ API key: missing (set GROQ_API_KEY)");
    }

    println!();
    println!("🔍 Vector Index Status:");
    let index_dir = config.index_dir();
    match IndexManifest::read(&index_dir) {
        Ok(Some(manifest)) => {
            println!("   ✅ Index: {}", index_dir.display());
            println!("   🧮 Embeddings: {}", manifest.embedding);
            println!("   📦 Chunks: {}", manifest.chunk_count);
            println!(
                "   ✂️  Chunking: {} chars, {} overlap",
                manifest.chunking.chunk_size, manifest.chunking.chunk_overlap
            );
            println!(
                "   🕒 Built: {}",
                manifest.built_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            match VectorIndex::open(&index_dir, &manifest.embedding).await {
                Ok(index) => match index.count().await {
                    Ok(rows) => println!("   ✅ LanceDB: {} rows", rows),
                    Err(e) => println!("   ❌ LanceDB: {}", e),
                },
                Err(e) => println!("   ❌ LanceDB: {}", e),
            }
            if manifest.chunking != config.chunking {
                warn!("Chunking settings changed since the index was built");
                println!("   ⚠️  Chunking settings changed since build; run `health-rag build`");
            }
        }
        Ok(None) => {
            println!("   ❌ Index: not built (run `health-rag build`)");
        }
        Err(e) => println!("   ❌ Index: unreadable - {}", e),
    }

    println!();
    println!("📁 Paths:");
    println!("   Content: {}", config.content_dir().display());
    println!("   Config:  {}", config.config_file_path().display());

    Ok(())
}

/// One line typed into the chat prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatInput<'a> {
    Quit,
    Clear,
    Blank,
    Question(&'a str),
}

fn parse_chat_input(line: &str) -> ChatInput<'_> {
    match line.trim() {
        "/quit" | "/exit" => ChatInput::Quit,
        "/clear" => ChatInput::Clear,
        "" => ChatInput::Blank,
        question => ChatInput::Question(question),
    }
}

/// Add a finished exchange to the session history.
///
/// Refused input never reaches the history, so it is not replayed to the model.
fn record_exchange(conversation: &mut Conversation, question: &str, outcome: ChatOutcome) {
    match outcome {
        ChatOutcome::Answered(answer) => {
            conversation.push_user(question);
            conversation.push_assistant(answer);
        }
        ChatOutcome::Rejected {
            kind: RejectionKind::InvalidInput,
            ..
        } => {}
        ChatOutcome::Rejected { message, .. } => {
            conversation.push_user(question);
            conversation.push_assistant(format!("[Error: {}]", message));
        }
    }
}

/// Print what is missing before any question is sent; true when setup is incomplete
fn report_missing_setup(config: &Config, assistant: &Assistant) -> bool {
    let index_ready = assistant.is_index_available();
    let has_key = config.groq_api_key().is_some();
    if index_ready && has_key {
        return false;
    }

    if !has_key {
        println!("{} {}", style("Error:").bold().red(), MISSING_API_KEY_MESSAGE);
    }
    if !index_ready {
        println!("{} {}", style("Error:").bold().red(), INDEX_MISSING_MESSAGE);
    }
    print_setup_steps(config, index_ready, has_key);
    true
}

/// Setup steps a rejection calls for, as `(index_ready, has_key)`
fn setup_gaps(kind: RejectionKind) -> Option<(bool, bool)> {
    match kind {
        RejectionKind::IndexUnavailable => Some((false, true)),
        RejectionKind::Configuration => Some((true, false)),
        RejectionKind::InvalidInput | RejectionKind::Failure => None,
    }
}

fn print_setup_steps(config: &Config, index_ready: bool, has_key: bool) {
    println!();
    println!("{}", style("Setup steps").bold().yellow());
    let mut step = 1;
    if !has_key {
        println!("  {}. Set your Groq API key:", step);
        println!("     export GROQ_API_KEY=your-groq-api-key-here");
        println!("     (or run `health-rag config`; get a key at https://console.groq.com/keys)");
        step += 1;
    }
    if !index_ready {
        println!(
            "  {}. Add .json, .txt or .md files to {}",
            step,
            config.content_dir().display()
        );
        step += 1;
        println!("  {}. Build the knowledge base:", step);
        println!("     health-rag build");
        step += 1;
    }
    println!("  {}. Start the chat again: health-rag chat", step);
}

/// Shorten an answer body, keeping the disclaimer footer intact
fn preview(reply: &str) -> String {
    let body = reply.strip_suffix(DISCLAIMER_FOOTER).unwrap_or(reply);
    if body.chars().count() <= PREVIEW_LENGTH {
        return reply.to_string();
    }

    let head = body.chars().take(PREVIEW_LENGTH).collect::<String>();
    format!("{}...{}", head, DISCLAIMER_FOOTER)
}
