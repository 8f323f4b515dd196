#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

/// End-to-end tests from content files on disk to disclaimed answers
use std::fs;
use std::sync::{Arc, Mutex};

use health_rag::RagError;
use health_rag::chatbot::{Assistant, ChatOutcome, DISCLAIMER_FOOTER, INDEX_MISSING_MESSAGE};
use health_rag::commands::build_index_with;
use health_rag::config::Config;
use health_rag::conversation::Conversation;
use health_rag::database::{IndexManifest, VectorIndex};
use health_rag::embeddings::{Embedder, EmbeddingFingerprint};
use health_rag::generation::groq::MISSING_API_KEY_MESSAGE;
use health_rag::generation::{ChatModel, CompletionRequest, GroqClient};
use tempfile::TempDir;

const DIMENSION: usize = 32;

/// Counts letters into buckets so related texts share direction
struct LetterEmbedder;

impl Embedder for LetterEmbedder {
    fn fingerprint(&self) -> EmbeddingFingerprint {
        EmbeddingFingerprint {
            provider: "test".to_string(),
            model: "letters".to_string(),
            dimension: DIMENSION as u32,
        }
    }

    fn embed(&self, text: &str) -> health_rag::Result<Vec<f32>> {
        let mut vector = vec![0.0_f32; DIMENSION];
        vector[0] = 1.0;
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            let bucket = 1 + (c.to_ascii_lowercase() as usize - 'a' as usize) % (DIMENSION - 1);
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }
}

#[derive(Clone, Default)]
struct EchoModel {
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ChatModel for EchoModel {
    fn complete(&self, request: &CompletionRequest) -> health_rag::Result<String> {
        self.requests
            .lock()
            .expect("lock is not poisoned")
            .push(request.clone());
        Ok("Rest, fluids and a doctor visit if symptoms get worse.".to_string())
    }
}

fn setup() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    fs::create_dir_all(config.content_dir()).expect("should create content dir");
    (config, temp_dir)
}

fn write_corpus(config: &Config) {
    let content = config.content_dir();
    fs::write(
        content.join("faq.json"),
        r#"[
            {"question": "What are flu symptoms?", "answer": "Fever, cough and tiredness.", "category": "infections"},
            {"question": "How much water should I drink?", "answer": "Drink regularly through the day."}
        ]"#,
    )
    .expect("should write faq");
    fs::write(
        content.join("headache.md"),
        "# Headaches\n\nSee a doctor for a sudden or severe headache.",
    )
    .expect("should write markdown");
    fs::write(content.join("notes.pdf"), "ignored").expect("should write unsupported file");
}

#[tokio::test]
async fn build_then_answer_with_disclaimer() {
    let (config, _temp_dir) = setup();
    write_corpus(&config);

    let summary = build_index_with(&config, &config.content_dir(), &LetterEmbedder)
        .await
        .expect("index builds");
    assert_eq!(summary.documents, 3);
    assert_eq!(summary.chunks, 3);

    let manifest = IndexManifest::read(&config.index_dir())
        .expect("manifest readable")
        .expect("manifest present");
    assert_eq!(manifest.chunk_count, 3);
    assert_eq!(manifest.embedding, LetterEmbedder.fingerprint());

    let model = EchoModel::default();
    let assistant = Assistant::open(&config, Box::new(LetterEmbedder), Box::new(model.clone()))
        .await
        .expect("assistant opens");
    assert!(assistant.is_index_available());

    let mut conversation = Conversation::new();
    let outcome = assistant
        .chat(Some("What are flu symptoms?"), conversation.turns())
        .await;
    let ChatOutcome::Answered(answer) = outcome else {
        panic!("expected an answer, got {outcome:?}");
    };
    assert!(answer.starts_with("Rest, fluids"));
    assert!(answer.ends_with(DISCLAIMER_FOOTER));

    conversation.push_user("What are flu symptoms?");
    conversation.push_assistant(answer);
    let outcome = assistant
        .chat(Some("How long does it last?"), conversation.turns())
        .await;
    assert!(outcome.is_answered());

    let requests = model.requests.lock().expect("lock is not poisoned").clone();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].messages[0].content.contains("Context:"));
    assert_eq!(requests[1].messages.len(), 4);
}

#[tokio::test]
async fn rebuild_replaces_previous_index() {
    let (config, _temp_dir) = setup();
    write_corpus(&config);
    build_index_with(&config, &config.content_dir(), &LetterEmbedder)
        .await
        .expect("first build");

    fs::remove_file(config.content_dir().join("headache.md")).expect("should remove file");
    let summary = build_index_with(&config, &config.content_dir(), &LetterEmbedder)
        .await
        .expect("second build");
    assert_eq!(summary.chunks, 2);

    let index = VectorIndex::open(&config.index_dir(), &LetterEmbedder.fingerprint())
        .await
        .expect("index opens");
    assert_eq!(index.count().await.expect("count succeeds"), 2);
}

#[tokio::test]
async fn empty_content_directory_fails_to_build() {
    let (config, _temp_dir) = setup();

    let result = build_index_with(&config, &config.content_dir(), &LetterEmbedder).await;

    let error = result.expect_err("empty corpus must not build");
    assert!(matches!(
        error.downcast_ref::<RagError>(),
        Some(RagError::EmptyCorpus)
    ));
    assert!(!VectorIndex::exists(&config.index_dir()));
}

#[tokio::test]
async fn missing_index_asks_user_to_build() {
    let (config, _temp_dir) = setup();

    let assistant = Assistant::open(
        &config,
        Box::new(LetterEmbedder),
        Box::new(EchoModel::default()),
    )
    .await
    .expect("assistant opens without an index");

    let (answer, error) = assistant.chat(Some("What is the flu?"), &[]).await.into_reply();
    assert_eq!(answer, "");
    assert_eq!(error.as_deref(), Some(INDEX_MISSING_MESSAGE));
}

#[tokio::test]
async fn missing_api_key_is_reported() {
    let (config, _temp_dir) = setup();
    write_corpus(&config);
    build_index_with(&config, &config.content_dir(), &LetterEmbedder)
        .await
        .expect("index builds");

    let client = GroqClient::from_config(&config).expect("client builds");
    let assistant = Assistant::open(&config, Box::new(LetterEmbedder), Box::new(client))
        .await
        .expect("assistant opens");

    let (_, error) = assistant.chat(Some("What is the flu?"), &[]).await.into_reply();
    assert_eq!(error.as_deref(), Some(MISSING_API_KEY_MESSAGE));
}
