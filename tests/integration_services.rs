#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

/// Full pipeline against mocked Ollama and Groq HTTP endpoints
use std::fs;

use health_rag::chatbot::{Assistant, ChatOutcome, DISCLAIMER_FOOTER, GENERIC_FAILURE_MESSAGE};
use health_rag::commands::build_index_with;
use health_rag::config::Config;
use health_rag::embeddings::OllamaEmbedder;
use health_rag::generation::GroqClient;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_ollama(dimension: usize) -> MockServer {
    let server = MockServer::start().await;
    let vector = (0..dimension)
        .map(|i| (i as f32 + 1.0) / dimension as f32)
        .collect::<Vec<_>>();

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(serde_json::json!({ "model": "all-minilm" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embeddings": [vector] })),
        )
        .mount(&server)
        .await;
    server
}

fn config_for(ollama: &MockServer, groq: &MockServer, temp_dir: &TempDir) -> Config {
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.ollama.host = ollama.address().ip().to_string();
    config.ollama.port = ollama.address().port();
    config.ollama.embedding_dimension = 8;
    // One text per request so the fixed mock reply always has the right count
    config.ollama.batch_size = 1;
    config.groq.base_url = format!("{}/openai/v1/", groq.uri());
    config.groq.api_key = Some("test-key".to_string());

    let content = config.content_dir();
    fs::create_dir_all(&content).expect("should create content dir");
    fs::write(
        content.join("faq.json"),
        r#"{"question": "What are signs of dehydration?", "answer": "Thirst and dark urine.", "category": "hydration"}"#,
    )
    .expect("should write faq");
    fs::write(
        content.join("sleep.txt"),
        "Most adults need seven to nine hours of sleep.",
    )
    .expect("should write text");
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn answers_through_hosted_services() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let ollama = mock_ollama(8).await;
    let groq = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({ "temperature": 0.0, "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "Watch for thirst and dark urine." } }]
        })))
        .expect(1)
        .mount(&groq)
        .await;
    let config = config_for(&ollama, &groq, &temp_dir);

    let embedder = OllamaEmbedder::new(&config).expect("embedder builds");
    let summary = build_index_with(&config, &config.content_dir(), &embedder)
        .await
        .expect("index builds");
    assert_eq!(summary.chunks, 2);

    let assistant = Assistant::open(
        &config,
        Box::new(OllamaEmbedder::new(&config).expect("embedder builds")),
        Box::new(GroqClient::from_config(&config).expect("client builds")),
    )
    .await
    .expect("assistant opens");

    let outcome = assistant
        .chat(Some("What are signs of dehydration?"), &[])
        .await;
    assert_eq!(
        outcome,
        ChatOutcome::Answered(format!(
            "Watch for thirst and dark urine.{}",
            DISCLAIMER_FOOTER
        ))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn upstream_failure_is_reported_generically() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let ollama = mock_ollama(8).await;
    let groq = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&groq)
        .await;
    let config = config_for(&ollama, &groq, &temp_dir);

    let embedder = OllamaEmbedder::new(&config).expect("embedder builds");
    build_index_with(&config, &config.content_dir(), &embedder)
        .await
        .expect("index builds");

    let assistant = Assistant::open(
        &config,
        Box::new(embedder),
        Box::new(GroqClient::from_config(&config).expect("client builds")),
    )
    .await
    .expect("assistant opens");

    let (answer, error) = assistant
        .chat(Some("How much sleep do adults need?"), &[])
        .await
        .into_reply();
    assert!(answer.is_empty());
    assert_eq!(error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
}

#[tokio::test(flavor = "multi_thread")]
async fn embedding_failure_aborts_build() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let ollama = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ollama)
        .await;
    let groq = MockServer::start().await;
    let config = config_for(&ollama, &groq, &temp_dir);

    let embedder = OllamaEmbedder::new(&config).expect("embedder builds");
    let result = build_index_with(&config, &config.content_dir(), &embedder).await;

    assert!(result.is_err());
    assert!(!health_rag::database::VectorIndex::exists(&config.index_dir()));
}
