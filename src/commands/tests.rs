use super::*;
use crate::embeddings::ChunkingConfig;
use crate::test_support::{HashEmbedder, ScriptedModel, health_chunks};
use tempfile::TempDir;

#[test]
fn short_answer_is_not_shortened() {
    let reply = format!("Drink water regularly.{}", DISCLAIMER_FOOTER);
    assert_eq!(preview(&reply), reply);
}

#[test]
fn long_answer_preview_keeps_disclaimer() {
    let reply = format!("{}{}", "a".repeat(380), DISCLAIMER_FOOTER);

    let shortened = preview(&reply);

    assert!(shortened.ends_with(DISCLAIMER_FOOTER));
    assert_eq!(reply, shortened);

    let reply = format!("{}{}", "b".repeat(900), DISCLAIMER_FOOTER);
    let shortened = preview(&reply);
    assert!(shortened.ends_with(DISCLAIMER_FOOTER));
    assert!(shortened.starts_with(&format!("{}...", "b".repeat(PREVIEW_LENGTH))));
    assert_eq!(
        shortened.chars().count(),
        PREVIEW_LENGTH + 3 + DISCLAIMER_FOOTER.chars().count()
    );
}

#[test]
fn chat_input_commands() {
    assert_eq!(parse_chat_input("/quit"), ChatInput::Quit);
    assert_eq!(parse_chat_input(" /exit "), ChatInput::Quit);
    assert_eq!(parse_chat_input("/clear"), ChatInput::Clear);
    assert_eq!(parse_chat_input(""), ChatInput::Blank);
    assert_eq!(parse_chat_input("   \t"), ChatInput::Blank);
    assert_eq!(
        parse_chat_input("  What is the flu? "),
        ChatInput::Question("What is the flu?")
    );
}

#[test]
fn refused_input_is_not_recorded() {
    let mut conversation = Conversation::new();

    record_exchange(
        &mut conversation,
        "dosage 500",
        ChatOutcome::Rejected {
            kind: RejectionKind::InvalidInput,
            message: "blocked".to_string(),
        },
    );
    assert!(conversation.is_empty());

    record_exchange(
        &mut conversation,
        "What is the flu?",
        ChatOutcome::Rejected {
            kind: RejectionKind::Failure,
            message: "Something went wrong".to_string(),
        },
    );
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation.turns()[1].text, "[Error: Something went wrong]");
}

#[tokio::test]
async fn refused_turns_never_reach_the_model() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    VectorIndex::build(
        &config.index_dir(),
        &health_chunks(),
        &HashEmbedder::new(),
        ChunkingConfig::default(),
    )
    .await
    .expect("index builds");
    let model = ScriptedModel::replying("Fever and cough.");
    let assistant = Assistant::open(&config, Box::new(HashEmbedder::new()), Box::new(model.clone()))
        .await
        .expect("assistant opens");

    let mut conversation = Conversation::new();
    for line in ["", "   ", "dosage 500", "What are flu symptoms?"] {
        let ChatInput::Question(question) = parse_chat_input(line) else {
            continue;
        };
        let outcome = assistant.chat(Some(question), conversation.turns()).await;
        record_exchange(&mut conversation, question, outcome);
    }

    let requests = model.recorded();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[0].messages[1].content, "What are flu symptoms?");
    assert_eq!(conversation.len(), 2);
}

#[test]
fn setup_steps_follow_the_rejection() {
    assert_eq!(setup_gaps(RejectionKind::Configuration), Some((true, false)));
    assert_eq!(setup_gaps(RejectionKind::IndexUnavailable), Some((false, true)));
    assert_eq!(setup_gaps(RejectionKind::InvalidInput), None);
    assert_eq!(setup_gaps(RejectionKind::Failure), None);
}
