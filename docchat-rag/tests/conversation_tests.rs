//! End-to-end tests for the retrieve → assemble → generate loop.

mod common;

use std::sync::Arc;

use common::{LetterEmbedder, ScriptedGenerator, config_in, store_with};
use docchat_rag::{
    ChatSession, ConversationOrchestrator, Generation, GenerationError, RagConfig, RagError, Role,
    Speaker,
};
use serde_json::json;

async fn indexed_store(config: &RagConfig) -> Arc<docchat_rag::DocumentStore> {
    let store = store_with(config.clone(), Arc::new(LetterEmbedder));
    store
        .ingest_documents([
            ("cats.txt", "cats purr and nap in the sun"),
            ("dogs.txt", "dogs bark and fetch sticks"),
            ("zzz.txt", "zzz zzz zzz"),
        ])
        .await;
    store.build_index().await.unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn ask_cites_sources_in_rank_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let store = indexed_store(&config).await;
    let generator = Arc::new(ScriptedGenerator::new(Generation::answered(
        "Cats purr.",
        json!({"choices": [{"message": {"content": "Cats purr."}}]}),
    )));
    let orchestrator = ConversationOrchestrator::new(&config, store, generator.clone());

    let answer = orchestrator.ask("do cats purr", &[]).await.unwrap();

    assert_eq!(answer.text, "Cats purr.");
    assert!(answer.error.is_none());
    assert_eq!(answer.sources.len(), 2);
    assert_eq!(answer.sources[0].source, "cats.txt");
    assert_eq!(answer.sources[0].excerpt, "cats purr and nap in the sun");
    assert!(answer.sources[0].score >= answer.sources[1].score);

    let retrieved = orchestrator.last_retrieved().await;
    assert_eq!(retrieved.len(), 2);
    assert_eq!(retrieved[0].passage.source, answer.sources[0].source);

    let requests = generator.requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0].messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].role, Role::User);
    assert!(messages[1].content.starts_with("Use the documents below to answer the question."));
    assert!(messages[1].content.contains("Source: cats.txt\n"));
    assert!(messages[1].content.ends_with("\nQuestion: do cats purr"));
    assert_eq!(requests[0].max_tokens, config.max_tokens);
    assert_eq!(requests[0].temperature, 0.0);
}

#[tokio::test]
async fn empty_answer_is_returned_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let store = indexed_store(&config).await;
    let generator = Arc::new(ScriptedGenerator::new(Generation::answered("", json!({"choices": []}))));
    let orchestrator = ConversationOrchestrator::new(&config, store, generator);

    let answer = orchestrator.ask("anything", &[]).await.unwrap();
    assert_eq!(answer.text, "");
    assert!(answer.error.is_none());
    assert_eq!(answer.sources.len(), 2);
}

#[tokio::test]
async fn retrieval_failure_leaves_no_assistant_turn() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    // Nothing built or persisted.
    let store = Arc::new(store_with(config.clone(), Arc::new(LetterEmbedder)));
    let generator = Arc::new(ScriptedGenerator::new(Generation::answered("unused", json!(null))));
    let orchestrator = Arc::new(ConversationOrchestrator::new(&config, store, generator.clone()));
    let mut session = ChatSession::new(orchestrator);

    let err = session.send("hello?").await.unwrap_err();
    assert!(matches!(err, RagError::IndexNotFound { .. }));
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].speaker, Speaker::User);
    assert!(generator.requests().is_empty());
}

#[tokio::test]
async fn failed_generation_becomes_the_assistant_turn() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let store = indexed_store(&config).await;
    let generator = Arc::new(ScriptedGenerator::new(Generation::failed(
        GenerationError::Status { status: 503, body: "over capacity".into() },
        json!(null),
    )));
    let orchestrator = Arc::new(ConversationOrchestrator::new(&config, store, generator));
    let mut session = ChatSession::new(orchestrator);

    let answer = session.send("dogs?").await.unwrap();
    assert_eq!(answer.text, "API error (503): over capacity");
    assert!(answer.error.is_some());
    assert_eq!(answer.sources.len(), 2);

    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].speaker, Speaker::Assistant);
    assert_eq!(history[1].text, "API error (503): over capacity");
}

#[tokio::test]
async fn session_history_is_windowed_into_the_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let config = RagConfig::builder()
        .chunk_size(40)
        .chunk_overlap(10)
        .top_k(1)
        .history_window(3)
        .index_path(dir.path().join("index.json"))
        .build()
        .unwrap();
    let store = indexed_store(&config).await;
    let generator = Arc::new(ScriptedGenerator::new(Generation::answered("ok", json!({}))));
    let orchestrator = Arc::new(ConversationOrchestrator::new(&config, store, generator.clone()));
    let mut session = ChatSession::new(orchestrator);

    session.send("first").await.unwrap();
    session.send("second").await.unwrap();
    session.send("third").await.unwrap();

    assert_eq!(session.history().len(), 6);
    assert_eq!(session.transcript().len(), 6);

    let requests = generator.requests();
    // system + [user] + context
    assert_eq!(requests[0].messages.len(), 3);
    // system + [user, assistant, user] + context
    assert_eq!(requests[1].messages.len(), 5);
    // system + last three of [u, a, u, a, u] + context
    let last = &requests[2].messages;
    assert_eq!(last.len(), 5);
    assert_eq!(last[1].content, "second");
    assert_eq!(last[2].content, "ok");
    assert_eq!(last[3].content, "third");
    assert_eq!(last[4].content.matches("Source: ").count(), 1);
}

#[cfg(feature = "groq")]
mod groq_http {
    use axum::{Json, Router, http::StatusCode, routing::post};
    use docchat_rag::groq::GroqClient;
    use serde_json::Value;

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1/chat/completions")
    }

    #[tokio::test]
    async fn server_error_is_reported_in_the_answer() {
        let url = serve(Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model exploded") }),
        ))
        .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let store = indexed_store(&config).await;
        let client = GroqClient::compatible("test-key", url, "test-model").unwrap();
        let orchestrator = ConversationOrchestrator::new(&config, store, Arc::new(client));

        let answer = orchestrator.ask("cats", &[]).await.unwrap();
        assert_eq!(answer.text, "API error (500): model exploded");
        assert!(matches!(answer.error, Some(GenerationError::Status { status: 500, .. })));
        assert_eq!(answer.sources.len(), 2);
    }

    #[tokio::test]
    async fn completion_content_becomes_the_answer() {
        let url = serve(Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                let model = body["model"].as_str().unwrap_or_default().to_string();
                Json(json!({
                    "model": model,
                    "choices": [{"message": {"role": "assistant", "content": "They purr."}}]
                }))
            }),
        ))
        .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let store = indexed_store(&config).await;
        let client = GroqClient::compatible("test-key", url, "test-model").unwrap();
        let orchestrator = ConversationOrchestrator::new(&config, store, Arc::new(client));

        let answer = orchestrator.ask("cats", &[]).await.unwrap();
        assert_eq!(answer.text, "They purr.");
        assert!(answer.error.is_none());
        assert_eq!(answer.raw["model"], "test-model");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            GroqClient::compatible("k", format!("http://{addr}/v1/chat/completions"), "m").unwrap();
        let generation = docchat_rag::Generator::generate(
            &client,
            &docchat_rag::GenerationRequest {
                messages: vec![docchat_rag::Message::user("hi")],
                max_tokens: 8,
                temperature: 0.0,
                stop: None,
            },
        )
        .await;

        assert!(matches!(generation.error, Some(GenerationError::Transport(_))));
        assert!(generation.text.starts_with("Request Error: "));
    }
}
