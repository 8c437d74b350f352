use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use docchat_rag::groq::GroqClient;
use docchat_rag::openai::OpenAIEmbeddingProvider;
use docchat_rag::{
    Answer, ChatSession, ConversationOrchestrator, DocumentStore, PlainTextExtractor, RagConfig,
    TextExtractor, append_chat_log,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use crate::cli::{EmbeddingArgs, GenerationArgs, endpoint};

pub fn open_store(config: &RagConfig, args: &EmbeddingArgs) -> Result<Arc<DocumentStore>> {
    let embedder = OpenAIEmbeddingProvider::compatible(
        args.embedding_api_key.clone(),
        endpoint(&args.embedding_base_url, "embeddings"),
        config.embedding_model_id.clone(),
        args.embedding_dimensions,
    )?;

    let store = DocumentStore::builder()
        .config(config.clone())
        .embedding_provider(Arc::new(embedder))
        .build()?;
    Ok(Arc::new(store))
}

pub fn orchestrator(
    config: &RagConfig,
    store: Arc<DocumentStore>,
    args: &GenerationArgs,
) -> Result<Arc<ConversationOrchestrator>> {
    let Some(api_key) = args.groq_api_key.as_deref().filter(|k| !k.is_empty()) else {
        bail!("GROQ_API_KEY is not set");
    };
    let client = GroqClient::compatible(
        api_key,
        endpoint(&args.groq_base_url, "chat/completions"),
        args.groq_model.clone(),
    )?;
    Ok(Arc::new(ConversationOrchestrator::new(config, store, Arc::new(client))))
}

pub async fn build(store: &DocumentStore, dir: Option<&Path>, files: &[PathBuf]) -> Result<()> {
    if dir.is_none() && files.is_empty() {
        bail!("nothing to index: pass --dir and/or files");
    }

    if let Some(dir) = dir {
        let extractors: Vec<Arc<dyn TextExtractor>> = vec![Arc::new(PlainTextExtractor::default())];
        store
            .load_dir(dir, &extractors)
            .await
            .with_context(|| format!("failed to load {}", dir.display()))?;
    }

    for file in files {
        let text = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?;
        store.ingest(&file.display().to_string(), &text).await;
    }

    store.build_index().await?;
    println!(
        "Indexed {} passages into {}",
        store.passage_count().await,
        store.index_path().display()
    );
    Ok(())
}

pub async fn ask(orchestrator: &ConversationOrchestrator, question: &str) -> Result<()> {
    let answer = orchestrator.ask(question, &[]).await?;
    print_answer(&answer);
    Ok(())
}

pub async fn chat(orchestrator: Arc<ConversationOrchestrator>, log: Option<&Path>) -> Result<()> {
    // Fail before the prompt if there is no index to talk to.
    orchestrator.store().ensure_loaded().await?;

    let mut session = ChatSession::new(Arc::clone(&orchestrator));
    let mut editor = DefaultEditor::new()?;
    println!("Ask about your documents. Type 'exit' or press Ctrl-D to quit.");

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }
        let _ = editor.add_history_entry(query);

        match session.send(query).await {
            Ok(answer) => print_answer(&answer),
            Err(e) => {
                warn!(error = %e, "question failed");
                eprintln!("Error: {e}");
            }
        }
    }

    if let Some(path) = log {
        let transcript = session.transcript();
        if !transcript.is_empty() {
            append_chat_log(path, &transcript).await?;
            info!(path = %path.display(), messages = transcript.len(), "saved chat log");
        }
    }
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("\n{}\n", answer.text);
    if answer.sources.is_empty() {
        return;
    }
    println!("Sources:");
    for (rank, source) in answer.sources.iter().enumerate() {
        println!(
            "  [{}] {} #{} (score {:.3})",
            rank + 1,
            source.source,
            source.sequence,
            source.score
        );
        println!("      {}", source.excerpt.replace('\n', " "));
    }
    println!();
}
