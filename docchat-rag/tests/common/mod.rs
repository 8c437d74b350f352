//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docchat_rag::{
    DocumentStore, EmbeddingProvider, Generation, GenerationRequest, Generator, RagConfig, RagError,
};

/// Deterministic embedder: counts of each ASCII letter.
///
/// Components are small integers, so vectors survive a JSON round trip exactly.
pub struct LetterEmbedder;

pub const LETTER_DIMS: usize = 26;

pub fn letter_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; LETTER_DIMS];
    for b in text.bytes() {
        if b.is_ascii_alphabetic() {
            v[(b.to_ascii_lowercase() - b'a') as usize] += 1.0;
        }
    }
    v
}

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> docchat_rag::Result<Vec<f32>> {
        Ok(letter_vector(text))
    }

    fn dimensions(&self) -> usize {
        LETTER_DIMS
    }

    fn model_id(&self) -> &str {
        "letters-v1"
    }
}

/// An embedder whose batches silently lose their last vector.
pub struct ShortBatchEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortBatchEmbedder {
    async fn embed(&self, text: &str) -> docchat_rag::Result<Vec<f32>> {
        Ok(letter_vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> docchat_rag::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|t| letter_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        LETTER_DIMS
    }

    fn model_id(&self) -> &str {
        "short-batch"
    }
}

/// Letter counts, except that text mentioning "poison" gets a NaN first component.
pub struct PoisonEmbedder;

#[async_trait]
impl EmbeddingProvider for PoisonEmbedder {
    async fn embed(&self, text: &str) -> docchat_rag::Result<Vec<f32>> {
        let mut v = letter_vector(text);
        if text.contains("poison") {
            v[0] = f32::NAN;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        LETTER_DIMS
    }

    fn model_id(&self) -> &str {
        "letters-v1"
    }
}

/// An embedder that always fails.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> docchat_rag::Result<Vec<f32>> {
        Err(RagError::EmbeddingError { provider: "failing".into(), message: "offline".into() })
    }

    fn dimensions(&self) -> usize {
        LETTER_DIMS
    }

    fn model_id(&self) -> &str {
        "failing"
    }
}

/// A generator that replays a fixed outcome and records every request.
pub struct ScriptedGenerator {
    reply: Generation,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(reply: Generation) -> Self {
        Self { reply, requests: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Generation {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}

pub fn config_in(dir: &std::path::Path) -> RagConfig {
    RagConfig::builder()
        .chunk_size(40)
        .chunk_overlap(10)
        .top_k(2)
        .embedding_model_id("letters-v1")
        .index_path(dir.join("index.json"))
        .build()
        .unwrap()
}

pub fn store_with(config: RagConfig, embedder: Arc<dyn EmbeddingProvider>) -> DocumentStore {
    DocumentStore::builder().config(config).embedding_provider(embedder).build().unwrap()
}
