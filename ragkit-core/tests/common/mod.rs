//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ragkit_core::prelude::*;

const RIGHTS: &[&str] = &["right", "rights", "equality", "freedom", "fundamental"];
const DIRECTIVES: &[&str] = &["directive", "principles", "policy", "state"];

/// Deterministic embedder: axis 0 counts rights vocabulary, axis 1 counts
/// directive-principles vocabulary. Texts containing "FAIL" are refused.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embeddings for KeywordEmbedder {
    async fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("FAIL") {
            return Err(Error::embedding("service returned 500"));
        }

        let mut vector = vec![0.0f32; 2];
        for word in text.split_whitespace() {
            let word = word.to_lowercase();
            if RIGHTS.contains(&word.as_str()) {
                vector[0] += 1.0;
            }
            if DIRECTIVES.contains(&word.as_str()) {
                vector[1] += 1.0;
            }
        }
        Ok(vector)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Provider that echoes a fixed reply and remembers the last prompt
#[derive(Default)]
pub struct EchoProvider {
    pub last_prompt: std::sync::Mutex<Option<String>>,
}

#[async_trait]
impl Provider for EchoProvider {
    async fn stream_chat(&self, _model: &str, messages: Vec<Message>) -> Result<AnswerStream> {
        let prompt = messages.last().map(|m| m.content.clone());
        *self.last_prompt.lock().unwrap() = prompt;

        Ok(ragkit_core::generation::ScriptedStream::new()
            .fragment("Article 14 ")
            .fragment("guarantees equality.")
            .end()
            .build())
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

pub const CONSTITUTION_CSV: &str = "article\n\
Right to Equality\n\
Right to Freedom\n\
Directive Principles\n";
