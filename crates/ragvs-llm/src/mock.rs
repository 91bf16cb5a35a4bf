//! Test-only mock LLM provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    chat_log: Arc<Mutex<Vec<Vec<Message>>>>,
    embed_calls: Arc<AtomicUsize>,
    pub default_response: String,
    pub embedding: Vec<f32>,
    /// Per-text embeddings, checked before `embedding`.
    pub embeddings: HashMap<String, Vec<f32>>,
    pub supports_embeddings: bool,
    pub fail_chat: bool,
    /// Zero-based embed call index that fails; later calls are never reached by callers
    /// that abort on the first error.
    pub fail_embed_at: Option<usize>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            chat_log: Arc::new(Mutex::new(Vec::new())),
            embed_calls: Arc::new(AtomicUsize::new(0)),
            default_response: "mock response".into(),
            embedding: vec![0.0; 8],
            embeddings: HashMap::new(),
            supports_embeddings: true,
            fail_chat: false,
            fail_embed_at: None,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.embeddings.insert(text.into(), vector);
        self
    }

    #[must_use]
    pub fn with_default_embedding(mut self, vector: Vec<f32>) -> Self {
        self.embedding = vector;
        self
    }

    #[must_use]
    pub fn failing_embed_at(mut self, call: usize) -> Self {
        self.fail_embed_at = Some(call);
        self
    }

    /// Messages of every `chat` call so far, oldest first.
    #[must_use]
    pub fn recorded_chats(&self) -> Vec<Vec<Message>> {
        self.chat_log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn embed_call_count(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut log) = self.chat_log.lock() {
            log.push(messages.to_vec());
        }
        if self.fail_chat {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self
            .responses
            .lock()
            .map_err(|e| LlmError::Other(e.to_string()))?;
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let call = self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if !self.supports_embeddings {
            return Err(LlmError::EmbedUnsupported {
                provider: "mock".into(),
            });
        }
        if self.fail_embed_at == Some(call) {
            return Err(LlmError::Other("mock embed error".into()));
        }
        Ok(self
            .embeddings
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.embedding.clone()))
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_consumed_in_order() {
        let p = MockProvider::with_responses(vec!["first".into(), "second".into()]);
        assert_eq!(p.chat(&[]).await.unwrap(), "first");
        assert_eq!(p.chat(&[]).await.unwrap(), "second");
        assert_eq!(p.chat(&[]).await.unwrap(), "mock response");
    }

    #[tokio::test]
    async fn complete_records_system_and_user() {
        let p = MockProvider::default();
        p.complete("sys", "usr").await.unwrap();
        let chats = p.recorded_chats();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0][0].content, "sys");
        assert_eq!(chats[0][1].content, "usr");
    }

    #[tokio::test]
    async fn embed_fails_at_configured_call() {
        let p = MockProvider::default().failing_embed_at(1);
        assert!(p.embed("a").await.is_ok());
        assert!(p.embed("b").await.is_err());
        assert_eq!(p.embed_call_count(), 2);
    }

    #[tokio::test]
    async fn embed_uses_per_text_override() {
        let p = MockProvider::default().with_embedding("hello", vec![1.0, 0.0]);
        assert_eq!(p.embed("hello").await.unwrap(), vec![1.0, 0.0]);
        assert_eq!(p.embed("other").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn failing_chat() {
        assert!(MockProvider::failing().chat(&[]).await.is_err());
    }
}
