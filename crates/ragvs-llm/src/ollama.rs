use ollama_rs::Ollama;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message, Role};

const DEFAULT_PORT: u16 = 11434;
const PROVIDER: &str = "ollama";

/// Local Ollama server used for both answers and knowledge embeddings.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    chat_model: String,
    embedding_model: String,
}

impl OllamaProvider {
    /// `base_url` is `scheme://host[:port]`; the port defaults to 11434.
    #[must_use]
    pub fn new(base_url: &str, chat_model: String, embedding_model: String) -> Self {
        let (host, port) = split_base_url(base_url);
        Self {
            client: Ollama::new(host, port),
            chat_model,
            embedding_model,
        }
    }
}

impl LlmProvider for OllamaProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let history = messages.iter().map(to_ollama).collect();
        let reply = self
            .client
            .send_chat_messages(ChatMessageRequest::new(self.chat_model.clone(), history))
            .await
            .map_err(|e| LlmError::Other(format!("ollama answer generation failed: {e}")))?;
        Ok(reply.message.content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request =
            GenerateEmbeddingsRequest::new(self.embedding_model.clone(), EmbeddingsInput::from(text));
        let mut reply = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| LlmError::Other(format!("ollama embedding failed: {e}")))?;

        if reply.embeddings.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: PROVIDER.into(),
            });
        }
        Ok(reply.embeddings.swap_remove(0))
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        PROVIDER
    }
}

fn to_ollama(msg: &Message) -> ChatMessage {
    let content = msg.content.clone();
    match msg.role {
        Role::System => ChatMessage::system(content),
        Role::User => ChatMessage::user(content),
        Role::Assistant => ChatMessage::assistant(content),
    }
}

fn split_base_url(base_url: &str) -> (String, u16) {
    let trimmed = base_url.trim_end_matches('/');
    trimmed
        .rsplit_once(':')
        .and_then(|(host, port)| port.parse::<u16>().ok().map(|p| (host.to_owned(), p)))
        .unwrap_or_else(|| (trimmed.to_owned(), DEFAULT_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_with_explicit_port() {
        assert_eq!(
            split_base_url("http://localhost:11434"),
            ("http://localhost".to_owned(), 11434)
        );
        assert_eq!(
            split_base_url("http://gpu-box:8080/"),
            ("http://gpu-box".to_owned(), 8080)
        );
    }

    #[test]
    fn base_url_without_port_uses_default() {
        assert_eq!(
            split_base_url("http://localhost"),
            ("http://localhost".to_owned(), DEFAULT_PORT)
        );
    }

    #[test]
    fn roles_map_to_ollama_messages() {
        let sys = to_ollama(&Message::system("be brief"));
        assert_eq!(sys.role, ollama_rs::generation::chat::MessageRole::System);
        assert_eq!(sys.content, "be brief");

        let user = to_ollama(&Message::user("Context:\n- a\n\nQuestion:\nq"));
        assert_eq!(user.role, ollama_rs::generation::chat::MessageRole::User);
        assert_eq!(user.content, "Context:\n- a\n\nQuestion:\nq");
    }

    #[test]
    fn always_supports_embeddings() {
        let provider = OllamaProvider::new("http://localhost:11434", "m".into(), "e".into());
        assert_eq!(provider.name(), "ollama");
        assert!(provider.supports_embeddings());
    }

    #[tokio::test]
    async fn unreachable_server_fails_both_calls() {
        let provider = OllamaProvider::new("http://127.0.0.1:1", "chat".into(), "embed".into());
        let err = provider.chat(&[Message::user("hello")]).await.unwrap_err();
        assert!(err.to_string().contains("answer generation failed"));
        let err = provider.embed("hello").await.unwrap_err();
        assert!(err.to_string().contains("embedding failed"));
    }
}
