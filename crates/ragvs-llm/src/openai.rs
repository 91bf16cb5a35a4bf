use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

const PROVIDER: &str = "openai";
const CHAT_PATH: &str = "chat/completions";
const EMBED_PATH: &str = "embeddings";

/// OpenAI-compatible HTTP backend for answer generation and embeddings.
///
/// Embedding calls are only available when an embedding model is configured.
#[derive(Clone)]
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    chat_model: String,
    max_tokens: u32,
    embedding_model: Option<String>,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("chat_model", &self.chat_model)
            .field("max_tokens", &self.max_tokens)
            .field("embedding_model", &self.embedding_model)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        base_url: String,
        chat_model: String,
        max_tokens: u32,
        embedding_model: Option<String>,
    ) -> Self {
        Self {
            http: crate::http::default_client(),
            api_key,
            endpoint: base_url.trim_end_matches('/').to_owned(),
            chat_model,
            max_tokens,
            embedding_model,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint)
    }

    /// Posts `body` to `path` and decodes a successful reply as `T`.
    async fn call<B, T>(&self, path: &str, body: &B) -> Result<T, LlmError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(path, "upstream llm rate limited the request");
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            tracing::error!(path, status = status.as_u16(), body = %raw, "upstream llm call rejected");
            return Err(LlmError::Status {
                provider: PROVIDER.into(),
                status: status.as_u16(),
            });
        }

        Ok(serde_json::from_str(&raw)?)
    }
}

impl LlmProvider for OpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: &self.chat_model,
            messages: messages.iter().map(WireMessage::from).collect(),
            max_tokens: self.max_tokens,
        };
        let reply: CompletionReply = self.call(CHAT_PATH, &request).await?;

        if let Some(usage) = &reply.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "answer token usage"
            );
        }

        reply.into_answer().ok_or(LlmError::EmptyResponse {
            provider: PROVIDER.into(),
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let Some(model) = self.embedding_model.as_deref() else {
            return Err(LlmError::EmbedUnsupported {
                provider: PROVIDER.into(),
            });
        };

        let reply: EmbeddingReply = self
            .call(EMBED_PATH, &EmbeddingRequest { model, input: text })
            .await?;
        reply
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or(LlmError::EmptyResponse {
                provider: PROVIDER.into(),
            })
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_model.is_some()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        PROVIDER
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        Self {
            role: msg.role.as_str(),
            content: &msg.content,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionReply {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

impl CompletionReply {
    fn into_answer(self) -> Option<String> {
        self.choices.into_iter().next()?.message.content
    }
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct TokenUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingReply {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(endpoint: &str, embedding_model: Option<&str>) -> OpenAiProvider {
        OpenAiProvider::new(
            "sk-test-key".into(),
            endpoint.into(),
            "gpt-4o-mini".into(),
            512,
            embedding_model.map(Into::into),
        )
    }

    #[test]
    fn debug_hides_api_key() {
        let dbg = format!("{:?}", provider("https://api.openai.com/v1", None));
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains("sk-test-key"));
    }

    #[test]
    fn endpoint_paths_join_without_double_slash() {
        let p = provider("https://api.openai.com/v1//", None);
        assert_eq!(p.url(CHAT_PATH), "https://api.openai.com/v1/chat/completions");
        assert_eq!(p.url(EMBED_PATH), "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn embeddings_need_a_model() {
        assert!(provider("http://x", Some("text-embedding-3-small")).supports_embeddings());
        assert!(!provider("http://x", None).supports_embeddings());
    }

    #[test]
    fn completion_request_carries_prompt_roles() {
        let messages = [
            Message::system("Answer from the context."),
            Message::user("Question:\nWhat is the capital?"),
        ];
        let request = CompletionRequest {
            model: "gpt-4o-mini",
            messages: messages.iter().map(WireMessage::from).collect(),
            max_tokens: 16,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 16);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Question:\nWhat is the capital?");
    }

    #[test]
    fn completion_reply_yields_first_answer() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"Seoul."}}],
                       "usage":{"prompt_tokens":3,"completion_tokens":1}}"#;
        let reply: CompletionReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.usage.as_ref().map(|u| u.prompt_tokens), Some(3));
        assert_eq!(reply.into_answer().as_deref(), Some("Seoul."));
    }

    #[test]
    fn completion_reply_without_content_has_no_answer() {
        let empty: CompletionReply = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(empty.into_answer().is_none());

        let null: CompletionReply =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(null.into_answer().is_none());
    }

    #[test]
    fn embedding_reply_parses() {
        let json = r#"{"data":[{"embedding":[0.1,0.2,0.3],"index":0}],"model":"m"}"#;
        let reply: EmbeddingReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.data[0].embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_both_calls() {
        let p = provider("http://127.0.0.1:1", Some("embed-model"));
        assert!(matches!(
            p.chat(&[Message::user("test")]).await.unwrap_err(),
            LlmError::Http(_)
        ));
        assert!(matches!(p.embed("test").await.unwrap_err(), LlmError::Http(_)));
    }

    #[tokio::test]
    async fn embed_without_model_is_unsupported() {
        let err = provider("http://127.0.0.1:1", None)
            .embed("test")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmbedUnsupported { .. }));
    }
}
