use ragvs_llm::LlmProvider;
use ragvs_memory::{
    ChatLog, DOCUMENT_TYPE, KnowledgeMetadata, KnowledgeRecord, KnowledgeStore, Route,
    ScoredMatch, SplitterConfig, SqliteStore, StoreHandle, TextSplitter,
};
use serde::Serialize;

use crate::config::RagConfig;
use crate::error::{IngestError, RagError};
use crate::ingest::{StoreReport, ingest_chunks};
use crate::prompt::build_prompt;
use crate::retriever::Retriever;
use crate::router::{RouteDecision, validate_threshold};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub retrieved_documents: Vec<ScoredMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedAnswer {
    pub answer: String,
    pub retrieved_documents: Vec<ScoredMatch>,
    pub route: Route,
}

/// Knowledge ingestion and question answering over one provider and one store.
///
/// Every operation is a single sequential chain of awaited calls; nothing fans out.
pub struct RagService<P> {
    provider: P,
    store: StoreHandle,
    chat_logs: SqliteStore,
    splitter: TextSplitter,
    retriever: Retriever,
    route_threshold: f32,
    list_limit: usize,
    answer_language: String,
}

impl<P> std::fmt::Debug for RagService<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagService")
            .field("store", &self.store)
            .field("retriever", &self.retriever)
            .field("route_threshold", &self.route_threshold)
            .finish_non_exhaustive()
    }
}

impl<P: LlmProvider> RagService<P> {
    #[must_use]
    pub fn new(provider: P, store: StoreHandle, chat_logs: SqliteStore, config: &RagConfig) -> Self {
        Self {
            provider,
            store,
            chat_logs,
            splitter: TextSplitter::new(SplitterConfig {
                max_chars: config.max_chars,
            }),
            retriever: Retriever::new(config.retrieve_limit, config.num_candidates),
            route_threshold: config.route_threshold,
            list_limit: config.list_limit,
            answer_language: config.answer_language.clone(),
        }
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn default_threshold(&self) -> f32 {
        self.route_threshold
    }

    async fn knowledge(&self) -> Result<&KnowledgeStore, RagError> {
        Ok(self.store.get().await?)
    }

    /// Chunk `text`, then embed and persist each chunk in order.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidInput`] when `text` yields no chunks, otherwise the first
    /// embedding or storage failure along with the ids already committed.
    pub async fn store_knowledge(
        &self,
        text: &str,
        metadata: KnowledgeMetadata,
    ) -> Result<StoreReport, IngestError> {
        let chunks = self.splitter.split(text);
        if chunks.is_empty() {
            return Err(RagError::InvalidInput("No valid text chunks to store.".into()).into());
        }
        let store = self.knowledge().await?;

        let report = ingest_chunks(&self.provider, store, chunks, &metadata).await?;
        tracing::info!(
            chunks = report.chunks,
            entity = metadata.entity.as_deref().unwrap_or(""),
            "stored knowledge"
        );
        Ok(report)
    }

    /// Newest knowledge documents first; `None` uses the configured limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the listing fails.
    pub async fn list_knowledge(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<KnowledgeRecord>, RagError> {
        let store = self.knowledge().await?;
        Ok(store
            .list_by_type(DOCUMENT_TYPE, limit.unwrap_or(self.list_limit))
            .await?)
    }

    /// `Ok(false)` when `id` is malformed, unknown, or not a knowledge document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or cannot be queried.
    pub async fn delete_knowledge(&self, id: &str) -> Result<bool, RagError> {
        let store = self.knowledge().await?;
        Ok(store.delete_by_id(id.trim(), DOCUMENT_TYPE).await?)
    }

    async fn retrieve_for(&self, question: &str) -> Result<Vec<ScoredMatch>, RagError> {
        let store = self.knowledge().await?;
        let vector = self.provider.embed(question).await.map_err(|e| {
            tracing::error!(error = %e, "question embedding failed");
            RagError::embedding(None, e)
        })?;
        self.retriever.retrieve(store, vector).await
    }

    async fn answer(&self, question: &str, context: &[ScoredMatch]) -> Result<String, RagError> {
        let prompt = build_prompt(question, context, &self.answer_language);
        self.provider
            .complete(&prompt.system, &prompt.user)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat completion failed");
                RagError::generation(e)
            })
    }

    /// Always-RAG answer: retrieve the top matches and answer with whatever was found.
    ///
    /// # Errors
    ///
    /// Returns an error on empty input, an unavailable store, or an upstream failure.
    pub async fn query(&self, question: &str) -> Result<QueryAnswer, RagError> {
        require_question(question)?;
        let retrieved_documents = self.retrieve_for(question).await?;
        let answer = self.answer(question, &retrieved_documents).await?;

        self.chat_logs
            .append_chat_log(&ChatLog::new(
                question,
                answer.clone(),
                retrieved_documents.clone(),
                None,
            ))
            .await?;

        Ok(QueryAnswer {
            answer,
            retrieved_documents,
        })
    }

    /// Retrieve and decide whether the matches are relevant enough to use.
    ///
    /// # Errors
    ///
    /// Returns an error on empty input, a threshold outside `[0, 1]`, an unavailable
    /// store, or an embedding failure.
    pub async fn route(&self, question: &str, threshold: f32) -> Result<RouteDecision, RagError> {
        require_question(question)?;
        validate_threshold(threshold)?;
        let matches = self.retrieve_for(question).await?;
        Ok(RouteDecision::from_matches(matches, threshold))
    }

    /// Routed answer; `None` uses the configured threshold.
    ///
    /// # Errors
    ///
    /// Same as [`RagService::route`], plus generation failures.
    pub async fn route_query(
        &self,
        question: &str,
        threshold: Option<f32>,
    ) -> Result<RoutedAnswer, RagError> {
        require_question(question)?;
        let decision = self
            .route(question, threshold.unwrap_or(self.route_threshold))
            .await?;
        let answer = self.answer(question, &decision.context).await?;

        self.chat_logs
            .append_chat_log(&ChatLog::new(
                question,
                answer.clone(),
                decision.context.clone(),
                Some(decision.route),
            ))
            .await?;

        Ok(RoutedAnswer {
            answer,
            retrieved_documents: decision.context,
            route: decision.route,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the chat log query fails.
    pub async fn recent_chat_logs(&self, limit: usize) -> Result<Vec<ChatLog>, RagError> {
        Ok(self.chat_logs.recent_chat_logs(limit).await?)
    }
}

/// Blank questions are rejected; accepted ones are passed on verbatim.
fn require_question(question: &str) -> Result<(), RagError> {
    if question.trim().is_empty() {
        return Err(RagError::InvalidInput("Question must not be empty.".into()));
    }
    Ok(())
}
