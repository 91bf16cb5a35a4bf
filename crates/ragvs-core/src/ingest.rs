use chrono::Utc;
use ragvs_llm::LlmProvider;
use ragvs_memory::{KnowledgeChunk, KnowledgeMetadata, KnowledgeStore};
use serde::Serialize;

use crate::error::{IngestError, RagError};

/// Outcome of a successful store: one id per chunk, in chunk order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreReport {
    pub chunks: usize,
    pub ids: Vec<String>,
}

/// Embed and persist `chunks` strictly in order.
///
/// A failure on chunk `i` stops before chunk `i + 1`; chunks `0..i` stay persisted and
/// their ids are returned in [`IngestError::committed`].
///
/// # Errors
///
/// Returns [`IngestError`] wrapping an embedding or storage failure.
pub async fn ingest_chunks<P: LlmProvider>(
    provider: &P,
    store: &KnowledgeStore,
    chunks: Vec<String>,
    metadata: &KnowledgeMetadata,
) -> Result<StoreReport, IngestError> {
    let mut committed = Vec::with_capacity(chunks.len());

    for (chunk_index, text) in chunks.into_iter().enumerate() {
        let embedding = match provider.embed(&text).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(chunk_index, error = %e, "embedding failed during ingestion");
                return Err(IngestError {
                    error: RagError::embedding(Some(chunk_index), e),
                    committed,
                });
            }
        };

        let chunk = KnowledgeChunk {
            text,
            metadata: metadata.clone(),
            chunk_index,
            embedding,
            created_at: Utc::now(),
        };

        match store.insert(&chunk).await {
            Ok(id) => committed.push(id),
            Err(e) => {
                tracing::error!(chunk_index, error = %e, "failed to persist chunk");
                return Err(IngestError {
                    error: e.into(),
                    committed,
                });
            }
        }
    }

    Ok(StoreReport {
        chunks: committed.len(),
        ids: committed,
    })
}
