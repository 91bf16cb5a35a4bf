use ragvs_llm::LlmError;
use ragvs_memory::MemoryError;

/// External call that failed while answering or ingesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Generation,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Embedding => "Embedding",
            Self::Generation => "Chat completion",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{}", describe_upstream(.stage, .chunk_index, .source))]
    Upstream {
        stage: Stage,
        chunk_index: Option<usize>,
        source: LlmError,
    },

    #[error("vector store is not configured")]
    StoreUnavailable,

    #[error(transparent)]
    Store(MemoryError),
}

#[allow(clippy::trivially_copy_pass_by_ref, clippy::ref_option)]
fn describe_upstream(stage: &Stage, chunk_index: &Option<usize>, source: &LlmError) -> String {
    match chunk_index {
        Some(idx) => format!("{stage} failed on chunk {idx}: {source}"),
        None => format!("{stage} failed: {source}"),
    }
}

impl RagError {
    pub(crate) fn embedding(chunk_index: Option<usize>, source: LlmError) -> Self {
        Self::Upstream {
            stage: Stage::Embedding,
            chunk_index,
            source,
        }
    }

    pub(crate) fn generation(source: LlmError) -> Self {
        Self::Upstream {
            stage: Stage::Generation,
            chunk_index: None,
            source,
        }
    }
}

impl From<MemoryError> for RagError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::StoreUnavailable(_) => Self::StoreUnavailable,
            other => Self::Store(other),
        }
    }
}

/// A failed ingestion together with the ids persisted before the failure.
///
/// Chunks are written in order and never rolled back, so `committed` holds the ids of
/// chunks `0..i` when chunk `i` failed.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct IngestError {
    #[source]
    pub error: RagError,
    pub committed: Vec<String>,
}

impl IngestError {
    #[must_use]
    pub fn before_commit(error: RagError) -> Self {
        Self {
            error,
            committed: Vec::new(),
        }
    }
}

impl From<RagError> for IngestError {
    fn from(error: RagError) -> Self {
        Self::before_commit(error)
    }
}
