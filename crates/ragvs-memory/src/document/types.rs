use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optional source metadata attached to every chunk of a stored text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeMetadata {
    pub entity: Option<String>,
    pub slot: Option<String>,
    pub knowledge_type: Option<String>,
}

impl KnowledgeMetadata {
    /// Trim every field; blank values become `None`.
    #[must_use]
    pub fn new(
        entity: Option<String>,
        slot: Option<String>,
        knowledge_type: Option<String>,
    ) -> Self {
        Self {
            entity: normalize(entity),
            slot: normalize(slot),
            knowledge_type: normalize(knowledge_type),
        }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// One embedded chunk ready to be persisted.
#[derive(Debug, Clone)]
pub struct KnowledgeChunk {
    pub text: String,
    pub metadata: KnowledgeMetadata,
    pub chunk_index: usize,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}
