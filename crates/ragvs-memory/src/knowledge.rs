use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::document::KnowledgeChunk;
use crate::error::MemoryError;
use crate::types::ScoredMatch;
use crate::vector_store::{Payload, VectorFilter, VectorPoint, VectorStore};

/// Payload `type` tag carried by every knowledge chunk.
pub const DOCUMENT_TYPE: &str = "rag_document";

const TYPE_FIELD: &str = "type";

/// Listing projection of a stored chunk. The embedding is never returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: String,
    pub text: String,
    pub entity: Option<String>,
    pub slot: Option<String>,
    #[serde(rename = "type")]
    pub knowledge_type: Option<String>,
    /// Position of the chunk within the text it was split from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Knowledge chunks in one vector collection.
///
/// The collection is created on the first insert, sized from that chunk's embedding.
/// Reads against a collection that does not exist yet behave as an empty store.
pub struct KnowledgeStore {
    store: Box<dyn VectorStore>,
    collection: String,
    ready: OnceCell<()>,
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl KnowledgeStore {
    #[must_use]
    pub fn new(store: Box<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            ready: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn has_collection(&self) -> Result<bool, MemoryError> {
        if self.ready.initialized() {
            return Ok(true);
        }
        Ok(self.store.collection_exists(&self.collection).await?)
    }

    /// Persist one chunk and return its new point id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be created or the upsert fails.
    pub async fn insert(&self, chunk: &KnowledgeChunk) -> Result<String, MemoryError> {
        let vector_size = u64::try_from(chunk.embedding.len())?;
        self.ready
            .get_or_try_init(|| async {
                self.store
                    .ensure_collection(&self.collection, vector_size)
                    .await
            })
            .await?;

        let id = uuid::Uuid::new_v4().to_string();
        let point = VectorPoint {
            id: id.clone(),
            vector: chunk.embedding.clone(),
            payload: chunk_payload(chunk),
        };
        self.store.upsert(&self.collection, vec![point]).await?;

        tracing::debug!(
            id = %id,
            chunk_index = chunk.chunk_index,
            collection = %self.collection,
            "stored knowledge chunk"
        );
        Ok(id)
    }

    /// Top `limit` knowledge chunks closest to `vector`, best first.
    ///
    /// Scores are cosine similarity mapped onto `[0, 1]`, so orthogonal vectors score 0.5.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store query fails.
    pub async fn similarity_search(
        &self,
        vector: Vec<f32>,
        num_candidates: u64,
        limit: u64,
    ) -> Result<Vec<ScoredMatch>, MemoryError> {
        if limit == 0 || !self.has_collection().await? {
            return Ok(Vec::new());
        }

        let points = self
            .store
            .search(
                &self.collection,
                vector,
                limit,
                num_candidates.max(limit),
                Some(VectorFilter::text_eq(TYPE_FIELD, DOCUMENT_TYPE)),
            )
            .await?;

        let mut matches: Vec<ScoredMatch> = points
            .into_iter()
            .map(|p| ScoredMatch {
                text: payload_str(&p.payload, "text").unwrap_or_default(),
                score: normalize_cosine(p.score),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(matches)
    }

    /// Documents tagged `doc_type`, newest first, at most `limit` of them.
    ///
    /// Records without a parseable `created_at` sort last.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store scroll fails.
    pub async fn list_by_type(
        &self,
        doc_type: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeRecord>, MemoryError> {
        if limit == 0 || !self.has_collection().await? {
            return Ok(Vec::new());
        }

        let points = self
            .store
            .scroll(
                &self.collection,
                Some(VectorFilter::text_eq(TYPE_FIELD, doc_type)),
            )
            .await?;

        let mut records: Vec<KnowledgeRecord> = points
            .into_iter()
            .map(|p| KnowledgeRecord {
                text: payload_str(&p.payload, "text").unwrap_or_default(),
                entity: payload_str(&p.payload, "entity"),
                slot: payload_str(&p.payload, "slot"),
                knowledge_type: payload_str(&p.payload, "knowledge_type"),
                chunk_index: p
                    .payload
                    .get("chunk_index")
                    .and_then(serde_json::Value::as_u64)
                    .and_then(|v| usize::try_from(v).ok()),
                created_at: payload_str(&p.payload, "created_at")
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                id: p.id,
            })
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    /// Delete the document `id` if it exists and is tagged `doc_type`.
    ///
    /// Returns `false` for a malformed id, an unknown id, or a type mismatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store cannot be queried.
    pub async fn delete_by_id(&self, id: &str, doc_type: &str) -> Result<bool, MemoryError> {
        let Ok(uuid) = uuid::Uuid::parse_str(id) else {
            tracing::debug!(id, "rejecting malformed document id");
            return Ok(false);
        };
        if !self.has_collection().await? {
            return Ok(false);
        }

        let id = uuid.to_string();
        let found = self.store.get(&self.collection, vec![id.clone()]).await?;
        let matches_type = found
            .first()
            .is_some_and(|p| payload_str(&p.payload, TYPE_FIELD).as_deref() == Some(doc_type));
        if !matches_type {
            return Ok(false);
        }

        self.store.delete_by_ids(&self.collection, vec![id.clone()]).await?;
        tracing::info!(id = %id, collection = %self.collection, "deleted knowledge document");
        Ok(true)
    }
}

fn chunk_payload(chunk: &KnowledgeChunk) -> Payload {
    let meta = &chunk.metadata;
    HashMap::from([
        (TYPE_FIELD.to_owned(), serde_json::json!(DOCUMENT_TYPE)),
        ("text".to_owned(), serde_json::json!(chunk.text)),
        ("entity".to_owned(), serde_json::json!(meta.entity)),
        ("slot".to_owned(), serde_json::json!(meta.slot)),
        (
            "knowledge_type".to_owned(),
            serde_json::json!(meta.knowledge_type),
        ),
        ("chunk_index".to_owned(), serde_json::json!(chunk.chunk_index)),
        (
            "created_at".to_owned(),
            serde_json::json!(chunk.created_at.to_rfc3339()),
        ),
    ])
}

/// Maps a raw cosine similarity in `[-1, 1]` onto `[0, 1]`.
fn normalize_cosine(raw: f32) -> f32 {
    f32::midpoint(1.0, raw).clamp(0.0, 1.0)
}

fn payload_str(payload: &Payload, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::KnowledgeMetadata;
    use crate::in_memory_store::InMemoryVectorStore;
    use chrono::TimeDelta;

    fn store() -> KnowledgeStore {
        KnowledgeStore::new(Box::new(InMemoryVectorStore::new()), "test_knowledge")
    }

    fn chunk(text: &str, embedding: Vec<f32>, chunk_index: usize) -> KnowledgeChunk {
        KnowledgeChunk {
            text: text.into(),
            metadata: KnowledgeMetadata::new(Some("Seoul".into()), None, Some("fact".into())),
            chunk_index,
            embedding,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn empty_store_reads_are_empty() {
        let store = store();
        assert!(
            store
                .similarity_search(vec![1.0, 0.0], 50, 3)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(store.list_by_type(DOCUMENT_TYPE, 50).await.unwrap().is_empty());
        let id = uuid::Uuid::new_v4().to_string();
        assert!(!store.delete_by_id(&id, DOCUMENT_TYPE).await.unwrap());
    }

    #[tokio::test]
    async fn insert_then_search_sorted_descending() {
        let store = store();
        store.insert(&chunk("east", vec![1.0, 0.0], 0)).await.unwrap();
        store.insert(&chunk("north", vec![0.0, 1.0], 1)).await.unwrap();
        store
            .insert(&chunk("north-east", vec![0.7, 0.7], 2))
            .await
            .unwrap();

        let matches = store.similarity_search(vec![1.0, 0.1], 50, 3).await.unwrap();
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].text, "east");
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));

        let top = store.similarity_search(vec![1.0, 0.1], 50, 1).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn scores_stay_within_unit_interval() {
        let store = store();
        store.insert(&chunk("east", vec![1.0, 0.0], 0)).await.unwrap();
        store.insert(&chunk("north", vec![0.0, 1.0], 1)).await.unwrap();

        let matches = store.similarity_search(vec![-1.0, 0.0], 50, 3).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| (0.0..=1.0).contains(&m.score)));
        assert_eq!(matches[0].text, "north");
        assert!((matches[0].score - 0.5).abs() < 1e-6);
        assert!(matches[1].score.abs() < 1e-6);

        let same = store.similarity_search(vec![1.0, 0.0], 50, 1).await.unwrap();
        assert!((same[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_cosine_bounds() {
        assert!(normalize_cosine(-1.0).abs() < f32::EPSILON);
        assert!((normalize_cosine(0.0) - 0.5).abs() < f32::EPSILON);
        assert!((normalize_cosine(1.0) - 1.0).abs() < f32::EPSILON);
        assert!((normalize_cosine(1.000_01) - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn insert_writes_payload_layout() {
        let store = store();
        let id = store.insert(&chunk("hello", vec![1.0, 0.0], 4)).await.unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let points = store.store.get(&store.collection, vec![id]).await.unwrap();
        let payload = &points[0].payload;
        assert_eq!(payload["type"], DOCUMENT_TYPE);
        assert_eq!(payload["text"], "hello");
        assert_eq!(payload["entity"], "Seoul");
        assert!(payload["slot"].is_null());
        assert_eq!(payload["knowledge_type"], "fact");
        assert_eq!(payload["chunk_index"], 4);
        assert!(payload["created_at"].is_string());
    }

    #[tokio::test]
    async fn search_ignores_other_types() {
        let store = store();
        store.insert(&chunk("doc", vec![0.0, 1.0], 0)).await.unwrap();
        store
            .store
            .upsert(
                &store.collection,
                vec![VectorPoint {
                    id: uuid::Uuid::new_v4().to_string(),
                    vector: vec![1.0, 0.0],
                    payload: HashMap::from([
                        ("type".into(), serde_json::json!("chat_log")),
                        ("text".into(), serde_json::json!("not knowledge")),
                    ]),
                }],
            )
            .await
            .unwrap();

        let matches = store.similarity_search(vec![1.0, 0.0], 50, 3).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "doc");
    }

    #[tokio::test]
    async fn list_newest_first_and_truncated() {
        let store = store();
        let base = Utc::now();
        for i in 0..5 {
            let mut c = chunk(&format!("doc {i}"), vec![1.0, 0.0], 0);
            c.created_at = base + TimeDelta::seconds(i);
            store.insert(&c).await.unwrap();
        }

        let records = store.list_by_type(DOCUMENT_TYPE, 3).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].text, "doc 4");
        assert_eq!(records[2].text, "doc 2");
        assert_eq!(records[0].entity.as_deref(), Some("Seoul"));
        assert_eq!(records[0].knowledge_type.as_deref(), Some("fact"));
        assert_eq!(records[0].chunk_index, Some(0));
        assert!(records[0].created_at.is_some());
    }

    #[tokio::test]
    async fn record_serializes_type_key() {
        let record = KnowledgeRecord {
            id: "x".into(),
            text: "t".into(),
            entity: None,
            slot: None,
            knowledge_type: Some("fact".into()),
            chunk_index: None,
            created_at: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "fact");
        assert!(json.get("knowledge_type").is_none());
        assert!(json.get("chunk_index").is_none());
    }

    #[tokio::test]
    async fn delete_existing_document() {
        let store = store();
        let id = store.insert(&chunk("gone", vec![1.0, 0.0], 0)).await.unwrap();
        assert!(store.delete_by_id(&id, DOCUMENT_TYPE).await.unwrap());
        assert!(!store.delete_by_id(&id, DOCUMENT_TYPE).await.unwrap());
        assert!(store.list_by_type(DOCUMENT_TYPE, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_malformed_id_is_false() {
        let store = store();
        store.insert(&chunk("kept", vec![1.0, 0.0], 0)).await.unwrap();
        assert!(!store.delete_by_id("not-an-id", DOCUMENT_TYPE).await.unwrap());
        assert!(!store.delete_by_id("", DOCUMENT_TYPE).await.unwrap());
        assert_eq!(store.list_by_type(DOCUMENT_TYPE, 50).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_type_mismatch_is_false() {
        let store = store();
        let id = store.insert(&chunk("kept", vec![1.0, 0.0], 0)).await.unwrap();
        assert!(!store.delete_by_id(&id, "chat_log").await.unwrap());
        assert_eq!(store.list_by_type(DOCUMENT_TYPE, 50).await.unwrap().len(), 1);
    }
}
