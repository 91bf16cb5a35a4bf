use ragvs_memory::{KnowledgeStore, ScoredMatch};

use crate::error::RagError;

/// Top-K similarity retrieval over stored knowledge.
#[derive(Debug, Clone, Copy)]
pub struct Retriever {
    limit: u64,
    num_candidates: u64,
}

impl Default for Retriever {
    fn default() -> Self {
        Self {
            limit: 3,
            num_candidates: 50,
        }
    }
}

impl Retriever {
    #[must_use]
    pub fn new(limit: u64, num_candidates: u64) -> Self {
        Self {
            limit,
            num_candidates: num_candidates.max(limit),
        }
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Best `limit` matches for `query_vector`, highest score first.
    ///
    /// An empty store yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store query fails.
    pub async fn retrieve(
        &self,
        store: &KnowledgeStore,
        query_vector: Vec<f32>,
    ) -> Result<Vec<ScoredMatch>, RagError> {
        let mut matches = store
            .similarity_search(query_vector, self.num_candidates, self.limit)
            .await?;
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(usize::try_from(self.limit).unwrap_or(usize::MAX));
        tracing::debug!(
            matches = matches.len(),
            top_score = matches.first().map_or(0.0, |m| m.score),
            "retrieved knowledge"
        );
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ragvs_memory::{InMemoryVectorStore, KnowledgeChunk, KnowledgeMetadata};

    use super::*;

    async fn seeded(vectors: &[(&str, Vec<f32>)]) -> KnowledgeStore {
        let store = KnowledgeStore::new(Box::new(InMemoryVectorStore::new()), "test");
        for (idx, (text, vector)) in vectors.iter().enumerate() {
            store
                .insert(&KnowledgeChunk {
                    text: (*text).to_owned(),
                    metadata: KnowledgeMetadata::default(),
                    chunk_index: idx,
                    embedding: vector.clone(),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let store = seeded(&[]).await;
        let matches = Retriever::default()
            .retrieve(&store, vec![1.0, 0.0])
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn returns_top_limit_descending() {
        let store = seeded(&[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.8, 0.2]),
            ("c", vec![0.5, 0.5]),
            ("d", vec![0.0, 1.0]),
        ])
        .await;
        let matches = Retriever::default()
            .retrieve(&store, vec![1.0, 0.0])
            .await
            .unwrap();
        assert_eq!(matches.len(), 3);
        let texts: Vec<&str> = matches.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn candidates_never_below_limit() {
        let retriever = Retriever::new(10, 5);
        assert_eq!(retriever.num_candidates, 10);
        assert_eq!(retriever.limit(), 10);
    }
}
