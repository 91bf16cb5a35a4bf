use std::collections::HashMap;
use std::sync::RwLock;

use crate::vector_store::{
    BoxFuture, Payload, ScoredVectorPoint, StoredPoint, VectorFilter, VectorPoint,
    VectorStore, VectorStoreError,
};

struct Entry {
    vector: Vec<f32>,
    payload: Payload,
}

struct InMemoryCollection {
    vector_size: u64,
    points: HashMap<String, Entry>,
}

/// Exact cosine search over points held in process memory.
///
/// Used for tests and for running without a Qdrant instance; contents are lost on drop.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore").finish_non_exhaustive()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn matches_filter(payload: &Payload, filter: Option<&VectorFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    filter.must.iter().all(|cond| {
        payload
            .get(&cond.field)
            .and_then(serde_json::Value::as_str)
            == Some(cond.value.as_str())
    })
}

fn missing(collection: &str) -> String {
    format!("collection {collection} not found")
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            cols.entry(collection)
                .or_insert_with(|| InMemoryCollection {
                    vector_size,
                    points: HashMap::new(),
                });
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(cols.contains_key(&collection))
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            let col = cols
                .get_mut(&collection)
                .ok_or_else(|| VectorStoreError::Upsert(missing(&collection)))?;
            for p in points {
                if p.vector.len() as u64 != col.vector_size {
                    return Err(VectorStoreError::Upsert(format!(
                        "vector dimension {} does not match collection size {}",
                        p.vector.len(),
                        col.vector_size
                    )));
                }
                col.points.insert(
                    p.id,
                    Entry {
                        vector: p.vector,
                        payload: p.payload,
                    },
                );
            }
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        _num_candidates: u64,
        filter: Option<VectorFilter>,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            let col = cols
                .get(&collection)
                .ok_or_else(|| VectorStoreError::Search(missing(&collection)))?;

            let mut scored: Vec<ScoredVectorPoint> = col
                .points
                .iter()
                .filter(|(_, entry)| matches_filter(&entry.payload, filter.as_ref()))
                .map(|(id, entry)| ScoredVectorPoint {
                    id: id.clone(),
                    score: cosine_similarity(&vector, &entry.vector),
                    payload: entry.payload.clone(),
                })
                .collect();

            scored.sort_by(|a, b| b.score.total_cmp(&a.score));
            scored.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(scored)
        })
    }

    fn get(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> BoxFuture<'_, Result<Vec<StoredPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Retrieve(e.to_string()))?;
            let col = cols
                .get(&collection)
                .ok_or_else(|| VectorStoreError::Retrieve(missing(&collection)))?;
            Ok(ids
                .into_iter()
                .filter_map(|id| {
                    let entry = col.points.get(&id)?;
                    Some(StoredPoint {
                        payload: entry.payload.clone(),
                        id,
                    })
                })
                .collect())
        })
    }

    fn delete_by_ids(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(());
            }
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Delete(e.to_string()))?;
            let col = cols
                .get_mut(&collection)
                .ok_or_else(|| VectorStoreError::Delete(missing(&collection)))?;
            for id in &ids {
                col.points.remove(id);
            }
            Ok(())
        })
    }

    fn scroll(
        &self,
        collection: &str,
        filter: Option<VectorFilter>,
    ) -> BoxFuture<'_, Result<Vec<StoredPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Scroll(e.to_string()))?;
            let col = cols
                .get(&collection)
                .ok_or_else(|| VectorStoreError::Scroll(missing(&collection)))?;
            Ok(col
                .points
                .iter()
                .filter(|(_, entry)| matches_filter(&entry.payload, filter.as_ref()))
                .map(|(id, entry)| StoredPoint {
                    id: id.clone(),
                    payload: entry.payload.clone(),
                })
                .collect())
        })
    }
}
