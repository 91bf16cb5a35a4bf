//! Qdrant-backed [`VectorStore`].

use std::collections::HashMap;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, GetPointsBuilder,
    PointId, PointStruct, PointsIdsList, RetrievedPoint, ScoredPoint, ScrollPointsBuilder,
    SearchParamsBuilder, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    point_id::PointIdOptions, value::Kind,
};

use crate::vector_store::{
    BoxFuture, FieldCondition, Payload, ScoredVectorPoint, StoredPoint, VectorFilter,
    VectorPoint, VectorStore, VectorStoreError,
};

type QdrantResult<T> = Result<T, Box<qdrant_client::QdrantError>>;

const SCROLL_PAGE: u32 = 100;

/// Thin wrapper over the [`Qdrant`] client.
#[derive(Clone)]
pub struct QdrantOps {
    client: Qdrant,
}

impl std::fmt::Debug for QdrantOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantOps").finish_non_exhaustive()
    }
}

impl QdrantOps {
    /// Create a new `QdrantOps` connected to the given URL.
    ///
    /// No request is made; an unreachable server surfaces on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn new(url: &str) -> QdrantResult<Self> {
        let client = Qdrant::from_url(url).build().map_err(Box::new)?;
        Ok(Self { client })
    }

    /// Ensure a collection exists with cosine distance vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if Qdrant cannot be reached or collection creation fails.
    pub async fn ensure_collection(&self, collection: &str, vector_size: u64) -> QdrantResult<()> {
        if self.collection_exists(collection).await? {
            return Ok(());
        }
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await
            .map_err(Box::new)?;
        tracing::info!(collection, vector_size, "created Qdrant collection");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if Qdrant cannot be reached.
    pub async fn collection_exists(&self, collection: &str) -> QdrantResult<bool> {
        self.client
            .collection_exists(collection)
            .await
            .map_err(Box::new)
    }

    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub async fn upsert(&self, collection: &str, points: Vec<PointStruct>) -> QdrantResult<()> {
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    /// Search for similar vectors, returning scored points with payloads.
    ///
    /// `num_candidates` is passed as the HNSW `ef` search parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    pub async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        num_candidates: u64,
        filter: Option<Filter>,
    ) -> QdrantResult<Vec<ScoredPoint>> {
        let mut builder = SearchPointsBuilder::new(collection, vector, limit)
            .with_payload(true)
            .params(SearchParamsBuilder::default().hnsw_ef(num_candidates));
        if let Some(f) = filter {
            builder = builder.filter(f);
        }
        let results = self.client.search_points(builder).await.map_err(Box::new)?;
        Ok(results.result)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, collection: &str, ids: Vec<PointId>) -> QdrantResult<Vec<RetrievedPoint>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .get_points(GetPointsBuilder::new(collection, ids).with_payload(true))
            .await
            .map_err(Box::new)?;
        Ok(response.result)
    }

    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    pub async fn delete_by_ids(&self, collection: &str, ids: Vec<PointId>) -> QdrantResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList { ids })
                    .wait(true),
            )
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    /// Scroll through every point matching `filter`, page by page.
    ///
    /// # Errors
    ///
    /// Returns an error if the scroll operation fails.
    pub async fn scroll(
        &self,
        collection: &str,
        filter: Option<Filter>,
    ) -> QdrantResult<Vec<RetrievedPoint>> {
        let mut points = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(collection)
                .with_payload(true)
                .with_vectors(false)
                .limit(SCROLL_PAGE);
            if let Some(ref f) = filter {
                builder = builder.filter(f.clone());
            }
            if let Some(off) = offset.take() {
                builder = builder.offset(off);
            }

            let response = self.client.scroll(builder).await.map_err(Box::new)?;
            points.extend(response.result);

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(points)
    }
}

impl VectorStore for QdrantOps {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.ensure_collection(&collection, vector_size)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.collection_exists(&collection)
                .await
                .map_err(|e| VectorStoreError::Connection(e.to_string()))
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let qdrant_points = points
                .into_iter()
                .map(|p| {
                    let payload = json_to_payload(p.payload)
                        .map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
                    Ok(PointStruct::new(p.id, p.vector, payload))
                })
                .collect::<Result<Vec<_>, VectorStoreError>>()?;
            self.upsert(&collection, qdrant_points)
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        num_candidates: u64,
        filter: Option<VectorFilter>,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let results = self
                .search(
                    &collection,
                    vector,
                    limit,
                    num_candidates,
                    filter.map(vector_filter_to_qdrant),
                )
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            Ok(results
                .into_iter()
                .map(|point| ScoredVectorPoint {
                    id: point_id_to_string(point.id),
                    score: point.score,
                    payload: payload_to_json(point.payload),
                })
                .collect())
        })
    }

    fn get(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> BoxFuture<'_, Result<Vec<StoredPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let point_ids = ids.into_iter().map(PointId::from).collect();
            let points = self
                .get(&collection, point_ids)
                .await
                .map_err(|e| VectorStoreError::Retrieve(e.to_string()))?;
            Ok(points.into_iter().map(retrieved_to_stored).collect())
        })
    }

    fn delete_by_ids(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let point_ids = ids.into_iter().map(PointId::from).collect();
            self.delete_by_ids(&collection, point_ids)
                .await
                .map_err(|e| VectorStoreError::Delete(e.to_string()))
        })
    }

    fn scroll(
        &self,
        collection: &str,
        filter: Option<VectorFilter>,
    ) -> BoxFuture<'_, Result<Vec<StoredPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let points = self
                .scroll(&collection, filter.map(vector_filter_to_qdrant))
                .await
                .map_err(|e| VectorStoreError::Scroll(e.to_string()))?;
            Ok(points.into_iter().map(retrieved_to_stored).collect())
        })
    }
}

fn json_to_payload(
    payload: Payload,
) -> Result<HashMap<String, qdrant_client::qdrant::Value>, serde_json::Error> {
    serde_json::from_value(serde_json::Value::Object(payload.into_iter().collect()))
}

fn vector_filter_to_qdrant(filter: VectorFilter) -> Filter {
    Filter {
        must: filter
            .must
            .into_iter()
            .map(field_condition_to_qdrant)
            .collect(),
        ..Filter::default()
    }
}

fn field_condition_to_qdrant(cond: FieldCondition) -> Condition {
    Condition::matches(cond.field, cond.value)
}

fn payload_to_json(payload: HashMap<String, qdrant_client::qdrant::Value>) -> Payload {
    payload
        .into_iter()
        .filter_map(|(k, v)| {
            let json_val = match v.kind? {
                Kind::StringValue(s) => serde_json::Value::String(s),
                Kind::IntegerValue(i) => serde_json::Value::Number(i.into()),
                Kind::DoubleValue(d) => {
                    serde_json::Number::from_f64(d).map(serde_json::Value::Number)?
                }
                Kind::BoolValue(b) => serde_json::Value::Bool(b),
                Kind::NullValue(_) => serde_json::Value::Null,
                _ => return None,
            };
            Some((k, json_val))
        })
        .collect()
}

fn point_id_to_string(id: Option<PointId>) -> String {
    match id.and_then(|pid| pid.point_id_options) {
        Some(PointIdOptions::Uuid(u)) => u,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

fn retrieved_to_stored(point: RetrievedPoint) -> StoredPoint {
    StoredPoint {
        id: point_id_to_string(point.id),
        payload: payload_to_json(point.payload),
    }
}
