use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use ragvs_core::{QueryAnswer, RoutedAnswer};
use ragvs_memory::{KnowledgeMetadata, KnowledgeRecord};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::server::AppState;

#[derive(Deserialize)]
pub(crate) struct StoreRequest {
    pub text: String,
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default, rename = "type")]
    pub knowledge_type: Option<String>,
}

#[derive(Serialize)]
struct StoreResponse {
    message: String,
    chunks: usize,
}

#[derive(Deserialize)]
pub(crate) struct ListParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct ListResponse {
    documents: Vec<KnowledgeRecord>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Deserialize)]
pub(crate) struct QueryRequest {
    pub question: String,
}

#[derive(Deserialize)]
pub(crate) struct RouteRequest {
    pub question: String,
    #[serde(default)]
    pub threshold: Option<f32>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub(crate) async fn store_handler(
    State(state): State<AppState>,
    Json(req): Json<StoreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let metadata = KnowledgeMetadata::new(req.entity, req.slot, req.knowledge_type);
    let report = state.service.store_knowledge(&req.text, metadata).await?;
    Ok(Json(StoreResponse {
        message: format!("Knowledge stored successfully ({} chunks).", report.chunks),
        chunks: report.chunks,
    }))
}

pub(crate) async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.service.list_knowledge(params.limit).await?;
    Ok(Json(ListResponse { documents }))
}

pub(crate) async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.service.delete_knowledge(&id).await? {
        Ok(Json(MessageResponse {
            message: "Document deleted.",
        }))
    } else {
        Err(ApiError::not_found("Document not found"))
    }
}

pub(crate) async fn query_handler(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryAnswer>, ApiError> {
    Ok(Json(state.service.query(&req.question).await?))
}

pub(crate) async fn route_handler(
    State(state): State<AppState>,
    Json(req): Json<RouteRequest>,
) -> Result<Json<RoutedAnswer>, ApiError> {
    Ok(Json(
        state
            .service
            .route_query(&req.question, req.threshold)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok",
            uptime_secs: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
    }

    #[test]
    fn store_request_reads_type_key() {
        let json = r#"{"text":"hello","entity":"Seoul","type":"fact"}"#;
        let req: StoreRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.text, "hello");
        assert_eq!(req.entity.as_deref(), Some("Seoul"));
        assert!(req.slot.is_none());
        assert_eq!(req.knowledge_type.as_deref(), Some("fact"));
    }

    #[test]
    fn route_request_threshold_optional() {
        let req: RouteRequest = serde_json::from_str(r#"{"question":"q"}"#).unwrap();
        assert!(req.threshold.is_none());
        let req: RouteRequest =
            serde_json::from_str(r#"{"question":"q","threshold":0.8}"#).unwrap();
        assert_eq!(req.threshold, Some(0.8));
    }
}
