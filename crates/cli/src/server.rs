//! HTTP API over the searcher.
//!
//! Endpoints:
//! - `GET /query/?original_query=…&max_iter=3`
//! - `GET /query-stream/?original_query=…&max_iter=3` (server-sent events)
//! - `GET /retrieve/?original_query=…&max_iter=3`
//! - `POST /load-files/`

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use deepsearch_core::{AppConfig, AppError, AppResult};
use deepsearch_knowledge::{bootstrap, LoadOptions, Searcher, StreamEvent};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared across handlers.
#[derive(Clone)]
pub struct ServerState {
    pub searcher: Arc<Searcher>,
    pub config: Arc<AppConfig>,
}

/// Error body `{ "detail": … }` with a status code.
#[derive(Debug)]
pub enum ApiError {
    UnprocessableEntity(String),
    Internal(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::InvalidArgument(msg) => ApiError::UnprocessableEntity(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub original_query: String,
    pub max_iter: Option<i64>,
}

impl QueryParams {
    fn max_iter(&self, default: usize) -> Result<usize, ApiError> {
        match self.max_iter {
            None => Ok(default),
            Some(n) if n >= 1 => Ok(n as usize),
            Some(n) => Err(ApiError::UnprocessableEntity(format!(
                "max_iter must be at least 1, got {}",
                n
            ))),
        }
    }
}

/// One path or many.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PathList {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl PathList {
    fn into_vec(self) -> Vec<PathBuf> {
        match self {
            PathList::One(path) => vec![path],
            PathList::Many(paths) => paths,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoadFilesRequest {
    pub paths: PathList,
    pub collection_name: Option<String>,
    pub collection_description: Option<String>,
    pub batch_size: Option<usize>,
}

pub fn router(state: ServerState, enable_cors: bool) -> Router {
    let router = Router::new()
        .route("/query/", get(handle_query))
        .route("/query-stream/", get(handle_query_stream))
        .route("/retrieve/", get(handle_retrieve))
        .route("/load-files/", post(handle_load_files))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: ServerState, host: &str, port: u16, enable_cors: bool) -> AppResult<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router(state, enable_cors))
        .await
        .map_err(|e| AppError::Other(format!("Server error: {}", e)))
}

async fn handle_query(
    State(state): State<ServerState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Value>, ApiError> {
    let max_iter = params.max_iter(state.config.search.max_iter)?;
    let result = state.searcher.query(&params.original_query, max_iter).await?;

    Ok(Json(json!({
        "result": result.answer,
        "consume_token": result.tokens_consumed,
    })))
}

async fn handle_retrieve(
    State(state): State<ServerState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Value>, ApiError> {
    let max_iter = params.max_iter(state.config.search.max_iter)?;
    let outcome = state.searcher.retrieve(&params.original_query, max_iter).await?;

    Ok(Json(json!({
        "evidence": outcome.evidence,
        "sub_queries": outcome.metadata.sub_queries,
        "stop_reason": outcome.metadata.stop_reason,
        "consume_token": outcome.tokens_consumed,
    })))
}

async fn handle_query_stream(
    State(state): State<ServerState>,
    Query(params): Query<QueryParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let max_iter = params.max_iter(state.config.search.max_iter)?;
    tracing::info!("New streaming query: {}", params.original_query);

    let stream = state
        .searcher
        .query_stream(params.original_query, max_iter)
        .map(|event: StreamEvent| Ok(Event::default().data(event.to_json())));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn handle_load_files(
    State(state): State<ServerState>,
    Json(request): Json<LoadFilesRequest>,
) -> Result<Json<Value>, ApiError> {
    let options = LoadOptions {
        paths: request.paths.into_vec(),
        collection: request.collection_name,
        description: request.collection_description,
        batch_size: request.batch_size,
    };

    let stats = bootstrap::load_files(&state.config, options).await?;

    Ok(Json(json!({
        "message": "Files loaded successfully.",
        "collection": stats.collection,
        "sources_count": stats.sources_count,
        "chunks_count": stats.chunks_count,
        "skipped_count": stats.skipped_count,
    })))
}
