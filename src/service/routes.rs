//! HTTP handlers for the crawl service

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::engine::EngineOutcome;
use crate::service::{AppState, ServiceError};
use crate::storage::{CrawlRequest, CrawlTask, TaskOutcome};

/// Body returned by the immediate-result endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub result: String,
    pub metadata: CrawlMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlMetadata {
    pub success: bool,
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Body returned by the asynchronous endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAccepted {
    pub task_id: String,
}

/// Converts an engine outcome into the inline response or the error detail
pub fn outcome_to_response(
    outcome: EngineOutcome,
    task_id: Option<String>,
) -> Result<CrawlResponse, ServiceError> {
    match outcome {
        EngineOutcome::Success(result) => Ok(CrawlResponse {
            result: result.markdown,
            metadata: CrawlMetadata {
                success: true,
                status_code: result.status_code,
                task_id,
            },
        }),
        EngineOutcome::Failed { error_message, .. } => Err(ServiceError::CrawlFailed(format!(
            "Crawling failed: {}",
            error_message
        ))),
        EngineOutcome::Transport(message) => Err(ServiceError::CrawlFailed(message)),
    }
}

/// Converts an engine outcome into the terminal state recorded for a task
pub fn outcome_to_task(outcome: EngineOutcome) -> TaskOutcome {
    match outcome_to_response(outcome, None) {
        Ok(response) => match serde_json::to_value(&response) {
            Ok(payload) => TaskOutcome::Completed(payload),
            Err(e) => TaskOutcome::Failed(format!("Failed to serialize result: {}", e)),
        },
        Err(e) => TaskOutcome::Failed(e.to_string()),
    }
}

fn validate_request(
    body: Result<Json<CrawlRequest>, JsonRejection>,
) -> Result<(CrawlRequest, Url), ServiceError> {
    let Json(request) = body.map_err(|e| ServiceError::BadRequest(e.body_text()))?;
    let url = request.parse_url().map_err(ServiceError::BadRequest)?;
    Ok((request, url))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /crawl`: records a pending task and returns its id immediately
pub async fn crawl_async(
    State(state): State<AppState>,
    body: Result<Json<CrawlRequest>, JsonRejection>,
) -> Result<Json<TaskAccepted>, ServiceError> {
    let (request, url) = validate_request(body)?;

    let task_id = state.store.create(&request)?;
    tracing::info!(
        "Accepted async crawl {} for {} (priority {})",
        task_id,
        url,
        request.priority
    );

    // The handle is dropped: the crawl keeps running after this response
    state.dispatch(task_id.clone(), url);

    Ok(Json(TaskAccepted { task_id }))
}

/// `POST /crawl_sync`: records a task, waits for it, returns the result
pub async fn crawl_sync(
    State(state): State<AppState>,
    body: Result<Json<CrawlRequest>, JsonRejection>,
) -> Result<Json<CrawlResponse>, ServiceError> {
    let (request, url) = validate_request(body)?;

    let task_id = state.store.create(&request)?;
    tracing::info!("Starting sync crawl {} for {}", task_id, url);

    let outcome = state
        .dispatch(task_id.clone(), url)
        .await
        .map_err(|e| ServiceError::Internal(format!("Crawl task {} aborted: {}", task_id, e)))?;

    outcome_to_response(outcome, Some(task_id)).map(Json)
}

/// `POST /crawl_direct`: runs the engine inside the handler, no task record
pub async fn crawl_direct(
    State(state): State<AppState>,
    body: Result<Json<CrawlRequest>, JsonRejection>,
) -> Result<Json<CrawlResponse>, ServiceError> {
    let (_request, url) = validate_request(body)?;

    tracing::info!("Starting direct crawl for {}", url);
    let outcome = state.execute(&url).await;
    tracing::info!("Crawl completed. Success: {}", outcome.is_success());

    outcome_to_response(outcome, None).map(Json)
}

/// `GET /task/{task_id}`
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<CrawlTask>, ServiceError> {
    state
        .store
        .get(&task_id)?
        .map(Json)
        .ok_or(ServiceError::TaskNotFound(task_id))
}
