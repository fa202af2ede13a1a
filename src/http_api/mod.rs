use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::calculations::Slot;
use crate::error::PlannerError;
use crate::persistence::{self, PersistenceError};
use crate::store::{MergeMode, ResourceOverview, TaskStore};
use crate::sync::{self, SourceRecord, SyncMode};
use crate::task::{NewTask, Task, TaskKind};
use crate::timeline::{self, DateRange, Granularity, HeaderCell};
use crate::calendar;

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<TaskStore>>,
    fixed_today: Option<NaiveDate>,
}

impl AppState {
    pub fn new(store: TaskStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            fixed_today: None,
        }
    }

    /// Pins the date used for slot finding and import defaults.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    fn store(&self) -> Arc<RwLock<TaskStore>> {
        self.store.clone()
    }

    fn today(&self) -> NaiveDate {
        self.fixed_today.unwrap_or_else(calendar::today)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Unprocessable(String),
    Internal(String),
}

impl From<PlannerError> for ApiError {
    fn from(value: PlannerError) -> Self {
        match value {
            PlannerError::Validation(_) => ApiError::Invalid(value.to_string()),
            PlannerError::NotFound(_) => ApiError::NotFound(value.to_string()),
            PlannerError::EmptyInput(_) => ApiError::Unprocessable(value.to_string()),
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::Planner(err) => err.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Unprocessable(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "empty_input", message)
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        tracing::warn!(status = status.as_u16(), error, %message, "request failed");
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct TaskFilter {
    resource: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AllocationPayload {
    percentage: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllocationResponse {
    allocation_percentage: u32,
    tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
struct ModeQuery {
    #[serde(default)]
    mode: MergeMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MergeSummary {
    mode: MergeMode,
    imported: usize,
    total: usize,
}

#[derive(Debug, Deserialize)]
struct SyncPayload {
    #[serde(default)]
    mode: SyncMode,
    records: Vec<SourceRecord>,
}

#[derive(Debug, Deserialize)]
struct TimelineQuery {
    granularity: Option<Granularity>,
    week: Option<String>,
    resource: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskBar {
    task_id: i32,
    offset: i64,
    span: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimelineView {
    range: DateRange,
    granularity: Granularity,
    column_width: f64,
    headers: Vec<HeaderCell>,
    bars: Vec<TaskBar>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", get(get_task))
        .route("/resources", get(list_resources))
        .route("/resources/:name/slot", get(resource_slot))
        .route("/allocation", post(set_allocation))
        .route("/import", post(import_tasks))
        .route("/export", get(export_tasks))
        .route("/sync", post(sync_tasks))
        .route("/timeline", get(get_timeline))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, store: TaskStore) -> std::io::Result<()> {
    let state = AppState::new(store);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(filter): Query<TaskFilter>,
) -> Json<Vec<Task>> {
    let kind = filter.kind.as_deref().map(TaskKind::parse);
    let store = state.store();
    let tasks = store.read().filtered(filter.resource.as_deref(), kind.as_ref());
    Json(tasks)
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
) -> Result<Json<Task>, ApiError> {
    let store = state.store();
    let task = store.read().find_task(task_id).cloned();
    task.map(Json)
        .ok_or_else(|| PlannerError::NotFound(task_id).into())
}

async fn create_task(
    State(state): State<AppState>,
    Json(spec): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let today = state.today();
    let store = state.store();
    let created = {
        let mut guard = store.write();
        let updated = guard.insert(&spec, today)?;
        let created = updated
            .tasks()
            .last()
            .cloned()
            .ok_or_else(|| ApiError::Internal("task missing after insertion".into()))?;
        *guard = updated;
        created
    };
    tracing::info!(task_id = created.id, resource = %created.resource, "task created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_resources(State(state): State<AppState>) -> Json<Vec<ResourceOverview>> {
    let today = state.today();
    let store = state.store();
    let overview = store.read().overview(today);
    Json(overview)
}

async fn resource_slot(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> Json<Slot> {
    let today = state.today();
    let store = state.store();
    let slot = store.read().slot(&resource, today);
    Json(slot)
}

async fn set_allocation(
    State(state): State<AppState>,
    Json(payload): Json<AllocationPayload>,
) -> Result<Json<AllocationResponse>, ApiError> {
    let store = state.store();
    let response = {
        let mut guard = store.write();
        let updated = guard.with_allocation(payload.percentage)?;
        *guard = updated;
        AllocationResponse {
            allocation_percentage: guard.allocation_percentage(),
            tasks: guard.tasks().to_vec(),
        }
    };
    Ok(Json(response))
}

async fn import_tasks(
    State(state): State<AppState>,
    Query(query): Query<ModeQuery>,
    body: String,
) -> Result<Json<MergeSummary>, ApiError> {
    let today = state.today();
    let store = state.store();
    let summary = {
        let mut guard = store.write();
        let before = if query.mode == MergeMode::Append { guard.len() } else { 0 };
        let updated = persistence::import_csv(&body, &guard, query.mode, today)?;
        *guard = updated;
        MergeSummary {
            mode: query.mode,
            imported: guard.len() - before,
            total: guard.len(),
        }
    };
    tracing::info!(mode = %summary.mode, imported = summary.imported, "csv imported");
    Ok(Json(summary))
}

async fn export_tasks(State(state): State<AppState>) -> Result<Response, ApiError> {
    let store = state.store();
    let csv = persistence::export_csv(store.read().tasks())?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response())
}

async fn sync_tasks(
    State(state): State<AppState>,
    Json(payload): Json<SyncPayload>,
) -> Result<Json<MergeSummary>, ApiError> {
    let today = state.today();
    let incoming = sync::normalize_records(payload.records, today)?;
    let store = state.store();
    let summary = {
        let mut guard = store.write();
        let before = if payload.mode == SyncMode::Append { guard.len() } else { 0 };
        let updated = sync::sync(&guard, payload.mode, incoming)?;
        *guard = updated;
        MergeSummary {
            mode: payload.mode,
            imported: guard.len() - before,
            total: guard.len(),
        }
    };
    Ok(Json(summary))
}

async fn get_timeline(
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<TimelineView>, ApiError> {
    let granularity = query.granularity.unwrap_or_default();
    let week = query
        .week
        .as_deref()
        .map(calendar::parse_date)
        .transpose()?;
    let today = state.today();
    let store = state.store();
    let tasks = store.read().filtered(query.resource.as_deref(), None);

    let range = timeline::compute_range(&tasks, week, today);
    let bars = tasks
        .iter()
        .map(|task| TaskBar {
            task_id: task.id,
            offset: timeline::task_offset(task, range.min_date),
            span: timeline::task_span(task, granularity),
        })
        .collect();
    Ok(Json(TimelineView {
        range,
        granularity,
        column_width: timeline::column_width(granularity),
        headers: timeline::group_header_labels(&range, granularity),
        bars,
    }))
}
