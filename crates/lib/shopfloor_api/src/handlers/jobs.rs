//! Job order request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use shopfloor_core::jobs::{JobOrderDraft, ProgressUpdate, TaskView};
use shopfloor_core::models::job::{JobOrder, TaskPath};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    JobOrderBody, MessageResponse, PopulateQuery, TaskResponseRequest, TaskUpdateResponse,
};

/// `/jobs/{id}/device/{device_id}/task/{task_id}` path parameters.
#[derive(Debug, Deserialize)]
pub struct TaskRoute {
    id: String,
    device_id: String,
    task_id: String,
}

impl From<TaskRoute> for TaskPath {
    fn from(route: TaskRoute) -> Self {
        TaskPath {
            job_id: route.id,
            device_id: route.device_id,
            task_id: route.task_id,
        }
    }
}

async fn render(
    state: &AppState,
    jobs: Vec<JobOrder>,
    populate: bool,
) -> AppResult<Vec<JobOrderBody>> {
    if !populate {
        return Ok(jobs.into_iter().map(JobOrderBody::Raw).collect());
    }
    let populated = state.jobs.populate(jobs).await?;
    Ok(populated.into_iter().map(JobOrderBody::Populated).collect())
}

async fn render_one(state: &AppState, job: JobOrder, populate: bool) -> AppResult<JobOrderBody> {
    if !populate {
        return Ok(JobOrderBody::Raw(job));
    }
    state
        .jobs
        .populate(vec![job])
        .await?
        .into_iter()
        .next()
        .map(JobOrderBody::Populated)
        .ok_or_else(|| AppError::Internal("populate dropped a job order".into()))
}

/// `POST /jobs`
pub async fn create_job_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<JobOrderDraft>,
) -> AppResult<(StatusCode, Json<JobOrder>)> {
    let job = state.jobs.create(&caller.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// `GET /jobs`
pub async fn list_jobs_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<PopulateQuery>,
) -> AppResult<Json<Vec<JobOrderBody>>> {
    let jobs = state.jobs.list(&caller.principal()).await?;
    Ok(Json(render(&state, jobs, query.populate).await?))
}

/// `GET /jobs/{id}`
pub async fn get_job_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<PopulateQuery>,
) -> AppResult<Json<JobOrderBody>> {
    let job = state.jobs.get(&caller.principal(), &id).await?;
    Ok(Json(render_one(&state, job, query.populate).await?))
}

/// `PUT /jobs/{id}`
pub async fn update_job_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<PopulateQuery>,
    ApiJson(body): ApiJson<JobOrderDraft>,
) -> AppResult<Json<JobOrderBody>> {
    let job = state.jobs.update(&caller.principal(), &id, body).await?;
    Ok(Json(render_one(&state, job, query.populate).await?))
}

/// `DELETE /jobs/{id}`
pub async fn delete_job_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<MessageResponse>> {
    state.jobs.delete(&caller.principal(), &id).await?;
    Ok(Json(MessageResponse::new("Job order deleted successfully")))
}

/// `GET /jobs/supervisor/{id}/tasks`
pub async fn supervisor_tasks_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(supervisor_id): ApiPath<String>,
) -> AppResult<Json<Vec<TaskView>>> {
    let tasks = state
        .jobs
        .tasks_for_supervisor(&caller.principal(), &supervisor_id)
        .await?;
    Ok(Json(tasks))
}

/// `GET /jobs/technician/{id}/tasks`
pub async fn technician_tasks_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(technician_id): ApiPath<String>,
) -> AppResult<Json<Vec<TaskView>>> {
    let tasks = state
        .jobs
        .tasks_for_technician(&caller.principal(), &technician_id)
        .await?;
    Ok(Json(tasks))
}

/// `PUT /jobs/{id}/device/{device_id}/task/{task_id}/response`
pub async fn respond_task_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(route): ApiPath<TaskRoute>,
    ApiJson(body): ApiJson<TaskResponseRequest>,
) -> AppResult<Json<TaskUpdateResponse>> {
    let task = state
        .jobs
        .respond_to_task(&caller.principal(), &route.into(), &body.task_response)
        .await?;
    Ok(Json(TaskUpdateResponse {
        message: "Task response updated".into(),
        task,
    }))
}

/// `PUT /jobs/{id}/device/{device_id}/task/{task_id}`
pub async fn update_task_handler(
    State(state): State<AppState>,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    ApiPath(route): ApiPath<TaskRoute>,
    ApiJson(body): ApiJson<ProgressUpdate>,
) -> AppResult<Json<TaskUpdateResponse>> {
    let task = state
        .jobs
        .update_task_progress(&caller.principal(), &route.into(), body)
        .await?;
    Ok(Json(TaskUpdateResponse {
        message: "Task updated".into(),
        task,
    }))
}
