mod dto;
mod duration;
mod error;

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use sqlx::PgPool;
use uuid::Uuid;

use runflow::engine::jobs::{self, ListJobsParams, NewSchedule};
use runflow::engine::runs::{self, ListRunsParams};
use runflow::model::{JobRun, JobWithSchedules, Page};
use runflow::pagination::PaginationParams;

use dto::{AssignRunRequest, CompleteRunRequest, CreateJobRequest, ListJobsQuery, ListRunsQuery};
use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub min_lease: Duration,
    pub max_lease: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/jobs", get(list_jobs).post(create_job))
        .route("/v1/jobs/:id", get(get_job))
        .route("/v1/runs", get(list_runs))
        .route("/v1/runs/:id", get(get_run))
        .route("/v1/runs/:id/assign", post(assign_run))
        .route("/v1/runs/:id/complete", post(complete_run))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(q): Query<ListJobsQuery>,
) -> Result<Json<Page<JobWithSchedules>>, ApiError> {
    let params = ListJobsParams {
        pagination: PaginationParams {
            offset: q.offset,
            limit: q.limit,
            sort_order: q.sort_order,
        },
        sort: q.sort,
    };
    let page = jobs::list_jobs(&state.pool, &params).await?;
    Ok(Json(page))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobWithSchedules>, ApiError> {
    let job = jobs::get_job(&state.pool, id).await?;
    Ok(Json(job))
}

async fn create_job(
    State(state): State<AppState>,
    Json(body): Json<CreateJobRequest>,
) -> Result<Json<JobWithSchedules>, ApiError> {
    let schedules = body
        .schedules
        .into_iter()
        .map(|s| NewSchedule { cron: s.cron })
        .collect();

    let job = jobs::create_job(&state.pool, &body.name, schedules).await?;
    Ok(Json(job))
}

async fn list_runs(
    State(state): State<AppState>,
    Query(q): Query<ListRunsQuery>,
) -> Result<Json<Page<JobRun>>, ApiError> {
    let params = ListRunsParams {
        pagination: PaginationParams {
            offset: q.offset,
            limit: q.limit,
            sort_order: q.sort_order,
        },
        sort: q.sort,
        assignable_only: q.assignable_only,
    };
    let page = runs::list_runs(&state.pool, &params).await?;
    Ok(Json(page))
}

async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobRun>, ApiError> {
    let run = runs::get_run(&state.pool, id).await?;
    Ok(Json(run))
}

async fn assign_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignRunRequest>,
) -> Result<Json<JobRun>, ApiError> {
    let run = runs::assign_run(
        &state.pool,
        id,
        &body.worker,
        body.lease_duration.0,
        state.min_lease,
        state.max_lease,
    )
    .await?;
    Ok(Json(run))
}

async fn complete_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CompleteRunRequest>,
) -> Result<Json<JobRun>, ApiError> {
    let run = runs::complete_run(&state.pool, id, &body.worker, body.result).await?;
    Ok(Json(run))
}
