use sqlx::PgPool;
use uuid::Uuid;

use crate::engine::runs::schedule_runs_tx;
use crate::error::{Error, Result};
use crate::model::{Job, JobSchedule, JobSortField, JobWithSchedules, Page};
use crate::pagination::PaginationParams;

pub struct NewSchedule {
    pub cron: String,
}

/// Creates a job together with its schedules and, for each schedule, its
/// first materialised run — all inside one transaction. A cron expression
/// that fails to parse rolls back the whole job; no partial job is ever
/// visible.
pub async fn create_job(
    pool: &PgPool,
    name: &str,
    schedules: Vec<NewSchedule>,
) -> Result<JobWithSchedules> {
    let mut tx = pool.begin().await?;

    let job = sqlx::query_as::<_, Job>(
        "INSERT INTO jobs (name) VALUES ($1) RETURNING id, name, created_at",
    )
    .bind(name)
    .fetch_one(&mut *tx)
    .await?;

    let mut created_schedules = Vec::with_capacity(schedules.len());
    for spec in &schedules {
        if let Err(err) = crate::cron_eval::validate(&spec.cron) {
            tracing::info!(job_id = %job.id, cron = %spec.cron, error = %err, "job creation failed: invalid cron expression");
            return Err(err);
        }
        let schedule = sqlx::query_as::<_, JobSchedule>(
            "INSERT INTO job_schedules (job_id, cron) VALUES ($1, $2) RETURNING id, job_id, cron",
        )
        .bind(job.id)
        .bind(&spec.cron)
        .fetch_one(&mut *tx)
        .await?;
        created_schedules.push(schedule);
    }

    schedule_runs_tx(&mut tx, &job, &created_schedules).await?;

    tx.commit().await?;

    tracing::info!(job_id = %job.id, name = %job.name, schedules = created_schedules.len(), "job created");

    Ok(JobWithSchedules {
        id: job.id,
        name: job.name,
        created_at: job.created_at,
        schedules: created_schedules,
    })
}

pub async fn get_job(pool: &PgPool, id: Uuid) -> Result<JobWithSchedules> {
    let job = sqlx::query_as::<_, Job>("SELECT id, name, created_at FROM jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::JobNotFound(id))?;

    let schedules = sqlx::query_as::<_, JobSchedule>(
        "SELECT id, job_id, cron FROM job_schedules WHERE job_id = $1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(JobWithSchedules {
        id: job.id,
        name: job.name,
        created_at: job.created_at,
        schedules,
    })
}

pub struct ListJobsParams {
    pub pagination: PaginationParams,
    pub sort: Option<JobSortField>,
}

pub async fn list_jobs(pool: &PgPool, params: &ListJobsParams) -> Result<Page<JobWithSchedules>> {
    let sort_column = params.sort.map(|f| f.column()).unwrap_or("name");
    let sort_order = params.pagination.sort_order.sql();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
        .fetch_one(pool)
        .await?;

    let list_sql = format!(
        "SELECT id, name, created_at FROM jobs ORDER BY {sort_column} {sort_order} OFFSET $1 LIMIT $2"
    );
    let jobs = sqlx::query_as::<_, Job>(&list_sql)
        .bind(params.pagination.offset())
        .bind(params.pagination.limit())
        .fetch_all(pool)
        .await?;

    let job_ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
    let schedules = sqlx::query_as::<_, JobSchedule>(
        "SELECT id, job_id, cron FROM job_schedules WHERE job_id = ANY($1) ORDER BY id",
    )
    .bind(&job_ids)
    .fetch_all(pool)
    .await?;

    let results = jobs
        .into_iter()
        .map(|job| {
            let schedules = schedules
                .iter()
                .filter(|s| s.job_id == job.id)
                .cloned()
                .collect();
            JobWithSchedules {
                id: job.id,
                name: job.name,
                created_at: job.created_at,
                schedules,
            }
        })
        .collect();

    Ok(Page { count, results })
}
