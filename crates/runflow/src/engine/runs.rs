use std::time::Duration;

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::cron_eval;
use crate::error::{Error, Result};
use crate::model::{Job, JobRun, JobRunSortField, JobRunStatus, JobSchedule, Page};
use crate::pagination::PaginationParams;

/// Creates the first `SCHEDULED` run for each of a job's freshly-created
/// schedules, inside the caller's already-open transaction. There is
/// nothing to re-enter: this is a plain function over a borrowed
/// transaction, not a nested transaction scope.
pub(crate) async fn schedule_runs_tx(
    tx: &mut Transaction<'_, Postgres>,
    job: &Job,
    schedules: &[JobSchedule],
) -> Result<Vec<JobRun>> {
    let now = Utc::now();
    let mut runs = Vec::with_capacity(schedules.len());
    for schedule in schedules {
        let scheduled_at = cron_eval::cron_next(&schedule.cron, now)?;
        let run = sqlx::query_as::<_, JobRun>(
            r#"
            INSERT INTO job_runs (job_id, job_schedule_id, scheduled_at, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, job_id, job_schedule_id, scheduled_at, completed_at,
                      assigned_to, assigned_until, status, result
            "#,
        )
        .bind(job.id)
        .bind(schedule.id)
        .bind(scheduled_at)
        .bind(JobRunStatus::Scheduled.as_str())
        .fetch_one(&mut **tx)
        .await?;
        runs.push(run);
    }
    Ok(runs)
}

/// Materialises the next run for a schedule that a just-completed run
/// belonged to. Called once per completion, from inside `complete_run`'s
/// transaction — see the Open Question resolution on concurrent completion.
async fn materialise_next_tx(tx: &mut Transaction<'_, Postgres>, schedule_id: Uuid) -> Result<JobRun> {
    let schedule = sqlx::query_as::<_, JobSchedule>(
        "SELECT id, job_id, cron FROM job_schedules WHERE id = $1",
    )
    .bind(schedule_id)
    .fetch_one(&mut **tx)
    .await?;

    let scheduled_at = cron_eval::cron_next(&schedule.cron, Utc::now())?;

    let run = sqlx::query_as::<_, JobRun>(
        r#"
        INSERT INTO job_runs (job_id, job_schedule_id, scheduled_at, status)
        VALUES ($1, $2, $3, $4)
        RETURNING id, job_id, job_schedule_id, scheduled_at, completed_at,
                  assigned_to, assigned_until, status, result
        "#,
    )
    .bind(schedule.job_id)
    .bind(schedule.id)
    .bind(scheduled_at)
    .bind(JobRunStatus::Scheduled.as_str())
    .fetch_one(&mut **tx)
    .await?;

    Ok(run)
}

/// Assigns `id` to `worker` under a bounded lease, iff it is currently
/// assignable (§4.3.1). The conditional `UPDATE ... RETURNING` is the sole
/// serialisation point: two concurrent callers racing on the same run
/// produce exactly one success, regardless of interleaving.
pub async fn assign_run(
    pool: &PgPool,
    id: Uuid,
    worker: &str,
    lease_duration: Duration,
    min_lease: Duration,
    max_lease: Duration,
) -> Result<JobRun> {
    if lease_duration < min_lease || lease_duration > max_lease {
        return Err(Error::Validation(format!(
            "lease_duration must be between {}s and {}s, got {}s",
            min_lease.as_secs(),
            max_lease.as_secs(),
            lease_duration.as_secs()
        )));
    }

    let mut tx = pool.begin().await?;

    let lease_secs = lease_duration.as_secs_f64();
    let row = sqlx::query_as::<_, JobRun>(
        r#"
        UPDATE job_runs
        SET assigned_to = $2,
            assigned_until = now() + ($3::float8 * interval '1 second'),
            status = $4
        WHERE id = $1
          AND status IN ($4, $5)
          AND (scheduled_at IS NULL OR scheduled_at <= now())
          AND (
                assigned_to IS NULL
                OR assigned_to = $2
                OR assigned_until IS NULL
                OR assigned_until < now()
              )
        RETURNING id, job_id, job_schedule_id, scheduled_at, completed_at,
                  assigned_to, assigned_until, status, result
        "#,
    )
    .bind(id)
    .bind(worker)
    .bind(lease_secs)
    .bind(JobRunStatus::InProgress.as_str())
    .bind(JobRunStatus::Scheduled.as_str())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(run) = row else {
        tx.rollback().await?;
        tracing::info!(run_id = %id, %worker, "run assignment failed: not assignable or not found");
        return Err(Error::RunAssignmentFailed {
            id,
            worker: worker.to_string(),
        });
    };

    tx.commit().await?;
    tracing::info!(run_id = %run.id, %worker, status = run.status.as_str(), "run assigned");
    Ok(run)
}

/// Completes a run the caller currently and validly holds the lease on.
/// On success, and if the run originated from a schedule, materialises
/// that schedule's next run in the same transaction.
pub async fn complete_run(
    pool: &PgPool,
    id: Uuid,
    worker: &str,
    result: serde_json::Value,
) -> Result<JobRun> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, JobRun>(
        r#"
        UPDATE job_runs
        SET status = $4,
            result = $3,
            completed_at = now()
        WHERE id = $1
          AND status = $5
          AND assigned_to = $2
          AND assigned_until >= now()
        RETURNING id, job_id, job_schedule_id, scheduled_at, completed_at,
                  assigned_to, assigned_until, status, result
        "#,
    )
    .bind(id)
    .bind(worker)
    .bind(&result)
    .bind(JobRunStatus::Completed.as_str())
    .bind(JobRunStatus::InProgress.as_str())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(run) = row else {
        tx.rollback().await?;
        tracing::info!(run_id = %id, %worker, "run completion failed: no live lease held by this worker");
        return Err(Error::RunCompletionFailed {
            id,
            worker: worker.to_string(),
        });
    };

    if let Some(schedule_id) = run.job_schedule_id {
        materialise_next_tx(&mut tx, schedule_id).await?;
    }

    tx.commit().await?;
    tracing::info!(run_id = %run.id, %worker, "run completed");
    Ok(run)
}

pub async fn get_run(pool: &PgPool, id: Uuid) -> Result<JobRun> {
    sqlx::query_as::<_, JobRun>(
        r#"
        SELECT id, job_id, job_schedule_id, scheduled_at, completed_at,
               assigned_to, assigned_until, status, result
        FROM job_runs WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(Error::RunNotFound(id))
}

pub struct ListRunsParams {
    pub pagination: PaginationParams,
    pub sort: Option<JobRunSortField>,
    pub assignable_only: bool,
}

/// The read-only form of the assignability predicate (§4.3.1), applied
/// without a worker identity: a run not currently held under a live lease.
fn assignable_predicate() -> String {
    format!(
        r#"
        status IN ('{}', '{}')
        AND (scheduled_at IS NULL OR scheduled_at <= now())
        AND (assigned_to IS NULL OR assigned_until IS NULL OR assigned_until < now())
        "#,
        JobRunStatus::Scheduled.as_str(),
        JobRunStatus::InProgress.as_str(),
    )
}

pub async fn list_runs(pool: &PgPool, params: &ListRunsParams) -> Result<Page<JobRun>> {
    let sort_column = params
        .sort
        .map(|f| f.column())
        .unwrap_or("scheduled_at");
    let sort_order = params.pagination.sort_order.sql();

    let where_clause = if params.assignable_only {
        format!("WHERE {}", assignable_predicate())
    } else {
        String::new()
    };

    let count_sql = format!("SELECT COUNT(*) FROM job_runs {where_clause}");
    let count: i64 = sqlx::query_scalar(&count_sql).fetch_one(pool).await?;

    let list_sql = format!(
        r#"
        SELECT id, job_id, job_schedule_id, scheduled_at, completed_at,
               assigned_to, assigned_until, status, result
        FROM job_runs
        {where_clause}
        ORDER BY {sort_column} {sort_order}
        OFFSET $1 LIMIT $2
        "#
    );
    let results = sqlx::query_as::<_, JobRun>(&list_sql)
        .bind(params.pagination.offset())
        .bind(params.pagination.limit())
        .fetch_all(pool)
        .await?;

    Ok(Page { count, results })
}
