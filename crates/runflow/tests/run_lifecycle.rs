mod common;

use std::time::Duration;

use chrono::Utc;
use common::setup_db;
use serde_json::json;
use serial_test::serial;

use runflow::engine::jobs::{self, NewSchedule};
use runflow::engine::runs;
use runflow::error::Error;
use runflow::model::JobRunStatus;

const MIN_LEASE: Duration = Duration::from_secs(30);
const MAX_LEASE: Duration = Duration::from_secs(120);

#[tokio::test]
#[serial]
async fn create_job_materialises_first_run() {
    let pool = setup_db().await;

    let job = jobs::create_job(
        &pool,
        "nightly",
        vec![NewSchedule {
            cron: "0 3 * * *".to_string(),
        }],
    )
    .await
    .unwrap();

    assert_eq!(job.schedules.len(), 1);

    let page = runs::list_runs(&pool, &runs::ListRunsParams {
        pagination: Default::default(),
        sort: None,
        assignable_only: false,
    })
    .await
    .unwrap();

    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].job_id, job.id);
    assert_eq!(page.results[0].status, JobRunStatus::Scheduled);
}

#[tokio::test]
#[serial]
async fn assign_then_complete_reschedules_next_run() {
    let pool = setup_db().await;

    let _job = jobs::create_job(
        &pool,
        "nightly",
        vec![NewSchedule {
            cron: "* * * * *".to_string(),
        }],
    )
    .await
    .unwrap();

    let first_run = runs::list_runs(&pool, &runs::ListRunsParams {
        pagination: Default::default(),
        sort: None,
        assignable_only: false,
    })
    .await
    .unwrap()
    .results
    .remove(0);

    // Run is scheduled in the future (next minute); it should not yet be assignable.
    let err = runs::assign_run(&pool, first_run.id, "w1", Duration::from_secs(60), MIN_LEASE, MAX_LEASE)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RunAssignmentFailed { .. }));

    // Backdate scheduled_at so the run becomes eligible without sleeping a whole minute.
    sqlx::query("UPDATE job_runs SET scheduled_at = now() - interval '1 second' WHERE id = $1")
        .bind(first_run.id)
        .execute(&pool)
        .await
        .unwrap();

    let assigned = runs::assign_run(&pool, first_run.id, "w1", Duration::from_secs(60), MIN_LEASE, MAX_LEASE)
        .await
        .unwrap();
    assert_eq!(assigned.status, JobRunStatus::InProgress);
    assert_eq!(assigned.assigned_to.as_deref(), Some("w1"));

    let completed = runs::complete_run(&pool, first_run.id, "w1", json!("ok"))
        .await
        .unwrap();
    assert_eq!(completed.status, JobRunStatus::Completed);
    assert!(completed.completed_at.is_some());

    let page = runs::list_runs(&pool, &runs::ListRunsParams {
        pagination: Default::default(),
        sort: None,
        assignable_only: false,
    })
    .await
    .unwrap();
    assert_eq!(page.count, 2, "completion must materialise exactly one new run");

    let next_run = page
        .results
        .iter()
        .find(|r| r.id != first_run.id)
        .expect("next run exists");
    assert_eq!(next_run.status, JobRunStatus::Scheduled);
    assert_eq!(next_run.job_schedule_id, first_run.job_schedule_id);
}

#[tokio::test]
#[serial]
async fn concurrent_assign_has_exactly_one_winner() {
    let pool = setup_db().await;

    let _job = jobs::create_job(
        &pool,
        "race",
        vec![NewSchedule {
            cron: "* * * * *".to_string(),
        }],
    )
    .await
    .unwrap();

    let run = runs::list_runs(&pool, &runs::ListRunsParams {
        pagination: Default::default(),
        sort: None,
        assignable_only: false,
    })
    .await
    .unwrap()
    .results
    .remove(0);

    sqlx::query("UPDATE job_runs SET scheduled_at = now() - interval '1 second' WHERE id = $1")
        .bind(run.id)
        .execute(&pool)
        .await
        .unwrap();

    let pool_a = pool.clone();
    let pool_b = pool.clone();
    let run_id = run.id;

    let (a, b) = tokio::join!(
        runs::assign_run(&pool_a, run_id, "w1", Duration::from_secs(60), MIN_LEASE, MAX_LEASE),
        runs::assign_run(&pool_b, run_id, "w2", Duration::from_secs(60), MIN_LEASE, MAX_LEASE),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    let failures = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(Error::RunAssignmentFailed { .. })))
        .count();

    assert_eq!(successes, 1, "exactly one concurrent assign should win");
    assert_eq!(failures, 1, "the other concurrent assign should fail");
}

#[tokio::test]
#[serial]
async fn lease_expiry_allows_reassignment_and_orphans_original_worker() {
    let pool = setup_db().await;

    let _job = jobs::create_job(
        &pool,
        "expiry",
        vec![NewSchedule {
            cron: "* * * * *".to_string(),
        }],
    )
    .await
    .unwrap();

    let run = runs::list_runs(&pool, &runs::ListRunsParams {
        pagination: Default::default(),
        sort: None,
        assignable_only: false,
    })
    .await
    .unwrap()
    .results
    .remove(0);

    sqlx::query("UPDATE job_runs SET scheduled_at = now() - interval '1 second' WHERE id = $1")
        .bind(run.id)
        .execute(&pool)
        .await
        .unwrap();

    runs::assign_run(&pool, run.id, "w1", MIN_LEASE, MIN_LEASE, MAX_LEASE)
        .await
        .unwrap();

    // Force the lease into the past rather than sleeping out MIN_LEASE seconds.
    sqlx::query("UPDATE job_runs SET assigned_until = now() - interval '1 second' WHERE id = $1")
        .bind(run.id)
        .execute(&pool)
        .await
        .unwrap();

    let reassigned = runs::assign_run(&pool, run.id, "w2", MIN_LEASE, MIN_LEASE, MAX_LEASE)
        .await
        .unwrap();
    assert_eq!(reassigned.assigned_to.as_deref(), Some("w2"));

    let err = runs::complete_run(&pool, run.id, "w1", json!("too late"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RunCompletionFailed { .. }));
}

#[tokio::test]
#[serial]
async fn complete_by_wrong_worker_is_rejected() {
    let pool = setup_db().await;

    let _job = jobs::create_job(
        &pool,
        "wrong-worker",
        vec![NewSchedule {
            cron: "* * * * *".to_string(),
        }],
    )
    .await
    .unwrap();

    let run = runs::list_runs(&pool, &runs::ListRunsParams {
        pagination: Default::default(),
        sort: None,
        assignable_only: false,
    })
    .await
    .unwrap()
    .results
    .remove(0);

    sqlx::query("UPDATE job_runs SET scheduled_at = now() - interval '1 second' WHERE id = $1")
        .bind(run.id)
        .execute(&pool)
        .await
        .unwrap();

    runs::assign_run(&pool, run.id, "w1", MIN_LEASE, MIN_LEASE, MAX_LEASE)
        .await
        .unwrap();

    let err = runs::complete_run(&pool, run.id, "w2", json!("ok"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RunCompletionFailed { .. }));

    let current = runs::get_run(&pool, run.id).await.unwrap();
    assert_eq!(current.status, JobRunStatus::InProgress);
}

#[tokio::test]
#[serial]
async fn assignable_only_excludes_not_yet_due_runs() {
    let pool = setup_db().await;

    let _job = jobs::create_job(
        &pool,
        "future",
        vec![NewSchedule {
            cron: "0 0 1 1 *".to_string(), // next Jan 1st — safely in the future
        }],
    )
    .await
    .unwrap();

    let run = runs::list_runs(&pool, &runs::ListRunsParams {
        pagination: Default::default(),
        sort: None,
        assignable_only: false,
    })
    .await
    .unwrap()
    .results
    .remove(0);
    assert!(run.scheduled_at.unwrap() > Utc::now());

    let err = runs::assign_run(&pool, run.id, "w1", MIN_LEASE, MIN_LEASE, MAX_LEASE)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RunAssignmentFailed { .. }));

    let assignable = runs::list_runs(&pool, &runs::ListRunsParams {
        pagination: Default::default(),
        sort: None,
        assignable_only: true,
    })
    .await
    .unwrap();
    assert_eq!(assignable.count, 0);
}

#[tokio::test]
#[serial]
async fn invalid_cron_is_rejected_at_job_creation() {
    let pool = setup_db().await;

    let err = jobs::create_job(
        &pool,
        "bad",
        vec![NewSchedule {
            cron: "not a cron".to_string(),
        }],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InvalidCronExpression { .. }));

    // Rollback must be total: no half-created job left behind.
    let page = jobs::list_jobs(&pool, &jobs::ListJobsParams {
        pagination: Default::default(),
        sort: None,
    })
    .await
    .unwrap();
    assert_eq!(page.count, 0);
}
