use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobSchedule {
    pub id: Uuid,
    pub job_id: Uuid,
    pub cron: String,
}

/// A `Job` together with the schedules it owns, as returned over the wire.
/// Projected from joined rows rather than kept as a live bidirectional
/// relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobWithSchedules {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub schedules: Vec<JobSchedule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobRunStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl JobRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobRunStatus::Scheduled => "scheduled",
            JobRunStatus::InProgress => "in_progress",
            JobRunStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRun {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_schedule_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub assigned_until: Option<DateTime<Utc>>,
    pub status: JobRunStatus,
    pub result: Option<Value>,
}

/// Ascending or descending ordering requested on a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSortField {
    Name,
}

impl JobSortField {
    pub fn column(&self) -> &'static str {
        match self {
            JobSortField::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobRunSortField {
    ScheduledAt,
}

impl JobRunSortField {
    pub fn column(&self) -> &'static str {
        match self {
            JobRunSortField::ScheduledAt => "scheduled_at",
        }
    }
}

/// `{count, results}` — the page shape returned by every list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: i64,
    pub results: Vec<T>,
}
