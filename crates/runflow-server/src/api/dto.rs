use serde::{Deserialize, Serialize};
use serde_json::Value;

use runflow::model::{JobRunSortField, JobSortField, SortOrder};

use super::duration::IsoDuration;

fn default_limit() -> i64 {
    100
}

/// Query parameters shared by both list endpoints before the per-resource
/// `sort` field is bolted on.
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub sort_order: SortOrder,
    pub sort: Option<JobSortField>,
}

#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub sort_order: SortOrder,
    pub sort: Option<JobRunSortField>,
    #[serde(default)]
    pub assignable_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewScheduleRequest {
    pub cron: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub name: String,
    pub schedules: Vec<NewScheduleRequest>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRunRequest {
    pub worker: String,
    pub lease_duration: IsoDuration,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRunRequest {
    pub worker: String,
    pub result: Value,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}
