use indexmap::IndexMap;
use serde::Deserialize;

use crate::cost::classify_environment;
use crate::providers::{BillableTiming, JobRecord, RunRecord};

#[derive(Debug, Deserialize)]
pub struct WorkflowRunsPage {
    pub workflow_runs: Vec<WorkflowRunDto>,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowRunDto {
    pub id: u64,
    pub name: Option<String>,
    pub status: Option<String>,
}

impl From<WorkflowRunDto> for RunRecord {
    fn from(dto: WorkflowRunDto) -> Self {
        Self {
            id: dto.id,
            workflow_name: dto.name.unwrap_or_else(|| "unknown".to_string()),
            status: dto.status.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunTimingDto {
    #[serde(default)]
    pub billable: IndexMap<String, BillableBucketDto>,
}

#[derive(Debug, Deserialize)]
pub struct BillableBucketDto {
    #[serde(default)]
    pub total_ms: u64,
}

impl From<RunTimingDto> for BillableTiming {
    fn from(dto: RunTimingDto) -> Self {
        let mut timing = BillableTiming::default();
        for (key, bucket) in dto.billable {
            timing.add(classify_environment(&[key]), bucket.total_ms);
        }
        timing
    }
}

#[derive(Debug, Deserialize)]
pub struct JobsPage {
    #[serde(default)]
    pub total_count: usize,
    pub jobs: Vec<JobDto>,
}

#[derive(Debug, Deserialize)]
pub struct JobDto {
    pub name: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl From<JobDto> for JobRecord {
    fn from(dto: JobDto) -> Self {
        Self {
            name: dto.name,
            started_at: dto.started_at,
            completed_at: dto.completed_at,
            labels: dto.labels,
        }
    }
}
