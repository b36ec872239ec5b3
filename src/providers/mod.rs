pub mod github;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::cost::ComputeEnvironment;
use crate::error::Result;

/// One workflow run as listed by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: u64,
    pub workflow_name: String,
    pub status: String,
}

/// One job within a run. Timestamps are kept raw so parsing failures stay
/// local to the job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub name: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub labels: Vec<String>,
}

/// Billable milliseconds per compute environment for a single run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillableTiming {
    pub billable_ms: IndexMap<ComputeEnvironment, u64>,
}

impl BillableTiming {
    /// Adds `ms` to the environment's bucket.
    pub fn add(&mut self, env: ComputeEnvironment, ms: u64) {
        *self.billable_ms.entry(env).or_insert(0) += ms;
    }
}

#[async_trait]
pub trait CiClient: Sync {
    async fn runs(&self, repository: &str, limit: usize) -> Result<Vec<RunRecord>>;

    async fn timing(&self, run_id: u64) -> Result<BillableTiming>;

    async fn jobs(&self, run_id: u64) -> Result<Vec<JobRecord>>;
}
