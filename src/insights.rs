use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// Final output of one analysis.
///
/// Workflow-level figures come from the billing timing endpoint while job-level
/// figures come from job timestamps, so the sum of job costs is not expected to
/// match the workflow cost.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub repository: String,
    pub collected_at: DateTime<Utc>,
    pub total_runs: usize,
    pub total_minutes: f64,
    pub total_cost: f64,
    pub workflows: IndexMap<String, WorkflowAggregate>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowAggregate {
    pub runs: usize,
    pub minutes: f64,
    pub cost: f64,
    pub jobs: IndexMap<String, JobAggregate>,
}

impl WorkflowAggregate {
    /// Adds one run's billable minutes and cost.
    pub fn add_billable(&mut self, minutes: f64, cost: f64) {
        self.minutes += minutes.max(0.0);
        self.cost += cost.max(0.0);
    }

    pub fn job_mut(&mut self, name: &str) -> &mut JobAggregate {
        self.jobs.entry(name.to_string()).or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobAggregate {
    pub count: usize,
    pub minutes: f64,
    pub cost: f64,
}

impl JobAggregate {
    pub fn record(&mut self, minutes: f64, cost: f64) {
        self.count += 1;
        self.minutes += minutes.max(0.0);
        self.cost += cost.max(0.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    ExpensiveWorkflow,
    LongJob,
    HighFrequency,
}

impl RecommendationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExpensiveWorkflow => "expensive_workflow",
            Self::LongJob => "long_job",
            Self::HighFrequency => "high_frequency",
        }
    }
}

/// Numeric evidence backing a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    AvgCostUsd(f64),
    AvgMin(f64),
    Runs(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub workflow: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    pub fix: String,
    pub evidence: Evidence,
}
