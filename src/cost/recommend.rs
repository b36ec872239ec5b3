use indexmap::IndexMap;

use crate::insights::{Evidence, Recommendation, RecommendationKind, WorkflowAggregate};

/// Calibration for the recommendation rules. Every comparison is strict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub max_avg_run_cost_usd: f64,
    pub max_avg_job_minutes: f64,
    pub max_runs: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_avg_run_cost_usd: 1.0,
            max_avg_job_minutes: 15.0,
            max_runs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Recommender {
    thresholds: Thresholds,
}

impl Recommender {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Scans the aggregate in iteration order. Each rule is independent, so a
    /// workflow may be flagged more than once.
    pub fn recommend(
        &self,
        workflows: &IndexMap<String, WorkflowAggregate>,
        total_runs: usize,
    ) -> Vec<Recommendation> {
        workflows
            .iter()
            .flat_map(|(name, workflow)| {
                let mut recs = Vec::new();
                recs.extend(self.expensive_workflow(name, workflow));
                recs.extend(self.long_jobs(name, workflow));
                recs.extend(self.high_frequency(name, workflow, total_runs));
                recs
            })
            .collect()
    }

    fn expensive_workflow(
        &self,
        name: &str,
        workflow: &WorkflowAggregate,
    ) -> Option<Recommendation> {
        if workflow.runs == 0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let avg_cost = workflow.cost / workflow.runs as f64;
        (avg_cost > self.thresholds.max_avg_run_cost_usd).then(|| Recommendation {
            kind: RecommendationKind::ExpensiveWorkflow,
            workflow: name.to_string(),
            job: None,
            fix: format!(
                "Averages ${avg_cost:.2} per run. Cache dependencies, cancel superseded runs with \
                 a `concurrency` group, and keep heavy jobs off macOS and Windows runners."
            ),
            evidence: Evidence::AvgCostUsd(avg_cost),
        })
    }

    fn long_jobs(&self, name: &str, workflow: &WorkflowAggregate) -> Vec<Recommendation> {
        workflow
            .jobs
            .iter()
            .filter(|(_, job)| job.count > 0)
            .filter_map(|(job_name, job)| {
                #[allow(clippy::cast_precision_loss)]
                let avg_min = job.minutes / job.count as f64;
                (avg_min > self.thresholds.max_avg_job_minutes).then(|| Recommendation {
                    kind: RecommendationKind::LongJob,
                    workflow: name.to_string(),
                    job: Some(job_name.clone()),
                    fix: format!(
                        "Averages {avg_min:.1} min per execution. Split it into parallel jobs \
                         or shard its tests, and cache build outputs between runs."
                    ),
                    evidence: Evidence::AvgMin(avg_min),
                })
            })
            .collect()
    }

    fn high_frequency(
        &self,
        name: &str,
        workflow: &WorkflowAggregate,
        total_runs: usize,
    ) -> Option<Recommendation> {
        (workflow.runs > self.thresholds.max_runs).then(|| Recommendation {
            kind: RecommendationKind::HighFrequency,
            workflow: name.to_string(),
            job: None,
            fix: format!(
                "Ran {} times out of {total_runs} analyzed runs. Add `paths` filters or \
                 `concurrency` cancellation to skip redundant triggers.",
                workflow.runs
            ),
            evidence: Evidence::Runs(workflow.runs),
        })
    }
}

/// Runs the recommendation rules with the default thresholds.
pub fn recommend(
    workflows: &IndexMap<String, WorkflowAggregate>,
    total_runs: usize,
) -> Vec<Recommendation> {
    Recommender::default().recommend(workflows, total_runs)
}
