use chrono::Utc;
use futures::{stream, StreamExt};
use indexmap::IndexMap;
use log::{info, warn};

use super::duration::{elapsed_minutes, parse_timestamp};
use super::rates::{classify_environment, RateTable};
use super::recommend::{Recommender, Thresholds};
use crate::error::Result;
use crate::insights::{AnalysisResult, WorkflowAggregate};
use crate::providers::{BillableTiming, CiClient, JobRecord, RunRecord};

const CONCURRENCY: usize = 10;

/// Cost contribution of one run, computed in isolation and folded afterwards.
#[derive(Debug)]
struct RunOutcome {
    workflow_name: String,
    billable: Option<Priced>,
    jobs: Option<Vec<(String, Priced)>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Priced {
    minutes: f64,
    cost: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Analyzer {
    rates: RateTable,
    thresholds: Thresholds,
}

impl Analyzer {
    pub fn new(rates: RateTable, thresholds: Thresholds) -> Self {
        Self { rates, thresholds }
    }

    /// Fetches up to `limit` runs and folds their billing and job data into a
    /// per-workflow breakdown.
    ///
    /// Only a failure to list runs is returned as an error. Timing or job fetch
    /// failures for a single run are logged and contribute nothing.
    pub async fn analyze<C: CiClient + ?Sized>(
        &self,
        client: &C,
        repository: &str,
        limit: usize,
    ) -> Result<AnalysisResult> {
        info!("Starting cost analysis for repository: {repository}");

        let runs = client.runs(repository, limit).await?;
        let total_runs = runs.len();

        if runs.is_empty() {
            warn!("No workflow runs found for repository: {repository}");
        }

        info!("Fetching timing and jobs for {total_runs} runs...");

        // buffered keeps run-list order, so workflows appear in first-seen order
        let outcomes: Vec<RunOutcome> = stream::iter(&runs)
            .map(|run| self.price_run(client, run))
            .buffered(CONCURRENCY)
            .collect()
            .await;

        let workflows = fold_outcomes(outcomes);

        let total_cost = workflows.values().map(|wf| wf.cost).sum();
        let total_minutes = workflows.values().map(|wf| wf.minutes).sum();
        let recommendations = Recommender::new(self.thresholds).recommend(&workflows, total_runs);

        info!(
            "Analyzed {total_runs} runs across {} workflows",
            workflows.len()
        );

        Ok(AnalysisResult {
            repository: repository.to_string(),
            collected_at: Utc::now(),
            total_runs,
            total_minutes,
            total_cost,
            workflows,
            recommendations,
        })
    }

    async fn price_run<C: CiClient + ?Sized>(&self, client: &C, run: &RunRecord) -> RunOutcome {
        let (timing, jobs) = tokio::join!(client.timing(run.id), client.jobs(run.id));

        let billable = match timing {
            Ok(timing) => Some(self.price_timing(&timing)),
            Err(e) => {
                warn!("Run {}: failed to fetch billable timing: {e}", run.id);
                None
            }
        };

        let jobs = match jobs {
            Ok(jobs) => Some(
                jobs.iter()
                    .map(|job| (job.name.clone(), self.price_job(run.id, job)))
                    .collect(),
            ),
            Err(e) => {
                warn!("Run {}: failed to fetch jobs: {e}", run.id);
                None
            }
        };

        RunOutcome {
            workflow_name: run.workflow_name.clone(),
            billable,
            jobs,
        }
    }

    fn price_timing(&self, timing: &BillableTiming) -> Priced {
        timing
            .billable_ms
            .iter()
            .fold(Priced::default(), |acc, (&env, &ms)| {
                #[allow(clippy::cast_precision_loss)]
                let minutes = ms as f64 / 60_000.0;
                Priced {
                    minutes: acc.minutes + minutes,
                    cost: acc.cost + self.rates.cost(env, minutes),
                }
            })
    }

    fn price_job(&self, run_id: u64, job: &JobRecord) -> Priced {
        let env = classify_environment(job.labels.as_slice());
        let minutes = job_minutes(run_id, job);

        Priced {
            minutes,
            cost: self.rates.cost(env, minutes),
        }
    }
}

fn job_minutes(run_id: u64, job: &JobRecord) -> f64 {
    let bounds = parse_timestamp(job.started_at.as_deref()).and_then(|start| {
        parse_timestamp(job.completed_at.as_deref()).map(|end| (start, end))
    });

    match bounds {
        Ok((start, end)) => elapsed_minutes(start, end),
        Err(e) => {
            warn!(
                "Run {run_id}: job '{}' has an unreadable timestamp, counting zero minutes: {e}",
                job.name
            );
            0.0
        }
    }
}

fn fold_outcomes(outcomes: Vec<RunOutcome>) -> IndexMap<String, WorkflowAggregate> {
    let mut workflows: IndexMap<String, WorkflowAggregate> = IndexMap::new();

    for outcome in outcomes {
        let workflow = workflows.entry(outcome.workflow_name).or_default();
        workflow.runs += 1;

        if let Some(billable) = outcome.billable {
            workflow.add_billable(billable.minutes, billable.cost);
        }

        for (name, priced) in outcome.jobs.into_iter().flatten() {
            workflow.job_mut(&name).record(priced.minutes, priced.cost);
        }
    }

    workflows
}

/// Analyzes `repository` with the default rate table and thresholds.
pub async fn analyze<C: CiClient + ?Sized>(
    client: &C,
    repository: &str,
    limit: usize,
) -> Result<AnalysisResult> {
    Analyzer::default().analyze(client, repository, limit).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cost::ComputeEnvironment;
    use crate::error::RunCostError;

    /// In-memory client. Runs without a timing or jobs entry fail that fetch.
    #[derive(Default)]
    struct FakeClient {
        runs: Vec<RunRecord>,
        fail_listing: bool,
        timings: HashMap<u64, BillableTiming>,
        jobs: HashMap<u64, Vec<JobRecord>>,
        timing_calls: AtomicUsize,
        jobs_calls: AtomicUsize,
    }

    #[async_trait]
    impl CiClient for FakeClient {
        async fn runs(&self, _repository: &str, limit: usize) -> Result<Vec<RunRecord>> {
            if self.fail_listing {
                return Err(RunCostError::Api("Failed to fetch workflow runs: 500".into()));
            }
            Ok(self.runs.iter().take(limit).cloned().collect())
        }

        async fn timing(&self, run_id: u64) -> Result<BillableTiming> {
            self.timing_calls.fetch_add(1, Ordering::SeqCst);
            self.timings
                .get(&run_id)
                .cloned()
                .ok_or_else(|| RunCostError::Api("rate limited".into()))
        }

        async fn jobs(&self, run_id: u64) -> Result<Vec<JobRecord>> {
            self.jobs_calls.fetch_add(1, Ordering::SeqCst);
            self.jobs
                .get(&run_id)
                .cloned()
                .ok_or_else(|| RunCostError::Api("rate limited".into()))
        }
    }

    fn run(id: u64, name: &str) -> RunRecord {
        RunRecord {
            id,
            workflow_name: name.to_string(),
            status: "completed".to_string(),
        }
    }

    fn job(name: &str, start: &str, end: Option<&str>, label: &str) -> JobRecord {
        JobRecord {
            name: name.to_string(),
            started_at: Some(start.to_string()),
            completed_at: end.map(str::to_string),
            labels: vec![label.to_string()],
        }
    }

    fn timing(buckets: &[(ComputeEnvironment, u64)]) -> BillableTiming {
        let mut timing = BillableTiming::default();
        for &(env, ms) in buckets {
            timing.add(env, ms);
        }
        timing
    }

    fn build_and_test_jobs() -> Vec<JobRecord> {
        vec![
            job(
                "build",
                "2024-01-01T00:00:00Z",
                Some("2024-01-01T00:08:00Z"),
                "ubuntu-latest",
            ),
            job(
                "test",
                "2024-01-01T00:08:00Z",
                Some("2024-01-01T00:10:00Z"),
                "ubuntu-latest",
            ),
        ]
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[tokio::test]
    async fn test_full_analysis() {
        let ten_minutes = timing(&[(ComputeEnvironment::Ubuntu, 600_000)]);
        let client = FakeClient {
            runs: vec![run(101, "Build & Test"), run(102, "Build & Test")],
            timings: HashMap::from([(101, ten_minutes.clone()), (102, ten_minutes)]),
            jobs: HashMap::from([(101, build_and_test_jobs()), (102, build_and_test_jobs())]),
            ..Default::default()
        };

        let result = analyze(&client, "acme/app", 10).await.unwrap();

        assert_eq!(result.repository, "acme/app");
        assert_eq!(result.total_runs, 2);
        assert!(result.total_cost > 0.0);
        assert_close(result.total_cost, 0.16);
        assert_close(result.total_minutes, 20.0);

        let wf = &result.workflows["Build & Test"];
        assert_eq!(wf.runs, 2);
        assert_close(wf.minutes, 20.0);

        let build = &wf.jobs["build"];
        assert_eq!(build.count, 2);
        assert_close(build.minutes, 16.0);
        assert_close(build.cost, 0.128);

        let test = &wf.jobs["test"];
        assert_eq!(test.count, 2);
        assert_close(test.minutes, 4.0);

        assert!(result.recommendations.is_empty());
        assert_eq!(client.timing_calls.load(Ordering::SeqCst), 2);
        assert_eq!(client.jobs_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_repo() {
        let client = FakeClient::default();

        let result = analyze(&client, "empty/repo", 10).await.unwrap();

        assert_eq!(result.total_runs, 0);
        assert_eq!(result.total_cost, 0.0);
        assert!(result.workflows.is_empty());
        assert!(result.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_per_run_failures_are_absorbed() {
        let client = FakeClient {
            runs: vec![run(1, "CI")],
            ..Default::default()
        };

        let result = analyze(&client, "org/repo", 5).await.unwrap();

        assert_eq!(result.total_runs, 1);
        assert_eq!(result.total_cost, 0.0);
        let wf = &result.workflows["CI"];
        assert_eq!(wf.runs, 1);
        assert_eq!(wf.cost, 0.0);
        assert_eq!(wf.minutes, 0.0);
        assert!(wf.jobs.is_empty());
    }

    #[tokio::test]
    async fn test_failed_run_does_not_affect_others() {
        let client = FakeClient {
            runs: vec![run(1, "CI"), run(2, "CI"), run(3, "CI")],
            timings: HashMap::from([
                (1, timing(&[(ComputeEnvironment::Ubuntu, 60_000)])),
                (3, timing(&[(ComputeEnvironment::Ubuntu, 60_000)])),
            ]),
            jobs: HashMap::from([(2, build_and_test_jobs())]),
            ..Default::default()
        };

        let result = analyze(&client, "org/repo", 5).await.unwrap();
        let wf = &result.workflows["CI"];

        assert_eq!(result.total_runs, 3);
        assert_eq!(wf.runs, 3);
        assert_close(wf.minutes, 2.0);
        assert_close(wf.cost, 0.016);
        assert_eq!(wf.jobs["build"].count, 1);
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let client = FakeClient {
            fail_listing: true,
            ..Default::default()
        };

        let result = analyze(&client, "org/repo", 5).await;

        assert!(matches!(result, Err(RunCostError::Api(_))));
        assert_eq!(client.timing_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_limit_bounds_runs() {
        let client = FakeClient {
            runs: (1..=5).map(|id| run(id, "CI")).collect(),
            ..Default::default()
        };

        let result = analyze(&client, "org/repo", 3).await.unwrap();

        assert_eq!(result.total_runs, 3);
        assert_eq!(result.workflows["CI"].runs, 3);
    }

    #[tokio::test]
    async fn test_mixed_environment_buckets() {
        let client = FakeClient {
            runs: vec![run(1, "Release")],
            timings: HashMap::from([(
                1,
                timing(&[
                    (ComputeEnvironment::Ubuntu, 60_000),
                    (ComputeEnvironment::Windows, 60_000),
                    (ComputeEnvironment::Macos, 60_000),
                ]),
            )]),
            ..Default::default()
        };

        let result = analyze(&client, "org/repo", 5).await.unwrap();

        assert_close(result.workflows["Release"].minutes, 3.0);
        assert_close(result.total_cost, 0.008 + 0.016 + 0.08);
    }

    #[tokio::test]
    async fn test_job_cost_uses_classified_environment() {
        let client = FakeClient {
            runs: vec![run(1, "Matrix")],
            jobs: HashMap::from([(
                1,
                vec![
                    job(
                        "win",
                        "2024-01-01T00:00:00Z",
                        Some("2024-01-01T00:10:00Z"),
                        "windows-latest",
                    ),
                    job(
                        "mac",
                        "2024-01-01T00:00:00Z",
                        Some("2024-01-01T00:10:00Z"),
                        "macos-14",
                    ),
                ],
            )]),
            ..Default::default()
        };

        let result = analyze(&client, "org/repo", 5).await.unwrap();
        let jobs = &result.workflows["Matrix"].jobs;

        assert_close(jobs["win"].cost, 0.16);
        assert_close(jobs["mac"].cost, 0.8);
        // no timing data, so the workflow itself carries no cost
        assert_eq!(result.total_cost, 0.0);
    }

    #[tokio::test]
    async fn test_workflow_and_job_costs_are_independent() {
        let client = FakeClient {
            runs: vec![run(1, "CI")],
            timings: HashMap::from([(1, timing(&[(ComputeEnvironment::Ubuntu, 600_000)]))]),
            jobs: HashMap::from([(
                1,
                vec![job(
                    "build",
                    "2024-01-01T00:00:00Z",
                    Some("2024-01-01T00:05:00Z"),
                    "ubuntu-latest",
                )],
            )]),
            ..Default::default()
        };

        let result = analyze(&client, "org/repo", 5).await.unwrap();
        let wf = &result.workflows["CI"];

        assert_close(wf.cost, 0.08);
        assert_close(wf.jobs["build"].cost, 0.04);
    }

    #[tokio::test]
    async fn test_unfinished_and_malformed_jobs_count_zero_minutes() {
        let client = FakeClient {
            runs: vec![run(1, "CI")],
            jobs: HashMap::from([(
                1,
                vec![
                    job("running", "2024-01-01T00:00:00Z", None, "ubuntu-latest"),
                    job(
                        "garbled",
                        "not-a-time",
                        Some("2024-01-01T00:05:00Z"),
                        "ubuntu-latest",
                    ),
                    job(
                        "backwards",
                        "2024-01-01T00:05:00Z",
                        Some("2024-01-01T00:00:00Z"),
                        "ubuntu-latest",
                    ),
                ],
            )]),
            ..Default::default()
        };

        let result = analyze(&client, "org/repo", 5).await.unwrap();
        let jobs = &result.workflows["CI"].jobs;

        assert_eq!(jobs.len(), 3);
        for name in ["running", "garbled", "backwards"] {
            assert_eq!(jobs[name].count, 1);
            assert_eq!(jobs[name].minutes, 0.0);
            assert_eq!(jobs[name].cost, 0.0);
        }
    }

    #[tokio::test]
    async fn test_workflows_keep_first_seen_order() {
        let client = FakeClient {
            runs: vec![run(1, "Lint"), run(2, "Deploy"), run(3, "Lint")],
            ..Default::default()
        };

        let result = analyze(&client, "org/repo", 5).await.unwrap();
        let names: Vec<_> = result.workflows.keys().cloned().collect();

        assert_eq!(names, vec!["Lint", "Deploy"]);
        assert_eq!(result.workflows["Lint"].runs, 2);
    }

    #[tokio::test]
    async fn test_custom_rates_and_thresholds() {
        let analyzer = Analyzer::new(
            RateTable::from_base(1.0),
            Thresholds {
                max_avg_run_cost_usd: 5.0,
                ..Thresholds::default()
            },
        );
        let client = FakeClient {
            runs: vec![run(1, "Heavy")],
            timings: HashMap::from([(1, timing(&[(ComputeEnvironment::Ubuntu, 600_000)]))]),
            ..Default::default()
        };

        let result = analyzer.analyze(&client, "org/repo", 5).await.unwrap();

        assert_close(result.total_cost, 10.0);
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(
            result.recommendations[0].kind,
            crate::insights::RecommendationKind::ExpensiveWorkflow
        );
    }

    #[tokio::test]
    async fn test_analyze_through_trait_object() {
        let client = FakeClient {
            runs: vec![run(1, "CI")],
            ..Default::default()
        };
        let dyn_client: &dyn CiClient = &client;

        let result = analyze(dyn_client, "org/repo", 5).await.unwrap();

        assert_eq!(result.total_runs, 1);
    }
}
