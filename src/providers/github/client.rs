use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use url::Url;

use super::dto::{JobsPage, RunTimingDto, WorkflowRunsPage};
use crate::auth::Token;
use crate::error::{Result, RunCostError};
use crate::providers::{BillableTiming, CiClient, JobRecord, RunRecord};

const MAX_PER_PAGE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GitHubClient {
    client: Client,
    api_url: Url,
    repository: String,
    token: Option<Token>,
}

impl GitHubClient {
    pub fn new(base_url: &str, repository: &str, token: Option<Token>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = Client::builder()
            .user_agent(concat!("runcost/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RunCostError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Url::join drops the last path segment unless it ends with a slash
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let api_url = Url::parse(&normalized)
            .map_err(|e| RunCostError::Config(format!("Invalid API URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            repository: repository.to_string(),
            token,
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    fn actions_url(&self, repository: &str, path: &str) -> Result<Url> {
        self.api_url
            .join(&format!("repos/{repository}/actions/{path}"))
            .map_err(|e| RunCostError::Config(format!("Invalid actions URL: {e}")))
    }

    async fn fetch_runs_page(
        &self,
        repository: &str,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<RunRecord>> {
        let url = self.actions_url(repository, "runs")?;
        let request = self
            .client
            .get(url)
            .query(&[("per_page", per_page), ("page", page)]);

        let response = self.auth_request(request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RunCostError::Api(format!(
                "Failed to fetch workflow runs: {status} - {body}"
            )));
        }

        let page = response.json::<WorkflowRunsPage>().await?;
        Ok(page.workflow_runs.into_iter().map(RunRecord::from).collect())
    }

    async fn fetch_jobs_page(&self, run_id: u64, page: usize) -> Result<JobsPage> {
        let url = self.actions_url(&self.repository, &format!("runs/{run_id}/jobs"))?;
        let request = self
            .client
            .get(url)
            .query(&[("per_page", MAX_PER_PAGE), ("page", page)]);

        let response = self
            .auth_request(request)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<JobsPage>().await?)
    }
}

#[async_trait]
impl CiClient for GitHubClient {
    async fn runs(&self, repository: &str, limit: usize) -> Result<Vec<RunRecord>> {
        let per_page = limit.min(MAX_PER_PAGE);
        let mut all_runs = Vec::with_capacity(per_page);
        let mut page = 1;

        info!("Fetching up to {limit} workflow runs...");

        while all_runs.len() < limit {
            let runs = self.fetch_runs_page(repository, page, per_page).await?;

            if runs.is_empty() {
                info!("No more runs returned by API, stopping");
                break;
            }

            let fetched_count = runs.len();
            all_runs.extend(runs);

            info!(
                "Page {page}: fetched {fetched_count} runs (total: {})",
                all_runs.len()
            );

            page += 1;
        }

        all_runs.truncate(limit);
        Ok(all_runs)
    }

    async fn timing(&self, run_id: u64) -> Result<BillableTiming> {
        let url = self.actions_url(&self.repository, &format!("runs/{run_id}/timing"))?;
        let request = self.auth_request(self.client.get(url));

        let response = request.send().await?.error_for_status()?;
        let timing = response.json::<RunTimingDto>().await?;
        Ok(BillableTiming::from(timing))
    }

    async fn jobs(&self, run_id: u64) -> Result<Vec<JobRecord>> {
        let mut all_jobs = Vec::new();
        let mut page = 1;

        loop {
            let jobs_page = self.fetch_jobs_page(run_id, page).await?;

            if jobs_page.jobs.is_empty() {
                break;
            }

            all_jobs.extend(jobs_page.jobs.into_iter().map(JobRecord::from));

            if all_jobs.len() >= jobs_page.total_count {
                break;
            }

            page += 1;
        }

        debug!("Run {run_id}: fetched {} jobs", all_jobs.len());
        Ok(all_jobs)
    }
}
