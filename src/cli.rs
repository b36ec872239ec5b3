use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::path::PathBuf;

use crate::auth::Token;
use crate::cost::{Analyzer, RateTable, Thresholds};
use crate::insights::AnalysisResult;
use crate::providers::github::GitHubClient;
use crate::report;
use crate::validate::{validate_repo, validate_token};

#[derive(Parser)]
#[command(name = "runcost")]
#[command(author, version, about = "CI cost analyzer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate GitHub Actions costs for a repository
    Github {
        /// GitHub API token
        #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Repository in owner/name form
        #[arg(short, long)]
        repo: String,

        /// Number of workflow runs to analyze
        #[arg(short, long, default_value_t = 50)]
        limit: usize,

        /// GitHub API base URL
        #[arg(long, default_value = "https://api.github.com", hide = true)]
        api_url: String,

        /// Per-minute Ubuntu rate in USD; Windows and macOS scale from it
        #[arg(long, default_value_t = 0.008)]
        ubuntu_rate: f64,

        /// Average cost per run (USD) above which a workflow is flagged
        #[arg(long, default_value_t = 1.0)]
        max_run_cost: f64,

        /// Average job duration (minutes) above which a job is flagged
        #[arg(long, default_value_t = 15.0)]
        max_job_minutes: f64,

        /// Run count within the analyzed window above which a workflow is flagged
        #[arg(long, default_value_t = 30)]
        max_runs: usize,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Github {
                token,
                repo,
                limit,
                api_url,
                ubuntu_rate,
                max_run_cost,
                max_job_minutes,
                max_runs,
            } => {
                let token = Token::from(validate_token(token.as_deref())?.as_str());
                let repo = validate_repo(repo)?;

                info!("Analyzing {repo} (last {limit} runs)");
                info!("Using token {}", token.masked());

                let client = GitHubClient::new(api_url, repo, Some(token))?;
                let analyzer = Analyzer::new(
                    RateTable::from_base(*ubuntu_rate),
                    Thresholds {
                        max_avg_run_cost_usd: *max_run_cost,
                        max_avg_job_minutes: *max_job_minutes,
                        max_runs: *max_runs,
                    },
                );
                let result = analyzer.analyze(&client, repo, *limit).await?;

                self.write(&result)
            }
        }
    }

    fn write(&self, result: &AnalysisResult) -> Result<()> {
        let rendered = match self.format {
            Format::Json if self.pretty => serde_json::to_string_pretty(result)?,
            Format::Json => serde_json::to_string(result)?,
            Format::Text => report::render_text(result),
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, rendered)?;
            info!("Report written to: {}", output_path.display());
        } else {
            println!("{rendered}");
        }

        Ok(())
    }
}
