use std::cmp::Ordering;
use std::fmt::Write;

use crate::insights::{AnalysisResult, Recommendation};

const WIDTH: usize = 52;

fn by_cost_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Renders the console report: totals, per-workflow breakdown sorted by cost,
/// then recommendations.
pub fn render_text(result: &AnalysisResult) -> String {
    let heavy = "=".repeat(WIDTH);
    let light = "-".repeat(WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "  RunCost Report - {}", result.repository);
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "  Total runs analyzed: {}", result.total_runs);
    let _ = writeln!(out, "  Total billable minutes: {:.1}", result.total_minutes);
    let _ = writeln!(out, "  Total estimated cost: ${:.2}", result.total_cost);
    let _ = writeln!(out, "{light}");
    let _ = writeln!(out, "  Cost Breakdown by Workflow");
    write_workflows(&mut out, result);
    let _ = writeln!(out, "{light}");
    let _ = writeln!(out, "  Optimization Recommendations");
    write_recommendations(&mut out, &result.recommendations);
    let _ = writeln!(out, "{heavy}");

    out
}

fn write_workflows(out: &mut String, result: &AnalysisResult) {
    if result.workflows.is_empty() {
        let _ = writeln!(out, "  (no workflow data)");
        return;
    }

    let mut workflows: Vec<_> = result.workflows.iter().collect();
    workflows.sort_by(|a, b| by_cost_desc(a.1.cost, b.1.cost));

    for (name, wf) in workflows {
        let _ = writeln!(out, "\n  {name}");
        let _ = writeln!(
            out,
            "     Runs: {}  |  Minutes: {:.1}  |  Cost: ${:.2}",
            wf.runs, wf.minutes, wf.cost
        );

        let mut jobs: Vec<_> = wf.jobs.iter().collect();
        jobs.sort_by(|a, b| by_cost_desc(a.1.cost, b.1.cost));

        for (job_name, job) in jobs {
            let _ = writeln!(
                out,
                "       - {job_name}: {} runs, {:.1}min, ${:.2}",
                job.count, job.minutes, job.cost
            );
        }
    }
}

fn write_recommendations(out: &mut String, recs: &[Recommendation]) {
    if recs.is_empty() {
        let _ = writeln!(out, "  No optimization issues found");
        return;
    }

    for rec in recs {
        let label = match &rec.job {
            Some(job) => format!("{} / {job}", rec.workflow),
            None => rec.workflow.clone(),
        };
        let _ = writeln!(out, "  [{}] {label}", rec.kind.as_str());
        let _ = writeln!(out, "     {}", rec.fix);
    }
}
