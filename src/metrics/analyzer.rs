use super::theory::SteadyState;
use super::wait_percentile;
use crate::error::Result;
use crate::simulation::SimulationResult;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub name: String,
    pub arrival_rate: f64,
    pub service_rate: f64,
    pub customers: usize,
    pub runs: usize,
    pub average_wait: f64,
    pub average_turnaround: f64,
    pub utilization: Option<f64>,
    pub throughput: Option<f64>,
    pub max_wait: f64,
    pub p95_wait: f64,
    pub theory: Option<SteadyState>,
}

pub fn analyze(result: &SimulationResult) -> AnalysisReport {
    let config = &result.config;
    let metrics = &result.metrics;

    AnalysisReport {
        name: config.name.clone(),
        arrival_rate: config.arrival_rate,
        service_rate: config.service_rate,
        customers: metrics.customers,
        runs: 1,
        average_wait: metrics.average_wait,
        average_turnaround: metrics.average_turnaround,
        utilization: metrics.utilization,
        throughput: metrics.throughput,
        max_wait: metrics.max_wait,
        p95_wait: wait_percentile(&result.records, 95.0).unwrap_or(0.0),
        theory: SteadyState::mm1(config.arrival_rate, config.service_rate),
    }
}

/// Mean of each field across repeated runs of the same configuration.
pub fn average_reports(reports: &[AnalysisReport]) -> Option<AnalysisReport> {
    let first = reports.first()?;
    let n = reports.len() as f64;
    let mean = |f: fn(&AnalysisReport) -> f64| reports.iter().map(f).sum::<f64>() / n;

    Some(AnalysisReport {
        name: first.name.clone(),
        arrival_rate: first.arrival_rate,
        service_rate: first.service_rate,
        customers: first.customers,
        runs: reports.iter().map(|r| r.runs).sum(),
        average_wait: mean(|r| r.average_wait),
        average_turnaround: mean(|r| r.average_turnaround),
        utilization: mean_present(reports.iter().map(|r| r.utilization)),
        throughput: mean_present(reports.iter().map(|r| r.throughput)),
        max_wait: reports.iter().map(|r| r.max_wait).fold(0.0, f64::max),
        p95_wait: mean(|r| r.p95_wait),
        theory: first.theory,
    })
}

// Degenerate runs are left out rather than poisoning the mean
fn mean_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values.flatten().fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn export_latex_table(reports: &[AnalysisReport], path: impl AsRef<Path>) -> Result<()> {
    let mut out = String::new();
    // writeln! into a String cannot fail
    let _ = writeln!(out, "\\begin{{table}}[h]");
    let _ = writeln!(out, "\\centering");
    let _ = writeln!(out, "\\begin{{tabular}}{{lrrrrrrr}}");
    let _ = writeln!(out, "\\hline");
    let _ = writeln!(
        out,
        "Run & $\\lambda$ & $\\mu$ & $\\bar{{W_q}}$ & $W_q$ (theory) & $\\bar{{W}}$ & $\\rho$ & Throughput \\\\"
    );
    let _ = writeln!(out, "\\hline");
    for r in reports {
        let _ = writeln!(
            out,
            "{} & {:.2} & {:.2} & {:.4} & {} & {:.4} & {} & {} \\\\",
            latex_escape(&r.name),
            r.arrival_rate,
            r.service_rate,
            r.average_wait,
            fmt_opt(r.theory.map(|t| t.wq)),
            r.average_turnaround,
            fmt_opt(r.utilization),
            fmt_opt(r.throughput),
        );
    }
    let _ = writeln!(out, "\\hline");
    let _ = writeln!(out, "\\end{{tabular}}");
    let _ = writeln!(out, "\\caption{{M/M/1 simulation results}}");
    let _ = writeln!(out, "\\end{{table}}");

    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, out)?;
    Ok(())
}

pub fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "--".to_string(),
    }
}

fn latex_escape(s: &str) -> String {
    s.replace('\\', "\\textbackslash{}").replace('_', "\\_").replace('&', "\\&").replace('%', "\\%")
}
