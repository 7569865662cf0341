// Single-server FCFS queue simulator. Draws exponential arrivals and services,
// traces every customer through the queue and reports wait, turnaround,
// utilization and throughput next to the M/M/1 closed form.

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use mm1sim::prelude::*;
use mm1sim::metrics::analyzer::{self, AnalysisReport};

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};

// Rows of the timeline echoed to the terminal, the rest goes to the CSV
const TIMELINE_PREVIEW: usize = 10;
const HISTOGRAM_BAR_WIDTH: usize = 40;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[arg(short = 'a', long, default_value_t = 2.0)]
        arrival_rate: f64,
        #[arg(short = 'm', long, default_value_t = 3.0)]
        service_rate: f64,
        #[arg(short = 'n', long, default_value_t = 1000)]
        customers: usize,
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value = "literal")]
        first_record: String,
        #[arg(long)]
        independent_seeds: bool,
        #[arg(long)]
        parallel: bool,
        #[arg(short, long, default_value_t = 30)]
        bins: usize,
        /// JSON config file, overrides the rate/customer/seed flags
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory for the trace CSV and analysis JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    Compare {
        #[arg(short = 'a', long, default_value_t = 2.0)]
        arrival_rate: f64,
        #[arg(short = 'm', long, default_value = "2.5,3.0,4.0,5.0")]
        service_rates: String,
        #[arg(short = 'n', long, default_value_t = 1000)]
        customers: usize,
        #[arg(short, long, default_value_t = 10)]
        repetitions: u64,
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value = "literal")]
        first_record: String,
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
        #[arg(long)]
        latex: bool,
    },

    Analyze {
        #[arg(default_value = "results")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let program_start = Instant::now();

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            arrival_rate,
            service_rate,
            customers,
            seed,
            first_record,
            independent_seeds,
            parallel,
            bins,
            config,
            output,
        } => {
            let config = match config {
                Some(path) => SimulationConfig::from_json_file(&path)?,
                None => SimulationConfig::new(arrival_rate, service_rate, customers, seed)
                    .with_first_record(parse_first_record(&first_record)?)
                    .with_seed_mode(if independent_seeds { SeedMode::Independent } else { SeedMode::Reseed }),
            };
            run_single_simulation(config, parallel, bins, output)?;
        }

        Commands::Compare {
            arrival_rate,
            service_rates,
            customers,
            repetitions,
            seed,
            first_record,
            output,
            latex,
        } => {
            let rates = parse_rates(&service_rates)?;
            let base = SimulationConfig::new(arrival_rate, 1.0, customers, seed)
                .with_first_record(parse_first_record(&first_record)?);
            compare_service_rates(base, &rates, repetitions, &output, latex)?;
        }

        Commands::Analyze { path } => {
            analyze_results(&path)?;
        }
    }

    info!("Total runtime: {:.2}s", program_start.elapsed().as_secs_f64());

    Ok(())
}

fn run_single_simulation(
    config: SimulationConfig,
    parallel: bool,
    bins: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    info!("mm1sim: Single Run");

    let result = Simulation::new(config).with_parallel_trace(parallel).run()?;
    let metrics = &result.metrics;

    println!("\n=== Performance Metrics ===");
    println!("Average Waiting Time:    {:.4} units", metrics.average_wait);
    println!("Average Turnaround Time: {:.4} units", metrics.average_turnaround);
    println!("System Utilization (ρ):  {}", analyzer::fmt_opt(metrics.utilization));
    println!("Throughput:              {} jobs/unit time", analyzer::fmt_opt(metrics.throughput));
    if metrics.is_degenerate() {
        println!("(last customer ends at t=0, utilization and throughput are undefined)");
    }

    println!("Offered Load (λ/μ):      {:.4}", result.config.offered_load());

    match SteadyState::mm1(result.config.arrival_rate, result.config.service_rate) {
        Some(theory) => {
            println!("\n=== M/M/1 Steady State ===");
            println!("ρ = λ/μ:                 {:.4}", theory.rho);
            println!("Wq (mean wait):          {:.4}", theory.wq);
            println!("W (mean turnaround):     {:.4}", theory.w);
            println!("Lq / L:                  {:.4} / {:.4}", theory.lq, theory.l);
        }
        None => println!("\nλ ≥ μ: the queue has no steady state and grows without bound"),
    }

    let timeline = result.timeline();
    println!("\n=== Service Timeline (first {} customers) ===", timeline.len());
    println!("{:>6} {:>12} {:>12} {:>12}", "index", "arrival", "start", "end");
    for entry in timeline.iter().take(TIMELINE_PREVIEW) {
        println!(
            "{:>6} {:>12.4} {:>12.4} {:>12.4}",
            entry.index, entry.arrival_time, entry.start_time, entry.end_time
        );
    }
    if timeline.len() > TIMELINE_PREVIEW {
        println!("{:>6}", "...");
    }

    print_histogram(&result.wait_histogram_with_bins(bins)?);

    if let Some(dir) = output {
        let saved = result.save_results(&dir)?;
        println!("\nTrace:    {}", saved.trace_csv.display());
        println!("Analysis: {}", saved.analysis_json.display());
    }

    Ok(())
}

fn compare_service_rates(
    base: SimulationConfig,
    rates: &[f64],
    repetitions: u64,
    output: &Path,
    export_latex: bool,
) -> Result<()> {
    if repetitions == 0 {
        anyhow::bail!("Need at least one repetition");
    }

    info!("mm1sim: Comparison");
    info!("Arrival rate: {}", base.arrival_rate);
    info!("Service rates: {:?}", rates);
    info!(
        "Repetitions: {} (seeds {}..{})",
        repetitions,
        base.random_seed,
        repetition_seed(base.random_seed, repetitions)
    );

    let pb = ProgressBar::new(rates.len() as u64 * repetitions);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.orange/yellow} {pos}/{len} runs {msg}")?
            .progress_chars("█▓░"),
    );

    let mut all_reports = Vec::new();

    for &rate in rates {
        pb.set_message(format!("μ = {}", rate));

        let reports: Vec<AnalysisReport> = (0..repetitions)
            .into_par_iter()
            .map(|rep| {
                let config = base
                    .clone()
                    .with_name(format!("mu_{}", rate))
                    .with_rates(base.arrival_rate, rate)
                    .with_seed(repetition_seed(base.random_seed, rep));
                let result = Simulation::new(config).run();
                pb.inc(1);
                result.map(|r| analyzer::analyze(&r))
            })
            .collect::<mm1sim::Result<_>>()?;

        if let Some(avg) = analyzer::average_reports(&reports) {
            all_reports.push(avg);
        }
    }

    pb.finish_with_message("Comparison complete");

    comparison_table(&all_reports);

    std::fs::create_dir_all(output)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let comparison_path = output.join(format!("comparison_{}.json", timestamp));
    std::fs::write(&comparison_path, serde_json::to_string_pretty(&all_reports)?)?;
    info!("Comparison saved to: {}", comparison_path.display());

    if export_latex {
        let latex_path = output.join(format!("comparison_{}_table.tex", timestamp));
        analyzer::export_latex_table(&all_reports, &latex_path)?;
        info!("LaTeX table exported to: {}", latex_path.display());
        info!("   \\input{{{}}}", latex_path.display());
    }

    Ok(())
}

fn analyze_results(path: &Path) -> Result<()> {
    use std::fs;

    info!("Analyzing results in: {}", path.display());

    let mut reports = Vec::new();
    for entry in fs::read_dir(path)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }

        let Some(kind) = path.file_name().and_then(|s| s.to_str()).and_then(report_kind) else {
            continue;
        };

        let content = fs::read_to_string(&path)?;
        match kind {
            ReportKind::Comparison => reports.extend(serde_json::from_str::<Vec<AnalysisReport>>(&content)?),
            ReportKind::Analysis => reports.push(serde_json::from_str::<AnalysisReport>(&content)?),
        }
    }

    if reports.is_empty() {
        info!("No analysis files found.");
        return Ok(());
    }

    comparison_table(&reports);

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ReportKind {
    Comparison,
    Analysis,
}

// Run names may contain anything, so only the fixed prefix/suffix we write decide the type
fn report_kind(file_name: &str) -> Option<ReportKind> {
    if file_name.ends_with("_analysis.json") {
        Some(ReportKind::Analysis)
    } else if file_name.starts_with("comparison_") && file_name.ends_with(".json") {
        Some(ReportKind::Comparison)
    } else {
        None
    }
}

// Seeds wrap so a sweep starting near u64::MAX still runs
fn repetition_seed(base: u64, rep: u64) -> u64 {
    base.wrapping_add(rep)
}

fn parse_first_record(name: &str) -> Result<FirstRecordPolicy> {
    match name.to_lowercase().as_str() {
        "literal" => Ok(FirstRecordPolicy::Literal),
        "derived" => Ok(FirstRecordPolicy::Derived),
        _ => anyhow::bail!("Unknown first-record policy: {}. Use: literal or derived", name),
    }
}

fn parse_rates(list: &str) -> Result<Vec<f64>> {
    let rates = list
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().map_err(|e| anyhow::anyhow!("Bad rate '{}': {}", s, e)))
        .collect::<Result<Vec<_>>>()?;

    if rates.is_empty() {
        anyhow::bail!("No service rates given");
    }
    Ok(rates)
}

fn print_histogram(hist: &WaitHistogram) {
    println!("\n=== Histogram of Waiting Times ({} bins) ===", hist.bins());

    let peak = hist.counts.iter().copied().max().unwrap_or(0).max(1);
    for (lo, hi, count) in hist.iter() {
        let bar = "█".repeat(count * HISTOGRAM_BAR_WIDTH / peak);
        println!("[{:>9.3}, {:>9.3}) {:>6} {}", lo, hi, count, bar);
    }
}

fn comparison_table(reports: &[AnalysisReport]) {
    println!("\n╔════════════════╦════════╦════════╦═══════════╦═══════════╦═══════════╦═══════════╦════════════╗");
    println!("║ Run            ║ λ      ║ μ      ║ Avg Wait  ║ Wq theory ║ Avg Turn. ║ Util. (ρ) ║ Throughput ║");
    println!("╠════════════════╬════════╬════════╬═══════════╬═══════════╬═══════════╬═══════════╬════════════╣");

    for report in reports {
        println!(
            "║ {:<14} ║ {:>6.2} ║ {:>6.2} ║ {:>9.4} ║ {:>9} ║ {:>9.4} ║ {:>9} ║ {:>10} ║",
            report.name,
            report.arrival_rate,
            report.service_rate,
            report.average_wait,
            analyzer::fmt_opt(report.theory.map(|t| t.wq)),
            report.average_turnaround,
            analyzer::fmt_opt(report.utilization),
            analyzer::fmt_opt(report.throughput),
        );
    }

    println!("╚════════════════╩════════╩════════╩═══════════╩═══════════╩═══════════╩═══════════╩════════════╝\n");

    if let Some(best) = reports.iter().min_by(|a, b| a.average_wait.total_cmp(&b.average_wait)) {
        println!("Lowest Wait: {} ({:.4})", best.name, best.average_wait);
    }

    let runs: usize = reports.iter().map(|r| r.runs).sum();
    println!("Runs aggregated: {}", runs);
    println!();
}
