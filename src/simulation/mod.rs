pub mod config;
pub mod trace;

pub use config::{FirstRecordPolicy, SeedMode, SimulationConfig};
pub use trace::{CustomerRecord, TraceSimulator};

use crate::error::Result;
use crate::metrics::histogram::{WaitHistogram, DEFAULT_BINS};
use crate::metrics::logger::TraceLogger;
use crate::metrics::{analyzer, QueueMetrics};
use crate::process::ProcessSamples;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Number of customers shown on the service timeline.
pub const TIMELINE_LIMIT: usize = 100;

pub struct Simulation {
    config: SimulationConfig,
    cancel: CancellationToken,
    parallel: bool,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            parallel: false,
        }
    }

    /// Use the chunked parallel scan for the trace.
    pub fn with_parallel_trace(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Cancelling this token from another thread stops an in-progress run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn run(&self) -> Result<SimulationResult> {
        self.config.validate()?;

        info!(
            "Starting simulation: {} (λ={}, μ={}, n={}, seed={})",
            self.config.name,
            self.config.arrival_rate,
            self.config.service_rate,
            self.config.customer_count,
            self.config.random_seed
        );
        debug!("First record: {:?}, seeding: {:?}", self.config.first_record, self.config.seed_mode);

        let samples = ProcessSamples::generate(&self.config)?;

        let tracer = TraceSimulator::new(self.config.first_record).with_cancellation(self.cancel.clone());
        let records = if self.parallel {
            tracer.run_parallel(&samples.inter_arrival_times, &samples.service_times)?
        } else {
            tracer.run(&samples.inter_arrival_times, &samples.service_times)?
        };

        let metrics = QueueMetrics::from_records(&records);
        info!(
            "Simulation complete: avg wait {:.4}, avg turnaround {:.4}",
            metrics.average_wait, metrics.average_turnaround
        );

        Ok(SimulationResult {
            config: self.config.clone(),
            records,
            metrics,
        })
    }
}

/// Shorthand for `Simulation::new(config).run()`.
pub fn run(config: SimulationConfig) -> Result<SimulationResult> {
    Simulation::new(config).run()
}

// Names come from user config, keep them to a single path component
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "run".to_string() } else { stem }
}

/// One point of the service timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub start_time: f64,
    pub end_time: f64,
    pub arrival_time: f64,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub config: SimulationConfig,
    pub records: Vec<CustomerRecord>,
    pub metrics: QueueMetrics,
}

#[derive(Debug, Clone)]
pub struct SavedResults {
    pub trace_csv: PathBuf,
    pub analysis_json: PathBuf,
}

impl SimulationResult {
    pub fn average_wait(&self) -> f64 {
        self.metrics.average_wait
    }

    pub fn average_turnaround(&self) -> f64 {
        self.metrics.average_turnaround
    }

    pub fn utilization(&self) -> Option<f64> {
        self.metrics.utilization
    }

    pub fn throughput(&self) -> Option<f64> {
        self.metrics.throughput
    }

    pub fn wait_times(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.wait_time).collect()
    }

    /// First `min(TIMELINE_LIMIT, n)` customers.
    pub fn timeline(&self) -> Vec<TimelineEntry> {
        self.records
            .iter()
            .take(TIMELINE_LIMIT)
            .map(|r| TimelineEntry {
                start_time: r.start_time,
                end_time: r.end_time,
                arrival_time: r.arrival_time,
                index: r.index,
            })
            .collect()
    }

    pub fn wait_histogram(&self) -> Result<WaitHistogram> {
        self.wait_histogram_with_bins(DEFAULT_BINS)
    }

    pub fn wait_histogram_with_bins(&self, bins: usize) -> Result<WaitHistogram> {
        WaitHistogram::from_values(&self.wait_times(), bins)
    }

    /// Writes the per-customer CSV and the JSON analysis into `dir`.
    pub fn save_results(&self, dir: impl AsRef<Path>) -> Result<SavedResults> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let stem = format!("{}_seed{}_{}", file_stem(&self.config.name), self.config.random_seed, timestamp);

        let trace_csv = dir.join(format!("{}.csv", stem));
        let mut logger = TraceLogger::new(&trace_csv)?;
        logger.log_batch(&self.records)?;
        info!("Trace saved to: {}", trace_csv.display());

        let analysis_json = dir.join(format!("{}_analysis.json", stem));
        let report = analyzer::analyze(self);
        std::fs::write(&analysis_json, serde_json::to_string_pretty(&report)?)?;
        info!("Analysis saved to: {}", analysis_json.display());

        Ok(SavedResults { trace_csv, analysis_json })
    }
}
