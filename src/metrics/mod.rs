pub mod analyzer;
pub mod histogram;
pub mod logger;
pub mod theory;

pub use histogram::WaitHistogram;

use crate::simulation::trace::CustomerRecord;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueueMetrics {
    pub customers: usize,
    pub average_wait: f64,
    pub average_turnaround: f64,
    /// Busy fraction of [0, last end time]. None when the horizon is zero.
    pub utilization: Option<f64>,
    /// Customers per unit time over [0, last end time]. None when the horizon is zero.
    pub throughput: Option<f64>,
    pub horizon: f64,
    pub max_wait: f64,
}

impl QueueMetrics {
    pub fn from_records(records: &[CustomerRecord]) -> Self {
        let n = records.len();
        if n == 0 {
            return Self {
                customers: 0,
                average_wait: 0.0,
                average_turnaround: 0.0,
                utilization: None,
                throughput: None,
                horizon: 0.0,
                max_wait: 0.0,
            };
        }

        let count = n as f64;
        let total_wait: f64 = records.iter().map(|r| r.wait_time).sum();
        let total_turnaround: f64 = records.iter().map(|r| r.turnaround_time).sum();
        let total_service: f64 = records.iter().map(|r| r.service_time).sum();
        let max_wait = records.iter().map(|r| r.wait_time).fold(0.0, f64::max);

        // Last customer finishes last under FCFS
        let horizon = records[n - 1].end_time;
        let (utilization, throughput) = if horizon > 0.0 {
            (Some(total_service / horizon), Some(count / horizon))
        } else {
            warn!("Degenerate horizon: last customer ends at {}, utilization and throughput undefined", horizon);
            (None, None)
        };

        Self {
            customers: n,
            average_wait: total_wait / count,
            average_turnaround: total_turnaround / count,
            utilization,
            throughput,
            horizon,
            max_wait,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.utilization.is_none()
    }
}

/// Nearest-rank percentile of the wait times, `p` in [0, 100].
pub fn wait_percentile(records: &[CustomerRecord], p: f64) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let mut waits: Vec<f64> = records.iter().map(|r| r.wait_time).collect();
    waits.sort_by(|a, b| a.total_cmp(b));

    let rank = ((p.clamp(0.0, 100.0) / 100.0) * waits.len() as f64).ceil() as usize;
    Some(waits[rank.saturating_sub(1).min(waits.len() - 1)])
}
