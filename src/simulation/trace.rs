// FCFS single-server trace: arrivals by cumulative sum, then the
// start = max(arrival, previous end) recurrence, one customer at a time.

use super::config::FirstRecordPolicy;
use crate::error::{Result, SimError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Customers processed between two cancellation checks.
pub const CANCEL_CHECK_INTERVAL: usize = 4096;

const MIN_PARALLEL_CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub index: usize,
    pub inter_arrival_time: f64,
    pub service_time: f64,
    pub arrival_time: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub wait_time: f64,
    pub turnaround_time: f64,
}

impl CustomerRecord {
    /// Serve a customer once the server frees up at `server_free_at`.
    fn serve(index: usize, inter_arrival_time: f64, service_time: f64, arrival_time: f64, server_free_at: f64) -> Self {
        let start_time = arrival_time.max(server_free_at);
        let end_time = start_time + service_time;

        Self {
            index,
            inter_arrival_time,
            service_time,
            arrival_time,
            start_time,
            end_time,
            wait_time: start_time - arrival_time,
            turnaround_time: end_time - arrival_time,
        }
    }

    fn first(policy: FirstRecordPolicy, inter_arrival_time: f64, service_time: f64, arrival_time: f64) -> Self {
        match policy {
            FirstRecordPolicy::Literal => Self {
                index: 0,
                inter_arrival_time,
                service_time,
                arrival_time,
                start_time: 0.0,
                end_time: 0.0,
                wait_time: 0.0,
                turnaround_time: 0.0,
            },
            // Built directly so turnaround is exactly the service time
            FirstRecordPolicy::Derived => Self {
                index: 0,
                inter_arrival_time,
                service_time,
                arrival_time,
                start_time: arrival_time,
                end_time: arrival_time + service_time,
                wait_time: 0.0,
                turnaround_time: service_time,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TraceSimulator {
    policy: FirstRecordPolicy,
    cancel: Option<CancellationToken>,
}

impl TraceSimulator {
    pub fn new(policy: FirstRecordPolicy) -> Self {
        Self { policy, cancel: None }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn run(&self, inter_arrival_times: &[f64], service_times: &[f64]) -> Result<Vec<CustomerRecord>> {
        validate_sequences(inter_arrival_times, service_times)?;

        let n = inter_arrival_times.len();
        let arrivals = arrival_times(inter_arrival_times);
        let first = CustomerRecord::first(self.policy, inter_arrival_times[0], service_times[0], arrivals[0]);

        let mut records = Vec::with_capacity(n);
        records.push(first);

        (1..n).try_fold(first.end_time, |server_free_at, i| {
            if i % CANCEL_CHECK_INTERVAL == 0 {
                self.checkpoint(i, n)?;
            }
            let record = CustomerRecord::serve(i, inter_arrival_times[i], service_times[i], arrivals[i], server_free_at);
            records.push(record);
            Ok::<_, SimError>(record.end_time)
        })?;

        debug!("Traced {} customers", n);
        Ok(records)
    }

    /// Same trace as [`run`](Self::run), computed as a chunked max-plus scan.
    ///
    /// Chunk boundaries are resolved by composing each chunk's recurrence, which
    /// reassociates the additions: results agree with the sequential fold up to
    /// floating point rounding, not bit for bit.
    pub fn run_parallel(&self, inter_arrival_times: &[f64], service_times: &[f64]) -> Result<Vec<CustomerRecord>> {
        validate_sequences(inter_arrival_times, service_times)?;

        let n = inter_arrival_times.len();
        let arrivals = arrival_times(inter_arrival_times);
        let first = CustomerRecord::first(self.policy, inter_arrival_times[0], service_times[0], arrivals[0]);

        let chunk = (n / (rayon::current_num_threads() * 4)).max(MIN_PARALLEL_CHUNK);
        let ranges: Vec<Range<usize>> = (1..n).step_by(chunk).map(|s| s..(s + chunk).min(n)).collect();

        let summaries: Vec<MaxPlus> = ranges
            .par_iter()
            .map(|r| {
                r.clone()
                    .map(|i| MaxPlus::customer(arrivals[i], service_times[i]))
                    .fold(MaxPlus::IDENTITY, MaxPlus::then)
            })
            .collect();

        // Server-free time entering each chunk
        let mut entries = Vec::with_capacity(ranges.len());
        summaries.iter().fold(first.end_time, |free_at, summary| {
            entries.push(free_at);
            summary.apply(free_at)
        });

        self.checkpoint(0, n)?;

        let chunks: Vec<Vec<CustomerRecord>> = ranges
            .par_iter()
            .zip(entries.par_iter())
            .map(|(r, &entry)| {
                let mut out = Vec::with_capacity(r.len());
                r.clone().fold(entry, |free_at, i| {
                    let record = CustomerRecord::serve(i, inter_arrival_times[i], service_times[i], arrivals[i], free_at);
                    out.push(record);
                    record.end_time
                });
                out
            })
            .collect();

        let mut records = Vec::with_capacity(n);
        records.push(first);
        for chunk in chunks {
            records.extend(chunk);
        }

        debug!("Traced {} customers across {} chunks", n, ranges.len());
        Ok(records)
    }

    fn checkpoint(&self, completed: usize, total: usize) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(SimError::Cancelled { completed, total }),
            _ => Ok(()),
        }
    }
}

/// Runs the sequential trace with the given first-record policy.
pub fn simulate(inter_arrival_times: &[f64], service_times: &[f64], policy: FirstRecordPolicy) -> Result<Vec<CustomerRecord>> {
    TraceSimulator::new(policy).run(inter_arrival_times, service_times)
}

/// Strict cumulative sum: arrival[0] = inter_arrival[0].
pub fn arrival_times(inter_arrival_times: &[f64]) -> Vec<f64> {
    inter_arrival_times
        .iter()
        .scan(0.0, |acc, dt| {
            *acc += dt;
            Some(*acc)
        })
        .collect()
}

fn validate_sequences(inter_arrival_times: &[f64], service_times: &[f64]) -> Result<()> {
    if inter_arrival_times.is_empty() {
        return Err(SimError::invalid("inter_arrival_times", "at least one customer is required"));
    }
    if inter_arrival_times.len() != service_times.len() {
        return Err(SimError::invalid(
            "service_times",
            format!(
                "length {} does not match {} inter-arrival times",
                service_times.len(),
                inter_arrival_times.len()
            ),
        ));
    }
    if let Some(bad) = inter_arrival_times.iter().find(|x| !x.is_finite() || **x < 0.0) {
        return Err(SimError::invalid("inter_arrival_times", format!("negative or non-finite value {}", bad)));
    }
    if let Some(bad) = service_times.iter().find(|x| !x.is_finite() || **x < 0.0) {
        return Err(SimError::invalid("service_times", format!("negative or non-finite value {}", bad)));
    }
    Ok(())
}

/// x -> max(x + shift, floor), closed under composition.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MaxPlus {
    shift: f64,
    floor: f64,
}

impl MaxPlus {
    const IDENTITY: Self = Self { shift: 0.0, floor: f64::NEG_INFINITY };

    // end = max(free_at, arrival) + service
    fn customer(arrival: f64, service: f64) -> Self {
        Self { shift: service, floor: arrival + service }
    }

    fn apply(self, x: f64) -> f64 {
        (x + self.shift).max(self.floor)
    }

    /// `self` followed by `next`.
    fn then(self, next: Self) -> Self {
        Self {
            shift: self.shift + next.shift,
            floor: (self.floor + next.shift).max(next.floor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hand_computed_trace() {
        let inter = [1.0, 1.0, 3.0, 0.5];
        let service = [2.0, 2.0, 1.0, 1.0];
        let records = simulate(&inter, &service, FirstRecordPolicy::Derived).unwrap();

        let arrivals: Vec<f64> = records.iter().map(|r| r.arrival_time).collect();
        assert_eq!(arrivals, vec![1.0, 2.0, 5.0, 5.5]);

        // Customer 1 waits for customer 0 to finish at t=3
        assert_eq!(records[1].start_time, 3.0);
        assert_eq!(records[1].wait_time, 1.0);
        assert_eq!(records[1].turnaround_time, 3.0);
        // Customer 2 arrives exactly as the server frees up
        assert_eq!(records[2].start_time, 5.0);
        assert_eq!(records[2].wait_time, 0.0);
        assert_eq!(records[3].start_time, 6.0);
        assert_eq!(records[3].end_time, 7.0);
    }

    #[test]
    fn literal_policy_zeroes_first_customer() {
        let inter = [1.0, 1.0];
        let service = [2.0, 2.0];
        let records = simulate(&inter, &service, FirstRecordPolicy::Literal).unwrap();

        let first = records[0];
        assert_eq!(first.arrival_time, 1.0);
        assert_eq!((first.start_time, first.end_time, first.wait_time, first.turnaround_time), (0.0, 0.0, 0.0, 0.0));
        // The server looks free at t=0, so customer 1 starts on arrival
        assert_eq!(records[1].start_time, 2.0);
        assert_eq!(records[1].end_time, 4.0);
    }

    #[test]
    fn derived_first_customer_turnaround_is_its_service_time() {
        // arrival + service - arrival rounds away from service for these values
        let records = simulate(&[2.667192903020361], &[4.762509648113682], FirstRecordPolicy::Derived).unwrap();
        let first = records[0];

        assert_eq!(first.start_time, first.arrival_time);
        assert_eq!(first.wait_time, 0.0);
        assert_eq!(first.turnaround_time, 4.762509648113682);
        assert_eq!(first.end_time, 2.667192903020361 + 4.762509648113682);
    }

    #[test]
    fn rejects_mismatched_or_empty_input() {
        assert!(simulate(&[], &[], FirstRecordPolicy::Literal).is_err());
        assert!(simulate(&[1.0, 2.0], &[1.0], FirstRecordPolicy::Literal).is_err());
        assert!(simulate(&[1.0, -2.0], &[1.0, 1.0], FirstRecordPolicy::Literal).is_err());
        assert!(simulate(&[1.0], &[f64::NAN], FirstRecordPolicy::Literal).is_err());
    }

    #[test]
    fn cancelled_token_stops_large_runs() {
        let n = CANCEL_CHECK_INTERVAL * 2;
        let inter = vec![1.0; n];
        let service = vec![0.5; n];

        let token = CancellationToken::new();
        token.cancel();
        let sim = TraceSimulator::new(FirstRecordPolicy::Literal).with_cancellation(token);

        match sim.run(&inter, &service) {
            Err(SimError::Cancelled { completed, total }) => {
                assert_eq!(completed, CANCEL_CHECK_INTERVAL);
                assert_eq!(total, n);
            }
            other => panic!("expected cancellation, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn small_runs_finish_before_first_checkpoint() {
        let token = CancellationToken::new();
        token.cancel();
        let sim = TraceSimulator::new(FirstRecordPolicy::Literal).with_cancellation(token);
        assert_eq!(sim.run(&[1.0; 10], &[1.0; 10]).unwrap().len(), 10);
    }

    #[test]
    fn max_plus_composition_matches_stepping() {
        let a = MaxPlus::customer(1.0, 2.0);
        let b = MaxPlus::customer(2.5, 0.5);
        for x in [0.0, 1.0, 4.0, 10.0] {
            assert_eq!(a.then(b).apply(x), b.apply(a.apply(x)));
        }
        assert_eq!(MaxPlus::IDENTITY.apply(3.0), 3.0);
    }

    #[test]
    fn parallel_scan_agrees_with_fold() {
        let n = 10_000;
        let inter: Vec<f64> = (0..n).map(|i| ((i * 7919) % 13) as f64 * 0.1).collect();
        let service: Vec<f64> = (0..n).map(|i| ((i * 104_729) % 11) as f64 * 0.1).collect();

        for policy in [FirstRecordPolicy::Literal, FirstRecordPolicy::Derived] {
            let sim = TraceSimulator::new(policy);
            let seq = sim.run(&inter, &service).unwrap();
            let par = sim.run_parallel(&inter, &service).unwrap();

            assert_eq!(seq.len(), par.len());
            for (s, p) in seq.iter().zip(&par) {
                assert_eq!(s.index, p.index);
                assert!((s.end_time - p.end_time).abs() <= 1e-9 * s.end_time.max(1.0));
                assert!((s.wait_time - p.wait_time).abs() <= 1e-9 * s.end_time.max(1.0));
            }
        }
    }
}
