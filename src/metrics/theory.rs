// Closed-form steady state of M/M/1, for comparing against the simulated trace.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteadyState {
    /// ρ = λ/μ
    pub rho: f64,
    /// Mean number in system
    pub l: f64,
    /// Mean number waiting
    pub lq: f64,
    /// Mean time in system
    pub w: f64,
    /// Mean time waiting
    pub wq: f64,
    /// Long-run departure rate, equal to λ when stable
    pub throughput: f64,
}

impl SteadyState {
    /// None unless both rates are positive and the queue is stable (ρ < 1).
    pub fn mm1(arrival_rate: f64, service_rate: f64) -> Option<Self> {
        if !(arrival_rate > 0.0 && service_rate > 0.0) {
            return None;
        }
        let rho = arrival_rate / service_rate;
        if rho >= 1.0 {
            return None;
        }

        let w = 1.0 / (service_rate - arrival_rate);
        let wq = rho / (service_rate - arrival_rate);
        Some(Self {
            rho,
            l: rho / (1.0 - rho),
            lq: rho * rho / (1.0 - rho),
            w,
            wq,
            throughput: arrival_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textbook_values() {
        let s = SteadyState::mm1(2.0, 3.0).unwrap();
        assert!((s.rho - 2.0 / 3.0).abs() < 1e-12);
        assert!((s.w - 1.0).abs() < 1e-12);
        assert!((s.wq - 2.0 / 3.0).abs() < 1e-12);
        assert!((s.l - 2.0).abs() < 1e-12);
        // Little's law
        assert!((s.l - 2.0 * s.w).abs() < 1e-12);
        assert!((s.lq - 2.0 * s.wq).abs() < 1e-12);
    }

    #[test]
    fn unstable_queue_has_no_steady_state() {
        assert!(SteadyState::mm1(3.0, 3.0).is_none());
        assert!(SteadyState::mm1(10.0, 0.1).is_none());
        assert!(SteadyState::mm1(0.0, 1.0).is_none());
    }
}
