use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the first customer's timings are filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FirstRecordPolicy {
    /// Customer 0 keeps all-zero start/end/wait/turnaround and the recurrence starts at 1.
    #[default]
    Literal,
    /// Customer 0 is served on arrival: start = arrival, end = start + service.
    Derived,
}

/// How the two exponential sequences are seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedMode {
    /// Both sequences come from a generator freshly seeded with `random_seed`.
    #[default]
    Reseed,
    /// Service times use a second seed derived from `random_seed`.
    Independent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub name: String,
    pub arrival_rate: f64,
    pub service_rate: f64,
    pub customer_count: usize,
    pub random_seed: u64,
    pub first_record: FirstRecordPolicy,
    pub seed_mode: SeedMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: "mm1".to_string(),
            arrival_rate: 2.0,
            service_rate: 3.0,
            customer_count: 1000,
            random_seed: 42,
            first_record: FirstRecordPolicy::Literal,
            seed_mode: SeedMode::Reseed,
        }
    }
}

impl SimulationConfig {
    pub fn new(arrival_rate: f64, service_rate: f64, customer_count: usize, random_seed: u64) -> Self {
        Self {
            arrival_rate,
            service_rate,
            customer_count,
            random_seed,
            ..Self::default()
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_rates(mut self, arrival_rate: f64, service_rate: f64) -> Self {
        self.arrival_rate = arrival_rate;
        self.service_rate = service_rate;
        self
    }

    pub fn with_customers(mut self, customer_count: usize) -> Self {
        self.customer_count = customer_count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_first_record(mut self, policy: FirstRecordPolicy) -> Self {
        self.first_record = policy;
        self
    }

    pub fn with_seed_mode(mut self, mode: SeedMode) -> Self {
        self.seed_mode = mode;
        self
    }

    /// Offered load λ/μ.
    pub fn offered_load(&self) -> f64 {
        self.arrival_rate / self.service_rate
    }

    pub fn validate(&self) -> Result<()> {
        check_rate("arrival_rate", self.arrival_rate)?;
        check_rate("service_rate", self.service_rate)?;
        if self.customer_count < 1 {
            return Err(SimError::invalid("customer_count", "must be at least 1"));
        }
        Ok(())
    }
}

pub(crate) fn check_rate(name: &'static str, rate: f64) -> Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(SimError::invalid(name, format!("must be a positive finite rate, got {}", rate)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_parameters() {
        let base = SimulationConfig::default();
        for cfg in [
            base.clone().with_rates(0.0, 3.0),
            base.clone().with_rates(2.0, -1.0),
            base.clone().with_rates(f64::NAN, 3.0),
            base.clone().with_rates(2.0, f64::INFINITY),
            base.clone().with_customers(0),
        ] {
            assert!(matches!(cfg.validate(), Err(SimError::InvalidParameter { .. })));
        }
    }

    #[test]
    fn offered_load_is_arrival_over_service() {
        assert_eq!(SimulationConfig::new(2.0, 4.0, 10, 0).offered_load(), 0.5);
        assert_eq!(SimulationConfig::new(10.0, 0.1, 10, 0).offered_load(), 100.0);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: SimulationConfig =
            serde_json::from_str(r#"{"arrival_rate": 5.0, "first_record": "derived"}"#).unwrap();
        assert_eq!(cfg.arrival_rate, 5.0);
        assert_eq!(cfg.service_rate, 3.0);
        assert_eq!(cfg.first_record, FirstRecordPolicy::Derived);
        assert_eq!(cfg.seed_mode, SeedMode::Reseed);
    }
}
