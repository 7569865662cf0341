// Arrival and service time generation

use crate::error::{Result, SimError};
use crate::simulation::config::{check_rate, SeedMode, SimulationConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};
use tracing::debug;

// Mixed into the seed for the service sequence in SeedMode::Independent
const SERVICE_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Exponential process with mean 1/rate, drawn from its own seeded generator.
#[derive(Debug, Clone)]
pub struct ExponentialProcess {
    dist: Exp<f64>,
    rng: StdRng,
}

impl ExponentialProcess {
    pub fn new(rate: f64, seed: u64) -> Result<Self> {
        check_rate("rate", rate)?;
        let dist = Exp::new(rate).map_err(|e| SimError::invalid("rate", e.to_string()))?;

        Ok(Self {
            dist,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn take(&mut self, count: usize) -> Vec<f64> {
        (&self.dist).sample_iter(&mut self.rng).take(count).collect()
    }
}

/// Draws `count` Exp(rate) values from a generator freshly seeded with `seed`.
pub fn generate(rate: f64, count: usize, seed: u64) -> Result<Vec<f64>> {
    if count < 1 {
        return Err(SimError::invalid("count", "must be at least 1"));
    }
    let mut process = ExponentialProcess::new(rate, seed)?;
    Ok(process.take(count))
}

/// Inter-arrival and service times for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSamples {
    pub inter_arrival_times: Vec<f64>,
    pub service_times: Vec<f64>,
}

impl ProcessSamples {
    pub fn generate(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;

        let n = config.customer_count;
        let service_seed = service_seed(config.random_seed, config.seed_mode);
        debug!(
            "Drawing {} customers (arrival seed {}, service seed {})",
            n, config.random_seed, service_seed
        );

        Ok(Self {
            inter_arrival_times: generate(config.arrival_rate, n, config.random_seed)?,
            service_times: generate(config.service_rate, n, service_seed)?,
        })
    }
}

fn service_seed(seed: u64, mode: SeedMode) -> u64 {
    match mode {
        SeedMode::Reseed => seed,
        SeedMode::Independent => (seed ^ SERVICE_SEED_SALT).rotate_left(17),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_is_close_to_inverse_rate() {
        let rate = 4.0;
        let samples = generate(rate, 20_000, 7).unwrap();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let expected = 1.0 / rate;

        assert!(
            (mean - expected).abs() < expected * 0.05,
            "Mean {:.4} too far from {:.4}",
            mean,
            expected
        );
        assert!(samples.iter().all(|x| *x >= 0.0));
    }

    #[test]
    fn same_seed_same_sequence() {
        assert_eq!(generate(2.0, 100, 42).unwrap(), generate(2.0, 100, 42).unwrap());
        assert_ne!(generate(2.0, 100, 42).unwrap(), generate(2.0, 100, 43).unwrap());
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(matches!(generate(0.0, 10, 1), Err(SimError::InvalidParameter { .. })));
        assert!(matches!(generate(-3.0, 10, 1), Err(SimError::InvalidParameter { .. })));
        assert!(matches!(generate(1.0, 0, 1), Err(SimError::InvalidParameter { .. })));
    }

    #[test]
    fn reseed_mode_scales_one_stream() {
        // Both sequences start from the same generator state, so they differ only by the rate
        let config = SimulationConfig::new(2.0, 3.0, 50, 9);
        let samples = ProcessSamples::generate(&config).unwrap();

        for (a, s) in samples.inter_arrival_times.iter().zip(&samples.service_times) {
            assert!((a * 2.0 - s * 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn independent_mode_decorrelates() {
        let config = SimulationConfig::new(2.0, 3.0, 50, 9).with_seed_mode(SeedMode::Independent);
        let samples = ProcessSamples::generate(&config).unwrap();

        let proportional = samples
            .inter_arrival_times
            .iter()
            .zip(&samples.service_times)
            .all(|(a, s)| (a * 2.0 - s * 3.0).abs() < 1e-12);
        assert!(!proportional);
        assert_eq!(samples.service_times.len(), 50);
    }
}
