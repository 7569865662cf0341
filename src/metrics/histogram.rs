use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BINS: usize = 30;

/// Equal-width histogram over [lo, hi]; the last bin is closed on the right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitHistogram {
    pub lo: f64,
    pub hi: f64,
    pub counts: Vec<usize>,
}

impl WaitHistogram {
    pub fn from_values(values: &[f64], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(SimError::invalid("bins", "must be at least 1"));
        }
        if values.is_empty() {
            return Err(SimError::invalid("values", "cannot bin an empty sequence"));
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // A single distinct value gets a unit-wide range centred on it
        let (lo, hi) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };

        let width = (hi - lo) / bins as f64;
        let mut counts = vec![0; bins];
        for v in values {
            let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(Self { lo, hi, counts })
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.counts.len() as f64
    }

    /// (left edge, right edge, count) per bin.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        let width = self.bin_width();
        self.counts
            .iter()
            .enumerate()
            .map(move |(i, &c)| (self.lo + i as f64 * width, self.lo + (i + 1) as f64 * width, c))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}
