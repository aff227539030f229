//! Tail contribution model.
//!
//! Untracked background ("tail") items land in a tracked key's bucket with
//! probability `1/b` each. A bucket holding `n` of them carries the sum of `n`
//! random-sign unit contributions, approximated here by `sqrt(n) * N(0, 1)`.

use crate::{error::ConfigError, table::CounterTable};
use rand::Rng;
use rand_distr::{Binomial, Distribution, StandardNormal};

/// Generator of per-round tail noise for one sketch width.
#[derive(Clone, Debug)]
pub struct TailModel {
    width: usize,
    tail_size: u64,
    occupancy: Binomial,
}

impl TailModel {
    pub fn new(width: usize, tail_size: u64) -> Result<Self, ConfigError> {
        if width == 0 {
            return Err(ConfigError::ZeroWidth);
        }
        if tail_size == 0 {
            return Err(ConfigError::EmptyTail);
        }
        let occupancy = Binomial::new(tail_size, 1.0 / width as f64)
            .map_err(|e| ConfigError::TailDistribution(e.to_string()))?;
        Ok(Self {
            width,
            tail_size,
            occupancy,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn tail_size(&self) -> u64 {
        self.tail_size
    }

    /// Standard deviation of one bucket's contribution, `sqrt(tail_size / b)`.
    pub fn noise_sd(&self) -> f64 {
        (self.tail_size as f64 / self.width as f64).sqrt()
    }

    /// One bucket's contribution: occupancy first, then the signed magnitude.
    pub fn sample_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let occupied = self.occupancy.sample(rng);
        let magnitude: f64 = StandardNormal.sample(rng);
        (occupied as f64).sqrt() * magnitude
    }

    /// A fresh `depth x columns` contribution matrix.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        depth: usize,
        columns: usize,
        rng: &mut R,
    ) -> CounterTable<f64> {
        let mut table = CounterTable::zeros(depth, columns);
        self.sample_into(&mut table, rng);
        table
    }

    /// Overwrite every cell of `table` with an independent draw, line by line.
    pub fn sample_into<R: Rng + ?Sized>(&self, table: &mut CounterTable<f64>, rng: &mut R) {
        for line in 0..table.lines() {
            for column in 0..table.columns() {
                table.set(line, column, self.sample_cell(rng));
            }
        }
    }
}
