//! Signed linear sketch with median-of-lines decoding.
//!
//! Each of the `l` lines hashes every tracked key slot into one of `b`
//! buckets and multiplies its weight by a random sign. A key's estimate is
//! the median, across lines, of its signed bucket lookups.
//!
//! Buckets are drawn with replacement, so two key slots of the same line may
//! share a bucket and interfere. The median hides interference as long as a
//! majority of a key's lines are collision-free.

use crate::{
    config::{SketchConfig, WeightProfile},
    error::{ConfigError, SketchError},
    table::{median, CounterTable},
};
use rand::Rng;

/// Per-key true weights.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightVector(Vec<i64>);

impl WeightVector {
    /// The synthetic validation vector for `config`: keys 0 and 1 are marked
    /// keys, the rest are long-tail decoys.
    ///
    /// Weights are truncated multiples of `sqrt(tail_size / b)`.
    pub fn generate(config: &SketchConfig, tail_size: u64, profile: &WeightProfile) -> Self {
        let tail_sd = (tail_size as f64 / config.width as f64).sqrt();
        let mk_weight = (tail_sd * profile.mk_factor) as i64;
        let lk_weight = (tail_sd * profile.lk_factor) as i64;
        let weights = (0..config.keys)
            .map(|key| if key < 2 { mk_weight } else { lk_weight })
            .collect();
        Self(weights)
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<i64>> for WeightVector {
    fn from(src: Vec<i64>) -> Self {
        Self(src)
    }
}

/// Per-key point estimates produced by [`Sketch::decode`].
#[derive(Clone, Debug, PartialEq)]
pub struct EstimateVector(Vec<f64>);

impl EstimateVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of `|estimate - weight|` over all keys.
    pub fn total_abs_error(&self, weights: &WeightVector) -> f64 {
        self.0
            .iter()
            .zip(weights.as_slice())
            .map(|(estimate, &weight)| (estimate - weight as f64).abs())
            .sum()
    }
}

/// A drawn sketch: one bucket and one sign per (line, key slot).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sketch {
    config: SketchConfig,
    buckets: Vec<usize>,
    signs: Vec<i8>,
}

impl Sketch {
    /// Draw a fresh uniformly random assignment for `config`.
    ///
    /// Only positive dimensions are required; `k > b` is accepted and simply
    /// guarantees collisions.
    pub fn draw<R: Rng + ?Sized>(config: &SketchConfig, rng: &mut R) -> Result<Self, ConfigError> {
        config.ensure_drawable()?;
        let slots = config.depth * config.keys;
        let mut sketch = Self {
            config: *config,
            buckets: vec![0; slots],
            signs: vec![1; slots],
        };
        sketch.redraw(rng);
        Ok(sketch)
    }

    /// Replace the assignment with a new uniformly random one.
    pub fn redraw<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let width = self.config.width;
        for bucket in self.buckets.iter_mut() {
            *bucket = rng.gen_range(0..width);
        }
        for sign in self.signs.iter_mut() {
            *sign = if rng.gen::<bool>() { 1 } else { -1 };
        }
    }

    /// Build a sketch from an explicit assignment, one inner vector per line.
    pub fn from_parts(
        config: SketchConfig,
        buckets: Vec<Vec<usize>>,
        signs: Vec<Vec<i8>>,
    ) -> Result<Self, SketchError> {
        config.ensure_drawable()?;
        let bucket_lines: Vec<usize> = buckets.iter().map(Vec::len).collect();
        let sign_lines: Vec<usize> = signs.iter().map(Vec::len).collect();
        for lines in [bucket_lines, sign_lines] {
            if lines.len() != config.depth || lines.iter().any(|&keys| keys != config.keys) {
                return Err(SketchError::AssignmentShape {
                    expected_lines: config.depth,
                    expected_keys: config.keys,
                    lines: lines.len(),
                    keys: lines.first().copied().unwrap_or(0),
                });
            }
        }
        for (line, line_buckets) in buckets.iter().enumerate() {
            if let Some(&bucket) = line_buckets.iter().find(|&&b| b >= config.width) {
                return Err(SketchError::BucketOutOfRange {
                    line,
                    bucket,
                    width: config.width,
                });
            }
        }
        for (line, line_signs) in signs.iter().enumerate() {
            if let Some(&sign) = line_signs.iter().find(|&&s| s != 1 && s != -1) {
                return Err(SketchError::InvalidSign { line, sign });
            }
        }
        Ok(Self {
            config,
            buckets: buckets.into_iter().flatten().collect(),
            signs: signs.into_iter().flatten().collect(),
        })
    }

    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    #[inline]
    pub fn bucket(&self, line: usize, key: usize) -> usize {
        self.buckets[line * self.config.keys + key]
    }

    #[inline]
    pub fn sign(&self, line: usize, key: usize) -> i64 {
        self.signs[line * self.config.keys + key] as i64
    }

    /// Whether any line hashes two key slots into the same bucket.
    pub fn has_collisions(&self) -> bool {
        let mut seen = vec![usize::MAX; self.config.width];
        for line in 0..self.config.depth {
            for key in 0..self.config.keys {
                let bucket = self.bucket(line, key);
                if seen[bucket] == line {
                    return true;
                }
                seen[bucket] = line;
            }
        }
        false
    }

    /// Add `sign * weight` of every key slot into its bucket, line by line.
    pub fn encode(&self, weights: &WeightVector) -> Result<CounterTable<i64>, SketchError> {
        if weights.len() != self.config.keys {
            return Err(SketchError::WeightLength {
                expected: self.config.keys,
                got: weights.len(),
            });
        }
        let mut counters = CounterTable::zeros(self.config.depth, self.config.width);
        for line in 0..self.config.depth {
            for (key, &weight) in weights.as_slice().iter().enumerate() {
                counters.add(line, self.bucket(line, key), weight * self.sign(line, key));
            }
        }
        Ok(counters)
    }

    /// Estimate every key as the median of its weak estimates across lines.
    pub fn decode(&self, counters: &CounterTable<i64>) -> Result<EstimateVector, SketchError> {
        let (lines, columns) = counters.shape();
        if lines != self.config.depth || columns != self.config.width {
            return Err(SketchError::TableShape {
                expected_lines: self.config.depth,
                expected_columns: self.config.width,
                lines,
                columns,
            });
        }
        let mut weak = vec![0f64; self.config.depth];
        let estimates = (0..self.config.keys)
            .map(|key| {
                for (line, slot) in weak.iter_mut().enumerate() {
                    *slot = (counters.get(line, self.bucket(line, key)) * self.sign(line, key)) as f64;
                }
                median(&mut weak)
            })
            .collect();
        Ok(EstimateVector(estimates))
    }
}
