//! Simulation parameters.
//!
//! Every simulation entry point takes its parameters as an immutable value
//! from this module. [`SweepConfig`] is the top-level description of an
//! experiment and can also be loaded from TOML.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};

/// Default sketch depth (`l`).
pub const DEFAULT_DEPTH: usize = 100;

/// Default number of background items hashed alongside the tracked keys.
pub const DEFAULT_TAIL_SIZE: u64 = 1000;

/// Default width-to-key ratio (`b / k`).
pub const DEFAULT_KEY_RATIO: usize = 3;

/// Default number of tracked columns: two marked keys and one decoy.
pub const DEFAULT_TRACKED_COLUMNS: usize = 3;

/// Default number of round-trip checks before a width is simulated.
pub const DEFAULT_VALIDATION_CHECKS: usize = 10;

/// Geometry of a signed sketch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SketchConfig {
    /// Counters per line (`b`).
    pub width: usize,
    /// Number of independently hashed lines (`l`).
    pub depth: usize,
    /// Active keys per line (`k`).
    pub keys: usize,
}

impl SketchConfig {
    /// A geometry with explicit dimensions. No checks are performed; call
    /// [`SketchConfig::validate`] before relying on it.
    pub fn new(width: usize, depth: usize, keys: usize) -> Self {
        Self { width, depth, keys }
    }

    /// Derive the key count as `width / ratio` and validate the result.
    pub fn from_ratio(width: usize, depth: usize, ratio: usize) -> Result<Self, ConfigError> {
        if ratio == 0 {
            return Err(ConfigError::ZeroKeyRatio);
        }
        let keys = width / ratio;
        if width > 0 && keys == 0 {
            return Err(ConfigError::NoKeys { width, ratio });
        }
        let config = Self::new(width, depth, keys);
        config.validate()?;
        Ok(config)
    }

    /// Check `0 < k <= b` and `l > 0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ensure_drawable()?;
        if self.keys > self.width {
            return Err(ConfigError::KeysExceedWidth {
                keys: self.keys,
                width: self.width,
            });
        }
        Ok(())
    }

    /// Check only that every dimension is positive, which is all a random
    /// draw needs. Geometries with `k > b` pass this check.
    pub fn ensure_drawable(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::ZeroWidth);
        }
        if self.depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.keys == 0 {
            return Err(ConfigError::ZeroKeys);
        }
        Ok(())
    }
}

/// Scale factors for the synthetic weight vector used by the validator.
///
/// Weights are multiples of the tail standard deviation `sqrt(tail / b)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightProfile {
    /// Multiplier for the two marked keys.
    pub mk_factor: f64,
    /// Multiplier for the long-tail decoys.
    pub lk_factor: f64,
}

impl Default for WeightProfile {
    fn default() -> Self {
        Self {
            mk_factor: 10.0,
            lk_factor: 20.0,
        }
    }
}

impl WeightProfile {
    /// Both factors must be positive and finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("mk_factor", self.mk_factor), ("lk_factor", self.lk_factor)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidWeightFactor { name, value });
            }
        }
        Ok(())
    }

    /// Whether every validation weight at width `width` stays nonzero after
    /// truncation. An all-zero vector decodes exactly under any collision.
    pub fn resolves_at(&self, width: usize, tail_size: u64) -> bool {
        let tail_sd = (tail_size as f64 / width as f64).sqrt();
        (tail_sd * self.mk_factor) as i64 != 0 && (tail_sd * self.lk_factor) as i64 != 0
    }
}

/// When the attacker considers the bias signal recovered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopRule {
    /// Stop once both marked keys individually reach the target.
    #[default]
    BothKeys,
    /// Stop as soon as either marked key reaches the target.
    EitherKey,
}

impl StopRule {
    /// Whether the biases satisfy this rule for `target`.
    pub fn is_satisfied(self, key_0_bias: f64, key_1_bias: f64, target: f64) -> bool {
        let key_0 = key_0_bias.abs() >= target;
        let key_1 = key_1_bias.abs() >= target;
        match self {
            StopRule::BothKeys => key_0 && key_1,
            StopRule::EitherKey => key_0 || key_1,
        }
    }
}

impl fmt::Display for StopRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopRule::BothKeys => write!(f, "both-keys"),
            StopRule::EitherKey => write!(f, "either-key"),
        }
    }
}

/// Parameters of one median attack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackConfig {
    /// Bias-to-noise ratio the attacker waits for.
    pub target_bnr: f64,
    /// Tracked columns per line: two marked keys followed by decoys.
    pub columns: usize,
    /// Give up after this many query rounds. `None` runs until the stop rule
    /// is met.
    pub max_rounds: Option<u64>,
    pub stop_rule: StopRule,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            target_bnr: 1.0,
            columns: DEFAULT_TRACKED_COLUMNS,
            max_rounds: None,
            stop_rule: StopRule::default(),
        }
    }
}

impl AttackConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_target(self.target_bnr)?;
        if self.columns < 2 {
            return Err(ConfigError::TooFewColumns(self.columns));
        }
        if self.max_rounds == Some(0) {
            return Err(ConfigError::ZeroRoundBound);
        }
        Ok(())
    }
}

fn validate_target(target: f64) -> Result<(), ConfigError> {
    if target.is_finite() && target > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidTarget(target))
    }
}

/// Full description of a width × BNR parameter sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Attacks per (width, BNR) pair.
    pub repetitions: usize,
    /// BNR targets to sweep.
    pub bnr_targets: Vec<f64>,
    /// Tracked columns per line (two marked keys plus decoys).
    pub tracked_columns: usize,
    /// Number of background items.
    pub tail_size: u64,
    /// Sketch depth (`l`).
    pub depth: usize,
    /// Sketch widths (`b`) to sweep.
    pub widths: Vec<usize>,
    /// Width-to-key ratio used to derive `k`.
    pub key_ratio: usize,
    /// Master seed. A random seed is drawn and logged when unset.
    pub seed: Option<u64>,
    /// Optional per-attack round bound.
    pub max_rounds: Option<u64>,
    /// Round-trip checks per width before simulating it.
    pub validation_checks: usize,
    pub weights: WeightProfile,
    pub stop_rule: StopRule,
    /// Prefix of the per-width result tables.
    pub file_prefix: String,
    /// Run trials of one width on the rayon thread pool.
    pub parallel: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            repetitions: 5,
            bnr_targets: vec![1.0, 2.0],
            tracked_columns: DEFAULT_TRACKED_COLUMNS,
            tail_size: DEFAULT_TAIL_SIZE,
            depth: DEFAULT_DEPTH,
            widths: vec![30, 60],
            key_ratio: DEFAULT_KEY_RATIO,
            seed: None,
            max_rounds: None,
            validation_checks: DEFAULT_VALIDATION_CHECKS,
            weights: WeightProfile::default(),
            stop_rule: StopRule::default(),
            file_prefix: "sim_3".to_string(),
            parallel: false,
        }
    }
}

impl SweepConfig {
    /// Parse a configuration from TOML. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SweepConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate every parameter, including each width's derived geometry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repetitions == 0 {
            return Err(ConfigError::NoRepetitions);
        }
        if self.widths.is_empty() {
            return Err(ConfigError::NoWidths);
        }
        if self.bnr_targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        if self.tail_size == 0 {
            return Err(ConfigError::EmptyTail);
        }
        self.weights.validate()?;
        for &width in &self.widths {
            SketchConfig::from_ratio(width, self.depth, self.key_ratio)?;
            if !self.weights.resolves_at(width, self.tail_size) {
                return Err(ConfigError::VanishingWeights { width });
            }
        }
        for &target in &self.bnr_targets {
            self.attack_config(target).validate()?;
        }
        Ok(())
    }

    /// Sketch geometry for one swept width.
    pub fn sketch_config(&self, width: usize) -> Result<SketchConfig, ConfigError> {
        SketchConfig::from_ratio(width, self.depth, self.key_ratio)
    }

    /// Attack parameters for one swept BNR target.
    pub fn attack_config(&self, target_bnr: f64) -> AttackConfig {
        AttackConfig {
            target_bnr,
            columns: self.tracked_columns,
            max_rounds: self.max_rounds,
            stop_rule: self.stop_rule,
        }
    }

    /// Total attacks the sweep will run.
    pub fn total_trials(&self) -> u64 {
        (self.repetitions * self.widths.len() * self.bnr_targets.len()) as u64
    }

    /// The two width sweeps of the reference experiment: 40 repetitions at
    /// BNR 1 and 20 repetitions at BNR 2, widths 30 through 300.
    pub fn reference_experiments() -> [SweepConfig; 2] {
        let widths: Vec<usize> = (1..=10).map(|i| i * 30).collect();
        [
            SweepConfig {
                repetitions: 40,
                bnr_targets: vec![1.0],
                widths: widths.clone(),
                file_prefix: "sim_3_run_bnr_1".to_string(),
                ..Default::default()
            },
            SweepConfig {
                repetitions: 20,
                bnr_targets: vec![2.0],
                widths,
                file_prefix: "sim_3_run_bnr_2".to_string(),
                ..Default::default()
            },
        ]
    }
}

impl fmt::Display for SweepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sweeping b values. Test parameters:")?;
        writeln!(f, "  repetitions       = {}", self.repetitions)?;
        writeln!(f, "  simulated keys    = {}", self.tracked_columns)?;
        writeln!(f, "  attack tail size  = {}", self.tail_size)?;
        writeln!(f, "  ell               = {}", self.depth)?;
        writeln!(f, "  b/k               = {}", self.key_ratio)?;
        writeln!(f, "  b values          = {:?}", self.widths)?;
        writeln!(f, "  BNR values        = {:?}", self.bnr_targets)?;
        writeln!(f, "  stop rule         = {}", self.stop_rule)?;
        match self.max_rounds {
            Some(max) => writeln!(f, "  max rounds        = {max}")?,
            None => writeln!(f, "  max rounds        = unbounded")?,
        }
        match self.seed {
            Some(seed) => write!(f, "  seed              = {seed}"),
            None => write!(f, "  seed              = random"),
        }
    }
}
