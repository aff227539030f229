//! Errors produced while configuring and running sketch attack simulations.

use displaydoc::Display;
use std::{io::Error as IoError, result::Result as StdResult};

/// A convenience wrapper for a [std::result::Result] carrying a
/// [SweepError].
pub type Result<T> = StdResult<T, SweepError>;

/// Invalid simulation parameters, reported before any sampling happens.
#[derive(Clone, Debug, Display, PartialEq)]
pub enum ConfigError {
    /// Sketch width must be positive
    ZeroWidth,
    /// Sketch depth must be positive
    ZeroDepth,
    /// Key count must be positive
    ZeroKeys,
    /// Width-to-key ratio must be positive
    ZeroKeyRatio,
    /// Width {width} with width-to-key ratio {ratio} leaves no keys per line
    NoKeys { width: usize, ratio: usize },
    /// Key count {keys} exceeds sketch width {width}
    KeysExceedWidth { keys: usize, width: usize },
    /// Tail size must be positive
    EmptyTail,
    /// At least two tracked columns are required, got {0}
    TooFewColumns(usize),
    /// BNR target must be positive and finite, got {0}
    InvalidTarget(f64),
    /// Repetition count must be positive
    NoRepetitions,
    /// No sketch widths to sweep
    NoWidths,
    /// No BNR targets to sweep
    NoTargets,
    /// Round bound must be positive when set
    ZeroRoundBound,
    /// Weight factor {name} must be positive and finite, got {value}
    InvalidWeightFactor { name: &'static str, value: f64 },
    /// Validation weights truncate to zero at width {width}
    VanishingWeights { width: usize },
    /// Tail occupancy distribution: {0}
    TailDistribution(String),
    /// Could not read configuration file {path}: {reason}
    Read { path: String, reason: String },
    /// Could not parse configuration: {0}
    Parse(String),
}

impl std::error::Error for ConfigError {}

/// Mismatch between a sketch and the data handed to it.
#[derive(Clone, Debug, Display, PartialEq)]
pub enum SketchError {
    /// Weight vector has {got} entries, sketch tracks {expected} keys
    WeightLength { expected: usize, got: usize },
    /// Counter table is {lines}x{columns}, sketch expects {expected_lines}x{expected_columns}
    TableShape {
        expected_lines: usize,
        expected_columns: usize,
        lines: usize,
        columns: usize,
    },
    /// Assignment has {lines} lines of {keys} keys, geometry needs {expected_lines}x{expected_keys}
    AssignmentShape {
        expected_lines: usize,
        expected_keys: usize,
        lines: usize,
        keys: usize,
    },
    /// Bucket {bucket} on line {line} is outside width {width}
    BucketOutOfRange {
        line: usize,
        bucket: usize,
        width: usize,
    },
    /// Sign {sign} on line {line} is not +1 or -1
    InvalidSign { line: usize, sign: i8 },
    /// Sketch configuration: {0}
    Config(ConfigError),
}

impl std::error::Error for SketchError {}

impl From<ConfigError> for SketchError {
    fn from(src: ConfigError) -> Self {
        Self::Config(src)
    }
}

/// Failure of a single attack simulation.
#[derive(Clone, Debug, Display, PartialEq)]
pub enum AttackError {
    /// Attack did not converge within {rounds} rounds (bias key 0 = {key_0_bias}, key 1 = {key_1_bias})
    NonConvergence {
        rounds: u64,
        key_0_bias: f64,
        key_1_bias: f64,
    },
    /// Attack configuration: {0}
    Config(ConfigError),
}

impl std::error::Error for AttackError {}

impl From<ConfigError> for AttackError {
    fn from(src: ConfigError) -> Self {
        Self::Config(src)
    }
}

/// Failure persisting a results table.
#[derive(Debug, Display)]
pub enum OutputError {
    /// Could not create results directory {path}: {source}
    CreateDir { path: String, source: IoError },
    /// Could not write results table {path}: {source}
    Write { path: String, source: IoError },
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } | Self::Write { source, .. } => Some(source),
        }
    }
}

/// An enumeration of errors which can abort a parameter sweep.
#[derive(Debug, Display)]
pub enum SweepError {
    /// Invalid configuration: {0}
    Config(ConfigError),
    /// Sketch parameters sanity check failed for l = {depth}, b = {width}, k = {keys}
    ValidationFailed {
        width: usize,
        depth: usize,
        keys: usize,
    },
    /// Attack simulation failed: {0}
    Attack(AttackError),
    /// Results output failed: {0}
    Output(OutputError),
}

impl std::error::Error for SweepError {}

impl From<ConfigError> for SweepError {
    fn from(src: ConfigError) -> Self {
        Self::Config(src)
    }
}

impl From<AttackError> for SweepError {
    fn from(src: AttackError) -> Self {
        match src {
            AttackError::Config(err) => Self::Config(err),
            other => Self::Attack(other),
        }
    }
}

impl From<OutputError> for SweepError {
    fn from(src: OutputError) -> Self {
        Self::Output(src)
    }
}
