//! Monte Carlo simulation of adaptive median attacks on signed sketches.
//!
//! A signed linear sketch (`l` lines of `b` counters, `k` tracked keys per
//! line) answers point queries with the median of each key's signed bucket
//! values. An attacker who repeatedly observes the sketch's answers under
//! fresh background noise can keep only the rounds in which one marked key's
//! median beats another's, steering the medians apart. This crate measures how
//! many query rounds that takes.
//!
//! ## Pipeline
//!
//! | Stage     | Module       | Output                                   |
//! |-----------|--------------|------------------------------------------|
//! | Geometry  | [`config`]   | `b`, `l`, `k` from width and `b / k`     |
//! | Validate  | [`validate`] | pass iff the sketch recovers weights     |
//! | Noise     | [`noise`]    | per-round tail contributions             |
//! | Attack    | [`attack`]   | rounds until the target BNR is reached   |
//! | Sweep     | [`sweep`]    | round counts over widths × BNR × reps    |
//! | Output    | [`output`]   | one CSV table per width                  |
//!
//! ## Key Concepts
//!
//! - **Tail**: untracked items hashed into the same counters as the tracked
//!   keys. Each bucket holds about `tail / b` of them.
//! - **BNR**: bias-to-noise ratio, the median drift of a marked key divided by
//!   the expected noise of the rounds collected so far.
//! - **Win round**: the round index at which the attack's stop rule fires.

pub mod attack;
pub mod config;
pub mod error;
pub mod noise;
pub mod output;
pub mod results;
pub mod sketch;
pub mod sweep;
pub mod table;
pub mod validate;

pub use attack::{simulate_median_attack, AttackOutcome, AttackPhase, MedianAttack};
pub use config::{AttackConfig, SketchConfig, StopRule, SweepConfig, WeightProfile};
pub use error::{AttackError, ConfigError, OutputError, Result, SketchError, SweepError};
pub use noise::TailModel;
pub use output::{CsvSink, MemorySink, ResultsSink};
pub use results::{format_sweep_report, ResultsTable, RoundStats, WidthTable};
pub use sketch::{EstimateVector, Sketch, WeightVector};
pub use sweep::{run_sweep, NoProgress, SweepProgress, SweepResults};
pub use table::{median, Counter, CounterTable};
pub use validate::{check_parameters, round_trip_error};
