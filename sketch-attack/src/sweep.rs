//! Width × BNR parameter sweep.
//!
//! Every (width, target, repetition) trial draws its randomness from its own
//! ChaCha stream keyed by the sweep seed and the trial's position in the grid,
//! so a sweep produces the same table whether its trials run serially or on
//! the rayon pool.

use crate::{
    attack::{simulate_median_attack, AttackOutcome},
    config::{SketchConfig, SweepConfig},
    error::{Result, SweepError},
    noise::TailModel,
    output::ResultsSink,
    results::{format_sweep_report, ResultsTable, RoundStats},
    sketch::Sketch,
    validate::check_parameters,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, error, info, trace};

/// Stream id space reserved for the per-width validation runs.
const VALIDATION_STREAM: u64 = 1 << 63;

/// Observer of sweep progress. All methods default to no-ops.
pub trait SweepProgress: Sync {
    fn width_started(&self, _width: usize, _trials: u64) {}
    fn trial_finished(&self, _width: usize, _outcome: &AttackOutcome) {}
    fn width_finished(&self, _width: usize) {}
}

/// Progress observer that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl SweepProgress for NoProgress {}

/// Generator for stream `stream` of the sweep seeded with `seed`.
pub fn stream_rng(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Stream of one trial, numbered in row-major (width, target, repetition)
/// order.
pub fn trial_stream(
    config: &SweepConfig,
    width_idx: usize,
    target_idx: usize,
    repetition: usize,
) -> u64 {
    ((width_idx * config.bnr_targets.len() + target_idx) * config.repetitions + repetition) as u64
}

/// Stream used to validate the geometry of width index `width_idx`.
pub fn validation_stream(width_idx: usize) -> u64 {
    VALIDATION_STREAM | width_idx as u64
}

/// Round counts of a completed sweep.
#[derive(Clone, Debug)]
pub struct SweepResults {
    /// Seed the sweep actually ran with.
    pub seed: u64,
    pub config: SweepConfig,
    pub table: ResultsTable,
}

impl SweepResults {
    /// Round statistics for every (width, target) cell, widths outermost.
    pub fn summary(&self) -> Vec<RoundStats> {
        let mut stats = Vec::new();
        for (width_idx, &width) in self.config.widths.iter().enumerate() {
            let slice = self.table.width_slice(width_idx, width);
            for (target_idx, &target) in self.config.bnr_targets.iter().enumerate() {
                if let Some(cell) = RoundStats::from_rounds(width, target, &slice.column(target_idx))
                {
                    stats.push(cell);
                }
            }
        }
        stats
    }

    pub fn report(&self) -> String {
        format_sweep_report(&self.summary())
    }
}

/// Run one trial: draw a fresh sketch, then attack it.
fn run_trial(
    config: &SweepConfig,
    sketch_config: &SketchConfig,
    tail: &TailModel,
    seed: u64,
    (width_idx, target_idx, repetition): (usize, usize, usize),
) -> Result<AttackOutcome> {
    let mut rng = stream_rng(seed, trial_stream(config, width_idx, target_idx, repetition));
    // The attack only sees tail noise, but every trial still places its keys
    // afresh.
    let sketch = Sketch::draw(sketch_config, &mut rng)?;
    trace!(
        width = sketch_config.width,
        repetition,
        collisions = sketch.has_collisions(),
        "drew trial sketch"
    );

    let attack_config = config.attack_config(config.bnr_targets[target_idx]);
    Ok(simulate_median_attack(
        &attack_config,
        tail,
        sketch_config.depth,
        &mut rng,
    )?)
}

/// Run every trial of `config`, handing each width's table to `sink` as soon
/// as it completes.
///
/// A width whose geometry fails validation aborts the sweep, and so does an
/// attack that exhausts `max_rounds`. Either way the tables of the widths
/// before it have already been written, while the finished trials of the
/// aborted width are discarded.
pub fn run_sweep(
    config: &SweepConfig,
    sink: &mut dyn ResultsSink,
    progress: &dyn SweepProgress,
) -> Result<SweepResults> {
    config.validate()?;
    let seed = match config.seed {
        Some(seed) => seed,
        None => {
            let seed = rand::thread_rng().gen();
            info!("no seed given, drew seed {}", seed);
            seed
        }
    };
    info!("{}", config);

    let repetitions = config.repetitions;
    let targets = config.bnr_targets.len();
    let mut table = ResultsTable::new(repetitions, config.widths.len(), targets);

    for (width_idx, &width) in config.widths.iter().enumerate() {
        let sketch_config = config.sketch_config(width)?;
        let tail = TailModel::new(width, config.tail_size)?;

        let mut rng = stream_rng(seed, validation_stream(width_idx));
        if !check_parameters(
            &sketch_config,
            config.tail_size,
            &config.weights,
            config.validation_checks,
            &mut rng,
        ) {
            error!(
                "Sketch parameters sanity check failed for l = {}, b = {}, k = {}",
                sketch_config.depth, sketch_config.width, sketch_config.keys
            );
            return Err(SweepError::ValidationFailed {
                width,
                depth: sketch_config.depth,
                keys: sketch_config.keys,
            });
        }

        let trials: Vec<(usize, usize, usize)> = (0..targets)
            .flat_map(|target_idx| (0..repetitions).map(move |rep| (width_idx, target_idx, rep)))
            .collect();
        progress.width_started(width, trials.len() as u64);

        let trial = |&position: &(usize, usize, usize)| -> Result<_> {
            let outcome = run_trial(config, &sketch_config, &tail, seed, position)?;
            progress.trial_finished(width, &outcome);
            Ok((position, outcome))
        };
        let outcomes: Vec<((usize, usize, usize), AttackOutcome)> = if config.parallel {
            trials.par_iter().map(trial).collect::<Result<_>>()?
        } else {
            trials.iter().map(trial).collect::<Result<_>>()?
        };

        for ((_, target_idx, rep), outcome) in outcomes {
            debug!(
                "b = {}, BNR = {}, repetition {}: won at round {}",
                width, config.bnr_targets[target_idx], rep, outcome.win_round
            );
            table.set(rep, width_idx, target_idx, outcome.win_round);
        }

        sink.write_table(&table.width_slice(width_idx, width))?;
        progress.width_finished(width);
    }

    Ok(SweepResults {
        seed,
        config: config.clone(),
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn small_config() -> SweepConfig {
        SweepConfig {
            repetitions: 2,
            bnr_targets: vec![0.5, 1.0],
            widths: vec![30],
            seed: Some(17),
            ..Default::default()
        }
    }

    #[derive(Default)]
    struct CountingProgress {
        started: AtomicU64,
        trials: AtomicU64,
        finished: AtomicU64,
    }

    impl SweepProgress for CountingProgress {
        fn width_started(&self, _width: usize, trials: u64) {
            self.started.fetch_add(trials, Ordering::Relaxed);
        }

        fn trial_finished(&self, _width: usize, _outcome: &AttackOutcome) {
            self.trials.fetch_add(1, Ordering::Relaxed);
        }

        fn width_finished(&self, _width: usize) {
            self.finished.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_streams_are_distinct() {
        let config = SweepConfig {
            repetitions: 3,
            bnr_targets: vec![1.0, 2.0],
            widths: vec![30, 60],
            ..Default::default()
        };
        let mut streams: Vec<u64> = (0..2)
            .flat_map(|w| (0..2).flat_map(move |t| (0..3).map(move |r| (w, t, r))))
            .map(|(w, t, r)| trial_stream(&config, w, t, r))
            .collect();
        streams.extend((0..2).map(validation_stream));
        let total = streams.len();
        streams.sort_unstable();
        streams.dedup();
        assert_eq!(streams.len(), total);
        assert_eq!(trial_stream(&config, 1, 1, 2), 11);
    }

    #[test]
    fn test_stream_rng_differs_per_stream() {
        let a: u64 = stream_rng(1, 0).gen();
        let b: u64 = stream_rng(1, 1).gen();
        let again: u64 = stream_rng(1, 0).gen();
        assert_ne!(a, b);
        assert_eq!(a, again);
    }

    #[test]
    fn test_sweep_fills_table_and_reports_progress() {
        let config = small_config();
        let mut sink = MemorySink::new();
        let progress = CountingProgress::default();
        let results = run_sweep(&config, &mut sink, &progress).unwrap();

        assert_eq!(results.seed, 17);
        assert_eq!(results.table.shape(), (2, 1, 2));
        assert_eq!(sink.tables.len(), 1);
        assert_eq!(sink.tables[0], results.table.width_slice(0, 30));
        assert_eq!(progress.started.load(Ordering::Relaxed), 4);
        assert_eq!(progress.trials.load(Ordering::Relaxed), 4);
        assert_eq!(progress.finished.load(Ordering::Relaxed), 1);

        let summary = results.summary();
        assert_eq!(summary.len(), 2);
        assert!(summary.iter().all(|cell| cell.min >= 2));
        assert!(results.report().contains("      30"));
    }

    #[test]
    fn test_invalid_config_rejected_before_running() {
        let config = SweepConfig {
            widths: vec![],
            ..small_config()
        };
        let mut sink = MemorySink::new();
        let err = run_sweep(&config, &mut sink, &NoProgress).unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
        assert!(sink.tables.is_empty());
    }

    #[test]
    fn test_round_bound_aborts_sweep() {
        let config = SweepConfig {
            bnr_targets: vec![1e6],
            max_rounds: Some(10),
            ..small_config()
        };
        let mut sink = MemorySink::new();
        let err = run_sweep(&config, &mut sink, &NoProgress).unwrap_err();
        assert!(matches!(err, SweepError::Attack(_)));
        assert!(sink.tables.is_empty());
    }
}
