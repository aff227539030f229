//! Sketch attack simulation CLI.
//!
//! Sweep sketch widths and BNR targets, measuring how many rounds an adaptive
//! median attack needs.

#[cfg(feature = "cli")]
mod cli {
    use anyhow::{Context, Result};
    use bth_sketch_attack::{
        check_parameters, run_sweep, simulate_median_attack, AttackConfig, AttackOutcome,
        CsvSink, SketchConfig, StopRule, SweepConfig, SweepProgress, SweepResults, TailModel,
        WeightProfile,
    };
    use clap::{Parser, Subcommand};
    use indicatif::{ProgressBar, ProgressStyle};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::path::{Path, PathBuf};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    #[derive(Parser)]
    #[command(name = "sketch-attack-sim")]
    #[command(about = "Simulate adaptive median attacks against signed sketches")]
    #[command(version)]
    pub struct Cli {
        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "info", global = true)]
        pub log_level: String,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Subcommand)]
    pub enum Command {
        /// Sweep sketch widths and BNR targets
        Sweep {
            /// TOML file with sweep parameters (flags override it)
            #[arg(short, long)]
            config: Option<PathBuf>,

            /// Attacks per (width, BNR) pair
            #[arg(short, long)]
            repetitions: Option<usize>,

            /// BNR targets, comma separated
            #[arg(long, value_delimiter = ',')]
            bnr: Option<Vec<f64>>,

            /// Tracked columns per line (two marked keys plus decoys)
            #[arg(long)]
            columns: Option<usize>,

            /// Number of background items
            #[arg(long)]
            tail_size: Option<u64>,

            /// Sketch depth (l)
            #[arg(short, long)]
            depth: Option<usize>,

            /// Sketch widths (b), comma separated
            #[arg(short, long, value_delimiter = ',')]
            widths: Option<Vec<usize>>,

            /// Width-to-key ratio (b/k)
            #[arg(long)]
            key_ratio: Option<usize>,

            /// Master seed
            #[arg(short, long)]
            seed: Option<u64>,

            /// Give up on an attack after this many rounds
            #[arg(long)]
            max_rounds: Option<u64>,

            /// Stop as soon as either marked key reaches the target
            #[arg(long)]
            either_key: bool,

            /// Run trials on all cores
            #[arg(short, long)]
            parallel: bool,

            /// Output directory for CSV files
            #[arg(short, long, default_value = "results")]
            output: PathBuf,

            /// File name prefix of the result tables
            #[arg(long)]
            prefix: Option<String>,
        },

        /// Check that a sketch geometry recovers weights exactly
        Check {
            /// Sketch width (b)
            #[arg(short, long, default_value = "30")]
            width: usize,

            /// Sketch depth (l)
            #[arg(short, long, default_value = "100")]
            depth: usize,

            /// Width-to-key ratio (b/k)
            #[arg(long, default_value = "3")]
            key_ratio: usize,

            /// Number of background items
            #[arg(long, default_value = "1000")]
            tail_size: u64,

            /// Number of independent sketch draws
            #[arg(short = 'n', long, default_value = "10")]
            checks: usize,

            /// Seed for the sketch draws
            #[arg(short, long)]
            seed: Option<u64>,
        },

        /// Run a single attack
        Attack {
            /// Sketch width (b)
            #[arg(short, long, default_value = "30")]
            width: usize,

            /// Sketch depth (l)
            #[arg(short, long, default_value = "100")]
            depth: usize,

            /// Number of background items
            #[arg(long, default_value = "1000")]
            tail_size: u64,

            /// BNR target
            #[arg(short, long, default_value = "1.0")]
            bnr: f64,

            /// Tracked columns per line
            #[arg(long, default_value = "3")]
            columns: usize,

            /// Seed for the tail noise
            #[arg(short, long)]
            seed: Option<u64>,

            /// Give up after this many rounds
            #[arg(long)]
            max_rounds: Option<u64>,

            /// Stop as soon as either marked key reaches the target
            #[arg(long)]
            either_key: bool,
        },

        /// Run the two reference width sweeps (BNR 1 and BNR 2)
        Reference {
            /// Output directory for CSV files
            #[arg(short, long, default_value = "results")]
            output: PathBuf,

            /// Master seed
            #[arg(short, long)]
            seed: Option<u64>,

            /// Run trials on all cores
            #[arg(short, long)]
            parallel: bool,
        },
    }

    pub fn init_logging(level: &str) -> Result<()> {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();

        Ok(())
    }

    /// Progress bar over every trial of a sweep.
    struct BarProgress {
        bar: ProgressBar,
    }

    impl BarProgress {
        fn new(total: u64) -> Result<Self> {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} [{elapsed_precise}] {msg}")?
                    .progress_chars("█▓▒░ "),
            );
            Ok(Self { bar })
        }
    }

    impl SweepProgress for BarProgress {
        fn width_started(&self, width: usize, _trials: u64) {
            self.bar.set_message(format!("b = {width}"));
        }

        fn trial_finished(&self, _width: usize, _outcome: &AttackOutcome) {
            self.bar.inc(1);
        }
    }

    pub fn run(cli: Cli) -> Result<()> {
        match cli.command {
            Command::Sweep {
                config,
                repetitions,
                bnr,
                columns,
                tail_size,
                depth,
                widths,
                key_ratio,
                seed,
                max_rounds,
                either_key,
                parallel,
                output,
                prefix,
            } => {
                let mut sweep = match config {
                    Some(path) => SweepConfig::from_file(&path)
                        .with_context(|| format!("loading {}", path.display()))?,
                    None => SweepConfig::default(),
                };
                if let Some(repetitions) = repetitions {
                    sweep.repetitions = repetitions;
                }
                if let Some(bnr) = bnr {
                    sweep.bnr_targets = bnr;
                }
                if let Some(columns) = columns {
                    sweep.tracked_columns = columns;
                }
                if let Some(tail_size) = tail_size {
                    sweep.tail_size = tail_size;
                }
                if let Some(depth) = depth {
                    sweep.depth = depth;
                }
                if let Some(widths) = widths {
                    sweep.widths = widths;
                }
                if let Some(key_ratio) = key_ratio {
                    sweep.key_ratio = key_ratio;
                }
                if let Some(prefix) = prefix {
                    sweep.file_prefix = prefix;
                }
                sweep.seed = seed.or(sweep.seed);
                sweep.max_rounds = max_rounds.or(sweep.max_rounds);
                if either_key {
                    sweep.stop_rule = StopRule::EitherKey;
                }
                sweep.parallel |= parallel;

                let results = run_sweep_to_dir(&sweep, &output)?;
                print_results(&results);
            }
            Command::Check {
                width,
                depth,
                key_ratio,
                tail_size,
                checks,
                seed,
            } => {
                let config = SketchConfig::from_ratio(width, depth, key_ratio)?;
                let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let passed =
                    check_parameters(&config, tail_size, &WeightProfile::default(), checks, &mut rng);

                println!("Sketch parameter check");
                println!("======================\n");
                println!("  l = {}, b = {}, k = {}", config.depth, config.width, config.keys);
                println!("  draws = {checks}, seed = {seed}");
                println!("  result: {}", if passed { "PASS" } else { "FAIL" });
                if !passed {
                    anyhow::bail!("sketch parameters failed the round-trip check");
                }
            }
            Command::Attack {
                width,
                depth,
                tail_size,
                bnr,
                columns,
                seed,
                max_rounds,
                either_key,
            } => {
                let config = AttackConfig {
                    target_bnr: bnr,
                    columns,
                    max_rounds,
                    stop_rule: if either_key {
                        StopRule::EitherKey
                    } else {
                        StopRule::BothKeys
                    },
                };
                let tail = TailModel::new(width, tail_size)?;
                let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let outcome = simulate_median_attack(&config, &tail, depth, &mut rng)?;

                println!("Median attack");
                println!("=============\n");
                println!("  l = {depth}, b = {width}, tail = {tail_size}, BNR = {bnr}, seed = {seed}");
                println!("  stop rule        = {}", config.stop_rule);
                println!("  win round        = {}", outcome.win_round);
                println!("  rounds executed  = {}", outcome.rounds_executed());
                println!("  rounds collected = {}", outcome.collected_rounds);
                println!("  bias key 0       = {:.4}", outcome.key_0_bias);
                println!("  bias key 1       = {:.4}", outcome.key_1_bias);
            }
            Command::Reference {
                output,
                seed,
                parallel,
            } => {
                for mut sweep in SweepConfig::reference_experiments() {
                    sweep.seed = seed;
                    sweep.parallel = parallel;
                    let results = run_sweep_to_dir(&sweep, &output)?;
                    print_results(&results);
                }
            }
        }
        Ok(())
    }

    fn run_sweep_to_dir(sweep: &SweepConfig, output: &Path) -> Result<SweepResults> {
        let mut sink = CsvSink::new(output, sweep.file_prefix.clone());
        let progress = BarProgress::new(sweep.total_trials())?;
        let results = run_sweep(sweep, &mut sink, &progress);
        progress.bar.finish_and_clear();
        Ok(results?)
    }

    fn print_results(results: &SweepResults) {
        println!();
        print!("{}", results.report());
        println!("\nSeed: {}", results.seed);
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    use clap::Parser;
    let cli = cli::Cli::parse();
    cli::init_logging(&cli.log_level)?;
    cli::run(cli)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with:");
    eprintln!("  cargo build -p bth-sketch-attack --features cli --bin sketch-attack-sim");
}
