//! End-to-end sweep tests.

use bth_sketch_attack::{
    run_sweep, simulate_median_attack, AttackConfig, AttackError, CsvSink, MemorySink,
    NoProgress, SweepConfig, SweepError, TailModel,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fs;

fn two_width_config(seed: u64) -> SweepConfig {
    SweepConfig {
        repetitions: 5,
        bnr_targets: vec![1.0, 2.0],
        widths: vec![30, 60],
        seed: Some(seed),
        ..Default::default()
    }
}

#[test]
fn test_sweep_writes_one_table_per_width() {
    let dir = tempfile::tempdir().unwrap();
    let config = two_width_config(42);
    let mut sink = CsvSink::new(dir.path(), &config.file_prefix);

    let results = run_sweep(&config, &mut sink, &NoProgress).unwrap();
    assert_eq!(results.table.shape(), (5, 2, 2));

    for (width_idx, width) in [30, 60].into_iter().enumerate() {
        let csv = fs::read_to_string(dir.path().join(format!("sim_3_b_{width}.csv"))).unwrap();
        let rows: Vec<Vec<u64>> = csv
            .lines()
            .map(|line| line.split(',').map(|v| v.parse().unwrap()).collect())
            .collect();

        assert_eq!(rows.len(), 5);
        for (rep, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), 2);
            for (target, &rounds) in row.iter().enumerate() {
                assert!(rounds >= 2);
                assert_eq!(rounds, results.table.get(rep, width_idx, target));
            }
        }
    }
}

#[test]
fn test_same_seed_same_table() {
    let config = two_width_config(7);
    let first = run_sweep(&config, &mut MemorySink::new(), &NoProgress).unwrap();
    let second = run_sweep(&config, &mut MemorySink::new(), &NoProgress).unwrap();
    assert_eq!(first.table, second.table);
}

#[test]
fn test_parallel_matches_serial() {
    let serial = two_width_config(9);
    let parallel = SweepConfig {
        parallel: true,
        ..serial.clone()
    };

    let mut serial_sink = MemorySink::new();
    let mut parallel_sink = MemorySink::new();
    let a = run_sweep(&serial, &mut serial_sink, &NoProgress).unwrap();
    let b = run_sweep(&parallel, &mut parallel_sink, &NoProgress).unwrap();

    assert_eq!(a.table, b.table);
    assert_eq!(serial_sink.tables, parallel_sink.tables);
}

#[test]
fn test_unseeded_sweep_reports_its_seed() {
    let config = SweepConfig {
        repetitions: 1,
        bnr_targets: vec![0.5],
        widths: vec![30],
        seed: None,
        ..Default::default()
    };
    let first = run_sweep(&config, &mut MemorySink::new(), &NoProgress).unwrap();

    let replay = SweepConfig {
        seed: Some(first.seed),
        ..config
    };
    let second = run_sweep(&replay, &mut MemorySink::new(), &NoProgress).unwrap();
    assert_eq!(first.table, second.table);
}

#[test]
fn test_validation_failure_aborts_sweep() {
    // One line of four keys in four buckets almost always collides, so the
    // single-line estimates cannot all be exact across ten draws.
    let config = SweepConfig {
        repetitions: 1,
        bnr_targets: vec![1.0],
        widths: vec![4],
        depth: 1,
        key_ratio: 1,
        seed: Some(3),
        ..Default::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let mut sink = CsvSink::new(dir.path(), "abort");

    match run_sweep(&config, &mut sink, &NoProgress) {
        Err(SweepError::ValidationFailed { width, depth, keys }) => {
            assert_eq!((width, depth, keys), (4, 1, 4));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(!sink.path_for(4).exists());
}

#[test]
fn test_earlier_widths_stay_written_after_abort() {
    // b = 1 tracks a single key, which can never collide. b = 2 places two
    // keys on one line and collides on half of its draws.
    let config = SweepConfig {
        repetitions: 1,
        bnr_targets: vec![0.5],
        widths: vec![1, 2],
        depth: 1,
        key_ratio: 1,
        seed: Some(5),
        ..Default::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let mut sink = CsvSink::new(dir.path(), "partial");

    let err = run_sweep(&config, &mut sink, &NoProgress).unwrap_err();
    assert!(matches!(err, SweepError::ValidationFailed { width: 2, .. }));
    assert!(sink.path_for(1).exists());
    assert!(!sink.path_for(2).exists());
}

#[test]
fn test_reference_geometry_attacks_converge() {
    let tail = TailModel::new(30, 1000).unwrap();
    let config = AttackConfig {
        target_bnr: 1.0,
        max_rounds: Some(10_000),
        ..Default::default()
    };

    let mut converged = 0;
    for seed in 0..100 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        match simulate_median_attack(&config, &tail, 100, &mut rng) {
            Ok(outcome) => {
                assert!(outcome.win_round >= 2);
                converged += 1;
            }
            Err(AttackError::NonConvergence { .. }) => {}
            Err(err) => panic!("unexpected attack error: {err}"),
        }
    }
    assert!(converged >= 99, "only {converged} of 100 attacks converged");
}

#[test]
fn test_sweep_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sweep.toml");
    fs::write(
        &path,
        r#"
repetitions = 2
bnr_targets = [0.5]
widths = [30]
seed = 11
file_prefix = "toml_run"
"#,
    )
    .unwrap();

    let config = SweepConfig::from_file(&path).unwrap();
    assert_eq!(config.depth, 100);
    assert_eq!(config.tail_size, 1000);

    let out = dir.path().join("out");
    let mut sink = CsvSink::new(&out, &config.file_prefix);
    run_sweep(&config, &mut sink, &NoProgress).unwrap();

    let csv = fs::read_to_string(out.join("toml_run_b_30.csv")).unwrap();
    assert_eq!(csv.lines().count(), 2);
}
