//! Round-count tables produced by a sweep.

/// Round counts for one sketch width: one row per repetition, one column per
/// BNR target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WidthTable {
    width: usize,
    repetitions: usize,
    targets: usize,
    rounds: Vec<u64>,
}

impl WidthTable {
    pub fn width(&self) -> usize {
        self.width
    }

    /// `(repetitions, targets)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.repetitions, self.targets)
    }

    pub fn get(&self, repetition: usize, target: usize) -> u64 {
        self.rounds[repetition * self.targets + target]
    }

    /// Rounds of one repetition across all targets.
    pub fn row(&self, repetition: usize) -> &[u64] {
        &self.rounds[repetition * self.targets..(repetition + 1) * self.targets]
    }

    /// Rounds of every repetition for one target.
    pub fn column(&self, target: usize) -> Vec<u64> {
        (0..self.repetitions).map(|rep| self.get(rep, target)).collect()
    }

    /// Comma-separated rows, one line per repetition.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        for rep in 0..self.repetitions {
            let row: Vec<String> = self.row(rep).iter().map(u64::to_string).collect();
            csv.push_str(&row.join(","));
            csv.push('\n');
        }
        csv
    }
}

/// Round counts of a full sweep, indexed `[repetition][width][target]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultsTable {
    repetitions: usize,
    widths: usize,
    targets: usize,
    rounds: Vec<u64>,
}

impl ResultsTable {
    /// A zeroed table. Zero marks a trial that has not run.
    pub fn new(repetitions: usize, widths: usize, targets: usize) -> Self {
        Self {
            repetitions,
            widths,
            targets,
            rounds: vec![0; repetitions * widths * targets],
        }
    }

    /// `(repetitions, widths, targets)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.repetitions, self.widths, self.targets)
    }

    fn index(&self, repetition: usize, width: usize, target: usize) -> usize {
        (repetition * self.widths + width) * self.targets + target
    }

    pub fn get(&self, repetition: usize, width: usize, target: usize) -> u64 {
        self.rounds[self.index(repetition, width, target)]
    }

    pub fn set(&mut self, repetition: usize, width: usize, target: usize, rounds: u64) {
        let idx = self.index(repetition, width, target);
        self.rounds[idx] = rounds;
    }

    /// The `repetitions x targets` slice of width index `width_idx`, labelled
    /// with the width value `width`.
    pub fn width_slice(&self, width_idx: usize, width: usize) -> WidthTable {
        let rounds = (0..self.repetitions)
            .flat_map(|rep| (0..self.targets).map(move |target| (rep, target)))
            .map(|(rep, target)| self.get(rep, width_idx, target))
            .collect();
        WidthTable {
            width,
            repetitions: self.repetitions,
            targets: self.targets,
            rounds,
        }
    }
}

/// Round-count statistics for one (width, target) cell of a sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundStats {
    pub width: usize,
    pub target_bnr: f64,
    pub trials: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: u64,
    pub median: f64,
    pub max: u64,
}

impl RoundStats {
    /// Statistics of `rounds`. Returns `None` for an empty sample.
    pub fn from_rounds(width: usize, target_bnr: f64, rounds: &[u64]) -> Option<Self> {
        let min = *rounds.iter().min()?;
        let max = *rounds.iter().max()?;
        let n = rounds.len() as f64;
        let mean = rounds.iter().sum::<u64>() as f64 / n;
        let variance = rounds
            .iter()
            .map(|&r| (r as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        let mut sorted: Vec<f64> = rounds.iter().map(|&r| r as f64).collect();
        Some(Self {
            width,
            target_bnr,
            trials: rounds.len(),
            mean,
            std_dev: variance.sqrt(),
            min,
            median: crate::table::median(&mut sorted),
            max,
        })
    }
}

/// Format per-cell statistics as a plain-text table.
pub fn format_sweep_report(stats: &[RoundStats]) -> String {
    let mut report = String::new();

    report.push_str("MEDIAN ATTACK ROUNDS BY SKETCH WIDTH\n");
    report.push_str("─────────────────────────────────────────────────────────────────────\n");
    report.push_str("   Width     BNR  Trials       Mean    Std Dev     Min   Median      Max\n");
    report.push_str("─────────────────────────────────────────────────────────────────────\n");

    for s in stats {
        report.push_str(&format!(
            "{:>8} {:>7.2} {:>7} {:>10.1} {:>10.1} {:>7} {:>8.1} {:>8}\n",
            s.width, s.target_bnr, s.trials, s.mean, s.std_dev, s.min, s.median, s.max
        ));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> ResultsTable {
        let mut table = ResultsTable::new(3, 2, 2);
        for rep in 0..3 {
            for width in 0..2 {
                for target in 0..2 {
                    table.set(rep, width, target, (100 * width + 10 * target + rep) as u64 + 1);
                }
            }
        }
        table
    }

    #[test]
    fn test_width_slice_layout() {
        let table = filled();
        assert_eq!(table.shape(), (3, 2, 2));

        let slice = table.width_slice(1, 60);
        assert_eq!(slice.width(), 60);
        assert_eq!(slice.shape(), (3, 2));
        assert_eq!(slice.row(0), &[101, 111]);
        assert_eq!(slice.row(2), &[103, 113]);
        assert_eq!(slice.column(1), vec![111, 112, 113]);
    }

    #[test]
    fn test_csv_rows_per_repetition() {
        let slice = filled().width_slice(0, 30);
        assert_eq!(slice.to_csv(), "1,11\n2,12\n3,13\n");
    }

    #[test]
    fn test_round_stats() {
        let stats = RoundStats::from_rounds(30, 1.0, &[4, 8, 6, 2]).unwrap();
        assert_eq!(stats.trials, 4);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.min, 2);
        assert_eq!(stats.max, 8);
        assert_eq!(stats.median, 5.0);
        assert!((stats.std_dev - 5f64.sqrt()).abs() < 1e-12);

        assert!(RoundStats::from_rounds(30, 1.0, &[]).is_none());
    }

    #[test]
    fn test_report_lists_every_cell() {
        let stats = vec![
            RoundStats::from_rounds(30, 1.0, &[10, 20]).unwrap(),
            RoundStats::from_rounds(60, 2.0, &[30, 50]).unwrap(),
        ];
        let report = format_sweep_report(&stats);
        assert!(report.contains("      30    1.00"));
        assert!(report.contains("      60    2.00"));
        assert_eq!(report.lines().count(), 4 + stats.len());
        assert!(report.ends_with('\n'));
    }
}
