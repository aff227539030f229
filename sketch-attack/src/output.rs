//! Destinations for per-width result tables.

use crate::{error::OutputError, results::WidthTable};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// Receives the results of each width once all of its trials have finished.
pub trait ResultsSink {
    fn write_table(&mut self, table: &WidthTable) -> Result<(), OutputError>;
}

/// Writes one comma-separated file per width, `<prefix>_b_<width>.csv`.
#[derive(Clone, Debug)]
pub struct CsvSink {
    dir: PathBuf,
    prefix: String,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the table of `width`.
    pub fn path_for(&self, width: usize) -> PathBuf {
        self.dir.join(format!("{}_b_{}.csv", self.prefix, width))
    }
}

impl ResultsSink for CsvSink {
    fn write_table(&mut self, table: &WidthTable) -> Result<(), OutputError> {
        fs::create_dir_all(&self.dir).map_err(|source| OutputError::CreateDir {
            path: self.dir.display().to_string(),
            source,
        })?;

        let path = self.path_for(table.width());
        info!("saving file for b = {} in {}", table.width(), path.display());
        fs::write(&path, table.to_csv()).map_err(|source| OutputError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Keeps every table in memory, in the order written.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub tables: Vec<WidthTable>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, width: usize) -> Option<&WidthTable> {
        self.tables.iter().find(|table| table.width() == width)
    }
}

impl ResultsSink for MemorySink {
    fn write_table(&mut self, table: &WidthTable) -> Result<(), OutputError> {
        self.tables.push(table.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ResultsTable;

    fn sample_table(width_idx: usize, width: usize) -> WidthTable {
        let mut results = ResultsTable::new(2, 2, 3);
        for rep in 0..2 {
            for target in 0..3 {
                results.set(rep, width_idx, target, (10 * rep + target + 1) as u64);
            }
        }
        results.width_slice(width_idx, width)
    }

    #[test]
    fn test_csv_sink_writes_one_file_per_width() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path().join("nested"), "run");

        sink.write_table(&sample_table(0, 30)).unwrap();
        sink.write_table(&sample_table(1, 60)).unwrap();

        let path = dir.path().join("nested").join("run_b_30.csv");
        assert_eq!(sink.path_for(30), path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "1,2,3\n11,12,13\n");
        assert!(dir.path().join("nested").join("run_b_60.csv").exists());
    }

    #[test]
    fn test_csv_sink_reports_unwritable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let mut sink = CsvSink::new(&blocker, "run");
        let err = sink.write_table(&sample_table(0, 30)).unwrap_err();
        assert!(matches!(err, OutputError::CreateDir { .. }));
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.write_table(&sample_table(1, 60)).unwrap();
        sink.write_table(&sample_table(0, 30)).unwrap();

        let widths: Vec<usize> = sink.tables.iter().map(WidthTable::width).collect();
        assert_eq!(widths, vec![60, 30]);
        assert_eq!(sink.table(30).unwrap().shape(), (2, 3));
        assert!(sink.table(90).is_none());
    }
}
