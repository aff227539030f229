//! Dense line-major counter tables and median aggregation.
//!
//! Both the sketch (integer counters, one column per bucket) and the attack
//! (float accumulators, one column per tracked key) store their state as a
//! `lines x columns` table and aggregate it column-wise with a median.

use std::{
    fmt::Debug,
    ops::{AddAssign, SubAssign},
};

/// A value that can be stored in a [`CounterTable`].
pub trait Counter: Copy + Default + Debug + PartialEq + AddAssign + SubAssign {
    /// Widen to `f64` for median aggregation.
    fn to_f64(self) -> f64;
}

impl Counter for i64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Counter for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

/// A `lines x columns` matrix of counters.
#[derive(Clone, Debug, PartialEq)]
pub struct CounterTable<T> {
    lines: usize,
    columns: usize,
    cells: Vec<T>,
}

impl<T: Counter> CounterTable<T> {
    /// Create a table with every counter at zero.
    pub fn zeros(lines: usize, columns: usize) -> Self {
        Self {
            lines,
            columns,
            cells: vec![T::default(); lines * columns],
        }
    }

    /// Build a table from explicit lines. Returns `None` if the lines are
    /// ragged.
    pub fn from_lines(lines: Vec<Vec<T>>) -> Option<Self> {
        let columns = lines.first().map(Vec::len).unwrap_or(0);
        if lines.iter().any(|line| line.len() != columns) {
            return None;
        }
        let num_lines = lines.len();
        Some(Self {
            lines: num_lines,
            columns,
            cells: lines.into_iter().flatten().collect(),
        })
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// `(lines, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.lines, self.columns)
    }

    #[inline]
    pub fn get(&self, line: usize, column: usize) -> T {
        self.cells[line * self.columns + column]
    }

    #[inline]
    pub fn set(&mut self, line: usize, column: usize, value: T) {
        self.cells[line * self.columns + column] = value;
    }

    #[inline]
    pub fn add(&mut self, line: usize, column: usize, value: T) {
        self.cells[line * self.columns + column] += value;
    }

    /// All counters of one line.
    pub fn line(&self, line: usize) -> &[T] {
        &self.cells[line * self.columns..(line + 1) * self.columns]
    }

    /// Counters of one column, top to bottom.
    pub fn column(&self, column: usize) -> impl Iterator<Item = T> + '_ {
        self.cells.iter().skip(column).step_by(self.columns.max(1)).copied()
    }

    /// Reset every counter to zero, keeping the shape.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = T::default());
    }

    /// Element-wise `self += other`. Both tables must have the same shape.
    pub fn accumulate(&mut self, other: &Self) {
        debug_assert_eq!(self.shape(), other.shape());
        for (cell, value) in self.cells.iter_mut().zip(&other.cells) {
            *cell += *value;
        }
    }

    /// Element-wise `self -= other`. Both tables must have the same shape.
    pub fn deduct(&mut self, other: &Self) {
        debug_assert_eq!(self.shape(), other.shape());
        for (cell, value) in self.cells.iter_mut().zip(&other.cells) {
            *cell -= *value;
        }
    }

    /// Median of one column across all lines.
    pub fn column_median(&self, column: usize) -> f64 {
        let mut values: Vec<f64> = self.column(column).map(Counter::to_f64).collect();
        median(&mut values)
    }

    /// Median of every column across all lines.
    pub fn column_medians(&self) -> Vec<f64> {
        (0..self.columns).map(|c| self.column_median(c)).collect()
    }
}

/// Median of `values`, reordering the slice in place.
///
/// For an even number of values this is the mean of the two central values.
/// An empty slice has no median and yields `NaN`.
pub fn median(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    values.sort_unstable_by(f64::total_cmp);
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
