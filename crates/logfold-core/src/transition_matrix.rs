//! Dense square transition matrix.
//!
//! Row-major `Vec<f64>`. During training cells hold raw counts; after
//! [`TransitionMatrix::normalize_rows`] each row with mass is a probability
//! distribution. Merging two states averages their rows and sums their
//! columns, which keeps every row summing to one.

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    size: usize,
    cells: Vec<f64>,
}

impl TransitionMatrix {
    #[must_use]
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            cells: vec![0.0; size * size],
        }
    }

    /// Build from explicit rows. Fails if the rows do not form a square.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for row in rows {
            if row.len() != size {
                return Err(ChainError::IndexOutOfRange {
                    index: row.len(),
                    size,
                }
                .into());
            }
            cells.extend_from_slice(row);
        }
        Ok(Self { size, cells })
    }

    /// Row and column count.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.cells[row * self.size + col] = value;
    }

    pub fn increment(&mut self, row: usize, col: usize) {
        self.cells[row * self.size + col] += 1.0;
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.cells[row * self.size..(row + 1) * self.size]
    }

    #[must_use]
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.size).map(|row| self.get(row, col)).collect()
    }

    #[must_use]
    pub fn row_sum(&self, row: usize) -> f64 {
        self.row(row).iter().sum()
    }

    #[must_use]
    pub fn column_sum(&self, col: usize) -> f64 {
        (0..self.size).map(|row| self.get(row, col)).sum()
    }

    /// Element-wise add a same-sized partial (training reduction).
    pub fn accumulate(&mut self, other: &Self) -> Result<()> {
        if other.size != self.size {
            return Err(ChainError::IndexOutOfRange {
                index: other.size,
                size: self.size,
            }
            .into());
        }
        for (cell, add) in self.cells.iter_mut().zip(&other.cells) {
            *cell += add;
        }
        Ok(())
    }

    /// Divide every row with positive mass by its sum.
    pub fn normalize_rows(&mut self) {
        let size = self.size;
        for row in self.cells.chunks_mut(size.max(1)) {
            let sum: f64 = row.iter().sum();
            if sum > 0.0 {
                for cell in row {
                    *cell /= sum;
                }
            }
        }
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.size {
            Ok(())
        } else {
            Err(ChainError::IndexOutOfRange {
                index,
                size: self.size,
            }
            .into())
        }
    }

    /// Fold state `discard` into `keep`.
    ///
    /// The kept row becomes the average of both rows; afterwards the kept
    /// column absorbs the discarded column; the discarded row and column
    /// are removed. Returns the index `keep` occupies afterwards.
    pub fn merge(&mut self, keep: usize, discard: usize) -> Result<usize> {
        if keep == discard {
            return Err(ChainError::SelfMerge(keep).into());
        }
        self.check(keep)?;
        self.check(discard)?;

        for col in 0..self.size {
            let averaged = (self.get(keep, col) + self.get(discard, col)) / 2.0;
            self.set(keep, col, averaged);
        }
        for row in 0..self.size {
            let summed = self.get(row, keep) + self.get(row, discard);
            self.set(row, keep, summed);
        }
        self.remove_index(discard)?;
        Ok(if keep > discard { keep - 1 } else { keep })
    }

    /// Drop row and column `index`; higher indices shift down by one.
    pub fn remove_index(&mut self, index: usize) -> Result<()> {
        self.check(index)?;
        let old = self.size;
        let mut cells = Vec::with_capacity((old - 1) * (old - 1));
        for row in (0..old).filter(|&r| r != index) {
            for col in (0..old).filter(|&c| c != index) {
                cells.push(self.cells[row * old + col]);
            }
        }
        self.size = old - 1;
        self.cells = cells;
        Ok(())
    }

    /// Largest absolute difference between rows (or columns) `a` and `b`.
    #[must_use]
    pub fn distance(&self, a: usize, b: usize, by_row: bool) -> f64 {
        (0..self.size)
            .map(|k| {
                if by_row {
                    (self.get(a, k) - self.get(b, k)).abs()
                } else {
                    (self.get(k, a) - self.get(k, b)).abs()
                }
            })
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn normalize_leaves_empty_rows_alone() {
        let mut m = TransitionMatrix::from_rows(&[
            vec![0.0, 2.0, 2.0],
            vec![0.0, 0.0, 0.0],
            vec![1.0, 0.0, 3.0],
        ])
        .unwrap();
        m.normalize_rows();
        assert!(close(m.get(0, 1), 0.5));
        assert!(close(m.row_sum(1), 0.0));
        assert!(close(m.get(2, 2), 0.75));
    }

    #[test]
    fn merge_averages_rows_and_sums_columns() {
        let mut m = TransitionMatrix::from_rows(&[
            vec![0.0, 0.0, 0.5, 0.5],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 1.0],
        ])
        .unwrap();
        let kept = m.merge(2, 3).unwrap();
        assert_eq!(kept, 2);
        assert_eq!(m.size(), 3);
        // row 2 was (0,1,0,0), row 3 was (0,0,0,1); average then column sum
        assert!(close(m.get(2, 1), 0.5));
        assert!(close(m.get(2, 2), 0.5));
        assert!(close(m.get(0, 2), 1.0));
        for row in 0..m.size() {
            assert!(close(m.row_sum(row), 1.0));
        }
    }

    #[test]
    fn merge_into_self_fails() {
        let mut m = TransitionMatrix::zeros(3);
        assert!(m.merge(1, 1).is_err());
        assert!(m.merge(0, 3).is_err());
        assert_eq!(m.size(), 3);
    }

    #[test]
    fn remove_index_shifts_cells() {
        let mut m =
            TransitionMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]])
                .unwrap();
        m.remove_index(1).unwrap();
        assert_eq!(m.row(0), &[1.0, 3.0]);
        assert_eq!(m.row(1), &[7.0, 9.0]);
    }

    #[test]
    fn accumulate_rejects_size_mismatch() {
        let mut a = TransitionMatrix::zeros(2);
        let mut b = TransitionMatrix::zeros(2);
        b.increment(0, 1);
        a.accumulate(&b).unwrap();
        a.accumulate(&b).unwrap();
        assert!(close(a.get(0, 1), 2.0));
        assert!(a.accumulate(&TransitionMatrix::zeros(3)).is_err());
    }

    #[test]
    fn distance_by_row_and_column() {
        let m = TransitionMatrix::from_rows(&[vec![0.0, 1.0], vec![0.25, 0.75]]).unwrap();
        assert!(close(m.distance(0, 1, true), 0.25));
        assert!(close(m.distance(0, 1, false), 1.0));
    }
}
