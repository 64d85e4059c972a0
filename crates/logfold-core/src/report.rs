//! Append-only CSV evaluation report.
//!
//! The header is written once when the file is created; every later run
//! appends rows, so several experiments can share one report.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::evaluation::Accuracy;
use crate::markov_chain::{CompressionStep, CompressionSummary};

pub const HEADER: &str = "compression,specificity,recall,precision,elapsed_secs";

/// One report line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub compression: f64,
    pub specificity: f64,
    pub recall: f64,
    pub precision: f64,
    pub elapsed_secs: f64,
}

impl ReportRow {
    #[must_use]
    pub fn new(compression: f64, accuracy: Accuracy, elapsed: Duration) -> Self {
        Self {
            compression,
            specificity: accuracy.specificity,
            recall: accuracy.recall,
            precision: accuracy.precision,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    #[must_use]
    pub fn from_step(step: &CompressionStep, elapsed: Duration) -> Self {
        Self::new(step.compression(), step.accuracy, elapsed)
    }

    #[must_use]
    pub fn from_summary(summary: &CompressionSummary, elapsed: Duration) -> Self {
        Self::new(summary.compression(), summary.accuracy, elapsed)
    }

    #[must_use]
    pub fn to_csv_line(&self) -> String {
        let mut line = String::new();
        let _ = writeln!(
            line,
            "{:.6},{:.6},{:.6},{:.6},{:.6}",
            self.compression, self.specificity, self.recall, self.precision, self.elapsed_secs
        );
        line
    }

    /// Parse a line written by [`Self::to_csv_line`].
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<f64> = line
            .trim()
            .split(',')
            .map(|f| f.parse().ok())
            .collect::<Option<_>>()?;
        match fields.as_slice() {
            &[compression, specificity, recall, precision, elapsed_secs] => Some(Self {
                compression,
                specificity,
                recall,
                precision,
                elapsed_secs,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    /// Open `path` for appending, creating it (and its header) if needed.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let is_new = std::fs::metadata(path).map_or(true, |m| m.len() == 0);
        if is_new {
            std::fs::write(path, format!("{HEADER}\n"))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, row: &ReportRow) -> Result<()> {
        let mut file = std::fs::OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(row.to_csv_line().as_bytes())?;
        Ok(())
    }

    /// Every data row of the report; unparsable lines are skipped.
    pub fn read_rows(path: &Path) -> Result<Vec<ReportRow>> {
        let text = std::fs::read_to_string(path)?;
        Ok(text.lines().skip(1).filter_map(ReportRow::parse).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(compression: f64) -> ReportRow {
        ReportRow::new(compression, Accuracy::PERFECT, Duration::from_millis(1500))
    }

    #[test]
    fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.csv");
        ReportWriter::create(&path).unwrap().append(&row(0.25)).unwrap();
        ReportWriter::create(&path).unwrap().append(&row(0.5)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches(HEADER).count(), 1);
        assert!(text.starts_with(HEADER));
        let rows = ReportWriter::read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].compression, 0.5);
        assert_eq!(rows[0].elapsed_secs, 1.5);
    }

    #[test]
    fn line_format() {
        assert_eq!(
            row(0.125).to_csv_line(),
            "0.125000,1.000000,1.000000,1.000000,1.500000\n"
        );
        assert!(ReportRow::parse("1,2,3").is_none());
        assert!(ReportRow::parse("a,b,c,d,e").is_none());
    }
}
