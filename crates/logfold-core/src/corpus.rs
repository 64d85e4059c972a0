//! Trace corpora on disk.
//!
//! A corpus is a directory of files, one trace per file, one raw log line
//! per line. Files are kept in sorted order so partitions, folds and seeded
//! selections are reproducible across runs.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TemplateError};
use crate::template_tree::TemplateClassifier;

/// Ordered list of trace files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceCorpus {
    files: Vec<PathBuf>,
}

impl TraceCorpus {
    /// List the regular files of `dir`, sorted by path.
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        debug!(dir = %dir.display(), files = files.len(), "Opened trace corpus");
        Ok(Self { files })
    }

    #[must_use]
    pub fn from_files(mut files: Vec<PathBuf>) -> Self {
        files.sort();
        Self { files }
    }

    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// `n` contiguous chunks whose sizes differ by at most one.
    #[must_use]
    pub fn partition(&self, n: usize) -> Vec<&[PathBuf]> {
        split_evenly(&self.files, n)
    }

    /// Sub-corpus made of the files at `indices` (out-of-range ones skipped).
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        Self::from_files(
            indices
                .iter()
                .filter_map(|&i| self.files.get(i).cloned())
                .collect(),
        )
    }

    /// `(train, test)` pairs for k-fold cross validation: each contiguous
    /// chunk is the test set once, the rest is the training set.
    #[must_use]
    pub fn k_fold(&self, k: usize) -> Vec<(Self, Self)> {
        let chunks = self.partition(k);
        (0..chunks.len())
            .map(|held_out| {
                let test = Self {
                    files: chunks[held_out].to_vec(),
                };
                let train = Self {
                    files: chunks
                        .iter()
                        .enumerate()
                        .filter(|&(i, _)| i != held_out)
                        .flat_map(|(_, chunk)| chunk.iter().cloned())
                        .collect(),
                };
                (train, test)
            })
            .collect()
    }

    /// Classify every trace into its template sequence.
    pub fn load_templates<C>(&self, classifier: &C) -> Result<Vec<Vec<String>>>
    where
        C: TemplateClassifier + ?Sized,
    {
        self.files
            .iter()
            .map(|path| load_trace(path, classifier))
            .collect()
    }
}

/// Split `items` like `numpy.array_split`: the first `len % n` chunks get
/// one extra element. `n == 0` is treated as 1.
#[must_use]
pub fn split_evenly<T>(items: &[T], n: usize) -> Vec<&[T]> {
    let n = n.max(1);
    let base = items.len() / n;
    let extra = items.len() % n;
    let mut chunks = Vec::with_capacity(n);
    let mut offset = 0;
    for i in 0..n {
        let size = base + usize::from(i < extra);
        chunks.push(&items[offset..offset + size]);
        offset += size;
    }
    chunks
}

/// Non-blank lines of a trace file.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Read and classify one trace file.
pub fn load_trace<C>(path: &Path, classifier: &C) -> Result<Vec<String>>
where
    C: TemplateClassifier + ?Sized,
{
    let lines = read_lines(path)?;
    classify_trace(&path.display().to_string(), &lines, classifier)
}

/// Template sequence for `lines`; any unclassifiable line is an error
/// naming `origin` and the 1-based line number.
pub fn classify_trace<S, C>(origin: &str, lines: &[S], classifier: &C) -> Result<Vec<String>>
where
    S: AsRef<str>,
    C: TemplateClassifier + ?Sized,
{
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            classifier
                .classify(line.as_ref())
                .map(str::to_string)
                .ok_or_else(|| {
                    TemplateError::Unclassified {
                        origin: origin.to_string(),
                        line: i + 1,
                    }
                    .into()
                })
        })
        .collect()
}

/// Keep at most two consecutive repetitions of any template.
///
/// Two are kept so self-loops stay observable to the evaluator.
#[must_use]
pub fn condense_repeats<S: AsRef<str>>(trace: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(trace.len());
    for template in trace {
        let template = template.as_ref();
        let n = out.len();
        if n >= 2 && out[n - 1] == template && out[n - 2] == template {
            continue;
        }
        out.push(template.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::template_tree::StaticClassifier;

    fn write_corpus(dir: &Path, traces: &[(&str, &str)]) {
        for (name, body) in traces {
            std::fs::write(dir.join(name), body).unwrap();
        }
    }

    #[test]
    fn split_evenly_puts_larger_chunks_first() {
        let items: Vec<u32> = (0..7).collect();
        let sizes: Vec<usize> = split_evenly(&items, 3).iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![3, 2, 2]);
        let sizes: Vec<usize> = split_evenly(&items, 10).iter().map(|c| c.len()).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 7);
        assert_eq!(sizes.len(), 10);
        assert_eq!(split_evenly(&items, 0).len(), 1);
    }

    #[test]
    fn open_lists_sorted_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), &[("b", "x\n"), ("a", "y\n")]);
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let corpus = TraceCorpus::open(dir.path()).unwrap();
        let names: Vec<_> = corpus
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn k_fold_covers_every_file_once_as_test() {
        let corpus = TraceCorpus::from_files((0..5).map(|i| PathBuf::from(format!("t{i}"))).collect());
        let folds = corpus.k_fold(2);
        assert_eq!(folds.len(), 2);
        assert_eq!(folds[0].1.len(), 3);
        assert_eq!(folds[0].0.len(), 2);
        let tested: usize = folds.iter().map(|(_, test)| test.len()).sum();
        assert_eq!(tested, corpus.len());
    }

    #[test]
    fn classify_trace_reports_line_number() {
        let classifier = StaticClassifier::identity(["a", "b"]);
        let err = classify_trace("trace7", &["a", "b", "zzz"], &classifier).unwrap_err();
        assert!(matches!(
            err,
            Error::Template(TemplateError::Unclassified { ref origin, line: 3 }) if origin == "trace7"
        ));
    }

    #[test]
    fn load_templates_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), &[("t1", "a\n\nb\n"), ("t2", "b\n")]);
        let corpus = TraceCorpus::open(dir.path()).unwrap();
        let classifier = StaticClassifier::identity(["a", "b"]);
        let traces = corpus.load_templates(&classifier).unwrap();
        assert_eq!(traces, vec![vec!["a", "b"], vec!["b"]]);
    }

    #[test]
    fn condense_keeps_two_repeats() {
        let condensed = condense_repeats(&["a", "a", "a", "a", "b", "a", "a", "a"]);
        assert_eq!(condensed, vec!["a", "a", "b", "a", "a"]);
        assert!(condense_repeats::<&str>(&[]).is_empty());
    }
}
