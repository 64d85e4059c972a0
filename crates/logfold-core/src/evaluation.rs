//! Accuracy of a transition matrix against labeled traces.
//!
//! A trace is *accepted* when every step from the root follows a known
//! template along a transition whose probability is at least
//! [`PROBABILITY_EPSILON`]. True traces should be accepted (recall), false
//! traces rejected (specificity).

use serde::{Deserialize, Serialize};

use crate::state_index::{ROOT, StateIndex};
use crate::transition_matrix::TransitionMatrix;

/// Transitions below this probability count as absent.
pub const PROBABILITY_EPSILON: f64 = 1e-10;

/// Specificity, recall and precision of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Accuracy {
    pub specificity: f64,
    pub recall: f64,
    pub precision: f64,
}

impl Accuracy {
    pub const PERFECT: Self = Self {
        specificity: 1.0,
        recall: 1.0,
        precision: 1.0,
    };

    /// Mean of specificity and recall; the compression objective.
    #[must_use]
    pub fn balanced(&self) -> f64 {
        (self.specificity + self.recall) / 2.0
    }
}

/// Labeled traces used to score a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSet {
    pub true_traces: Vec<Vec<String>>,
    pub false_traces: Vec<Vec<String>>,
}

impl EvaluationSet {
    #[must_use]
    pub fn new(true_traces: Vec<Vec<String>>, false_traces: Vec<Vec<String>>) -> Self {
        Self {
            true_traces,
            false_traces,
        }
    }

    #[must_use]
    pub fn evaluate(&self, matrix: &TransitionMatrix, index: &StateIndex) -> Accuracy {
        calculate_accuracy(matrix, index, &self.true_traces, &self.false_traces)
    }
}

/// Whether `trace` can be walked through `matrix` from the root.
#[must_use]
pub fn trace_accepted<S: AsRef<str>>(
    matrix: &TransitionMatrix,
    index: &StateIndex,
    trace: &[S],
) -> bool {
    let mut current = ROOT;
    for template in trace {
        let Some(next) = index.get(template.as_ref()) else {
            return false;
        };
        if matrix.get(current, next) < PROBABILITY_EPSILON {
            return false;
        }
        current = next;
    }
    true
}

/// Score `matrix` against true and false traces. Ratios with an empty
/// denominator are 1.0.
#[must_use]
pub fn calculate_accuracy<S: AsRef<str>>(
    matrix: &TransitionMatrix,
    index: &StateIndex,
    true_traces: &[Vec<S>],
    false_traces: &[Vec<S>],
) -> Accuracy {
    let true_negative = false_traces
        .iter()
        .filter(|trace| !trace_accepted(matrix, index, trace))
        .count();
    let true_positive = true_traces
        .iter()
        .filter(|trace| trace_accepted(matrix, index, trace))
        .count();
    let false_positive = false_traces.len() - true_negative;

    Accuracy {
        specificity: ratio(true_negative, false_traces.len()),
        recall: ratio(true_positive, true_traces.len()),
        precision: ratio(true_positive, true_positive + false_positive),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        1.0
    } else {
        numerator as f64 / denominator as f64
    }
}
