//! Negative examples for model evaluation.
//!
//! A false trace is a true template trace with one random mutation that the
//! prefix tree of the training corpus rejects. Mutants the prefix tree still
//! accepts are discarded and retried.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::Result;
use crate::state_graph::StateGraph;

/// Attempts per false trace before giving up on a source trace.
pub const DEFAULT_MAX_ATTEMPTS: usize = 32;

/// Kinds of mutation applied to a true trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Drop a random contiguous span.
    DeleteSpan,
    /// Exchange two positions.
    Swap,
    /// Insert a random known template.
    Insert,
    /// Overwrite one position with a random known template.
    Replace,
}

impl Mutation {
    const ALL: [Self; 4] = [Self::DeleteSpan, Self::Swap, Self::Insert, Self::Replace];
}

pub struct FalseTraceGenerator<'g> {
    graph: &'g StateGraph,
    templates: Vec<String>,
    rng: StdRng,
    max_attempts: usize,
}

impl<'g> FalseTraceGenerator<'g> {
    /// `graph` decides what counts as a genuine negative; `templates` is the
    /// alphabet used for insertions and replacements.
    #[must_use]
    pub fn new(graph: &'g StateGraph, templates: Vec<String>, seed: u64) -> Self {
        Self {
            graph,
            templates,
            rng: StdRng::seed_from_u64(seed),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Apply `mutation` to a copy of `trace`. Mutations that need material
    /// the trace or alphabet lacks fall back to one that does not.
    pub fn apply(&mut self, trace: &[String], mutation: Mutation) -> Vec<String> {
        let mut out = trace.to_vec();
        let mutation = match mutation {
            Mutation::Swap if out.len() < 2 => Mutation::Insert,
            Mutation::DeleteSpan | Mutation::Replace if out.is_empty() => Mutation::Insert,
            other => other,
        };
        let mutation = match mutation {
            Mutation::Insert | Mutation::Replace if self.templates.is_empty() => {
                if out.is_empty() {
                    return out;
                }
                Mutation::DeleteSpan
            }
            other => other,
        };

        match mutation {
            Mutation::DeleteSpan => {
                let start = self.rng.random_range(0..out.len());
                let end = self.rng.random_range(start + 1..=out.len());
                out.drain(start..end);
            }
            Mutation::Swap => {
                let a = self.rng.random_range(0..out.len());
                let b = self.rng.random_range(0..out.len());
                out.swap(a, b);
            }
            Mutation::Insert => {
                let at = self.rng.random_range(0..=out.len());
                let template = self.random_template();
                out.insert(at, template);
            }
            Mutation::Replace => {
                let at = self.rng.random_range(0..out.len());
                out[at] = self.random_template();
            }
        }
        out
    }

    fn random_template(&mut self) -> String {
        let i = self.rng.random_range(0..self.templates.len());
        self.templates[i].clone()
    }

    /// One randomly chosen mutation of `trace`.
    pub fn mutate(&mut self, trace: &[String]) -> Vec<String> {
        let mutation = Mutation::ALL[self.rng.random_range(0..Mutation::ALL.len())];
        self.apply(trace, mutation)
    }

    /// A mutant of `trace` the graph rejects, or `None` after
    /// `max_attempts` accepted mutants.
    pub fn false_trace_from(&mut self, trace: &[String]) -> Result<Option<Vec<String>>> {
        for _ in 0..self.max_attempts {
            let candidate = self.mutate(trace);
            if !self.graph.match_log_template_trace(&candidate)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Up to `amount` false traces, each derived from a randomly chosen
    /// true trace.
    pub fn generate(&mut self, true_traces: &[Vec<String>], amount: usize) -> Result<Vec<Vec<String>>> {
        let mut out = Vec::with_capacity(amount);
        if true_traces.is_empty() {
            return Ok(out);
        }
        let mut gave_up = 0usize;
        for _ in 0..amount {
            let source = &true_traces[self.rng.random_range(0..true_traces.len())];
            match self.false_trace_from(source)? {
                Some(trace) => out.push(trace),
                None => gave_up += 1,
            }
        }
        debug!(generated = out.len(), gave_up, "False traces generated");
        Ok(out)
    }
}
