//! Markov-chain model of log behavior and its greedy compressor.
//!
//! ```text
//!   traces ──► count transitions ──► normalize ──► prune unreachable
//!                                                        │
//!        ┌───────────────────────────────────────────────┘
//!        ▼
//!   ┌─────────────────────── compress ───────────────────────┐
//!   │ snapshot                                               │
//!   │ candidates at threshold 0, step, 2·step … until found  │
//!   │ split candidates that would undershoot min_size        │
//!   │ score every candidate on a private copy (parallel)     │
//!   │ commit the best, re-measure accuracy                   │
//!   └─ repeat while size > min_size and accuracy > floor ────┘
//!        │
//!        ▼
//!   floor breached? ──► roll back matrix + index to snapshot
//! ```
//!
//! Candidates come from three heuristics: groups of near-identical rows,
//! groups of near-identical columns, and chains of near-certain
//! transitions. A random-pair mode exists as a baseline.
//!
//! The search is greedy hill-climbing: one merge per iteration, never
//! revisited.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CompressionConfig;
use crate::corpus::{TraceCorpus, load_trace};
use crate::error::{ChainError, Result};
use crate::evaluation::{Accuracy, EvaluationSet};
use crate::state_graph::{EdgeProperties, StateGraph, StateProperties};
use crate::state_index::{ROOT, StateIndex, TERMINAL};
use crate::template_tree::TemplateClassifier;
use crate::transition_matrix::TransitionMatrix;
use crate::worker_pool;

/// Set of matrix indices proposed for merging.
pub type Candidate = Vec<usize>;

/// Score of one candidate. `accuracy` is `None` when the candidate was
/// short-circuited without being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CandidateScore {
    pub score: f64,
    pub accuracy: Option<Accuracy>,
}

/// Progress record emitted after every committed merge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionStep {
    pub iteration: usize,
    pub size: usize,
    pub initial_size: usize,
    pub threshold: f64,
    pub candidates: usize,
    pub best_score: f64,
    pub accuracy: Accuracy,
}

impl CompressionStep {
    /// Fraction of the trained model removed so far.
    #[must_use]
    pub fn compression(&self) -> f64 {
        compression_ratio(self.size, self.initial_size)
    }
}

/// Result of a whole [`MarkovChain::compress`] run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionSummary {
    pub initial_size: usize,
    pub final_size: usize,
    pub iterations: usize,
    pub accuracy: Accuracy,
    pub rolled_back: bool,
}

impl CompressionSummary {
    #[must_use]
    pub fn compression(&self) -> f64 {
        compression_ratio(self.final_size, self.initial_size)
    }
}

fn compression_ratio(size: usize, initial: usize) -> f64 {
    if initial == 0 {
        0.0
    } else {
        1.0 - size as f64 / initial as f64
    }
}

// =============================================================================
// Model
// =============================================================================

#[derive(Debug, Clone)]
pub struct MarkovChain {
    matrix: TransitionMatrix,
    index: StateIndex,
    evaluation: EvaluationSet,
    config: CompressionConfig,
    initial_size: usize,
    workers: usize,
    rng: StdRng,
}

impl MarkovChain {
    /// Untrained chain over root, terminal and `template_names`.
    pub fn new<I, S>(template_names: I, config: CompressionConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let index = StateIndex::new(template_names)?;
        let size = index.size();
        let rng = StdRng::seed_from_u64(config.seed);
        debug!(states = size, "Chain ready");
        Ok(Self {
            matrix: TransitionMatrix::zeros(size),
            index,
            evaluation: EvaluationSet::default(),
            config,
            initial_size: size,
            workers: 0,
            rng,
        })
    }

    /// Chain sized from a classifier's templates.
    pub fn from_classifier<C>(classifier: &C, config: CompressionConfig) -> Result<Self>
    where
        C: TemplateClassifier + ?Sized,
    {
        Self::new(classifier.template_names(), config)
    }

    /// Worker count for training and evaluation (0 = available parallelism).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn set_evaluation(&mut self, evaluation: EvaluationSet) {
        self.evaluation = evaluation;
    }

    #[must_use]
    pub fn matrix(&self) -> &TransitionMatrix {
        &self.matrix
    }

    #[must_use]
    pub fn index(&self) -> &StateIndex {
        &self.index
    }

    #[must_use]
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Live state count.
    #[must_use]
    pub fn size(&self) -> usize {
        self.matrix.size()
    }

    /// State count right after training.
    #[must_use]
    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    /// Accuracy of the live model against the evaluation set.
    #[must_use]
    pub fn evaluate(&self) -> Accuracy {
        self.evaluation.evaluate(&self.matrix, &self.index)
    }

    // ── Training ─────────────────────────────────────────────────────────

    /// Train on already-classified template traces.
    pub fn train_traces(&mut self, traces: &[Vec<String>]) -> Result<()> {
        info!(traces = traces.len(), "Training started");
        let size = self.index.size();
        let index = &self.index;
        let partials = worker_pool::map_chunks(traces, self.workers, |chunk| {
            let mut counts = TransitionMatrix::zeros(size);
            for trace in chunk {
                count_trace(&mut counts, index, trace)?;
            }
            Ok::<_, crate::Error>(counts)
        })?;
        self.finish_training(partials)
    }

    /// Train on a corpus directory, classifying lines inside the workers.
    pub fn train_corpus<C>(&mut self, corpus: &TraceCorpus, classifier: &C) -> Result<()>
    where
        C: TemplateClassifier + ?Sized,
    {
        info!(files = corpus.len(), "Training started");
        let size = self.index.size();
        let index = &self.index;
        let partials = worker_pool::map_chunks(corpus.files(), self.workers, |files| {
            let mut counts = TransitionMatrix::zeros(size);
            for path in files {
                let trace = load_trace(path, classifier)?;
                count_trace(&mut counts, index, &trace)?;
            }
            Ok::<_, crate::Error>(counts)
        })?;
        self.finish_training(partials)
    }

    fn finish_training(&mut self, partials: Vec<Result<TransitionMatrix>>) -> Result<()> {
        let mut counts = TransitionMatrix::zeros(self.index.size());
        let workers = partials.len();
        for partial in partials {
            counts.accumulate(&partial?)?;
        }
        counts.normalize_rows();
        self.matrix = counts;
        let pruned = self.delete_unreachable()?;
        self.matrix.set(TERMINAL, TERMINAL, 1.0);
        self.initial_size = self.matrix.size();
        info!(
            workers,
            pruned,
            states = self.initial_size,
            "Training done"
        );
        Ok(())
    }

    /// Remove states without incoming mass. Root and terminal are kept.
    fn delete_unreachable(&mut self) -> Result<usize> {
        let unreachable: Vec<usize> = (0..self.matrix.size())
            .filter(|&c| c != ROOT && c != TERMINAL && self.matrix.column_sum(c) == 0.0)
            .collect();
        for &c in unreachable.iter().rev() {
            self.matrix.remove_index(c)?;
            self.index.remove(c)?;
        }
        Ok(unreachable.len())
    }

    // ── Candidate discovery ──────────────────────────────────────────────

    /// Greedy groups of rows (or columns) within `threshold` of the group's
    /// first member in L∞ distance. An index joins at most one group.
    #[must_use]
    pub fn find_duplicates(&self, threshold: f64, by_row: bool) -> Vec<Candidate> {
        let n = self.matrix.size();
        let mut assigned = vec![false; n];
        let mut groups = Vec::new();
        for seed in 0..n {
            if assigned[seed] {
                continue;
            }
            let mut group = vec![seed];
            for other in (0..n).filter(|&o| o != seed && !assigned[o]) {
                if self.matrix.distance(seed, other, by_row) <= threshold {
                    group.push(other);
                }
            }
            if group.len() > 1 {
                for &member in &group {
                    assigned[member] = true;
                }
                groups.push(group);
            }
        }
        groups
    }

    /// Chains of near-certain transitions.
    ///
    /// Each state contributes its first non-self successor with probability
    /// at least `1 - threshold`; pairs are then linked end to start.
    #[must_use]
    pub fn find_prop_1(&self, threshold: f64) -> Vec<Candidate> {
        let n = self.matrix.size();
        let pairs = (0..n).filter_map(|r| {
            (0..n)
                .find(|&d| d != r && self.matrix.get(r, d) >= 1.0 - threshold)
                .map(|d| (r, d))
        });

        let mut chains: Vec<Candidate> = Vec::new();
        for (from, to) in pairs {
            let extended = chains
                .iter_mut()
                .find(|chain| chain.last() == Some(&from) && !chain.contains(&to));
            match extended {
                Some(chain) => chain.push(to),
                None => chains.push(vec![from, to]),
            }
        }
        chains
    }

    /// Merge candidates at `threshold`, sorted and deduplicated. Terminal is
    /// taken out of any candidate that also holds the root; what is left
    /// must still name two states.
    pub fn get_candidates(&mut self, threshold: f64) -> Vec<Candidate> {
        if self.config.random_candidates {
            return self.random_candidate().into_iter().collect();
        }

        let mut candidates: Vec<Candidate> = Vec::new();
        let sources = self
            .find_duplicates(threshold, true)
            .into_iter()
            .chain(self.find_duplicates(threshold, false))
            .chain(self.find_prop_1(threshold));
        for mut candidate in sources {
            candidate.sort_unstable();
            candidate.dedup();
            if folds_root_into_terminal(&candidate) {
                candidate.retain(|&i| i != TERMINAL);
            }
            if candidate.len() < 2 {
                continue;
            }
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        candidates
    }

    fn random_candidate(&mut self) -> Option<Candidate> {
        let n = self.matrix.size();
        if n < 3 {
            return None;
        }
        loop {
            let a = self.rng.random_range(0..n);
            let b = self.rng.random_range(0..n);
            if a == b {
                continue;
            }
            let pair = vec![a.min(b), a.max(b)];
            if !folds_root_into_terminal(&pair) {
                return Some(pair);
            }
        }
    }

    // ── Evaluation ───────────────────────────────────────────────────────

    /// Score `candidate` on a private copy of the model.
    ///
    /// `score = weight_size · |candidate| / max_len + weight_accuracy ·
    /// mean(specificity, recall)`. When even perfect accuracy could not lift
    /// the score above `weight_size`, the copy is skipped and the score is 0.
    pub fn evaluate_candidate(&self, candidate: &[usize], max_len: usize) -> Result<CandidateScore> {
        let weight_size = self.config.weight_size;
        let weight_accuracy = self.config.weight_accuracy;
        let size_term = weight_size * candidate.len() as f64 / max_len.max(1) as f64;
        if size_term + weight_accuracy <= weight_size {
            return Ok(CandidateScore::default());
        }

        let mut matrix = self.matrix.clone();
        let mut index = self.index.clone();
        apply_candidate(&mut matrix, &mut index, candidate)?;
        let accuracy = self.evaluation.evaluate(&matrix, &index);
        Ok(CandidateScore {
            score: size_term + weight_accuracy * accuracy.balanced(),
            accuracy: Some(accuracy),
        })
    }

    /// Merge every state of `candidate` into its lowest index.
    pub fn process_candidate(&mut self, candidate: &[usize]) -> Result<()> {
        apply_candidate(&mut self.matrix, &mut self.index, candidate)
    }

    // ── Compression ──────────────────────────────────────────────────────

    /// [`Self::compress_with`] without a progress callback.
    pub fn compress(&mut self, min_size: usize, min_accuracy: f64) -> Result<CompressionSummary> {
        self.compress_with(min_size, min_accuracy, |_| Ok(()))
    }

    /// Greedily merge states until the model has `min_size` states or its
    /// accuracy drops to `min_accuracy`. A step that breaches either floor is
    /// rolled back. `on_step` sees every committed merge.
    pub fn compress_with<F>(
        &mut self,
        min_size: usize,
        min_accuracy: f64,
        mut on_step: F,
    ) -> Result<CompressionSummary>
    where
        F: FnMut(&CompressionStep) -> Result<()>,
    {
        if min_size == 0 {
            return Err(ChainError::InvalidMinimumSize.into());
        }

        let initial_size = self.initial_size;
        let mut accuracy = self.evaluate();
        let mut snapshot = (self.matrix.clone(), self.index.clone(), accuracy);
        let mut iterations = 0usize;

        while self.size() > min_size && accuracy.balanced() > min_accuracy {
            snapshot = (self.matrix.clone(), self.index.clone(), accuracy);

            let (mut candidates, threshold) = self.discover_candidates();
            if candidates.is_empty() {
                info!(size = self.size(), threshold, "No merge candidates left");
                break;
            }
            split_oversized(&mut candidates, self.size() - min_size);
            let max_len = candidates.iter().map(Vec::len).max().unwrap_or(2);

            let (best, best_score) = if candidates.len() > 1 {
                let this = &*self;
                let scores = worker_pool::map_each(&candidates, self.workers, |candidate| {
                    this.evaluate_candidate(candidate, max_len)
                })?
                .into_iter()
                .collect::<Result<Vec<_>>>()?;
                let best = best_position(&scores);
                (best, scores[best])
            } else {
                (0, CandidateScore::default())
            };

            self.process_candidate(&candidates[best])?;
            accuracy = match best_score.accuracy {
                Some(accuracy) => accuracy,
                None => self.evaluate(),
            };
            iterations += 1;

            let step = CompressionStep {
                iteration: iterations,
                size: self.size(),
                initial_size,
                threshold,
                candidates: candidates.len(),
                best_score: best_score.score,
                accuracy,
            };
            debug!(
                iteration = step.iteration,
                size = step.size,
                threshold,
                candidates = step.candidates,
                best_score = step.best_score,
                accuracy = accuracy.balanced(),
                "Compression step"
            );
            on_step(&step)?;
        }

        let mut rolled_back = false;
        if self.size() < min_size || accuracy.balanced() < min_accuracy {
            warn!(
                size = self.size(),
                accuracy = accuracy.balanced(),
                min_size,
                min_accuracy,
                "Floor breached, rolling back last merge"
            );
            (self.matrix, self.index, accuracy) = snapshot;
            rolled_back = true;
        }

        let summary = CompressionSummary {
            initial_size,
            final_size: self.size(),
            iterations,
            accuracy,
            rolled_back,
        };
        info!(
            initial = summary.initial_size,
            final_size = summary.final_size,
            iterations,
            compression = summary.compression(),
            "Compression done"
        );
        Ok(summary)
    }

    /// Escalate the threshold until candidates appear or the ceiling is hit.
    fn discover_candidates(&mut self) -> (Vec<Candidate>, f64) {
        let mut threshold = 0.0;
        loop {
            let candidates = self.get_candidates(threshold);
            if !candidates.is_empty() || threshold >= self.config.max_threshold {
                return (candidates, threshold);
            }
            threshold = (threshold + self.config.threshold_step).min(self.config.max_threshold);
        }
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// The live chain as a [`StateGraph`]: one state per index carrying all
    /// of its template names, one edge per positive transition labeled with
    /// its probability.
    #[must_use]
    pub fn build_graph(&self) -> StateGraph {
        let groups = self.index.groups();
        let names = |i: usize| groups.get(&i).cloned().unwrap_or_default();
        let mut graph = StateGraph::with_endpoints(
            StateProperties::new(names(ROOT)),
            StateProperties::new(names(TERMINAL)).terminal(),
        );
        let mut ids = vec![graph.start(), graph.terminal()];
        for i in 2..self.size() {
            ids.push(graph.add_state(StateProperties::new(names(i))));
        }
        for (r, &from) in ids.iter().enumerate() {
            for (c, &to) in ids.iter().enumerate() {
                let p = self.matrix.get(r, c);
                if p > 0.0 {
                    graph.add_edge(from, to, EdgeProperties::new([p.to_string()]));
                }
            }
        }
        graph
    }
}

fn count_trace(counts: &mut TransitionMatrix, index: &StateIndex, trace: &[String]) -> Result<()> {
    let mut current = ROOT;
    for template in trace {
        let next = index
            .get(template)
            .ok_or_else(|| ChainError::UnknownTemplate(template.clone()))?;
        counts.increment(current, next);
        current = next;
    }
    counts.increment(current, TERMINAL);
    Ok(())
}

fn folds_root_into_terminal(candidate: &[usize]) -> bool {
    candidate.contains(&ROOT) && candidate.contains(&TERMINAL)
}

/// Replace every candidate that would remove more than `budget` states by
/// its consecutive pairs.
fn split_oversized(candidates: &mut Vec<Candidate>, budget: usize) {
    let mut split = Vec::new();
    candidates.retain(|candidate| {
        if candidate.len() - 1 > budget {
            split.extend(candidate.windows(2).map(<[usize]>::to_vec));
            false
        } else {
            true
        }
    });
    for pair in split {
        if !candidates.contains(&pair) {
            candidates.push(pair);
        }
    }
}

/// First position holding the highest score.
fn best_position(scores: &[CandidateScore]) -> usize {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        if score.score > scores[best].score {
            best = i;
        }
    }
    best
}

/// Fold every index of `candidate` into its smallest one.
pub fn apply_candidate(
    matrix: &mut TransitionMatrix,
    index: &mut StateIndex,
    candidate: &[usize],
) -> Result<()> {
    let mut sorted = candidate.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() < 2 {
        return Err(ChainError::EmptyCandidate(sorted.len()).into());
    }
    let keep = sorted[0];
    for (removed, &discard) in sorted[1..].iter().enumerate() {
        let shifted = discard - removed;
        matrix.merge(keep, shifted)?;
        index.merge(keep, shifted)?;
    }
    Ok(())
}
