//! Evaluation experiments over a trace corpus.
//!
//! Every run trains a chain on one part of the corpus, scores it against
//! held-out true traces plus generated false traces, compresses it, and
//! appends rows to the CSV report.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use logfold_core::config::Config;
use logfold_core::corpus::{TraceCorpus, condense_repeats};
use logfold_core::evaluation::EvaluationSet;
use logfold_core::false_traces::FalseTraceGenerator;
use logfold_core::markov_chain::{CompressionSummary, MarkovChain};
use logfold_core::report::{ReportRow, ReportWriter};
use logfold_core::state_graph::StateGraph;
use logfold_core::template_tree::{TemplateClassifier, TemplateTree};

/// Experiment selected with `--type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExperimentType {
    /// k-fold cross validation for every configured seed
    Accuracy,
    /// Random training/test subsets of increasing size
    Runtime,
    /// Like accuracy, with random merge candidates
    Random,
}

impl ExperimentType {
    /// Report used when neither the config nor the command line names one.
    pub fn default_report(self) -> PathBuf {
        let name = match self {
            Self::Accuracy => "accuracy_results.csv",
            Self::Runtime => "runtime_results.csv",
            Self::Random => "random_results.csv",
        };
        PathBuf::from("out").join("eval").join(name)
    }
}

pub struct Experiment<'a> {
    config: &'a Config,
    classifier: &'a TemplateTree,
    corpus: TraceCorpus,
    report: ReportWriter,
    workers: usize,
}

impl<'a> Experiment<'a> {
    pub fn new(
        config: &'a Config,
        classifier: &'a TemplateTree,
        corpus: TraceCorpus,
        report: ReportWriter,
        workers: usize,
    ) -> Self {
        Self {
            config,
            classifier,
            corpus,
            report,
            workers,
        }
    }

    /// Run `kind` to completion, returning one summary per trained model.
    pub fn run(&self, kind: ExperimentType) -> Result<Vec<CompressionSummary>> {
        info!(
            experiment = ?kind,
            files = self.corpus.len(),
            report = %self.report.path().display(),
            "Experiment started"
        );
        let summaries = match kind {
            ExperimentType::Accuracy => self.cross_validate(false)?,
            ExperimentType::Random => self.cross_validate(true)?,
            ExperimentType::Runtime => self.runtime()?,
        };
        info!(runs = summaries.len(), "Experiment done");
        Ok(summaries)
    }

    fn cross_validate(&self, random_candidates: bool) -> Result<Vec<CompressionSummary>> {
        let evaluation = &self.config.evaluation;
        let folds = self.corpus.k_fold(evaluation.folds);
        let mut summaries = Vec::new();
        for (round, &seed) in evaluation.seeds.iter().enumerate() {
            for (fold, (train, test)) in folds.iter().enumerate() {
                info!(
                    seed,
                    round = round + 1,
                    rounds = evaluation.seeds.len(),
                    fold = fold + 1,
                    folds = folds.len(),
                    "Cross-validation run"
                );
                summaries.push(self.run_test(train, test, seed, random_candidates, true)?);
            }
        }
        Ok(summaries)
    }

    fn runtime(&self) -> Result<Vec<CompressionSummary>> {
        let evaluation = &self.config.evaluation;
        if self.corpus.is_empty() {
            anyhow::bail!("runtime experiment needs a non-empty corpus");
        }
        let seed = self.config.compression.seed;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut summaries = Vec::new();
        for &size in &evaluation.runtime_sizes {
            for take in 0..evaluation.runtime_repeats {
                let train = self.sample(&mut rng, size);
                let test = self.sample(&mut rng, size);
                info!(size, take = take + 1, "Runtime run");
                summaries.push(self.run_test(
                    &train,
                    &test,
                    seed,
                    false,
                    evaluation.store_intermediate,
                )?);
            }
        }
        Ok(summaries)
    }

    /// `size` files drawn with replacement.
    fn sample(&self, rng: &mut StdRng, size: usize) -> TraceCorpus {
        let indices: Vec<usize> = (0..size)
            .map(|_| rng.random_range(0..self.corpus.len()))
            .collect();
        self.corpus.select(&indices)
    }

    fn run_test(
        &self,
        train: &TraceCorpus,
        test: &TraceCorpus,
        seed: u64,
        random_candidates: bool,
        intermediate: bool,
    ) -> Result<CompressionSummary> {
        let started = Instant::now();
        let mut settings = self.config.compression.clone();
        settings.seed = seed;
        settings.random_candidates |= random_candidates;
        let (min_size, min_accuracy) = (settings.min_size, settings.min_accuracy);

        let mut chain =
            MarkovChain::from_classifier(self.classifier, settings)?.with_workers(self.workers);
        chain
            .train_corpus(train, self.classifier)
            .context("training failed")?;

        let true_traces = condensed(test.load_templates(self.classifier)?);
        let training = train.load_templates(self.classifier)?;
        let prefix_tree = StateGraph::from_traces(&training);
        let amount = (true_traces.len() as f64 * self.config.evaluation.false_trace_ratio).round()
            as usize;
        let false_traces = FalseTraceGenerator::new(
            &prefix_tree,
            self.classifier.template_names(),
            seed,
        )
        .generate(&training, amount)?;
        chain.set_evaluation(EvaluationSet::new(true_traces, condensed(false_traces)));

        let summary = chain.compress_with(min_size, min_accuracy, |step| {
            if intermediate {
                self.report
                    .append(&ReportRow::from_step(step, started.elapsed()))?;
            }
            Ok(())
        })?;
        if !intermediate {
            self.report
                .append(&ReportRow::from_summary(&summary, started.elapsed()))?;
        }
        Ok(summary)
    }
}

/// Condensed copies of `traces`; traces left empty are dropped.
fn condensed(traces: Vec<Vec<String>>) -> Vec<Vec<String>> {
    traces
        .iter()
        .map(|trace| condense_repeats(trace.as_slice()))
        .filter(|trace| !trace.is_empty())
        .collect()
}
