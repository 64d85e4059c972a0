//! Property-based tests for the Markov chain and its compressor.
//!
//! Tests cover:
//! - Merging keeps the matrix square, stochastic, and index-aligned
//! - Trained chains accept their training traces, before and after merges
//! - Compression never ends below its size floor
//! - Fixed seeds make random-candidate compression reproducible

use proptest::prelude::*;

use logfold_core::config::CompressionConfig;
use logfold_core::evaluation::{EvaluationSet, trace_accepted};
use logfold_core::markov_chain::{MarkovChain, apply_candidate};
use logfold_core::state_index::{ROOT, StateIndex, TERMINAL};
use logfold_core::transition_matrix::TransitionMatrix;

const ALPHABET: [&str; 5] = ["a", "b", "c", "d", "e"];

// =============================================================================
// Strategies
// =============================================================================

fn arb_trace() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::sample::select(ALPHABET.to_vec()).prop_map(str::to_string),
        1..8,
    )
}

fn arb_traces() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(arb_trace(), 1..10)
}

/// Row-stochastic matrix of the given size.
fn arb_stochastic(size: usize) -> impl Strategy<Value = TransitionMatrix> {
    prop::collection::vec(prop::collection::vec(0u8..10, size), size).prop_map(move |rows| {
        let rows: Vec<Vec<f64>> = rows
            .into_iter()
            .map(|row| {
                let mut row: Vec<f64> = row.into_iter().map(f64::from).collect();
                if row.iter().all(|&c| c == 0.0) {
                    row[0] = 1.0;
                }
                row
            })
            .collect();
        let mut matrix = TransitionMatrix::from_rows(&rows).unwrap();
        matrix.normalize_rows();
        matrix
    })
}

fn trained(traces: &[Vec<String>], config: CompressionConfig) -> MarkovChain {
    let mut chain = MarkovChain::new(ALPHABET, config).unwrap().with_workers(2);
    chain.train_traces(traces).unwrap();
    chain.set_evaluation(EvaluationSet::new(traces.to_vec(), Vec::new()));
    chain
}

// =============================================================================
// Matrix merge properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn merge_keeps_rows_stochastic(
        matrix in arb_stochastic(6),
        keep in 0usize..6,
        discard in 0usize..6,
    ) {
        prop_assume!(keep != discard);
        let mut merged = matrix.clone();
        let at = merged.merge(keep, discard).unwrap();
        prop_assert_eq!(merged.size(), 5);
        prop_assert_eq!(at, if keep > discard { keep - 1 } else { keep });
        for row in 0..merged.size() {
            prop_assert!((merged.row_sum(row) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn merge_averages_row_then_sums_column(
        matrix in arb_stochastic(5),
        discard in 1usize..5,
    ) {
        let mut merged = matrix.clone();
        merged.merge(0, discard).unwrap();
        let survivors: Vec<usize> = (0..5).filter(|&i| i != discard).collect();

        let expected_self = (matrix.get(0, 0) + matrix.get(discard, 0)) / 2.0
            + (matrix.get(0, discard) + matrix.get(discard, discard)) / 2.0;
        prop_assert!((merged.get(0, 0) - expected_self).abs() < 1e-12);

        for (new_row, &old_row) in survivors.iter().enumerate().skip(1) {
            let expected = matrix.get(old_row, 0) + matrix.get(old_row, discard);
            prop_assert!((merged.get(new_row, 0) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn apply_candidate_shrinks_matrix_and_index_together(
        matrix in arb_stochastic(7),
        members in prop::collection::btree_set(0usize..7, 2..5),
    ) {
        let names = ["a", "b", "c", "d", "e"];
        let mut index = StateIndex::new(names).unwrap();
        let mut matrix = matrix;
        let candidate: Vec<usize> = members.iter().copied().collect();
        apply_candidate(&mut matrix, &mut index, &candidate).unwrap();

        prop_assert_eq!(matrix.size(), 7 - (candidate.len() - 1));
        prop_assert_eq!(index.size(), matrix.size());
        prop_assert_eq!(index.name_count(), 7);
        let survivor = candidate[0];
        prop_assert_eq!(index.names_at(survivor).len(), candidate.len());
    }
}

// =============================================================================
// Training and compression properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn trained_chain_accepts_training_traces(traces in arb_traces()) {
        let chain = trained(&traces, CompressionConfig::default());
        for trace in &traces {
            prop_assert!(trace_accepted(chain.matrix(), chain.index(), trace));
        }
        prop_assert_eq!(chain.matrix().get(TERMINAL, TERMINAL), 1.0);
        for row in 0..chain.size() {
            if row != TERMINAL && chain.matrix().row_sum(row) > 0.0 {
                prop_assert!((chain.matrix().row_sum(row) - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn merges_never_lose_recall(traces in arb_traces(), seed in 0u64..1000) {
        let config = CompressionConfig {
            random_candidates: true,
            seed,
            ..CompressionConfig::default()
        };
        let mut chain = trained(&traces, config);
        let summary = chain.compress(2, -1.0).unwrap();
        prop_assert_eq!(summary.accuracy.recall, 1.0);
        prop_assert!(!summary.rolled_back);
        for trace in &traces {
            prop_assert!(trace_accepted(chain.matrix(), chain.index(), trace));
        }
    }

    #[test]
    fn compression_respects_size_floor(traces in arb_traces(), floor in 1usize..5) {
        let mut chain = trained(&traces, CompressionConfig::default());
        let initial = chain.size();
        let summary = chain.compress(floor, -1.0).unwrap();
        prop_assert!(chain.size() >= floor.min(initial));
        prop_assert_eq!(summary.final_size, chain.size());
        prop_assert_eq!(summary.initial_size, initial);
        prop_assert_eq!(chain.index().size(), chain.matrix().size());
        prop_assert!(chain.index().get("root") == Some(ROOT));
    }

    #[test]
    fn random_compression_is_reproducible(traces in arb_traces(), seed in 0u64..1000) {
        let config = CompressionConfig {
            random_candidates: true,
            seed,
            ..CompressionConfig::default()
        };
        let mut first = trained(&traces, config.clone());
        let mut second = trained(&traces, config);
        first.compress(3, -1.0).unwrap();
        second.compress(3, -1.0).unwrap();
        prop_assert_eq!(first.matrix(), second.matrix());
        prop_assert_eq!(first.index(), second.index());
    }
}
