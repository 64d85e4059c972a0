//! Property-based tests for the sparse_adjacency module.
//!
//! Checks that the forward and reverse maps stay consistent under random
//! insert/remove/re-parent sequences, against a naive edge-set model.

use std::collections::BTreeSet;

use proptest::prelude::*;

use logfold_core::sparse_adjacency::SparseAdjacency;

// =============================================================================
// Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Insert(u64, u64),
    Remove(u64, u64),
    Merge(u64, u64),
}

fn arb_node() -> impl Strategy<Value = u64> {
    0u64..12
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => (arb_node(), arb_node()).prop_map(|(a, b)| Op::Insert(a, b)),
        2 => (arb_node(), arb_node()).prop_map(|(a, b)| Op::Remove(a, b)),
        2 => (arb_node(), arb_node()).prop_map(|(a, b)| Op::Merge(a, b)),
    ]
}

fn apply_model(model: &mut BTreeSet<(u64, u64)>, op: &Op) {
    match *op {
        Op::Insert(a, b) => {
            model.insert((a, b));
        }
        Op::Remove(a, b) => {
            model.remove(&(a, b));
        }
        Op::Merge(keep, discard) => {
            if keep == discard {
                return;
            }
            let old: Vec<(u64, u64)> = model.iter().copied().collect();
            model.clear();
            for (s, d) in old {
                let s = if s == discard { keep } else { s };
                let d = if d == discard { keep } else { d };
                model.insert((s, d));
            }
        }
    }
}

fn apply_store(store: &mut SparseAdjacency<()>, op: &Op) {
    match *op {
        Op::Insert(a, b) => {
            store.insert(a, b, ());
        }
        Op::Remove(a, b) => {
            store.remove(a, b);
        }
        Op::Merge(keep, discard) => {
            store.change_parent_of_children(keep, discard);
            store.change_children_of_parents(discard, keep);
        }
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn store_matches_edge_set_model(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut store = SparseAdjacency::new();
        let mut model = BTreeSet::new();
        for op in &ops {
            apply_store(&mut store, op);
            apply_model(&mut model, op);
        }

        let edges: BTreeSet<(u64, u64)> = store.iter().map(|(s, d, _)| (s, d)).collect();
        prop_assert_eq!(&edges, &model);
        prop_assert_eq!(store.len(), model.len());

        for node in 0..12u64 {
            let parents: BTreeSet<u64> = store.parents(node).into_iter().collect();
            let expected: BTreeSet<u64> =
                model.iter().filter(|&&(_, d)| d == node).map(|&(s, _)| s).collect();
            prop_assert_eq!(parents, expected);

            let children: Vec<u64> = store.children(node).into_iter().map(|(d, _)| d).collect();
            let expected: Vec<u64> =
                model.iter().filter(|&&(s, _)| s == node).map(|&(_, d)| d).collect();
            prop_assert_eq!(children, expected);
        }
    }

    #[test]
    fn merge_leaves_discarded_node_isolated(
        edges in prop::collection::vec((arb_node(), arb_node()), 0..40),
        keep in arb_node(),
        discard in arb_node(),
    ) {
        prop_assume!(keep != discard);
        let mut store = SparseAdjacency::new();
        for (a, b) in edges {
            store.insert(a, b, ());
        }
        store.change_parent_of_children(keep, discard);
        store.change_children_of_parents(discard, keep);
        prop_assert!(store.children(discard).is_empty());
        prop_assert!(store.parents(discard).is_empty());
    }

    #[test]
    fn duplicate_insert_is_reported(a in arb_node(), b in arb_node()) {
        let mut store = SparseAdjacency::new();
        prop_assert!(store.insert(a, b, 1u8));
        prop_assert!(!store.insert(a, b, 2u8));
        prop_assert_eq!(store.get(a, b), Some(&1u8));
    }
}
