#![no_main]

use logfold_core::state_graph::{StateGraph, StateId};
use libfuzzer_sys::fuzz_target;

const ALPHABET: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn traces_from(bytes: &[u8]) -> Vec<Vec<&'static str>> {
    bytes
        .split(|&b| b == 0xff)
        .map(|chunk| {
            chunk
                .iter()
                .map(|&b| ALPHABET[usize::from(b) % ALPHABET.len()])
                .collect()
        })
        .collect()
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 || data.len() < 2 {
        return;
    }
    let split = usize::from(data[0]) % data.len();
    let (trace_bytes, merge_bytes) = data[1..].split_at(split.min(data.len() - 1));

    let traces = traces_from(trace_bytes);
    let mut graph = StateGraph::from_traces(&traces);
    assert!(graph.find_nondeterminism().is_none());

    for pair in merge_bytes.chunks(2) {
        let live: Vec<StateId> = graph.state_ids().collect();
        if live.len() < 2 {
            break;
        }
        let keep = live[usize::from(pair[0]) % live.len()];
        let discard = live[usize::from(*pair.last().unwrap_or(&0)) % live.len()];
        if keep == discard {
            assert!(graph.merge_states(keep, discard).is_err());
            continue;
        }
        graph
            .full_merge_states(keep, discard)
            .expect("merging two live states succeeds");
        assert!(
            graph.find_nondeterminism().is_none(),
            "nondeterminism after merging {discard} into {keep}"
        );
    }

    let before = graph.len();
    let start = graph.start();
    graph.determinize(start).expect("start state is live");
    assert_eq!(graph.len(), before, "determinize is not idempotent");
});
