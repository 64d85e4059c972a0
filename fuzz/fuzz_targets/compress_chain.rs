#![no_main]

use logfold_core::config::CompressionConfig;
use logfold_core::evaluation::EvaluationSet;
use logfold_core::markov_chain::MarkovChain;
use libfuzzer_sys::fuzz_target;

const ALPHABET: [&str; 5] = ["a", "b", "c", "d", "e"];

fn traces_from(bytes: &[u8]) -> Vec<Vec<String>> {
    bytes
        .split(|&b| b == 0xff)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            chunk
                .iter()
                .map(|&b| ALPHABET[usize::from(b) % ALPHABET.len()].to_string())
                .collect()
        })
        .collect()
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 2048 || data.len() < 3 {
        return;
    }
    let min_size = usize::from(data[0] % 6) + 1;
    let random_candidates = data[1] % 2 == 1;
    let split = usize::from(data[2]) % (data.len() - 2);
    let (train_bytes, eval_bytes) = data[3..].split_at(split.min(data.len() - 3));

    let training = traces_from(train_bytes);
    if training.is_empty() {
        return;
    }
    let config = CompressionConfig {
        random_candidates,
        ..CompressionConfig::default()
    };
    let mut chain = MarkovChain::new(ALPHABET, config)
        .expect("alphabet has no duplicates")
        .with_workers(1);
    chain.train_traces(&training).expect("training on known templates");
    chain.set_evaluation(EvaluationSet::new(training.clone(), traces_from(eval_bytes)));

    let initial = chain.size();
    let summary = chain.compress(min_size, -1.0).expect("compression succeeds");
    assert_eq!(summary.final_size, chain.size());
    assert!(chain.size() >= min_size.min(initial));
    assert_eq!(chain.index().size(), chain.matrix().size());
    assert_eq!(summary.accuracy.recall, 1.0, "merges lost a training trace");
});
