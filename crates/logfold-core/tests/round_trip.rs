//! End-to-end pipeline over a corpus on disk: classify, train, compress,
//! export, persist, and match raw log lines against the result.

use std::path::Path;

use logfold_core::Error;
use logfold_core::config::CompressionConfig;
use logfold_core::corpus::{TraceCorpus, condense_repeats};
use logfold_core::error::TemplateError;
use logfold_core::evaluation::EvaluationSet;
use logfold_core::false_traces::FalseTraceGenerator;
use logfold_core::markov_chain::MarkovChain;
use logfold_core::report::{ReportRow, ReportWriter};
use logfold_core::state_graph::StateGraph;
use logfold_core::template_tree::{TemplateClassifier, TemplateTree};

const TREE: &str = r#"{
    "name": "service",
    "children": [
        { "name": "conn", "pattern": "^conn ", "children": [
            { "name": "conn_open", "pattern": "opened" },
            { "name": "conn_close", "pattern": "closed" }
        ]},
        { "name": "request", "pattern": "^GET /\\w+" },
        { "name": "retry", "pattern": "^retry #\\d+" },
        { "name": "shutdown", "pattern": "^shutdown" }
    ]
}"#;

const TRACES: &[(&str, &str)] = &[
    ("t00.log", "conn 1 opened\nGET /users\nconn 1 closed\n"),
    ("t01.log", "conn 2 opened\nGET /users\nGET /items\nconn 2 closed\n"),
    ("t02.log", "conn 3 opened\nretry #1\nretry #2\nGET /items\nconn 3 closed\n"),
    ("t03.log", "conn 4 opened\nGET /orders\nconn 4 closed\nshutdown\n"),
    ("t04.log", "conn 5 opened\nretry #1\nGET /users\nconn 5 closed\n"),
    ("t05.log", "conn 6 opened\nGET /a\nGET /b\nGET /c\nconn 6 closed\n"),
    ("t06.log", "conn 7 opened\n\nconn 7 closed\n"),
    ("t07.log", "conn 8 opened\nretry #1\nretry #2\nretry #3\nconn 8 closed\nshutdown\n"),
];

fn write_corpus(dir: &Path) -> TraceCorpus {
    for (name, body) in TRACES {
        std::fs::write(dir.join(name), body).unwrap();
    }
    TraceCorpus::open(dir).unwrap()
}

fn raw_lines(body: &str) -> Vec<&str> {
    body.lines().filter(|l| !l.trim().is_empty()).collect()
}

#[test]
fn tree_classifies_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = write_corpus(dir.path());
    let tree = TemplateTree::from_json(TREE).unwrap();

    assert_eq!(
        tree.template_names(),
        vec!["conn_open", "conn_close", "request", "retry", "shutdown"]
    );
    let traces = corpus.load_templates(&tree).unwrap();
    assert_eq!(traces.len(), TRACES.len());
    assert_eq!(traces[6], vec!["conn_open", "conn_close"]);
    assert_eq!(
        condense_repeats(&traces[7]),
        vec!["conn_open", "retry", "retry", "conn_close", "shutdown"]
    );
}

#[test]
fn unclassified_line_names_file_and_line() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.log"), "conn 1 opened\nPOST /x\n").unwrap();
    let corpus = TraceCorpus::open(dir.path()).unwrap();
    let tree = TemplateTree::from_json(TREE).unwrap();

    let mut chain = MarkovChain::from_classifier(&tree, CompressionConfig::default()).unwrap();
    let err = chain.train_corpus(&corpus, &tree).unwrap_err();
    match err {
        Error::Template(TemplateError::Unclassified { origin, line }) => {
            assert!(origin.ends_with("bad.log"));
            assert_eq!(line, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn trained_chain_exports_graph_accepting_raw_traces() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = write_corpus(dir.path());
    let tree = TemplateTree::from_json(TREE).unwrap();

    let mut chain = MarkovChain::from_classifier(&tree, CompressionConfig::default())
        .unwrap()
        .with_workers(3);
    chain.train_corpus(&corpus, &tree).unwrap();
    assert_eq!(chain.size(), 7);

    let graph = chain.build_graph();
    assert!(graph.find_nondeterminism().is_none());
    for (_, body) in TRACES {
        assert!(graph.match_trace(&raw_lines(body), &tree).unwrap());
    }
    assert!(!graph.match_trace(&["GET /users"], &tree).unwrap());
    assert!(!graph.match_trace(&["conn 1 opened", "DELETE /x"], &tree).unwrap());
}

#[test]
fn collapsed_prefix_tree_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = write_corpus(dir.path());
    let tree = TemplateTree::from_json(TREE).unwrap();
    let traces = corpus.load_templates(&tree).unwrap();

    let mut graph = StateGraph::from_traces(&traces);
    let before = graph.len();
    graph.collapse_repeated_states().unwrap();
    assert!(graph.len() < before);
    assert!(graph.find_nondeterminism().is_none());

    let path = dir.path().join("model.json");
    graph.save(&path).unwrap();
    let loaded = StateGraph::load(&path).unwrap();
    assert_eq!(loaded.snapshot(), graph.snapshot());

    for (_, body) in TRACES {
        assert!(loaded.match_trace(&raw_lines(body), &tree).unwrap());
    }
    // repeated retries fold into a loop, so unseen retry counts pass
    let longer = [
        "conn 9 opened",
        "retry #1",
        "retry #2",
        "retry #3",
        "retry #4",
        "conn 9 closed",
        "shutdown",
    ];
    assert!(loaded.match_trace(&longer, &tree).unwrap());
}

#[test]
fn cross_validated_compression_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let corpus_dir = dir.path().join("corpus");
    std::fs::create_dir(&corpus_dir).unwrap();
    let corpus = write_corpus(&corpus_dir);
    let tree = TemplateTree::from_json(TREE).unwrap();
    let report = ReportWriter::create(&dir.path().join("report.csv")).unwrap();

    let folds = corpus.k_fold(4);
    assert_eq!(folds.len(), 4);
    for (train, test) in &folds {
        assert_eq!(train.len() + test.len(), corpus.len());

        let train_traces = train.load_templates(&tree).unwrap();
        let true_traces: Vec<Vec<String>> = test
            .load_templates(&tree)
            .unwrap()
            .iter()
            .map(|t| condense_repeats(t.as_slice()))
            .collect();
        let reference = StateGraph::from_traces(&corpus.load_templates(&tree).unwrap());
        let false_traces = FalseTraceGenerator::new(&reference, tree.template_names(), 5)
            .generate(&true_traces, true_traces.len())
            .unwrap();

        let mut chain = MarkovChain::from_classifier(&tree, CompressionConfig::default())
            .unwrap()
            .with_workers(2);
        chain.train_traces(&train_traces).unwrap();
        chain.set_evaluation(EvaluationSet::new(true_traces, false_traces));

        let started = std::time::Instant::now();
        let mut steps = 0usize;
        let summary = chain
            .compress_with(3, 0.0, |step| {
                steps += 1;
                report.append(&ReportRow::from_step(step, started.elapsed()))
            })
            .unwrap();
        assert!(summary.final_size >= 3);
        assert!(summary.final_size <= summary.initial_size);
        assert!(steps >= summary.iterations);
        report
            .append(&ReportRow::from_summary(&summary, started.elapsed()))
            .unwrap();
    }

    let rows = ReportWriter::read_rows(report.path()).unwrap();
    assert!(rows.len() >= folds.len());
    for row in rows {
        assert!((0.0..=1.0).contains(&row.compression));
        assert!((0.0..=1.0).contains(&row.specificity));
        assert!((0.0..=1.0).contains(&row.recall));
    }
}
