//! logfold-core: learning and compressing models of program log behavior
//!
//! Two engines share one state space of log templates:
//!
//! - a **state graph**: an automaton whose states accept sets of templates,
//!   kept deterministic under arbitrary state merges;
//! - a **Markov chain**: a transition-probability matrix greedily compressed
//!   by merging states while tracking specificity and recall against true
//!   and false traces.
//!
//! # Architecture
//!
//! ```text
//! log lines → TemplateClassifier → template traces
//!                                      ├─→ StateGraph (prefix tree, merge, determinize)
//!                                      └─→ MarkovChain (train → compress → build_graph)
//!                                                ↑
//!                             EvaluationSet (true + generated false traces)
//! ```
//!
//! # Modules
//!
//! - `sparse_adjacency`: sparse labeled edge storage with bulk re-parenting
//! - `state_graph`: the automaton, its merge/determinize fixpoint, matching, persistence
//! - `state_index`: template name → matrix index mapping
//! - `transition_matrix`: dense square probability matrix
//! - `markov_chain`: training, candidate discovery, scoring, compression, export
//! - `evaluation`: specificity/recall/precision of a matrix
//! - `false_traces`: negative examples by mutating true traces
//! - `template_tree`: classifier trait and the JSON regex tree
//! - `corpus`: trace directories, partitioning, folds
//! - `worker_pool`: static-partition scoped threads
//! - `report`: append-only CSV report
//! - `config`: logfold.toml loading and validation
//! - `logging`: tracing subscriber setup
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod false_traces;
pub mod logging;
pub mod markov_chain;
pub mod report;
pub mod sparse_adjacency;
pub mod state_graph;
pub mod state_index;
pub mod template_tree;
pub mod transition_matrix;
pub mod worker_pool;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
