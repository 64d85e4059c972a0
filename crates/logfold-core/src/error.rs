//! Error types for logfold-core

use std::fmt::Write;
use thiserror::Error;

use crate::state_graph::StateId;

/// Remediation command for resolving an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RemediationCommand {
    /// Short label describing the command purpose
    pub label: String,
    /// Command to run
    pub command: String,
}

/// Actionable remediation guidance for an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Remediation {
    /// One-line summary of how to fix the issue
    pub summary: String,
    /// Suggested commands to resolve or diagnose the issue
    pub commands: Vec<RemediationCommand>,
    /// Additional alternative guidance
    pub alternatives: Vec<String>,
}

impl Remediation {
    /// Create a new remediation with a summary
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            commands: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    /// Add a command
    #[must_use]
    pub fn command(mut self, label: impl Into<String>, command: impl Into<String>) -> Self {
        self.commands.push(RemediationCommand {
            label: label.into(),
            command: command.into(),
        });
        self
    }

    /// Add an alternative suggestion
    #[must_use]
    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Render remediation text for human-readable output
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "To fix:");
        let _ = writeln!(output, "  {}", self.summary);

        if !self.commands.is_empty() {
            let _ = writeln!(output, "  Commands:");
            for cmd in &self.commands {
                let _ = writeln!(output, "    - {}: {}", cmd.label, cmd.command);
            }
        }

        if !self.alternatives.is_empty() {
            let _ = writeln!(output, "  Alternatives:");
            for alt in &self.alternatives {
                let _ = writeln!(output, "    - {alt}");
            }
        }

        output
    }
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for logfold-core
#[derive(Error, Debug)]
pub enum Error {
    /// Structural graph errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Markov chain / compression errors
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// Template classification errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A worker thread in a training or evaluation pool panicked
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),
}

impl Error {
    /// Return remediation guidance when available.
    #[must_use]
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::Graph(err) => Some(err.remediation()),
            Self::Chain(err) => Some(err.remediation()),
            Self::Template(err) => Some(err.remediation()),
            Self::Config(err) => Some(err.remediation()),
            Self::Io(_) => Some(
                Remediation::new("Check filesystem permissions and paths, then retry.")
                    .alternative("Verify the corpus directory exists and is readable."),
            ),
            Self::Json(_) => Some(
                Remediation::new("Validate the JSON input and retry.")
                    .command("Validate JSON", "jq . input.json")
                    .alternative("Check for trailing commas or invalid UTF-8."),
            ),
            Self::WorkerPanicked(_) => Some(
                Remediation::new("A worker panicked. Check logs for the panic message and retry.")
                    .command("Single worker run", "logfold --type=accuracy --workers 1")
                    .alternative("If the panic persists, report the issue with the backtrace."),
            ),
        }
    }
}

/// State graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Operation referenced a state absent from the graph
    #[error("State not found: {0}")]
    StateNotFound(StateId),

    /// Duplicate insertion of a state handle
    #[error("State already exists: {0}")]
    StateAlreadyExists(StateId),

    /// More than one outgoing state accepted the same template
    #[error("Non-determinism at state {state}: {matches} successors accept template {template:?}")]
    NonDeterminism {
        state: StateId,
        template: String,
        matches: usize,
    },

    /// Attempted to merge a state into itself
    #[error("Cannot merge state {0} into itself")]
    SelfMerge(StateId),
}

impl GraphError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::StateNotFound(_) => Remediation::new(
                "The state handle is stale. Handles of merged states are retired; use the handle returned by the merge.",
            )
            .alternative("Re-resolve the state after every merge or determinize call."),
            Self::StateAlreadyExists(_) => {
                Remediation::new("The saved graph contains a duplicate state handle.")
                    .alternative("Regenerate the graph file from the training corpus.")
            }
            Self::NonDeterminism { .. } => Remediation::new(
                "The graph is non-deterministic. Run determinize after every structural change.",
            )
            .alternative("Rebuild the graph from the corpus if it was edited by hand."),
            Self::SelfMerge(_) => Remediation::new("Pick two distinct states to merge."),
        }
    }
}

/// Markov chain and compression errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    /// The template tree names the same template twice
    #[error("Duplicate template name: {0}")]
    DuplicateTemplateName(String),

    /// The classifier produced a template the chain does not know
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    /// Attempted to merge a matrix state into itself
    #[error("Cannot merge matrix state {0} into itself")]
    SelfMerge(usize),

    /// Matrix index outside the live range
    #[error("Index {index} out of range for matrix of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    /// Compression asked to shrink the matrix to zero states
    #[error("Minimum size must be at least 1")]
    InvalidMinimumSize,

    /// A merge candidate with fewer than two states
    #[error("Candidate must name at least two states, got {0}")]
    EmptyCandidate(usize),
}

impl ChainError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::DuplicateTemplateName(name) => Remediation::new(format!(
                "Template {name:?} appears more than once in the template tree. Rename one of the leaves."
            )),
            Self::UnknownTemplate(_) => Remediation::new(
                "The classifier and the chain were built from different template trees.",
            )
            .alternative("Build the chain from the same template tree used for classification."),
            Self::SelfMerge(_) | Self::EmptyCandidate(_) => {
                Remediation::new("Merge candidates must name at least two distinct states.")
            }
            Self::IndexOutOfRange { .. } => Remediation::new(
                "The matrix index is stale. Indices above a merged state shift down by one.",
            ),
            Self::InvalidMinimumSize => Remediation::new("Set compression.min_size to 1 or more.")
                .command("Edit config", "$EDITOR logfold.toml"),
        }
    }
}

/// Template classification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A node pattern failed to compile
    #[error("Invalid pattern in node {node:?}: {reason}")]
    InvalidPattern { node: String, reason: String },

    /// The tree has no leaves
    #[error("Template tree has no leaves")]
    EmptyTree,

    /// A log line matched no template
    #[error("Line {line} of {origin} matches no template")]
    Unclassified { origin: String, line: usize },
}

impl TemplateError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::InvalidPattern { .. } => {
                Remediation::new("Fix the regex in the template tree file.")
                    .alternative("Patterns use Rust regex syntax (no look-around).")
            }
            Self::EmptyTree => Remediation::new("Add at least one leaf template to the tree."),
            Self::Unclassified { .. } => Remediation::new(
                "Extend the template tree so every log line of the corpus is classified.",
            )
            .alternative("Add a catch-all leaf with pattern \".*\" as the last child."),
        }
    }
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file {0}: {1}")]
    ReadFailed(String, String),

    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    #[error("Invalid config: {0}")]
    ValidationError(String),
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::FileNotFound(path) => {
                Remediation::new(format!("Create the config file or point to it: {path}"))
                    .command("Use explicit config", "logfold --config ./logfold.toml")
            }
            Self::ReadFailed(path, _) => {
                Remediation::new(format!("Check read permissions for {path}."))
            }
            Self::ParseFailed(_) => Remediation::new("Fix the TOML syntax in the config file.")
                .alternative("Compare against the documented defaults."),
            Self::ValidationError(_) => {
                Remediation::new("Adjust the offending value to its documented range.")
            }
        }
    }
}
