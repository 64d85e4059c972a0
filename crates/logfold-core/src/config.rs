//! Configuration management for logfold
//!
//! Handles loading and validation of logfold.toml configuration files.
//! Every section and field has a default, so an empty file is valid.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::logging::LogConfig;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Training settings
    #[serde(default)]
    pub training: TrainingConfig,

    /// Compression search settings
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Evaluation and reporting settings
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Template tree settings
    #[serde(default)]
    pub templates: TemplatesConfig,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}. Expected pretty or json")),
        }
    }
}

/// General configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Optional append-only log file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            log_file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Training configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrainingConfig {
    /// Worker threads for training and candidate evaluation (0 = all cores)
    #[serde(default)]
    pub workers: usize,
}

/// Compression search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Weight of the size term in the candidate score
    #[serde(default = "default_weight")]
    pub weight_size: f64,

    /// Weight of the accuracy term in the candidate score
    #[serde(default = "default_weight")]
    pub weight_accuracy: f64,

    /// Stop once the model has this many states
    #[serde(default = "default_min_size")]
    pub min_size: usize,

    /// Stop once mean(specificity, recall) falls to this value
    #[serde(default = "default_min_accuracy")]
    pub min_accuracy: f64,

    /// Threshold increment while searching for candidates
    #[serde(default = "default_threshold_step")]
    pub threshold_step: f64,

    /// Threshold at which the search gives up
    #[serde(default = "default_max_threshold")]
    pub max_threshold: f64,

    /// Use random pairs instead of the heuristics
    #[serde(default)]
    pub random_candidates: bool,

    /// Seed for random candidates and false traces
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            weight_size: default_weight(),
            weight_accuracy: default_weight(),
            min_size: default_min_size(),
            min_accuracy: default_min_accuracy(),
            threshold_step: default_threshold_step(),
            max_threshold: default_max_threshold(),
            random_candidates: false,
            seed: default_seed(),
        }
    }
}

fn default_weight() -> f64 {
    0.5
}

fn default_min_size() -> usize {
    1
}

fn default_min_accuracy() -> f64 {
    -1.0
}

fn default_threshold_step() -> f64 {
    0.001
}

fn default_max_threshold() -> f64 {
    1.0
}

fn default_seed() -> u64 {
    5
}

/// Evaluation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// CSV report file; no report when unset
    #[serde(default)]
    pub report_file: Option<PathBuf>,

    /// Write one row per compression step instead of one per run
    #[serde(default)]
    pub store_intermediate: bool,

    /// Folds for cross validation
    #[serde(default = "default_folds")]
    pub folds: usize,

    /// False traces generated per true test trace
    #[serde(default = "default_false_trace_ratio")]
    pub false_trace_ratio: f64,

    /// Seeds looped over by the accuracy experiments
    #[serde(default = "default_seeds")]
    pub seeds: Vec<u64>,

    /// Training-set sizes for the runtime experiment
    #[serde(default = "default_runtime_sizes")]
    pub runtime_sizes: Vec<usize>,

    /// Repetitions per runtime size
    #[serde(default = "default_runtime_repeats")]
    pub runtime_repeats: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            report_file: None,
            store_intermediate: false,
            folds: default_folds(),
            false_trace_ratio: default_false_trace_ratio(),
            seeds: default_seeds(),
            runtime_sizes: default_runtime_sizes(),
            runtime_repeats: default_runtime_repeats(),
        }
    }
}

fn default_folds() -> usize {
    5
}

fn default_false_trace_ratio() -> f64 {
    1.0
}

fn default_seeds() -> Vec<u64> {
    vec![5, 6, 7]
}

fn default_runtime_sizes() -> Vec<usize> {
    vec![100, 250, 500, 750, 1000]
}

fn default_runtime_repeats() -> usize {
    2
}

/// Template tree configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// JSON template tree
    #[serde(default = "default_templates_path")]
    pub path: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            path: default_templates_path(),
        }
    }
}

fn default_templates_path() -> PathBuf {
    PathBuf::from("templates.json")
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.display().to_string(), e.to_string()))?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values outside their documented ranges
    pub fn validate(&self) -> Result<()> {
        let c = &self.compression;
        for (name, weight) in [
            ("weight_size", c.weight_size),
            ("weight_accuracy", c.weight_accuracy),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(invalid(format!(
                    "compression.{name} must be within [0, 1], got {weight}"
                )));
            }
        }
        if c.min_size == 0 {
            return Err(invalid("compression.min_size must be at least 1".to_string()));
        }
        if c.threshold_step <= 0.0 || c.threshold_step.is_nan() {
            return Err(invalid(format!(
                "compression.threshold_step must be positive, got {}",
                c.threshold_step
            )));
        }
        if c.max_threshold < 0.0 || c.max_threshold.is_nan() {
            return Err(invalid(format!(
                "compression.max_threshold must not be negative, got {}",
                c.max_threshold
            )));
        }
        if self.evaluation.folds < 2 {
            return Err(invalid(format!(
                "evaluation.folds must be at least 2, got {}",
                self.evaluation.folds
            )));
        }
        if self.evaluation.false_trace_ratio < 0.0 || self.evaluation.false_trace_ratio.is_nan() {
            return Err(invalid(
                "evaluation.false_trace_ratio must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Logging settings of the `[general]` section
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.general.log_level.clone(),
            format: self.general.log_format,
            file: self.general.log_file.clone(),
        }
    }
}

fn invalid(message: String) -> crate::Error {
    ConfigError::ValidationError(message).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.compression.min_size, 1);
        assert_eq!(config.compression.min_accuracy, -1.0);
        assert_eq!(config.evaluation.folds, 5);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [general]
            log_format = "json"

            [compression]
            weight_size = 0.8
            random_candidates = true
            "#,
        )
        .unwrap();
        assert_eq!(config.general.log_format, LogFormat::Json);
        assert_eq!(config.compression.weight_size, 0.8);
        assert_eq!(config.compression.weight_accuracy, 0.5);
        assert!(config.compression.random_candidates);
        assert_eq!(config.compression.threshold_step, 0.001);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for text in [
            "[compression]\nweight_size = 1.5",
            "[compression]\nmin_size = 0",
            "[compression]\nthreshold_step = 0.0",
            "[evaluation]\nfolds = 1",
        ] {
            let err = Config::from_toml(text).unwrap_err();
            assert!(
                matches!(err, Error::Config(ConfigError::ValidationError(_))),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn bad_syntax_is_a_parse_error() {
        let err = Config::from_toml("[compression\nweight_size = ").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn load_from_missing_file() {
        let err = Config::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logfold.toml");
        std::fs::write(&path, "[training]\nworkers = 3\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.training.workers, 3);
        assert_eq!(config.log_config().level, "info");
    }

    #[test]
    fn log_format_parse_and_display() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
