//! Log-line classification into templates.
//!
//! The engines only see the [`TemplateClassifier`] trait. [`TemplateTree`]
//! is the regex tree loaded from JSON that the CLI uses:
//!
//! ```json
//! { "name": "all", "children": [
//!     { "name": "db", "pattern": "^db:", "children": [
//!         { "name": "db_open",  "pattern": "open" },
//!         { "name": "db_close", "pattern": "close" } ] },
//!     { "name": "other", "pattern": ".*" } ] }
//! ```
//!
//! A line starts at the root and repeatedly descends into the first child
//! whose pattern matches; the leaf it reaches names the template. The root
//! is a container and never a template itself.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TemplateError};

/// Black-box boundary between raw log lines and template names.
pub trait TemplateClassifier: Sync {
    /// Template name for `line`, or `None` if nothing matches.
    fn classify(&self, line: &str) -> Option<&str>;

    /// Every template this classifier can produce, in a stable order.
    fn template_names(&self) -> Vec<String>;
}

/// Serialized form of one tree node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateNodeSpec {
    pub name: String,
    /// Regex tested with search semantics; empty matches every line.
    pub pattern: String,
    pub children: Vec<TemplateNodeSpec>,
}

#[derive(Debug, Clone)]
struct TemplateNode {
    name: String,
    pattern: Regex,
    children: Vec<TemplateNode>,
}

impl TemplateNode {
    fn compile(spec: &TemplateNodeSpec) -> Result<Self> {
        let pattern = Regex::new(&spec.pattern).map_err(|err| TemplateError::InvalidPattern {
            node: spec.name.clone(),
            reason: err.to_string(),
        })?;
        let children = spec
            .children
            .iter()
            .map(Self::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: spec.name.clone(),
            pattern,
            children,
        })
    }

    fn collect_leaves(&self, out: &mut Vec<String>) {
        if self.children.is_empty() {
            out.push(self.name.clone());
        } else {
            for child in &self.children {
                child.collect_leaves(out);
            }
        }
    }
}

/// Regex syntax tree classifier.
#[derive(Debug, Clone)]
pub struct TemplateTree {
    root: TemplateNode,
}

impl TemplateTree {
    /// Compile a tree. Fails on an invalid regex or a root without children.
    pub fn from_spec(spec: &TemplateNodeSpec) -> Result<Self> {
        if spec.children.is_empty() {
            return Err(TemplateError::EmptyTree.into());
        }
        Ok(Self {
            root: TemplateNode::compile(spec)?,
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let spec: TemplateNodeSpec = serde_json::from_str(text)?;
        Self::from_spec(&spec)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

impl TemplateClassifier for TemplateTree {
    fn classify(&self, line: &str) -> Option<&str> {
        let line = line.trim_end_matches(['\r', '\n']);
        if !self.root.pattern.is_match(line) {
            return None;
        }
        let mut node = &self.root;
        loop {
            node = node
                .children
                .iter()
                .find(|child| child.pattern.is_match(line))?;
            if node.children.is_empty() {
                return Some(&node.name);
            }
        }
    }

    fn template_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for child in &self.root.children {
            child.collect_leaves(&mut names);
        }
        names
    }
}

/// Exact line → template lookup.
#[derive(Debug, Clone, Default)]
pub struct StaticClassifier {
    by_line: HashMap<String, String>,
    names: Vec<String>,
}

impl StaticClassifier {
    #[must_use]
    pub fn new<I, L, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        let mut classifier = Self::default();
        for (line, template) in pairs {
            let template = template.into();
            if !classifier.names.contains(&template) {
                classifier.names.push(template.clone());
            }
            classifier.by_line.insert(line.into(), template);
        }
        classifier
    }

    /// Classifier where every template name classifies as itself.
    #[must_use]
    pub fn identity<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|name| {
            let name = name.into();
            (name.clone(), name)
        }))
    }
}

impl TemplateClassifier for StaticClassifier {
    fn classify(&self, line: &str) -> Option<&str> {
        self.by_line
            .get(line.trim_end_matches(['\r', '\n']))
            .map(String::as_str)
    }

    fn template_names(&self) -> Vec<String> {
        self.names.clone()
    }
}
