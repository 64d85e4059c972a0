//! Template name → matrix index mapping.
//!
//! Index 0 is the root, index 1 the terminal; every template of the
//! classifier gets the next index in enumeration order. Several names map to
//! one index once states have been merged. Live indices are always the dense
//! range `0..size()`.

use std::collections::{BTreeMap, HashMap};

use crate::error::{ChainError, Result};
use crate::state_graph::{ROOT_TEMPLATE, TERMINAL_TEMPLATE};

pub const ROOT: usize = 0;
pub const TERMINAL: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateIndex {
    by_name: HashMap<String, usize>,
    size: usize,
}

impl StateIndex {
    /// Index with root, terminal, and one entry per template name.
    ///
    /// A name seen twice (including `root` or `terminal`) is fatal.
    pub fn new<I, S>(template_names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut by_name = HashMap::new();
        by_name.insert(ROOT_TEMPLATE.to_string(), ROOT);
        by_name.insert(TERMINAL_TEMPLATE.to_string(), TERMINAL);
        for name in template_names {
            let name = name.into();
            let next = by_name.len();
            if by_name.contains_key(&name) {
                return Err(ChainError::DuplicateTemplateName(name).into());
            }
            by_name.insert(name, next);
        }
        let size = by_name.len();
        Ok(Self { by_name, size })
    }

    /// Number of live indices.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of names still mapped.
    #[must_use]
    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Names mapped to `index`, sorted.
    #[must_use]
    pub fn names_at(&self, index: usize) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .by_name
            .iter()
            .filter(|&(_, &i)| i == index)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// All names grouped by index.
    #[must_use]
    pub fn groups(&self) -> BTreeMap<usize, Vec<&str>> {
        let mut groups: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for (name, &index) in &self.by_name {
            groups.entry(index).or_default().push(name.as_str());
        }
        for names in groups.values_mut() {
            names.sort_unstable();
        }
        groups
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.size {
            Ok(())
        } else {
            Err(ChainError::IndexOutOfRange {
                index,
                size: self.size,
            }
            .into())
        }
    }

    /// Re-point every name at `discard` to `keep`, then close the gap.
    ///
    /// Returns the index `keep` occupies afterwards.
    pub fn merge(&mut self, keep: usize, discard: usize) -> Result<usize> {
        if keep == discard {
            return Err(ChainError::SelfMerge(keep).into());
        }
        self.check(keep)?;
        self.check(discard)?;
        let target = if keep > discard { keep - 1 } else { keep };
        for index in self.by_name.values_mut() {
            if *index == discard {
                *index = target;
            } else if *index > discard {
                *index -= 1;
            }
        }
        self.size -= 1;
        Ok(target)
    }

    /// Forget every name at `index` and close the gap.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        self.check(index)?;
        self.by_name.retain(|_, i| *i != index);
        for i in self.by_name.values_mut() {
            if *i > index {
                *i -= 1;
            }
        }
        self.size -= 1;
        Ok(())
    }
}
