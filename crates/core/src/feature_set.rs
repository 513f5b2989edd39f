//! Declared, ordered feature list.
//!
//! A `FeatureSet` is an immutable value passed into fusion and assembly so
//! that concurrent pipelines never share column lists through global state.

use crate::columns::{BASE_FEATURES, OPTIONAL_FEATURES};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered list of feature column names consumed by a model.
///
/// Names are unique; deserialization goes through the same first-occurrence
/// resolution as [`FeatureSet::from_names`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSet {
    names: Vec<String>,
}

impl FeatureSet {
    /// Build from an explicit list, keeping the first occurrence of any
    /// repeated name.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::resolve(names).0
    }

    /// Like [`FeatureSet::from_names`], also returning the repeated names that
    /// were dropped.
    pub fn resolve<I, S>(names: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut dropped = Vec::new();
        for name in names.into_iter().map(Into::into) {
            if seen.insert(name.clone()) {
                kept.push(name);
            } else {
                dropped.push(name);
            }
        }
        (Self { names: kept }, dropped)
    }

    /// The canonical base feature set.
    pub fn base() -> Self {
        Self::from_names(BASE_FEATURES.iter().copied())
    }

    /// Base features followed by the optional time/return features.
    pub fn with_optional() -> Self {
        Self::from_names(BASE_FEATURES.iter().chain(OPTIONAL_FEATURES).copied())
    }

    /// Base or extended set depending on `use_optional`.
    pub fn canonical(use_optional: bool) -> Self {
        if use_optional {
            Self::with_optional()
        } else {
            Self::base()
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl From<Vec<String>> for FeatureSet {
    fn from(names: Vec<String>) -> Self {
        Self::from_names(names)
    }
}

impl From<FeatureSet> for Vec<String> {
    fn from(set: FeatureSet) -> Self {
        set.names
    }
}
