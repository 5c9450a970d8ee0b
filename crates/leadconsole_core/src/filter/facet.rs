//! Facet toggle engine.
//!
//! # Responsibility
//! - Hold set-valued filter dimensions with insertion order.
//! - Provide the add-if-absent / remove-if-present toggle.
//!
//! # Invariants
//! - A `FacetSet` never contains the same value twice.
//! - Re-adding a removed value appends it at the end; the original position is
//!   not restored. Callers and tests depend on this ordering.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Whitespace runs, collapsed when normalizing facet terms and free text.
pub(crate) static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Named set-valued filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Status,
    LeadQuality,
    Intent,
    Area,
    Tag,
}

impl Facet {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::LeadQuality => "lead-quality",
            Self::Intent => "intent",
            Self::Area => "area",
            Self::Tag => "tag",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "status" => Some(Self::Status),
            "lead-quality" | "leadQuality" => Some(Self::LeadQuality),
            "intent" => Some(Self::Intent),
            "area" => Some(Self::Area),
            "tag" => Some(Self::Tag),
            _ => None,
        }
    }

    /// Whether values of this facet come from a fixed enumeration.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Status | Self::LeadQuality | Self::Intent)
    }
}

impl Display for Facet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplicated, insertion-ordered set of facet values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetSet<T> {
    values: Vec<T>,
}

impl<T> Default for FacetSet<T> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T: PartialEq> FacetSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.values.contains(value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    fn push_unique(&mut self, value: T) {
        if !self.values.contains(&value) {
            self.values.push(value);
        }
    }
}

impl<T: PartialEq> FromIterator<T> for FacetSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.push_unique(value);
        }
        set
    }
}

impl<T: PartialEq, const N: usize> From<[T; N]> for FacetSet<T> {
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<T: PartialEq> From<Vec<T>> for FacetSet<T> {
    fn from(values: Vec<T>) -> Self {
        values.into_iter().collect()
    }
}

impl<'a, T> IntoIterator for &'a FacetSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<T: Serialize> Serialize for FacetSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + PartialEq> Deserialize<'de> for FacetSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<T>::deserialize(deserializer)?;
        Ok(values.into_iter().collect())
    }
}

/// Returns `set` without `value` when present, otherwise `set` with `value`
/// appended at the end.
pub fn toggle<T: PartialEq + Clone>(set: &FacetSet<T>, value: T) -> FacetSet<T> {
    if set.contains(&value) {
        set.iter().filter(|item| **item != value).cloned().collect()
    } else {
        let mut next = set.clone();
        next.values.push(value);
        next
    }
}

/// Normalizes one open-vocabulary facet term (area, tag).
///
/// Lowercases, trims and collapses inner whitespace into `-`. Returns `None`
/// for blank input.
pub fn normalize_term(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(WHITESPACE_RE.replace_all(&trimmed.to_lowercase(), "-").into_owned())
}

/// Normalizes a whole open-vocabulary set, dropping blanks and duplicates
/// produced by normalization while keeping first-seen order.
pub fn normalize_terms(set: &FacetSet<String>) -> FacetSet<String> {
    set.iter().filter_map(|raw| normalize_term(raw)).collect()
}
