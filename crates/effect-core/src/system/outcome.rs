//! Published results of a cycle.

use std::collections::BTreeMap;

use crate::effect::EffectId;

/// Property name → value view, sorted by name.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyValues {
    values: BTreeMap<String, f64>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property: &str) -> Option<f64> {
        self.values.get(property).copied()
    }

    pub fn contains(&self, property: &str) -> bool {
        self.values.contains_key(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn insert(&mut self, property: &str, value: f64) {
        self.values.insert(property.to_owned(), value);
    }

    pub(crate) fn remove(&mut self, property: &str) {
        self.values.remove(property);
    }
}

impl FromIterator<(String, f64)> for PropertyValues {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Summary of one successful `process()` cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessOutcome {
    /// Effects removed by threshold expiry, in registration order.
    pub expired: Vec<EffectId>,

    /// Value effects produced by meta-effect expansion (cleared again at the end).
    pub generated: usize,

    /// Fixed-point iterations the meta expansion needed.
    pub meta_iterations: usize,
}
