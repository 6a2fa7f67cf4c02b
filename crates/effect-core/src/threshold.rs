//! Threshold registry - one-shot conditional expiry of effects.
//!
//! Each entry watches one input. Once per cycle, before meta expansion, the
//! condition is checked against the input's current value; when it holds the
//! watched effect is removed for good and the entry is consumed. Entries never
//! re-fire.

use std::fmt;
use std::sync::Arc;

use crate::effect::EffectId;
use crate::error::EffectError;
use crate::input::{InputValue, InputVector};

/// Custom removal predicate over the watched input value.
pub type InputPredicate = Arc<dyn Fn(&InputValue) -> bool + Send + Sync>;

/// Comparison between the watched input and a limit.
#[derive(Clone)]
pub enum ThresholdCondition {
    /// Input is numeric and strictly greater than the limit.
    Greater(f64),
    /// Input is numeric and strictly smaller than the limit.
    Smaller(f64),
    /// Input equals the limit (integers and floats compare numerically).
    Equals(InputValue),
    NotEquals(InputValue),
    Predicate(InputPredicate),
}

/// Fieldless discriminant of [`ThresholdCondition`], for logs and inspection.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ThresholdKind {
    Greater,
    Smaller,
    Equals,
    NotEquals,
    Predicate,
}

impl ThresholdCondition {
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&InputValue) -> bool + Send + Sync + 'static,
    {
        ThresholdCondition::Predicate(Arc::new(predicate))
    }

    pub fn kind(&self) -> ThresholdKind {
        match self {
            ThresholdCondition::Greater(_) => ThresholdKind::Greater,
            ThresholdCondition::Smaller(_) => ThresholdKind::Smaller,
            ThresholdCondition::Equals(_) => ThresholdKind::Equals,
            ThresholdCondition::NotEquals(_) => ThresholdKind::NotEquals,
            ThresholdCondition::Predicate(_) => ThresholdKind::Predicate,
        }
    }

    /// Evaluates the condition against the value of `input`.
    pub fn is_met(&self, input: &str, value: &InputValue) -> Result<bool, EffectError> {
        let numeric = || {
            value.as_number().ok_or_else(|| EffectError::InputTypeMismatch {
                input: input.to_owned(),
                expected: "number",
                found: value.kind_name(),
            })
        };

        Ok(match self {
            ThresholdCondition::Greater(limit) => numeric()? > *limit,
            ThresholdCondition::Smaller(limit) => numeric()? < *limit,
            ThresholdCondition::Equals(limit) => value == limit,
            ThresholdCondition::NotEquals(limit) => value != limit,
            ThresholdCondition::Predicate(predicate) => predicate(value),
        })
    }
}

impl fmt::Debug for ThresholdCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdCondition::Greater(limit) => f.debug_tuple("Greater").field(limit).finish(),
            ThresholdCondition::Smaller(limit) => f.debug_tuple("Smaller").field(limit).finish(),
            ThresholdCondition::Equals(limit) => f.debug_tuple("Equals").field(limit).finish(),
            ThresholdCondition::NotEquals(limit) => {
                f.debug_tuple("NotEquals").field(limit).finish()
            }
            ThresholdCondition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A registered expiry rule.
#[derive(Clone, Debug)]
pub struct Threshold {
    effect: EffectId,
    input: String,
    condition: ThresholdCondition,
}

impl Threshold {
    pub fn new(effect: EffectId, input: impl Into<String>, condition: ThresholdCondition) -> Self {
        Self {
            effect,
            input: input.into(),
            condition,
        }
    }

    pub fn effect(&self) -> EffectId {
        self.effect
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn condition(&self) -> &ThresholdCondition {
        &self.condition
    }

    fn is_met(&self, inputs: &InputVector) -> Result<bool, EffectError> {
        let value = inputs
            .get(&self.input)
            .ok_or_else(|| EffectError::input_not_found(&self.input))?;
        self.condition.is_met(&self.input, value)
    }
}

/// Pending expiry rules in registration order.
#[derive(Clone, Debug, Default)]
pub struct ThresholdRegistry {
    entries: Vec<Threshold>,
}

impl ThresholdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, threshold: Threshold) {
        self.entries.push(threshold);
    }

    /// Removes and returns every entry whose condition holds.
    ///
    /// All conditions are evaluated before anything is removed, so an error
    /// leaves the registry untouched.
    pub(crate) fn take_expired(&mut self, inputs: &InputVector) -> Result<Vec<Threshold>, EffectError> {
        let met = self
            .entries
            .iter()
            .map(|threshold| threshold.is_met(inputs))
            .collect::<Result<Vec<bool>, _>>()?;

        let mut expired = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for (threshold, met) in self.entries.drain(..).zip(met) {
            if met {
                expired.push(threshold);
            } else {
                kept.push(threshold);
            }
        }
        self.entries = kept;
        Ok(expired)
    }

    /// Drops every entry watching one of `effects`.
    pub(crate) fn forget(&mut self, effects: &[EffectId]) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|threshold| !effects.contains(&threshold.effect));
        before - self.entries.len()
    }

    pub fn for_effect(&self, effect: EffectId) -> impl Iterator<Item = &Threshold> + '_ {
        self.entries
            .iter()
            .filter(move |threshold| threshold.effect == effect)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Threshold> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
