//! Per-property clamps applied to processed results.
//!
//! Ranges bound what `process()` publishes; base values are never clamped.

use std::collections::HashMap;

use crate::error::EffectError;

/// Inclusive `[min, max]` bounds. Defaults to `(-inf, +inf)`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const UNBOUNDED: Self = Self {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Rejects inverted bounds and NaN.
    pub fn validate(self, property: &str) -> Result<Self, EffectError> {
        if self.min <= self.max {
            Ok(self)
        } else {
            Err(EffectError::InvalidRange {
                property: property.to_owned(),
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Bounds `value` into the range. NaN passes through unchanged.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return value;
        }
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// One validated [`Range`] per property.
#[derive(Clone, Debug, Default)]
pub struct RangeRegistry {
    ranges: HashMap<String, Range>,
}

impl RangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, property: &str, range: Range) -> Result<(), EffectError> {
        self.ranges
            .insert(property.to_owned(), range.validate(property)?);
        Ok(())
    }

    pub(crate) fn remove(&mut self, property: &str) -> bool {
        self.ranges.remove(property).is_some()
    }

    pub fn get(&self, property: &str) -> Option<Range> {
        self.ranges.get(property).copied()
    }

    fn get_mut(&mut self, property: &str) -> Result<&mut Range, EffectError> {
        self.ranges
            .get_mut(property)
            .ok_or_else(|| EffectError::property_not_found(property))
    }

    pub(crate) fn set(&mut self, property: &str, min: f64, max: f64) -> Result<(), EffectError> {
        let range = Range::new(min, max).validate(property)?;
        *self.get_mut(property)? = range;
        Ok(())
    }

    pub(crate) fn set_min(&mut self, property: &str, min: f64) -> Result<(), EffectError> {
        let current = self.get_mut(property)?;
        *current = Range::new(min, current.max).validate(property)?;
        Ok(())
    }

    pub(crate) fn set_max(&mut self, property: &str, max: f64) -> Result<(), EffectError> {
        let current = self.get_mut(property)?;
        *current = Range::new(current.min, max).validate(property)?;
        Ok(())
    }

    /// Clamps a processed value. Properties without a range pass through.
    pub fn clamp(&self, property: &str, value: f64) -> f64 {
        match self.ranges.get(property) {
            Some(range) => range.clamp(value),
            None => value,
        }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
