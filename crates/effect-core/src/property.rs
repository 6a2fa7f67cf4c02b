//! Property registry - named base values.
//!
//! Base values are the single source of truth of the system. `process()` reads
//! them but never writes them, except for the carry-forward of permanent
//! properties at the very start of a cycle.

use std::collections::BTreeMap;

use crate::error::EffectError;
use crate::range::Range;

/// A named numeric attribute with a base value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Property {
    pub name: String,
    pub value: f64,
    /// Processed result is written back into `value` before the next cycle.
    pub permanent: bool,
    /// Evaluation slot of the property's pipeline.
    pub position: i32,
}

/// Everything needed to register a property.
///
/// # Example
/// ```
/// # use effect_core::PropertyDef;
/// let def = PropertyDef::new("health", 100.0)
///     .permanent()
///     .at_position(2)
///     .with_range(0.0, 500.0);
/// assert!(def.is_permanent());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDef {
    name: String,
    value: f64,
    permanent: bool,
    position: Option<i32>,
    default_groups: Option<bool>,
    range: Range,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            permanent: false,
            position: None,
            default_groups: None,
            range: Range::UNBOUNDED,
        }
    }

    /// Marks the property permanent (builder pattern).
    #[must_use]
    pub fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }

    /// Requests an explicit pipeline position (builder pattern).
    #[must_use]
    pub fn at_position(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }

    /// Overrides whether the default `mul`/`add` groups are created.
    #[must_use]
    pub fn default_groups(mut self, enabled: bool) -> Self {
        self.default_groups = Some(enabled);
        self
    }

    /// Skips the default `mul`/`add` groups (builder pattern).
    #[must_use]
    pub fn without_default_groups(self) -> Self {
        self.default_groups(false)
    }

    /// Sets the clamp applied to processed results (builder pattern).
    #[must_use]
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Range::new(min, max);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    pub fn position(&self) -> Option<i32> {
        self.position
    }

    /// Explicit choice for default groups; `None` defers to the config.
    pub fn wants_default_groups(&self) -> Option<bool> {
        self.default_groups
    }

    pub fn range(&self) -> Range {
        self.range
    }
}

/// Base values keyed by property name (sorted).
#[derive(Clone, Debug, Default)]
pub struct PropertyRegistry {
    properties: BTreeMap<String, Property>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the property if the name is free. Returns false otherwise.
    pub(crate) fn insert(&mut self, property: Property) -> bool {
        if self.properties.contains_key(&property.name) {
            return false;
        }
        self.properties.insert(property.name.clone(), property);
        true
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Property> {
        self.properties.remove(name)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Property, EffectError> {
        self.properties
            .get_mut(name)
            .ok_or_else(|| EffectError::property_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Base value of a property.
    pub fn value(&self, name: &str) -> Result<f64, EffectError> {
        self.get(name)
            .map(|property| property.value)
            .ok_or_else(|| EffectError::property_not_found(name))
    }

    pub(crate) fn set_value(&mut self, name: &str, value: f64) -> Result<(), EffectError> {
        self.get_mut(name)?.value = value;
        Ok(())
    }

    pub(crate) fn set_permanent(&mut self, name: &str, permanent: bool) -> Result<(), EffectError> {
        self.get_mut(name)?.permanent = permanent;
        Ok(())
    }

    pub(crate) fn set_position(&mut self, name: &str, position: i32) -> Result<(), EffectError> {
        self.get_mut(name)?.position = position;
        Ok(())
    }

    pub fn is_permanent(&self, name: &str) -> bool {
        self.get(name).is_some_and(|property| property.permanent)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.properties.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> + '_ {
        self.properties.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Property> + '_ {
        self.properties.values_mut()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(name: &str, value: f64) -> Property {
        Property {
            name: name.into(),
            value,
            permanent: false,
            position: 0,
        }
    }

    #[test]
    fn insert_is_add_if_absent() {
        let mut registry = PropertyRegistry::new();
        assert!(registry.insert(property("health", 100.0)));
        assert!(!registry.insert(property("health", 5.0)));

        assert_eq!(registry.value("health"), Ok(100.0));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_names_fail_fast() {
        let mut registry = PropertyRegistry::new();
        assert_eq!(
            registry.value("mana"),
            Err(EffectError::PropertyNotFound {
                property: "mana".into()
            })
        );
        assert!(registry.set_value("mana", 1.0).is_err());
        assert!(registry.set_permanent("mana", true).is_err());
        assert!(!registry.is_permanent("mana"));
    }

    #[test]
    fn definition_builder() {
        let def = PropertyDef::new("mana", 50.0).without_default_groups();
        assert_eq!(def.wants_default_groups(), Some(false));
        assert_eq!(def.position(), None);
        assert_eq!(def.range(), Range::UNBOUNDED);
        assert_eq!(PropertyDef::new("mana", 50.0).wants_default_groups(), None);
    }
}
