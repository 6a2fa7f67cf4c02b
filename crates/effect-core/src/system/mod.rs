//! The effect system orchestrator.
//!
//! [`EffectSystem`] owns the property, pipeline, range and threshold registries,
//! the meta-effect list and the input vector. All mutation flows through its
//! API, which keeps the registries in lockstep: every property has exactly one
//! pipeline and one range, created and destroyed together.
//!
//! `process()` (see `process.rs`) recomputes every property from that base
//! state; it is the only operation that publishes results.

mod outcome;
mod process;

pub use outcome::{ProcessOutcome, PropertyValues};

use tracing::trace;

use crate::config::EffectSystemConfig;
use crate::effect::{Effect, EffectId, EffectIdAllocator, EffectOp, MetaEffect, ValueEffect};
use crate::error::EffectError;
use crate::input::{FromInputValue, InputValue, InputVector};
use crate::pipeline::{EffectLifetime, Group, PipelineRegistry};
use crate::property::{Property, PropertyDef, PropertyRegistry};
use crate::range::{Range, RangeRegistry};
use crate::threshold::{Threshold, ThresholdCondition, ThresholdRegistry};

/// Computes derived property values from base values and active effects.
///
/// # Example
/// ```
/// # use effect_core::{Effect, EffectSystem};
/// let mut system = EffectSystem::new();
/// system.add_property("health", 100.0).unwrap();
/// system.add_effect(Effect::constant("health", "mul", 2.0)).unwrap();
/// system.add_effect(Effect::constant("health", "add", 50.0)).unwrap();
///
/// system.process().unwrap();
/// assert_eq!(system.results().get("health"), Some(250.0));
/// assert_eq!(system.property_value("health"), Ok(100.0));
/// ```
#[derive(Debug, Default)]
pub struct EffectSystem {
    config: EffectSystemConfig,
    ids: EffectIdAllocator,
    properties: PropertyRegistry,
    pipelines: PipelineRegistry,
    ranges: RangeRegistry,
    thresholds: ThresholdRegistry,
    meta_effects: Vec<(EffectId, MetaEffect)>,
    /// One-shot meta effects, consumed by the next cycle.
    queued_meta: Vec<(EffectId, MetaEffect)>,
    inputs: InputVector,
    results: PropertyValues,
}

impl EffectSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EffectSystemConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EffectSystemConfig {
        &self.config
    }

    // ===== properties =====

    /// Adds a property with default options. No-op (`Ok(false)`) if it exists.
    pub fn add_property(&mut self, name: &str, value: f64) -> Result<bool, EffectError> {
        self.add_property_with(PropertyDef::new(name, value))
    }

    /// Adds a property together with its pipeline and range.
    ///
    /// Returns `Ok(false)` without touching anything if the name is taken.
    /// Fails with `DuplicatePosition` if the requested position is taken and
    /// with `InvalidRange` for inverted bounds; nothing is created then.
    pub fn add_property_with(&mut self, def: PropertyDef) -> Result<bool, EffectError> {
        let name = def.name();
        if self.properties.contains(name) {
            return Ok(false);
        }

        let range = def.range().validate(name)?;
        let position = self.pipelines.insert(name, def.position())?;
        self.ranges.insert(name, range)?;

        if def
            .wants_default_groups()
            .unwrap_or(self.config.auto_generate_groups)
        {
            let pipeline = self.pipelines.get_mut(name)?;
            pipeline.add_group(EffectSystemConfig::DEFAULT_MUL_GROUP, EffectOp::Mul, EffectOp::Mul)?;
            pipeline.add_group(EffectSystemConfig::DEFAULT_ADD_GROUP, EffectOp::Add, EffectOp::Add)?;
        }

        self.properties.insert(Property {
            name: name.to_owned(),
            value: def.value(),
            permanent: def.is_permanent(),
            position,
        });

        trace!(
            target: "effect_core::system",
            property = name,
            value = def.value(),
            position,
            permanent = def.is_permanent(),
            "property added"
        );
        Ok(true)
    }

    /// Removes a property, its pipeline (exit hooks run for every effect in it)
    /// and its range. Returns false if there was no such property.
    pub fn remove_property(&mut self, name: &str) -> bool {
        if self.properties.remove(name).is_none() {
            return false;
        }

        if let Some(mut pipeline) = self.pipelines.remove(name) {
            let removed = pipeline.drain(&self.inputs);
            self.thresholds.forget(&removed);
        }
        self.ranges.remove(name);
        self.results.remove(name);
        self.inputs.forget_property(name);

        trace!(target: "effect_core::system", property = name, "property removed");
        true
    }

    /// Base value of a property.
    pub fn property_value(&self, name: &str) -> Result<f64, EffectError> {
        self.properties.value(name)
    }

    /// Overwrites the base value of a property.
    pub fn set_property_value(&mut self, name: &str, value: f64) -> Result<(), EffectError> {
        self.properties.set_value(name, value)
    }

    /// Flags a property whose processed result is carried into its base value
    /// before the next cycle.
    pub fn mark_permanent(&mut self, name: &str, permanent: bool) -> Result<(), EffectError> {
        self.properties.set_permanent(name, permanent)
    }

    pub fn position(&self, name: &str) -> Result<i32, EffectError> {
        self.pipelines
            .position(name)
            .ok_or_else(|| EffectError::property_not_found(name))
    }

    /// Moves a property's pipeline to another evaluation slot.
    pub fn set_position(&mut self, name: &str, position: i32) -> Result<(), EffectError> {
        self.pipelines.set_position(name, position)?;
        self.properties.set_position(name, position)
    }

    // ===== groups =====

    pub fn add_group(
        &mut self,
        property: &str,
        group: &str,
        base_op: EffectOp,
        effect_op: EffectOp,
    ) -> Result<(), EffectError> {
        self.pipelines
            .get_mut(property)?
            .add_group(group, base_op, effect_op)
    }

    /// Removes a group and its effects (exit hooks run). Returns false if the
    /// property has no such group.
    pub fn remove_group(&mut self, property: &str, group: &str) -> Result<bool, EffectError> {
        let pipeline = self.pipelines.get_mut(property)?;
        match pipeline.remove_group(group, &self.inputs) {
            Some(removed) => {
                self.thresholds.forget(&removed);
                trace!(
                    target: "effect_core::system",
                    property,
                    group,
                    effects = removed.len(),
                    "group removed"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Groups of a property in evaluation order.
    pub fn groups(&self, property: &str) -> Result<&[Group], EffectError> {
        self.pipelines
            .get(property)
            .map(|pipeline| pipeline.groups())
            .ok_or_else(|| EffectError::property_not_found(property))
    }

    pub fn group(&self, property: &str, group: &str) -> Result<&Group, EffectError> {
        self.groups(property)?
            .iter()
            .find(|candidate| candidate.name() == group)
            .ok_or_else(|| EffectError::group_not_found(property, group))
    }

    /// Ids of the permanent effects of a group, in insertion order.
    pub fn effects_of_group(&self, property: &str, group: &str) -> Result<Vec<EffectId>, EffectError> {
        Ok(self.group(property, group)?.permanent_ids().collect())
    }

    // ===== effects =====

    /// Registers a permanent effect and returns its id.
    ///
    /// Value effects enter their target group (enter hook runs); meta effects
    /// are executed on every cycle until removed.
    pub fn add_effect(&mut self, effect: Effect) -> Result<EffectId, EffectError> {
        match effect {
            Effect::Value(effect) => self.register_value(effect, EffectLifetime::Permanent),
            Effect::Meta(meta) => {
                let id = self.ids.allocate();
                trace!(target: "effect_core::system", effect = %id, "meta effect added");
                self.meta_effects.push((id, meta));
                Ok(id)
            }
        }
    }

    /// Registers an effect for the next cycle only.
    ///
    /// Value effects join their group's generated list directly, bypassing meta
    /// expansion; meta effects are executed by the next cycle and then dropped.
    pub fn add_temp_effect(&mut self, effect: Effect) -> Result<EffectId, EffectError> {
        match effect {
            Effect::Value(effect) => self.register_value(effect, EffectLifetime::Generated),
            Effect::Meta(meta) => {
                let id = self.ids.allocate();
                trace!(target: "effect_core::system", effect = %id, "one-shot meta effect queued");
                self.queued_meta.push((id, meta));
                Ok(id)
            }
        }
    }

    pub(crate) fn register_value(
        &mut self,
        effect: ValueEffect,
        lifetime: EffectLifetime,
    ) -> Result<EffectId, EffectError> {
        let pipeline = self.pipelines.get_mut(effect.property())?;
        let id = self.ids.allocate();
        pipeline.add_effect(id, effect, lifetime, &self.inputs)?;
        Ok(id)
    }

    /// Removes an active effect (exit hook runs) together with its thresholds.
    /// Returns false if no such effect is active.
    pub fn remove_effect(&mut self, id: EffectId) -> bool {
        let removed = if let Some(index) = self.meta_effects.iter().position(|(meta, _)| *meta == id) {
            self.meta_effects.remove(index);
            true
        } else if let Some(index) = self.queued_meta.iter().position(|(meta, _)| *meta == id) {
            self.queued_meta.remove(index);
            true
        } else {
            self.pipelines.remove_effect(id, &self.inputs)
        };

        if removed {
            self.thresholds.forget(&[id]);
            trace!(target: "effect_core::system", effect = %id, "effect removed");
        }
        removed
    }

    /// How long an active effect stays, or `None` if it is not active.
    pub fn lifetime_of(&self, id: EffectId) -> Option<EffectLifetime> {
        if self.meta_effects.iter().any(|(meta, _)| *meta == id) {
            Some(EffectLifetime::Permanent)
        } else if self.queued_meta.iter().any(|(meta, _)| *meta == id) {
            Some(EffectLifetime::Generated)
        } else {
            self.pipelines.lifetime_of(id)
        }
    }

    pub fn is_active(&self, id: EffectId) -> bool {
        self.lifetime_of(id).is_some()
    }

    /// Ids of the registered (permanent) meta effects.
    pub fn meta_effects(&self) -> impl Iterator<Item = EffectId> + '_ {
        self.meta_effects.iter().map(|(id, _)| *id)
    }

    // ===== thresholds =====

    /// Removes `effect` once input `input` satisfies `condition`.
    pub fn add_threshold(
        &mut self,
        effect: EffectId,
        input: &str,
        condition: ThresholdCondition,
    ) -> Result<(), EffectError> {
        if !self.is_active(effect) {
            return Err(EffectError::EffectNotFound { id: effect });
        }

        trace!(
            target: "effect_core::system",
            effect = %effect,
            input,
            condition = %condition.kind(),
            "threshold added"
        );
        self.thresholds.push(Threshold::new(effect, input, condition));
        Ok(())
    }

    pub fn thresholds(&self) -> &ThresholdRegistry {
        &self.thresholds
    }

    // ===== ranges =====

    pub fn range(&self, property: &str) -> Result<Range, EffectError> {
        self.ranges
            .get(property)
            .ok_or_else(|| EffectError::property_not_found(property))
    }

    pub fn set_range(&mut self, property: &str, min: f64, max: f64) -> Result<(), EffectError> {
        self.ranges.set(property, min, max)
    }

    pub fn set_min(&mut self, property: &str, min: f64) -> Result<(), EffectError> {
        self.ranges.set_min(property, min)
    }

    pub fn set_max(&mut self, property: &str, max: f64) -> Result<(), EffectError> {
        self.ranges.set_max(property, max)
    }

    // ===== inputs =====

    pub fn set_input(&mut self, name: &str, value: impl Into<InputValue>) -> Option<InputValue> {
        self.inputs.set(name, value)
    }

    pub fn input(&self, name: &str) -> Option<&InputValue> {
        self.inputs.get(name)
    }

    pub fn remove_input(&mut self, name: &str) -> bool {
        self.inputs.remove(name)
    }

    /// Typed input retrieval; `None` when missing or of another kind.
    pub fn try_input<T: FromInputValue>(&self, name: &str) -> Option<T> {
        self.inputs.try_get(name)
    }

    pub fn inputs(&self) -> &InputVector {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut InputVector {
        &mut self.inputs
    }

    // ===== views =====

    /// Processed values published by the last successful cycle.
    pub fn results(&self) -> &PropertyValues {
        &self.results
    }

    /// Base values.
    pub fn properties(&self) -> &PropertyRegistry {
        &self.properties
    }

    pub fn pipelines(&self) -> &PipelineRegistry {
        &self.pipelines
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }
}
