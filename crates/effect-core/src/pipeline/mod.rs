//! Per-property aggregation pipelines.
//!
//! A [`Pipeline`] is an insertion-ordered list of [`Group`]s. Evaluation is a
//! two-level fold:
//!
//! ```text
//! running = base
//! for group in groups (insertion order):
//!     folded  = fold(group.effect_op, permanent ++ generated)
//!     running = group.base_op(running, folded)
//! ```
//!
//! Group order is part of the observable contract: `Add` and `Mul` groups do
//! not commute. With the default layout (`mul` then `add`) a property is first
//! scaled, then offset.

mod group;
mod registry;

pub use group::{EffectLifetime, Group};
pub use registry::PipelineRegistry;

use tracing::trace;

use crate::effect::{EffectId, EffectOp, ValueEffect};
use crate::error::EffectError;
use crate::input::InputVector;

/// The ordered computation attached to one property.
#[derive(Clone, Debug)]
pub struct Pipeline {
    property: String,
    groups: Vec<Group>,
}

impl Pipeline {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            groups: Vec::new(),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Runs every group over `start` in insertion order.
    pub fn calculate(&self, start: f64, inputs: &InputVector) -> f64 {
        self.groups
            .iter()
            .fold(start, |running, group| group.combine(running, inputs))
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name() == name)
    }

    fn group_mut(&mut self, name: &str) -> Result<&mut Group, EffectError> {
        let property = &self.property;
        self.groups
            .iter_mut()
            .find(|group| group.name() == name)
            .ok_or_else(|| EffectError::group_not_found(property, name))
    }

    /// Appends a group; names are unique within a pipeline.
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        base_op: EffectOp,
        effect_op: EffectOp,
    ) -> Result<(), EffectError> {
        let name = name.into();
        if self.group(&name).is_some() {
            return Err(EffectError::DuplicateGroup {
                property: self.property.clone(),
                group: name,
            });
        }

        trace!(
            target: "effect_core::pipeline",
            property = %self.property,
            group = %name,
            base_op = %base_op,
            effect_op = %effect_op,
            "group added"
        );
        self.groups.push(Group::new(name, base_op, effect_op));
        Ok(())
    }

    /// Removes a group and all of its members (exit hooks run).
    ///
    /// Returns the ids of the removed members, or `None` if no such group.
    pub(crate) fn remove_group(&mut self, name: &str, inputs: &InputVector) -> Option<Vec<EffectId>> {
        let index = self.groups.iter().position(|group| group.name() == name)?;
        let mut group = self.groups.remove(index);
        Some(group.drain(inputs))
    }

    /// Adds an effect to the group it targets, running its enter hook.
    ///
    /// Fails without running any hook when the group does not exist.
    pub(crate) fn add_effect(
        &mut self,
        id: EffectId,
        effect: ValueEffect,
        lifetime: EffectLifetime,
        inputs: &InputVector,
    ) -> Result<(), EffectError> {
        let group = self.group_mut(effect.group())?;
        trace!(
            target: "effect_core::pipeline",
            property = %effect.property(),
            group = %effect.group(),
            effect = %id,
            lifetime = %lifetime,
            "effect added"
        );
        group.insert(id, effect, lifetime, inputs);
        Ok(())
    }

    /// Removes an effect from whichever group holds it, running its exit hook.
    pub(crate) fn remove_effect(&mut self, id: EffectId, inputs: &InputVector) -> bool {
        self.groups.iter_mut().any(|group| group.remove(id, inputs))
    }

    pub fn lifetime_of(&self, id: EffectId) -> Option<EffectLifetime> {
        self.groups.iter().find_map(|group| group.lifetime_of(id))
    }

    pub(crate) fn clear_generated(&mut self, inputs: &InputVector) -> Vec<EffectId> {
        self.groups
            .iter_mut()
            .flat_map(|group| group.clear_generated(inputs))
            .collect()
    }

    /// Drops every effect of every group. Returns the removed ids.
    pub(crate) fn drain(&mut self, inputs: &InputVector) -> Vec<EffectId> {
        self.groups
            .iter_mut()
            .flat_map(|group| group.drain(inputs))
            .collect()
    }

    pub fn effect_count(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::ValueKind;

    fn constant(group: &str, value: f64) -> ValueEffect {
        ValueEffect::new("energy_shield", group, ValueKind::Constant(value))
    }

    fn pipeline_with(groups: &[(&str, EffectOp, EffectOp)]) -> Pipeline {
        let mut pipeline = Pipeline::new("energy_shield");
        for (name, base_op, effect_op) in groups {
            pipeline.add_group(*name, *base_op, *effect_op).unwrap();
        }
        pipeline
    }

    #[test]
    fn increased_and_more_groups() {
        let inputs = InputVector::new();
        let mut pipeline = pipeline_with(&[
            ("increased", EffectOp::Mul, EffectOp::Add),
            ("more", EffectOp::Mul, EffectOp::Mul),
        ]);

        let effects = [
            constant("increased", 1.0),
            constant("increased", 0.2),
            constant("increased", 0.3),
            constant("more", 1.1),
            constant("more", 1.2),
        ];
        for (index, effect) in effects.into_iter().enumerate() {
            pipeline
                .add_effect(EffectId(index as u64 + 1), effect, EffectLifetime::Permanent, &inputs)
                .unwrap();
        }

        // 100 × (1.0 + 0.2 + 0.3) × (1.1 × 1.2) = 198
        assert!((pipeline.calculate(100.0, &inputs) - 198.0).abs() < 1e-9);
        assert_eq!(pipeline.effect_count(), 5);
    }

    #[test]
    fn group_order_is_observable() {
        let inputs = InputVector::new();
        let mut mul_first = pipeline_with(&[
            ("mul", EffectOp::Mul, EffectOp::Mul),
            ("add", EffectOp::Add, EffectOp::Add),
        ]);
        let mut add_first = pipeline_with(&[
            ("add", EffectOp::Add, EffectOp::Add),
            ("mul", EffectOp::Mul, EffectOp::Mul),
        ]);
        for pipeline in [&mut mul_first, &mut add_first] {
            pipeline
                .add_effect(EffectId(1), constant("mul", 2.0), EffectLifetime::Permanent, &inputs)
                .unwrap();
            pipeline
                .add_effect(EffectId(2), constant("add", 50.0), EffectLifetime::Permanent, &inputs)
                .unwrap();
        }

        assert_eq!(mul_first.calculate(100.0, &inputs), 250.0);
        assert_eq!(add_first.calculate(100.0, &inputs), 300.0);
    }

    #[test]
    fn duplicate_and_missing_groups_are_reported() {
        let inputs = InputVector::new();
        let mut pipeline = pipeline_with(&[("add", EffectOp::Add, EffectOp::Add)]);

        assert_eq!(
            pipeline.add_group("add", EffectOp::Mul, EffectOp::Mul),
            Err(EffectError::DuplicateGroup {
                property: "energy_shield".into(),
                group: "add".into(),
            })
        );
        assert_eq!(
            pipeline
                .add_effect(EffectId(1), constant("more", 2.0), EffectLifetime::Permanent, &inputs)
                .unwrap_err()
                .error_code(),
            "group_not_found"
        );
    }

    #[test]
    fn removing_group_returns_member_ids() {
        let inputs = InputVector::new();
        let mut pipeline = pipeline_with(&[("add", EffectOp::Add, EffectOp::Add)]);
        pipeline
            .add_effect(EffectId(3), constant("add", 5.0), EffectLifetime::Permanent, &inputs)
            .unwrap();
        pipeline
            .add_effect(EffectId(4), constant("add", 5.0), EffectLifetime::Generated, &inputs)
            .unwrap();

        assert_eq!(pipeline.lifetime_of(EffectId(4)), Some(EffectLifetime::Generated));
        assert_eq!(pipeline.remove_group("add", &inputs), Some(vec![EffectId(3), EffectId(4)]));
        assert_eq!(pipeline.remove_group("add", &inputs), None);
        assert_eq!(pipeline.calculate(10.0, &inputs), 10.0);
    }
}
