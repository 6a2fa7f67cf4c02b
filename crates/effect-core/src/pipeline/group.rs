//! Named sub-aggregation of a pipeline.

use crate::effect::{EffectId, EffectOp, ValueEffect};
use crate::input::InputVector;

/// How long an effect stays in its group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum EffectLifetime {
    /// Stays until explicitly removed.
    Permanent,
    /// Cleared at the end of the next `process()` cycle.
    Generated,
}

#[derive(Clone, Debug)]
pub(crate) struct ActiveEffect {
    pub(crate) id: EffectId,
    pub(crate) effect: ValueEffect,
}

/// A group folds its member effects with `effect_op` (sum from 0 or product
/// from 1), and the pipeline combines that folded value into its running value
/// with `base_op`.
///
/// Permanent members are only touched by explicit add/remove calls; generated
/// members are dropped by [`Group::clear_generated`] at the end of every cycle.
#[derive(Clone, Debug)]
pub struct Group {
    name: String,
    base_op: EffectOp,
    effect_op: EffectOp,
    permanent: Vec<ActiveEffect>,
    generated: Vec<ActiveEffect>,
}

impl Group {
    pub fn new(name: impl Into<String>, base_op: EffectOp, effect_op: EffectOp) -> Self {
        Self {
            name: name.into(),
            base_op,
            effect_op,
            permanent: Vec::new(),
            generated: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the folded group value combines into the pipeline value.
    pub fn base_op(&self) -> EffectOp {
        self.base_op
    }

    /// How member effects combine with each other.
    pub fn effect_op(&self) -> EffectOp {
        self.effect_op
    }

    /// Folds permanent then generated members. An empty group yields the
    /// identity of `effect_op`.
    pub fn fold(&self, inputs: &InputVector) -> f64 {
        self.permanent
            .iter()
            .chain(&self.generated)
            .fold(self.effect_op.identity(), |acc, active| {
                self.effect_op.apply(acc, active.effect.value(inputs))
            })
    }

    /// Combines this group into the running pipeline value.
    pub fn combine(&self, running: f64, inputs: &InputVector) -> f64 {
        self.base_op.apply(running, self.fold(inputs))
    }

    pub fn permanent_ids(&self) -> impl Iterator<Item = EffectId> + '_ {
        self.permanent.iter().map(|active| active.id)
    }

    pub fn generated_ids(&self) -> impl Iterator<Item = EffectId> + '_ {
        self.generated.iter().map(|active| active.id)
    }

    pub fn len(&self) -> usize {
        self.permanent.len() + self.generated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permanent.is_empty() && self.generated.is_empty()
    }

    pub fn lifetime_of(&self, id: EffectId) -> Option<EffectLifetime> {
        if self.permanent.iter().any(|active| active.id == id) {
            Some(EffectLifetime::Permanent)
        } else if self.generated.iter().any(|active| active.id == id) {
            Some(EffectLifetime::Generated)
        } else {
            None
        }
    }

    /// Runs the enter hook and appends the effect.
    pub(crate) fn insert(
        &mut self,
        id: EffectId,
        mut effect: ValueEffect,
        lifetime: EffectLifetime,
        inputs: &InputVector,
    ) {
        effect.enter(inputs);
        let active = ActiveEffect { id, effect };
        match lifetime {
            EffectLifetime::Permanent => self.permanent.push(active),
            EffectLifetime::Generated => self.generated.push(active),
        }
    }

    /// Removes a member by id, running its exit hook.
    pub(crate) fn remove(&mut self, id: EffectId, inputs: &InputVector) -> bool {
        for list in [&mut self.permanent, &mut self.generated] {
            if let Some(index) = list.iter().position(|active| active.id == id) {
                let mut active = list.remove(index);
                active.effect.exit(inputs);
                return true;
            }
        }
        false
    }

    /// Drops every generated member, running exit hooks. Returns the removed ids.
    pub(crate) fn clear_generated(&mut self, inputs: &InputVector) -> Vec<EffectId> {
        self.generated
            .drain(..)
            .map(|mut active| {
                active.effect.exit(inputs);
                active.id
            })
            .collect()
    }

    /// Drops every member, running exit hooks. Returns the removed ids.
    pub(crate) fn drain(&mut self, inputs: &InputVector) -> Vec<EffectId> {
        self.permanent
            .drain(..)
            .chain(self.generated.drain(..))
            .map(|mut active| {
                active.effect.exit(inputs);
                active.id
            })
            .collect()
    }
}
