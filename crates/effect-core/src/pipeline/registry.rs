//! Position-ordered registry of pipelines, one per property.

use std::collections::{BTreeMap, HashMap};

use crate::effect::EffectId;
use crate::error::EffectError;
use crate::input::InputVector;

use super::{EffectLifetime, Pipeline};

/// Owns every pipeline, keyed by an explicit integer position.
///
/// Iteration runs in ascending position order, which is the cross-property
/// evaluation order of a cycle (e.g. `strength` at 0 resolves before `health`
/// at 1 so health effects can read processed strength).
#[derive(Clone, Debug, Default)]
pub struct PipelineRegistry {
    pipelines: BTreeMap<i32, Pipeline>,
    positions: HashMap<String, i32>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position used when none is requested: one past the highest, or 0.
    pub fn next_position(&self) -> Option<i32> {
        match self.pipelines.last_key_value() {
            Some((last, _)) => last.checked_add(1),
            None => Some(0),
        }
    }

    fn ensure_free(&self, position: i32) -> Result<(), EffectError> {
        match self.pipelines.get(&position) {
            Some(occupant) => Err(EffectError::DuplicatePosition {
                position,
                occupied_by: occupant.property().to_owned(),
            }),
            None => Ok(()),
        }
    }

    /// Creates an empty pipeline for `property` and returns its position.
    pub(crate) fn insert(&mut self, property: &str, position: Option<i32>) -> Result<i32, EffectError> {
        // No next position only when i32::MAX is taken; ensure_free reports it.
        let position = position
            .or_else(|| self.next_position())
            .unwrap_or(i32::MAX);
        self.ensure_free(position)?;

        self.positions.insert(property.to_owned(), position);
        self.pipelines.insert(position, Pipeline::new(property));
        Ok(position)
    }

    pub(crate) fn remove(&mut self, property: &str) -> Option<Pipeline> {
        let position = self.positions.remove(property)?;
        self.pipelines.remove(&position)
    }

    /// Moves a pipeline to a new evaluation slot.
    pub(crate) fn set_position(&mut self, property: &str, position: i32) -> Result<(), EffectError> {
        let current = self.position(property).ok_or_else(|| EffectError::property_not_found(property))?;
        if current == position {
            return Ok(());
        }
        self.ensure_free(position)?;

        if let Some(pipeline) = self.pipelines.remove(&current) {
            self.pipelines.insert(position, pipeline);
            self.positions.insert(property.to_owned(), position);
        }
        Ok(())
    }

    pub fn position(&self, property: &str) -> Option<i32> {
        self.positions.get(property).copied()
    }

    pub fn get(&self, property: &str) -> Option<&Pipeline> {
        self.pipelines.get(self.positions.get(property)?)
    }

    pub(crate) fn get_mut(&mut self, property: &str) -> Result<&mut Pipeline, EffectError> {
        self.positions
            .get(property)
            .and_then(|position| self.pipelines.get_mut(position))
            .ok_or_else(|| EffectError::property_not_found(property))
    }

    /// Pipelines in ascending position order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &Pipeline)> + '_ {
        self.pipelines.iter().map(|(position, pipeline)| (*position, pipeline))
    }

    pub fn lifetime_of(&self, id: EffectId) -> Option<EffectLifetime> {
        self.pipelines
            .values()
            .find_map(|pipeline| pipeline.lifetime_of(id))
    }

    pub(crate) fn remove_effect(&mut self, id: EffectId, inputs: &InputVector) -> bool {
        self.pipelines
            .values_mut()
            .any(|pipeline| pipeline.remove_effect(id, inputs))
    }

    /// Drops every generated effect. Returns the removed ids.
    pub(crate) fn clear_generated(&mut self, inputs: &InputVector) -> Vec<EffectId> {
        self.pipelines
            .values_mut()
            .flat_map(|pipeline| pipeline.clear_generated(inputs))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}
