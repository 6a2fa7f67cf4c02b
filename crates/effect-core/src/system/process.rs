//! The processing cycle.
//!
//! Phase order of one `process()` call:
//!
//! 1. **Carry-forward**: permanent properties take their last published result
//!    as new base value.
//! 2. **Snapshot**: working values start at the base values; the input vector's
//!    property view is reset to them.
//! 3. **Threshold expiry**: satisfied thresholds remove their effect for good.
//! 4. **Meta expansion**: meta effects run to a fixed point; value outputs join
//!    their group as generated effects.
//! 5. **Evaluation**: pipelines run in ascending position order; each result is
//!    clamped, recorded and made visible to later pipelines.
//! 6. **Cleanup**: generated effects are cleared, on success and on failure,
//!    together with any threshold still watching them.
//!
//! Results are published only when every phase succeeds.

use tracing::{debug, trace, warn};

use super::{EffectSystem, ProcessOutcome, PropertyValues};
use crate::effect::{Effect, EffectId, MetaEffect};
use crate::error::EffectError;
use crate::pipeline::EffectLifetime;

/// What meta expansion produced in one cycle.
#[derive(Debug, Default)]
struct Expansion {
    generated: usize,
    iterations: usize,
}

impl EffectSystem {
    /// Runs one processing cycle and publishes the results.
    ///
    /// Base values are left untouched (except the carry-forward of permanent
    /// properties) and processing twice without mutations in between yields
    /// the same results.
    ///
    /// # Errors
    ///
    /// - `InputNotFound`/`InputTypeMismatch` when a threshold watches an input
    ///   that is unset or not numeric
    /// - `MetaExpansionLimit` when meta effects keep producing meta effects
    ///   past `max_meta_iterations`
    ///
    /// On error the previous results stay published and no generated effect
    /// survives. Effects already removed by threshold expiry stay removed.
    pub fn process(&mut self) -> Result<ProcessOutcome, EffectError> {
        self.carry_forward();

        let mut processed: PropertyValues = self
            .properties
            .iter()
            .map(|property| (property.name.clone(), property.value))
            .collect();
        self.inputs.reset_properties(processed.iter());

        let cycle = self.run_cycle(&mut processed);
        let cleared = self.pipelines.clear_generated(&self.inputs);
        self.thresholds.forget(&cleared);

        match cycle {
            Ok(outcome) => {
                self.results = processed;
                debug!(
                    target: "effect_core::process",
                    properties = self.results.len(),
                    expired = outcome.expired.len(),
                    generated = outcome.generated,
                    cleared = cleared.len(),
                    meta_iterations = outcome.meta_iterations,
                    "cycle processed"
                );
                Ok(outcome)
            }
            Err(error) => {
                self.inputs.reset_properties(self.results.iter());
                warn!(
                    target: "effect_core::process",
                    error = %error,
                    code = error.error_code(),
                    severity = error.severity().as_str(),
                    "cycle aborted, previous results kept"
                );
                Err(error)
            }
        }
    }

    fn carry_forward(&mut self) {
        for property in self.properties.iter_mut().filter(|property| property.permanent) {
            if let Some(value) = self.results.get(&property.name) {
                property.value = value;
            }
        }
    }

    fn run_cycle(&mut self, processed: &mut PropertyValues) -> Result<ProcessOutcome, EffectError> {
        let expired = self.expire_thresholds()?;
        let expansion = self.expand_meta_effects()?;

        for (position, pipeline) in self.pipelines.iter() {
            let property = pipeline.property();
            let base = self.properties.value(property)?;
            let value = self
                .ranges
                .clamp(property, pipeline.calculate(base, &self.inputs));

            trace!(
                target: "effect_core::process",
                property,
                position,
                base,
                value,
                "pipeline evaluated"
            );
            processed.insert(property, value);
            self.inputs.publish_property(property, value);
        }

        Ok(ProcessOutcome {
            expired,
            generated: expansion.generated,
            meta_iterations: expansion.iterations,
        })
    }

    fn expire_thresholds(&mut self) -> Result<Vec<EffectId>, EffectError> {
        let reached = self.thresholds.take_expired(&self.inputs)?;

        let mut expired = Vec::with_capacity(reached.len());
        for threshold in reached {
            let id = threshold.effect();
            // Several thresholds may watch the same effect.
            if self.remove_effect(id) {
                debug!(
                    target: "effect_core::threshold",
                    effect = %id,
                    input = threshold.input(),
                    condition = %threshold.condition().kind(),
                    "threshold reached, effect expired"
                );
                expired.push(id);
            }
        }
        Ok(expired)
    }

    /// Runs meta effects until none produces another meta effect.
    ///
    /// Registered meta effects run once per cycle, queued one-shot meta effects
    /// run once and are dropped. Every meta effect produced in iteration `n`
    /// runs in iteration `n + 1`.
    fn expand_meta_effects(&mut self) -> Result<Expansion, EffectError> {
        let limit = self.config.max_meta_iterations;
        let (queued_ids, queued): (Vec<EffectId>, Vec<MetaEffect>) =
            self.queued_meta.drain(..).unzip();
        self.thresholds.forget(&queued_ids);

        let mut working: Vec<MetaEffect> = self
            .meta_effects
            .iter()
            .map(|(_, meta)| meta.clone())
            .chain(queued)
            .collect();

        let mut expansion = Expansion::default();
        while !working.is_empty() {
            if expansion.iterations == limit {
                return Err(EffectError::MetaExpansionLimit { limit });
            }
            expansion.iterations += 1;

            let mut next = Vec::new();
            for meta in &working {
                for effect in meta.execute(&self.inputs) {
                    match effect {
                        Effect::Meta(nested) => next.push(nested),
                        Effect::Value(value) => {
                            self.register_value(value, EffectLifetime::Generated)?;
                            expansion.generated += 1;
                        }
                    }
                }
            }

            trace!(
                target: "effect_core::process",
                iteration = expansion.iterations,
                executed = working.len(),
                produced_meta = next.len(),
                "meta expansion step"
            );
            working = next;
        }
        Ok(expansion)
    }
}
