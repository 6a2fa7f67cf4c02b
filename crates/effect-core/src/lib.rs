//! Deterministic property/modifier aggregation for game stat systems.
//!
//! `effect-core` computes derived values of named numeric properties (health,
//! strength, damage, ...) from their base values and a set of active effects.
//! Each property owns a [`Pipeline`](pipeline::Pipeline) of ordered
//! [`Group`]s; every group folds its effects with one operator and combines
//! the result into the running value with another. Meta effects generate
//! further effects each cycle, thresholds expire effects once an input crosses
//! a limit, and ranges clamp the published results.
//!
//! All mutation flows through [`EffectSystem`]; [`EffectSystem::process`] is
//! the single operation that publishes results.
//!
//! ```
//! use effect_core::{Effect, EffectSystem, PropertyDef};
//!
//! let mut system = EffectSystem::new();
//! system.add_property("strength", 10.0).unwrap();
//! system
//!     .add_property_with(PropertyDef::new("health", 100.0).with_range(0.0, 200.0))
//!     .unwrap();
//!
//! // 10% of processed strength becomes extra health multiplier.
//! system
//!     .add_effect(Effect::input("health", "mul", |inputs| {
//!         1.0 + inputs.property("strength").unwrap_or(0.0) / 10.0
//!     }))
//!     .unwrap();
//!
//! system.process().unwrap();
//! assert_eq!(system.results().get("health"), Some(200.0));
//! ```
pub mod config;
pub mod effect;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod property;
pub mod range;
pub mod system;
pub mod threshold;

pub use config::EffectSystemConfig;
pub use effect::{
    DataEffect, DataFn, DataHook, Effect, EffectId, EffectOp, InputFn, MetaEffect, MetaFn,
    ValueEffect, ValueKind,
};
pub use error::{EffectError, ErrorSeverity};
pub use input::{FromInputValue, InputValue, InputVector, ValueMap};
pub use pipeline::{EffectLifetime, Group, Pipeline, PipelineRegistry};
pub use property::{Property, PropertyDef, PropertyRegistry};
pub use range::{Range, RangeRegistry};
pub use system::{EffectSystem, ProcessOutcome, PropertyValues};
pub use threshold::{InputPredicate, Threshold, ThresholdCondition, ThresholdKind, ThresholdRegistry};
