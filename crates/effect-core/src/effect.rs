//! Effect taxonomy - the modifiers that feed property pipelines.
//!
//! An [`Effect`] is either a [`ValueEffect`] contributing one scalar to a
//! `(property, group)` pair, or a [`MetaEffect`] that generates further effects
//! every cycle.
//!
//! ```text
//! Effect
//!  ├─ Value(ValueEffect { property, group, kind })
//!  │    ├─ Constant  fixed scalar
//!  │    ├─ Input     f(inputs)
//!  │    └─ Data      f(inputs, private data) + enter/exit hooks
//!  └─ Meta(MetaEffect)  f(inputs) -> [Effect]
//! ```
//!
//! Effects are plain values until registered with an `EffectSystem`, which
//! assigns their [`EffectId`].

use std::fmt;
use std::sync::Arc;

use crate::input::{InputValue, InputVector, ValueMap};

/// Process-unique effect identifier, assigned on registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectId(pub u64);

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out monotonically increasing ids. Never reuses a value.
#[derive(Debug, Default)]
pub(crate) struct EffectIdAllocator {
    last: u64,
}

impl EffectIdAllocator {
    pub(crate) fn allocate(&mut self) -> EffectId {
        self.last += 1;
        EffectId(self.last)
    }
}

/// Binary operator used by groups, both to fold member effects and to combine
/// the folded value into the running pipeline value.
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
pub enum EffectOp {
    Add,
    Mul,
}

impl EffectOp {
    /// Neutral element of the fold: 0 for `Add`, 1 for `Mul`.
    pub const fn identity(self) -> f64 {
        match self {
            EffectOp::Add => 0.0,
            EffectOp::Mul => 1.0,
        }
    }

    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            EffectOp::Add => lhs + rhs,
            EffectOp::Mul => lhs * rhs,
        }
    }
}

/// Scalar computed from the inputs.
pub type InputFn = Arc<dyn Fn(&InputVector) -> f64 + Send + Sync>;

/// Scalar computed from the inputs and the effect's private data.
pub type DataFn = Arc<dyn Fn(&InputVector, &ValueMap) -> f64 + Send + Sync>;

/// Constructor/destructor hook of a data effect.
pub type DataHook = Arc<dyn Fn(&InputVector, &mut ValueMap) + Send + Sync>;

/// Generator of a meta effect.
pub type MetaFn = Arc<dyn Fn(&InputVector) -> Vec<Effect> + Send + Sync>;

/// Any modifier the system accepts.
#[derive(Clone, Debug)]
pub enum Effect {
    Value(ValueEffect),
    Meta(MetaEffect),
}

impl Effect {
    /// Fixed scalar contributed to `group` of `property`.
    pub fn constant(property: impl Into<String>, group: impl Into<String>, value: f64) -> Self {
        Effect::Value(ValueEffect::new(property, group, ValueKind::Constant(value)))
    }

    /// Scalar computed from the inputs at evaluation time.
    pub fn input<F>(property: impl Into<String>, group: impl Into<String>, function: F) -> Self
    where
        F: Fn(&InputVector) -> f64 + Send + Sync + 'static,
    {
        Effect::Value(ValueEffect::new(
            property,
            group,
            ValueKind::Input(Arc::new(function)),
        ))
    }

    /// Stateful scalar; see [`DataEffect`].
    pub fn data(property: impl Into<String>, group: impl Into<String>, data: DataEffect) -> Self {
        Effect::Value(ValueEffect::new(property, group, ValueKind::Data(data)))
    }

    /// Generator of further effects, executed once per cycle.
    pub fn meta<F>(generator: F) -> Self
    where
        F: Fn(&InputVector) -> Vec<Effect> + Send + Sync + 'static,
    {
        Effect::Meta(MetaEffect::new(generator))
    }

    pub fn is_meta(&self) -> bool {
        matches!(self, Effect::Meta(_))
    }
}

impl From<ValueEffect> for Effect {
    fn from(effect: ValueEffect) -> Self {
        Effect::Value(effect)
    }
}

impl From<MetaEffect> for Effect {
    fn from(effect: MetaEffect) -> Self {
        Effect::Meta(effect)
    }
}

/// Effect contributing a scalar to exactly one `(property, group)` pair.
#[derive(Clone, Debug)]
pub struct ValueEffect {
    property: String,
    group: String,
    kind: ValueKind,
}

/// How a [`ValueEffect`] computes its scalar.
#[derive(Clone)]
pub enum ValueKind {
    Constant(f64),
    Input(InputFn),
    Data(DataEffect),
}

impl fmt::Debug for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            ValueKind::Input(_) => f.write_str("Input(..)"),
            ValueKind::Data(data) => f.debug_tuple("Data").field(data).finish(),
        }
    }
}

impl ValueEffect {
    pub fn new(property: impl Into<String>, group: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            property: property.into(),
            group: group.into(),
            kind,
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// Evaluates the effect against the current inputs.
    pub fn value(&self, inputs: &InputVector) -> f64 {
        match &self.kind {
            ValueKind::Constant(value) => *value,
            ValueKind::Input(function) => function(inputs),
            ValueKind::Data(data) => (data.value)(inputs, &data.data),
        }
    }

    /// Runs when the effect enters a pipeline (permanent or generated).
    pub(crate) fn enter(&mut self, inputs: &InputVector) {
        if let ValueKind::Data(data) = &mut self.kind
            && let Some(hook) = &data.on_enter
        {
            hook(inputs, &mut data.data);
        }
    }

    /// Runs when the effect leaves a pipeline.
    pub(crate) fn exit(&mut self, inputs: &InputVector) {
        if let ValueKind::Data(data) = &mut self.kind
            && let Some(hook) = &data.on_exit
        {
            hook(inputs, &mut data.data);
        }
    }
}

/// Value computation plus private per-effect state with lifecycle hooks.
///
/// The enter hook runs exactly once when the effect is added to a pipeline and
/// the exit hook exactly once when it leaves (explicit removal, threshold
/// expiry, group/property removal, or end of cycle for generated effects).
///
/// # Example
/// ```
/// # use effect_core::{DataEffect, Effect};
/// let tracker = DataEffect::new(|_, data| data.number("stacks").unwrap_or(0.0) * 5.0)
///     .with_data("stacks", 0.0)
///     .on_enter(|_, data| {
///         data.set("stacks", 3.0);
///     });
/// let effect = Effect::data("damage", "add", tracker);
/// assert!(!effect.is_meta());
/// ```
#[derive(Clone)]
pub struct DataEffect {
    data: ValueMap,
    value: DataFn,
    on_enter: Option<DataHook>,
    on_exit: Option<DataHook>,
}

impl DataEffect {
    pub fn new<F>(value: F) -> Self
    where
        F: Fn(&InputVector, &ValueMap) -> f64 + Send + Sync + 'static,
    {
        Self {
            data: ValueMap::new(),
            value: Arc::new(value),
            on_enter: None,
            on_exit: None,
        }
    }

    /// Seeds the private data store (builder pattern).
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.data.set(key, value);
        self
    }

    /// Sets the constructor hook (builder pattern).
    #[must_use]
    pub fn on_enter<F>(mut self, hook: F) -> Self
    where
        F: Fn(&InputVector, &mut ValueMap) + Send + Sync + 'static,
    {
        self.on_enter = Some(Arc::new(hook));
        self
    }

    /// Sets the destructor hook (builder pattern).
    #[must_use]
    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&InputVector, &mut ValueMap) + Send + Sync + 'static,
    {
        self.on_exit = Some(Arc::new(hook));
        self
    }

    pub fn data(&self) -> &ValueMap {
        &self.data
    }
}

impl fmt::Debug for DataEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataEffect")
            .field("data", &self.data)
            .field("on_enter", &self.on_enter.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .finish_non_exhaustive()
    }
}

/// Effect that produces zero or more effects each cycle instead of a scalar.
///
/// Produced meta effects are expanded in the same cycle; produced value effects
/// live for that cycle only.
#[derive(Clone)]
pub struct MetaEffect {
    generator: MetaFn,
}

impl MetaEffect {
    pub fn new<F>(generator: F) -> Self
    where
        F: Fn(&InputVector) -> Vec<Effect> + Send + Sync + 'static,
    {
        Self {
            generator: Arc::new(generator),
        }
    }

    pub fn execute(&self, inputs: &InputVector) -> Vec<Effect> {
        (self.generator)(inputs)
    }
}

impl fmt::Debug for MetaEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MetaEffect(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn allocator_never_reuses_ids() {
        let mut ids = EffectIdAllocator::default();
        let first = ids.allocate();
        let second = ids.allocate();

        assert_eq!(first, EffectId(1));
        assert!(second > first);
        assert_eq!(second.to_string(), "#2");
    }

    #[test]
    fn operator_identities_and_names() {
        assert_eq!(EffectOp::Add.identity(), 0.0);
        assert_eq!(EffectOp::Mul.identity(), 1.0);
        assert_eq!(EffectOp::Mul.apply(2.0, 3.0), 6.0);
        assert_eq!(EffectOp::Add.to_string(), "add");
        assert_eq!(EffectOp::from_str("MUL"), Ok(EffectOp::Mul));
    }

    #[test]
    fn value_kinds_evaluate() {
        let mut inputs = InputVector::new();
        inputs.set("intelligence", 300);

        let constant = ValueEffect::new("mana", "add", ValueKind::Constant(50.0));
        let input = ValueEffect::new(
            "mana",
            "add",
            ValueKind::Input(Arc::new(|inputs: &InputVector| {
                inputs.number("intelligence").unwrap_or(0.0) * 0.5
            })),
        );

        assert_eq!(constant.value(&inputs), 50.0);
        assert_eq!(input.value(&inputs), 150.0);
    }

    #[test]
    fn data_hooks_touch_private_state() {
        let inputs = InputVector::new();
        let Effect::Value(mut effect) = Effect::data(
            "damage",
            "add",
            DataEffect::new(|_, data| data.number("stacks").unwrap_or(0.0))
                .on_enter(|_, data| {
                    data.set("stacks", 2.0);
                })
                .on_exit(|_, data| {
                    data.set("stacks", 0.0);
                }),
        ) else {
            panic!("expected a value effect");
        };

        assert_eq!(effect.value(&inputs), 0.0);
        effect.enter(&inputs);
        assert_eq!(effect.value(&inputs), 2.0);
        effect.exit(&inputs);
        assert_eq!(effect.value(&inputs), 0.0);
    }

    #[test]
    fn meta_effect_generates_fresh_effects() {
        let meta = MetaEffect::new(|_| vec![Effect::constant("health", "add", 1.0)]);
        let inputs = InputVector::new();

        assert_eq!(meta.execute(&inputs).len(), 1);
        assert_eq!(meta.execute(&inputs).len(), 1);
    }
}
