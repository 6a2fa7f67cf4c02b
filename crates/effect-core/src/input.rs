//! External evaluation context read by effects.
//!
//! [`InputVector`] is the only data besides property values that may change
//! between two `process()` calls. Values are tagged ([`InputValue`]) so typed
//! retrieval can fail gracefully instead of panicking: callers routinely probe
//! for optional inputs.
//!
//! The same keyed store ([`ValueMap`]) backs the private state of data effects.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::EffectError;

/// A single tagged input value.
///
/// Integers and floats are distinct kinds for typed retrieval, but compare
/// numerically with each other (`Int(2) == Float(2.0)`).
#[derive(Clone)]
pub enum InputValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
    /// Opaque shared value (e.g. an inventory or a flask belt).
    ///
    /// Handles compare equal only when they point to the same allocation.
    Handle(Arc<dyn Any + Send + Sync>),
}

impl InputValue {
    /// Wraps an arbitrary value as an opaque handle.
    pub fn handle<T: Any + Send + Sync>(value: T) -> Self {
        InputValue::Handle(Arc::new(value))
    }

    /// Name of the stored kind, used in error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            InputValue::Float(_) => "float",
            InputValue::Int(_) => "int",
            InputValue::Bool(_) => "bool",
            InputValue::Text(_) => "text",
            InputValue::Handle(_) => "handle",
        }
    }

    /// Numeric view of the value: floats and integers, nothing else.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            InputValue::Float(value) => Some(*value),
            InputValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Borrows the handle payload if it holds a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            InputValue::Handle(handle) => handle.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for InputValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (InputValue::Float(a), InputValue::Float(b)) => a == b,
            (InputValue::Int(a), InputValue::Int(b)) => a == b,
            (InputValue::Int(a), InputValue::Float(b)) | (InputValue::Float(b), InputValue::Int(a)) => {
                *a as f64 == *b
            }
            (InputValue::Bool(a), InputValue::Bool(b)) => a == b,
            (InputValue::Text(a), InputValue::Text(b)) => a == b,
            (InputValue::Handle(a), InputValue::Handle(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputValue::Float(value) => f.debug_tuple("Float").field(value).finish(),
            InputValue::Int(value) => f.debug_tuple("Int").field(value).finish(),
            InputValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            InputValue::Text(value) => f.debug_tuple("Text").field(value).finish(),
            InputValue::Handle(_) => f.write_str("Handle(..)"),
        }
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        InputValue::Float(value)
    }
}

impl From<f32> for InputValue {
    fn from(value: f32) -> Self {
        InputValue::Float(f64::from(value))
    }
}

impl From<i64> for InputValue {
    fn from(value: i64) -> Self {
        InputValue::Int(value)
    }
}

impl From<i32> for InputValue {
    fn from(value: i32) -> Self {
        InputValue::Int(i64::from(value))
    }
}

impl From<u32> for InputValue {
    fn from(value: u32) -> Self {
        InputValue::Int(i64::from(value))
    }
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        InputValue::Bool(value)
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::Text(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::Text(value.to_owned())
    }
}

/// Strict typed extraction from an [`InputValue`].
///
/// No conversion between kinds happens here: an `Int` is not an `f64`.
/// Use [`ValueMap::number`] for a numeric view that accepts both.
pub trait FromInputValue: Sized {
    /// Kind name reported in type-mismatch errors.
    const KIND: &'static str;

    fn from_input(value: &InputValue) -> Option<Self>;
}

impl FromInputValue for f64 {
    const KIND: &'static str = "float";

    fn from_input(value: &InputValue) -> Option<Self> {
        match value {
            InputValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromInputValue for i64 {
    const KIND: &'static str = "int";

    fn from_input(value: &InputValue) -> Option<Self> {
        match value {
            InputValue::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromInputValue for bool {
    const KIND: &'static str = "bool";

    fn from_input(value: &InputValue) -> Option<Self> {
        match value {
            InputValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromInputValue for String {
    const KIND: &'static str = "text";

    fn from_input(value: &InputValue) -> Option<Self> {
        match value {
            InputValue::Text(value) => Some(value.clone()),
            _ => None,
        }
    }
}

/// Name → value store with deterministic (sorted) iteration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueMap {
    values: BTreeMap<String, InputValue>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<InputValue>) -> Option<InputValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&InputValue> {
        self.values.get(key)
    }

    /// Removes a value. Returns true if it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Typed retrieval; `None` when missing or of another kind.
    pub fn try_get<T: FromInputValue>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(T::from_input)
    }

    /// Typed retrieval reporting why it failed.
    pub fn require<T: FromInputValue>(&self, key: &str) -> Result<T, EffectError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| EffectError::input_not_found(key))?;
        T::from_input(value).ok_or_else(|| EffectError::InputTypeMismatch {
            input: key.to_owned(),
            expected: T::KIND,
            found: value.kind_name(),
        })
    }

    /// Borrows the payload of a handle value if it holds a `T`.
    pub fn handle<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(InputValue::downcast_ref::<T>)
    }

    /// Numeric view: integers and floats both read as `f64`.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(InputValue::as_number)
    }

    /// Adds `delta` to a float value and returns the new value.
    pub fn increment(&mut self, key: &str, delta: f64) -> Result<f64, EffectError> {
        let value = self
            .values
            .get_mut(key)
            .ok_or_else(|| EffectError::input_not_found(key))?;
        match value {
            InputValue::Float(current) => {
                *current += delta;
                Ok(*current)
            }
            other => Err(EffectError::InputTypeMismatch {
                input: key.to_owned(),
                expected: f64::KIND,
                found: other.kind_name(),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputValue)> + '_ {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The evaluation context handed to every effect.
///
/// Besides caller-provided inputs it exposes property values: during a
/// `process()` cycle, [`InputVector::property`] returns the processed value of
/// properties whose pipeline already ran (lower position) and the base value of
/// the rest. Between cycles it returns the last published results.
#[derive(Clone, Debug, Default)]
pub struct InputVector {
    values: ValueMap,
    properties: BTreeMap<String, f64>,
}

impl InputVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caller-provided inputs, without the property view.
    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueMap {
        &mut self.values
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<InputValue>) -> Option<InputValue> {
        self.values.set(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&InputValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains(key)
    }

    /// See [`ValueMap::try_get`].
    pub fn try_get<T: FromInputValue>(&self, key: &str) -> Option<T> {
        self.values.try_get::<T>(key)
    }

    /// See [`ValueMap::require`].
    pub fn require<T: FromInputValue>(&self, key: &str) -> Result<T, EffectError> {
        self.values.require::<T>(key)
    }

    pub fn handle<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.handle::<T>(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.values.number(key)
    }

    /// See [`ValueMap::increment`].
    pub fn increment(&mut self, key: &str, delta: f64) -> Result<f64, EffectError> {
        self.values.increment(key, delta)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputValue)> + '_ {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current value of a property as seen by effects.
    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }

    pub(crate) fn reset_properties<'a>(&mut self, values: impl IntoIterator<Item = (&'a str, f64)>) {
        self.properties = values
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect();
    }

    pub(crate) fn publish_property(&mut self, name: &str, value: f64) {
        self.properties.insert(name.to_owned(), value);
    }

    pub(crate) fn forget_property(&mut self, name: &str) {
        self.properties.remove(name);
    }
}
