//! Error infrastructure for effect-core.
//!
//! Every fallible operation of the engine surfaces an [`EffectError`]. Errors are
//! raised synchronously to the caller of the mutation or `process()` call that
//! triggered them; nothing is retried internally.
//!
//! # Taxonomy
//!
//! - **Not found**: unknown property, group, effect or input name
//! - **Duplicate**: group name or pipeline position already taken
//! - **Type mismatch**: an input holds a different kind of value than required
//! - **Runaway expansion**: meta-effects kept generating meta-effects past the bound

use crate::effect::EffectId;

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - the same call may succeed once inputs change.
    ///
    /// Examples: threshold input not set yet, runaway meta expansion
    Recoverable,

    /// Validation error - invalid call, should not retry without changes.
    ///
    /// Examples: unknown property, duplicate group, inverted range
    Validation,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Errors surfaced by the effect system.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EffectError {
    #[error("property '{property}' not found")]
    PropertyNotFound { property: String },

    #[error("group '{group}' not found in pipeline of property '{property}'")]
    GroupNotFound { property: String, group: String },

    #[error("group '{group}' already exists in pipeline of property '{property}'")]
    DuplicateGroup { property: String, group: String },

    #[error("pipeline position {position} is already taken by property '{occupied_by}'")]
    DuplicatePosition { position: i32, occupied_by: String },

    #[error("effect {id} is not active")]
    EffectNotFound { id: EffectId },

    #[error("input '{input}' not found")]
    InputNotFound { input: String },

    #[error("input '{input}' holds a {found} value, expected {expected}")]
    InputTypeMismatch {
        input: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid range for property '{property}': min {min} is greater than max {max}")]
    InvalidRange { property: String, min: f64, max: f64 },

    #[error("meta-effect expansion exceeded {limit} iterations")]
    MetaExpansionLimit { limit: usize },
}

impl EffectError {
    pub(crate) fn property_not_found(property: &str) -> Self {
        Self::PropertyNotFound {
            property: property.to_owned(),
        }
    }

    pub(crate) fn group_not_found(property: &str, group: &str) -> Self {
        Self::GroupNotFound {
            property: property.to_owned(),
            group: group.to_owned(),
        }
    }

    pub(crate) fn input_not_found(input: &str) -> Self {
        Self::InputNotFound {
            input: input.to_owned(),
        }
    }

    /// Returns the severity level of this error.
    pub const fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InputNotFound { .. }
            | Self::InputTypeMismatch { .. }
            | Self::MetaExpansionLimit { .. } => ErrorSeverity::Recoverable,
            Self::PropertyNotFound { .. }
            | Self::GroupNotFound { .. }
            | Self::DuplicateGroup { .. }
            | Self::DuplicatePosition { .. }
            | Self::EffectNotFound { .. }
            | Self::InvalidRange { .. } => ErrorSeverity::Validation,
        }
    }

    /// Returns a static string identifier for this error variant.
    ///
    /// Useful for error categorization and testing.
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::PropertyNotFound { .. } => "property_not_found",
            Self::GroupNotFound { .. } => "group_not_found",
            Self::DuplicateGroup { .. } => "duplicate_group",
            Self::DuplicatePosition { .. } => "duplicate_position",
            Self::EffectNotFound { .. } => "effect_not_found",
            Self::InputNotFound { .. } => "input_not_found",
            Self::InputTypeMismatch { .. } => "input_type_mismatch",
            Self::InvalidRange { .. } => "invalid_range",
            Self::MetaExpansionLimit { .. } => "meta_expansion_limit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_classification() {
        let missing = EffectError::input_not_found("time");
        assert!(missing.severity().is_recoverable());
        assert_eq!(missing.error_code(), "input_not_found");

        let duplicate = EffectError::DuplicateGroup {
            property: "health".into(),
            group: "add".into(),
        };
        assert_eq!(duplicate.severity(), ErrorSeverity::Validation);
        assert!(!duplicate.severity().is_recoverable());
        assert_eq!(
            duplicate.to_string(),
            "group 'add' already exists in pipeline of property 'health'"
        );
    }
}
