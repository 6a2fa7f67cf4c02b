/// Engine configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectSystemConfig {
    /// Maximum number of fixed-point iterations of meta-effect expansion per
    /// cycle. A cycle whose meta-effects still produce meta-effects after this
    /// many iterations fails with `EffectError::MetaExpansionLimit`.
    pub max_meta_iterations: usize,

    /// Whether properties get the default `mul` and `add` groups when their
    /// definition does not say otherwise.
    pub auto_generate_groups: bool,
}

impl EffectSystemConfig {
    // ===== default group layout =====
    /// Group created first: multiplies the running value by the product of its effects.
    pub const DEFAULT_MUL_GROUP: &'static str = "mul";
    /// Group created second: adds the sum of its effects to the running value.
    pub const DEFAULT_ADD_GROUP: &'static str = "add";

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_META_ITERATIONS: usize = 64;
    pub const DEFAULT_AUTO_GENERATE_GROUPS: bool = true;

    pub const fn new() -> Self {
        Self {
            max_meta_iterations: Self::DEFAULT_MAX_META_ITERATIONS,
            auto_generate_groups: Self::DEFAULT_AUTO_GENERATE_GROUPS,
        }
    }

    #[must_use]
    pub const fn with_max_meta_iterations(mut self, max_meta_iterations: usize) -> Self {
        self.max_meta_iterations = max_meta_iterations;
        self
    }

    #[must_use]
    pub const fn with_auto_generate_groups(mut self, auto_generate_groups: bool) -> Self {
        self.auto_generate_groups = auto_generate_groups;
        self
    }
}

impl Default for EffectSystemConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = EffectSystemConfig::new()
            .with_max_meta_iterations(3)
            .with_auto_generate_groups(false);

        assert_eq!(config.max_meta_iterations, 3);
        assert!(!config.auto_generate_groups);
        assert_eq!(
            EffectSystemConfig::default().max_meta_iterations,
            EffectSystemConfig::DEFAULT_MAX_META_ITERATIONS
        );
    }
}
