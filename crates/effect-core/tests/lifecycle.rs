use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use effect_core::{
    DataEffect, Effect, EffectLifetime, EffectSystem, InputValue, PropertyDef, ThresholdCondition,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn health_system() -> EffectSystem {
    init_tracing();
    let mut system = EffectSystem::new();
    system
        .add_property("health", 100.0)
        .expect("health should be added");
    system
}

fn result(system: &EffectSystem, property: &str) -> Option<f64> {
    system.results().get(property)
}

/// Counts enter/exit hook invocations of a data effect.
#[derive(Clone, Default)]
struct HookCounter {
    enters: Arc<AtomicUsize>,
    exits: Arc<AtomicUsize>,
}

impl HookCounter {
    fn effect(&self, property: &str, value: f64) -> Effect {
        let enters = Arc::clone(&self.enters);
        let exits = Arc::clone(&self.exits);
        Effect::data(
            property,
            "add",
            DataEffect::new(move |_, _| value)
                .on_enter(move |_, _| {
                    enters.fetch_add(1, Ordering::SeqCst);
                })
                .on_exit(move |_, _| {
                    exits.fetch_add(1, Ordering::SeqCst);
                }),
        )
    }

    fn counts(&self) -> (usize, usize) {
        (
            self.enters.load(Ordering::SeqCst),
            self.exits.load(Ordering::SeqCst),
        )
    }
}

// ================================================================
// Thresholds
// ================================================================

#[test]
fn threshold_expires_effect_once() {
    let mut system = health_system();
    system.set_input("time", 0.0);
    let buff = system.add_effect(Effect::constant("health", "add", 100.0)).unwrap();
    system
        .add_threshold(buff, "time", ThresholdCondition::Greater(1.0))
        .unwrap();

    assert_eq!(system.inputs_mut().increment("time", 0.5), Ok(0.5));
    let outcome = system.process().expect("cycle should succeed");
    assert!(outcome.expired.is_empty());
    assert_eq!(result(&system, "health"), Some(200.0));

    assert_eq!(system.inputs_mut().increment("time", 1.5), Ok(2.0));
    let outcome = system.process().expect("cycle should succeed");
    assert_eq!(outcome.expired, vec![buff]);
    assert_eq!(result(&system, "health"), Some(100.0));
    assert!(!system.is_active(buff));
    assert!(system.thresholds().is_empty());

    // Lowering the input again does not resurrect anything.
    system.set_input("time", 0.0);
    system.process().unwrap();
    assert_eq!(result(&system, "health"), Some(100.0));
}

#[test]
fn threshold_on_meta_effect_stops_generation() {
    let mut system = health_system();
    system.set_input("phase", "day");
    let meta = system
        .add_effect(Effect::meta(|_| vec![Effect::constant("health", "mul", 2.0)]))
        .unwrap();
    system
        .add_threshold(
            meta,
            "phase",
            ThresholdCondition::Equals(InputValue::from("night")),
        )
        .unwrap();

    system.process().unwrap();
    assert_eq!(result(&system, "health"), Some(200.0));

    system.set_input("phase", "night");
    let outcome = system.process().unwrap();
    assert_eq!(outcome.expired, vec![meta]);
    assert_eq!(outcome.generated, 0);
    assert_eq!(result(&system, "health"), Some(100.0));
    assert_eq!(system.meta_effects().count(), 0);
}

#[test]
fn thresholds_leave_with_temporary_effects() {
    let mut system = health_system();
    system.set_input("time", 0.0);

    let potion = system
        .add_temp_effect(Effect::constant("health", "add", 40.0))
        .unwrap();
    let burst = system
        .add_temp_effect(Effect::meta(|_| vec![Effect::constant("health", "mul", 2.0)]))
        .unwrap();
    for id in [potion, burst] {
        system
            .add_threshold(id, "time", ThresholdCondition::Greater(1.0))
            .unwrap();
    }
    assert_eq!(system.thresholds().len(), 2);

    system.process().expect("cycle should succeed");
    assert_eq!(result(&system, "health"), Some(240.0));
    assert!(!system.is_active(potion));
    assert!(!system.is_active(burst));
    assert!(system.thresholds().is_empty());

    // Nothing watches "time" anymore, so unsetting it is harmless.
    assert!(system.remove_input("time"));
    system.process().expect("cycle should succeed");
    assert_eq!(result(&system, "health"), Some(100.0));
}

#[test]
fn missing_threshold_input_aborts_the_cycle() {
    let mut system = health_system();
    let buff = system.add_effect(Effect::constant("health", "add", 10.0)).unwrap();
    system.process().unwrap();

    system
        .add_threshold(buff, "time", ThresholdCondition::Smaller(0.0))
        .unwrap();
    let err = system.process().expect_err("unset input should fail");
    assert_eq!(err.error_code(), "input_not_found");

    assert!(system.is_active(buff));
    assert_eq!(result(&system, "health"), Some(110.0));

    system.set_input("time", -1.0);
    system.process().unwrap();
    assert_eq!(result(&system, "health"), Some(100.0));
}

#[test]
fn predicate_thresholds() {
    let mut system = health_system();
    system.set_input("kills", 0);
    let streak = system.add_effect(Effect::constant("health", "add", 5.0)).unwrap();
    system
        .add_threshold(
            streak,
            "kills",
            ThresholdCondition::predicate(|value| value.as_number().is_some_and(|n| n >= 3.0)),
        )
        .unwrap();

    for kills in 0..3 {
        system.set_input("kills", kills);
        system.process().unwrap();
        assert_eq!(result(&system, "health"), Some(105.0));
    }

    system.set_input("kills", 3);
    system.process().unwrap();
    assert_eq!(result(&system, "health"), Some(100.0));
}

// ================================================================
// Data effect lifecycle
// ================================================================

#[test]
fn permanent_data_effect_hooks_run_once() {
    let mut system = health_system();
    let counter = HookCounter::default();

    let id = system.add_effect(counter.effect("health", 20.0)).unwrap();
    assert_eq!(counter.counts(), (1, 0));

    for _ in 0..3 {
        system.process().unwrap();
    }
    assert_eq!(counter.counts(), (1, 0));
    assert_eq!(result(&system, "health"), Some(120.0));

    assert!(system.remove_effect(id));
    assert_eq!(counter.counts(), (1, 1));
}

#[test]
fn generated_data_effect_hooks_run_every_cycle() {
    let mut system = health_system();
    let counter = HookCounter::default();
    let template = counter.clone();
    system
        .add_effect(Effect::meta(move |_| vec![template.effect("health", 5.0)]))
        .unwrap();

    system.process().unwrap();
    assert_eq!(counter.counts(), (1, 1));
    system.process().unwrap();
    assert_eq!(counter.counts(), (2, 2));
    assert_eq!(result(&system, "health"), Some(105.0));
}

#[test]
fn data_effect_value_reads_private_state() {
    init_tracing();
    let mut system = EffectSystem::new();
    system.add_property("damage", 10.0).unwrap();
    system.set_input("combo", 2.0);

    let stacking = DataEffect::new(|inputs, data| {
        data.number("stacks").unwrap_or(0.0) * inputs.number("combo").unwrap_or(1.0)
    })
    .with_data("stacks", 0.0)
    .on_enter(|_, data| {
        data.set("stacks", 3.0);
    });
    system.add_effect(Effect::data("damage", "add", stacking)).unwrap();

    system.process().unwrap();
    assert_eq!(result(&system, "damage"), Some(16.0));
}

// ================================================================
// Permanent properties and one-shot effects
// ================================================================

#[test]
fn permanent_property_carries_results_forward() {
    init_tracing();
    let mut system = EffectSystem::new();
    system
        .add_property_with(PropertyDef::new("experience", 100.0).permanent())
        .unwrap();
    system
        .add_effect(Effect::constant("experience", "add", 10.0))
        .unwrap();

    system.process().unwrap();
    assert_eq!(result(&system, "experience"), Some(110.0));
    assert_eq!(system.property_value("experience"), Ok(100.0));

    system.process().unwrap();
    assert_eq!(result(&system, "experience"), Some(120.0));
    assert_eq!(system.property_value("experience"), Ok(110.0));

    system.mark_permanent("experience", false).unwrap();
    system.process().unwrap();
    assert_eq!(result(&system, "experience"), Some(120.0));
}

#[test]
fn temp_effects_last_one_cycle() {
    let mut system = health_system();
    let potion = system
        .add_temp_effect(Effect::constant("health", "add", 40.0))
        .unwrap();
    assert_eq!(system.lifetime_of(potion), Some(EffectLifetime::Generated));

    system.process().unwrap();
    assert_eq!(result(&system, "health"), Some(140.0));
    assert!(!system.is_active(potion));

    system.process().unwrap();
    assert_eq!(result(&system, "health"), Some(100.0));
}

// ================================================================
// Removal cascades
// ================================================================

#[test]
fn removing_a_property_tears_down_everything_attached() {
    let mut system = health_system();
    system.add_property("mana", 50.0).unwrap();
    system.set_input("time", 0.0);

    let counter = HookCounter::default();
    let id = system.add_effect(counter.effect("health", 10.0)).unwrap();
    system
        .add_threshold(id, "time", ThresholdCondition::Greater(10.0))
        .unwrap();
    system.process().unwrap();
    assert_eq!(system.inputs().property("health"), Some(110.0));

    assert!(system.remove_property("health"));
    assert_eq!(counter.counts(), (1, 1));
    assert!(!system.is_active(id));
    assert!(system.thresholds().is_empty());
    assert_eq!(result(&system, "health"), None);
    assert_eq!(system.inputs().property("health"), None);
    assert_eq!(system.pipeline_count(), 1);

    system.process().unwrap();
    assert_eq!(system.results().len(), 1);
    assert_eq!(result(&system, "mana"), Some(50.0));
}

#[test]
fn removing_a_group_runs_exit_hooks() {
    let mut system = health_system();
    let counter = HookCounter::default();
    let first = system.add_effect(counter.effect("health", 1.0)).unwrap();
    let second = system.add_effect(counter.effect("health", 2.0)).unwrap();
    assert_eq!(system.effects_of_group("health", "add"), Ok(vec![first, second]));

    assert_eq!(system.remove_group("health", "add"), Ok(true));
    assert_eq!(counter.counts(), (2, 2));
    assert!(!system.is_active(first));
    assert!(!system.is_active(second));
    assert!(system.add_effect(counter.effect("health", 1.0)).is_err());
}
