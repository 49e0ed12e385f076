//! Attic: a hidden place to store instance variables.
//!
//! An opted-in type carries an embedded [`Attic`] store: per-instance
//! state that stays out of the type's visible attribute listing and out of
//! anything built on top of it (serialization, diffing, display). Variable
//! names are declared per type in a [`Registry`], which hands out
//! [`Accessor`] pairs for them; [`visible_variables`] and [`all_variables`]
//! are the filtered and unfiltered introspection views.
//!
//! ```
//! use attic::{Attic, Registry, attic_object};
//!
//! struct Worker {
//!     name: String,
//!     attic: Attic,
//! }
//!
//! attic_object!(Worker { attic }, fields ["name"]);
//!
//! let registry = Registry::new();
//! registry.install::<Worker>();
//! registry.declare::<Worker>(&["size"]).unwrap();
//!
//! let mut w = Worker { name: "kiln".into(), attic: Attic::new() };
//! let size = registry.accessor::<Worker>("size").unwrap();
//! size.set_value(&mut w, 42usize);
//! assert_eq!(size.get_as::<usize>(&w), Some(&42));
//!
//! // Hidden from the visible listing, present in the diagnostic one.
//! assert_eq!(attic::visible_variables(&w), ["name"]);
//! assert!(attic::all_variables(&w).contains(&"___attic_size".to_string()));
//! ```
//!
//! Long-lived processes normally share the [`global()`] registry instead of
//! holding their own.
//!
//! Not every value can carry hidden state: a type that never embedded an
//! [`Attic`] has nowhere to put it. [`Registry::supports_attic`] probes for
//! the capability and caches the misses.

mod accessor;
mod error;
mod name;
mod object;
mod registry;
mod store;

pub use accessor::Accessor;
pub use error::AtticError;
pub use name::{INSTANCE_PREFIX, TYPE_PREFIX, VarName, is_shadow_key};
pub use object::{AtticObject, all_variables, visible_variables};
pub use registry::{Registry, SharedValue, global};
pub use store::{Attic, VarValue};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[derive(Default)]
    struct Worker {
        name: String,
        attic: Attic,
    }

    attic_object!(Worker { attic }, fields ["name"]);

    #[derive(Default)]
    struct BaseJob {
        attic: Attic,
    }

    attic_object!(BaseJob { attic });

    #[derive(Default)]
    struct CronJob {
        attic: Attic,
    }

    attic_object!(CronJob { attic });

    fn worker_registry() -> Registry {
        let registry = Registry::new();
        registry.install::<Worker>();
        registry
    }

    // ── Declaration ────────────────────────────────────────────────

    #[test]
    fn redeclaring_is_idempotent() {
        let registry = worker_registry();
        registry.declare::<Worker>(&["size"]).unwrap();
        let before = registry.variables::<Worker>().len();
        registry.declare::<Worker>(&["size"]).unwrap();
        assert_eq!(
            registry.variables::<Worker>().len(),
            before,
            "redeclaring must not grow the declared list"
        );
    }

    #[test]
    fn declaring_on_an_uninstalled_type_is_wrong_mixin_usage() {
        let registry = Registry::new();
        let err = registry.declare::<Worker>(&["size"]).unwrap_err();
        assert!(matches!(err, AtticError::WrongMixinUsage { .. }));
    }

    #[test]
    fn construct_all_admits_unknown_types() {
        let registry = Registry::new();
        registry.construct_all();
        registry.declare::<Worker>(&["size"]).unwrap();
        assert!(registry.is_installed::<Worker>());

        let mut w = Worker::default();
        registry.set(&mut w, "mood", Box::new("grim")).unwrap();
        assert!(registry.is_declared::<Worker>("mood"));
    }

    // ── Storage ────────────────────────────────────────────────────

    #[test]
    fn unset_variables_read_as_absent() {
        let registry = worker_registry();
        registry.declare::<Worker>(&["size"]).unwrap();
        let w = Worker::default();
        assert!(registry.get(&w, "size").is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let registry = worker_registry();
        let mut w = Worker::default();
        registry.set(&mut w, "size", Box::new(42u32)).unwrap();
        let value = registry.get(&w, "size").expect("stored value");
        assert_eq!(value.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn instances_never_observe_each_other() {
        let registry = worker_registry();
        registry.declare::<Worker>(&["size"]).unwrap();

        let mut a = Worker::default();
        let mut b = Worker::default();
        registry.set(&mut a, "size", Box::new(1u8)).unwrap();
        registry.set(&mut b, "size", Box::new(2u8)).unwrap();

        assert_eq!(a.attic_variable_get::<u8>("size"), Some(&1));
        assert_eq!(b.attic_variable_get::<u8>("size"), Some(&2));
    }

    #[test]
    fn explicit_set_does_not_create_an_accessor() {
        let registry = worker_registry();
        let mut w = Worker::default();
        registry.set(&mut w, "size", Box::new(100u8)).unwrap();

        assert!(registry.is_declared::<Worker>("size"));
        assert!(
            registry.accessor::<Worker>("size").is_none(),
            "explicit writes must not define accessors"
        );
    }

    // ── Accessors ──────────────────────────────────────────────────

    #[test]
    fn declared_names_get_working_accessors() {
        let registry = worker_registry();
        registry.declare::<Worker>(&["size"]).unwrap();

        let mut w = Worker::default();
        let size = registry.accessor::<Worker>("size").unwrap();
        size.set_value(&mut w, 42u32);
        assert_eq!(size.get_as::<u32>(&w), Some(&42));
    }

    #[test]
    fn accessor_collision_is_reported_not_silent() {
        init_logging();
        let registry = worker_registry();

        let sentinel = VarName::new("recorded");
        let write_sentinel = sentinel.clone();
        let custom = Accessor::with_fns(
            VarName::new("size"),
            |obj: &dyn AtticObject| obj.attic().get(&VarName::new("recorded")),
            move |obj: &mut dyn AtticObject, value| obj.attic_mut().set(write_sentinel.clone(), value),
        );
        assert_eq!(registry.define_accessor::<Worker>(custom), Ok(true));

        // The declaration still registers the name, but generation is
        // skipped for the occupied accessor slot.
        registry.declare::<Worker>(&["size"]).unwrap();
        assert!(registry.is_declared::<Worker>("size"));

        let mut w = Worker::default();
        let accessor = registry.accessor::<Worker>("size").unwrap();
        accessor.set_value(&mut w, 5u8);
        assert!(w.attic().contains(&sentinel), "first writer wins");

        // The declared variable stays reachable through the explicit path.
        registry.set(&mut w, "size", Box::new(7u8)).unwrap();
        assert_eq!(w.attic_variable_get::<u8>("size"), Some(&7));
    }

    // ── Visibility ─────────────────────────────────────────────────

    #[test]
    fn attic_variables_are_hidden_from_visible_listing() {
        let registry = worker_registry();
        registry.declare::<Worker>(&["mattress"]).unwrap();

        let mut w = Worker::default();
        registry
            .set(&mut w, "mattress", Box::new("S&F".to_string()))
            .unwrap();

        let visible = visible_variables(&w);
        assert_eq!(visible, ["name"]);
        assert!(
            visible.iter().all(|key| !is_shadow_key(key)),
            "no storage key may be visible"
        );

        let all = all_variables(&w);
        assert!(all.contains(&"___attic_mattress".to_string()));
    }

    #[test]
    fn visible_listing_is_stable_across_writes() {
        let registry = worker_registry();
        let mut w = Worker::default();
        let before = visible_variables(&w);
        for i in 0..4u8 {
            registry.set(&mut w, "scratch", Box::new(i)).unwrap();
        }
        assert_eq!(visible_variables(&w), before);
    }

    // ── Inheritance propagation ────────────────────────────────────

    #[test]
    fn derive_copies_names_declared_so_far() {
        let registry = Registry::new();
        registry.install::<BaseJob>();
        registry.declare::<BaseJob>(&["retries"]).unwrap();

        registry.derive::<BaseJob, CronJob>().unwrap();
        assert!(registry.is_declared::<CronJob>("retries"));

        // Declared after derivation: must not propagate.
        registry.declare::<BaseJob>(&["timeout"]).unwrap();
        assert!(!registry.is_declared::<CronJob>("timeout"));
    }

    #[test]
    fn derived_accessors_reach_the_subtype_store() {
        let registry = Registry::new();
        registry.install::<BaseJob>();
        registry.declare::<BaseJob>(&["retries"]).unwrap();
        registry.derive::<BaseJob, CronJob>().unwrap();

        let mut job = CronJob::default();
        let retries = registry.accessor::<CronJob>("retries").unwrap();
        retries.set_value(&mut job, 3u32);
        assert_eq!(retries.get_as::<u32>(&job), Some(&3));
    }

    #[test]
    fn derive_requires_an_installed_base() {
        let registry = Registry::new();
        let err = registry.derive::<BaseJob, CronJob>().unwrap_err();
        assert!(matches!(err, AtticError::WrongMixinUsage { .. }));
    }

    // ── Eligibility ────────────────────────────────────────────────

    #[test]
    fn probe_misses_are_cached_with_identical_results() {
        init_logging();
        let registry = Registry::new();

        // `u64` never embedded an attic; the first probe walks the failure
        // path and records it, the second is served from the cache.
        let first = registry.supports_attic(&7u64);
        assert!(registry.marked_no_singleton(&7u64));
        let second = registry.supports_attic(&7u64);
        assert_eq!(first, second);
        assert!(!first);
    }

    #[test]
    fn require_attic_reports_no_singleton() {
        let registry = Registry::new();
        let err = registry.require_attic(&true).unwrap_err();
        assert!(matches!(err, AtticError::NoSingleton { .. }));
    }

    #[test]
    fn installed_types_probe_as_capable() {
        let registry = worker_registry();
        assert!(registry.supports_attic(&Worker::default()));
        assert!(!registry.marked_no_singleton(&Worker::default()));
    }

    // ── Worker scenario ────────────────────────────────────────────

    #[test]
    fn worker_end_to_end() {
        let registry = worker_registry();
        registry.declare::<Worker>(&["size"]).unwrap();

        let mut w = Worker {
            name: "miner".into(),
            attic: Attic::new(),
        };
        let size = registry.accessor::<Worker>("size").unwrap();
        size.set_value(&mut w, 42i64);

        assert_eq!(size.get_as::<i64>(&w), Some(&42));
        assert_eq!(w.name, "miner");
        let visible = visible_variables(&w);
        assert!(!visible.contains(&"size".to_string()));
        assert!(!visible.contains(&"___attic_size".to_string()));
    }

    // ── Global registry ────────────────────────────────────────────

    #[derive(Default)]
    struct GlobalProbe {
        attic: Attic,
    }

    attic_object!(GlobalProbe { attic });

    #[test]
    fn global_registry_backs_the_trait_sugar() {
        global().install::<GlobalProbe>();

        let mut p = GlobalProbe::default();
        p.attic_variable_set("ticket", 1234u32).unwrap();
        assert_eq!(p.attic_variable_get::<u32>("ticket"), Some(&1234));
        assert!(global().is_declared::<GlobalProbe>("ticket"));
    }

    // ── Type-level variables ───────────────────────────────────────

    #[test]
    fn type_variables_are_shared_and_invisible() {
        let registry = worker_registry();
        registry
            .type_variable_set::<Worker>("build_stamp", Arc::new("2a1f".to_string()))
            .unwrap();

        let stamp = registry.type_variable::<Worker>("build_stamp").unwrap();
        assert_eq!(stamp.downcast_ref::<String>(), Some(&"2a1f".to_string()));

        // Instance introspection never sees type-level storage.
        let w = Worker::default();
        assert_eq!(visible_variables(&w), ["name"]);
        assert_eq!(all_variables(&w), ["name"]);
    }
}
