// tests/context_scopes.rs

mod common;
use crate::common::Harness;

use std::panic::{self, AssertUnwindSafe};

use proptest::prelude::*;

use execward::context;
use execward::exec::{Environment, ExitCodeTable, OutputSink, Payload, PolicyOverrides};
use execward::types::WaitMode;

#[test]
fn scope_is_restored_after_a_panic() {
    let before = context::current();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        context::dry_run(|| {
            context::capturing(|| {
                assert!(context::current().flags().dry_run);
                panic!("boom");
            })
        })
    }));

    assert!(result.is_err());
    let after = context::current();
    assert_eq!(after.flags(), before.flags());
    assert!(matches!(after.output(), OutputSink::Discard));
}

#[test]
fn guards_dropped_out_of_order_do_not_leave_dry_run_on() {
    let h = Harness::new();

    let dry = context::enter(&PolicyOverrides::new().dry_run(true));
    let loud = context::enter(&PolicyOverrides::new().verbose(true));
    drop(dry);
    drop(loud);

    let flags = context::current().flags();
    assert!(!flags.dry_run);
    assert!(!flags.verbose);

    h.dispatcher
        .run("/bin/true", Vec::<String>::new(), &PolicyOverrides::new())
        .unwrap();
    assert_eq!(h.spawner.spawn_count(), 1);
}

#[test]
fn call_site_override_beats_scope() {
    let h = Harness::new();
    h.spawner.clone().then_exit(0);

    let ok = context::with_exit_codes(ExitCodeTable::from_entries([(0, "scoped")]), || {
        h.dispatcher.run(
            "/bin/true",
            Vec::<String>::new(),
            &PolicyOverrides::new().exit_codes(ExitCodeTable::from_entries([(0, "call-site")])),
        )
    })
    .unwrap();

    assert_eq!(ok.payload, Payload::Token("call-site".into()));
}

#[test]
fn replaced_environment_drops_the_default() {
    let h = Harness::new();

    context::with_environment(Environment::new(["PATH=/usr/bin"]), || {
        h.dispatcher.run("/usr/bin/env", Vec::<String>::new(), &PolicyOverrides::new())
    })
    .unwrap();

    assert_eq!(
        h.spawner.last_request().unwrap().environment,
        vec![("PATH".to_string(), "/usr/bin".to_string())]
    );
}

#[test]
fn install_guard_swaps_the_whole_policy() {
    let replacement = context::snapshot(&PolicyOverrides::new().verbose(true).asynchronous());
    {
        let _guard = context::install(replacement);
        assert!(context::current().flags().verbose);
        assert_eq!(context::current().wait(), WaitMode::NonBlocking);
    }
    assert!(!context::current().flags().verbose);
    assert_eq!(context::current().wait(), WaitMode::Blocking);
}

fn env_key() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9_]{0,6}"
}

proptest! {
    /// Whatever was prepended last is what the child sees for that key.
    #[test]
    fn prepended_entries_shadow_existing_ones(
        base in proptest::collection::vec((env_key(), "[a-z0-9]{0,5}"), 0..6),
        key in env_key(),
        value in "[a-z0-9]{1,5}",
    ) {
        let base: Vec<String> = base.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let entry = format!("{key}={value}");

        let env = context::with_environment(Environment::new(base.clone()), || {
            context::with_environment_prepended([entry.clone()], || {
                context::current().environment().clone()
            })
        });

        prop_assert_eq!(env.get(&key), Some(value.as_str()));
        prop_assert_eq!(env.entries().len(), base.len() + 1);

        let pairs = env.effective_pairs();
        prop_assert_eq!(pairs.iter().filter(|(k, _)| *k == key).count(), 1);
        prop_assert_eq!(&pairs[0], &(key.clone(), value.clone()));

        // Leaving both scopes restores the default.
        let current = context::current();
        prop_assert_eq!(current.environment(), &Environment::minimal());
    }

    /// Nesting depth does not matter: every scope unwinds.
    #[test]
    fn nested_scopes_always_unwind(depth in 1usize..12) {
        fn nest(n: usize) -> bool {
            if n == 0 {
                return context::current().flags().verbose;
            }
            context::verbose(|| nest(n - 1))
        }
        prop_assert!(nest(depth));
        prop_assert!(!context::current().flags().verbose);
    }
}
