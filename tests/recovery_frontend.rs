// tests/recovery_frontend.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, InvocationConfigBuilder};
use crate::common::Harness;

use std::io::Cursor;

use execward::errors::ExecError;
use execward::exec::{Payload, PolicyOverrides};
use execward::recovery::{
    automated_policy, AcceptFailures, AlwaysFail, Interactive, NamedInvocation, RecoveryChoice,
    RecoveryOutcome, RetryUpTo, Scripted,
};
use execward::types::RecoveryMode;

#[test]
fn retry_runs_again_until_success() {
    let h = Harness::new();
    h.spawner.clone().then_exit(1).then_exit(1).then_exit(0);

    let outcome = NamedInvocation::new("fetch", "/usr/bin/curl")
        .arg("-sf")
        .arg("https://example.invalid/")
        .run(&h.dispatcher, &mut RetryUpTo { max_retries: 2 })
        .unwrap();

    assert!(matches!(outcome, RecoveryOutcome::Completed(_)));
    assert_eq!(h.spawner.spawn_count(), 3);
}

#[test]
fn retry_budget_exhausted_propagates_last_failure() {
    let h = Harness::new();
    h.spawner.clone().then_exit(6).then_exit(7);

    let err = NamedInvocation::new("fetch", "/usr/bin/curl")
        .run(&h.dispatcher, &mut RetryUpTo { max_retries: 1 })
        .unwrap_err();

    assert_eq!(err.failure().unwrap().exit_code, 7);
    assert_eq!(h.spawner.spawn_count(), 2);
}

#[test]
fn retry_with_env_shadows_the_entry_for_the_next_attempt() {
    let h = Harness::new();
    h.spawner.clone().then_exit(1).then_exit(0);

    let mut policy = Scripted::new([RecoveryChoice::RetryWithEnv("DISPLAY=:1".into())]);
    NamedInvocation::new("clock", "/usr/bin/xclock")
        .overrides(PolicyOverrides::new().env_prepend(["DISPLAY=:0"]))
        .run(&h.dispatcher, &mut policy)
        .unwrap();

    let requests = h.spawner.requests();
    assert_eq!(requests.len(), 2);
    let display = |i: usize| {
        requests[i]
            .environment
            .iter()
            .find(|(k, _)| k == "DISPLAY")
            .map(|(_, v)| v.clone())
    };
    assert_eq!(display(0).as_deref(), Some(":0"));
    assert_eq!(display(1).as_deref(), Some(":1"));
}

#[test]
fn accepted_failure_is_a_no_op_success() {
    let h = Harness::new();
    h.spawner.clone().then_exit(2);

    let outcome = NamedInvocation::new("cleanup", "/bin/rm")
        .arg("/tmp/lock")
        .run(&h.dispatcher, &mut AcceptFailures)
        .unwrap();

    match &outcome {
        RecoveryOutcome::Accepted(err) => assert_eq!(err.failure().unwrap().exit_code, 2),
        other => panic!("expected Accepted, got {other:?}"),
    }
    assert_eq!(outcome.output(), None);
}

#[test]
fn default_policy_fails_on_first_error() {
    let h = Harness::new();
    h.spawner.clone().then_exit(1);

    let err = NamedInvocation::new("check", "/usr/bin/test")
        .run(&h.dispatcher, &mut AlwaysFail)
        .unwrap_err();

    assert!(err.is_execution_failure());
    assert_eq!(h.spawner.spawn_count(), 1);
}

#[test]
fn required_missing_program_is_fatal_before_spawn() {
    let h = Harness::new();

    let err = NamedInvocation::new("clock", "xclock")
        .required(true)
        .run(&h.dispatcher, &mut AcceptFailures)
        .unwrap_err();

    assert!(matches!(err, ExecError::RequiredExecutableNotFound(_)));
    assert_eq!(h.spawner.spawn_count(), 0);
}

#[test]
fn spawn_errors_are_never_offered_for_recovery() {
    let h = Harness::new();
    let _ = h.spawner.clone().refusing(std::io::ErrorKind::PermissionDenied);

    let err = NamedInvocation::new("locked", "/usr/sbin/reboot")
        .run(&h.dispatcher, &mut AcceptFailures)
        .unwrap_err();

    assert!(matches!(err, ExecError::Spawn { .. }));
    assert_eq!(h.spawner.spawn_count(), 1);
}

#[test]
fn interactive_operator_can_retry_with_env() {
    let h = Harness::new();
    h.spawner.clone().then_output(1, "cannot open display\n").then_exit(0);

    let mut transcript = Vec::new();
    let mut policy = Interactive::new(Cursor::new("e DISPLAY=:0\n"), &mut transcript);
    let outcome = NamedInvocation::new("clock", "/usr/bin/xclock")
        .overrides(PolicyOverrides::new().capture())
        .run(&h.dispatcher, &mut policy)
        .unwrap();

    assert_eq!(outcome.output().unwrap(), "");
    let transcript = String::from_utf8(transcript).unwrap();
    assert!(transcript.contains("invocation 'clock' failed (attempt 1)"));
    assert!(transcript.contains("cannot open display"));
}

#[test]
fn configured_invocation_runs_with_its_policy() {
    let h = Harness::new();
    let rsync = h.install("/usr/bin", "rsync");
    h.spawner.clone().then_exit(23).then_exit(24);

    let cfg = ConfigFileBuilder::new()
        .with_invocation(
            "sync",
            InvocationConfigBuilder::new("rsync")
                .arg("-a")
                .arg("src/")
                .ok("24", "vanished")
                .translate("23", "PartialTransfer")
                .recovery(RecoveryMode::Retry)
                .max_retries(1)
                .build(),
        )
        .build();
    let inv_cfg = &cfg.invocations["sync"];

    let mut policy = automated_policy(inv_cfg.recovery, inv_cfg.max_retries).unwrap();
    let outcome = NamedInvocation::from_config("sync", inv_cfg)
        .run(&h.dispatcher, policy.as_mut())
        .unwrap();

    match outcome {
        RecoveryOutcome::Completed(ok) => assert_eq!(ok.payload, Payload::Token("vanished".into())),
        other => panic!("expected Completed, got {other:?}"),
    }
    let first = &h.spawner.requests()[0];
    assert_eq!(first.program, rsync);
    assert_eq!(first.arguments, vec!["-a", "src/"]);
}

#[test]
fn interactive_mode_has_no_automated_policy() {
    assert!(automated_policy(RecoveryMode::Interactive, 0).is_none());
    assert!(automated_policy(RecoveryMode::Accept, 0).is_some());
}
