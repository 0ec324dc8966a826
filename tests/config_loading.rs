// tests/config_loading.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, InvocationConfigBuilder};

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use execward::config::{load_and_validate, load_with};
use execward::errors::ExecError;
use execward::exec::{Environment, OutputSink, Payload};
use execward::fs::mock::MockFileSystem;
use execward::types::{EnvMode, OutputMode, RecoveryMode};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn empty_file_yields_defaults() {
    let file = write_config("");
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(
        cfg.settings.search_paths,
        vec![PathBuf::from("/usr/bin"), PathBuf::from("/bin")]
    );
    assert_eq!(cfg.settings.default_env, Environment::minimal());
    assert_eq!(cfg.settings.output, OutputMode::Discard);
    assert!(!cfg.settings.flags.dry_run);
    assert_eq!(cfg.remote.program, "ssh");
    assert!(cfg.invocations.is_empty());
}

#[test]
fn full_file_is_parsed_and_checked() {
    let file = write_config(
        r#"
[config]
search_paths = ["/usr/local/bin", "/usr/bin"]
default_env = ["HOME=/tmp", "PATH=/usr/bin:/bin"]
output = "capture"
verbose = true

[remote]
program = "ssh"
options = ["-p", "2222"]

[invocation.sync]
program = "rsync"
args = ["-a", "src/", "backup:/srv/src/"]
env = ["RSYNC_RSH=ssh -p 2222"]
valid_exit_codes = { 0 = true, 24 = "vanished", 25 = 3 }
translations = { 23 = { kind = "PartialTransfer", fields = { hint = "check permissions" } } }
explanation = "sync {} to {}"
explanation_args = ["src", "backup"]
recovery = "retry"
max_retries = 2
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.settings.output, OutputMode::Capture);
    assert!(cfg.settings.flags.verbose);
    assert_eq!(cfg.settings.default_env.get("PATH"), Some("/usr/bin:/bin"));
    assert!(cfg.settings.ambient_policy().output().is_capture());
    assert_eq!(cfg.remote.options, vec!["-p", "2222"]);

    let sync = &cfg.invocations["sync"];
    assert_eq!(sync.program, "rsync");
    assert_eq!(sync.env_mode, EnvMode::Prepend);
    assert_eq!(sync.recovery, RecoveryMode::Retry);
    assert_eq!(sync.max_retries, 2);

    let codes = sync.valid_exit_codes.as_ref().unwrap();
    assert_eq!(codes.lookup(0), Some(&Payload::Bool(true)));
    assert_eq!(codes.lookup(24), Some(&Payload::Token("vanished".into())));
    assert_eq!(codes.lookup(25), Some(&Payload::Int(3)));

    let tr = sync.translations.lookup(23).unwrap();
    assert_eq!(tr.kind, "PartialTransfer");
    assert_eq!(tr.fields["hint"], "check permissions");

    assert_eq!(
        sync.explanation.as_ref().unwrap().render(),
        "sync src to backup"
    );

    let overrides = sync.overrides();
    assert!(overrides.environment.is_none());
    assert_eq!(
        overrides.env_extension.unwrap().get("RSYNC_RSH"),
        Some("ssh -p 2222")
    );
}

#[test]
fn unknown_output_mode_is_an_output_sink_error() {
    let file = write_config("[config]\noutput = \"printer\"\n");
    match load_and_validate(file.path()) {
        Err(ExecError::InvalidOutputSink(msg)) => assert!(msg.contains("printer")),
        other => panic!("expected InvalidOutputSink, got {other:?}"),
    }
}

#[test]
fn non_integer_exit_code_key_is_rejected() {
    let file = write_config(
        "[invocation.x]\nprogram = \"true\"\nvalid_exit_codes = { zero = true }\n",
    );
    match load_and_validate(file.path()) {
        Err(ExecError::ConfigError(msg)) => assert!(msg.contains("zero")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = write_config("[config\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(ExecError::TomlError(_))
    ));
}

#[test]
fn builder_rejects_invalid_invocations() {
    let cases = [
        InvocationConfigBuilder::new("  ").build(),
        InvocationConfigBuilder::new("curl").env("NOEQUALS").build(),
        InvocationConfigBuilder::new("curl").recovery(RecoveryMode::Retry).build(),
        InvocationConfigBuilder::new("curl").translate("7", "").build(),
    ];

    for (i, inv) in cases.into_iter().enumerate() {
        let result = ConfigFileBuilder::new().with_invocation("bad", inv).try_build();
        assert!(
            matches!(result, Err(ExecError::ConfigError(_))),
            "case {i}: {result:?}"
        );
    }
}

#[test]
fn empty_search_path_is_rejected() {
    let result = ConfigFileBuilder::new().with_search_paths(&[]).try_build();
    assert!(matches!(result, Err(ExecError::ConfigError(_))));
}

#[test]
fn replace_mode_installs_the_environment_verbatim() {
    let cfg = ConfigFileBuilder::new()
        .with_invocation(
            "clean",
            InvocationConfigBuilder::new("/usr/bin/env")
                .env("ONLY=this")
                .env_mode(EnvMode::Replace)
                .output("inherit")
                .build(),
        )
        .build();

    let overrides = cfg.invocations["clean"].overrides();
    assert_eq!(overrides.environment, Some(Environment::new(["ONLY=this"])));
    assert!(matches!(overrides.output, Some(OutputSink::Inherit)));
}

#[test]
fn loads_through_a_mock_filesystem() {
    let fs = MockFileSystem::new();
    fs.add_file("/etc/execward/Execward.toml", "[remote]\nprogram = \"mosh\"\n");

    let raw = load_with(&fs, Path::new("/etc/execward/Execward.toml")).unwrap();
    assert_eq!(raw.remote.program, "mosh");

    let missing = load_with(&fs, Path::new("/etc/execward/other.toml"));
    assert!(matches!(missing, Err(ExecError::Other(_))));
}
