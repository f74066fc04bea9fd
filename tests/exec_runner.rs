#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr
)]
//! Integration tests for [`SystemRunner`] through a swapped launcher.
//!
//! The launcher re-invokes this test binary in a child mode (the
//! `helper_process` test) instead of spawning real host programs, so the
//! piped-stdin path and failure reporting are exercised end to end without
//! touching the system.

use std::io::{self, Read as _, Write as _};

use hostforge::error::ExecError;
use hostforge::exec::{CommandRunner, Invocation, Launcher, SystemRunner};

const HELPER_ENV: &str = "HOSTFORGE_HELPER_PROCESS";
const MODE_ENV: &str = "HOSTFORGE_HELPER_MODE";
const ELEVATED_ENV: &str = "HOSTFORGE_HELPER_ELEVATED";

/// Routes every program to this test binary's `helper_process` test.
#[derive(Debug)]
struct HelperLauncher;

impl Launcher for HelperLauncher {
    fn invocation(
        &self,
        program: &str,
        args: &[String],
        elevate: bool,
    ) -> Result<Invocation, ExecError> {
        let exe = std::env::current_exe()
            .map_err(|_| ExecError::ExecutableNotFound(program.to_string()))?;
        let mut argv: Vec<String> = ["helper_process", "--exact", "--nocapture", "-q"]
            .map(String::from)
            .to_vec();
        argv.push("--".to_string());
        argv.extend_from_slice(args);
        let mut invocation = Invocation::new(exe, argv);
        invocation.env = vec![
            (HELPER_ENV.to_string(), "1".to_string()),
            (MODE_ENV.to_string(), program.to_string()),
            (ELEVATED_ENV.to_string(), elevate.to_string()),
        ];
        Ok(invocation)
    }
}

/// Child-mode entry point; a no-op when run as a normal test.
#[test]
fn helper_process() {
    if std::env::var_os(HELPER_ENV).is_none() {
        return;
    }
    let mode = std::env::var(MODE_ENV).unwrap_or_default();
    let elevated = std::env::var(ELEVATED_ENV).unwrap_or_default();
    let mut stdout = io::stdout();
    match mode.as_str() {
        "echo" => {
            let mut input = Vec::new();
            io::stdin().read_to_end(&mut input).unwrap();
            stdout.write_all(&input).unwrap();
        }
        "whoami" => {
            println!("elevated={elevated}");
        }
        "fail" => {
            eprintln!("helper: refusing to continue");
            stdout.flush().unwrap();
            std::process::exit(3);
        }
        other => {
            eprintln!("helper: unknown mode {other}");
            std::process::exit(2);
        }
    }
    stdout.flush().unwrap();
    std::process::exit(0);
}

fn runner() -> SystemRunner {
    SystemRunner::new(HelperLauncher)
}

#[test]
fn stdin_round_trip() {
    let out = runner().exec_with_input("echo", &[], "hello\n", false).unwrap();
    assert!(out.text().contains("hello"), "{}", out.text());
    assert_eq!(out.code, Some(0));
}

#[test]
fn large_stdin_does_not_deadlock() {
    let payload = "0123456789abcdef\n".repeat(256 * 1024);
    let out = runner().exec_with_input("echo", &[], &payload, false).unwrap();
    assert!(out.output.len() >= payload.len());
    assert!(out.text().contains(&payload));
}

#[test]
fn elevation_reaches_the_launcher() {
    let out = runner().exec("whoami", &[], true).unwrap();
    assert!(out.text().contains("elevated=true"), "{}", out.text());
    let out = runner().exec("whoami", &[], false).unwrap();
    assert!(out.text().contains("elevated=false"), "{}", out.text());
}

#[test]
fn failure_keeps_exit_code_and_output() {
    let err = runner().exec("fail", &[], false).unwrap_err();
    match &err {
        ExecError::Failed { code, output, .. } => {
            assert_eq!(*code, Some(3));
            assert!(output.contains("refusing to continue"), "{output}");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn failure_with_input_keeps_output() {
    let err = runner()
        .exec_with_input("fail", &[], "ignored\n", false)
        .unwrap_err();
    assert!(err.output().unwrap().contains("refusing to continue"));
}
