//! Host command execution.
//!
//! Every module touches the host through the [`CommandRunner`] trait. The
//! real implementation, [`SystemRunner`], delegates the decision of *how* a
//! program is located and elevated to a [`Launcher`] strategy so tests (and
//! the `--no-sudo` flag) can swap it without touching call sites.
use std::fmt;
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use crate::error::ExecError;

/// Privilege-escalation wrapper used by [`SudoLauncher`].
const SUDO: &str = "sudo";

/// A fully assembled command line.
///
/// Always argv form: package names and other user data are passed as
/// separate arguments, never spliced into a shell string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to spawn.
    pub program: PathBuf,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Create an invocation with no extra environment.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Combined output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Standard output followed by standard error.
    pub output: Vec<u8>,
    /// Exit code (`Some(0)` for a normal successful exit).
    pub code: Option<i32>,
}

impl ExecOutput {
    /// Output decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Runs external commands on behalf of modules.
///
/// Both methods block until the child exits. On failure the returned
/// [`ExecError`] still carries whatever output was captured.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, elevating when `elevate` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be found or spawned, or if it
    /// exits unsuccessfully.
    fn exec(&self, program: &str, args: &[String], elevate: bool) -> Result<ExecOutput, ExecError>;

    /// Run `program` with `input` written to its standard input.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be found or spawned, if it
    /// exits unsuccessfully, or if writing its standard input fails.
    fn exec_with_input(
        &self,
        program: &str,
        args: &[String],
        input: &str,
        elevate: bool,
    ) -> Result<ExecOutput, ExecError>;
}

/// Strategy that turns a program name into a concrete [`Invocation`].
pub trait Launcher: fmt::Debug + Send + Sync {
    /// Build the invocation for `program`, applying elevation when requested.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::ExecutableNotFound`] if `program` is not on `PATH`.
    fn invocation(
        &self,
        program: &str,
        args: &[String],
        elevate: bool,
    ) -> Result<Invocation, ExecError>;
}

/// Resolve `program` on the executable search path.
fn locate(program: &str) -> Result<PathBuf, ExecError> {
    which::which(program).map_err(|_| ExecError::ExecutableNotFound(program.to_string()))
}

/// Default launcher: elevates through `sudo`.
///
/// The target program is resolved to an absolute path before being handed
/// to `sudo`, so `sudo`'s own `secure_path` cannot pick a different binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SudoLauncher;

impl Launcher for SudoLauncher {
    fn invocation(
        &self,
        program: &str,
        args: &[String],
        elevate: bool,
    ) -> Result<Invocation, ExecError> {
        let path = locate(program)?;
        if !elevate {
            return Ok(Invocation::new(path, args.to_vec()));
        }
        let mut elevated = Vec::with_capacity(args.len() + 1);
        elevated.push(path.display().to_string());
        elevated.extend_from_slice(args);
        Ok(Invocation::new(SUDO, elevated))
    }
}

/// Launcher that never elevates (e.g. when already running as root).
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectLauncher;

impl Launcher for DirectLauncher {
    fn invocation(
        &self,
        program: &str,
        args: &[String],
        _elevate: bool,
    ) -> Result<Invocation, ExecError> {
        Ok(Invocation::new(locate(program)?, args.to_vec()))
    }
}

/// [`CommandRunner`] that spawns real processes.
#[derive(Debug)]
pub struct SystemRunner {
    launcher: Box<dyn Launcher>,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(SudoLauncher)
    }
}

impl SystemRunner {
    /// Create a runner that builds invocations with `launcher`.
    #[must_use]
    pub fn new(launcher: impl Launcher + 'static) -> Self {
        Self {
            launcher: Box::new(launcher),
        }
    }
}

/// Combine stdout and stderr, bailing on non-zero exit.
fn finish(invocation: &Invocation, output: Output) -> Result<ExecOutput, ExecError> {
    let code = output.status.code();
    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);
    if !output.status.success() {
        return Err(ExecError::Failed {
            command: invocation.to_string(),
            code,
            output: String::from_utf8_lossy(&combined).into_owned(),
        });
    }
    Ok(ExecOutput {
        output: combined,
        code,
    })
}

impl CommandRunner for SystemRunner {
    fn exec(&self, program: &str, args: &[String], elevate: bool) -> Result<ExecOutput, ExecError> {
        let invocation = self.launcher.invocation(program, args, elevate)?;
        tracing::debug!("executing: {invocation}");
        let output = invocation
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExecError::Spawn {
                program: invocation.program_name(),
                source,
            })?;
        finish(&invocation, output)
    }

    fn exec_with_input(
        &self,
        program: &str,
        args: &[String],
        input: &str,
        elevate: bool,
    ) -> Result<ExecOutput, ExecError> {
        let invocation = self.launcher.invocation(program, args, elevate)?;
        tracing::debug!("executing with piped input: {invocation}");
        let mut child = invocation
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: invocation.program_name(),
                source,
            })?;

        // The writer runs on its own thread while this one drains stdout and
        // stderr, so a child that answers before reading all of its input
        // cannot fill a pipe buffer and stall both sides.
        let stdin = child.stdin.take();
        let (written, waited) = std::thread::scope(|s| {
            let writer = s.spawn(move || -> io::Result<()> {
                if let Some(mut pipe) = stdin {
                    pipe.write_all(input.as_bytes())?;
                    pipe.flush()?;
                }
                Ok(())
            });
            let waited = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (written, waited)
        });

        let output = waited.map_err(|source| ExecError::Spawn {
            program: invocation.program_name(),
            source,
        })?;
        let result = finish(&invocation, output)?;
        written.map_err(|source| ExecError::Stdin {
            program: invocation.program_name(),
            source,
            output: result.text(),
        })?;
        Ok(result)
    }
}


#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn missing_program_is_reported_before_spawn() {
        let err = SudoLauncher
            .invocation("this-program-does-not-exist-12345", &[], true)
            .unwrap_err();
        assert!(matches!(err, ExecError::ExecutableNotFound(ref p) if p == "this-program-does-not-exist-12345"));
    }

    #[test]
    fn invocation_display_joins_args() {
        let inv = Invocation::new("sudo", args(&["/usr/bin/dnf", "install", "-y"]));
        assert_eq!(inv.to_string(), "sudo /usr/bin/dnf install -y");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        #[test]
        fn sudo_launcher_without_elevation_runs_program_directly() {
            let inv = SudoLauncher
                .invocation("sh", &args(&["-c", "true"]), false)
                .unwrap();
            assert!(inv.program.ends_with("sh"));
            assert_eq!(inv.args, args(&["-c", "true"]));
        }

        #[test]
        fn sudo_launcher_prefixes_resolved_program() {
            let inv = SudoLauncher
                .invocation("sh", &args(&["-c", "true"]), true)
                .unwrap();
            assert_eq!(inv.program, PathBuf::from("sudo"));
            assert!(inv.args[0].ends_with("sh"), "first arg should be the resolved path");
            assert!(std::path::Path::new(&inv.args[0]).is_absolute());
            assert_eq!(&inv.args[1..], &args(&["-c", "true"])[..]);
        }

        #[test]
        fn direct_launcher_ignores_elevation() {
            let inv = DirectLauncher
                .invocation("sh", &args(&["-c", "true"]), true)
                .unwrap();
            assert!(inv.program.ends_with("sh"));
            assert_eq!(inv.args, args(&["-c", "true"]));
        }

        #[test]
        fn exec_returns_stdout() {
            let runner = SystemRunner::default();
            let out = runner.exec("echo", &args(&["hello"]), false).unwrap();
            assert_eq!(out.text().trim(), "hello");
            assert_eq!(out.code, Some(0));
        }

        #[test]
        fn exec_combines_stdout_and_stderr() {
            let runner = SystemRunner::default();
            let out = runner
                .exec("sh", &args(&["-c", "echo out; echo err >&2"]), false)
                .unwrap();
            let text = out.text();
            assert!(text.contains("out"));
            assert!(text.contains("err"));
        }

        #[test]
        fn exec_failure_keeps_output_and_code() {
            let runner = SystemRunner::default();
            let err = runner
                .exec("sh", &args(&["-c", "echo oops; exit 3"]), false)
                .unwrap_err();
            match err {
                ExecError::Failed { code, output, .. } => {
                    assert_eq!(code, Some(3));
                    assert!(output.contains("oops"));
                }
                other => panic!("expected Failed, got {other:?}"),
            }
        }

        #[test]
        fn exec_with_input_round_trips_stdin() {
            let runner = SystemRunner::default();
            let out = runner.exec_with_input("cat", &[], "hello\n", false).unwrap();
            assert!(out.text().contains("hello"));
        }

        #[test]
        fn exec_with_input_large_payload_does_not_deadlock() {
            // Larger than any default pipe buffer, echoed straight back.
            let payload = "x".repeat(4 * 1024 * 1024);
            let runner = SystemRunner::default();
            let out = runner.exec_with_input("cat", &[], &payload, false).unwrap();
            assert_eq!(out.output.len(), payload.len());
        }

        #[test]
        fn exec_with_input_failure_keeps_output() {
            let runner = SystemRunner::default();
            let err = runner
                .exec_with_input("sh", &args(&["-c", "cat; exit 2"]), "piped\n", false)
                .unwrap_err();
            assert_eq!(err.output().map(str::trim), Some("piped"));
        }
    }
}
