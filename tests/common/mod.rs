// Shared helpers for integration tests.
//
// Provides a call-recording command runner, a scriptable fake module, and a
// temporary settings file so each integration test can drive the registry
// without touching the host.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use serde_yaml::Value;

use hostforge::error::{ConfigError, ExecError};
use hostforge::exec::{CommandRunner, ExecOutput};
use hostforge::modules::{Module, ModuleConfig, parse_entry};

/// One observed runner call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub input: Option<String>,
    pub elevate: bool,
}

/// A [`CommandRunner`] that records calls and fails for one program.
#[derive(Debug, Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<Call>>,
    fail_program: Option<String>,
}

impl FakeRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail every call to `program` with exit status 1.
    pub fn failing(program: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_program: Some(program.to_string()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(
        &self,
        program: &str,
        args: &[String],
        input: Option<&str>,
        elevate: bool,
    ) -> Result<ExecOutput, ExecError> {
        self.calls.lock().expect("calls lock").push(Call {
            program: program.to_string(),
            args: args.to_vec(),
            input: input.map(str::to_string),
            elevate,
        });
        if self.fail_program.as_deref() == Some(program) {
            return Err(ExecError::Failed {
                command: format!("{program} {}", args.join(" ")),
                code: Some(1),
                output: format!("{program}: simulated failure"),
            });
        }
        Ok(ExecOutput {
            output: Vec::new(),
            code: Some(0),
        })
    }
}

impl CommandRunner for FakeRunner {
    fn exec(&self, program: &str, args: &[String], elevate: bool) -> Result<ExecOutput, ExecError> {
        self.record(program, args, None, elevate)
    }

    fn exec_with_input(
        &self,
        program: &str,
        args: &[String],
        input: &str,
        elevate: bool,
    ) -> Result<ExecOutput, ExecError> {
        self.record(program, args, Some(input), elevate)
    }
}

/// Upcast a fake runner for [`hostforge::modules::default_registry`].
pub fn as_runner(runner: &Arc<FakeRunner>) -> Arc<dyn CommandRunner> {
    Arc::clone(runner) as Arc<dyn CommandRunner>
}

/// Shared record of hook invocations, formatted as `action:name`.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().expect("journal lock").clone()
}

/// A module whose hooks only append to a [`Journal`].
pub struct FakeModule {
    name: String,
    deps: Vec<String>,
    enabled: bool,
    fail_setup: bool,
    journal: Journal,
}

impl FakeModule {
    pub fn new(name: &str, deps: &[&str], journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            deps: deps.iter().map(ToString::to_string).collect(),
            enabled: true,
            fail_setup: false,
            journal: Arc::clone(journal),
        }
    }

    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    fn record(&self, action: &str) {
        self.journal
            .lock()
            .expect("journal lock")
            .push(format!("{action}:{}", self.name));
    }
}

impl Module for FakeModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse_config(&mut self, raw: Option<&Value>) -> Result<(), ConfigError> {
        let mut settings = Value::Null;
        parse_entry(&self.name, raw, &settings)?.apply(&mut self.enabled, &mut settings);
        Ok(())
    }

    fn config(&self) -> ModuleConfig {
        ModuleConfig::new(self.enabled, &Value::Null)
    }

    fn dependencies(&self) -> &[String] {
        &self.deps
    }

    fn setup(&self) -> Result<()> {
        self.record("setup");
        if self.fail_setup {
            bail!("{} setup failed", self.name);
        }
        Ok(())
    }

    fn update(&self) -> Result<()> {
        self.record("update");
        Ok(())
    }

    fn teardown(&self) -> Result<()> {
        self.record("teardown");
        Ok(())
    }
}

/// A settings file inside a [`tempfile::TempDir`].
pub struct SettingsFile {
    pub dir: tempfile::TempDir,
    pub path: PathBuf,
}

impl SettingsFile {
    /// Write `yaml` to `<tmp>/config.yml`.
    pub fn new(yaml: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.yml");
        std::fs::write(&path, yaml).expect("write settings file");
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
