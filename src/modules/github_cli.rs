//! GitHub CLI: authentication and SSH key registration through `gh`.
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::{Module, ModuleConfig, PackageContributions, package_manager};
use crate::catalog::{self, Operation};
use crate::config;
use crate::error::ConfigError;
use crate::exec::CommandRunner;
use crate::platform::Platform;

/// Registry name of the GitHub CLI module.
pub const NAME: &str = "github-cli";

const GH: &str = "gh";
const SSH_KEYGEN: &str = "ssh-keygen";
const DEFAULT_KEY_FILE: &str = "hostforge_github";
const GITHUB_HOST: &str = "github.com";

/// Settings sub-document of the GitHub CLI module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct GithubCliSettings {
    /// Environment variable holding the authentication token.
    pub token_env_key: String,
    /// Private key to register; a key is generated when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<PathBuf>,
    /// Title under which the key is registered (and later removed).
    pub key_title: String,
}

impl Default for GithubCliSettings {
    fn default() -> Self {
        Self {
            token_env_key: "GH_TOKEN".to_string(),
            ssh_key_path: None,
            key_title: "hostforge".to_string(),
        }
    }
}

type TokenLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Logs `gh` in and registers an SSH key with GitHub.
pub struct GithubCliModule {
    runner: Arc<dyn CommandRunner>,
    platform: Platform,
    manager: Option<String>,
    enabled: bool,
    settings: GithubCliSettings,
    dependencies: Vec<String>,
    home: Option<PathBuf>,
    token_lookup: TokenLookup,
}

impl fmt::Debug for GithubCliModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubCliModule")
            .field("platform", &self.platform)
            .field("manager", &self.manager)
            .field("enabled", &self.enabled)
            .field("settings", &self.settings)
            .field("dependencies", &self.dependencies)
            .field("home", &self.home)
            .finish_non_exhaustive()
    }
}

impl GithubCliModule {
    /// Create the module, reading the token from the process environment.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, platform: Platform) -> Self {
        Self {
            runner,
            platform,
            manager: None,
            enabled: true,
            settings: GithubCliSettings::default(),
            dependencies: vec![package_manager::NAME.to_string()],
            home: config::home_dir(),
            token_lookup: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Replace the settings (builder style).
    #[must_use]
    pub fn with_settings(mut self, settings: GithubCliSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Override the home directory used for the default key location.
    #[must_use]
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Override how the token variable is looked up.
    #[must_use]
    pub fn with_token_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.token_lookup = Box::new(lookup);
        self
    }

    fn gh(&self, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        Ok(self.runner.exec(GH, &args, false)?.text())
    }

    fn login(&self) -> Result<()> {
        let key = &self.settings.token_env_key;
        let Some(token) = (self.token_lookup)(key).filter(|t| !t.trim().is_empty()) else {
            bail!("environment variable {key} is not set; cannot authenticate gh");
        };
        let args = ["auth", "login", "--with-token"].map(String::from);
        self.runner
            .exec_with_input(GH, &args, &format!("{}\n", token.trim()), false)?;
        tracing::info!("authenticated gh with token from {key}");
        Ok(())
    }

    /// Private key path, generating a key at the default location if needed.
    fn ensure_key(&self) -> Result<PathBuf> {
        if let Some(path) = &self.settings.ssh_key_path {
            if !public_key(path).exists() {
                bail!("ssh key {} has no public key next to it", path.display());
            }
            return Ok(path.clone());
        }
        let home = self
            .home
            .as_deref()
            .context("cannot locate home directory for the default ssh key")?;
        let path = home.join(".ssh").join(DEFAULT_KEY_FILE);
        if public_key(&path).exists() {
            tracing::debug!("reusing ssh key {}", path.display());
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let args: Vec<String> = vec![
            "-t".into(),
            "ed25519".into(),
            "-N".into(),
            String::new(),
            "-q".into(),
            "-C".into(),
            self.settings.key_title.clone(),
            "-f".into(),
            path.display().to_string(),
        ];
        self.runner.exec(SSH_KEYGEN, &args, false)?;
        tracing::info!("generated ssh key {}", path.display());
        Ok(path)
    }

    fn add_key(&self) -> Result<()> {
        let key = public_key(&self.ensure_key()?);
        let key = key.display().to_string();
        let title = self.settings.key_title.as_str();
        self.gh(&["ssh-key", "add", key.as_str(), "--title", title])?;
        tracing::info!("registered ssh key '{}'", self.settings.key_title);
        Ok(())
    }

    fn remove_keys(&self) -> Result<()> {
        let listing = self.gh(&["ssh-key", "list"])?;
        let ids = key_ids(&listing, &self.settings.key_title);
        if ids.is_empty() {
            tracing::debug!("no ssh keys titled '{}'", self.settings.key_title);
        }
        for id in ids {
            self.gh(&["ssh-key", "delete", id, "--yes"])?;
            tracing::info!("deleted ssh key {id}");
        }
        Ok(())
    }

    /// Remove the `gh` package through the active package manager.
    fn uninstall(&self) -> Result<()> {
        let Some(manager) = self.manager.as_deref() else {
            tracing::debug!("no active package manager, leaving {GH} installed");
            return Ok(());
        };
        let resolution = catalog::resolve(manager, &self.platform)?;
        let executable = resolution.descriptor.executable;
        let argv = resolution
            .descriptor
            .argv(Operation::Uninstall, &[package_name(executable)]);
        self.runner.exec(executable, &argv, resolution.elevate)?;
        tracing::info!("removed {GH} with {executable}");
        Ok(())
    }
}

/// Name of the GitHub CLI package for a package-manager executable.
fn package_name(executable: &str) -> &'static str {
    if executable == catalog::PACMAN.executable {
        "github-cli"
    } else {
        GH
    }
}

fn public_key(path: &Path) -> PathBuf {
    let mut pub_path = path.as_os_str().to_owned();
    pub_path.push(".pub");
    PathBuf::from(pub_path)
}

/// IDs of keys titled `title` in `gh ssh-key list` output.
///
/// Each line is tab separated with the title first; the id is the first
/// purely numeric field after it.
fn key_ids<'a>(listing: &'a str, title: &str) -> Vec<&'a str> {
    listing
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t').map(str::trim);
            if fields.next()? != title {
                return None;
            }
            fields.find(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
        })
        .collect()
}

impl Module for GithubCliModule {
    fn name(&self) -> &str {
        NAME
    }

    fn parse_config(&mut self, raw: Option<&Value>) -> Result<(), ConfigError> {
        super::parse_entry(NAME, raw, &self.settings)?
            .apply(&mut self.enabled, &mut self.settings);
        Ok(())
    }

    fn config(&self) -> ModuleConfig {
        ModuleConfig::new(self.enabled, &self.settings)
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn setup(&self) -> Result<()> {
        self.login()?;
        self.add_key()
    }

    fn update(&self) -> Result<()> {
        let status = self.gh(&["auth", "status"])?;
        tracing::debug!("{}", status.trim_end());
        Ok(())
    }

    fn teardown(&self) -> Result<()> {
        self.remove_keys()?;
        self.gh(&["auth", "logout", "--hostname", GITHUB_HOST])?;
        tracing::info!("logged gh out of {GITHUB_HOST}");
        self.uninstall()
    }

    fn package_contributions(&self) -> PackageContributions {
        let mut contributions = PackageContributions::default();
        for descriptor in catalog::ALL {
            contributions.add(descriptor.executable, package_name(descriptor.executable));
        }
        contributions
    }

    fn accept_contributions(&mut self, contributions: &PackageContributions) {
        self.manager = contributions.manager().map(str::to_string);
    }
}
