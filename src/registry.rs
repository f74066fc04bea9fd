//! Module registry: settings distribution, dependency ordering, and
//! lifecycle execution.
use std::collections::HashMap;
use std::fmt;

use crate::config::SettingsDocument;
use crate::error::{ConfigError, GraphError, RegistryError};
use crate::modules::{Module, PackageContributions};

/// Lifecycle action driven across every module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Bring the host into the configured state.
    Setup,
    /// Refresh installed state.
    Update,
    /// Undo setup.
    Teardown,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Update => write!(f, "update"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}

/// Visit state for the depth-first resolver.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Owns every module and drives them in dependency order.
#[derive(Default)]
pub struct Registry {
    modules: HashMap<String, Box<dyn Module>>,
    dependencies: HashMap<String, Vec<String>>,
    order: Vec<String>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("modules", &self.order)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `module` under its name, replacing any previous module of that
    /// name. Its dependency list is captured now.
    pub fn register(&mut self, module: Box<dyn Module>) {
        let name = module.name().to_string();
        self.dependencies
            .insert(name.clone(), module.dependencies().to_vec());
        if self.modules.insert(name.clone(), module).is_some() {
            tracing::debug!("replaced module '{name}'");
        } else {
            self.order.push(name);
        }
    }

    /// Look up a module by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Module> {
        self.modules.get(name).map(AsRef::as_ref)
    }

    /// Module names in registration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no module is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Hand each module its sub-document, then distribute package
    /// contributions from the enabled modules.
    ///
    /// # Errors
    ///
    /// Returns the first module's [`ConfigError`];
    /// later modules are left unconfigured.
    pub fn load_settings(&mut self, document: &SettingsDocument) -> Result<(), RegistryError> {
        for key in document.keys() {
            if !self.modules.contains_key(key) {
                tracing::warn!("ignoring settings for unknown module '{key}'");
            }
        }

        for name in &self.order {
            if let Some(module) = self.modules.get_mut(name) {
                module.parse_config(document.get(name))?;
                tracing::debug!("configured module '{name}'");
            }
        }

        let mut contributions = PackageContributions::default();
        for name in &self.order {
            if let Some(module) = self.modules.get(name)
                && module.config().enabled
            {
                contributions.merge(&module.package_contributions());
            }
        }
        for module in self.modules.values_mut() {
            module.accept_contributions(&contributions);
        }
        Ok(())
    }

    /// Collect every module's current config into a settings document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if a module's config cannot be
    /// rendered.
    pub fn settings_document(&self) -> Result<SettingsDocument, RegistryError> {
        let mut document = SettingsDocument::new();
        for name in &self.order {
            if let Some(module) = self.modules.get(name) {
                let value =
                    serde_yaml::to_value(module.config()).map_err(ConfigError::Serialize)?;
                document.insert(name.clone(), value);
            }
        }
        Ok(document)
    }

    /// Compute a dependencies-first execution order.
    ///
    /// Roots are visited in registration order and dependencies in declared
    /// order, so the result is deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingDependency`] for a dependency that is not
    /// registered and [`GraphError::Cycle`] when the graph is cyclic.
    pub fn resolve(&self) -> Result<Vec<String>, GraphError> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut stack: Vec<&str> = Vec::new();
        let mut ordered = Vec::with_capacity(self.order.len());
        for name in &self.order {
            self.visit(name, &mut marks, &mut stack, &mut ordered)?;
        }
        Ok(ordered)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        ordered: &mut Vec<String>,
    ) -> Result<(), GraphError> {
        if marks.get(name) == Some(&Mark::Done) {
            return Ok(());
        }
        marks.insert(name, Mark::InProgress);
        stack.push(name);

        for dep in self.dependencies.get(name).into_iter().flatten() {
            if !self.dependencies.contains_key(dep) {
                return Err(GraphError::MissingDependency {
                    dependency: dep.clone(),
                    module: name.to_string(),
                });
            }
            match marks.get(dep.as_str()) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => return Err(cycle(name, dep, stack)),
                None => self.visit(dep, marks, stack, ordered)?,
            }
        }

        stack.pop();
        marks.insert(name, Mark::Done);
        ordered.push(name.to_string());
        Ok(())
    }

    /// Run `setup` on every enabled module in dependency order.
    ///
    /// # Errors
    ///
    /// Returns a graph error before any hook runs, or the first hook error.
    pub fn run_setup(&self) -> Result<(), RegistryError> {
        self.run(Action::Setup)
    }

    /// Run `update` on every enabled module in dependency order.
    ///
    /// # Errors
    ///
    /// Returns a graph error before any hook runs, or the first hook error.
    pub fn run_update(&self) -> Result<(), RegistryError> {
        self.run(Action::Update)
    }

    /// Run `teardown` on every enabled module in dependency order.
    ///
    /// # Errors
    ///
    /// Returns a graph error before any hook runs, or the first hook error.
    pub fn run_teardown(&self) -> Result<(), RegistryError> {
        self.run(Action::Teardown)
    }

    /// Run `action` across the resolved order.
    ///
    /// Disabled modules are skipped; the first failing hook aborts the run
    /// without rolling back modules that already ran.
    ///
    /// # Errors
    ///
    /// Returns a graph error before any hook runs, or the first hook error.
    pub fn run(&self, action: Action) -> Result<(), RegistryError> {
        let order = self.resolve()?;
        tracing::debug!("{action} order: {}", order.join(", "));
        for name in &order {
            let Some(module) = self.modules.get(name) else {
                continue;
            };
            if !module.config().enabled {
                tracing::info!("skipping disabled module '{name}'");
                continue;
            }
            tracing::info!(target: "hostforge::stage", "{action} {name}");
            let result = match action {
                Action::Setup => module.setup(),
                Action::Update => module.update(),
                Action::Teardown => module.teardown(),
            };
            result.map_err(|err| RegistryError::Hook {
                module: name.clone(),
                action,
                source: err.into(),
            })?;
        }
        Ok(())
    }
}

/// Render the cycle closed by `name -> dep` from the visit stack.
fn cycle(name: &str, dep: &str, stack: &[&str]) -> GraphError {
    let start = stack.iter().position(|n| *n == dep).unwrap_or(0);
    let mut path: Vec<&str> = stack.iter().skip(start).copied().collect();
    path.push(dep);
    GraphError::Cycle {
        module: name.to_string(),
        path: path.join(" -> "),
    }
}
