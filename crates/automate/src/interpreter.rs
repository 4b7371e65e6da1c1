//! The interpreter: the context every manager and driver runs in.

use automate_plugin::{AnyManager, ConfigurationError, Manager, Plugins, Registry};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Span, debug, info, info_span};
use uuid::Uuid;

use crate::config::InterpreterConfig;
use crate::error::Result;
use crate::package::PackageManager;
use crate::registry;
use crate::shell::{ShellCommand, ShellManager};

/// Owns one instance of every concrete manager and the settings they share.
///
/// Interpreters are always handed out as `Arc<Interpreter>`; managers and
/// drivers hold a weak reference back to it.
///
/// # Example
///
/// ```no_run
/// use automate::{Interpreter, ShellCommand};
///
/// fn main() -> automate::Result<()> {
///     let interpreter = Interpreter::builder().noop(true).build()?;
///     interpreter.sh(&ShellCommand::shell("rm -rf /tmp/scratch"))?;
///     Ok(())
/// }
/// ```
pub struct Interpreter {
    plugins: Plugins,
    noop: AtomicBool,
    id: Uuid,
    span: Span,
}

impl Interpreter {
    /// Create a new builder.
    #[must_use]
    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    /// Create an interpreter from the built-in registry with default settings.
    ///
    /// # Errors
    ///
    /// Fails when the built-in registry is malformed.
    pub fn new() -> Result<Arc<Self>> {
        Self::builder().build()
    }

    /// Unique id of this interpreter, attached to its log span.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Span that driver logs are recorded in.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// All instantiated managers.
    #[must_use]
    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    /// The manager registered under a token.
    #[must_use]
    pub fn plugin(&self, token: &str) -> Option<&dyn AnyManager> {
        self.plugins.by_token(token)
    }

    /// The instance of manager type `M`.
    ///
    /// # Errors
    ///
    /// Fails when `M` was not registered with this interpreter's registry.
    pub fn manager<M>(&self) -> Result<&M>
    where
        M: Manager<Context = Self>,
    {
        self.plugins.get::<M>().ok_or_else(|| {
            ConfigurationError::UnknownManager {
                manager: std::any::type_name::<M>().to_string(),
            }
            .into()
        })
    }

    /// The shell manager.
    ///
    /// # Errors
    ///
    /// Fails when the registry did not include it.
    pub fn shell_manager(&self) -> Result<&ShellManager> {
        self.manager::<ShellManager>()
    }

    /// The package manager.
    ///
    /// # Errors
    ///
    /// Fails when the registry did not include it.
    pub fn package_manager(&self) -> Result<&PackageManager> {
        self.manager::<PackageManager>()
    }

    /// Run a command through the shell manager.
    ///
    /// # Errors
    ///
    /// See [`ShellManager::sh`].
    pub fn sh(&self, command: &ShellCommand) -> Result<bool> {
        self.shell_manager()?.sh(command)
    }

    /// Locate a program through the shell manager.
    ///
    /// # Errors
    ///
    /// See [`ShellManager::which`].
    pub fn which(&self, program: &str) -> Result<Option<PathBuf>> {
        self.shell_manager()?.which(program)
    }

    /// Whether mutating commands are only previewed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.noop.load(Ordering::Acquire)
    }

    /// Whether mutating commands actually run.
    #[must_use]
    pub fn is_writing(&self) -> bool {
        !self.is_noop()
    }

    /// Switch preview mode on or off.
    pub fn set_noop(&self, noop: bool) {
        debug!(parent: &self.span, noop, "Setting execution mode");
        self.noop.store(noop, Ordering::Release);
    }

    fn apply_defaults(&self, config: &InterpreterConfig) -> Result<()> {
        for (manager, driver) in &config.defaults {
            let plugin = self.plugin(manager).ok_or_else(|| ConfigurationError::UnknownManager {
                manager: manager.clone(),
            })?;
            plugin.set_default(Some(driver.as_str()))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("id", &self.id)
            .field("noop", &self.is_noop())
            .field("plugins", &self.plugins)
            .finish()
    }
}

/// Builder for [`Interpreter`].
///
/// Use [`Interpreter::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct InterpreterBuilder {
    registry: Option<Registry<Interpreter>>,
    config: InterpreterConfig,
}

impl InterpreterBuilder {
    /// Create a builder using the global registry and default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate managers from `registry` instead of the global one.
    #[must_use]
    pub fn with_registry(mut self, registry: Registry<Interpreter>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace all settings.
    #[must_use]
    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set preview mode.
    #[must_use]
    pub fn noop(mut self, noop: bool) -> Self {
        self.config.noop = noop;
        self
    }

    /// Pin a driver for a manager.
    #[must_use]
    pub fn with_default(mut self, manager: impl Into<String>, driver: impl Into<String>) -> Self {
        self.config = self.config.with_default(manager, driver);
        self
    }

    /// Build the interpreter.
    ///
    /// # Errors
    ///
    /// Fails when the registry is malformed or a configured default names an
    /// unknown manager or driver.
    pub fn build(self) -> Result<Arc<Interpreter>> {
        let registry = match &self.registry {
            Some(registry) => registry,
            None => registry::global()?,
        };

        let id = Uuid::new_v4();
        let span = info_span!("interpreter", %id);
        let mut failure = None;

        let interpreter = Arc::new_cyclic(|weak| {
            let plugins = Plugins::instantiate(registry, weak).unwrap_or_else(|e| {
                failure = Some(e);
                Plugins::default()
            });
            Interpreter {
                plugins,
                noop: AtomicBool::new(self.config.noop),
                id,
                span,
            }
        });
        if let Some(error) = failure {
            return Err(error.into());
        }

        interpreter.apply_defaults(&self.config)?;

        info!(
            parent: &interpreter.span,
            managers = ?interpreter.plugins.tokens().collect::<Vec<_>>(),
            noop = interpreter.is_noop(),
            "Interpreter ready"
        );
        Ok(interpreter)
    }
}
