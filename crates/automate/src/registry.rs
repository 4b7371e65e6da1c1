//! Built-in manager and driver registrations.
//!
//! [`global`] is the process-wide registry used by [`Interpreter::new`]. It is
//! built once, on first use, and never changes afterwards. Hosts that add
//! their own managers start from [`builtin`] and pass the result to
//! [`InterpreterBuilder::with_registry`](crate::InterpreterBuilder::with_registry).

use automate_plugin::{ConfigurationError, DriverRegistration, ManagerRegistration, Registry};
use std::sync::LazyLock;

use crate::Interpreter;
use crate::package::{Apt, PackageManager, Pear};
use crate::shell::{Posix, ShellManager};

static GLOBAL: LazyLock<Result<Registry<Interpreter>, ConfigurationError>> =
    LazyLock::new(builtin);

/// The process-wide registry of built-in types.
///
/// # Errors
///
/// Returns the registration error if the built-in table is malformed.
pub fn global() -> Result<&'static Registry<Interpreter>, ConfigurationError> {
    GLOBAL.as_ref().map_err(Clone::clone)
}

/// A fresh registry holding the built-in managers and drivers.
///
/// # Errors
///
/// Returns the first registration that fails.
pub fn builtin() -> Result<Registry<Interpreter>, ConfigurationError> {
    let mut registry = Registry::new();

    registry.register_manager::<ShellManager>(ManagerRegistration::new("ShellManager"))?;
    registry.register_abstract_driver::<ShellManager>("ShellManager::BaseDriver")?;
    registry.register_driver::<ShellManager>(
        DriverRegistration::new("ShellManager::POSIX"),
        Posix::boxed,
    )?;

    registry.register_manager::<PackageManager>(ManagerRegistration::new("PackageManager"))?;
    registry.register_abstract_driver::<PackageManager>("PackageManager::BaseDriver")?;
    registry.register_driver::<PackageManager>(
        DriverRegistration::new("PackageManager::APT").depends_on(Apt::dependencies()),
        Apt::boxed,
    )?;
    registry.register_driver::<PackageManager>(
        DriverRegistration::new("PackageManager::PEAR").depends_on(Pear::dependencies()),
        Pear::boxed,
    )?;

    Ok(registry)
}
