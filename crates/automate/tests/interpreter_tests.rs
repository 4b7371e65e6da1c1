//! Integration tests for interpreter wiring and the built-in managers.

use automate::package::{PackageCall, PackageDriver, PackageOptions};
use automate::plugin::{
    ConfigurationError, Driver, DriverContext, DriverDescriptor, DriverRegistration, Manager,
    ManagerRegistration, Registry,
};
use automate::shell::Posix;
use automate::{
    Error, Interpreter, InterpreterConfig, PackageManager, PackageRequest, ShellCommand,
    ShellManager,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

// =============================================================================
// In-memory package driver
// =============================================================================

/// Installs anything except names starting with `bogus`.
struct Memory {
    ctx: DriverContext<Interpreter>,
    installed: Mutex<BTreeSet<String>>,
}

impl Memory {
    #[allow(clippy::unnecessary_box_returns)]
    fn boxed(ctx: DriverContext<Interpreter>) -> Box<dyn PackageDriver> {
        Box::new(Self {
            ctx,
            installed: Mutex::new(BTreeSet::from(["preinstalled".to_string()])),
        })
    }
}

impl Driver for Memory {
    fn descriptor(&self) -> &DriverDescriptor {
        self.ctx.descriptor()
    }
}

impl PackageDriver for Memory {
    fn context(&self) -> &DriverContext<Interpreter> {
        &self.ctx
    }

    fn suitability(&self, _call: &PackageCall<'_>) -> i32 {
        5
    }

    fn query_installed(&self, packages: &[String]) -> automate::Result<Vec<String>> {
        let installed = self.installed.lock().unwrap();
        Ok(packages
            .iter()
            .filter(|p| installed.contains(*p))
            .cloned()
            .collect())
    }

    fn install_packages(
        &self,
        packages: &[String],
        _options: &PackageOptions,
    ) -> automate::Result<bool> {
        let interpreter = self.ctx.require_context()?;
        if interpreter.is_writing() {
            let mut installed = self.installed.lock().unwrap();
            installed.extend(packages.iter().filter(|p| !p.starts_with("bogus")).cloned());
        }
        Ok(true)
    }

    fn uninstall_packages(
        &self,
        packages: &[String],
        _options: &PackageOptions,
    ) -> automate::Result<bool> {
        let interpreter = self.ctx.require_context()?;
        if interpreter.is_writing() {
            let mut installed = self.installed.lock().unwrap();
            for package in packages {
                installed.remove(package);
            }
        }
        Ok(true)
    }
}

fn memory_registry() -> Registry<Interpreter> {
    let mut registry = Registry::new();
    registry
        .register_manager::<ShellManager>(ManagerRegistration::new("ShellManager"))
        .unwrap();
    registry
        .register_driver::<ShellManager>(DriverRegistration::new("POSIX"), Posix::boxed)
        .unwrap();
    registry
        .register_manager::<PackageManager>(ManagerRegistration::new("PackageManager"))
        .unwrap();
    registry
        .register_driver::<PackageManager>(DriverRegistration::new("Memory"), Memory::boxed)
        .unwrap();
    registry
}

fn memory_interpreter() -> Arc<Interpreter> {
    Interpreter::builder()
        .with_registry(memory_registry())
        .build()
        .unwrap()
}

// =============================================================================
// Wiring
// =============================================================================

#[test]
fn test_builtin_managers_are_loaded() {
    let interpreter = Interpreter::new().unwrap();
    let tokens: Vec<&str> = interpreter
        .plugins()
        .tokens()
        .map(|t| t.as_str())
        .collect();
    assert_eq!(tokens, vec!["shell_manager", "package_manager"]);
    assert!(interpreter.plugin("shell_manager").is_some());
    assert!(interpreter.plugin("base_driver").is_none());
}

#[test]
fn test_abstract_base_drivers_are_not_instantiated() {
    let interpreter = Interpreter::new().unwrap();
    let shell = interpreter.shell_manager().unwrap();
    let tokens: Vec<String> = shell
        .dispatcher()
        .driver_tokens()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(tokens, vec!["posix"]);

    let package = interpreter.package_manager().unwrap();
    let tokens: Vec<String> = package
        .dispatcher()
        .driver_tokens()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(tokens, vec!["apt", "pear"]);
}

#[test]
fn test_managers_point_back_at_interpreter() {
    let interpreter = Interpreter::new().unwrap();
    let shell = interpreter.shell_manager().unwrap();
    let back = shell.dispatcher().context().unwrap();
    assert!(Arc::ptr_eq(&back, &interpreter));
}

#[test]
fn test_missing_manager_type_is_reported() {
    let mut registry = Registry::new();
    registry
        .register_manager::<ShellManager>(ManagerRegistration::new("ShellManager"))
        .unwrap();
    let interpreter = Interpreter::builder()
        .with_registry(registry)
        .build()
        .unwrap();
    assert!(interpreter.package_manager().is_err());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_configured_default_is_applied() {
    let config = InterpreterConfig::from_toml_str(
        r#"
[defaults]
shell_manager = "posix"
"#,
    )
    .unwrap();
    let interpreter = Interpreter::builder().with_config(config).build().unwrap();
    let default = interpreter
        .plugin("shell_manager")
        .unwrap()
        .default_driver()
        .unwrap();
    assert_eq!(default, "posix");
}

#[test]
fn test_unknown_manager_default_fails() {
    let err = Interpreter::builder()
        .with_default("service_manager", "systemd")
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Plugin(automate::plugin::Error::Configuration(
            ConfigurationError::UnknownManager { .. }
        ))
    ));
}

#[test]
fn test_unknown_driver_default_fails() {
    let err = Interpreter::builder()
        .with_default("package_manager", "yum")
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Plugin(automate::plugin::Error::Configuration(
            ConfigurationError::UnknownDriver { .. }
        ))
    ));
}

// =============================================================================
// Shell
// =============================================================================

#[test]
fn test_sh_reports_exit_status() {
    let interpreter = Interpreter::new().unwrap();
    assert!(interpreter.sh(&ShellCommand::shell("exit 0")).unwrap());
    assert!(!interpreter.sh(&ShellCommand::shell("exit 3")).unwrap());
}

#[test]
fn test_sh_missing_program_is_unsuccessful() {
    let interpreter = Interpreter::new().unwrap();
    let command = ShellCommand::new("qlkjwesziuxkjlrjklqwel");
    assert!(!interpreter.sh(&command).unwrap());
}

#[test]
fn test_sh_in_noop_mode_does_not_run() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("marker");
    let interpreter = Interpreter::builder().noop(true).build().unwrap();

    let command = ShellCommand::new("touch").arg(marker.to_string_lossy());
    assert!(interpreter.sh(&command).unwrap());
    assert!(!marker.exists());

    interpreter.set_noop(false);
    assert!(interpreter.sh(&command).unwrap());
    assert!(marker.exists());
}

#[test]
fn test_sh_passes_environment() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let interpreter = Interpreter::new().unwrap();

    let command = ShellCommand::shell(format!("printf %s \"$GREETING\" > '{}'", out.display()))
        .env("GREETING", "hello");
    assert!(interpreter.sh(&command).unwrap());
    assert_eq!(std::fs::read_to_string(out).unwrap(), "hello");
}

#[test]
fn test_which() {
    let interpreter = Interpreter::new().unwrap();
    assert!(interpreter.which("sh").unwrap().is_some());
    assert!(interpreter.which("qlkjwesziuxkjlrjklqwel").unwrap().is_none());
}

// =============================================================================
// Packages
// =============================================================================

#[test]
fn test_installed_queries() {
    let interpreter = memory_interpreter();
    let packages = interpreter.package_manager().unwrap();

    let request = PackageRequest::new(["preinstalled", "missing"]);
    assert!(!packages.installed(&request).unwrap());
    assert!(!packages.not_installed(&request).unwrap());
    assert_eq!(
        packages.installed_packages(&request).unwrap(),
        vec!["preinstalled"]
    );
    assert_eq!(
        packages.not_installed_packages(&request).unwrap(),
        vec!["missing"]
    );
    assert!(
        packages
            .installed(&PackageRequest::new(["preinstalled"]))
            .unwrap()
    );
}

#[test]
fn test_install_only_when_missing() {
    let interpreter = memory_interpreter();
    let packages = interpreter.package_manager().unwrap();

    let request = PackageRequest::new(["preinstalled", "curl"]);
    assert!(packages.install(&request).unwrap());
    assert!(packages.installed(&request).unwrap());
    assert!(!packages.install(&request).unwrap());
}

#[test]
fn test_install_reports_packages_that_stay_missing() {
    let interpreter = memory_interpreter();
    let packages = interpreter.package_manager().unwrap();

    let err = packages
        .install(&PackageRequest::new(["curl", "bogus-thing"]))
        .unwrap_err();
    let Error::InvalidPackage { driver, packages } = err else {
        panic!("expected an invalid package error");
    };
    assert_eq!(driver, "memory");
    assert_eq!(packages, vec!["bogus-thing"]);
}

#[test]
fn test_install_in_noop_mode_changes_nothing() {
    let interpreter = memory_interpreter();
    interpreter.set_noop(true);
    let packages = interpreter.package_manager().unwrap();

    let request = PackageRequest::new(["bogus-thing"]);
    assert!(packages.install(&request).unwrap());
    assert!(packages.not_installed(&request).unwrap());
}

#[test]
fn test_uninstall_only_when_installed() {
    let interpreter = memory_interpreter();
    let packages = interpreter.package_manager().unwrap();

    let request = PackageRequest::new(["preinstalled"]);
    assert!(packages.uninstall(&request).unwrap());
    assert!(packages.not_installed(&request).unwrap());
    assert!(!packages.uninstall(&request).unwrap());
}

#[test]
fn test_explicit_unknown_package_driver() {
    let interpreter = memory_interpreter();
    let packages = interpreter.package_manager().unwrap();
    let err = packages
        .installed(&PackageRequest::new(["curl"]).with_driver("yum"))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Plugin(automate::plugin::Error::Configuration(
            ConfigurationError::UnknownDriver { .. }
        ))
    ));
}

#[test]
fn test_package_manager_without_suitable_driver() {
    let mut registry = memory_registry();
    registry
        .mark_abstract_driver("package_manager", "memory")
        .unwrap();
    let interpreter = Interpreter::builder()
        .with_registry(registry)
        .build()
        .unwrap();
    let err = interpreter
        .package_manager()
        .unwrap()
        .installed(&PackageRequest::new(["curl"]))
        .unwrap_err();
    let Error::Plugin(err) = err else {
        panic!("expected a dispatch error");
    };
    assert!(err.is_no_suitable_driver());
}
