//! Software package management.
//!
//! [`PackageManager`] answers which packages are installed and installs or
//! removes only what is needed. Drivers supply three primitives (query,
//! install, uninstall); the bookkeeping around them lives here so that every
//! driver behaves the same way.

mod apt;
mod pear;

pub use apt::Apt;
pub use pear::Pear;

use automate_plugin::{Dispatcher, Driver, DriverContext, Manager, Operation, UNSUITABLE};
use tracing::{debug, info};

use crate::Interpreter;
use crate::error::{Error, Result};

/// Options shared by every package operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageOptions {
    /// Discard the package tool's output
    pub quiet: bool,
    /// Pass the tool's force flag where it has one
    pub force: bool,
    /// Driver to use instead of the selected one
    pub with: Option<String>,
}

/// Packages and options for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageRequest {
    /// Package names
    pub packages: Vec<String>,
    /// Options
    pub options: PackageOptions,
}

impl PackageRequest {
    /// Request for the given packages with default options.
    #[must_use]
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
            options: PackageOptions::default(),
        }
    }

    /// Use a specific driver.
    #[must_use]
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.options.with = Some(driver.into());
        self
    }

    /// Force installation.
    #[must_use]
    pub fn force(mut self) -> Self {
        self.options.force = true;
        self
    }

    /// Discard tool output.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.options.quiet = true;
        self
    }
}

/// A call to one of the package manager's operations.
#[derive(Debug, Clone, Copy)]
pub enum PackageCall<'a> {
    /// Query installed packages
    Installed(&'a PackageRequest),
    /// Query missing packages
    NotInstalled(&'a PackageRequest),
    /// Install missing packages
    Install(&'a PackageRequest),
    /// Remove installed packages
    Uninstall(&'a PackageRequest),
}

impl PackageCall<'_> {
    /// The request carried by the call.
    #[must_use]
    pub fn request(&self) -> &PackageRequest {
        match self {
            Self::Installed(r) | Self::NotInstalled(r) | Self::Install(r) | Self::Uninstall(r) => {
                r
            }
        }
    }
}

impl Operation for PackageCall<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::Installed(_) => "installed",
            Self::NotInstalled(_) => "not_installed",
            Self::Install(_) => "install",
            Self::Uninstall(_) => "uninstall",
        }
    }

    fn target(&self) -> Option<&str> {
        self.request().options.with.as_deref()
    }
}

/// Driver interface for [`PackageManager`].
pub trait PackageDriver: Driver {
    /// Construction context, used to reach the interpreter.
    fn context(&self) -> &DriverContext<Interpreter>;

    /// How suitable this driver is for a call.
    fn suitability(&self, _call: &PackageCall<'_>) -> i32 {
        UNSUITABLE
    }

    /// The subset of `packages` that is installed, in request order.
    ///
    /// # Errors
    ///
    /// Fails when the package database cannot be read.
    fn query_installed(&self, _packages: &[String]) -> Result<Vec<String>> {
        Err(self.unimplemented("installed").into())
    }

    /// Install `packages`, returning whether the tool succeeded.
    ///
    /// # Errors
    ///
    /// Fails when the tool cannot be started.
    fn install_packages(&self, _packages: &[String], _options: &PackageOptions) -> Result<bool> {
        Err(self.unimplemented("install").into())
    }

    /// Remove `packages`, returning whether the tool succeeded.
    ///
    /// # Errors
    ///
    /// Fails when the tool cannot be started.
    fn uninstall_packages(&self, _packages: &[String], _options: &PackageOptions) -> Result<bool> {
        Err(self.unimplemented("uninstall").into())
    }
}

/// Facade for querying, installing and removing packages.
#[derive(Debug)]
pub struct PackageManager {
    dispatcher: Dispatcher<Self>,
}

impl Manager for PackageManager {
    type Driver = dyn PackageDriver;
    type Call<'a> = PackageCall<'a>;
    type Context = Interpreter;

    fn from_dispatcher(dispatcher: Dispatcher<Self>) -> Self {
        Self { dispatcher }
    }

    fn dispatcher(&self) -> &Dispatcher<Self> {
        &self.dispatcher
    }

    fn suitability(driver: &dyn PackageDriver, call: &PackageCall<'_>) -> i32 {
        driver.suitability(call)
    }
}

fn missing(driver: &dyn PackageDriver, packages: &[String]) -> Result<Vec<String>> {
    let installed = driver.query_installed(packages)?;
    Ok(packages
        .iter()
        .filter(|p| !installed.contains(p))
        .cloned()
        .collect())
}

impl PackageManager {
    /// Whether every requested package is installed.
    ///
    /// # Errors
    ///
    /// Fails when no driver is suitable or the query fails.
    pub fn installed(&self, request: &PackageRequest) -> Result<bool> {
        let installed = self.installed_packages(request)?;
        Ok(installed.len() == request.packages.len())
    }

    /// The requested packages that are installed.
    ///
    /// # Errors
    ///
    /// Fails when no driver is suitable or the query fails.
    pub fn installed_packages(&self, request: &PackageRequest) -> Result<Vec<String>> {
        self.dispatcher
            .dispatch(&PackageCall::Installed(request), |driver| {
                driver.query_installed(&request.packages)
            })
    }

    /// Whether every requested package is missing.
    ///
    /// # Errors
    ///
    /// Fails when no driver is suitable or the query fails.
    pub fn not_installed(&self, request: &PackageRequest) -> Result<bool> {
        let missing = self.not_installed_packages(request)?;
        Ok(missing.len() == request.packages.len())
    }

    /// The requested packages that are missing.
    ///
    /// # Errors
    ///
    /// Fails when no driver is suitable or the query fails.
    pub fn not_installed_packages(&self, request: &PackageRequest) -> Result<Vec<String>> {
        self.dispatcher
            .dispatch(&PackageCall::NotInstalled(request), |driver| {
                missing(driver, &request.packages)
            })
    }

    /// Install the requested packages that are missing.
    ///
    /// Returns `false` when nothing needed installing.
    ///
    /// # Errors
    ///
    /// Fails when no driver is suitable, the tool fails, or some packages are
    /// still missing afterwards.
    pub fn install(&self, request: &PackageRequest) -> Result<bool> {
        self.dispatcher
            .dispatch(&PackageCall::Install(request), |driver| {
                let targets = missing(driver, &request.packages)?;
                if targets.is_empty() {
                    debug!(driver = %driver.token(), "All packages already installed");
                    return Ok(false);
                }

                info!(driver = %driver.token(), packages = ?targets, "Installing packages");
                let succeeded = driver.install_packages(&targets, &request.options)?;

                let interpreter = driver.context().require_context()?;
                if interpreter.is_writing() {
                    let failed = missing(driver, &targets)?;
                    if !failed.is_empty() {
                        return Err(Error::InvalidPackage {
                            driver: driver.token().to_string(),
                            packages: failed,
                        });
                    }
                    if !succeeded {
                        debug!(driver = %driver.token(), "Install reported failure but packages are present");
                    }
                }
                Ok(true)
            })
    }

    /// Remove the requested packages that are installed.
    ///
    /// Returns `false` when none were installed.
    ///
    /// # Errors
    ///
    /// Fails when no driver is suitable or the tool fails.
    pub fn uninstall(&self, request: &PackageRequest) -> Result<bool> {
        self.dispatcher
            .dispatch(&PackageCall::Uninstall(request), |driver| {
                let targets = driver.query_installed(&request.packages)?;
                if targets.is_empty() {
                    debug!(driver = %driver.token(), "No packages to uninstall");
                    return Ok(false);
                }

                info!(driver = %driver.token(), packages = ?targets, "Uninstalling packages");
                let succeeded = driver.uninstall_packages(&targets, &request.options)?;

                let interpreter = driver.context().require_context()?;
                if interpreter.is_writing() && !succeeded {
                    return Err(Error::command_failed(
                        format!("{} uninstall", driver.token()),
                        format!("could not remove {}", targets.join(", ")),
                    ));
                }
                Ok(true)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_target_comes_from_options() {
        let request = PackageRequest::new(["foo"]).with_driver("pear");
        assert_eq!(PackageCall::Install(&request).target(), Some("pear"));
        assert_eq!(PackageCall::Install(&request).name(), "install");
    }

    #[test]
    fn test_request_builder() {
        let request = PackageRequest::new(["a", "b"]).force().quiet();
        assert_eq!(request.packages, vec!["a", "b"]);
        assert!(request.options.force);
        assert!(request.options.quiet);
        assert_eq!(request.options.with, None);
    }
}
