// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

//! automate - host automation through interchangeable drivers
//!
//! An [`Interpreter`] owns one instance of every registered manager. Each
//! manager is a facade over several drivers and picks the most suitable one
//! for every call, based on what the host provides.
//!
//! # Example
//!
//! ```no_run
//! use automate::{Interpreter, PackageRequest};
//!
//! fn main() -> automate::Result<()> {
//!     let interpreter = Interpreter::builder()
//!         .with_default("package_manager", "apt")
//!         .build()?;
//!
//!     let request = PackageRequest::new(["curl", "git"]);
//!     if interpreter.package_manager()?.install(&request)? {
//!         println!("installed missing packages");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Adding a manager
//!
//! ```ignore
//! let mut registry = automate::registry::builtin()?;
//! registry.register_manager::<ServiceManager>(ManagerRegistration::new("ServiceManager"))?;
//! registry.register_driver::<ServiceManager>(DriverRegistration::new("Systemd"), Systemd::boxed)?;
//!
//! let interpreter = Interpreter::builder().with_registry(registry).build()?;
//! let services = interpreter.manager::<ServiceManager>()?;
//! ```

/// Interpreter configuration files.
pub mod config;
mod error;
mod interpreter;
/// Package management.
pub mod package;
/// Built-in registrations.
pub mod registry;
/// Command execution.
pub mod shell;
/// Tracing and logging configuration.
pub mod tracing;

pub use automate_plugin as plugin;
pub use config::InterpreterConfig;
pub use error::{Error, Result};
pub use interpreter::{Interpreter, InterpreterBuilder};
pub use package::{PackageManager, PackageOptions, PackageRequest};
pub use shell::{ShellCommand, ShellManager};
