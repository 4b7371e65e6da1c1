//! Plugin dispatch for automate.
//!
//! A [`Manager`] is a facade over a family of interchangeable [`Driver`]s.
//! Each call to a manager operation picks one driver: the one the caller
//! asked for, the manager's sticky default, or the available driver that
//! scores itself most suitable for the call.
//!
//! Manager and driver types are recorded in a [`Registry`]. A context builds
//! its [`Plugins`] table from a registry once, which instantiates one of every
//! concrete manager and every concrete driver under it.
//!
//! # Example
//!
//! ```ignore
//! use automate_plugin::{DriverRegistration, ManagerRegistration, Plugins, Registry};
//!
//! let mut registry = Registry::new();
//! registry.register_manager::<ShellManager>(ManagerRegistration::new("ShellManager"))?;
//! registry.register_driver::<ShellManager>(DriverRegistration::new("POSIX"), Posix::boxed)?;
//!
//! let context = Arc::new_cyclic(|weak| {
//!     let plugins = Plugins::instantiate(&registry, weak).unwrap_or_default();
//!     Context { plugins }
//! });
//! ```

mod dependency;
mod driver;
mod error;
mod manager;
mod plugins;
mod registry;
mod token;

pub use dependency::{
    Availability, DependencyChecker, DependencyKind, DependencySpec, HostProbe, LoadProbe,
    is_module_provided, provide_module,
};
pub use driver::{Driver, DriverContext, NEUTRAL, UNSUITABLE};
pub use error::{ConfigurationError, Error, Result};
pub use manager::{AnyManager, Dispatcher, Manager, Operation};
pub use plugins::Plugins;
pub use registry::{
    DriverDescriptor, DriverFactory, DriverRegistration, ManagerDescriptor, ManagerRegistration,
    Registry,
};
pub use token::Token;
