//! Error types for the dispatch core.
//!
//! Errors fall into three classes:
//!
//! - [`ConfigurationError`] - malformed registrations, dependency specs or
//!   defaults. Always fatal and raised as early as possible.
//! - [`Error::NoSuitableDriver`] and [`Error::UnavailableDriver`] - nothing
//!   could serve a call. The former is recoverable through
//!   [`Dispatcher::dispatch_safely`](crate::Dispatcher::dispatch_safely).
//! - [`Error::UnimplementedOperation`] - a targeted driver does not implement
//!   the requested operation.

use miette::Diagnostic;
use thiserror::Error;

use crate::token::Token;

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed plugin configuration.
///
/// These are detected at registration or configuration time and are never
/// caught by the dispatch engine.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A dependency spec uses a kind that is not recognized.
    #[error("Unknown dependency kind '{kind}'")]
    #[diagnostic(
        code(automate::plugin::unknown_dependency_kind),
        help("Valid kinds are: files, directories, programs, libraries, requires")
    )]
    UnknownDependencyKind {
        /// The unrecognized kind key.
        kind: String,
    },

    /// A driver was registered under a manager type the registry does not know.
    #[error("Driver '{driver}' has no owning manager type")]
    #[diagnostic(
        code(automate::plugin::orphaned_driver),
        help("Register the manager type before registering its drivers")
    )]
    OrphanedDriver {
        /// Name of the driver type.
        driver: String,
    },

    /// Two registrations in the same scope derive the same token.
    #[error("Token '{token}' is already registered in {scope}")]
    #[diagnostic(code(automate::plugin::duplicate_token))]
    DuplicateToken {
        /// Where the collision happened (a manager token, or "managers").
        scope: String,
        /// The colliding token.
        token: Token,
    },

    /// The same Rust type was registered as a manager twice.
    #[error("Manager type '{name}' is already registered as '{existing}'")]
    #[diagnostic(code(automate::plugin::duplicate_manager_type))]
    DuplicateManagerType {
        /// Name given to the second registration.
        name: String,
        /// Token of the first registration.
        existing: Token,
    },

    /// A token does not name a registered manager.
    #[error("Unknown manager '{manager}'")]
    #[diagnostic(code(automate::plugin::unknown_manager))]
    UnknownManager {
        /// The requested manager token.
        manager: String,
    },

    /// A token does not name a concrete driver of the manager.
    #[error("Manager '{manager}' has no driver '{driver}'")]
    #[diagnostic(code(automate::plugin::unknown_driver))]
    UnknownDriver {
        /// Token of the manager that was searched.
        manager: Token,
        /// The requested driver token.
        driver: String,
    },

    /// A driver factory does not produce the manager's driver interface.
    #[error("Driver '{driver}' does not implement the interface of manager '{manager}'")]
    #[diagnostic(code(automate::plugin::interface_mismatch))]
    InterfaceMismatch {
        /// Token of the manager.
        manager: Token,
        /// Token of the driver.
        driver: Token,
    },
}

/// Errors raised by drivers and managers.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Malformed configuration.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Configuration(#[from] ConfigurationError),

    /// No candidate survived the availability and suitability filters.
    #[error("No suitable driver found for '{operation}' in manager '{manager}'")]
    #[diagnostic(
        code(automate::plugin::no_suitable_driver),
        help("Install a driver's dependencies, or select one explicitly")
    )]
    NoSuitableDriver {
        /// Token of the manager.
        manager: Token,
        /// Name of the requested operation.
        operation: &'static str,
    },

    /// A driver was asked to work while its dependencies are missing.
    #[error("Driver '{driver}' is unavailable, missing {}", .reasons.join(", "))]
    #[diagnostic(code(automate::plugin::unavailable_driver))]
    UnavailableDriver {
        /// Token of the driver.
        driver: Token,
        /// One entry per unmet requirement.
        reasons: Vec<String>,
    },

    /// The driver does not implement the requested operation.
    #[error("Driver '{driver}' does not implement '{operation}'")]
    #[diagnostic(code(automate::plugin::unimplemented_operation))]
    UnimplementedOperation {
        /// Token of the driver.
        driver: Token,
        /// Name of the requested operation.
        operation: &'static str,
    },

    /// The manager type has no driver types registered at all.
    #[error("No drivers declared under manager '{manager}'")]
    #[diagnostic(code(automate::plugin::no_drivers))]
    NoDrivers {
        /// Token of the manager.
        manager: Token,
    },

    /// The owning context was dropped while a driver was still in use.
    #[error("Context of driver '{driver}' has been released")]
    #[diagnostic(code(automate::plugin::context_released))]
    ContextReleased {
        /// Token of the driver.
        driver: Token,
    },
}

impl Error {
    /// Create an unimplemented operation error.
    #[must_use]
    pub fn unimplemented(driver: &Token, operation: &'static str) -> Self {
        Self::UnimplementedOperation {
            driver: driver.clone(),
            operation,
        }
    }

    /// Create a no suitable driver error.
    #[must_use]
    pub fn no_suitable_driver(manager: &Token, operation: &'static str) -> Self {
        Self::NoSuitableDriver {
            manager: manager.clone(),
            operation,
        }
    }

    /// Whether this is the engine's own "no suitable driver" condition.
    #[must_use]
    pub fn is_no_suitable_driver(&self) -> bool {
        matches!(self, Self::NoSuitableDriver { .. })
    }

    /// Whether no driver can serve the call, either because selection found
    /// no candidate or because the chosen driver is missing dependencies.
    ///
    /// [`Dispatcher::dispatch_safely`](crate::Dispatcher::dispatch_safely)
    /// only absorbs the narrower [`Error::is_no_suitable_driver`] case.
    #[must_use]
    pub fn is_no_suitable_driver_class(&self) -> bool {
        matches!(
            self,
            Self::NoSuitableDriver { .. } | Self::UnavailableDriver { .. }
        )
    }

    /// Whether this is a configuration defect.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_driver_lists_every_reason() {
        let error = Error::UnavailableDriver {
            driver: Token::from("my_driver"),
            reasons: vec!["files: a".to_string(), "programs: b".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Driver 'my_driver' is unavailable, missing files: a, programs: b"
        );
    }

    #[test]
    fn test_no_suitable_driver_names_operation_and_manager() {
        let error = Error::no_suitable_driver(&Token::from("shell_manager"), "sh");
        assert_eq!(
            error.to_string(),
            "No suitable driver found for 'sh' in manager 'shell_manager'"
        );
        assert!(error.is_no_suitable_driver());
        assert!(!error.is_configuration());
    }

    #[test]
    fn test_configuration_is_transparent() {
        let error: Error = ConfigurationError::UnknownDependencyKind {
            kind: "omfg".to_string(),
        }
        .into();
        assert_eq!(error.to_string(), "Unknown dependency kind 'omfg'");
        assert!(error.is_configuration());
    }

    #[test]
    fn test_unavailable_driver_is_in_no_suitable_driver_class() {
        let unavailable = Error::UnavailableDriver {
            driver: Token::from("apt"),
            reasons: vec!["programs: apt-get".to_string()],
        };
        assert!(unavailable.is_no_suitable_driver_class());
        assert!(!unavailable.is_no_suitable_driver());

        let none = Error::no_suitable_driver(&Token::from("package_manager"), "install");
        assert!(none.is_no_suitable_driver_class());

        let unimplemented = Error::unimplemented(&Token::from("apt"), "install");
        assert!(!unimplemented.is_no_suitable_driver_class());
    }
}
