//! Error types for the automate crate

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for automate operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Dispatch or plugin configuration error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Plugin(#[from] automate_plugin::Error),

    /// I/O error with operation context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(automate::io))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Description of the operation that failed
        operation: String,
    },

    /// A command ran but its output could not be used
    #[error("Command '{command}' failed: {message}")]
    #[diagnostic(code(automate::command_failed))]
    CommandFailed {
        /// The command line
        command: String,
        /// What went wrong
        message: String,
    },

    /// Packages are still missing after installing them
    #[error("Invalid packages for {driver}: {}", .packages.join(", "))]
    #[diagnostic(
        code(automate::package::invalid),
        help("Check the package names are spelled correctly")
    )]
    InvalidPackage {
        /// Token of the driver that installed them
        driver: String,
        /// Packages that could not be installed
        packages: Vec<String>,
    },

    /// Interpreter configuration file could not be read or parsed
    #[error("Invalid configuration in {}: {message}", .path.display())]
    #[diagnostic(code(automate::config::invalid))]
    Config {
        /// The configuration file
        path: PathBuf,
        /// Parse or read failure
        message: String,
    },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            operation: operation.into(),
        }
    }

    /// Create a command failure
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a configuration file error
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<automate_plugin::ConfigurationError> for Error {
    fn from(error: automate_plugin::ConfigurationError) -> Self {
        Self::Plugin(error.into())
    }
}

/// Result type for automate operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_errors_are_transparent() {
        let error: Error = automate_plugin::Error::no_suitable_driver(
            &automate_plugin::Token::from("ShellManager"),
            "sh",
        )
        .into();
        assert_eq!(
            error.to_string(),
            "No suitable driver found for 'sh' in manager 'shell_manager'"
        );
    }

    #[test]
    fn test_invalid_package_lists_packages() {
        let error = Error::InvalidPackage {
            driver: "apt".to_string(),
            packages: vec!["foo".to_string(), "bar".to_string()],
        };
        assert_eq!(error.to_string(), "Invalid packages for apt: foo, bar");
    }

    #[test]
    fn test_config_error_names_path() {
        let error = Error::config("/etc/automate.toml", "expected a table");
        assert!(error.to_string().contains("/etc/automate.toml"));
    }
}
