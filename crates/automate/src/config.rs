//! Interpreter configuration.
//!
//! ```toml
//! noop = false
//!
//! [defaults]
//! shell_manager = "posix"
//! package_manager = "apt"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Settings applied to an [`Interpreter`](crate::Interpreter) after its
/// plugins are instantiated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterpreterConfig {
    /// Preview mode: log mutating commands without running them.
    pub noop: bool,

    /// Sticky default driver per manager, keyed by manager token.
    pub defaults: IndexMap<String, String>,
}

impl InterpreterConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the document is malformed.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::config("<inline>", e.to_string()))
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|e| Error::config(path, e.to_string()))?;
        let config = toml::from_str(&source).map_err(|e| Error::config(path, e.to_string()))?;
        debug!(path = %path.display(), "Loaded interpreter configuration");
        Ok(config)
    }

    /// Default location of the user configuration file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("automate").join("config.toml"))
    }

    /// Load the user configuration file, or defaults when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file exists but is invalid.
    pub fn discover() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Pin a driver for a manager.
    #[must_use]
    pub fn with_default(mut self, manager: impl Into<String>, driver: impl Into<String>) -> Self {
        self.defaults.insert(manager.into(), driver.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_is_default() {
        let config = InterpreterConfig::from_toml_str("").unwrap();
        assert_eq!(config, InterpreterConfig::default());
    }

    #[test]
    fn test_parse_defaults_in_order() {
        let config = InterpreterConfig::from_toml_str(
            r#"
noop = true

[defaults]
shell_manager = "posix"
package_manager = "pear"
"#,
        )
        .unwrap();
        assert!(config.noop);
        let keys: Vec<&str> = config.defaults.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["shell_manager", "package_manager"]);
        assert_eq!(config.defaults["package_manager"], "pear");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(InterpreterConfig::from_toml_str("colour = true").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[defaults]\nshell_manager = \"posix\"").unwrap();
        let config = InterpreterConfig::load(file.path()).unwrap();
        assert_eq!(config.defaults["shell_manager"], "posix");
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let Err(Error::Config { path: reported, .. }) = InterpreterConfig::load(&path) else {
            panic!("expected a config error");
        };
        assert_eq!(reported, path);
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars(
            [
                ("XDG_CONFIG_HOME", Some(dir.path().as_os_str())),
                ("HOME", Some(dir.path().as_os_str())),
            ],
            || {
                let config = InterpreterConfig::discover().unwrap();
                assert_eq!(config, InterpreterConfig::default());
            },
        );
    }
}
