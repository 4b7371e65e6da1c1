//! Declarative driver dependencies and their evaluation against the host.
//!
//! A [`DependencySpec`] maps a dependency kind to an ordered list of
//! requirements. [`DependencyChecker`] turns a spec into an [`Availability`]
//! verdict with one reason per unmet requirement.
//!
//! | Kind          | Requirement is met when                                  |
//! |---------------|----------------------------------------------------------|
//! | `files`       | the path exists                                          |
//! | `directories` | the path is a directory                                  |
//! | `programs`    | the program resolves on the executable search path       |
//! | `libraries`   | a dynamic library with that name can be located          |
//! | `requires`    | the module was announced with [`provide_module`]         |

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::trace;

use crate::error::ConfigurationError;

/// A recognized dependency kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Files that must exist.
    Files,
    /// Directories that must exist.
    Directories,
    /// Programs that must resolve on the search path.
    Programs,
    /// Externally loadable dynamic libraries.
    Libraries,
    /// Modules provided by the running process.
    Requires,
}

impl DependencyKind {
    /// The key used in dependency specs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Directories => "directories",
            Self::Programs => "programs",
            Self::Libraries => "libraries",
            Self::Requires => "requires",
        }
    }
}

impl FromStr for DependencyKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "files" => Ok(Self::Files),
            "directories" => Ok(Self::Directories),
            "programs" => Ok(Self::Programs),
            "libraries" => Ok(Self::Libraries),
            "requires" => Ok(Self::Requires),
            other => Err(ConfigurationError::UnknownDependencyKind {
                kind: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative list of prerequisites, keyed by kind.
///
/// Kinds are kept as written so that specs loaded from configuration can be
/// rejected with a precise error; [`DependencySpec::validate`] runs at
/// registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencySpec {
    entries: IndexMap<String, Vec<String>>,
}

impl DependencySpec {
    /// An empty spec, which is always satisfiable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append requirements under a raw kind key.
    #[must_use]
    pub fn with<I, S>(mut self, kind: impl Into<String>, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .entry(kind.into())
            .or_default()
            .extend(requirements.into_iter().map(Into::into));
        self
    }

    /// Require files to exist.
    #[must_use]
    pub fn files<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(DependencyKind::Files.as_str(), paths)
    }

    /// Require directories to exist.
    #[must_use]
    pub fn directories<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(DependencyKind::Directories.as_str(), paths)
    }

    /// Require programs on the search path.
    #[must_use]
    pub fn programs<I, S>(self, programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(DependencyKind::Programs.as_str(), programs)
    }

    /// Require loadable dynamic libraries.
    #[must_use]
    pub fn libraries<I, S>(self, libraries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(DependencyKind::Libraries.as_str(), libraries)
    }

    /// Require modules provided by the process.
    #[must_use]
    pub fn requires<I, S>(self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(DependencyKind::Requires.as_str(), modules)
    }

    /// Whether the spec declares no requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// Iterate over raw `(kind, requirements)` entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(kind, reqs)| (kind.as_str(), reqs.as_slice()))
    }

    /// Check that every kind key is recognized.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownDependencyKind`] for the first
    /// unrecognized key.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for kind in self.entries.keys() {
            kind.parse::<DependencyKind>()?;
        }
        Ok(())
    }
}

/// Verdict of a dependency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Every requirement is met.
    Available,
    /// At least one requirement is unmet.
    Unavailable {
        /// One entry per unmet requirement, formatted `kind: requirement`.
        reasons: Vec<String>,
    },
}

impl Availability {
    /// Whether every requirement is met.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// The unmet requirements; empty when available.
    #[must_use]
    pub fn reasons(&self) -> &[String] {
        match self {
            Self::Available => &[],
            Self::Unavailable { reasons } => reasons,
        }
    }
}

/// Best-effort load probes for `libraries` and `requires` entries.
///
/// Implementations report failure with a short description. A probe that
/// panics is treated as a failed probe.
pub trait LoadProbe: Send + Sync {
    /// Locate an externally loadable library.
    ///
    /// # Errors
    ///
    /// Returns a description when the library cannot be located.
    fn library(&self, name: &str) -> Result<(), String>;

    /// Check for a module provided by the running process.
    ///
    /// # Errors
    ///
    /// Returns a description when the module is not provided.
    fn module(&self, name: &str) -> Result<(), String>;
}

static PROVIDED_MODULES: LazyLock<RwLock<BTreeSet<String>>> = LazyLock::new(|| {
    RwLock::new(
        ["std", "core", "alloc"]
            .into_iter()
            .map(String::from)
            .collect(),
    )
});

/// Announce a module as provided by this process.
///
/// The table is process-wide and append-only.
pub fn provide_module(name: impl Into<String>) {
    PROVIDED_MODULES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.into());
}

/// Whether a module has been announced with [`provide_module`].
#[must_use]
pub fn is_module_provided(name: &str) -> bool {
    PROVIDED_MODULES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(name)
}

/// Probes the live host: dynamic library search paths and the provided
/// module table.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProbe;

impl HostProbe {
    fn library_dirs() -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for var in ["LD_LIBRARY_PATH", "DYLD_LIBRARY_PATH", "DYLD_FALLBACK_LIBRARY_PATH"] {
            if let Some(value) = std::env::var_os(var) {
                dirs.extend(std::env::split_paths(&value));
            }
        }

        let arch = std::env::consts::ARCH;
        dirs.extend(
            [
                "/lib".to_string(),
                "/lib64".to_string(),
                "/usr/lib".to_string(),
                "/usr/lib64".to_string(),
                "/usr/local/lib".to_string(),
                "/opt/homebrew/lib".to_string(),
                format!("/lib/{arch}-linux-gnu"),
                format!("/usr/lib/{arch}-linux-gnu"),
            ]
            .into_iter()
            .map(PathBuf::from),
        );
        dirs
    }

    fn matches_library(file_name: &str, name: &str) -> bool {
        let unix = format!("lib{name}.so");
        file_name == unix
            || file_name.starts_with(&format!("{unix}."))
            || file_name == format!("lib{name}.dylib")
            || file_name == format!("{name}.dll")
    }
}

impl LoadProbe for HostProbe {
    fn library(&self, name: &str) -> Result<(), String> {
        let as_path = Path::new(name);
        if as_path.components().count() > 1 {
            return if as_path.is_file() {
                Ok(())
            } else {
                Err(format!("{} does not exist", as_path.display()))
            };
        }

        for dir in Self::library_dirs() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            let found = entries
                .filter_map(std::result::Result::ok)
                .any(|entry| Self::matches_library(&entry.file_name().to_string_lossy(), name));
            if found {
                return Ok(());
            }
        }

        Err(format!("library '{name}' not found on the library search path"))
    }

    fn module(&self, name: &str) -> Result<(), String> {
        if is_module_provided(name) {
            Ok(())
        } else {
            Err(format!("module '{name}' is not provided by this process"))
        }
    }
}

/// Evaluates dependency specs against the host.
///
/// Checks are read-only: filesystem and search-path lookups plus the load
/// probes. Every unmet requirement across all kinds is reported.
#[derive(Clone)]
pub struct DependencyChecker {
    probe: Arc<dyn LoadProbe>,
}

impl DependencyChecker {
    /// Create a checker with a custom load probe.
    #[must_use]
    pub fn new(probe: Arc<dyn LoadProbe>) -> Self {
        Self { probe }
    }

    /// The shared checker backed by [`HostProbe`].
    #[must_use]
    pub fn host() -> &'static Self {
        static HOST: LazyLock<DependencyChecker> =
            LazyLock::new(|| DependencyChecker::new(Arc::new(HostProbe)));
        &HOST
    }

    /// Evaluate a spec.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownDependencyKind`] when the spec
    /// contains an unrecognized kind. Nothing is probed in that case.
    pub fn check(&self, spec: &DependencySpec) -> Result<Availability, ConfigurationError> {
        spec.validate()?;

        let mut reasons = Vec::new();
        for (key, requirements) in spec.iter() {
            let kind: DependencyKind = key.parse()?;
            for requirement in requirements {
                if !self.satisfied(kind, requirement) {
                    reasons.push(format!("{kind}: {requirement}"));
                }
            }
        }

        if reasons.is_empty() {
            Ok(Availability::Available)
        } else {
            Ok(Availability::Unavailable { reasons })
        }
    }

    fn satisfied(&self, kind: DependencyKind, requirement: &str) -> bool {
        match kind {
            DependencyKind::Files => Path::new(requirement).exists(),
            DependencyKind::Directories => Path::new(requirement).is_dir(),
            DependencyKind::Programs => which::which(requirement).is_ok(),
            DependencyKind::Libraries => self.probe(kind, requirement, |p| p.library(requirement)),
            DependencyKind::Requires => self.probe(kind, requirement, |p| p.module(requirement)),
        }
    }

    fn probe(
        &self,
        kind: DependencyKind,
        requirement: &str,
        run: impl FnOnce(&dyn LoadProbe) -> Result<(), String>,
    ) -> bool {
        let probe = self.probe.as_ref();
        match panic::catch_unwind(AssertUnwindSafe(|| run(probe))) {
            Ok(Ok(())) => true,
            Ok(Err(detail)) => {
                trace!(%kind, requirement, %detail, "Load probe failed");
                false
            }
            Err(_) => {
                trace!(%kind, requirement, "Load probe panicked");
                false
            }
        }
    }
}

impl Default for DependencyChecker {
    fn default() -> Self {
        Self::host().clone()
    }
}

impl fmt::Debug for DependencyChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyChecker").finish_non_exhaustive()
    }
}
