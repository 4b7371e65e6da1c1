//! APT driver for Debian-based hosts.

use automate_plugin::{DependencySpec, Driver, DriverContext, DriverDescriptor};
use std::process::Command;
use tracing::trace;

use super::{PackageCall, PackageDriver, PackageOptions};
use crate::Interpreter;
use crate::error::{Error, Result};
use crate::shell::ShellCommand;

/// Manages packages with `apt-get`, querying state with `dpkg-query`.
#[derive(Debug)]
pub struct Apt {
    ctx: DriverContext<Interpreter>,
}

impl Apt {
    /// Suitability when the tools are present.
    pub const SUITABILITY: i32 = 1;

    /// Programs the driver needs.
    #[must_use]
    pub fn dependencies() -> DependencySpec {
        DependencySpec::new().programs(["apt-get", "dpkg-query"])
    }

    /// Driver factory.
    #[allow(clippy::unnecessary_box_returns)]
    #[must_use]
    pub fn boxed(ctx: DriverContext<Interpreter>) -> Box<dyn PackageDriver> {
        Box::new(Self { ctx })
    }

    fn apt_get(&self, action: &str, packages: &[String], options: &PackageOptions) -> Result<bool> {
        let interpreter = self.ctx.require_context()?;
        let command = ShellCommand::new("apt-get")
            .env("DEBIAN_FRONTEND", "noninteractive")
            .args([action, "-y", "-q"])
            .args(packages.iter().cloned())
            .quiet(options.quiet);
        interpreter.sh(&command)
    }
}

/// Names of installed packages in `dpkg-query -W -f '${Package} ${Status}\n'`
/// output.
#[must_use]
pub fn parse_dpkg_status(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            let state = fields.last()?;
            (state == "installed").then(|| name.to_string())
        })
        .collect()
}

impl Driver for Apt {
    fn descriptor(&self) -> &DriverDescriptor {
        self.ctx.descriptor()
    }
}

impl PackageDriver for Apt {
    fn context(&self) -> &DriverContext<Interpreter> {
        &self.ctx
    }

    fn suitability(&self, _call: &PackageCall<'_>) -> i32 {
        Self::SUITABILITY
    }

    fn query_installed(&self, packages: &[String]) -> Result<Vec<String>> {
        if packages.is_empty() {
            return Ok(Vec::new());
        }

        // Unknown packages make dpkg-query exit non-zero but the known ones
        // are still listed, so the exit status is ignored.
        let output = Command::new("dpkg-query")
            .args(["-W", "-f", "${Package} ${Status}\n"])
            .args(packages)
            .output()
            .map_err(|e| Error::io(e, "running dpkg-query"))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        trace!(output = %stdout, "dpkg-query output");

        let installed = parse_dpkg_status(&stdout);
        Ok(packages
            .iter()
            .filter(|p| installed.contains(p))
            .cloned()
            .collect())
    }

    fn install_packages(&self, packages: &[String], options: &PackageOptions) -> Result<bool> {
        self.apt_get("install", packages, options)
    }

    fn uninstall_packages(&self, packages: &[String], options: &PackageOptions) -> Result<bool> {
        self.apt_get("remove", packages, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dpkg_status() {
        let output = "\
bash install ok installed
vim deinstall ok config-files
curl install ok installed
nano unknown ok not-installed
";
        assert_eq!(parse_dpkg_status(output), vec!["bash", "curl"]);
    }

    #[test]
    fn test_parse_dpkg_status_ignores_blank_lines() {
        assert!(parse_dpkg_status("\n\n").is_empty());
    }

    #[test]
    fn test_dependencies_name_both_tools() {
        let spec = Apt::dependencies();
        let programs: Vec<&str> = spec
            .iter()
            .flat_map(|(_, reqs)| reqs.iter().map(String::as_str))
            .collect();
        assert_eq!(programs, vec!["apt-get", "dpkg-query"]);
    }
}
