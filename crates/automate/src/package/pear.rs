//! PEAR driver for PHP packages.
//!
//! Packages from the default channel are named plainly (`HTML_QuickForm`).
//! Packages from other channels must be prefixed with the channel URL
//! (`pear.symfony-project.com/symfony`) so the channel can be discovered; a
//! channel alias such as `symfony/symfony` cannot be discovered.

use automate_plugin::{DependencySpec, Driver, DriverContext, DriverDescriptor, NEUTRAL};
use regex::Regex;
use std::process::Command;
use std::sync::LazyLock;

use super::{PackageCall, PackageDriver, PackageOptions};
use crate::Interpreter;
use crate::error::{Error, Result};
use crate::shell::ShellCommand;

#[allow(clippy::expect_used)]
static LISTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([^(\s]+)[ \t]+(\S+)[ \t]+(\S+)[ \t]*$").expect("valid pear listing regex")
});
#[allow(clippy::expect_used)]
static CHANNEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/]+/").expect("valid channel prefix regex"));

/// An entry from `pear list --allchannels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PearPackage {
    /// Package name without channel
    pub name: String,
    /// Installed version
    pub version: String,
    /// Stability state
    pub state: String,
}

/// Parse `pear list --allchannels` output, skipping column headers.
#[must_use]
pub fn parse_listing(output: &str) -> Vec<PearPackage> {
    LISTING
        .captures_iter(output)
        .filter(|caps| !caps[2].eq_ignore_ascii_case("version"))
        .map(|caps| PearPackage {
            name: caps[1].to_string(),
            version: caps[2].to_string(),
            state: caps[3].to_string(),
        })
        .collect()
}

/// Package name with any channel prefix removed, lower-cased.
#[must_use]
pub fn strip_channel(package: &str) -> String {
    CHANNEL.replace(package, "").to_lowercase()
}

/// Manages PHP packages with the `pear` command.
///
/// Never selected automatically; use it with an explicit driver or default.
#[derive(Debug)]
pub struct Pear {
    ctx: DriverContext<Interpreter>,
}

impl Pear {
    /// Programs the driver needs.
    #[must_use]
    pub fn dependencies() -> DependencySpec {
        DependencySpec::new().programs(["pear"])
    }

    /// Driver factory.
    #[allow(clippy::unnecessary_box_returns)]
    #[must_use]
    pub fn boxed(ctx: DriverContext<Interpreter>) -> Box<dyn PackageDriver> {
        Box::new(Self { ctx })
    }
}

fn install_line(packages: &[String], options: &PackageOptions) -> String {
    let mut line = String::from("(pear config-set auto_discover 1; pear install -a");
    if options.force {
        line.push_str(" -f");
    }
    line.push(' ');
    line.push_str(&packages.join(" "));
    line.push_str(" < /dev/null)");
    if options.quiet {
        line.push_str(" > /dev/null");
    }
    line.push_str(" 2>&1");
    line
}

fn uninstall_line(packages: &[String], options: &PackageOptions) -> String {
    let mut line = format!("pear uninstall {} < /dev/null", packages.join(" "));
    if options.quiet {
        line.push_str(" > /dev/null");
    }
    line.push_str(" 2>&1");
    line
}

impl Driver for Pear {
    fn descriptor(&self) -> &DriverDescriptor {
        self.ctx.descriptor()
    }
}

impl PackageDriver for Pear {
    fn context(&self) -> &DriverContext<Interpreter> {
        &self.ctx
    }

    fn suitability(&self, _call: &PackageCall<'_>) -> i32 {
        NEUTRAL
    }

    fn query_installed(&self, packages: &[String]) -> Result<Vec<String>> {
        let output = Command::new("pear")
            .args(["list", "--allchannels"])
            .output()
            .map_err(|e| Error::io(e, "running pear list"))?;
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));

        let installed: Vec<String> = parse_listing(&listing)
            .into_iter()
            .map(|p| p.name.to_lowercase())
            .collect();
        Ok(packages
            .iter()
            .filter(|p| installed.contains(&strip_channel(p)))
            .cloned()
            .collect())
    }

    fn install_packages(&self, packages: &[String], options: &PackageOptions) -> Result<bool> {
        let interpreter = self.ctx.require_context()?;
        interpreter.sh(&ShellCommand::shell(install_line(packages, options)))
    }

    fn uninstall_packages(&self, packages: &[String], options: &PackageOptions) -> Result<bool> {
        let interpreter = self.ctx.require_context()?;
        interpreter.sh(&ShellCommand::shell(uninstall_line(packages, options)))
    }
}
