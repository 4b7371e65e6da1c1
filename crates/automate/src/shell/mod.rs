//! Running commands on the host.
//!
//! [`ShellManager`] forwards `sh` and `which` to a [`ShellDriver`]. The
//! built-in [`Posix`] driver serves every Unix-like host.

mod posix;

pub use posix::Posix;

use automate_plugin::{Dispatcher, Driver, Manager, Operation, UNSUITABLE};
use std::fmt;
use std::path::PathBuf;

use crate::Interpreter;
use crate::error::Result;

/// A command to run, either a program with arguments or a shell line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellCommand {
    /// Program to execute
    pub program: String,
    /// Arguments passed verbatim
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Discard the command's output
    pub quiet: bool,
    /// Driver to use instead of the selected one
    pub with: Option<String>,
}

impl ShellCommand {
    /// Run `program` directly.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Run `line` through `sh -c`.
    #[must_use]
    pub fn shell(line: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(line)
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the command.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Discard output.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Run with a specific driver.
    #[must_use]
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.with = Some(driver.into());
        self
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{key}={value} ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// A call to one of the shell manager's operations.
#[derive(Debug, Clone, Copy)]
pub enum ShellCall<'a> {
    /// Run a command
    Sh(&'a ShellCommand),
    /// Locate a program on the search path
    Which(&'a str),
}

impl Operation for ShellCall<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::Sh(_) => "sh",
            Self::Which(_) => "which",
        }
    }

    fn target(&self) -> Option<&str> {
        match self {
            Self::Sh(command) => command.with.as_deref(),
            Self::Which(_) => None,
        }
    }
}

/// Driver interface for [`ShellManager`].
pub trait ShellDriver: Driver {
    /// How suitable this driver is for a call.
    fn suitability(&self, _call: &ShellCall<'_>) -> i32 {
        UNSUITABLE
    }

    /// Run a command, returning whether it exited successfully.
    ///
    /// # Errors
    ///
    /// Fails when the command cannot be started.
    fn sh(&self, _command: &ShellCommand) -> Result<bool> {
        Err(self.unimplemented("sh").into())
    }

    /// Locate a program on the search path.
    ///
    /// # Errors
    ///
    /// Fails when the driver cannot search.
    fn which(&self, _program: &str) -> Result<Option<PathBuf>> {
        Err(self.unimplemented("which").into())
    }
}

/// Facade for running commands.
#[derive(Debug)]
pub struct ShellManager {
    dispatcher: Dispatcher<Self>,
}

impl Manager for ShellManager {
    type Driver = dyn ShellDriver;
    type Call<'a> = ShellCall<'a>;
    type Context = Interpreter;

    fn from_dispatcher(dispatcher: Dispatcher<Self>) -> Self {
        Self { dispatcher }
    }

    fn dispatcher(&self) -> &Dispatcher<Self> {
        &self.dispatcher
    }

    fn suitability(driver: &dyn ShellDriver, call: &ShellCall<'_>) -> i32 {
        driver.suitability(call)
    }
}

impl ShellManager {
    /// Run a command, returning whether it exited successfully.
    ///
    /// In noop mode the command is only logged and reported as successful.
    ///
    /// # Errors
    ///
    /// Fails when no driver can run commands or the command cannot start.
    pub fn sh(&self, command: &ShellCommand) -> Result<bool> {
        self.dispatcher
            .dispatch(&ShellCall::Sh(command), |driver| driver.sh(command))
    }

    /// Locate a program on the search path.
    ///
    /// # Errors
    ///
    /// Fails when no driver can search.
    pub fn which(&self, program: &str) -> Result<Option<PathBuf>> {
        self.dispatcher
            .dispatch(&ShellCall::Which(program), |driver| driver.which(program))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_line_runs_through_sh() {
        let command = ShellCommand::shell("echo hi");
        assert_eq!(command.program, "sh");
        assert_eq!(command.args, vec!["-c", "echo hi"]);
    }

    #[test]
    fn test_display_quotes_arguments_with_spaces() {
        let command = ShellCommand::new("apt-get")
            .args(["install", "-y"])
            .arg("two words")
            .env("DEBIAN_FRONTEND", "noninteractive");
        assert_eq!(
            command.to_string(),
            "DEBIAN_FRONTEND=noninteractive apt-get install -y 'two words'"
        );
    }

    #[test]
    fn test_call_target_comes_from_command() {
        let command = ShellCommand::new("true").with_driver("posix");
        assert_eq!(ShellCall::Sh(&command).target(), Some("posix"));
        assert_eq!(ShellCall::Which("true").target(), None);
        assert_eq!(ShellCall::Which("true").name(), "which");
    }
}
