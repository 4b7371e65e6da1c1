//! Shell driver for Unix-like hosts.

use automate_plugin::{Driver, DriverContext, DriverDescriptor};
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use super::{ShellCall, ShellCommand, ShellDriver};
use crate::Interpreter;
use crate::error::{Error, Result};

/// Runs commands with [`std::process::Command`] and resolves programs on
/// `PATH`.
#[derive(Debug)]
pub struct Posix {
    ctx: DriverContext<Interpreter>,
}

impl Posix {
    /// Suitability for every shell operation.
    pub const SUITABILITY: i32 = 3;

    /// Driver factory.
    #[allow(clippy::unnecessary_box_returns)]
    #[must_use]
    pub fn boxed(ctx: DriverContext<Interpreter>) -> Box<dyn ShellDriver> {
        Box::new(Self { ctx })
    }
}

impl Driver for Posix {
    fn descriptor(&self) -> &DriverDescriptor {
        self.ctx.descriptor()
    }
}

impl ShellDriver for Posix {
    fn suitability(&self, _call: &ShellCall<'_>) -> i32 {
        Self::SUITABILITY
    }

    fn sh(&self, command: &ShellCommand) -> Result<bool> {
        let interpreter = self.ctx.require_context()?;
        let _span = interpreter.span().enter();

        info!("$$$ {command}");
        if interpreter.is_noop() {
            return Ok(true);
        }

        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k, v)));
        if command.quiet {
            process.stdout(Stdio::null()).stderr(Stdio::null());
        }

        match process.status() {
            Ok(status) => {
                debug!(program = %command.program, code = ?status.code(), "Command finished");
                Ok(status.success())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(program = %command.program, "Command not found");
                Ok(false)
            }
            Err(e) => Err(Error::io(e, format!("running {}", command.program))),
        }
    }

    fn which(&self, program: &str) -> Result<Option<PathBuf>> {
        Ok(which::which(program).ok())
    }
}
