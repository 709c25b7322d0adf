//! External command execution.
//!
//! Every external tool the drivers depend on (the build toolchain, the
//! released binary, `tar`, `dpkg-deb`, and the pre-commit checkers) is reached
//! through [`CommandExecutor`], so tests can substitute a fake and drive every
//! success and failure branch without a real toolchain.

use crate::error::{ReleaseError, Result};
use camino::Utf8Path;
use log::debug;
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs `cmd` with `args`, optionally inside `cwd`, and returns the
    /// captured output.
    ///
    /// A non-zero exit status is not an error at this level; see
    /// [`run_checked`] for the variant that enforces success.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use shipshape::exec::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("tar", &["--version"], None)?;
    /// assert!(output.status.success());
    /// # Ok::<(), shipshape::error::ReleaseError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output> {
        let mut command = Command::new(cmd);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        command
            .output()
            .map_err(|e| ReleaseError::file_system(format!("failed to run {cmd}"), e))
    }
}

/// Runs a command and turns a non-zero exit status into
/// [`ReleaseError::Execution`].
///
/// The command line is logged at debug level before it runs. Standard output
/// is returned to the caller and otherwise discarded.
///
/// # Errors
///
/// Returns an error if the command cannot be spawned or exits unsuccessfully.
pub fn run_checked(
    executor: &dyn CommandExecutor,
    cmd: &str,
    args: &[&str],
    cwd: Option<&Utf8Path>,
) -> Result<Output> {
    match cwd {
        Some(dir) => debug!("running `{}` in {dir}", command_line(cmd, args)),
        None => debug!("running `{}`", command_line(cmd, args)),
    }

    let output = executor.run(cmd, args, cwd)?;
    if output.status.success() {
        return Ok(output);
    }

    Err(ReleaseError::Execution {
        program: cmd.to_owned(),
        args: args.iter().map(|&arg| arg.to_owned()).collect(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    })
}

/// Render a command line for logs and messages.
#[must_use]
pub fn command_line(cmd: &str, args: &[&str]) -> String {
    std::iter::once(cmd)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
