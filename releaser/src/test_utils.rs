//! Test doubles for the command executor and environment seams.
//!
//! [`StubExecutor`] replays a strict queue of expected invocations, which
//! suits tests that care about exact command lines. [`FakeToolchain`]
//! imitates the released binary, `tar`, and `dpkg-deb` well enough for the
//! release pipeline to run end to end inside a [`ReleaseSandbox`].

use crate::archive::ArchiveBackend;
use crate::config::{EnvSource, ReleaseSettings};
use crate::error::{ReleaseError, Result};
use crate::exec::CommandExecutor;
use crate::naming::ToolName;
use crate::staging::StagingArea;
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::fs;
use std::process::{ExitStatus, Output};
use tempfile::TempDir;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    stdout_output("")
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn stdout_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    exit_output(1, "", stderr)
}

/// Creates a command `Output` with an explicit exit code and streams.
#[must_use]
pub fn exit_output(code: i32, stdout: &str, stderr: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "cargo").
    pub cmd: String,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The expected working directory, when the test cares about it.
    pub cwd: Option<Utf8PathBuf>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// Expect `cmd` with `args`, answering with `result`.
    #[must_use]
    pub fn new(cmd: impl Into<String>, args: &[&str], result: Result<Output>) -> Self {
        Self {
            cmd: cmd.into(),
            args: args.iter().map(|&arg| arg.to_owned()).collect(),
            cwd: None,
            result,
        }
    }

    /// Additionally require the call to run inside `cwd`.
    #[must_use]
    pub fn in_dir(mut self, cwd: impl Into<Utf8PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, {} remain: {:?}",
            remaining.len(),
            remaining.iter().map(|c| &c.cmd).collect::<Vec<_>>()
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output> {
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(ReleaseError::StubMismatch {
                message: format!("unexpected invocation of {cmd} {args:?}"),
            });
        };

        if call.cmd != cmd || call.args != args {
            return Err(ReleaseError::StubMismatch {
                message: format!(
                    "expected {} {:?}, received {cmd} {args:?}",
                    call.cmd, call.args
                ),
            });
        }

        if let Some(expected_dir) = &call.cwd {
            if cwd != Some(expected_dir.as_path()) {
                return Err(ReleaseError::StubMismatch {
                    message: format!("expected {cmd} to run in {expected_dir}, got {cwd:?}"),
                });
            }
        }

        call.result
    }
}

/// One invocation observed by [`FakeToolchain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Program name or path.
    pub cmd: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory, when one was given.
    pub cwd: Option<Utf8PathBuf>,
}

/// A scripted toolchain for exercising the release pipeline.
///
/// - any program whose file name equals the tool name prints the configured
///   version;
/// - `tar -czf <file> <dir>` writes `<file>` inside the working directory;
/// - `dpkg-deb --build <dir>` writes `<dir>.deb` inside the working
///   directory and captures the control record it was given;
/// - every other program succeeds silently.
///
/// Programs registered with [`FakeToolchain::failing`] exit with code 2
/// without producing anything.
#[derive(Debug)]
pub struct FakeToolchain {
    tool: String,
    version_output: String,
    failing: Vec<String>,
    calls: RefCell<Vec<RecordedCall>>,
    control_records: RefCell<Vec<String>>,
}

impl FakeToolchain {
    /// Create a toolchain whose binary `tool` reports `version_output`.
    #[must_use]
    pub fn new(tool: &str, version_output: &str) -> Self {
        Self {
            tool: tool.to_owned(),
            version_output: version_output.to_owned(),
            failing: Vec::new(),
            calls: RefCell::new(Vec::new()),
            control_records: RefCell::new(Vec::new()),
        }
    }

    /// Make `program` exit unsuccessfully.
    #[must_use]
    pub fn failing(mut self, program: &str) -> Self {
        self.failing.push(program.to_owned());
        self
    }

    /// Return every invocation observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    /// Return the program names invoked, in order.
    #[must_use]
    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|call| program_name(&call.cmd).to_owned())
            .collect()
    }

    /// Return the control records seen by `dpkg-deb`, in order.
    #[must_use]
    pub fn control_records(&self) -> Vec<String> {
        self.control_records.borrow().clone()
    }

    fn produce(&self, name: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output> {
        let base = cwd.map_or_else(Utf8PathBuf::new, Utf8Path::to_owned);
        match (name, args) {
            ("tar", [_, file, _dir]) => {
                fs::write(base.join(file), b"fake tarball")?;
            }
            ("dpkg-deb", [_, root]) => {
                let control = fs::read_to_string(base.join(root).join("DEBIAN").join("control"))?;
                self.control_records.borrow_mut().push(control);
                fs::write(base.join(format!("{root}.deb")), b"fake deb")?;
            }
            _ if name == self.tool => {
                return Ok(stdout_output(&format!("{}\n", self.version_output)));
            }
            _ => {}
        }
        Ok(success_output())
    }
}

impl CommandExecutor for FakeToolchain {
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output> {
        self.calls.borrow_mut().push(RecordedCall {
            cmd: cmd.to_owned(),
            args: args.iter().map(|&arg| arg.to_owned()).collect(),
            cwd: cwd.map(Utf8Path::to_owned),
        });

        let name = program_name(cmd);
        if self.failing.iter().any(|failing| failing == name) {
            return Ok(exit_output(2, "", &format!("{name}: simulated failure")));
        }
        self.produce(name, args, cwd)
    }
}

/// Return the file name of `cmd`, which may be a bare name or a path.
#[must_use]
pub fn program_name(cmd: &str) -> &str {
    Utf8Path::new(cmd).file_name().unwrap_or(cmd)
}

/// A throwaway project laid out for end-to-end release runs.
///
/// The sandbox owns a temporary directory holding:
///
/// - `project/` with a changelog, used as the project root;
/// - `install/bin/<tool>`, standing in for the installed binary;
/// - `staging/`, the base for staging trees;
/// - `release/`, the release directory.
#[derive(Debug)]
pub struct ReleaseSandbox {
    _root: TempDir,
    root: Utf8PathBuf,
    tool: ToolName,
}

impl ReleaseSandbox {
    /// Lay out a sandbox for `tool` whose changelog reads `changelog`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary layout cannot be created.
    pub fn new(tool: &str, changelog: &str) -> Result<Self> {
        let dir = TempDir::new()?;
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf())
            .map_err(|e| ReleaseError::configuration(format!("non UTF-8 temp dir: {e}")))?;
        let tool = ToolName::try_from(tool)?;

        fs::create_dir_all(root.join("project"))?;
        fs::create_dir_all(root.join("install").join("bin"))?;
        fs::create_dir_all(root.join("staging"))?;
        fs::write(
            root.join("install").join("bin").join(tool.as_str()),
            b"#!/bin/sh\n",
        )?;

        let sandbox = Self {
            _root: dir,
            root,
            tool,
        };
        sandbox.write_changelog(changelog)?;
        Ok(sandbox)
    }

    /// Replace the changelog contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_changelog(&self, contents: &str) -> Result<()> {
        fs::write(self.project_root().join("CHANGELOG.md"), contents)?;
        Ok(())
    }

    /// Project root holding the changelog.
    #[must_use]
    pub fn project_root(&self) -> Utf8PathBuf {
        self.root.join("project")
    }

    /// Install root whose `bin/` holds the binary.
    #[must_use]
    pub fn install_root(&self) -> Utf8PathBuf {
        self.root.join("install")
    }

    /// Path of the installed binary.
    #[must_use]
    pub fn binary_path(&self) -> Utf8PathBuf {
        self.install_root().join("bin").join(self.tool.as_str())
    }

    /// Write a `shipshape.toml` for the tool into the project root.
    ///
    /// `extra` is appended verbatim after the `[package]` table.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_config(&self, extra: &str) -> Result<Utf8PathBuf> {
        let path = self.project_root().join("shipshape.toml");
        let contents = format!(
            "[package]\nname = \"{}\"\nmaintainer = \"Jane Doe <jane@example.com>\"\n\
             description = \"Example command-line tool\"\n{extra}",
            self.tool
        );
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Release directory, which does not exist until a request creates it.
    #[must_use]
    pub fn release_dir(&self) -> Utf8PathBuf {
        self.root.join("release")
    }

    /// Staging area rooted inside the sandbox.
    #[must_use]
    pub fn staging_area(&self) -> StagingArea {
        StagingArea::under(self.root.join("staging"))
    }

    /// Settings targeting `linux-x64`/`amd64` with the given archive backend.
    #[must_use]
    pub fn settings(&self, archive_backend: ArchiveBackend) -> ReleaseSettings {
        ReleaseSettings {
            project_root: self.project_root(),
            tool: self.tool.clone(),
            maintainer: "Jane Doe <jane@example.com>".to_owned(),
            description: "Example command-line tool".to_owned(),
            version_flag: "--version".to_owned(),
            changelog: self.project_root().join("CHANGELOG.md"),
            platform: "linux-x64".to_owned(),
            arch: "amd64".to_owned(),
            build_command: ["cargo", "install", "--path", "."]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            binary_path: self.binary_path(),
            archive_backend,
        }
    }

    /// Sorted file names in the release directory; empty if it is absent.
    #[must_use]
    pub fn release_entries(&self) -> Vec<String> {
        sorted_entries(&self.release_dir())
    }

    /// Sorted names of staging trees left behind.
    #[must_use]
    pub fn staging_leftovers(&self) -> Vec<String> {
        sorted_entries(&self.root.join("staging"))
    }
}

fn sorted_entries(dir: &Utf8Path) -> Vec<String> {
    let Ok(entries) = dir.read_dir_utf8() else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.file_name().to_owned())
        .collect();
    names.sort();
    names
}

/// An [`EnvSource`] answering from a fixed set of variables.
#[derive(Debug, Clone, Default)]
pub struct FixedEnv {
    vars: HashMap<String, OsString>,
}

impl FixedEnv {
    /// Add `key` with `value`.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.to_owned(), value.into());
        self
    }
}

impl EnvSource for FixedEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.vars.get(key).cloned()
    }
}
