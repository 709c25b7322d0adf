//! Project configuration loaded from `shipshape.toml`.
//!
//! The file lives at the project root and describes the tool being released:
//! its name, the packaging metadata, how it is built, and where the build
//! leaves the binary. Process-wide state (the install-root environment
//! variable and the project directory) is resolved once into
//! [`ReleaseSettings`] so that no stage reads the environment mid-run.

use crate::archive::ArchiveBackend;
use crate::error::{ReleaseError, Result};
use crate::naming::ToolName;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::ffi::OsString;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "shipshape.toml";

/// Top-level contents of `shipshape.toml`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Identity and metadata of the released tool.
    pub package: PackageConfig,
    /// Target platform naming.
    #[serde(default)]
    pub target: TargetConfig,
    /// How the binary is built and where the build installs it.
    #[serde(default)]
    pub build: BuildConfig,
    /// Archive packaging options.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Pre-commit gate options.
    #[serde(default)]
    pub precommit: PrecommitConfig,
}

/// The `[package]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Binary and package name.
    pub name: ToolName,
    /// Maintainer identity recorded in the native package.
    pub maintainer: String,
    /// One-line description recorded in the native package.
    pub description: String,
    /// Flag that makes the binary print its version.
    #[serde(default = "PackageConfig::default_version_flag")]
    pub version_flag: String,
    /// Changelog path, relative to the project root.
    #[serde(default = "PackageConfig::default_changelog")]
    pub changelog: Utf8PathBuf,
}

impl PackageConfig {
    fn default_version_flag() -> String {
        "--version".to_owned()
    }

    fn default_changelog() -> Utf8PathBuf {
        Utf8PathBuf::from("CHANGELOG.md")
    }
}

/// The `[target]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    /// Platform suffix used in archive names (e.g. `linux-x64`).
    pub platform: String,
    /// Debian architecture used in native package names (e.g. `amd64`).
    pub arch: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            platform: "linux-x64".to_owned(),
            arch: "amd64".to_owned(),
        }
    }
}

/// The `[build]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Program and arguments that build and install the binary.
    pub command: Vec<String>,
    /// Environment variable naming the install root(s).
    pub install_root_env: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: ["cargo", "install", "--path", "."]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            install_root_env: "CARGO_HOME".to_owned(),
        }
    }
}

/// The `[archive]` table.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Which archiver produces the `.tar.gz`.
    pub backend: ArchiveBackend,
}

/// The `[precommit]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PrecommitConfig {
    /// Directory for per-package coverage reports, relative to the project root.
    pub coverage_dir: Utf8PathBuf,
}

impl Default for PrecommitConfig {
    fn default() -> Self {
        Self {
            coverage_dir: Utf8PathBuf::from("target/coverage"),
        }
    }
}

impl ProjectConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Configuration`] if the text is not valid TOML,
    /// misses required keys, or contains unknown keys.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| ReleaseError::configuration(format!("invalid {CONFIG_FILE_NAME}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Configuration`] if the file is missing,
    /// unreadable, or invalid.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ReleaseError::configuration(format!("cannot read configuration file {path}: {e}"))
        })?;
        Self::parse(&contents)
    }

    fn validate(&self) -> Result<()> {
        if self.build.command.is_empty() {
            return Err(ReleaseError::configuration(
                "build.command must name a program",
            ));
        }
        if self.package.version_flag.trim().is_empty() {
            return Err(ReleaseError::configuration(
                "package.version_flag must not be empty",
            ));
        }
        for (key, value) in [
            ("target.platform", &self.target.platform),
            ("target.arch", &self.target.arch),
        ] {
            if value.is_empty() || value.contains(['/', '\\']) || value.contains(char::is_whitespace)
            {
                return Err(ReleaseError::configuration(format!(
                    "{key} must be a non-empty name without separators or whitespace, got {value:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Source of environment variables.
///
/// Injected so configuration resolution never touches the process
/// environment directly.
#[cfg_attr(test, mockall::automock)]
pub trait EnvSource {
    /// Return the value of `key`, if set.
    fn var_os(&self, key: &str) -> Option<OsString>;
}

/// Reads variables from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }
}

/// Fully resolved inputs for the release orchestrator.
#[derive(Clone, Debug)]
pub struct ReleaseSettings {
    /// Directory holding `shipshape.toml`; commands run from here.
    pub project_root: Utf8PathBuf,
    /// Tool name.
    pub tool: ToolName,
    /// Maintainer identity for the control record.
    pub maintainer: String,
    /// Description for the control record.
    pub description: String,
    /// Flag that makes the binary print its version.
    pub version_flag: String,
    /// Absolute changelog path.
    pub changelog: Utf8PathBuf,
    /// Archive platform suffix.
    pub platform: String,
    /// Native package architecture.
    pub arch: String,
    /// Build program and arguments.
    pub build_command: Vec<String>,
    /// Where the build installs the binary.
    pub binary_path: Utf8PathBuf,
    /// Archive backend.
    pub archive_backend: ArchiveBackend,
}

impl ReleaseSettings {
    /// Bind `config` to the project root and environment.
    ///
    /// The install-root variable holds a path list; its first entry is used,
    /// and the binary is expected at `<root>/bin/<tool>`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Configuration`] if the install-root variable
    /// is unset, empty, or not valid UTF-8.
    pub fn resolve(
        config: &ProjectConfig,
        project_root: &Utf8Path,
        env: &dyn EnvSource,
    ) -> Result<Self> {
        let install_root = resolve_install_root(&config.build.install_root_env, env)?;
        let binary_path = install_root.join("bin").join(config.package.name.as_str());

        Ok(Self {
            project_root: project_root.to_owned(),
            tool: config.package.name.clone(),
            maintainer: config.package.maintainer.clone(),
            description: config.package.description.clone(),
            version_flag: config.package.version_flag.clone(),
            changelog: project_root.join(&config.package.changelog),
            platform: config.target.platform.clone(),
            arch: config.target.arch.clone(),
            build_command: config.build.command.clone(),
            binary_path,
            archive_backend: config.archive.backend,
        })
    }
}

/// Resolve the first entry of the install-root path list held in `var`.
///
/// # Errors
///
/// Returns [`ReleaseError::Configuration`] if the variable is unset, holds no
/// entries, or its first entry is not valid UTF-8.
pub fn resolve_install_root(var: &str, env: &dyn EnvSource) -> Result<Utf8PathBuf> {
    let value = env.var_os(var).ok_or_else(|| {
        ReleaseError::configuration(format!("expected variable {var} in the environment"))
    })?;

    let first = std::env::split_paths(&value)
        .find(|path| !path.as_os_str().is_empty())
        .ok_or_else(|| {
            ReleaseError::configuration(format!(
                "expected at least one directory in {var}, but got none"
            ))
        })?;

    Utf8PathBuf::try_from(first)
        .map_err(|e| ReleaseError::configuration(format!("{var} is not valid UTF-8: {e}")))
}

/// Return the project root for a configuration file path.
///
/// A bare file name resolves to the current directory.
#[must_use]
pub fn project_root_of(config_path: &Utf8Path) -> Utf8PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_owned(),
        _ => Utf8PathBuf::from("."),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
