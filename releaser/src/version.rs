//! Version extraction from the built binary.
//!
//! The binary's own version output is the single source of truth for a
//! release. It is captured verbatim (after trimming surrounding whitespace)
//! and never parsed: two versions are either byte-identical or different.

use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, run_checked};
use camino::Utf8Path;
use log::info;
use serde::Serialize;
use std::fmt;

/// Exact version text reported by a binary.
///
/// The value is opaque, but because it becomes part of artefact file names
/// it must be a single non-empty line without path separators.
///
/// # Examples
///
/// ```
/// use shipshape::version::VersionString;
///
/// let version = VersionString::try_from("v1.4.0").expect("valid version");
/// assert_eq!(version.as_str(), "v1.4.0");
/// assert!(VersionString::try_from("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VersionString(String);

impl VersionString {
    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<&str> for VersionString {
    type Error = String;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        validate_version(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl AsRef<str> for VersionString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate_version(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Err("version output is empty".to_owned());
    }
    if value.contains(['\n', '\r']) {
        return Err(format!("expected a single line, got {value:?}"));
    }
    if value.contains(['/', '\\']) {
        return Err(format!(
            "version {value:?} contains a path separator and cannot name an artefact"
        ));
    }
    Ok(())
}

/// Run `binary` with `flag` and return its trimmed standard output.
///
/// # Errors
///
/// - [`ReleaseError::Configuration`] if `binary` does not exist;
/// - [`ReleaseError::Execution`] if the binary exits unsuccessfully;
/// - [`ReleaseError::MalformedVersion`] if the output is not UTF-8, is
///   empty after trimming, spans several lines, or contains a path separator.
pub fn extract_version(
    executor: &dyn CommandExecutor,
    binary: &Utf8Path,
    flag: &str,
) -> Result<VersionString> {
    if !binary.is_file() {
        return Err(ReleaseError::configuration(format!(
            "built binary not found at {binary}"
        )));
    }

    let output = run_checked(executor, binary.as_str(), &[flag], None)?;
    let stdout = String::from_utf8(output.stdout).map_err(|e| ReleaseError::MalformedVersion {
        binary: binary.to_owned(),
        reason: format!("output is not valid UTF-8: {e}"),
    })?;

    let version =
        VersionString::try_from(stdout.trim()).map_err(|reason| ReleaseError::MalformedVersion {
            binary: binary.to_owned(),
            reason,
        })?;

    info!("{binary} reports version {version}");
    Ok(version)
}
