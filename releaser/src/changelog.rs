//! Changelog verification against the binary's version.
//!
//! The changelog's first line must equal the version string exactly. Lines
//! are split as by [`str::lines`], so a trailing carriage return is not part
//! of the line, but no other normalisation is applied.

use crate::error::{ReleaseError, Result};
use crate::version::VersionString;
use camino::{Utf8Path, Utf8PathBuf};
use log::info;

/// First line of a verified changelog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogRecord {
    path: Utf8PathBuf,
    first_line: String,
}

impl ChangelogRecord {
    /// Changelog document the record was read from.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The first line, exactly as written.
    #[must_use]
    pub fn first_line(&self) -> &str {
        &self.first_line
    }
}

/// Read the changelog at `path` and check that it announces `version`.
///
/// # Errors
///
/// Returns [`ReleaseError::FileSystem`] if the file cannot be read, or any
/// error from [`verify_changelog_text`].
pub fn verify_changelog(path: &Utf8Path, version: &VersionString) -> Result<ChangelogRecord> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ReleaseError::file_system(format!("failed to read changelog {path}"), e))?;
    let record = verify_changelog_text(&text, version, path)?;
    info!("changelog {path} matches version {version}");
    Ok(record)
}

/// Check that the first line of `text` equals `version`.
///
/// `path` is only used to describe failures.
///
/// # Errors
///
/// - [`ReleaseError::EmptyChangelog`] if `text` has no lines;
/// - [`ReleaseError::VersionMismatch`] if the first line differs from
///   `version` in any byte.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use shipshape::changelog::verify_changelog_text;
/// use shipshape::version::VersionString;
///
/// let version = VersionString::try_from("v2.0.1").expect("valid version");
/// let path = Utf8Path::new("CHANGELOG.md");
///
/// assert!(verify_changelog_text("v2.0.1\n* fixed things\n", &version, path).is_ok());
/// assert!(verify_changelog_text("v2.0.0\n", &version, path).is_err());
/// ```
pub fn verify_changelog_text(
    text: &str,
    version: &VersionString,
    path: &Utf8Path,
) -> Result<ChangelogRecord> {
    let Some(first_line) = text.lines().next() else {
        return Err(ReleaseError::EmptyChangelog {
            path: path.to_owned(),
        });
    };

    if first_line != version.as_str() {
        return Err(ReleaseError::VersionMismatch {
            expected: version.as_str().to_owned(),
            found: first_line.to_owned(),
            path: path.to_owned(),
        });
    }

    Ok(ChangelogRecord {
        path: path.to_owned(),
        first_line: first_line.to_owned(),
    })
}
