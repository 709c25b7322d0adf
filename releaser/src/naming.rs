//! Naming conventions for the released tool and its package artefacts.
//!
//! - Archive layout and file: `<tool>-<version>-<platform>` and
//!   `<tool>-<version>-<platform>.tar.gz`.
//! - Debian layout and file: `<tool>_<version>_<arch>` and
//!   `<tool>_<version>_<arch>.deb`.
//!
//! Both embed the [`VersionString`] verbatim.

use crate::error::ReleaseError;
use crate::version::VersionString;
use serde::Deserialize;
use std::fmt;

/// File extension of compressed archives.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// File extension of Debian packages.
pub const NATIVE_EXTENSION: &str = ".deb";

/// Validated name of the released tool.
///
/// The name doubles as the binary file name and the Debian package name, so
/// it must be non-empty and free of whitespace and path separators.
///
/// # Examples
///
/// ```
/// use shipshape::naming::ToolName;
///
/// let name = ToolName::try_from("gocontracts").expect("valid tool name");
/// assert_eq!(name.as_str(), "gocontracts");
/// assert!(ToolName::try_from("bin/tool").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct ToolName(String);

impl ToolName {
    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ToolName {
    type Error = ReleaseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl TryFrom<String> for ToolName {
    type Error = ReleaseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(ReleaseError::configuration("tool name must not be empty"));
        }
        if value.contains(['/', '\\']) || value.contains(char::is_whitespace) {
            return Err(ReleaseError::configuration(format!(
                "tool name {value:?} must not contain whitespace or path separators"
            )));
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for ToolName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of the compressed archive artefact.
///
/// # Examples
///
/// ```
/// use shipshape::naming::{ArchiveName, ToolName};
/// use shipshape::version::VersionString;
///
/// let tool = ToolName::try_from("toolname").expect("valid tool name");
/// let version = VersionString::try_from("v2.0.1").expect("valid version");
/// let name = ArchiveName::new(&tool, &version, "linux-x64");
///
/// assert_eq!(name.layout_dir(), "toolname-v2.0.1-linux-x64");
/// assert_eq!(name.filename(), "toolname-v2.0.1-linux-x64.tar.gz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    stem: String,
}

impl ArchiveName {
    /// Build the archive name from its components.
    #[must_use]
    pub fn new(tool: &ToolName, version: &VersionString, platform: &str) -> Self {
        Self {
            stem: format!("{tool}-{version}-{platform}"),
        }
    }

    /// Directory name of the archive's top-level layout.
    #[must_use]
    pub fn layout_dir(&self) -> &str {
        &self.stem
    }

    /// File name of the finished archive.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}{ARCHIVE_EXTENSION}", self.stem)
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filename())
    }
}

/// Name of the Debian package artefact.
///
/// # Examples
///
/// ```
/// use shipshape::naming::{NativePackageName, ToolName};
/// use shipshape::version::VersionString;
///
/// let tool = ToolName::try_from("toolname").expect("valid tool name");
/// let version = VersionString::try_from("v2.0.1").expect("valid version");
/// let name = NativePackageName::new(&tool, &version, "amd64");
///
/// assert_eq!(name.layout_dir(), "toolname_v2.0.1_amd64");
/// assert_eq!(name.filename(), "toolname_v2.0.1_amd64.deb");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativePackageName {
    stem: String,
}

impl NativePackageName {
    /// Build the package name from its components.
    #[must_use]
    pub fn new(tool: &ToolName, version: &VersionString, arch: &str) -> Self {
        Self {
            stem: format!("{tool}_{version}_{arch}"),
        }
    }

    /// Directory name of the package root handed to `dpkg-deb`.
    #[must_use]
    pub fn layout_dir(&self) -> &str {
        &self.stem
    }

    /// File name `dpkg-deb` produces next to the package root.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}{NATIVE_EXTENSION}", self.stem)
    }
}

impl fmt::Display for NativePackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filename())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn tool() -> ToolName {
        ToolName::try_from("toolname").expect("valid tool name")
    }

    #[fixture]
    fn version() -> VersionString {
        VersionString::try_from("v2.0.1").expect("valid version")
    }

    #[rstest]
    fn archive_name_embeds_version_verbatim(tool: ToolName, version: VersionString) {
        let name = ArchiveName::new(&tool, &version, "linux-x64");
        assert_eq!(name.to_string(), "toolname-v2.0.1-linux-x64.tar.gz");
    }

    #[rstest]
    fn native_name_uses_underscores(tool: ToolName, version: VersionString) {
        let name = NativePackageName::new(&tool, &version, "amd64");
        assert_eq!(name.to_string(), "toolname_v2.0.1_amd64.deb");
    }

    #[rstest]
    fn different_platforms_produce_different_names(tool: ToolName, version: VersionString) {
        let linux = ArchiveName::new(&tool, &version, "linux-x64");
        let arm = ArchiveName::new(&tool, &version, "linux-arm64");
        assert_ne!(linux, arm);
    }

    #[rstest]
    #[case::empty("")]
    #[case::space("my tool")]
    #[case::slash("bin/tool")]
    #[case::backslash("bin\\tool")]
    fn tool_name_rejects_unsafe_values(#[case] value: &str) {
        assert!(ToolName::try_from(value).is_err());
    }

    #[test]
    fn tool_name_deserialises_with_validation() {
        #[derive(Deserialize)]
        struct Wrapper {
            name: ToolName,
        }

        let ok: Wrapper = toml::from_str("name = \"gocontracts\"").expect("valid name");
        assert_eq!(ok.name.as_str(), "gocontracts");
        assert!(toml::from_str::<Wrapper>("name = \"a b\"").is_err());
    }
}
