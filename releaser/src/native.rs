//! Debian package assembly.
//!
//! Lays out `<tool>_<version>_<arch>/usr/bin/<tool>` with a freshly rendered
//! `DEBIAN/control` record, runs `dpkg-deb --build` on the layout, and moves
//! the resulting `.deb` into the release directory.

use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, run_checked};
use crate::naming::{NativePackageName, ToolName};
use crate::staging::StagingTree;
use crate::version::VersionString;
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use std::fs;

/// Metadata stamped into every package built for a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// Package and binary name.
    pub tool: ToolName,
    /// Maintainer identity.
    pub maintainer: String,
    /// One-line description.
    pub description: String,
    /// Debian architecture, e.g. `amd64`.
    pub arch: String,
}

/// The `DEBIAN/control` record of one package build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRecord<'a> {
    metadata: &'a PackageMetadata,
    version: &'a VersionString,
}

impl<'a> ControlRecord<'a> {
    /// Pair `metadata` with the version of the build being packaged.
    #[must_use]
    pub fn new(metadata: &'a PackageMetadata, version: &'a VersionString) -> Self {
        Self { metadata, version }
    }

    /// Render the record in Debian control-file syntax.
    ///
    /// # Examples
    ///
    /// ```
    /// use shipshape::naming::ToolName;
    /// use shipshape::native::{ControlRecord, PackageMetadata};
    /// use shipshape::version::VersionString;
    ///
    /// let metadata = PackageMetadata {
    ///     tool: ToolName::try_from("toolname").expect("valid tool name"),
    ///     maintainer: "Jane Doe <jane@example.com>".to_owned(),
    ///     description: "A tool".to_owned(),
    ///     arch: "amd64".to_owned(),
    /// };
    /// let version = VersionString::try_from("v2.0.1").expect("valid version");
    ///
    /// let rendered = ControlRecord::new(&metadata, &version).render();
    /// assert!(rendered.contains("Version: v2.0.1\n"));
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "Package: {}\nVersion: {}\nMaintainer: {}\nArchitecture: {}\nDescription: {}\n",
            self.metadata.tool,
            self.version,
            self.metadata.maintainer,
            self.metadata.arch,
            self.metadata.description,
        )
    }
}

/// Produces the Debian package artefact.
pub struct NativePackager<'a> {
    executor: &'a dyn CommandExecutor,
    metadata: &'a PackageMetadata,
}

impl<'a> NativePackager<'a> {
    /// Create a packager stamping `metadata` into each package.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, metadata: &'a PackageMetadata) -> Self {
        Self { executor, metadata }
    }

    /// Package `binary` as `version` and move the `.deb` into `release_dir`.
    ///
    /// Returns the package's final path.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::FileSystem`] if the layout cannot be built or
    /// the package cannot be moved, and [`ReleaseError::Execution`] if
    /// `dpkg-deb` fails.
    pub fn package(
        &self,
        binary: &Utf8Path,
        version: &VersionString,
        tree: &StagingTree,
        release_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf> {
        let tool = &self.metadata.tool;
        let name = NativePackageName::new(tool, version, &self.metadata.arch);
        let root = Utf8Path::new(name.layout_dir());

        tree.copy_into(binary, root.join("usr").join("bin").join(tool.as_str()))?;

        let control_dir = tree.create_dir(root.join("DEBIAN"))?;
        let control_path = control_dir.join("control");
        let record = ControlRecord::new(self.metadata, version);
        fs::write(&control_path, record.render())
            .map_err(|e| ReleaseError::file_system(format!("failed to write {control_path}"), e))?;

        run_checked(
            self.executor,
            "dpkg-deb",
            &["--build", root.as_str()],
            Some(tree.path()),
        )?;

        let staged = tree.path().join(name.filename());
        if !staged.is_file() {
            return Err(ReleaseError::file_system(
                format!("dpkg-deb did not produce {staged}"),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }

        let package = tree.finalize(&staged, release_dir)?;
        info!("created package {package}");
        Ok(package)
    }
}
