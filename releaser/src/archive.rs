//! Compressed archive packaging.
//!
//! Lays out `<tool>-<version>-<platform>/bin/<tool>` in a staging tree,
//! compresses the layout into `<tool>-<version>-<platform>.tar.gz`, and
//! moves the archive into the release directory. Nothing reaches the
//! release directory unless the archive was produced successfully.

use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, run_checked};
use crate::naming::{ArchiveName, ToolName};
use crate::staging::StagingTree;
use crate::version::VersionString;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::info;
use serde::Deserialize;
use std::fs;

/// Which archiver produces the `.tar.gz`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveBackend {
    /// Run the host `tar -czf` through the command executor.
    #[default]
    System,
    /// Build the archive in-process with `tar` and `flate2`.
    Builtin,
}

/// Produces the compressed archive artefact.
pub struct ArchivePackager<'a> {
    executor: &'a dyn CommandExecutor,
    backend: ArchiveBackend,
    platform: &'a str,
}

impl<'a> ArchivePackager<'a> {
    /// Create a packager for `platform` using `backend`.
    #[must_use]
    pub fn new(
        executor: &'a dyn CommandExecutor,
        backend: ArchiveBackend,
        platform: &'a str,
    ) -> Self {
        Self {
            executor,
            backend,
            platform,
        }
    }

    /// Package `binary` and move the archive into `release_dir`.
    ///
    /// Returns the archive's final path.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::FileSystem`] if the layout cannot be built or
    /// the archive cannot be moved, and [`ReleaseError::Execution`] if the
    /// system `tar` fails.
    pub fn package(
        &self,
        binary: &Utf8Path,
        tool: &ToolName,
        version: &VersionString,
        tree: &StagingTree,
        release_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf> {
        let name = ArchiveName::new(tool, version, self.platform);
        let layout = Utf8Path::new(name.layout_dir());
        tree.copy_into(binary, layout.join("bin").join(tool.as_str()))?;

        let filename = name.filename();
        match self.backend {
            ArchiveBackend::System => {
                run_checked(
                    self.executor,
                    "tar",
                    &["-czf", filename.as_str(), layout.as_str()],
                    Some(tree.path()),
                )?;
            }
            ArchiveBackend::Builtin => {
                write_tar_gz(
                    &tree.path().join(&filename),
                    layout,
                    &tree.path().join(layout),
                )?;
            }
        }

        let staged = tree.path().join(&filename);
        if !staged.is_file() {
            return Err(ReleaseError::file_system(
                format!("archiver did not produce {staged}"),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }

        let archive = tree.finalize(&staged, release_dir)?;
        info!("created archive {archive}");
        Ok(archive)
    }
}

/// Write `source_dir` into a gzip-compressed tarball at `output`, rooted at
/// `root_name`.
fn write_tar_gz(output: &Utf8Path, root_name: &Utf8Path, source_dir: &Utf8Path) -> Result<()> {
    let context = || format!("failed to write archive {output}");

    let file = fs::File::create(output).map_err(|e| ReleaseError::file_system(context(), e))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(root_name, source_dir)
        .map_err(|e| ReleaseError::file_system(context(), e))?;
    let encoder = builder
        .into_inner()
        .map_err(|e| ReleaseError::file_system(context(), e))?;
    encoder
        .finish()
        .map_err(|e| ReleaseError::file_system(context(), e))?;
    Ok(())
}
