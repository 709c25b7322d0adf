//! Ephemeral staging directories for package assembly.
//!
//! Each packaging stage lays out its files in a [`StagingTree`]: a uniquely
//! named directory owned by exactly one stage and removed when the stage
//! ends, whether it succeeded or failed. Finished artefacts leave the tree
//! through [`StagingTree::finalize`], which moves them into the release
//! directory without ever exposing a partially written file under the final
//! name.

use crate::error::{ReleaseError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fs;
use tempfile::{Builder, NamedTempFile, TempDir};

/// Prefix shared by every staging directory.
pub const STAGING_PREFIX: &str = "shipshape";

/// Factory for staging trees under a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingArea {
    base: Option<Utf8PathBuf>,
}

impl StagingArea {
    /// Stage under the system temporary directory.
    #[must_use]
    pub fn system() -> Self {
        Self { base: None }
    }

    /// Stage under `base`, which must already exist.
    #[must_use]
    pub fn under(base: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    /// Create a fresh tree named `shipshape-<label>-<random>`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::FileSystem`] if the directory cannot be
    /// created or its path is not valid UTF-8.
    pub fn acquire(&self, label: &str) -> Result<StagingTree> {
        let prefix = format!("{STAGING_PREFIX}-{label}-");
        let mut builder = Builder::new();
        builder.prefix(&prefix);
        let dir = match &self.base {
            Some(base) => builder.tempdir_in(base),
            None => builder.tempdir(),
        }
        .map_err(|e| {
            ReleaseError::file_system(format!("failed to create {prefix}* staging directory"), e)
        })?;

        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).map_err(|e| {
            ReleaseError::file_system("staging directory path is not valid UTF-8", e.into_io_error())
        })?;
        debug!("acquired staging tree {path}");
        Ok(StagingTree { dir, path })
    }

    /// Run `body` inside a fresh tree and remove the tree afterwards.
    ///
    /// The tree is removed on every exit path. A removal failure after a
    /// successful body is logged and does not fail the call.
    ///
    /// # Errors
    ///
    /// Returns any error from [`StagingArea::acquire`] or from `body`.
    pub fn scoped<T>(
        &self,
        label: &str,
        body: impl FnOnce(&StagingTree) -> Result<T>,
    ) -> Result<T> {
        let tree = self.acquire(label)?;
        let outcome = body(&tree);
        tree.release();
        outcome
    }
}

impl Default for StagingArea {
    fn default() -> Self {
        Self::system()
    }
}

/// An exclusively owned staging directory, removed on drop.
#[derive(Debug)]
pub struct StagingTree {
    dir: TempDir,
    path: Utf8PathBuf,
}

impl StagingTree {
    /// Root of the tree.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Create `relative` (and its parents) inside the tree.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::FileSystem`] if the directory cannot be created.
    pub fn create_dir(&self, relative: impl AsRef<Utf8Path>) -> Result<Utf8PathBuf> {
        let dir = self.path.join(relative);
        fs::create_dir_all(&dir)
            .map_err(|e| ReleaseError::file_system(format!("failed to create {dir}"), e))?;
        Ok(dir)
    }

    /// Copy `source` to `relative` inside the tree, creating parent
    /// directories. Permission bits are preserved.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::FileSystem`] if the copy fails.
    pub fn copy_into(
        &self,
        source: &Utf8Path,
        relative: impl AsRef<Utf8Path>,
    ) -> Result<Utf8PathBuf> {
        let target = self.path.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ReleaseError::file_system(format!("failed to create {parent}"), e))?;
        }
        fs::copy(source, &target).map_err(|e| {
            ReleaseError::file_system(format!("failed to copy {source} to {target}"), e)
        })?;
        Ok(target)
    }

    /// Move `staged_file` into `dest_dir`, keeping its file name.
    ///
    /// A rename is tried first. When that fails (for instance across
    /// filesystems) the file is copied into a temporary file inside
    /// `dest_dir` and atomically persisted under its final name. An existing
    /// file of the same name is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::FileSystem`] if the file has no name or
    /// cannot be moved.
    pub fn finalize(&self, staged_file: &Utf8Path, dest_dir: &Utf8Path) -> Result<Utf8PathBuf> {
        let name = staged_file.file_name().ok_or_else(|| {
            ReleaseError::file_system(
                format!("cannot finalize {staged_file}"),
                std::io::Error::other("path has no file name"),
            )
        })?;
        let destination = dest_dir.join(name);

        if fs::rename(staged_file, &destination).is_ok() {
            debug!("moved {staged_file} to {destination}");
            return Ok(destination);
        }

        copy_then_persist(staged_file, dest_dir, &destination)?;
        debug!("copied {staged_file} to {destination}");
        Ok(destination)
    }

    fn release(self) {
        let path = self.path;
        if let Err(e) = self.dir.close() {
            warn!("failed to remove staging tree {path}: {e}");
        } else {
            debug!("removed staging tree {path}");
        }
    }
}

fn copy_then_persist(
    source: &Utf8Path,
    dest_dir: &Utf8Path,
    destination: &Utf8Path,
) -> Result<()> {
    let context = || format!("failed to move {source} to {destination}");

    let mut reader =
        fs::File::open(source).map_err(|e| ReleaseError::file_system(context(), e))?;
    let permissions = reader
        .metadata()
        .map_err(|e| ReleaseError::file_system(context(), e))?
        .permissions();
    let mut temp =
        NamedTempFile::new_in(dest_dir).map_err(|e| ReleaseError::file_system(context(), e))?;
    std::io::copy(&mut reader, &mut temp).map_err(|e| ReleaseError::file_system(context(), e))?;
    // Temporary files start out owner-only; the artefact keeps the staged mode.
    temp.as_file()
        .set_permissions(permissions)
        .map_err(|e| ReleaseError::file_system(context(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| ReleaseError::file_system(context(), e))?;
    temp.persist(destination)
        .map_err(|e| ReleaseError::file_system(context(), e.error))?;
    Ok(())
}
