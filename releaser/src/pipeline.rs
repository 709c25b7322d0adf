//! Release orchestration.
//!
//! A release runs five stages in a fixed order:
//!
//! 1. [`Stage::Build`] builds and installs the binary;
//! 2. [`Stage::ExtractVersion`] asks the binary for its version;
//! 3. [`Stage::VerifyChangelog`] checks the changelog announces it;
//! 4. [`Stage::PackageArchive`] produces the `.tar.gz`;
//! 5. [`Stage::PackageNative`] produces the `.deb`.
//!
//! Each stage runs only if the previous one succeeded. The first failure is
//! wrapped in [`ReleaseError::StageFailed`] and halts the run; artefacts
//! already moved into the release directory are left in place.

use crate::archive::ArchivePackager;
use crate::changelog::verify_changelog;
use crate::config::ReleaseSettings;
use crate::digest::sha256_file;
use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, run_checked};
use crate::native::{NativePackager, PackageMetadata};
use crate::staging::StagingArea;
use crate::version::{VersionString, extract_version};
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use serde::Serialize;
use std::fmt;
use std::fs;

/// One step of the release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Build and install the binary.
    Build,
    /// Capture the binary's version output.
    ExtractVersion,
    /// Check the changelog's first line against the version.
    VerifyChangelog,
    /// Produce the compressed archive.
    PackageArchive,
    /// Produce the Debian package.
    PackageNative,
}

impl Stage {
    /// Kebab-case stage name used in logs and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::ExtractVersion => "extract-version",
            Self::VerifyChangelog => "verify-changelog",
            Self::PackageArchive => "package-archive",
            Self::PackageNative => "package-native",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a release should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    output_dir: Utf8PathBuf,
}

impl ReleaseRequest {
    /// Create a request for `output_dir`, creating the directory if absent.
    ///
    /// The directory is never removed by the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Configuration`] if the directory cannot be
    /// created.
    pub fn new(output_dir: impl Into<Utf8PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| {
            ReleaseError::configuration(format!(
                "cannot create release directory {output_dir}: {e}"
            ))
        })?;
        Ok(Self { output_dir })
    }

    /// The release directory.
    #[must_use]
    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }
}

/// Kind of a produced artefact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtefactKind {
    /// Gzip-compressed tar archive.
    Archive,
    /// Debian package.
    Native,
}

/// A finished artefact in the release directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtefactRecord {
    /// Artefact format.
    pub kind: ArtefactKind,
    /// File name within the release directory.
    pub file_name: String,
    /// Full path of the artefact.
    pub path: Utf8PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Lowercase hex SHA-256 digest.
    pub sha256: String,
}

impl ArtefactRecord {
    /// Describe the artefact at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::FileSystem`] if the file cannot be read.
    pub fn describe(kind: ArtefactKind, path: &Utf8Path) -> Result<Self> {
        let metadata = fs::metadata(path)
            .map_err(|e| ReleaseError::file_system(format!("failed to inspect {path}"), e))?;
        Ok(Self {
            kind,
            file_name: path.file_name().unwrap_or(path.as_str()).to_owned(),
            path: path.to_owned(),
            size: metadata.len(),
            sha256: sha256_file(path)?,
        })
    }
}

/// Outcome of a successful release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReleaseReport {
    /// The release directory.
    pub output_dir: Utf8PathBuf,
    /// Version stamped into every artefact.
    pub version: VersionString,
    /// Produced artefacts, in production order.
    pub artefacts: Vec<ArtefactRecord>,
}

impl ReleaseReport {
    /// Render the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Io`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ReleaseError::Io(e.into()))
    }

    /// Write the JSON report to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::FileSystem`] if the file cannot be written.
    pub fn write_json(&self, path: &Utf8Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json)
            .map_err(|e| ReleaseError::file_system(format!("failed to write summary {path}"), e))
    }
}

/// Runs the release stages against resolved settings.
pub struct ReleasePipeline<'a> {
    executor: &'a dyn CommandExecutor,
    settings: &'a ReleaseSettings,
    staging: StagingArea,
}

impl<'a> ReleasePipeline<'a> {
    /// Create a pipeline staging under the system temporary directory.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, settings: &'a ReleaseSettings) -> Self {
        Self {
            executor,
            settings,
            staging: StagingArea::system(),
        }
    }

    /// Stage packages under `staging` instead.
    #[must_use]
    pub fn with_staging(mut self, staging: StagingArea) -> Self {
        self.staging = staging;
        self
    }

    /// Run every stage in order and describe the produced artefacts.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::StageFailed`] naming the first stage that
    /// failed, wrapping that stage's error.
    pub fn run(&self, request: &ReleaseRequest) -> Result<ReleaseReport> {
        let settings = self.settings;
        let output_dir = request.output_dir();

        run_stage(Stage::Build, || self.build())?;
        let version = run_stage(Stage::ExtractVersion, || {
            extract_version(self.executor, &settings.binary_path, &settings.version_flag)
        })?;
        run_stage(Stage::VerifyChangelog, || {
            verify_changelog(&settings.changelog, &version)
        })?;
        let archive = run_stage(Stage::PackageArchive, || {
            self.package_archive(&version, output_dir)
        })?;
        let native = run_stage(Stage::PackageNative, || {
            self.package_native(&version, output_dir)
        })?;

        Ok(ReleaseReport {
            output_dir: output_dir.to_owned(),
            version,
            artefacts: vec![archive, native],
        })
    }

    fn build(&self) -> Result<()> {
        let Some((program, rest)) = self.settings.build_command.split_first() else {
            return Err(ReleaseError::configuration(
                "build.command must name a program",
            ));
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        run_checked(
            self.executor,
            program,
            &args,
            Some(self.settings.project_root.as_path()),
        )?;
        Ok(())
    }

    fn package_archive(
        &self,
        version: &VersionString,
        output_dir: &Utf8Path,
    ) -> Result<ArtefactRecord> {
        let settings = self.settings;
        let packager = ArchivePackager::new(
            self.executor,
            settings.archive_backend,
            &settings.platform,
        );
        let path = self.staging.scoped("archive", |tree| {
            packager.package(
                &settings.binary_path,
                &settings.tool,
                version,
                tree,
                output_dir,
            )
        })?;
        ArtefactRecord::describe(ArtefactKind::Archive, &path)
    }

    fn package_native(
        &self,
        version: &VersionString,
        output_dir: &Utf8Path,
    ) -> Result<ArtefactRecord> {
        let settings = self.settings;
        let metadata = PackageMetadata {
            tool: settings.tool.clone(),
            maintainer: settings.maintainer.clone(),
            description: settings.description.clone(),
            arch: settings.arch.clone(),
        };
        let packager = NativePackager::new(self.executor, &metadata);
        let path = self.staging.scoped("native", |tree| {
            packager.package(&settings.binary_path, version, tree, output_dir)
        })?;
        ArtefactRecord::describe(ArtefactKind::Native, &path)
    }
}

fn run_stage<T>(stage: Stage, body: impl FnOnce() -> Result<T>) -> Result<T> {
    info!("stage {stage}: started");
    match body() {
        Ok(value) => {
            info!("stage {stage}: done");
            Ok(value)
        }
        Err(source) => Err(ReleaseError::StageFailed {
            stage,
            source: Box::new(source),
        }),
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
