//! The standard pre-commit gates.

use super::{Gate, GateContext};
use crate::changelog::verify_changelog;
use crate::error::{ReleaseError, Result};
use crate::exec::{command_line, run_checked};
use crate::version::extract_version;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use serde::Deserialize;
use std::fs;

/// Rejects unformatted sources.
///
/// Runs `cargo fmt --all -- --check -l`; any file the formatter lists is a
/// [`ReleaseError::FormattingViolation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatGate;

const FMT_ARGS: &[&str] = &["fmt", "--all", "--", "--check", "-l"];

impl Gate for FormatGate {
    fn name(&self) -> &str {
        "format"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<()> {
        let root = ctx.settings.project_root.as_path();
        debug!("running `{}` in {root}", command_line("cargo", FMT_ARGS));
        let output = ctx.executor.run("cargo", FMT_ARGS, Some(root))?;

        let files: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        if !files.is_empty() {
            return Err(ReleaseError::FormattingViolation { files });
        }
        if !output.status.success() {
            return Err(ReleaseError::Execution {
                program: "cargo".to_owned(),
                args: FMT_ARGS.iter().map(|&arg| arg.to_owned()).collect(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(())
    }
}

/// A gate that passes when one `cargo` invocation succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CargoGate {
    name: &'static str,
    args: &'static [&'static str],
}

impl CargoGate {
    /// `cargo check` over every target.
    #[must_use]
    pub const fn static_analysis() -> Self {
        Self {
            name: "static-analysis",
            args: &["check", "--workspace", "--all-targets"],
        }
    }

    /// Clippy with warnings denied.
    #[must_use]
    pub const fn lint() -> Self {
        Self {
            name: "lint",
            args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        }
    }

    /// Clippy denying silently discarded results.
    #[must_use]
    pub const fn unused_results() -> Self {
        Self {
            name: "unused-results",
            args: &[
                "clippy",
                "--workspace",
                "--all-targets",
                "--",
                "-D",
                "unused_must_use",
                "-D",
                "clippy::let_underscore_must_use",
            ],
        }
    }

    /// Clippy's cognitive complexity check over non-test code.
    ///
    /// The threshold comes from the workspace `clippy.toml`.
    #[must_use]
    pub const fn complexity() -> Self {
        Self {
            name: "complexity",
            args: &[
                "clippy",
                "--workspace",
                "--lib",
                "--bins",
                "--",
                "-D",
                "clippy::cognitive_complexity",
            ],
        }
    }

    /// `cargo build` of the whole workspace.
    #[must_use]
    pub const fn build() -> Self {
        Self {
            name: "build",
            args: &["build", "--workspace"],
        }
    }

    /// Arguments passed to `cargo`.
    #[must_use]
    pub const fn args(&self) -> &'static [&'static str] {
        self.args
    }
}

impl Gate for CargoGate {
    fn name(&self) -> &str {
        self.name
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<()> {
        run_checked(
            ctx.executor,
            "cargo",
            self.args,
            Some(ctx.settings.project_root.as_path()),
        )?;
        Ok(())
    }
}

/// Runs every workspace package's tests under coverage instrumentation.
///
/// Packages whose manifest lives under a `vendor` directory are skipped.
/// Each package writes `<coverage_dir>/<package>.lcov`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageGate;

#[derive(Debug, Deserialize)]
struct WorkspaceMetadata {
    packages: Vec<MetadataPackage>,
    workspace_root: Utf8PathBuf,
}

#[derive(Debug, Deserialize)]
struct MetadataPackage {
    name: String,
    manifest_path: Utf8PathBuf,
}

#[derive(Debug, Deserialize)]
struct TargetMetadata {
    target_directory: Utf8PathBuf,
}

const METADATA_ARGS: &[&str] = &["metadata", "--format-version", "1", "--no-deps"];

fn cargo_metadata(ctx: &GateContext<'_>) -> Result<Vec<u8>> {
    let output = run_checked(
        ctx.executor,
        "cargo",
        METADATA_ARGS,
        Some(ctx.settings.project_root.as_path()),
    )?;
    Ok(output.stdout)
}

fn parse_metadata<'de, T: Deserialize<'de>>(metadata: &'de [u8]) -> Result<T> {
    serde_json::from_slice(metadata).map_err(|e| {
        ReleaseError::configuration(format!("cannot parse `cargo metadata` output: {e}"))
    })
}

/// List the names of workspace packages, excluding vendored ones.
///
/// `metadata` is the JSON printed by `cargo metadata --format-version 1`.
///
/// # Errors
///
/// Returns [`ReleaseError::Configuration`] if the JSON cannot be parsed.
pub fn workspace_packages(metadata: &[u8]) -> Result<Vec<String>> {
    let metadata: WorkspaceMetadata = parse_metadata(metadata)?;
    let root = metadata.workspace_root;

    Ok(metadata
        .packages
        .into_iter()
        .filter(|package| {
            let vendored = is_vendored(&package.manifest_path, &root);
            if vendored {
                debug!("skipping vendored package {}", package.name);
            }
            !vendored
        })
        .map(|package| package.name)
        .collect())
}

/// Read the build output directory from `cargo metadata` JSON.
///
/// This honours `CARGO_TARGET_DIR` and workspace layouts where the project
/// root is a member crate.
///
/// # Errors
///
/// Returns [`ReleaseError::Configuration`] if the JSON cannot be parsed or
/// has no `target_directory`.
pub fn target_directory(metadata: &[u8]) -> Result<Utf8PathBuf> {
    let metadata: TargetMetadata = parse_metadata(metadata)?;
    Ok(metadata.target_directory)
}

fn is_vendored(manifest_path: &Utf8Path, workspace_root: &Utf8Path) -> bool {
    manifest_path
        .strip_prefix(workspace_root)
        .unwrap_or(manifest_path)
        .components()
        .any(|component| component.as_str() == "vendor")
}

impl Gate for CoverageGate {
    fn name(&self) -> &str {
        "test-coverage"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<()> {
        let settings = ctx.settings;
        let root = Some(settings.project_root.as_path());
        let packages = workspace_packages(&cargo_metadata(ctx)?)?;

        fs::create_dir_all(&settings.coverage_dir).map_err(|e| {
            ReleaseError::file_system(format!("failed to create {}", settings.coverage_dir), e)
        })?;

        for package in &packages {
            let report = settings.coverage_dir.join(format!("{package}.lcov"));
            run_checked(
                ctx.executor,
                "cargo",
                &[
                    "llvm-cov",
                    "--package",
                    package.as_str(),
                    "--lcov",
                    "--output-path",
                    report.as_str(),
                ],
                root,
            )?;
            info!("coverage for {package} written to {report}");
        }
        Ok(())
    }
}

/// Checks that the freshly built debug binary matches the changelog.
///
/// The binary is looked up under the target directory reported by
/// `cargo metadata`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangelogGate;

impl Gate for ChangelogGate {
    fn name(&self) -> &str {
        "changelog"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<()> {
        let settings = ctx.settings;
        let target_dir = target_directory(&cargo_metadata(ctx)?)?;
        let version = extract_version(
            ctx.executor,
            &settings.debug_binary_in(&target_dir),
            &settings.version_flag,
        )?;
        verify_changelog(&settings.changelog, &version)?;
        Ok(())
    }
}
