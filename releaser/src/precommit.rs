//! Pre-commit gate runner.
//!
//! A commit is accepted only if every gate passes. Gates run in a fixed
//! order from the project root; the first failure stops the run and is
//! reported as [`ReleaseError::GateFailed`].

pub mod gates;

use crate::config::ProjectConfig;
use crate::error::{ReleaseError, Result};
use crate::exec::CommandExecutor;
use crate::naming::ToolName;
use camino::{Utf8Path, Utf8PathBuf};
use log::info;

/// Inputs shared by every gate, resolved from `shipshape.toml`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecommitSettings {
    /// Directory holding `shipshape.toml`; every check runs from here.
    pub project_root: Utf8PathBuf,
    /// Name of the binary the workspace builds.
    pub tool: ToolName,
    /// Flag that makes the binary print its version.
    pub version_flag: String,
    /// Absolute changelog path.
    pub changelog: Utf8PathBuf,
    /// Absolute directory receiving per-package coverage reports.
    pub coverage_dir: Utf8PathBuf,
}

impl PrecommitSettings {
    /// Bind `config` to `project_root`.
    #[must_use]
    pub fn resolve(config: &ProjectConfig, project_root: &Utf8Path) -> Self {
        Self {
            project_root: project_root.to_owned(),
            tool: config.package.name.clone(),
            version_flag: config.package.version_flag.clone(),
            changelog: project_root.join(&config.package.changelog),
            coverage_dir: project_root.join(&config.precommit.coverage_dir),
        }
    }

    /// Path of the debug binary `cargo build` writes under `target_dir`.
    #[must_use]
    pub fn debug_binary_in(&self, target_dir: &Utf8Path) -> Utf8PathBuf {
        target_dir.join("debug").join(self.tool.as_str())
    }
}

/// What a gate sees while it runs.
#[derive(Clone, Copy)]
pub struct GateContext<'a> {
    /// Runs the external checkers.
    pub executor: &'a dyn CommandExecutor,
    /// Resolved settings.
    pub settings: &'a PrecommitSettings,
}

/// One pre-commit check.
pub trait Gate {
    /// Short kebab-case name used in logs and failures.
    fn name(&self) -> &str;

    /// Run the check.
    ///
    /// # Errors
    ///
    /// Returns the reason the commit must be rejected.
    fn check(&self, ctx: &GateContext<'_>) -> Result<()>;
}

/// Run `gates` in order, stopping at the first failure.
///
/// # Errors
///
/// Returns [`ReleaseError::GateFailed`] naming the first gate that failed.
pub fn run_gates(gates: &[Box<dyn Gate + '_>], ctx: &GateContext<'_>) -> Result<()> {
    for gate in gates {
        let name = gate.name();
        info!("gate {name}: running");
        gate.check(ctx).map_err(|source| ReleaseError::GateFailed {
            gate: name.to_owned(),
            source: Box::new(source),
        })?;
        info!("gate {name}: passed");
    }
    Ok(())
}

/// The standard gates, in the order they run.
///
/// 1. `format`
/// 2. `static-analysis`
/// 3. `lint`
/// 4. `unused-results`
/// 5. `complexity`
/// 6. `test-coverage`
/// 7. `build`
/// 8. `changelog`
#[must_use]
pub fn default_gates() -> Vec<Box<dyn Gate>> {
    vec![
        Box::new(gates::FormatGate),
        Box::new(gates::CargoGate::static_analysis()),
        Box::new(gates::CargoGate::lint()),
        Box::new(gates::CargoGate::unused_results()),
        Box::new(gates::CargoGate::complexity()),
        Box::new(gates::CoverageGate),
        Box::new(gates::CargoGate::build()),
        Box::new(gates::ChangelogGate),
    ]
}
