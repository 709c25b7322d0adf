//! Error types for the release and pre-commit drivers.
//!
//! Every failure aborts the run. Variants carry the context an operator needs
//! to act on the failure (command line, paths, expected and found values), and
//! [`ReleaseError::exit_code`] maps a failure onto the process exit status.

use crate::pipeline::Stage;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while gating a commit or producing a release.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// An external tool exited unsuccessfully.
    #[error("{program} {} failed{}: {stderr}", .args.join(" "), exit_suffix(.code))]
    Execution {
        /// Program that was invoked.
        program: String,
        /// Arguments passed to the program.
        args: Vec<String>,
        /// Exit code, when the process exited normally.
        code: Option<i32>,
        /// Trimmed standard error captured from the process.
        stderr: String,
    },

    /// The binary's version output could not be used as a version string.
    #[error("malformed version reported by {binary}: {reason}")]
    MalformedVersion {
        /// Binary that was asked for its version.
        binary: Utf8PathBuf,
        /// Why the output was rejected.
        reason: String,
    },

    /// The changelog has no lines at all.
    #[error("changelog {path} is empty; expected the current version on its first line")]
    EmptyChangelog {
        /// Path to the changelog document.
        path: Utf8PathBuf,
    },

    /// The first changelog line does not match the binary's version.
    #[error("changelog {path} is out of date: expected first line {expected:?}, found {found:?}")]
    VersionMismatch {
        /// Version reported by the binary.
        expected: String,
        /// First line of the changelog.
        found: String,
        /// Path to the changelog document.
        path: Utf8PathBuf,
    },

    /// Required configuration or environment is missing or invalid.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Description of the missing or invalid setting.
        reason: String,
    },

    /// The formatter reported files that are not formatted.
    #[error("code is not formatted (run `cargo fmt --all`): {}", .files.join(", "))]
    FormattingViolation {
        /// Files reported by the formatter.
        files: Vec<String>,
    },

    /// A filesystem operation failed on a known path.
    #[error("{context}: {source}")]
    FileSystem {
        /// What was being attempted, including the path.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A release stage failed; later stages were not attempted.
    #[error("release stage {stage} failed: {source}")]
    StageFailed {
        /// The stage that failed.
        stage: Stage,
        /// The failure reported by the stage.
        #[source]
        source: Box<ReleaseError>,
    },

    /// A pre-commit gate failed; later gates were not attempted.
    #[error("pre-commit gate {gate} failed: {source}")]
    GateFailed {
        /// Name of the gate that failed.
        gate: String,
        /// The failure reported by the gate.
        #[source]
        source: Box<ReleaseError>,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl ReleaseError {
    /// Build a [`ReleaseError::FileSystem`] error from a context message.
    #[must_use]
    pub fn file_system(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileSystem {
            context: context.into(),
            source,
        }
    }

    /// Build a [`ReleaseError::Configuration`] error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Return the process exit code that reports this failure.
    ///
    /// A failing external tool propagates its own exit code. Everything else,
    /// formatting violations included, exits with 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Execution {
                code: Some(code), ..
            } if *code != 0 => *code,
            Self::StageFailed { source, .. } | Self::GateFailed { source, .. } => {
                source.exit_code()
            }
            _ => 1,
        }
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map_or_else(
        || " (terminated by signal)".to_owned(),
        |code| format!(" with exit code {code}"),
    )
}

/// Result type alias using [`ReleaseError`].
pub type Result<T> = std::result::Result<T, ReleaseError>;
