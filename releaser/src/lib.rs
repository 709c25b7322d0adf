//! Shipshape library.
//!
//! This crate gates commits and packages releases for a compiled
//! command-line tool. The release driver builds the tool, treats the
//! binary's own version output as the single source of truth, checks it
//! against the changelog, and produces a `.tar.gz` archive and a Debian
//! package named after that version. The pre-commit driver runs an ordered
//! list of quality gates and rejects the commit at the first failure.
//!
//! # Modules
//!
//! - [`archive`] - Compressed archive packaging
//! - [`changelog`] - Changelog verification against the binary's version
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - `shipshape.toml` loading and environment resolution
//! - [`digest`] - SHA-256 digests of finished artefacts
//! - [`error`] - Error taxonomy and exit-code mapping
//! - [`exec`] - External command execution
//! - [`naming`] - Tool and artefact naming conventions
//! - [`native`] - Debian package assembly
//! - [`pipeline`] - Release orchestration
//! - [`precommit`] - Pre-commit gate runner and standard gates
//! - [`staging`] - Ephemeral staging directories
//! - [`version`] - Version extraction from the built binary

pub mod archive;
pub mod changelog;
pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod exec;
pub mod naming;
pub mod native;
pub mod pipeline;
pub mod precommit;
pub mod staging;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
