//! CLI argument definitions for the release and pre-commit drivers.
//!
//! The definitions live in the library so that both binaries stay small and
//! the parsing rules can be unit tested.

use crate::config::CONFIG_FILE_NAME;
use camino::Utf8PathBuf;
use clap::{Args, Parser};
use log::LevelFilter;

/// Package a built tool into a versioned archive and Debian package.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "shipshape-release")]
#[command(version, about)]
#[command(long_about = concat!(
    "Package a built tool into a versioned archive and Debian package.\n\n",
    "The tool is built and installed with the configured build command, then ",
    "asked for its version. That version must match the first line of the ",
    "changelog exactly; otherwise nothing is packaged.\n\n",
    "Both artefacts are assembled in temporary staging directories and moved ",
    "into the release directory only once complete.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Release into ./dist:\n",
    "    $ shipshape-release --release-dir dist\n\n",
    "  Release with a JSON summary of the artefacts:\n",
    "    $ shipshape-release --release-dir dist --summary dist/summary.json\n",
))]
pub struct ReleaseCli {
    /// Directory receiving the finished artefacts (created if absent).
    #[arg(long, value_name = "DIR")]
    pub release_dir: Utf8PathBuf,

    /// Project configuration file; its directory is the project root.
    #[arg(long, value_name = "FILE", default_value = CONFIG_FILE_NAME)]
    pub config: Utf8PathBuf,

    /// Write a JSON summary of the release to this file.
    #[arg(long, value_name = "FILE")]
    pub summary: Option<Utf8PathBuf>,

    /// Logging options.
    #[command(flatten)]
    pub log: LogArgs,
}

/// Run the pre-commit quality gates.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "shipshape-precommit")]
#[command(version, about)]
#[command(long_about = concat!(
    "Run the pre-commit quality gates.\n\n",
    "Gates run in order: format, static-analysis, lint, unused-results, ",
    "complexity, test-coverage, build, changelog. The first failing gate ",
    "stops the run.",
))]
pub struct PrecommitCli {
    /// Project configuration file; its directory is the project root.
    #[arg(long, value_name = "FILE", default_value = CONFIG_FILE_NAME)]
    pub config: Utf8PathBuf,

    /// Logging options.
    #[command(flatten)]
    pub log: LogArgs,
}

/// Verbosity flags shared by both drivers.
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogArgs {
    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl LogArgs {
    /// Log level selected by the flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use log::LevelFilter;
    /// use shipshape::cli::LogArgs;
    ///
    /// assert_eq!(LogArgs::default().level_filter(), LevelFilter::Info);
    /// let quiet = LogArgs { verbosity: 0, quiet: true };
    /// assert_eq!(quiet.level_filter(), LevelFilter::Error);
    /// ```
    #[must_use]
    pub fn level_filter(self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Install the stderr logger at the selected level.
    ///
    /// Directives in `RUST_LOG` are applied on top of the selected level.
    /// Calling this more than once keeps the first logger.
    pub fn init_logging(self) {
        let installed = env_logger::Builder::new()
            .filter_level(self.level_filter())
            .parse_default_env()
            .format_timestamp(None)
            .try_init();
        if installed.is_err() {
            log::debug!("logger already installed");
        }
    }
}
