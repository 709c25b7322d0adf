//! Pre-commit driver entrypoint.
//!
//! Runs the standard quality gates from the project root and exits non-zero
//! at the first failure.

use clap::Parser;
use shipshape::cli::PrecommitCli;
use shipshape::config::{ProjectConfig, project_root_of};
use shipshape::error::Result;
use shipshape::exec::{CommandExecutor, SystemCommandExecutor};
use shipshape::precommit::{GateContext, PrecommitSettings, default_gates, run_gates};

fn main() {
    let cli = PrecommitCli::parse();
    cli.log.init_logging();
    if let Err(err) = run(&cli, &SystemCommandExecutor) {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn run(cli: &PrecommitCli, executor: &dyn CommandExecutor) -> Result<()> {
    let config = ProjectConfig::load(&cli.config)?;
    let settings = PrecommitSettings::resolve(&config, &project_root_of(&cli.config));
    let ctx = GateContext {
        executor,
        settings: &settings,
    };
    run_gates(&default_gates(), &ctx)
}
