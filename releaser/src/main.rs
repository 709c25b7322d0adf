//! Release driver entrypoint.
//!
//! Builds the configured tool, checks its version against the changelog,
//! and writes a `.tar.gz` archive and a Debian package into the release
//! directory. Prints `Released to: <dir>` on success.

use clap::Parser;
use shipshape::cli::ReleaseCli;
use shipshape::config::{EnvSource, ProcessEnv, ProjectConfig, ReleaseSettings, project_root_of};
use shipshape::error::Result;
use shipshape::exec::{CommandExecutor, SystemCommandExecutor};
use shipshape::pipeline::{ReleasePipeline, ReleaseReport, ReleaseRequest};
use shipshape::staging::StagingArea;
use std::io::Write;

fn main() {
    let cli = ReleaseCli::parse();
    cli.log.init_logging();
    let result = run(&cli, &SystemCommandExecutor, &ProcessEnv, StagingArea::system());
    let exit_code =
        exit_code_for_run_result(result, &mut std::io::stdout(), &mut std::io::stderr());
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(
    cli: &ReleaseCli,
    executor: &dyn CommandExecutor,
    env: &dyn EnvSource,
    staging: StagingArea,
) -> Result<ReleaseReport> {
    let config = ProjectConfig::load(&cli.config)?;
    let project_root = project_root_of(&cli.config);
    let settings = ReleaseSettings::resolve(&config, &project_root, env)?;
    let request = ReleaseRequest::new(cli.release_dir.clone())?;

    let report = ReleasePipeline::new(executor, &settings)
        .with_staging(staging)
        .run(&request)?;

    if let Some(summary) = &cli.summary {
        report.write_json(summary)?;
    }
    Ok(report)
}

fn exit_code_for_run_result(
    result: Result<ReleaseReport>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    match result {
        Ok(report) => {
            write_line(stdout, format_args!("Released to: {}", report.output_dir));
            0
        }
        Err(err) => {
            write_line(stderr, format_args!("error: {err}"));
            err.exit_code()
        }
    }
}

fn write_line(out: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(out, "{message}").is_err() {
        // Best-effort reporting; ignore write failures.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use shipshape::error::ReleaseError;
    use shipshape::test_utils::{FakeToolchain, FixedEnv, ReleaseSandbox};

    #[fixture]
    fn sandbox() -> ReleaseSandbox {
        ReleaseSandbox::new("toolname", "v2.0.1\n").expect("sandbox")
    }

    fn cli_for(sandbox: &ReleaseSandbox, summary: Option<Utf8PathBuf>) -> ReleaseCli {
        let config = sandbox
            .write_config("\n[archive]\nbackend = \"builtin\"\n")
            .expect("write config");
        ReleaseCli {
            release_dir: sandbox.release_dir(),
            config,
            summary,
            log: shipshape::cli::LogArgs::default(),
        }
    }

    fn env_for(sandbox: &ReleaseSandbox) -> FixedEnv {
        FixedEnv::default().with("CARGO_HOME", sandbox.install_root().as_str())
    }

    #[rstest]
    fn successful_release_prints_release_dir(sandbox: ReleaseSandbox) {
        let cli = cli_for(&sandbox, None);
        let toolchain = FakeToolchain::new("toolname", "v2.0.1");

        let result = run(&cli, &toolchain, &env_for(&sandbox), sandbox.staging_area());
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = exit_code_for_run_result(result, &mut stdout, &mut stderr);

        assert_eq!(code, 0);
        let stdout = String::from_utf8(stdout).expect("utf-8 stdout");
        assert_eq!(stdout, format!("Released to: {}\n", sandbox.release_dir()));
        assert!(stderr.is_empty());
        assert_eq!(sandbox.release_entries().len(), 2);
    }

    #[rstest]
    fn summary_is_written_when_requested(sandbox: ReleaseSandbox) {
        let summary = sandbox.project_root().join("summary.json");
        let cli = cli_for(&sandbox, Some(summary.clone()));
        let toolchain = FakeToolchain::new("toolname", "v2.0.1");

        run(&cli, &toolchain, &env_for(&sandbox), sandbox.staging_area())
            .expect("release succeeds");

        let json = std::fs::read_to_string(summary).expect("summary exists");
        assert!(json.contains("toolname_v2.0.1_amd64.deb"));
    }

    #[rstest]
    fn failing_tool_sets_exit_code_and_prints_nothing_to_stdout(sandbox: ReleaseSandbox) {
        let cli = cli_for(&sandbox, None);
        let toolchain = FakeToolchain::new("toolname", "v2.0.1").failing("dpkg-deb");

        let result = run(&cli, &toolchain, &env_for(&sandbox), sandbox.staging_area());
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = exit_code_for_run_result(result, &mut stdout, &mut stderr);

        assert_eq!(code, 2);
        assert!(stdout.is_empty());
        let stderr = String::from_utf8(stderr).expect("utf-8 stderr");
        assert!(stderr.starts_with("error: release stage package-native failed"));
    }

    #[rstest]
    fn missing_install_root_is_a_configuration_error(sandbox: ReleaseSandbox) {
        let cli = cli_for(&sandbox, None);
        let toolchain = FakeToolchain::new("toolname", "v2.0.1");

        let err = run(&cli, &toolchain, &FixedEnv::default(), sandbox.staging_area())
            .expect_err("unset CARGO_HOME");

        assert!(matches!(err, ReleaseError::Configuration { .. }));
        assert!(toolchain.calls().is_empty());
        assert!(sandbox.release_entries().is_empty());
    }

    #[rstest]
    fn missing_config_exits_with_one(sandbox: ReleaseSandbox) {
        let cli = ReleaseCli {
            release_dir: sandbox.release_dir(),
            config: sandbox.project_root().join("absent.toml"),
            summary: None,
            log: shipshape::cli::LogArgs::default(),
        };
        let toolchain = FakeToolchain::new("toolname", "v2.0.1");

        let result = run(&cli, &toolchain, &env_for(&sandbox), sandbox.staging_area());
        let mut stderr = Vec::new();
        let code = exit_code_for_run_result(result, &mut Vec::new(), &mut stderr);

        assert_eq!(code, 1);
        assert!(String::from_utf8_lossy(&stderr).contains("absent.toml"));
    }
}
