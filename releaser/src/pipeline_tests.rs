//! Tests for release orchestration.

use super::*;
use crate::archive::ArchiveBackend;
use crate::test_utils::{FakeToolchain, ReleaseSandbox, program_name};
use rstest::{fixture, rstest};

#[fixture]
fn sandbox() -> ReleaseSandbox {
    ReleaseSandbox::new("toolname", "v2.0.1\n* first release\n").expect("sandbox")
}

fn run(
    sandbox: &ReleaseSandbox,
    toolchain: &FakeToolchain,
    backend: ArchiveBackend,
) -> Result<ReleaseReport> {
    let settings = sandbox.settings(backend);
    let request = ReleaseRequest::new(sandbox.release_dir())?;
    ReleasePipeline::new(toolchain, &settings)
        .with_staging(sandbox.staging_area())
        .run(&request)
}

fn failed_stage(err: &ReleaseError) -> Stage {
    match err {
        ReleaseError::StageFailed { stage, .. } => *stage,
        other => panic!("expected a stage failure, got {other:?}"),
    }
}

#[rstest]
fn release_produces_both_artefacts(sandbox: ReleaseSandbox) {
    let toolchain = FakeToolchain::new("toolname", "v2.0.1");

    let report = run(&sandbox, &toolchain, ArchiveBackend::System).expect("release succeeds");

    assert_eq!(
        sandbox.release_entries(),
        vec![
            "toolname-v2.0.1-linux-x64.tar.gz".to_owned(),
            "toolname_v2.0.1_amd64.deb".to_owned(),
        ]
    );
    assert!(sandbox.staging_leftovers().is_empty());
    assert_eq!(report.version.as_str(), "v2.0.1");
    assert_eq!(report.output_dir, sandbox.release_dir());
    let kinds: Vec<ArtefactKind> = report.artefacts.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![ArtefactKind::Archive, ArtefactKind::Native]);
}

#[rstest]
fn stages_invoke_tools_in_order(sandbox: ReleaseSandbox) {
    let toolchain = FakeToolchain::new("toolname", "v2.0.1");

    run(&sandbox, &toolchain, ArchiveBackend::System).expect("release succeeds");

    assert_eq!(
        toolchain.programs(),
        vec!["cargo", "toolname", "tar", "dpkg-deb"]
    );
    let calls = toolchain.calls();
    let build = calls.first().expect("build call");
    assert_eq!(build.args, vec!["install", "--path", "."]);
    assert_eq!(build.cwd.as_deref(), Some(sandbox.project_root().as_path()));
    let version = calls.get(1).expect("version call");
    assert_eq!(version.cmd, sandbox.binary_path().as_str());
    assert_eq!(version.args, vec!["--version"]);
}

#[rstest]
fn changelog_mismatch_stops_before_packaging(sandbox: ReleaseSandbox) {
    sandbox
        .write_changelog("v2.0.0\n* previous release\n")
        .expect("rewrite changelog");
    let toolchain = FakeToolchain::new("toolname", "v2.0.1");

    let err = run(&sandbox, &toolchain, ArchiveBackend::System).expect_err("mismatch aborts");

    assert_eq!(failed_stage(&err), Stage::VerifyChangelog);
    let message = err.to_string();
    assert!(message.contains("v2.0.1") && message.contains("v2.0.0"), "{message}");
    assert!(sandbox.release_entries().is_empty());
    assert!(!toolchain.programs().iter().any(|p| p == "tar" || p == "dpkg-deb"));
}

#[rstest]
fn build_failure_stops_everything(sandbox: ReleaseSandbox) {
    let toolchain = FakeToolchain::new("toolname", "v2.0.1").failing("cargo");

    let err = run(&sandbox, &toolchain, ArchiveBackend::System).expect_err("build aborts");

    assert_eq!(failed_stage(&err), Stage::Build);
    assert_eq!(err.exit_code(), 2);
    assert_eq!(toolchain.programs(), vec!["cargo"]);
}

#[rstest]
fn tar_failure_leaves_no_artefacts(sandbox: ReleaseSandbox) {
    let toolchain = FakeToolchain::new("toolname", "v2.0.1").failing("tar");

    let err = run(&sandbox, &toolchain, ArchiveBackend::System).expect_err("tar aborts");

    assert_eq!(failed_stage(&err), Stage::PackageArchive);
    assert!(sandbox.release_entries().is_empty());
    assert!(sandbox.staging_leftovers().is_empty());
    assert!(!toolchain.programs().iter().any(|p| p == "dpkg-deb"));
}

#[rstest]
fn native_failure_keeps_the_archive(sandbox: ReleaseSandbox) {
    let toolchain = FakeToolchain::new("toolname", "v2.0.1").failing("dpkg-deb");

    let err = run(&sandbox, &toolchain, ArchiveBackend::System).expect_err("dpkg-deb aborts");

    assert_eq!(failed_stage(&err), Stage::PackageNative);
    assert_eq!(
        sandbox.release_entries(),
        vec!["toolname-v2.0.1-linux-x64.tar.gz".to_owned()]
    );
    assert!(sandbox.staging_leftovers().is_empty());
}

#[rstest]
fn missing_binary_fails_version_extraction(sandbox: ReleaseSandbox) {
    std::fs::remove_file(sandbox.binary_path()).expect("remove binary");
    let toolchain = FakeToolchain::new("toolname", "v2.0.1");

    let err = run(&sandbox, &toolchain, ArchiveBackend::System).expect_err("missing binary");

    assert_eq!(failed_stage(&err), Stage::ExtractVersion);
    assert!(
        !toolchain
            .calls()
            .iter()
            .any(|call| program_name(&call.cmd) == "toolname")
    );
}

#[rstest]
fn builtin_backend_skips_system_tar(sandbox: ReleaseSandbox) {
    let toolchain = FakeToolchain::new("toolname", "v2.0.1");

    let report = run(&sandbox, &toolchain, ArchiveBackend::Builtin).expect("release succeeds");

    assert!(!toolchain.programs().iter().any(|p| p == "tar"));
    let archive = report.artefacts.first().expect("archive record");
    assert_eq!(archive.file_name, "toolname-v2.0.1-linux-x64.tar.gz");
    assert!(archive.size > 0);
}

#[rstest]
fn control_record_carries_extracted_version(sandbox: ReleaseSandbox) {
    sandbox.write_changelog("v3.1.4\n").expect("rewrite changelog");
    let toolchain = FakeToolchain::new("toolname", "v3.1.4");

    run(&sandbox, &toolchain, ArchiveBackend::System).expect("release succeeds");

    let records = toolchain.control_records();
    assert_eq!(records.len(), 1);
    assert!(records.iter().all(|r| r.contains("Version: v3.1.4\n")));
}

#[rstest]
fn report_serialises_digests(sandbox: ReleaseSandbox) {
    let toolchain = FakeToolchain::new("toolname", "v2.0.1");
    let report = run(&sandbox, &toolchain, ArchiveBackend::System).expect("release succeeds");
    let summary = sandbox.project_root().join("summary.json");

    report.write_json(&summary).expect("write summary");

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary).expect("read summary"))
            .expect("valid json");
    assert_eq!(value["version"], "v2.0.1");
    assert_eq!(value["artefacts"][0]["kind"], "archive");
    assert_eq!(value["artefacts"][1]["kind"], "native");
    let digest = value["artefacts"][1]["sha256"].as_str().expect("digest");
    assert_eq!(digest.len(), 64);
}

#[test]
fn release_request_creates_directory() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf-8 path");
    let target = base.join("nested").join("release");

    let request = ReleaseRequest::new(&target).expect("request");

    assert!(target.is_dir());
    assert_eq!(request.output_dir(), target);
}

#[test]
fn release_request_reports_uncreatable_directory() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf-8 path");
    let blocker = base.join("file");
    std::fs::write(&blocker, b"not a directory").expect("write blocker");

    let err = ReleaseRequest::new(blocker.join("release")).expect_err("cannot nest under file");

    assert!(matches!(err, ReleaseError::Configuration { .. }));
}

#[rstest]
#[case::build(Stage::Build, "build")]
#[case::extract(Stage::ExtractVersion, "extract-version")]
#[case::verify(Stage::VerifyChangelog, "verify-changelog")]
#[case::archive(Stage::PackageArchive, "package-archive")]
#[case::native(Stage::PackageNative, "package-native")]
fn stages_display_in_kebab_case(#[case] stage: Stage, #[case] expected: &str) {
    assert_eq!(stage.to_string(), expected);
    assert_eq!(
        serde_json::to_value(stage).expect("serialise"),
        serde_json::Value::from(expected)
    );
}

#[rstest]
#[case::build("cargo", Stage::Build)]
#[case::version("toolname", Stage::ExtractVersion)]
#[case::archive("tar", Stage::PackageArchive)]
#[case::native("dpkg-deb", Stage::PackageNative)]
fn failing_tool_is_reported_by_its_stage(
    sandbox: ReleaseSandbox,
    #[case] program: &str,
    #[case] expected: Stage,
) {
    let toolchain = FakeToolchain::new("toolname", "v2.0.1").failing(program);

    let err = run(&sandbox, &toolchain, ArchiveBackend::System).expect_err("tool fails");

    assert_eq!(failed_stage(&err), expected);
    assert_eq!(toolchain.programs().last().map(String::as_str), Some(program));
}
