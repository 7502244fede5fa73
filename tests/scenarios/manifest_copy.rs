//! Test: Manifest Copy - bundling external files into the build output

use crate::helpers::*;
use qtpack::core::{ExternalSourceEntry, Manifest, SourceKind, Stage};
use qtpack::execution::{copy_entry, copy_manifest, EventBus};
use qtpack::PipelineError;
use std::fs;

/// Test that a single file is copied byte for byte
#[test]
fn test_copy_file_to_root_destination() {
    let fixture = Fixture::new();
    let source = fixture.write("data/foo.txt", "hello\r\nbinary\0bytes");
    let out = fixture.root().join("X");

    let entry = ExternalSourceEntry::new(&source, "/bar.txt", SourceKind::Generic);
    let destination = copy_entry(&entry, &out).unwrap();

    assert_eq!(destination, out.join("bar.txt"));
    assert_eq!(fs::read(&destination).unwrap(), fs::read(&source).unwrap());
}

/// Test that a directory merges into an existing destination
#[test]
fn test_copy_directory_merges() {
    let fixture = Fixture::new();
    fixture.write("assets/icons/app.png", "new png");
    fixture.write("assets/readme.txt", "new readme");
    let out = fixture.root().join("out");
    let existing = out.join("assets/keep.me");
    fs::create_dir_all(existing.parent().unwrap()).unwrap();
    fs::write(&existing, "old").unwrap();
    fs::write(out.join("assets/readme.txt"), "old readme").unwrap();

    let entry = ExternalSourceEntry::new(fixture.root().join("assets"), "/assets", SourceKind::Generic);
    copy_entry(&entry, &out).unwrap();

    assert_eq!(fs::read_to_string(&existing).unwrap(), "old");
    assert_eq!(fs::read_to_string(out.join("assets/icons/app.png")).unwrap(), "new png");
    assert_eq!(fs::read_to_string(out.join("assets/readme.txt")).unwrap(), "new readme");
}

/// Test that incomplete entries are skipped, not fatal
#[test]
fn test_incomplete_entries_are_skipped() {
    let fixture = Fixture::new();
    let source = fixture.write("data/a.txt", "a");
    let manifest = Manifest::new(vec![
        ExternalSourceEntry::new("", "/nowhere", SourceKind::Generic),
        ExternalSourceEntry::new(&source, "/", SourceKind::Generic),
        ExternalSourceEntry::new(&source, "/a.txt", SourceKind::Generic),
    ]);

    let report = copy_manifest(&manifest, &fixture.root().join("out"), &EventBus::new()).unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.copied, vec![fixture.root().join("out/a.txt")]);
}

/// Test that the pipeline copies into output/<config> and reports progress
#[tokio::test]
async fn test_pipeline_copy_stage() {
    let fixture = Fixture::new();
    let source = fixture.write("data/settings.ini", "[main]");
    let manifest = Manifest::new(vec![ExternalSourceEntry::for_path(&source, SourceKind::Generic)]);

    let (result, recorder) = run_with(fixture.runner(), fixture.config().with_manifest(manifest)).await;

    let build_dir = result.unwrap();
    assert_eq!(fs::read_to_string(build_dir.join("settings.ini")).unwrap(), "[main]");
    assert!(recorder.output().contains("Copied "));
    assert!(recorder.stages().contains(&Stage::CopyingExternalSources));
}

/// Test that a missing source fails the run in the copy stage
#[tokio::test]
async fn test_missing_source_fails_run() {
    let fixture = Fixture::new();
    let manifest = Manifest::new(vec![ExternalSourceEntry::new(
        fixture.root().join("gone.dll"),
        "/gone.dll",
        SourceKind::Generic,
    )]);

    let runner = fixture.runner();
    let (result, recorder) = run_with(runner.clone(), fixture.config().with_manifest(manifest)).await;

    assert!(matches!(result, Err(PipelineError::Copy { .. })));
    assert_eq!(
        recorder.stages(),
        vec![
            Stage::Configuring,
            Stage::Building,
            Stage::Deploying,
            Stage::CopyingExternalSources,
            Stage::Failed
        ]
    );
    assert!(assert_single_error(&recorder).contains("gone.dll"));
    assert_eq!(runner.calls().len(), 3);
}

/// Test that only QML entries get a deploy pass, in manifest order
#[tokio::test]
async fn test_one_deploy_per_qml_entry() {
    let fixture = Fixture::new();
    let first = fixture.write("qml/first/qmldir", "module First");
    let plain = fixture.write("data/plain.txt", "plain");
    let second = fixture.write("qml/second/qmldir", "module Second");
    let manifest = Manifest::new(vec![
        ExternalSourceEntry::new(first.parent().unwrap(), "/first", SourceKind::Qml),
        ExternalSourceEntry::new(&plain, "/plain.txt", SourceKind::Generic),
        ExternalSourceEntry::new(second.parent().unwrap(), "/second", SourceKind::Qml),
    ]);

    let runner = fixture.runner();
    let (result, recorder) = run_with(runner.clone(), fixture.config().with_manifest(manifest)).await;
    let build_dir = result.unwrap();

    assert_eq!(
        &recorder.stages()[3..],
        &[
            Stage::CopyingExternalSources,
            Stage::DeployingQmlDependency(0),
            Stage::DeployingQmlDependency(1),
            Stage::Succeeded
        ]
    );
    let calls = runner.calls();
    assert_eq!(calls.len(), 5);
    assert_eq!(calls[3].args[0], build_dir.join("first").to_string_lossy());
    assert_eq!(calls[4].args[0], build_dir.join("second").to_string_lossy());
}

/// Test that bundling the build directory into itself terminates
#[tokio::test]
async fn test_bundle_build_dir_into_itself() {
    let fixture = Fixture::new();
    let build_dir = fixture.output.join("release");
    let manifest = Manifest::new(vec![ExternalSourceEntry::new(
        &build_dir,
        "/snapshot",
        SourceKind::Generic,
    )]);

    let (result, recorder) = run_with(fixture.runner(), fixture.config().with_manifest(manifest)).await;

    assert_eq!(result.unwrap(), build_dir);
    assert!(build_dir.join("snapshot").join(fixture.executable().file_name().unwrap()).is_file());
    assert!(!build_dir.join("snapshot/snapshot").exists());
    assert_single_finished(&recorder);
}

/// Test that a destination climbing out of the output fails the copy stage
#[tokio::test]
async fn test_destination_outside_output_fails_run() {
    let fixture = Fixture::new();
    let source = fixture.write("data/secret.txt", "x");
    let manifest = Manifest::new(vec![ExternalSourceEntry::new(
        &source,
        "/../../secret.txt",
        SourceKind::Generic,
    )]);

    let (result, recorder) = run_with(fixture.runner(), fixture.config().with_manifest(manifest)).await;

    assert!(matches!(result, Err(PipelineError::Copy { .. })));
    assert!(!fixture.root().join("secret.txt").exists());
    assert_single_error(&recorder);
}
