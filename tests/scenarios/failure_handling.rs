//! Test: Failure Handling - bad configuration, failing tools, missing artifacts

use crate::helpers::*;
use qtpack::core::{ExternalSourceEntry, Manifest, PathPolicy, SourceKind, Stage};
use qtpack::PipelineError;
use std::path::PathBuf;

/// Test that every missing required path fails before any process starts
#[tokio::test]
async fn test_missing_settings_never_start_a_process() {
    let fixture = Fixture::new();

    let mut configs = Vec::new();
    for field in 0..4 {
        let mut config = fixture.config();
        match field {
            0 => config.project_file = PathBuf::new(),
            1 => config.toolchain_bin = PathBuf::new(),
            2 => config.compiler_bin = PathBuf::new(),
            _ => config.output_dir = PathBuf::new(),
        }
        configs.push(config);
    }

    for config in configs {
        let runner = fixture.runner();
        let (result, recorder) = run_with(runner.clone(), config).await;

        assert!(matches!(result, Err(PipelineError::MissingSetting(_))));
        assert!(runner.calls().is_empty());
        assert!(recorder.stages().is_empty());
        let message = assert_single_error(&recorder);
        assert!(message.starts_with("Missing required setting"));
    }
}

/// Test that a missing project file is reported without starting anything
#[tokio::test]
async fn test_missing_project_file() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.project_file = fixture.root().join("nope.pro");

    let runner = fixture.runner();
    let (result, recorder) = run_with(runner.clone(), config).await;

    assert!(matches!(result, Err(PipelineError::ProjectFileNotFound(_))));
    assert!(runner.calls().is_empty());
    assert!(assert_single_error(&recorder).contains("nope.pro"));
}

/// Test that a missing tool is reported before configuring
#[tokio::test]
async fn test_missing_deploy_tool() {
    let fixture = Fixture::new();
    std::fs::remove_file(
        fixture
            .qt_bin
            .join(qtpack::core::project::executable_file_name("windeployqt")),
    )
    .unwrap();

    let runner = fixture.runner();
    let (result, recorder) = run_with(runner.clone(), fixture.config()).await;

    assert!(matches!(result, Err(PipelineError::ToolNotFound(_))));
    assert!(runner.calls().is_empty());
    assert!(assert_single_error(&recorder).contains("windeployqt"));
}

/// Test that non-ASCII paths are rejected unless the policy allows them
#[tokio::test]
async fn test_non_ascii_output_rejected() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.output_dir = fixture.root().join("sortie-été");

    let runner = fixture.runner();
    let (result, recorder) = run_with(runner.clone(), config.clone()).await;
    assert!(matches!(result, Err(PipelineError::InvalidPath { .. })));
    assert!(runner.calls().is_empty());
    assert_single_error(&recorder);

    let runner = MockRunner::new().producing(
        config
            .clone()
            .with_path_policy(PathPolicy::Any)
            .config_output_dir()
            .join(qtpack::core::project::executable_file_name("demo")),
    );
    let (result, recorder) = run_with(runner, config.with_path_policy(PathPolicy::Any)).await;
    assert!(result.is_ok());
    assert_single_finished(&recorder);
}

/// Test that a failing build stops the chain and names the stage and code
#[tokio::test]
async fn test_build_failure_stops_chain() {
    let fixture = Fixture::new();
    let runner = fixture.runner().script("mingw32-make", Script::Exit(2));

    let (result, recorder) = run_with(runner.clone(), fixture.config()).await;

    assert!(matches!(
        result,
        Err(PipelineError::StageFailed {
            stage: Stage::Building,
            code: 2
        })
    ));
    assert_eq!(
        recorder.stages(),
        vec![Stage::Configuring, Stage::Building, Stage::Failed]
    );
    assert_eq!(runner.tools_called(), vec!["qmake", "mingw32-make"]);
    assert_eq!(
        assert_single_error(&recorder),
        "build (make) failed with exit code 2"
    );
    assert!(recorder.output().contains("[Error] mingw32-make exploded\n"));
}

/// Test that a configure failure never reaches the build tool
#[tokio::test]
async fn test_configure_failure() {
    let fixture = Fixture::new();
    let runner = fixture.runner().script("qmake", Script::Exit(3));

    let (result, recorder) = run_with(runner.clone(), fixture.config()).await;

    assert!(result.is_err());
    assert_eq!(runner.tools_called(), vec!["qmake"]);
    assert_eq!(
        assert_single_error(&recorder),
        "configure (qmake) failed with exit code 3"
    );
}

/// Test that an abnormal deploy exit is reported without a code
#[tokio::test]
async fn test_abnormal_deploy_exit() {
    let fixture = Fixture::new();
    let runner = fixture.runner().script("windeployqt", Script::Abnormal);

    let (result, recorder) = run_with(runner, fixture.config()).await;

    assert!(matches!(result, Err(PipelineError::AbnormalExit { code: None })));
    assert_eq!(
        assert_single_error(&recorder),
        "Process exited abnormally, code: unknown"
    );
}

/// Test that a tool that cannot start fails the run
#[tokio::test]
async fn test_spawn_failure() {
    let fixture = Fixture::new();
    let runner = fixture.runner().script("qmake", Script::SpawnError);

    let (result, recorder) = run_with(runner, fixture.config()).await;

    assert!(matches!(result, Err(PipelineError::Spawn { .. })));
    assert!(assert_single_error(&recorder).starts_with("Failed to start"));
    assert_eq!(recorder.stages().last(), Some(&Stage::Failed));
}

/// Test that a build which produced no executable fails before deploying
#[tokio::test]
async fn test_missing_executable_after_build() {
    let fixture = Fixture::new();
    let runner = MockRunner::new();

    let (result, recorder) = run_with(runner.clone(), fixture.config()).await;

    assert!(matches!(result, Err(PipelineError::ExecutableNotFound(_))));
    assert_eq!(runner.tools_called(), vec!["qmake", "mingw32-make"]);
    assert_eq!(recorder.stages().last(), Some(&Stage::Failed));
    assert_single_error(&recorder);
}

/// Test that a QML deploy failure uses the generic abnormal message
#[tokio::test]
async fn test_qml_deploy_failure() {
    let fixture = Fixture::new();
    let plugin = fixture.write("plugins/charts/qmldir", "module Charts");
    let manifest = Manifest::new(vec![ExternalSourceEntry::new(
        plugin.parent().unwrap(),
        "/charts",
        SourceKind::Qml,
    )]);
    let runner = fixture
        .runner()
        .script("windeployqt", Script::Exit(0))
        .script("windeployqt", Script::Exit(1));

    let (result, recorder) = run_with(runner, fixture.config().with_manifest(manifest)).await;

    assert!(matches!(result, Err(PipelineError::AbnormalExit { code: Some(1) })));
    assert_eq!(
        recorder.stages(),
        vec![
            Stage::Configuring,
            Stage::Building,
            Stage::Deploying,
            Stage::CopyingExternalSources,
            Stage::DeployingQmlDependency(0),
            Stage::Failed
        ]
    );
    assert_eq!(assert_single_error(&recorder), "Process exited abnormally, code: 1");
}

/// Test that a missing qml directory fails the QML stage
#[tokio::test]
async fn test_missing_qml_directory() {
    let fixture = Fixture::new();
    std::fs::remove_dir(fixture.qt_bin.parent().unwrap().join("qml")).unwrap();
    let plugin = fixture.write("plugins/charts/qmldir", "module Charts");
    let manifest = Manifest::new(vec![ExternalSourceEntry::new(
        plugin.parent().unwrap(),
        "/charts",
        SourceKind::Qml,
    )]);

    let runner = fixture.runner();
    let (result, recorder) = run_with(runner.clone(), fixture.config().with_manifest(manifest)).await;

    assert!(matches!(result, Err(PipelineError::QmlDirectoryNotFound(_))));
    assert_eq!(runner.calls().len(), 3);
    assert_single_error(&recorder);
}
