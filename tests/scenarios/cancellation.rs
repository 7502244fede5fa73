//! Test: Cancellation - stopping a run mid-stage and starting over

use crate::helpers::*;
use qtpack::core::Stage;
use qtpack::{BuildPipeline, PipelineError, PipelineEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Test that stop during the build kills it and reports one cancellation
#[tokio::test]
async fn test_stop_during_build() {
    let fixture = Fixture::new();
    let runner = fixture
        .runner()
        .script("mingw32-make", Script::BlockUntilStopped);
    let pipeline = Arc::new(BuildPipeline::new(runner.clone()));
    let recorder = EventRecorder::attach(&pipeline);

    let background = pipeline.clone();
    let config = fixture.config();
    let handle = tokio::spawn(async move { background.run(config).await });

    runner.wait_until_blocked().await;
    assert!(pipeline.is_running());
    assert!(pipeline.stop());

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run did not wind down after stop")
        .unwrap();

    assert!(matches!(result, Err(PipelineError::Cancelled)));
    assert_eq!(
        recorder.stages(),
        vec![Stage::Configuring, Stage::Building, Stage::Cancelled]
    );
    assert_eq!(assert_single_error(&recorder), "Build stopped by user");
    assert_eq!(runner.tools_called(), vec!["qmake", "mingw32-make"]);
    assert!(!pipeline.is_running());
}

/// Test that a fresh run after a cancelled one starts from the beginning
#[tokio::test]
async fn test_run_after_cancel_starts_clean() {
    let fixture = Fixture::new();
    let runner = fixture
        .runner()
        .script("mingw32-make", Script::BlockUntilStopped);
    let pipeline = Arc::new(BuildPipeline::new(runner.clone()));
    let recorder = EventRecorder::attach(&pipeline);

    let background = pipeline.clone();
    let config = fixture.config();
    let handle = tokio::spawn(async move { background.run(config).await });
    runner.wait_until_blocked().await;
    pipeline.stop();
    assert!(handle.await.unwrap().is_err());

    recorder.clear();
    let result = pipeline.run(fixture.config()).await;

    assert!(result.is_ok());
    assert_eq!(
        recorder.stages(),
        vec![
            Stage::Configuring,
            Stage::Building,
            Stage::Deploying,
            Stage::Succeeded
        ]
    );
    assert_single_finished(&recorder);
}

/// Test that a second stop is a no-op
#[tokio::test]
async fn test_second_stop_returns_false() {
    let fixture = Fixture::new();
    let runner = fixture.runner().script("qmake", Script::BlockUntilStopped);
    let pipeline = Arc::new(BuildPipeline::new(runner.clone()));
    let recorder = EventRecorder::attach(&pipeline);

    let background = pipeline.clone();
    let config = fixture.config();
    let handle = tokio::spawn(async move { background.run(config).await });
    runner.wait_until_blocked().await;

    assert!(pipeline.stop());
    assert!(!pipeline.stop());
    assert!(handle.await.unwrap().is_err());

    assert_single_error(&recorder);
    assert!(!pipeline.stop());
}

/// Test that stop with nothing running emits nothing
#[tokio::test]
async fn test_stop_when_idle() {
    let fixture = Fixture::new();
    let pipeline = BuildPipeline::new(fixture.runner());
    let recorder = EventRecorder::attach(&pipeline);

    assert!(!pipeline.stop());
    assert!(recorder.events().is_empty());
}

/// Test that starting a run while one is active stops the old one first
#[tokio::test]
async fn test_new_run_replaces_active_run() {
    let fixture = Fixture::new();
    let runner = fixture
        .runner()
        .script("mingw32-make", Script::BlockUntilStopped);
    let pipeline = Arc::new(BuildPipeline::new(runner.clone()));
    let recorder = EventRecorder::attach(&pipeline);

    let background = pipeline.clone();
    let config = fixture.config();
    let first = tokio::spawn(async move { background.run(config).await });
    runner.wait_until_blocked().await;

    let second = pipeline.run(fixture.config()).await;

    assert!(matches!(first.await.unwrap(), Err(PipelineError::Cancelled)));
    assert!(second.is_ok());
    assert_eq!(recorder.errors(), vec!["Build stopped by user".to_string()]);
    assert_eq!(recorder.finished().len(), 1);
    assert_eq!(
        runner.tools_called(),
        vec!["qmake", "mingw32-make", "qmake", "mingw32-make", "windeployqt"]
    );
}

/// Test that stop after success, while clean-up runs, reports nothing to stop
#[tokio::test]
async fn test_stop_during_clean_up_returns_false() {
    let fixture = Fixture::new();
    fixture.write("build/release/main.o", "");
    let pipeline = Arc::new(BuildPipeline::new(fixture.runner()));
    let recorder = EventRecorder::attach(&pipeline);

    let answers = Arc::new(Mutex::new(Vec::new()));
    let sink = answers.clone();
    let weak = Arc::downgrade(&pipeline);
    pipeline.add_event_handler(move |event| {
        let winding_down = match &event {
            PipelineEvent::Finished(_) => true,
            PipelineEvent::Output(text) => text.starts_with("Cleaned "),
            _ => false,
        };
        if let (true, Some(pipeline)) = (winding_down, weak.upgrade()) {
            sink.lock().unwrap().push(pipeline.stop());
        }
    });

    let result = pipeline.run(fixture.config().with_clean(true)).await;

    assert!(result.is_ok());
    assert_eq!(*answers.lock().unwrap(), vec![false, false]);
    assert!(recorder.errors().is_empty());
    assert_single_finished(&recorder);
}
