// Background export worker

use std::sync::Arc;
use tempfile::TempDir;
use watermarker::export::{ExportEvent, ExportSettings, ExportWorker, FailureKind};
use watermarker::watermark::{RenderContext, TextWatermark, WatermarkConfig};

use super::test_harness::{file_count, write_corrupt, write_pngs};

fn finished(events: &[ExportEvent]) -> (usize, usize, bool) {
    match events.last() {
        Some(ExportEvent::Finished {
            exported,
            failed,
            cancelled,
        }) => (*exported, *failed, *cancelled),
        other => panic!("expected Finished, got {:?}", other),
    }
}

/// Test: Jobs run in submission order on the worker thread
#[test]
fn test_jobs_run_in_order() {
    let temp = TempDir::new().unwrap();
    let sources = write_pngs(temp.path(), 2, 50, 50);
    let worker = ExportWorker::spawn(Arc::new(RenderContext::new())).unwrap();
    let config = WatermarkConfig::text(TextWatermark::new("queue"));

    let first = worker
        .submit(
            sources.clone(),
            &config,
            &ExportSettings::default().with_output_dir(temp.path().join("first")),
        )
        .unwrap();
    let second = worker
        .submit(
            sources,
            &config,
            &ExportSettings::default().with_output_dir(temp.path().join("second")),
        )
        .unwrap();

    assert_eq!(finished(&first.wait()), (2, 0, false));
    assert_eq!(finished(&second.wait()), (2, 0, false));
    assert_eq!(file_count(&temp.path().join("first")), 2);
    assert_eq!(file_count(&temp.path().join("second")), 2);

    worker.shutdown();
}

/// Test: Failures are streamed as events with their category
#[test]
fn test_failure_events_carry_kind() {
    let temp = TempDir::new().unwrap();
    let mut sources = write_pngs(temp.path(), 1, 20, 20);
    sources.push(write_corrupt(temp.path(), "bad.jpg"));
    let worker = ExportWorker::spawn(Arc::new(RenderContext::new())).unwrap();

    let handle = worker
        .submit(
            sources,
            &WatermarkConfig::default(),
            &ExportSettings::default().with_output_dir(temp.path().join("out")),
        )
        .unwrap();
    let events = handle.wait();

    let failures: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ExportEvent::FileFailed { index, kind, .. } => Some((*index, *kind)),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![(1, FailureKind::AssetLoad)]);
    assert_eq!(finished(&events), (1, 1, false));
}

/// Test: Dropping the worker finishes queued work first
#[test]
fn test_drop_drains_queue() {
    let temp = TempDir::new().unwrap();
    let sources = write_pngs(temp.path(), 3, 40, 40);
    let out = temp.path().join("out");

    let handle = {
        let worker = ExportWorker::spawn(Arc::new(RenderContext::new())).unwrap();
        worker
            .submit(
                sources,
                &WatermarkConfig::default(),
                &ExportSettings::default().with_output_dir(&out),
            )
            .unwrap()
    };

    assert_eq!(finished(&handle.wait()), (3, 0, false));
    assert_eq!(file_count(&out), 3);
}
