//! Mirror behaviour against a scripted transport.

mod common;

use std::sync::Arc;

use automator_client::{Mirror, MirrorError, TransportError};
use automator_core::api::{ProcessSettings, TaskSettings};
use automator_core::{CoreError, GroupKey, ProcessStatus, TaskStatus};
use common::{process_json, processes_body, task_json, tasks_body, Canned, FakeTransport};
use serde_json::json;
use tokio::sync::Notify;

async fn mirror_with(fake: &Arc<FakeTransport>) -> Arc<Mirror<Arc<FakeTransport>>> {
    let mirror = Arc::new(Mirror::new(Arc::clone(fake)));
    let summary = mirror.refresh_all().await;
    assert!(summary.all_ok(), "initial refresh failed: {summary:?}");
    mirror
}

fn seeded() -> Arc<FakeTransport> {
    let fake = FakeTransport::new();
    fake.set_get("processes", processes_body([process_json("ingest", "stopped", 10, 3)]));
    fake.set_get("tasks", tasks_body([task_json("retrain", "finished", 60, 5)]));
    fake
}

#[tokio::test]
async fn toggle_overlay_is_visible_before_response() {
    let fake = seeded();
    fake.set_mutation(
        "PATCH",
        "process/ingest",
        Canned::Ok(process_json("ingest", "running", 10, 3)),
    );
    let gate = Arc::new(Notify::new());
    fake.gate_mutations(Arc::clone(&gate));
    let mirror = mirror_with(&fake).await;
    let handle = mirror.store().process("ingest").unwrap();

    let pending = tokio::spawn({
        let mirror = Arc::clone(&mirror);
        let handle = handle.clone();
        async move { mirror.toggle_status(&handle).await }
    });
    while fake.sent().is_empty() {
        tokio::task::yield_now().await;
    }

    assert_eq!(handle.read().effective_status(), ProcessStatus::Running);
    assert!(handle.read().is_updating_status());
    assert_eq!(fake.sent()[0].body, json!({ "status": "running" }));

    gate.notify_one();
    let record = pending.await.unwrap().unwrap();
    assert_eq!(record.status, ProcessStatus::Running);
    // The response alone does not confirm the toggle.
    assert!(handle.read().is_updating_status());

    fake.set_get("processes", processes_body([process_json("ingest", "running", 10, 3)]));
    mirror.refresh_group(GroupKey::Processes).await.unwrap();
    assert!(!handle.read().is_updating_status());
    assert_eq!(handle.read().remote_status(), ProcessStatus::Running);
}

#[tokio::test]
async fn overlays_are_set_before_the_request_is_polled() {
    let fake = seeded();
    fake.set_mutation(
        "PATCH",
        "process/ingest",
        Canned::Ok(process_json("ingest", "running", 10, 3)),
    );
    fake.set_mutation(
        "POST",
        "tasks/retrain",
        Canned::Ok(task_json("retrain", "running", 60, 6)),
    );
    let mirror = mirror_with(&fake).await;
    let process = mirror.store().process("ingest").unwrap();
    let task = mirror.store().task("retrain").unwrap();

    let toggle = mirror.toggle_status(&process);
    let start = mirror.start_task_instance(&task);
    assert!(process.read().is_updating_status());
    assert!(task.read().is_starting_instance());
    assert!(fake.sent().is_empty());

    toggle.await.unwrap();
    start.await.unwrap();
    assert_eq!(fake.sent().len(), 2);
}

#[tokio::test]
async fn failed_toggle_keeps_overlay() {
    let fake = seeded();
    fake.set_mutation(
        "PATCH",
        "process/ingest",
        Canned::Status(500, json!({ "detail": "boom" })),
    );
    let mirror = mirror_with(&fake).await;
    let handle = mirror.store().process("ingest").unwrap();

    let err = mirror.toggle_status(&handle).await.unwrap_err();
    assert!(matches!(
        err,
        MirrorError::Transport(TransportError::Status { status: 500, .. })
    ));
    assert!(handle.read().is_updating_status());
    assert_eq!(handle.read().effective_status(), ProcessStatus::Running);
}

#[tokio::test]
async fn second_start_is_not_sent_while_pending() {
    let fake = seeded();
    fake.set_mutation(
        "POST",
        "tasks/retrain",
        Canned::Ok(task_json("retrain", "running", 60, 6)),
    );
    let mirror = mirror_with(&fake).await;
    let handle = mirror.store().task("retrain").unwrap();

    let first = mirror.start_task_instance(&handle).await.unwrap();
    assert_eq!(first.map(|r| r.status), Some(TaskStatus::Running));
    assert!(mirror.start_task_instance(&handle).await.unwrap().is_none());
    assert_eq!(fake.sent().len(), 1);
    assert_eq!(fake.sent()[0].body, json!({}));

    fake.set_get("tasks", tasks_body([task_json("retrain", "running", 60, 6)]));
    mirror.refresh_group(GroupKey::Tasks).await.unwrap();
    assert!(!handle.read().is_starting_instance());

    mirror.start_task_instance(&handle).await.unwrap();
    assert_eq!(fake.sent().len(), 2);
}

#[tokio::test]
async fn conflicting_start_keeps_pending_instance() {
    let fake = seeded();
    fake.set_mutation(
        "POST",
        "tasks/retrain",
        Canned::Status(409, json!({ "detail": "Task retrain already running" })),
    );
    let mirror = mirror_with(&fake).await;
    let handle = mirror.store().task("retrain").unwrap();

    let err = mirror.start_task_instance(&handle).await.unwrap_err();
    assert!(matches!(
        err,
        MirrorError::Transport(TransportError::Conflict(ref m)) if m == "Task retrain already running"
    ));
    assert!(handle.read().is_starting_instance());
}

#[tokio::test]
async fn settings_update_sends_only_changed_fields() {
    let fake = seeded();
    fake.set_mutation(
        "PATCH",
        "process/ingest",
        Canned::Ok(process_json("ingest", "stopped", 30, 3)),
    );
    let mirror = mirror_with(&fake).await;
    let handle = mirror.store().process("ingest").unwrap();

    mirror
        .update_process(&handle, &ProcessSettings { cycle_time_seconds: Some(30) })
        .await
        .unwrap();
    mirror
        .update_process(&handle, &ProcessSettings { cycle_time_seconds: Some(10) })
        .await
        .unwrap();

    let sent = fake.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].path, "process/ingest");
    assert_eq!(sent[0].body, json!({ "cycle_time": 30 }));
    assert_eq!(sent[1].body, json!({}));
    // Confirmed values only change through a snapshot.
    assert_eq!(handle.read().cycle_time_seconds(), 10);
}

#[tokio::test]
async fn validation_failure_surfaces_messages() {
    let fake = seeded();
    fake.set_mutation(
        "PATCH",
        "tasks/retrain",
        Canned::Status(
            422,
            json!({ "detail": [
                { "loc": ["body", "duration"], "msg": "Input should be greater than 0" }
            ]}),
        ),
    );
    let mirror = mirror_with(&fake).await;
    let handle = mirror.store().task("retrain").unwrap();

    let err = mirror
        .update_task(&handle, &TaskSettings { duration_seconds: Some(0) })
        .await
        .unwrap_err();
    assert_eq!(
        err.validation_message().as_deref(),
        Some("Input should be greater than 0")
    );
    assert_eq!(fake.sent()[0].body, json!({ "duration": 0 }));
}

#[tokio::test]
async fn failing_group_does_not_block_the_other() {
    let fake = FakeTransport::new();
    fake.set_get("processes", processes_body([process_json("ingest", "running", 10, 1)]));
    fake.fail_get("tasks", 503);
    let mirror = Mirror::new(Arc::clone(&fake));

    let summary = mirror.refresh_all().await;
    assert_eq!(summary.refreshed, [GroupKey::Processes]);
    assert_eq!(summary.failed, [GroupKey::Tasks]);
    assert!(!summary.all_ok());
    assert_eq!(mirror.store().len(GroupKey::Processes), 1);
    assert_eq!(mirror.store().len(GroupKey::Tasks), 0);
}

#[tokio::test]
async fn failed_fetch_leaves_store_untouched() {
    let fake = seeded();
    let mirror = mirror_with(&fake).await;
    let before = mirror.store().process("ingest").unwrap().get();

    fake.set_get("processes", json!({ "items": [] }));
    let err = mirror.refresh_group(GroupKey::Processes).await.unwrap_err();
    assert!(matches!(
        err,
        MirrorError::Snapshot(CoreError::MissingGroup(GroupKey::Processes))
    ));

    fake.fail_get("processes", 500);
    assert!(mirror.refresh_group(GroupKey::Processes).await.is_err());

    assert_eq!(mirror.store().len(GroupKey::Processes), 1);
    assert_eq!(mirror.store().process("ingest").unwrap().get(), before);
}

#[tokio::test]
async fn single_fetch_merges_into_existing_entity() {
    let fake = seeded();
    let mirror = mirror_with(&fake).await;
    let held = mirror.store().process("ingest").unwrap();

    fake.set_get("processes/ingest", process_json("ingest", "running", 10, 4));
    let fetched = mirror.fetch_process("ingest").await.unwrap();
    assert!(fetched.ptr_eq(&held));
    assert_eq!(held.read().cycles_completed(), 4);

    let err = mirror.fetch_task("missing").await.unwrap_err();
    assert!(matches!(
        err,
        MirrorError::Transport(TransportError::Status { status: 404, .. })
    ));
}
