//! Orchestrator tests: immediate pushes, connectivity cycles and merge
//! scenarios end to end over the mock remote.

mod common;

use common::{remote_note, Call, Harness, START};
use noteline_client::{ReplayReport, SyncWorker};
use noteline_engine::{
    Envelope, Error, NoteDraft, SyncMessage, SyncPhase, SyncStatus, PROTOCOL_VERSION,
};

// ============================================================================
// Mutations
// ============================================================================

#[tokio::test]
async fn online_mutation_is_pushed_immediately() {
    let h = Harness::new(true).await;

    let outcome = h
        .sync
        .apply_mutation(NoteDraft::new("Groceries", "milk"))
        .await
        .unwrap();

    assert!(outcome.applied_remotely);
    assert!(!outcome.pending);
    assert_eq!(h.remote.saves_of(&outcome.id), 1);
    let note = h.store.get(&outcome.id).await.unwrap().unwrap();
    assert_eq!(note.sync_status, SyncStatus::Synced);
    assert_eq!(note.last_synced, Some(START));
    assert_eq!(h.sync.state().pending_count, 0);
}

#[tokio::test]
async fn offline_mutation_stays_queued() {
    let h = Harness::new(false).await;

    let outcome = h
        .sync
        .apply_mutation(NoteDraft::new("Groceries", "milk"))
        .await
        .unwrap();

    assert!(!outcome.applied_remotely);
    assert!(outcome.pending);
    assert!(h.remote.calls().is_empty());
    assert_eq!(h.sync.state().pending_count, 1);
}

#[tokio::test]
async fn failed_immediate_push_leaves_entry_for_replay() {
    let h = Harness::new(true).await;
    h.remote.set_down(true);

    let outcome = h
        .sync
        .apply_mutation(NoteDraft::new("a", "x"))
        .await
        .unwrap();

    assert!(!outcome.applied_remotely);
    assert!(outcome.pending);
    assert_eq!(h.store.pending_count().await.unwrap(), 1);

    h.remote.set_down(false);
    let report = h.sync.sync_now().await.unwrap();
    assert!(report.is_drained());
    assert_eq!(
        h.store.get(&outcome.id).await.unwrap().unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[tokio::test]
async fn mutation_ignores_caller_status() {
    let h = Harness::new(false).await;

    let outcome = h
        .sync
        .apply_mutation(NoteDraft::new("a", "x").with_status(SyncStatus::Synced))
        .await
        .unwrap();

    let note = h.store.get(&outcome.id).await.unwrap().unwrap();
    assert_eq!(note.sync_status, SyncStatus::Pending);
}

#[tokio::test]
async fn online_delete_is_pushed_immediately() {
    let h = Harness::new(true).await;
    let created = h
        .sync
        .apply_mutation(NoteDraft::new("a", "x"))
        .await
        .unwrap();

    let deleted = h.sync.delete(&created.id).await.unwrap();

    assert!(deleted.applied_remotely);
    assert_eq!(h.remote.len(), 0);
    assert!(h.store.get(&created.id).await.unwrap().is_none());
    assert!(h.store.list_pending_operations().await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_missing_note_is_not_found() {
    let h = Harness::new(true).await;

    assert_eq!(
        h.sync.delete("ghost").await,
        Err(Error::NotFound("ghost".into()))
    );
    assert!(h.remote.calls().is_empty());
}

// ============================================================================
// Connectivity
// ============================================================================

#[tokio::test]
async fn offline_edit_reaches_remote_exactly_once_after_reconnect() {
    let h = Harness::new(false).await;
    let created = h
        .sync
        .apply_mutation(NoteDraft::new("Plan", "draft"))
        .await
        .unwrap();
    h.tick();
    h.sync
        .apply_mutation(NoteDraft::new("Plan", "final").with_id(&created.id))
        .await
        .unwrap();
    let synced_at = h.tick();

    let outcome = h.sync.set_online(true).await.unwrap().unwrap();

    assert!(outcome.replay.is_drained());
    assert!(outcome.summary.is_some());
    assert_eq!(
        h.remote.calls(),
        vec![
            Call::Save {
                id: created.id.clone(),
                content: "final".into()
            },
            Call::FetchAll,
        ]
    );
    let note = h.store.get(&created.id).await.unwrap().unwrap();
    assert_eq!(note.sync_status, SyncStatus::Synced);
    assert_eq!(note.last_synced, Some(synced_at));
    assert_eq!(note.content, "final");

    let state = h.sync.state();
    assert_eq!(state.phase, SyncPhase::Complete);
    assert_eq!(state.last_sync, Some(synced_at));
    assert_eq!(state.pending_count, 0);
}

#[tokio::test]
async fn only_offline_to_online_edge_runs_a_cycle() {
    let h = Harness::new(true).await;

    assert!(h.sync.set_online(true).await.unwrap().is_none());
    assert!(h.sync.set_online(false).await.unwrap().is_none());
    assert!(h.sync.set_online(true).await.unwrap().is_some());
    assert!(h.sync.set_online(true).await.unwrap().is_none());
}

#[tokio::test]
async fn trigger_sync_replays_only_while_online() {
    let h = Harness::new(false).await;
    h.sync
        .apply_mutation(NoteDraft::new("a", "x"))
        .await
        .unwrap();

    assert!(h.sync.dispatch(SyncMessage::TriggerSync).await.unwrap().is_none());
    assert!(h.remote.calls().is_empty());

    h.sync.channel().publish(SyncMessage::ConnectionOnline);
    let outcome = h
        .sync
        .dispatch(SyncMessage::TriggerSync)
        .await
        .unwrap()
        .unwrap();

    assert!(outcome.replay.is_drained());
    assert!(outcome.summary.is_none());
    assert_eq!(h.remote.len(), 1);
}

#[tokio::test]
async fn sync_is_refused_while_offline() {
    let h = Harness::new(false).await;

    assert!(matches!(h.sync.full_sync().await, Err(Error::Unreachable(_))));
    assert!(matches!(h.sync.sync_now().await, Err(Error::Unreachable(_))));
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn unsupported_envelope_is_dropped() {
    let h = Harness::new(false).await;
    let envelope = Envelope {
        version: PROTOCOL_VERSION + 1,
        message: SyncMessage::ConnectionOnline,
    };

    assert!(h.sync.dispatch_envelope(envelope).await.unwrap().is_none());
    assert!(!h.sync.is_online());
}

#[tokio::test]
async fn cycle_publishes_lifecycle_in_order() {
    let h = Harness::new(false).await;
    h.sync
        .apply_mutation(NoteDraft::new("a", "x"))
        .await
        .unwrap();
    let mut rx = h.sync.subscribe();

    h.sync.set_online(true).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        assert_eq!(envelope.version, PROTOCOL_VERSION);
        kinds.push(envelope.message.kind());
    }
    assert_eq!(
        kinds,
        vec![
            "connection-online",
            "sync-start",
            "sync-success",
            "sync-complete",
            "sync-start",
            "sync-complete",
        ]
    );
}

#[tokio::test]
async fn stopped_replay_skips_full_sync() {
    let h = Harness::new(false).await;
    h.remote.set_down(true);
    h.sync
        .apply_mutation(NoteDraft::new("a", "x"))
        .await
        .unwrap();

    let outcome = h.sync.set_online(true).await.unwrap().unwrap();

    assert!(matches!(outcome.replay, ReplayReport::Stopped { .. }));
    assert!(outcome.summary.is_none());
    assert!(!h.remote.calls().contains(&Call::FetchAll));
}

// ============================================================================
// Merge scenarios
// ============================================================================

#[tokio::test]
async fn bad_remote_record_does_not_block_full_sync() {
    let h = Harness::new(true).await;
    h.remote.seed(remote_note(" ", "broken", START + 100));
    h.remote.seed(remote_note("n1", "fine", START + 200));

    for _ in 0..2 {
        let summary = h.sync.full_sync().await.unwrap();
        assert_eq!(summary.report.failed.len(), 1);
        assert_eq!(h.sync.state().phase, SyncPhase::Complete);
    }

    let note = h.store.get("n1").await.unwrap().unwrap();
    assert_eq!(note.content, "fine");
    assert_eq!(note.sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn pending_local_edit_beats_older_remote_copy() {
    let h = Harness::new(false).await;
    h.remote.seed(remote_note("n1", "server", START - 500));
    h.sync
        .apply_mutation(NoteDraft::new("n1", "local").with_id("n1"))
        .await
        .unwrap();
    h.sync.channel().publish(SyncMessage::ConnectionOnline);

    let summary = h.sync.full_sync().await.unwrap();

    assert_eq!(summary.report.kept_pending, vec!["n1".to_string()]);
    assert_eq!(summary.pending_count, 1);
    let note = h.store.get("n1").await.unwrap().unwrap();
    assert_eq!(note.content, "local");
    assert_eq!(note.sync_status, SyncStatus::Pending);
}

#[tokio::test]
async fn remote_only_note_appears_locally_as_synced() {
    let h = Harness::new(true).await;
    h.remote.seed(remote_note("r1", "from another device", START - 100));

    let summary = h.sync.full_sync().await.unwrap();

    assert_eq!(summary.report.inserted, vec!["r1".to_string()]);
    assert_eq!(summary.notes.len(), 1);
    assert_eq!(summary.notes[0].sync_status, SyncStatus::Synced);
    assert_eq!(summary.notes[0].last_synced, Some(START));
}

#[tokio::test]
async fn newer_remote_copy_overwrites_synced_note() {
    let h = Harness::new(true).await;
    let created = h
        .sync
        .apply_mutation(NoteDraft::new("a", "mine"))
        .await
        .unwrap();
    h.remote
        .seed(remote_note(&created.id, "theirs", START + 5_000));

    let summary = h.sync.full_sync().await.unwrap();

    assert_eq!(summary.report.overwritten, vec![created.id.clone()]);
    let note = h.store.get(&created.id).await.unwrap().unwrap();
    assert_eq!(note.content, "theirs");
    assert_eq!(note.updated_at, START + 5_000);
}

#[tokio::test]
async fn offline_delete_is_not_undone_by_sync() {
    let h = Harness::new(true).await;
    let created = h
        .sync
        .apply_mutation(NoteDraft::new("a", "x"))
        .await
        .unwrap();
    h.sync.set_online(false).await.unwrap();
    h.sync.delete(&created.id).await.unwrap();
    h.sync.channel().publish(SyncMessage::ConnectionOnline);

    // Pull before the delete is replayed
    let summary = h.sync.full_sync().await.unwrap();
    assert_eq!(summary.report.kept_deleted, vec![created.id.clone()]);
    assert!(h.store.get(&created.id).await.unwrap().is_none());

    let outcome = h.sync.run_cycle().await.unwrap();
    assert!(outcome.replay.is_drained());
    assert_eq!(h.remote.len(), 0);
    assert!(h.sync.notes().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_pull_reports_error_state() {
    let h = Harness::new(true).await;
    h.remote.set_down(true);

    assert!(matches!(h.sync.full_sync().await, Err(Error::Unreachable(_))));

    let state = h.sync.state();
    assert!(matches!(state.phase, SyncPhase::Error { .. }));
    assert!(state.last_error.is_some());
    assert_eq!(state.last_sync, None);
}

// ============================================================================
// Startup and worker
// ============================================================================

#[tokio::test]
async fn load_replays_leftover_work_when_online() {
    let h = Harness::new(true).await;
    h.store
        .put(NoteDraft::new("left over", "from last session"))
        .await
        .unwrap();

    let report = h.sync.load().await.unwrap().unwrap();

    assert!(report.is_drained());
    assert_eq!(h.remote.len(), 1);
}

#[tokio::test]
async fn worker_dispatches_queued_messages() {
    let h = Harness::new(false).await;
    h.sync
        .apply_mutation(NoteDraft::new("a", "x"))
        .await
        .unwrap();

    let worker = SyncWorker::spawn(h.sync.clone());
    assert!(worker.online());
    assert!(worker.trigger());
    assert!(worker.trigger());
    worker.shutdown().await;

    assert_eq!(h.remote.len(), 1);
    assert_eq!(h.sync.state().phase, SyncPhase::Complete);
    assert_eq!(h.sync.state().pending_count, 0);
}
