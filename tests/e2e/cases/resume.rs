use crate::*;
use xsend::{
    error::{StorageError, TransferError},
    execution::StepKind,
    storage::{StorageApi, TransferStorage},
    types::{DeliveryStatus, TransferId},
};

#[tokio::test(start_paused = true)]
async fn resending_the_same_id_does_not_resubmit() {
    let env = Environment::setup();
    let request = request(2, 2);

    let first = env.orchestrator.send(request.clone()).await.unwrap();
    let started = tokio::time::Instant::now();
    let second = env.orchestrator.send(request.clone()).await.unwrap();

    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(first.steps, second.steps);
    assert_eq!(env.submissions(), 3);
    assert_eq!(env.signer.calls(), 1);
    assert_eq!(env.records.saves(), 1);
    assert!(second.record.is_none());
    assert_eq!(second.history.len(), 1);
    // every step was already final, nothing to settle for
    assert!(started.elapsed() < route().settling_delay);

    let journal = env.storage.read_journal(request.id).await.unwrap().unwrap();
    assert!(journal.recorded);
    for order in 0..3 {
        assert!(journal.status(order).is_final());
    }
}

#[tokio::test(start_paused = true)]
async fn failed_record_is_retried_on_resume() {
    let env = Environment::setup();
    let request = request(2, 2);
    env.records.fail_saves();

    let first = env.orchestrator.send(request.clone()).await.unwrap();
    assert!(first.record.is_none());
    assert!(!env.storage.read_journal(request.id).await.unwrap().unwrap().recorded);

    // a fresh orchestrator with a working keeper, sharing the journal
    let retry = Environment::with(route(), env.storage.clone());
    let second = retry.orchestrator.send(request.clone()).await.unwrap();

    assert!(second.warnings.is_empty());
    assert_eq!(retry.submissions(), 0);
    assert_eq!(retry.signer.calls(), 0);
    let records = retry.records.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].delivery, Some(DeliveryStatus::Confirmed));
    assert!(env.storage.read_journal(request.id).await.unwrap().unwrap().recorded);
}

#[tokio::test(start_paused = true)]
async fn file_journal_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let request = request(1, 1);

    let before = Environment::with(route(), TransferStorage::file(dir.path()));
    before.destination_bundler.script(DESTINATION_TOKEN, Behavior::Never);
    let first = before.orchestrator.send(request.clone()).await.unwrap();
    assert_eq!(first.confirmed(), 2);
    assert_eq!(before.records.records()[0].delivery, Some(DeliveryStatus::Failed));
    drop(before);

    let after = Environment::with(route(), TransferStorage::file(dir.path()));
    let second = after.orchestrator.send(request.clone()).await.unwrap();

    assert_eq!(second.steps, first.steps);
    assert_eq!(after.submissions(), 0);
    assert_eq!(after.signer.calls(), 0);
    assert_eq!(after.records.saves(), 0);
}

#[tokio::test(start_paused = true)]
async fn journaled_request_wins_over_a_different_one() {
    let env = Environment::setup();
    let original = request(3, 3);
    env.orchestrator.send(original.clone()).await.unwrap();

    let changed = request(9, 9).with_id(original.id);
    let report = env.orchestrator.send(changed).await.unwrap();

    assert_eq!(report.id, original.id);
    assert_eq!(env.submissions(), 3);
    let journal = env.storage.read_journal(original.id).await.unwrap().unwrap();
    assert_eq!(journal.request, original);
}

#[tokio::test(start_paused = true)]
async fn failed_steps_are_final() {
    let env = Environment::setup();
    env.source_bundler.script(BRIDGE, Behavior::Never);
    let request = request(1, 1);

    let first = env.orchestrator.send(request.clone()).await.unwrap();
    assert!(first.step(StepKind::SendToBridge).unwrap().outcome.is_failed());
    assert!(first.step(StepKind::Deliver).unwrap().outcome.is_skipped());

    env.source_bundler.script(BRIDGE, Behavior::Confirm);
    let second = env.orchestrator.send(request).await.unwrap();

    assert_eq!(second.steps, first.steps);
    assert_eq!(env.source_bundler.submitted(), [SOURCE_TOKEN, BRIDGE]);
    assert!(env.destination_bundler.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn resuming_an_unknown_transfer_fails() {
    let env = Environment::setup();
    let id = TransferId::random();

    let err = env.orchestrator.resume(id).await.unwrap_err();

    assert!(matches!(
        err,
        TransferError::Storage(StorageError::UnknownTransfer(unknown)) if unknown == id
    ));
    assert_eq!(env.signer.calls(), 0);
    assert_eq!(env.submissions(), 0);
    assert!(env.storage.read_journal(id).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn resume_across_processes_needs_no_signature() {
    let dir = tempfile::tempdir().unwrap();
    let request = request(1, 1);

    let before = Environment::with(route(), TransferStorage::file(dir.path()));
    before.destination_bundler.script(DESTINATION_TOKEN, Behavior::Reject);
    let first = before.orchestrator.send(request.clone()).await.unwrap();
    assert!(first.step(StepKind::Deliver).unwrap().outcome.is_failed());
    drop(before);

    // same journal directory, fresh services
    let after = Environment::with(route(), TransferStorage::file(dir.path()));
    let second = after.orchestrator.resume(request.id).await.unwrap();

    assert_eq!(second.steps, first.steps);
    assert_eq!(after.submissions(), 0);
    assert_eq!(after.signer.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_sends_of_one_transfer_run_once() {
    let env = Environment::setup();
    let request = request(2, 2);

    let (first, second) = tokio::join!(
        env.orchestrator.send(request.clone()),
        env.orchestrator.send(request.clone())
    );

    assert!(first.unwrap().is_success());
    assert!(second.unwrap().is_success());
    assert_eq!(env.signer.calls(), 1);
    assert_eq!(env.submissions(), 3);
    assert_eq!(env.records.saves(), 1);
}
