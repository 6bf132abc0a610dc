use crate::*;
use tokio_util::sync::CancellationToken;
use xsend::{
    error::{SkipReason, TransferError},
    events::Stage,
    execution::{StepKind, StepOutcome, StepStatus},
    orchestrator::TransferWarning,
    storage::StorageApi,
};

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_submits_nothing() {
    let env = Environment::setup();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let request = request(1, 1);
    let err = env.orchestrator.send_with_cancel(request.clone(), cancel).await.unwrap_err();

    assert!(matches!(err, TransferError::Cancelled(id) if id == request.id));
    assert_eq!(env.source_sponsor.calls(), 0);
    assert_eq!(env.signer.calls(), 0);
    assert_eq!(env.submissions(), 0);
    assert!(env.storage.read_journal(request.id).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn cancel_while_settling_skips_delivery() {
    let env = Environment::setup();
    let mut events = env.orchestrator.subscribe();
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        async move {
            while let Ok(event) = events.recv().await {
                if event.stage == Stage::Settling(StepKind::SendToBridge) {
                    cancel.cancel();
                    break;
                }
            }
        }
    };

    let started = tokio::time::Instant::now();
    let (report, ()) =
        tokio::join!(env.orchestrator.send_with_cancel(request(1, 1), cancel), canceller);
    let report = report.unwrap();

    assert!(started.elapsed() < route().settling_delay);
    assert!(report.step(StepKind::Approve).unwrap().outcome.is_confirmed());
    assert!(report.step(StepKind::SendToBridge).unwrap().outcome.is_confirmed());
    assert_eq!(
        report.step(StepKind::Deliver).unwrap().outcome,
        StepOutcome::Skipped(SkipReason::Cancelled)
    );
    assert!(env.destination_bundler.submitted().is_empty());
    assert!(env.records.records().is_empty());
    assert_eq!(report.warnings, [TransferWarning::DeliverySkipped(SkipReason::Cancelled)]);
}

#[tokio::test(start_paused = true)]
async fn slow_observers_do_not_block_transfers() {
    let env = Environment::setup();
    // subscribed but never read
    let _events = env.orchestrator.subscribe();

    for _ in 0..8 {
        assert!(env.orchestrator.send(request(1, 1)).await.unwrap().is_success());
    }
    assert_eq!(env.records.records().len(), 8);
}

#[tokio::test(start_paused = true)]
async fn cancelled_delivery_runs_when_resent() {
    let env = Environment::setup();
    let mut events = env.orchestrator.subscribe();
    let cancel = CancellationToken::new();
    let request = request(1, 1);

    let canceller = {
        let cancel = cancel.clone();
        async move {
            while let Ok(event) = events.recv().await {
                if event.stage == Stage::Settling(StepKind::SendToBridge) {
                    cancel.cancel();
                    break;
                }
            }
        }
    };
    let (first, ()) =
        tokio::join!(env.orchestrator.send_with_cancel(request.clone(), cancel), canceller);
    assert!(first.unwrap().step(StepKind::Deliver).unwrap().outcome.is_skipped());

    let journal = env.storage.read_journal(request.id).await.unwrap().unwrap();
    assert_eq!(journal.status(2), StepStatus::Pending);

    let second = env.orchestrator.send(request.clone()).await.unwrap();

    assert!(second.is_success());
    assert_eq!(env.source_bundler.submitted(), [SOURCE_TOKEN, BRIDGE]);
    assert_eq!(env.destination_bundler.submitted(), [DESTINATION_TOKEN]);
    assert_eq!(env.signer.calls(), 1);
    assert_eq!(env.records.records().len(), 1);
}
