use crate::*;
use xsend::{
    error::{SigningError, SkipReason, SponsorshipError, StepFailure, TransferError},
    events::Stage,
    execution::{StepKind, StepOutcome},
    orchestrator::TransferWarning,
    storage::StorageApi,
    types::DeliveryStatus,
};

#[tokio::test(start_paused = true)]
async fn declined_sponsorship_aborts_before_signing() {
    let env = Environment::setup();
    env.source_sponsor.decline(SOURCE_TOKEN);
    let mut events = env.orchestrator.subscribe();

    let request = request(1, 1);
    let err = env.orchestrator.send(request.clone()).await.unwrap_err();

    assert!(matches!(
        err,
        TransferError::SponsorshipDeclined(SponsorshipError::Declined { chain_id: SOURCE_CHAIN, .. })
    ));
    assert_eq!(env.signer.calls(), 0);
    assert_eq!(env.submissions(), 0);
    assert!(env.records.records().is_empty());
    assert!(env.storage.read_journal(request.id).await.unwrap().is_none());

    let stages: Vec<_> = drain(&mut events).into_iter().map(|event| event.stage).collect();
    assert!(!stages.contains(&Stage::Signing));
    assert_eq!(stages.last(), Some(&Stage::Aborted));
}

#[tokio::test(start_paused = true)]
async fn delivery_timeout_is_recorded_as_failed() {
    let env = Environment::setup();
    env.destination_bundler.script(DESTINATION_TOKEN, Behavior::Never);

    let report = env.orchestrator.send(request(2, 2)).await.unwrap();

    assert_eq!(report.confirmed(), 2);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.step(StepKind::Deliver).unwrap().outcome,
        StepOutcome::Failed(StepFailure::Timeout { waited_secs: 180, .. })
    ));

    let records = env.records.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].delivery, Some(DeliveryStatus::Failed));
    assert!(report.warnings.is_empty());
}

#[tokio::test(start_paused = true)]
async fn reverted_approve_skips_remaining_steps() {
    let env = Environment::setup();
    env.source_bundler.script(SOURCE_TOKEN, Behavior::Revert);

    let report = env.orchestrator.send(request(2, 2)).await.unwrap();

    assert!(matches!(
        &report.step(StepKind::Approve).unwrap().outcome,
        StepOutcome::Failed(StepFailure::Reverted { reason: Some(reason), .. })
            if reason.contains("allowance")
    ));
    assert_eq!(
        report.step(StepKind::SendToBridge).unwrap().outcome,
        StepOutcome::Skipped(SkipReason::DependencyNotConfirmed { order: 0 })
    );
    assert_eq!(
        report.step(StepKind::Deliver).unwrap().outcome,
        StepOutcome::Skipped(SkipReason::DependencyNotConfirmed { order: 1 })
    );

    assert_eq!(env.source_bundler.submitted(), [SOURCE_TOKEN]);
    assert!(env.destination_bundler.submitted().is_empty());
    assert!(env.records.records().is_empty());
    assert_eq!(
        report.warnings,
        [TransferWarning::DeliverySkipped(SkipReason::DependencyNotConfirmed { order: 1 })]
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_bridge_send_skips_delivery() {
    let env = Environment::setup();
    env.source_bundler.script(BRIDGE, Behavior::Reject);
    let started = tokio::time::Instant::now();

    let report = env.orchestrator.send(request(2, 2)).await.unwrap();

    assert!(matches!(
        report.step(StepKind::SendToBridge).unwrap().outcome,
        StepOutcome::Failed(StepFailure::Submission { attempts: 1, .. })
    ));
    assert!(report.step(StepKind::Deliver).unwrap().outcome.is_skipped());
    assert!(env.destination_bundler.submitted().is_empty());
    // nothing reached the chain, so there was nothing to settle
    assert!(started.elapsed() < route().settling_delay);
}

#[tokio::test(start_paused = true)]
async fn declined_destination_sponsorship_submits_nothing() {
    let env = Environment::setup();
    env.destination_sponsor.decline(DESTINATION_TOKEN);

    let err = env.orchestrator.send(request(1, 1)).await.unwrap_err();

    assert!(matches!(err, TransferError::SponsorshipDeclined(ref err) if err.is_declined()));
    assert_eq!(env.submissions(), 0);
    assert_eq!(env.signer.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn rejected_signature_submits_nothing() {
    let env = Environment::setup();
    env.signer.reject();
    let mut events = env.orchestrator.subscribe();

    let request = request(1, 1);
    let err = env.orchestrator.send(request.clone()).await.unwrap_err();

    assert!(matches!(err, TransferError::SigningRejected(SigningError::Rejected(_))));
    assert_eq!(env.signer.calls(), 1);
    assert_eq!(env.submissions(), 0);
    assert!(env.records.records().is_empty());
    assert!(env.storage.read_journal(request.id).await.unwrap().is_none());

    let stages: Vec<_> = drain(&mut events).into_iter().map(|event| event.stage).collect();
    assert!(stages.contains(&Stage::Signing));
    assert_eq!(stages.last(), Some(&Stage::Aborted));
}
