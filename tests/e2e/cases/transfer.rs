use crate::*;
use alloy::primitives::U256;
use std::time::Duration;
use xsend::{
    config::RouteConfig,
    error::TransferError,
    events::Stage,
    execution::{StepKind, StepOutcome},
    orchestrator::TransferWarning,
    signers::PayloadSigner,
    storage::TransferStorage,
    types::DeliveryStatus,
};

#[tokio::test(start_paused = true)]
async fn delivers_and_records() {
    let env = Environment::setup();
    let mut events = env.orchestrator.subscribe();

    let request = request(5, 4);
    let report = env.orchestrator.send(request.clone()).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.confirmed(), 3);
    assert!(report.warnings.is_empty());
    assert_eq!(
        report.steps.iter().map(|step| step.kind).collect::<Vec<_>>(),
        [StepKind::Approve, StepKind::SendToBridge, StepKind::Deliver]
    );

    // one signature for the whole batch
    assert_eq!(env.signer.calls(), 1);
    assert_eq!(env.source_sponsor.calls(), 2);
    assert_eq!(env.destination_sponsor.calls(), 1);
    assert_eq!(env.source_bundler.submitted(), [SOURCE_TOKEN, BRIDGE]);
    assert_eq!(env.destination_bundler.submitted(), [DESTINATION_TOKEN]);

    let records = env.records.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    // recorded for the smart account that delivered, not the signing owner
    assert_eq!(record.wallet_address, DESTINATION_ACCOUNT);
    assert_ne!(record.wallet_address, env.signer.address());
    assert_eq!(record.receiver_address, RECEIVER);
    assert_eq!(record.amount_sent, U256::from(4 * ONE));
    assert_eq!(record.delivery, Some(DeliveryStatus::Confirmed));
    assert_eq!(report.record.as_ref(), Some(record));
    assert_eq!(report.history, records);

    let stages: Vec<_> = drain(&mut events)
        .into_iter()
        .inspect(|event| assert_eq!(event.transfer, request.id))
        .map(|event| event.stage)
        .collect();
    assert_eq!(stages.first(), Some(&Stage::Preparing));
    assert!(stages.contains(&Stage::Signing));
    assert!(stages.contains(&Stage::Settling(StepKind::SendToBridge)));
    assert!(stages.contains(&Stage::Recorded));
    assert_eq!(stages.last(), Some(&Stage::Completed));

    let confirmed: Vec<_> = stages
        .iter()
        .filter_map(|stage| match stage {
            Stage::Confirmed(kind) => Some(*kind),
            _ => None,
        })
        .collect();
    assert_eq!(confirmed, [StepKind::Approve, StepKind::SendToBridge, StepKind::Deliver]);
}

#[tokio::test(start_paused = true)]
async fn waits_for_settling_before_delivery() {
    let env = Environment::setup();
    let started = tokio::time::Instant::now();

    env.orchestrator.send(request(1, 1)).await.unwrap();

    assert!(started.elapsed() >= route().settling_delay);
}

#[tokio::test(start_paused = true)]
async fn skips_settling_without_delay() {
    let env = Environment::with(
        RouteConfig { settling_delay: Duration::ZERO, ..route() },
        TransferStorage::in_memory(),
    );
    let mut events = env.orchestrator.subscribe();

    let report = env.orchestrator.send(request(1, 1)).await.unwrap();

    assert!(report.is_success());
    assert!(
        !drain(&mut events)
            .iter()
            .any(|event| matches!(event.stage, Stage::Settling(_)))
    );
}

#[tokio::test(start_paused = true)]
async fn record_failure_is_a_warning() {
    let env = Environment::setup();
    env.records.fail_saves();

    let report = env.orchestrator.send(request(2, 2)).await.unwrap();

    assert!(report.is_success());
    assert!(report.record.is_none());
    assert_eq!(env.records.saves(), 1);
    assert!(matches!(
        report.warnings.as_slice(),
        [TransferWarning::RecordPersistenceFailure(reason)] if reason.contains("500")
    ));
    // history is still fetched
    assert!(report.history.is_empty());
}

#[tokio::test(start_paused = true)]
async fn history_failure_is_a_warning() {
    let env = Environment::setup();
    env.records.fail_history();

    let report = env.orchestrator.send(request(2, 2)).await.unwrap();

    assert!(report.is_success());
    assert!(report.record.is_some());
    assert_eq!(env.records.records().len(), 1);
    assert!(matches!(report.warnings.as_slice(), [TransferWarning::HistoryUnavailable(_)]));
}

#[tokio::test(start_paused = true)]
async fn independent_delivery_runs_after_bridge_failure() {
    let env = Environment::with(
        RouteConfig { deliver_requires_bridge: false, ..route() },
        TransferStorage::in_memory(),
    );
    env.source_bundler.script(BRIDGE, Behavior::Revert);

    let report = env.orchestrator.send(request(3, 3)).await.unwrap();

    assert!(report.step(StepKind::Approve).unwrap().outcome.is_confirmed());
    assert!(report.step(StepKind::SendToBridge).unwrap().outcome.is_failed());
    assert!(report.step(StepKind::Deliver).unwrap().outcome.is_confirmed());
    assert_eq!(env.destination_bundler.submitted(), [DESTINATION_TOKEN]);
    assert_eq!(env.records.records()[0].delivery, Some(DeliveryStatus::Confirmed));
}

#[tokio::test]
async fn rejects_invalid_amounts() {
    let env = Environment::setup();

    let err = env.orchestrator.send(request(0, 1)).await.unwrap_err();
    assert!(matches!(err, TransferError::InvalidAmount));
    let err = env.orchestrator.send(request(1, 0)).await.unwrap_err();
    assert!(matches!(err, TransferError::InvalidAmount));

    let strict = Environment::with(
        RouteConfig { require_equal_amounts: true, ..route() },
        TransferStorage::in_memory(),
    );
    let err = strict.orchestrator.send(request(5, 4)).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::AmountMismatch { source_amount, destination_amount }
            if source_amount == U256::from(5 * ONE) && destination_amount == U256::from(4 * ONE)
    ));

    for env in [env, strict] {
        assert_eq!(env.source_sponsor.calls(), 0);
        assert_eq!(env.signer.calls(), 0);
        assert_eq!(env.submissions(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn confirmed_receipts_are_reported() {
    let env = Environment::setup();

    let report = env.orchestrator.send(request(1, 1)).await.unwrap();

    let StepOutcome::Confirmed(receipt) = &report.step(StepKind::Deliver).unwrap().outcome else {
        panic!("delivery not confirmed");
    };
    assert_eq!(receipt.sender, DESTINATION_ACCOUNT);
    assert!(receipt.success);
}
