//! Wiring of the transfer services.
use crate::{
    accounts::{AccountResolver, Accounts},
    balances::BalanceReader,
    cli::Args,
    config::SendConfig,
    events::ProgressNotifier,
    execution::ExecutionSequencer,
    orchestrator::TransferOrchestrator,
    records::{HttpRecordKeeper, RecordKeeper},
    session::SessionStore,
    signers::{MultiChainSigner, PayloadSigner},
    storage::TransferStorage,
};
use alloy::primitives::Address;
use std::{path::Path, sync::Arc};
use tracing::info;

/// Everything a command needs, built from one [`SendConfig`].
#[derive(Debug, Clone)]
pub struct XsendHandle {
    /// The configuration the services were built from.
    pub config: SendConfig,
    /// Smart account handles.
    pub accounts: Arc<Accounts>,
    /// The orchestrator.
    pub orchestrator: Arc<TransferOrchestrator>,
    /// Transfer journal.
    pub storage: TransferStorage,
    /// Record-keeping service.
    pub records: Arc<dyn RecordKeeper>,
    /// Balance reader.
    pub balances: BalanceReader,
    /// Session cache.
    pub session: SessionStore,
    /// Progress events of all transfers.
    pub events: ProgressNotifier,
    /// The owner signing for the smart accounts.
    pub owner: Address,
    /// The smart account delivering on the destination chain, which transfers are recorded for.
    pub wallet: Address,
}

/// Loads the configuration file, merges CLI values into it and wires the services.
///
/// A missing configuration file is created with default values, which do not describe any route,
/// so this fails asking to fill it in.
pub fn try_spawn_with_args<P: AsRef<Path>>(
    args: &Args,
    config_path: P,
) -> eyre::Result<XsendHandle> {
    let config_path = config_path.as_ref();
    if !config_path.exists() {
        SendConfig::default().save_to_file(config_path)?;
        eyre::bail!(
            "no configuration found, wrote defaults to {}; configure chains and route first",
            config_path.display()
        );
    }

    let config = args.merge_send_config(SendConfig::load_from_file(config_path)?);
    let signer = args.signer()?;
    try_spawn(config, Arc::new(signer))
}

/// Wires the services for `config`, signing with `signer`.
pub fn try_spawn(config: SendConfig, signer: Arc<dyn PayloadSigner>) -> eyre::Result<XsendHandle> {
    config.validate()?;

    info!(dir = %config.journal.dir.display(), "Using file journal.");
    let storage = TransferStorage::file(config.journal.dir.clone());
    let wallet = config
        .chains
        .get(&config.route.destination_chain)
        .map(|chain| chain.account)
        .ok_or_else(|| eyre::eyre!("destination chain is not configured"))?;

    let accounts = Arc::new(Accounts::from_config(&config));
    let resolver: Arc<dyn AccountResolver> = accounts.clone();
    let events = ProgressNotifier::default();
    let balances = BalanceReader::from_config(&config);
    let records: Arc<dyn RecordKeeper> =
        Arc::new(HttpRecordKeeper::new(reqwest::Client::new(), config.records.base_url.clone()));

    let signer =
        MultiChainSigner::new(signer, config.signing.validation_module, config.signing.validity);
    let owner = signer.owner();

    let sequencer = ExecutionSequencer::new(
        resolver.clone(),
        storage.clone(),
        events.clone(),
        config.execution.clone(),
    );
    let orchestrator = TransferOrchestrator::new(
        config.route.clone(),
        resolver,
        signer,
        sequencer,
        storage.clone(),
        records.clone(),
        events.clone(),
    )
    .with_balances(balances.clone());

    info!(
        %owner,
        %wallet,
        source_chain = config.route.source_chain,
        destination_chain = config.route.destination_chain,
        "Transfer services ready"
    );

    Ok(XsendHandle {
        session: SessionStore::new(config.session.path.clone()),
        config,
        accounts,
        orchestrator: Arc::new(orchestrator),
        storage,
        records,
        balances,
        events,
        owner,
        wallet,
    })
}
