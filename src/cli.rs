//! # xsend CLI
use crate::{
    config::SendConfig,
    execution::StepOutcome,
    session::{Session, SessionStore},
    signers::DynSigner,
    spawn::{XsendHandle, try_spawn_with_args},
    types::{TransferId, TransferRecord, TransferRequest},
};
use alloy::primitives::{
    Address, U256,
    utils::{format_units, parse_units},
};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, time::Duration};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

/// Sponsored cross-chain token transfers through smart accounts.
#[derive(Debug, Parser)]
#[command(author, version, about = "xsend", long_about = None)]
pub struct Args {
    /// The configuration file.
    ///
    /// If missing, a default one is written to this path to be filled in.
    #[arg(long, value_name = "CONFIG", env = "XSEND_CONFIG", default_value = "xsend.yaml")]
    pub config: PathBuf,
    /// Private key of the smart account owner.
    #[arg(
        long = "signer-key",
        value_name = "SECRET_KEY",
        env = "XSEND_SIGNER_KEY",
        conflicts_with = "signer_mnemonic"
    )]
    pub signer_key: Option<String>,
    /// Mnemonic of the smart account owner.
    #[arg(long = "signer-mnemonic", value_name = "MNEMONIC", env = "XSEND_SIGNER_MNEMONIC")]
    pub signer_mnemonic: Option<String>,
    /// Derivation index used with `--signer-mnemonic`.
    #[arg(long = "signer-index", value_name = "INDEX", default_value_t = 0)]
    pub signer_index: u32,
    /// Base URL of the record-keeping service.
    #[arg(long = "records-url", value_name = "URL", env = "XSEND_RECORDS_URL")]
    pub records_url: Option<Url>,
    /// Directory to journal transfers in, making them resumable across runs.
    #[arg(long = "journal-dir", value_name = "DIR", env = "XSEND_JOURNAL_DIR")]
    pub journal_dir: Option<PathBuf>,
    /// Minimum wait between the bridge send and the destination transfer, e.g. `2m` or `90`.
    #[arg(long = "settling-delay", value_name = "DURATION", value_parser = parse_duration)]
    pub settling_delay: Option<Duration>,
    /// How long to wait for each operation to be included, e.g. `3m`.
    #[arg(long = "confirmation-timeout", value_name = "DURATION", value_parser = parse_duration)]
    pub confirmation_timeout: Option<Duration>,
    /// The session cache file.
    #[arg(long = "session", value_name = "PATH", env = "XSEND_SESSION")]
    pub session: Option<PathBuf>,
    /// The command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send tokens to a receiver on the destination chain.
    Send {
        /// Receiver on the destination chain.
        receiver: Address,
        /// Amount taken from the source chain, in whole tokens (e.g. `2.5`).
        amount: String,
        /// Amount delivered on the destination chain. Defaults to `amount`.
        #[arg(long = "destination-amount", value_name = "AMOUNT")]
        destination_amount: Option<String>,
    },
    /// Resume an earlier transfer from its journal, without signing again.
    Resume {
        /// Id printed when the transfer was sent.
        id: TransferId,
    },
    /// Show the transfer history of the smart account.
    History,
    /// Show smart account balances on every chain with an endpoint.
    Balances,
    /// Forget the cached session.
    Logout,
}

impl Args {
    /// Runs the command.
    pub async fn run(self) -> eyre::Result<()> {
        if let Command::Logout = self.command {
            let config = SendConfig::load_from_file(&self.config).unwrap_or_default();
            let config = self.merge_send_config(config);
            SessionStore::new(config.session.path).clear().await?;
            println!("Logged out");
            return Ok(());
        }

        let handle = try_spawn_with_args(&self, &self.config)?;
        match self.command {
            Command::Send { receiver, amount, destination_amount } => {
                let decimals = handle.config.route.token_decimals;
                let amount_from_source = parse_amount(&amount, decimals)?;
                let amount_to_destination = match destination_amount {
                    Some(amount) => parse_amount(&amount, decimals)?,
                    None => amount_from_source,
                };
                let request =
                    TransferRequest::new(receiver, amount_from_source, amount_to_destination);
                send(&handle, request).await
            }
            Command::Resume { id } => {
                let journal = handle.orchestrator.journal(id).await?;
                send(&handle, journal.request).await
            }
            Command::History => {
                let history = handle.records.history(handle.wallet).await?;
                print_history(&history, handle.config.route.token_decimals);
                update_session(&handle, |session| session.with_transactions(history)).await;
                Ok(())
            }
            Command::Balances => {
                if handle.balances.is_empty() {
                    eyre::bail!("no chain has an RPC endpoint configured");
                }
                let balances = handle.balances.read().await?;
                let decimals = handle.config.route.token_decimals;
                for (chain_id, balance) in &balances.chains {
                    let name = &handle.config.chains[chain_id].name;
                    match balance.token {
                        Some(token) => println!(
                            "{chain_id:>10} {name:<20} {} native, {} {}",
                            format_units(balance.native, 18u8)?,
                            format_amount(token, decimals),
                            handle.config.route.token_symbol
                        ),
                        None => println!(
                            "{chain_id:>10} {name:<20} {} native",
                            format_units(balance.native, 18u8)?
                        ),
                    }
                }
                println!(
                    "total: {} {}",
                    format_amount(balances.token_total(), decimals),
                    handle.config.route.token_symbol
                );
                update_session(&handle, |session| session.with_balances(balances)).await;
                Ok(())
            }
            Command::Logout => Ok(()),
        }
    }

    /// Merges [`Args`] values into an existing [`SendConfig`] instance.
    pub fn merge_send_config(&self, mut config: SendConfig) -> SendConfig {
        if let Some(url) = &self.records_url {
            config = config.with_records_url(url.clone());
        }
        if let Some(delay) = self.settling_delay {
            config = config.with_settling_delay(delay);
        }
        if let Some(timeout) = self.confirmation_timeout {
            config = config.with_confirmation_timeout(timeout);
        }
        if let Some(path) = &self.session {
            config = config.with_session_path(path.clone());
        }
        if let Some(dir) = &self.journal_dir {
            config = config.with_journal_dir(dir.clone());
        }
        config
    }

    /// Loads the owner's signer from the key or mnemonic argument.
    pub fn signer(&self) -> eyre::Result<DynSigner> {
        match (&self.signer_key, &self.signer_mnemonic) {
            (Some(key), _) => DynSigner::from_signing_key(key),
            (None, Some(phrase)) => DynSigner::from_mnemonic(phrase, self.signer_index),
            (None, None) => {
                eyre::bail!("either --signer-key or --signer-mnemonic is required")
            }
        }
    }
}

async fn send(handle: &XsendHandle, request: TransferRequest) -> eyre::Result<()> {
    let orchestrator = &handle.orchestrator;
    let decimals = orchestrator.route().token_decimals;

    if let Some(session) = handle.session.load().await
        && let Err(err) = session.validate(handle.accounts.as_ref()).await
    {
        warn!(%err, "Cached session is stale, it will be replaced");
    }

    let mut progress = orchestrator.subscribe();
    tokio::spawn(async move {
        loop {
            match progress.recv().await {
                Ok(event) => {
                    info!(transfer_id = %event.transfer, stage = %event.stage, "{}", event.message)
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Progress output fell behind")
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no further steps will be submitted");
            on_interrupt.cancel();
        }
    });

    println!(
        "Sending {} from chain {} to {} on chain {} (transfer {})",
        format_amount(request.amount_from_source, decimals),
        orchestrator.route().source_chain,
        request.receiver,
        orchestrator.route().destination_chain,
        request.id,
    );

    let report = orchestrator.send_with_cancel(request, cancel).await?;
    for step in &report.steps {
        println!("{:>2} {:<15} {}", step.order, step.kind.to_string(), describe(&step.outcome));
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    println!(
        "{} confirmed, {} failed, {} skipped",
        report.confirmed(),
        report.failed(),
        report.skipped()
    );

    if !report.history.is_empty() {
        print_history(&report.history, decimals);
    }
    let history = report.history.clone();
    update_session(handle, |session| session.with_transactions(history)).await;

    if !report.is_success() {
        eyre::bail!("transfer {} did not complete, run `xsend resume {}` to continue", report.id, report.id);
    }
    Ok(())
}

fn describe(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Confirmed(receipt) => {
            format!("confirmed in {}", receipt.receipt.transaction_hash)
        }
        StepOutcome::Failed(failure) => format!("failed: {failure}"),
        StepOutcome::Skipped(reason) => format!("skipped: {reason}"),
    }
}

fn print_history(history: &[TransferRecord], decimals: u8) {
    for record in history {
        println!(
            "{} {} -> {} {}{}",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.wallet_address,
            record.receiver_address,
            format_amount(record.amount_sent, decimals),
            record.delivery.map(|delivery| format!(" ({delivery})")).unwrap_or_default(),
        );
    }
}

/// Refreshes the session cache. Failures only warn: the session is a cache.
async fn update_session(handle: &XsendHandle, update: impl FnOnce(Session) -> Session) {
    let accounts =
        handle.config.chains.iter().map(|(&chain_id, chain)| (chain_id, chain.account)).collect();

    let session = match handle.session.load().await {
        Some(session)
            if session.main_address == handle.owner
                && session.validate(handle.accounts.as_ref()).await.is_ok() =>
        {
            session
        }
        _ => Session::new(handle.owner, accounts),
    };

    if let Err(err) = handle.session.save(&update(session)).await {
        warn!(%err, "Failed to save session");
    }
}

/// Parses a token amount in whole units into base units.
fn parse_amount(amount: &str, decimals: u8) -> eyre::Result<U256> {
    if amount.trim_start().starts_with('-') {
        eyre::bail!("amount must not be negative: {amount}");
    }
    Ok(parse_units(amount, decimals)?.get_absolute())
}

/// Formats a base unit amount with `decimals` decimals, e.g. `2500000` with 6 as `2.5`.
fn format_amount(amount: U256, decimals: u8) -> String {
    let formatted = format_units(amount, decimals).unwrap_or_else(|_| amount.to_string());
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() { whole.to_string() } else { format!("{whole}.{fraction}") }
        }
        None => formatted,
    }
}

/// Parses `90`, `90s`, `1500ms` or `2m` to a [`Duration`].
fn parse_duration(arg: &str) -> Result<Duration, String> {
    crate::serde::duration::parse(arg)
}
