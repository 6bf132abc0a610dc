//! Progress notifications.
//!
//! Events are published on a broadcast channel. Observers may subscribe at any time, fall behind
//! or go away; none of that affects the transfer.

use crate::{constants::PROGRESS_CHANNEL_CAPACITY, execution::StepKind, types::TransferId};
use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;

/// Where a transfer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Building and sponsoring operations.
    Preparing,
    /// About to ask the owner for the batch signature.
    Signing,
    /// A step was accepted by its bundler.
    Submitted(StepKind),
    /// Waiting after a step before the next one.
    Settling(StepKind),
    /// A step confirmed.
    Confirmed(StepKind),
    /// A step failed.
    Failed(StepKind),
    /// A step was skipped.
    Skipped(StepKind),
    /// The transfer record was persisted.
    Recorded,
    /// The plan ran to completion.
    Completed,
    /// The transfer stopped before anything was submitted.
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preparing => f.write_str("preparing"),
            Self::Signing => f.write_str("signing"),
            Self::Submitted(kind) => write!(f, "{kind} submitted"),
            Self::Settling(kind) => write!(f, "{kind} settling"),
            Self::Confirmed(kind) => write!(f, "{kind} confirmed"),
            Self::Failed(kind) => write!(f, "{kind} failed"),
            Self::Skipped(kind) => write!(f, "{kind} skipped"),
            Self::Recorded => f.write_str("recorded"),
            Self::Completed => f.write_str("completed"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// A progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// The transfer the event belongs to.
    pub transfer: TransferId,
    /// The stage reached.
    pub stage: Stage,
    /// Human readable description.
    pub message: String,
}

/// Publishes [`ProgressEvent`]s.
#[derive(Debug, Clone)]
pub struct ProgressNotifier {
    tx: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressNotifier {
    fn default() -> Self {
        Self::new(PROGRESS_CHANNEL_CAPACITY)
    }
}

impl ProgressNotifier {
    /// Creates a notifier buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self { tx: broadcast::channel(capacity).0 }
    }

    /// Subscribes to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event. Never fails, even without subscribers.
    pub fn notify(&self, transfer: TransferId, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        debug!(%transfer, %stage, %message, "Progress");
        let _ = self.tx.send(ProgressEvent { transfer, stage, message });
    }
}
