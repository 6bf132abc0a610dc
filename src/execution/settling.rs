//! Settling policies.
//!
//! A step with a settling delay leaves the chain in a state that another system (e.g. a bridge)
//! has to pick up before the next step makes sense. The policy decides how long to wait after
//! such a step before moving on.

use serde::{Deserialize, Serialize};
use std::{fmt::Debug, time::Duration};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Reports whether the effect of a settling step has arrived, e.g. bridged tokens being credited.
#[async_trait::async_trait]
pub trait ArrivalProbe: Debug + Send + Sync {
    /// Returns `true` once the awaited effect is observable.
    async fn has_arrived(&self) -> eyre::Result<bool>;
}

/// How to wait after a step's settling delay.
///
/// Every strategy waits at least the step's delay. Without an [`ArrivalProbe`] every strategy
/// behaves like [`SettlingPolicy::Fixed`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SettlingPolicy {
    /// Wait exactly the settling delay.
    #[default]
    Fixed,
    /// After the delay, probe with exponentially growing pauses until arrival or `max_wait`.
    ExponentialBackoff {
        /// First pause after a negative probe.
        #[serde(with = "crate::serde::duration")]
        initial: Duration,
        /// Growth factor of the pause.
        factor: u32,
        /// Upper bound on the extra wait.
        #[serde(with = "crate::serde::duration")]
        max_wait: Duration,
    },
    /// After the delay, probe at a fixed interval until arrival or `timeout`.
    Polling {
        /// Pause between probes.
        #[serde(with = "crate::serde::duration")]
        interval: Duration,
        /// Upper bound on the extra wait.
        #[serde(with = "crate::serde::duration")]
        timeout: Duration,
    },
}

impl SettlingPolicy {
    /// Waits `delay`, then keeps waiting per strategy until `probe` reports arrival.
    ///
    /// Returns whether arrival was observed. Probe errors count as "not yet".
    pub async fn settle(&self, delay: Duration, probe: Option<&dyn ArrivalProbe>) -> bool {
        sleep(delay).await;

        let Some(probe) = probe else { return true };
        let (mut pause, factor, max_wait) = match *self {
            Self::Fixed => return true,
            Self::ExponentialBackoff { initial, factor, max_wait } => {
                (initial, factor.max(1), max_wait)
            }
            Self::Polling { interval, timeout } => (interval, 1, timeout),
        };

        let deadline = Instant::now() + max_wait;
        loop {
            if arrived(probe).await {
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(?max_wait, "Arrival not observed, moving on");
                return false;
            }
            sleep(pause.min(deadline - now)).await;
            pause = pause.saturating_mul(factor);
        }
    }
}

async fn arrived(probe: &dyn ArrivalProbe) -> bool {
    probe.has_arrived().await.unwrap_or_else(|err| {
        warn!(%err, "Arrival probe failed");
        false
    })
}
