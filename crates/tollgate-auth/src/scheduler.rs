//! Background refresh loop for the access token.
//!
//! A single dedicated task owns all writes to the [`TokenStore`]. The loop is
//! an explicit state machine driven by one `select!` per iteration, merging
//! the cancellation signal, the one pending timer (scheduled refresh or retry)
//! and a periodic safety-net tick.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::exchange::SharedExchanger;
use crate::store::TokenStore;
use crate::token::AccessToken;

/// Early-wake margin subtracted from the upstream's `refresh_in` hint. Guards
/// against clock skew and network latency eating into the validity window.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(10);

/// Fixed delay before retrying a failed exchange.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Safety-net tick period. If the stored token is invalid when the tick
/// fires, an exchange runs immediately regardless of the pending timer.
pub const SAFETY_TICK: Duration = Duration::from_secs(10);

/// Smallest positive delay until the next scheduled refresh.
pub const MIN_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Scheduler state. At most one timer is pending at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    /// No exchange attempted yet; refresh immediately, without a timer.
    AwaitingFirstRefresh,
    /// Last exchange succeeded; next refresh at the contained instant.
    Scheduled(Instant),
    /// Last exchange failed; retry at the contained instant.
    RetryPending(Instant),
    /// Cancellation observed; the loop exits.
    Stopped,
}

/// Owns the refresh loop and the sole write handle to the token store.
#[derive(Debug)]
pub struct RefreshScheduler {
    store: TokenStore,
    exchanger: SharedExchanger,
    state: SchedulerState,
}

impl RefreshScheduler {
    /// Create a scheduler writing into `store` via `exchanger`.
    pub fn new(store: TokenStore, exchanger: SharedExchanger) -> Self {
        Self {
            store,
            exchanger,
            state: SchedulerState::AwaitingFirstRefresh,
        }
    }

    /// Run the refresh loop until `cancel` fires.
    ///
    /// An exchange in flight when cancellation fires is allowed to complete,
    /// but its result is discarded.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval_at(Instant::now() + SAFETY_TICK, SAFETY_TICK);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            match self.state {
                SchedulerState::AwaitingFirstRefresh => {
                    self.refresh_once(&cancel).await;
                }
                SchedulerState::Scheduled(at) | SchedulerState::RetryPending(at) => {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            self.state = SchedulerState::Stopped;
                        }
                        _ = tokio::time::sleep_until(at) => {
                            self.refresh_once(&cancel).await;
                        }
                        _ = tick.tick() => {
                            if !self.store.ready() {
                                self.refresh_once(&cancel).await;
                            }
                        }
                    }
                }
                SchedulerState::Stopped => {
                    tracing::debug!("refresh scheduler stopped");
                    return;
                }
            }
        }
    }

    /// Perform one exchange and apply its outcome.
    async fn refresh_once(&mut self, cancel: &CancellationToken) {
        let result = self.exchanger.exchange().await;
        if cancel.is_cancelled() {
            // Shutdown raced the exchange; drop the result.
            self.state = SchedulerState::Stopped;
            return;
        }
        self.apply(result);
    }

    /// Apply an exchange outcome: install on success, back off on failure.
    /// The store is never modified on failure.
    fn apply(&mut self, result: Result<AccessToken>) {
        match result {
            Ok(token) => {
                let delay = delay_after_success(token.refresh_in);
                tracing::info!(
                    expires_at = token.expires_at,
                    refresh_in = token.refresh_in,
                    next_refresh_secs = delay.as_secs(),
                    "token refreshed"
                );
                self.store.install(token);
                self.state = SchedulerState::Scheduled(Instant::now() + delay);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    retry_secs = RETRY_DELAY.as_secs(),
                    "token refresh failed"
                );
                self.state = SchedulerState::RetryPending(Instant::now() + RETRY_DELAY);
            }
        }
    }
}

/// Delay until the next scheduled refresh: the upstream hint minus the
/// early-wake margin, clamped to a minimal positive delay.
fn delay_after_success(refresh_in: i64) -> Duration {
    let margin = REFRESH_MARGIN.as_secs() as i64;
    let secs = refresh_in.saturating_sub(margin);
    if secs < MIN_REFRESH_DELAY.as_secs() as i64 {
        MIN_REFRESH_DELAY
    } else {
        Duration::from_secs(secs as u64)
    }
}
