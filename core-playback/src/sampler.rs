//! # Position Sampler
//!
//! A cancellable periodic task that runs one tick per interval while a
//! session is playing.
//!
//! The sampler knows nothing about decoders or events: the controller hands
//! it a tick function that reads the position and publishes it. What the
//! sampler guarantees is the timing contract:
//!
//! - the first tick fires one full interval after [`spawn`];
//! - missed ticks are skipped, never bursted;
//! - once the token is cancelled no new tick starts. A tick already running
//!   receives the same token and is expected to re-check it before
//!   publishing;
//! - a tick returning [`TickOutcome::Ended`] stops the task;
//! - dropping the [`SamplerHandle`] cancels the task.

use futures::future::BoxFuture;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Result of one sampler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A sample was published.
    Emitted,
    /// The sample was discarded; keep ticking.
    Dropped,
    /// The sampled session no longer exists; stop the sampler.
    Ended,
}

/// Handle to a running sampler task.
#[derive(Debug)]
pub struct SamplerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SamplerHandle {
    /// Requests cancellation. No tick starts after this returns.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Starts a sampler that calls `on_tick` every `period`.
///
/// `on_tick` receives a clone of the sampler's cancellation token so it can
/// verify, right before publishing, that it was not cancelled mid-tick.
pub fn spawn<F>(period: Duration, on_tick: F) -> SamplerHandle
where
    F: FnMut(CancellationToken) -> BoxFuture<'static, TickOutcome> + Send + 'static,
{
    let token = CancellationToken::new();
    let task = tokio::spawn(run(period, token.clone(), on_tick));
    SamplerHandle { token, task }
}

async fn run<F>(period: Duration, token: CancellationToken, mut on_tick: F)
where
    F: FnMut(CancellationToken) -> BoxFuture<'static, TickOutcome> + Send + 'static,
{
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        if token.is_cancelled() {
            break;
        }

        match on_tick(token.clone()).await {
            TickOutcome::Emitted => {}
            TickOutcome::Dropped => trace!("Sampler tick dropped"),
            TickOutcome::Ended => break,
        }
    }

    trace!("Sampler exited");
}
