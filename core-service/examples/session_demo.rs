//! Player session demonstration
//!
//! Drives a simulated decoder through the full command/event loop: play,
//! pause, resume, natural completion and shutdown.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run -p core-service --example session_demo
//!
//! # JSON format, with sampler ticks
//! cargo run -p core-service --example session_demo -- json "core_playback=trace"
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::playback::{DecoderListener, MediaDecoder, MediaLocator};
use bridge_traits::time::LogLevel;
use core_runtime::config::PlayerConfig;
use core_runtime::events::PlayerEvent;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{PlaybackProgress, PlayerService};
use parking_lot::Mutex;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::info;

/// Decoder that "renders" by watching the clock.
struct SimulatedDecoder {
    duration: Duration,
    inner: Mutex<Simulation>,
}

#[derive(Default)]
struct Simulation {
    listener: Option<Arc<dyn DecoderListener>>,
    played: Duration,
    resumed_at: Option<Instant>,
    pending: Option<JoinHandle<()>>,
}

impl Simulation {
    fn position(&self) -> Duration {
        self.played + self.resumed_at.map_or(Duration::ZERO, |at| at.elapsed())
    }

    fn cancel_pending(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl SimulatedDecoder {
    fn new(duration: Duration) -> Self {
        Self {
            duration,
            inner: Mutex::new(Simulation::default()),
        }
    }
}

fn notify_after(delay: Duration, notify: impl FnOnce() + Send + 'static) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep(delay).await;
        notify();
    })
}

#[async_trait]
impl MediaDecoder for SimulatedDecoder {
    async fn load(
        &self,
        locator: &MediaLocator,
        listener: Arc<dyn DecoderListener>,
    ) -> BridgeResult<()> {
        info!(media = locator.display_name(), "Simulated load");
        let mut sim = self.inner.lock();
        sim.listener = Some(listener.clone());
        sim.pending = Some(notify_after(Duration::from_millis(300), move || {
            listener.on_ready()
        }));
        Ok(())
    }

    async fn start(&self) -> BridgeResult<()> {
        let mut sim = self.inner.lock();
        sim.cancel_pending();
        sim.resumed_at = Some(Instant::now());
        let remaining = self.duration.saturating_sub(sim.played);
        if let Some(listener) = sim.listener.clone() {
            sim.pending = Some(notify_after(remaining, move || listener.on_finished()));
        }
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        let mut sim = self.inner.lock();
        sim.cancel_pending();
        sim.played = sim.position();
        sim.resumed_at = None;
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        let mut sim = self.inner.lock();
        sim.cancel_pending();
        sim.resumed_at = None;
        sim.listener = None;
        Ok(())
    }

    async fn position_ms(&self) -> BridgeResult<u64> {
        Ok(self.inner.lock().position().as_millis() as u64)
    }

    async fn duration_ms(&self) -> BridgeResult<Option<u64>> {
        Ok(Some(self.duration.as_millis() as u64))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut logging = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug);
    if let Some(filter) = args.get(2) {
        logging = logging.with_filter(filter.clone());
    }
    init_logging(logging).context("initializing logging")?;

    let config = PlayerConfig::builder()
        .tick_interval(Duration::from_millis(500))
        .build()
        .context("building player config")?;

    let service = PlayerService::builder()
        .decoder_factory(Arc::new(|| -> BridgeResult<Arc<dyn MediaDecoder>> {
            Ok(Arc::new(SimulatedDecoder::new(Duration::from_secs(4))))
        }))
        .config(config)
        .build()
        .context("starting player service")?;

    let mut events = service.subscribe();
    let observer = tokio::spawn(async move {
        let mut progress = PlaybackProgress::new();
        while let Ok(event) = events.recv().await {
            progress.apply(&event);
            info!(
                event = event.description(),
                state = %progress.state(),
                position_ms = progress.position_ms(),
                duration_ms = ?progress.duration_ms(),
                "Progress"
            );
            if matches!(event, PlayerEvent::Finished { .. }) {
                break;
            }
        }
        progress
    });

    let player = service.connect();
    player.play("file:///music/demo-track.mp3").await?;

    sleep(Duration::from_millis(1_500)).await;
    player.pause().await?;
    let snapshot = player.snapshot().await?;
    info!(?snapshot, "Paused");

    sleep(Duration::from_secs(1)).await;
    player.resume().await?;

    let progress = observer.await.context("observer task failed")?;
    info!(
        position_ms = progress.position_ms(),
        fraction = ?progress.fraction(),
        "Track finished"
    );

    service.shutdown().await?;
    Ok(())
}
