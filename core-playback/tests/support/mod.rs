//! Scripted decoder doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::playback::{DecoderFactory, DecoderListener, MediaDecoder, MediaLocator};
use core_runtime::events::{EventStream, PlayerEvent};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared, ordered log of decoder calls across all decoders of a factory.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Decoder whose callbacks are fired explicitly by the test.
pub struct ScriptedDecoder {
    index: usize,
    log: CallLog,
    listener: Mutex<Option<Arc<dyn DecoderListener>>>,
    position_ms: AtomicU64,
    duration_ms: Mutex<Option<u64>>,
    fail_load: Option<String>,
    fail_start: AtomicBool,
}

impl ScriptedDecoder {
    fn record(&self, call: impl AsRef<str>) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.index, call.as_ref()));
    }

    fn listener(&self) -> Arc<dyn DecoderListener> {
        self.listener
            .lock()
            .unwrap()
            .clone()
            .expect("decoder was never loaded")
    }

    pub fn fire_ready(&self) {
        self.listener().on_ready();
    }

    pub fn fire_finished(&self) {
        self.listener().on_finished();
    }

    pub fn fire_failed(&self, message: &str) {
        self.listener().on_failed(message.to_string());
    }

    pub fn set_position(&self, position_ms: u64) {
        self.position_ms.store(position_ms, Ordering::SeqCst);
    }

    pub fn set_duration(&self, duration_ms: Option<u64>) {
        *self.duration_ms.lock().unwrap() = duration_ms;
    }

    pub fn fail_next_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    /// Calls made on this decoder, without the index prefix.
    pub fn calls(&self) -> Vec<String> {
        let prefix = format!("{}:", self.index);
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| call.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn was_called(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }
}

#[async_trait]
impl MediaDecoder for ScriptedDecoder {
    async fn load(
        &self,
        locator: &MediaLocator,
        listener: Arc<dyn DecoderListener>,
    ) -> BridgeResult<()> {
        self.record(format!("load {}", locator));
        if let Some(message) = &self.fail_load {
            return Err(BridgeError::Unreadable(message.clone()));
        }
        *self.listener.lock().unwrap() = Some(listener);
        Ok(())
    }

    async fn start(&self) -> BridgeResult<()> {
        self.record("start");
        if self.fail_start.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("audio device lost".to_string()));
        }
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record("pause");
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.record("stop");
        Ok(())
    }

    async fn position_ms(&self) -> BridgeResult<u64> {
        Ok(self.position_ms.load(Ordering::SeqCst))
    }

    async fn duration_ms(&self) -> BridgeResult<Option<u64>> {
        Ok(*self.duration_ms.lock().unwrap())
    }
}

/// Factory handing out [`ScriptedDecoder`]s and keeping them for inspection.
pub struct ScriptedFactory {
    log: CallLog,
    decoders: Mutex<Vec<Arc<ScriptedDecoder>>>,
    default_duration_ms: Option<u64>,
    next_load_error: Mutex<Option<String>>,
    fail_create: AtomicBool,
}

impl ScriptedFactory {
    pub fn new() -> Arc<Self> {
        Self::with_duration(Some(5_000))
    }

    pub fn with_duration(duration_ms: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            log: Arc::new(Mutex::new(Vec::new())),
            decoders: Mutex::new(Vec::new()),
            default_duration_ms: duration_ms,
            next_load_error: Mutex::new(None),
            fail_create: AtomicBool::new(false),
        })
    }

    /// The next decoder rejects `load` with `message`.
    pub fn fail_next_load(&self, message: &str) {
        *self.next_load_error.lock().unwrap() = Some(message.to_string());
    }

    /// The next `create` call fails.
    pub fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.decoders.lock().unwrap().len()
    }

    /// Decoder created by the `n`-th `create` call (1-based).
    pub fn decoder(&self, n: usize) -> Arc<ScriptedDecoder> {
        self.decoders.lock().unwrap()[n - 1].clone()
    }

    pub fn latest(&self) -> Arc<ScriptedDecoder> {
        self.decoders
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no decoder created")
    }

    /// All decoder calls, prefixed with the decoder number.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl DecoderFactory for ScriptedFactory {
    fn create(&self) -> BridgeResult<Arc<dyn MediaDecoder>> {
        if self.fail_create.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable("no audio output".to_string()));
        }

        let mut decoders = self.decoders.lock().unwrap();
        let decoder = Arc::new(ScriptedDecoder {
            index: decoders.len() + 1,
            log: self.log.clone(),
            listener: Mutex::new(None),
            position_ms: AtomicU64::new(0),
            duration_ms: Mutex::new(self.default_duration_ms),
            fail_load: self.next_load_error.lock().unwrap().take(),
            fail_start: AtomicBool::new(false),
        });
        decoders.push(decoder.clone());
        Ok(decoder)
    }
}

/// Waits for the next event, failing the test after a generous timeout.
pub async fn next_event(events: &mut EventStream) -> PlayerEvent {
    tokio::time::timeout(Duration::from_secs(30), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event bus closed")
}

/// Lets spawned tasks (callback pump, sampler) run without advancing time.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub fn positions(events: &[PlayerEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|event| match event {
            PlayerEvent::PositionUpdate { position_ms, .. } => Some(*position_ms),
            _ => None,
        })
        .collect()
}
