//! # Playback Controller
//!
//! Owns the single active decoder, the session state machine and the
//! position sampler's lifecycle.
//!
//! ## State Machine
//!
//! ```text
//!            play                ready                pause
//!   Idle ──────────> Preparing ─────────> Playing ─────────────> Paused
//!    ^                  │  │ ready (pause pending)   <─────────────┘
//!    │                  │  └───────────────────────> Paused  resume
//!    │  stop / finished / failed (any live state)
//!    └──────────────────┘
//!
//!   any state ── shutdown ──> Stopped (terminal)
//! ```
//!
//! `play` is legal from every live state and replaces the current session
//! after tearing it down completely. `pause`, `resume` and `stop` never fail;
//! commands without meaning in the current state are logged and ignored.
//!
//! ## Concurrency
//!
//! Commands, decoder callbacks and sampler ticks all serialize on one async
//! mutex. Decoder callbacks arrive on the adapter's thread and are forwarded
//! to a callback pump task, tagged with the session they belong to; signals
//! of replaced sessions are dropped.
//!
//! A sampler tick reads the position outside the lock through its own
//! reference to the decoder, then re-enters the lock and publishes only if
//! its token was not cancelled and its session is still playing. Teardown
//! cancels the token inside the lock, so no position event of a session is
//! published after that session's teardown.

use crate::error::{PlaybackError, Result};
use crate::sampler::{self, TickOutcome};
use crate::session::{DecoderSignal, Session, SessionListener, SessionSnapshot};

use bridge_traits::playback::{
    DecoderFactory, MediaDecoder, MediaLocator, PlaybackSessionId, PlaybackState,
};
use core_runtime::config::PlayerConfig;
use core_runtime::events::{EventBus, EventStream, PlayerEvent};

use futures::FutureExt;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

/// Mutable controller state, guarded by [`Shared::state`].
struct ControllerState {
    session: Option<Session>,
    last_session_id: PlaybackSessionId,
    shut_down: bool,
}

impl ControllerState {
    fn state(&self) -> PlaybackState {
        if self.shut_down {
            return PlaybackState::Stopped;
        }
        self.session
            .as_ref()
            .map_or(PlaybackState::Idle, |session| session.state)
    }

    fn current_mut(&mut self, id: PlaybackSessionId) -> Option<&mut Session> {
        self.session.as_mut().filter(|session| session.id == id)
    }
}

/// How a session ended.
enum SessionEnd {
    Stopped,
    Finished,
    LoadFailed(String),
    PlaybackFailed(String),
}

struct Shared {
    state: Mutex<ControllerState>,
    events: EventBus,
    factory: Arc<dyn DecoderFactory>,
    config: PlayerConfig,
    signals: mpsc::UnboundedSender<DecoderSignal>,
}

/// Long-lived playback controller.
///
/// Cloning yields another handle to the same controller.
///
/// # Example
///
/// ```ignore
/// use core_playback::PlaybackController;
/// use core_runtime::config::PlayerConfig;
///
/// let controller = PlaybackController::new(factory, PlayerConfig::default())?;
/// let mut events = controller.subscribe();
///
/// controller.play("file:///music/a.mp3".into()).await;
/// while let Ok(event) = events.recv().await {
///     println!("{}", event.description());
/// }
/// ```
#[derive(Clone)]
pub struct PlaybackController {
    shared: Arc<Shared>,
}

impl PlaybackController {
    /// Creates an idle controller.
    ///
    /// Fails with [`PlaybackError::Config`] when `config` does not validate.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime; the decoder callback pump
    /// is spawned here.
    pub fn new(factory: Arc<dyn DecoderFactory>, config: PlayerConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let (signals, receiver) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            state: Mutex::new(ControllerState {
                session: None,
                last_session_id: PlaybackSessionId::from_raw(0),
                shut_down: false,
            }),
            events,
            factory,
            config,
            signals,
        });

        tokio::spawn(pump_callbacks(Arc::downgrade(&shared), receiver));

        Ok(Self { shared })
    }

    /// Starts a new session for `locator`, replacing any current one.
    ///
    /// Returns once loading was kicked off. Load failures, including an
    /// empty locator, surface as [`PlayerEvent::LoadFailed`]. Returns the new
    /// session id, or `None` after shutdown.
    #[instrument(skip(self, locator), fields(media = %locator.display_name()))]
    pub async fn play(&self, locator: MediaLocator) -> Option<PlaybackSessionId> {
        self.shared.play(locator).await
    }

    /// Pauses playback. While preparing, the pause is applied once the
    /// decoder is ready.
    #[instrument(skip(self))]
    pub async fn pause(&self) {
        self.shared.pause().await
    }

    /// Resumes a paused session, or cancels a pending pause.
    #[instrument(skip(self))]
    pub async fn resume(&self) {
        self.shared.resume().await
    }

    /// Tears down the current session. No-op when idle.
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        self.shared.stop().await
    }

    /// Tears down any session and enters the terminal `Stopped` state.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.shared.shutdown().await
    }

    /// Current state; `Stopped` after shutdown.
    pub async fn state(&self) -> PlaybackState {
        self.shared.state.lock().await.state()
    }

    /// Current session view.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.shared.state.lock().await;
        match state.session.as_ref() {
            Some(session) => session.snapshot(),
            None => SessionSnapshot::without_session(state.state()),
        }
    }

    /// Returns `true` while a position sampler is running.
    pub async fn is_sampling(&self) -> bool {
        let state = self.shared.state.lock().await;
        state
            .session
            .as_ref()
            .and_then(|session| session.sampler.as_ref())
            .map_or(false, |sampler| !sampler.is_finished())
    }

    /// Subscribes to future events.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.shared.events.subscribe())
    }

    /// The bus every controller event is published on.
    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// Configuration the controller was created with.
    pub fn config(&self) -> &PlayerConfig {
        &self.shared.config
    }
}

impl fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackController")
            .field("config", &self.shared.config)
            .field("events", &self.shared.events)
            .finish()
    }
}

impl Shared {
    async fn play(self: &Arc<Self>, locator: MediaLocator) -> Option<PlaybackSessionId> {
        let mut state = self.state.lock().await;
        if state.shut_down {
            ignore("play", PlaybackState::Stopped);
            return None;
        }

        let had_session = match state.session.take() {
            Some(previous) => {
                info!(session = %previous.id, "Replacing session");
                release(previous).await;
                true
            }
            None => false,
        };

        state.last_session_id = state.last_session_id.next();
        let id = state.last_session_id;

        if locator.is_blank() {
            self.reject(id, &locator, "empty media locator".to_string(), had_session);
            return Some(id);
        }

        let decoder = match self.factory.create() {
            Ok(decoder) => decoder,
            Err(err) => {
                self.reject(id, &locator, err.to_string(), had_session);
                return Some(id);
            }
        };

        state.session = Some(Session::new(id, locator.clone(), Arc::clone(&decoder)));
        info!(session = %id, media = locator.display_name(), "Preparing");
        self.publish(PlayerEvent::StateChanged {
            session_id: Some(id),
            state: PlaybackState::Preparing,
        });

        let listener = Arc::new(SessionListener::new(id, self.signals.clone()));
        if let Err(err) = decoder.load(&locator, listener).await {
            self.end_session(&mut state, SessionEnd::LoadFailed(err.to_string()))
                .await;
        }

        Some(id)
    }

    /// Reports a session that failed before a decoder was loading.
    fn reject(
        &self,
        id: PlaybackSessionId,
        locator: &MediaLocator,
        message: String,
        had_session: bool,
    ) {
        let reason = PlaybackError::LoadFailed(message.clone());
        warn!(session = %id, media = locator.display_name(), %reason, "Load rejected");
        self.publish(PlayerEvent::LoadFailed {
            session_id: id,
            locator: locator.to_string(),
            message,
        });
        if had_session {
            self.publish(PlayerEvent::StateChanged {
                session_id: None,
                state: PlaybackState::Idle,
            });
        }
    }

    async fn pause(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        let current = state.state();
        let Some(session) = state.session.as_mut() else {
            return ignore("pause", current);
        };

        match session.state {
            PlaybackState::Preparing => {
                session.pause_requested = true;
                debug!(session = %session.id, "Pause deferred until ready");
            }
            PlaybackState::Playing => {
                session.cancel_sampler();
                if let Err(err) = session.decoder.pause().await {
                    return self
                        .end_session(&mut state, SessionEnd::PlaybackFailed(err.to_string()))
                        .await;
                }
                session.state = PlaybackState::Paused;
                let id = session.id;
                info!(session = %id, "Paused");
                self.publish(PlayerEvent::StateChanged {
                    session_id: Some(id),
                    state: PlaybackState::Paused,
                });
            }
            other => ignore("pause", other),
        }
    }

    async fn resume(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        let current = state.state();
        let Some(session) = state.session.as_mut() else {
            return ignore("resume", current);
        };

        match session.state {
            PlaybackState::Preparing if session.pause_requested => {
                session.pause_requested = false;
                debug!(session = %session.id, "Deferred pause cancelled");
            }
            PlaybackState::Paused => {
                if let Err(err) = session.decoder.start().await {
                    return self
                        .end_session(&mut state, SessionEnd::PlaybackFailed(err.to_string()))
                        .await;
                }
                session.state = PlaybackState::Playing;
                self.start_sampler(session);
                let id = session.id;
                info!(session = %id, "Resumed");
                self.publish(PlayerEvent::StateChanged {
                    session_id: Some(id),
                    state: PlaybackState::Playing,
                });
            }
            other => ignore("resume", other),
        }
    }

    async fn stop(&self) {
        let mut state = self.state.lock().await;
        if state.session.is_none() {
            return ignore("stop", state.state());
        }
        self.end_session(&mut state, SessionEnd::Stopped).await;
    }

    async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if state.shut_down {
            return;
        }
        if let Some(session) = state.session.take() {
            release(session).await;
        }
        state.shut_down = true;
        info!("Playback controller shut down");
        self.publish(PlayerEvent::StateChanged {
            session_id: None,
            state: PlaybackState::Stopped,
        });
    }

    async fn handle_ready(self: &Arc<Self>, id: PlaybackSessionId) {
        let mut state = self.state.lock().await;
        let Some(session) = state.current_mut(id) else {
            debug!(session = %id, "Ignoring ready of a replaced session");
            return;
        };
        if session.state != PlaybackState::Preparing {
            return ignore("ready", session.state);
        }

        let duration_ms = match session.decoder.duration_ms().await {
            Ok(duration) => duration.filter(|ms| *ms > 0),
            Err(err) => {
                let reason = PlaybackError::from(err);
                warn!(session = %id, %reason, "Duration unavailable");
                None
            }
        };
        session.duration_ms = duration_ms;
        if let Some(duration_ms) = duration_ms {
            self.publish(PlayerEvent::DurationKnown {
                session_id: id,
                duration_ms,
            });
        }

        if session.pause_requested {
            session.pause_requested = false;
            session.state = PlaybackState::Paused;
            info!(session = %id, ?duration_ms, "Prepared, holding pause");
            return self.publish(PlayerEvent::StateChanged {
                session_id: Some(id),
                state: PlaybackState::Paused,
            });
        }

        if let Err(err) = session.decoder.start().await {
            return self
                .end_session(&mut state, SessionEnd::PlaybackFailed(err.to_string()))
                .await;
        }
        session.state = PlaybackState::Playing;
        self.start_sampler(session);
        info!(session = %id, ?duration_ms, "Playing");
        self.publish(PlayerEvent::StateChanged {
            session_id: Some(id),
            state: PlaybackState::Playing,
        });
    }

    async fn handle_failed(&self, id: PlaybackSessionId, message: String) {
        let mut state = self.state.lock().await;
        let Some(session) = state.current_mut(id) else {
            debug!(session = %id, %message, "Ignoring failure of a replaced session");
            return;
        };

        let end = if session.state == PlaybackState::Preparing {
            SessionEnd::LoadFailed(message)
        } else {
            SessionEnd::PlaybackFailed(message)
        };
        self.end_session(&mut state, end).await;
    }

    async fn handle_finished(&self, id: PlaybackSessionId) {
        let mut state = self.state.lock().await;
        let Some(session) = state.current_mut(id) else {
            debug!(session = %id, "Ignoring completion of a replaced session");
            return;
        };

        match session.state {
            PlaybackState::Playing | PlaybackState::Paused => {
                self.end_session(&mut state, SessionEnd::Finished).await
            }
            other => ignore("finished", other),
        }
    }

    fn start_sampler(self: &Arc<Self>, session: &mut Session) {
        let shared = Arc::downgrade(self);
        let decoder = Arc::clone(&session.decoder);
        let id = session.id;

        session.sampler = Some(sampler::spawn(self.config.tick_interval, move |token| {
            sample_position(shared.clone(), id, Arc::clone(&decoder), token).boxed()
        }));
    }

    /// Tears down the current session and reports how it ended.
    async fn end_session(&self, state: &mut ControllerState, end: SessionEnd) {
        let Some(session) = state.session.take() else {
            return;
        };
        let id = session.id;
        let locator = session.locator.clone();
        release(session).await;

        match end {
            SessionEnd::Stopped => info!(session = %id, "Stopped"),
            SessionEnd::Finished => {
                info!(session = %id, "Finished");
                self.publish(PlayerEvent::Finished { session_id: id });
            }
            SessionEnd::LoadFailed(message) => {
                let reason = PlaybackError::LoadFailed(message.clone());
                warn!(session = %id, media = locator.display_name(), %reason, "Load failed");
                self.publish(PlayerEvent::LoadFailed {
                    session_id: id,
                    locator: locator.to_string(),
                    message,
                });
            }
            SessionEnd::PlaybackFailed(message) => {
                warn!(session = %id, %message, "Playback failed");
                self.publish(PlayerEvent::PlaybackFailed {
                    session_id: id,
                    message,
                });
            }
        }

        self.publish(PlayerEvent::StateChanged {
            session_id: None,
            state: PlaybackState::Idle,
        });
    }

    fn publish(&self, event: PlayerEvent) {
        if self.events.emit(event).is_err() {
            trace!("Event dropped, no subscribers");
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let Some(mut session) = self.state.get_mut().session.take() else {
            return;
        };
        session.cancel_sampler();
        info!(session = %session.id, "Controller dropped, releasing session");

        // Decoder stop is async; outside a runtime it runs on a throwaway
        // current-thread runtime.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(release(session));
            return;
        }

        match tokio::runtime::Builder::new_current_thread().build() {
            Ok(runtime) => runtime.block_on(release(session)),
            Err(err) => warn!(error = %err, "Decoder left running, no runtime to stop it"),
        }
    }
}

fn ignore(command: &'static str, state: PlaybackState) {
    let reason = PlaybackError::InvalidTransition { command, state };
    debug!(%reason, "Command ignored");
}

/// Cancels the sampler, then stops the decoder.
async fn release(mut session: Session) {
    session.cancel_sampler();
    if let Err(err) = session.decoder.stop().await {
        let reason = PlaybackError::from(err);
        warn!(session = %session.id, %reason, "Decoder stop failed");
    }
}

async fn sample_position(
    shared: Weak<Shared>,
    session_id: PlaybackSessionId,
    decoder: Arc<dyn MediaDecoder>,
    token: CancellationToken,
) -> TickOutcome {
    let position_ms = match decoder.position_ms().await {
        Ok(position_ms) => position_ms,
        Err(err) => {
            let reason = PlaybackError::from(err);
            debug!(session = %session_id, %reason, "Position unavailable");
            return TickOutcome::Dropped;
        }
    };

    let Some(shared) = shared.upgrade() else {
        return TickOutcome::Ended;
    };
    let state = shared.state.lock().await;

    let playing = state
        .session
        .as_ref()
        .map_or(false, |s| s.id == session_id && s.state == PlaybackState::Playing);
    if token.is_cancelled() || !playing {
        trace!(session = %session_id, reason = %PlaybackError::SamplerRace, "Tick discarded");
        return TickOutcome::Ended;
    }

    trace!(session = %session_id, position_ms, "Position sampled");
    shared.publish(PlayerEvent::PositionUpdate {
        session_id,
        position_ms,
    });
    TickOutcome::Emitted
}

async fn pump_callbacks(
    controller: Weak<Shared>,
    mut signals: mpsc::UnboundedReceiver<DecoderSignal>,
) {
    while let Some(signal) = signals.recv().await {
        let Some(shared) = controller.upgrade() else {
            break;
        };
        match signal {
            DecoderSignal::Ready(id) => shared.handle_ready(id).await,
            DecoderSignal::Failed(id, message) => shared.handle_failed(id, message).await,
            DecoderSignal::Finished(id) => shared.handle_finished(id).await,
        }
    }
    trace!("Decoder callback pump exited");
}
