//! Session model owned by the playback controller.

use crate::sampler::SamplerHandle;
use bridge_traits::playback::{
    DecoderListener, MediaDecoder, MediaLocator, PlaybackSessionId, PlaybackState,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One playback attempt for one media locator.
///
/// Replaced wholesale on every `play`. `sampler` is `Some` exactly while
/// `state` is [`PlaybackState::Playing`].
pub(crate) struct Session {
    pub(crate) id: PlaybackSessionId,
    pub(crate) locator: MediaLocator,
    pub(crate) decoder: Arc<dyn MediaDecoder>,
    pub(crate) duration_ms: Option<u64>,
    pub(crate) state: PlaybackState,
    pub(crate) sampler: Option<SamplerHandle>,
    pub(crate) pause_requested: bool,
}

impl Session {
    pub(crate) fn new(
        id: PlaybackSessionId,
        locator: MediaLocator,
        decoder: Arc<dyn MediaDecoder>,
    ) -> Self {
        Self {
            id,
            locator,
            decoder,
            duration_ms: None,
            state: PlaybackState::Preparing,
            sampler: None,
            pause_requested: false,
        }
    }

    /// Cancels the sampler, if any. No tick publishes after this returns.
    pub(crate) fn cancel_sampler(&mut self) {
        if let Some(sampler) = self.sampler.take() {
            sampler.cancel();
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: Some(self.id),
            locator: Some(self.locator.clone()),
            state: self.state,
            duration_ms: self.duration_ms,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("locator", &self.locator)
            .field("state", &self.state)
            .field("duration_ms", &self.duration_ms)
            .field("sampling", &self.sampler.is_some())
            .field("pause_requested", &self.pause_requested)
            .finish()
    }
}

/// Read-only view of the controller's current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// `None` when no session exists.
    pub session_id: Option<PlaybackSessionId>,
    pub locator: Option<MediaLocator>,
    pub state: PlaybackState,
    /// Known once the decoder reported ready with a positive duration.
    pub duration_ms: Option<u64>,
}

impl SessionSnapshot {
    /// Snapshot of a controller without a session.
    pub fn without_session(state: PlaybackState) -> Self {
        Self {
            session_id: None,
            locator: None,
            state,
            duration_ms: None,
        }
    }
}

/// Decoder callback, tagged with the session it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DecoderSignal {
    Ready(PlaybackSessionId),
    Failed(PlaybackSessionId, String),
    Finished(PlaybackSessionId),
}

/// Listener handed to a session's decoder.
///
/// Runs on the adapter's thread, so it only forwards into the controller's
/// callback pump. Sends fail silently once the controller is gone.
pub(crate) struct SessionListener {
    session_id: PlaybackSessionId,
    signals: mpsc::UnboundedSender<DecoderSignal>,
}

impl SessionListener {
    pub(crate) fn new(
        session_id: PlaybackSessionId,
        signals: mpsc::UnboundedSender<DecoderSignal>,
    ) -> Self {
        Self {
            session_id,
            signals,
        }
    }
}

impl DecoderListener for SessionListener {
    fn on_ready(&self) {
        let _ = self.signals.send(DecoderSignal::Ready(self.session_id));
    }

    fn on_failed(&self, message: String) {
        let _ = self
            .signals
            .send(DecoderSignal::Failed(self.session_id, message));
    }

    fn on_finished(&self) {
        let _ = self.signals.send(DecoderSignal::Finished(self.session_id));
    }
}
