//! Playback bridge traits and supporting session types.
//!
//! The playback core never decodes audio itself. It drives a host-provided
//! decoder/renderer through [`MediaDecoder`] and learns about asynchronous
//! progress (prepared, failed, reached the end) through a [`DecoderListener`]
//! that the core hands to the decoder on `load`. Host applications are
//! expected to provide concrete implementations that satisfy their platform
//! constraints (native media player, software decoder, test double).

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque locator of the content to play (URI, file path, stream URL).
///
/// The core does not interpret the locator; validation is the decoder's job
/// and failures are reported asynchronously.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaLocator(String);

impl MediaLocator {
    /// Wrap a locator string.
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// Borrow the raw locator.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the locator is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Last path segment of the locator, suitable for display.
    ///
    /// Query strings and fragments are ignored, so
    /// `https://host/music/a.mp3?token=x` yields `a.mp3`.
    pub fn display_name(&self) -> &str {
        let without_query = self
            .0
            .split(['?', '#'])
            .next()
            .unwrap_or(self.0.as_str());
        without_query
            .trim_end_matches(['/', '\\'])
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(without_query)
    }
}

impl fmt::Display for MediaLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaLocator {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MediaLocator {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of one playback session.
///
/// Session ids are generation numbers: every `play` allocates a strictly
/// greater id than the previous session of the same controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaybackSessionId(u64);

impl PlaybackSessionId {
    /// Construct an identifier from a raw generation number.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw generation number.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// The id following this one.
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Playback lifecycle state as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// No session.
    Idle,
    /// A decoder is loading the media.
    Preparing,
    Playing,
    Paused,
    /// The controller has been shut down and accepts no further commands.
    Stopped,
}

impl PlaybackState {
    /// Returns `true` while a session (and therefore a decoder) exists.
    pub fn has_session(&self) -> bool {
        matches!(
            self,
            PlaybackState::Preparing | PlaybackState::Playing | PlaybackState::Paused
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Preparing => "preparing",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Receives asynchronous notifications from a decoder.
///
/// Decoders may invoke these from any thread, including from inside
/// [`MediaDecoder::load`]. Implementations must return quickly and must not
/// call back into the decoder.
pub trait DecoderListener: Send + Sync {
    /// The media is loaded; duration is now available and `start` may be called.
    fn on_ready(&self);

    /// Loading or playback failed.
    fn on_failed(&self, message: String);

    /// Playback reached the end of the media.
    fn on_finished(&self);
}

/// Trait for host decoder/renderer adapters.
///
/// One instance serves exactly one session. The core calls `load` once,
/// waits for [`DecoderListener::on_ready`], then drives `start`/`pause` and
/// finally `stop` before dropping the instance.
#[async_trait]
pub trait MediaDecoder: Send + Sync {
    /// Begin loading `locator`. Must not wait for loading to finish; the
    /// outcome is reported through `listener`. An `Err` means the locator
    /// could not even be handed to the decoder.
    async fn load(&self, locator: &MediaLocator, listener: Arc<dyn DecoderListener>)
        -> Result<()>;

    /// Start or resume rendering.
    async fn start(&self) -> Result<()>;

    /// Pause rendering, keeping the current position.
    async fn pause(&self) -> Result<()>;

    /// Stop rendering. The instance is released afterwards.
    async fn stop(&self) -> Result<()>;

    /// Current playback position in milliseconds.
    async fn position_ms(&self) -> Result<u64>;

    /// Total media duration in milliseconds, `None` when unknown (live streams).
    async fn duration_ms(&self) -> Result<Option<u64>>;
}

/// Creates a fresh decoder for each playback session.
pub trait DecoderFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn MediaDecoder>>;
}

impl<F> DecoderFactory for F
where
    F: Fn() -> Result<Arc<dyn MediaDecoder>> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn MediaDecoder>> {
        self()
    }
}
