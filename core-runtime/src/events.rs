//! # Event Bus System
//!
//! Publishes playback status from the controller to any number of observers
//! using `tokio::sync::broadcast`.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ PlaybackController ├──────────>│ EventBus  ├──────────────>│ Subscriber │
//! │  (commands,        │           │ (broadcast│               └────────────┘
//! │   decoder callbacks│           │  channel) │   subscribe   ┌────────────┐
//! │   sampler ticks)   │           │           ├──────────────>│ Subscriber │
//! └────────────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, PlayerEvent};
//! use bridge_traits::playback::PlaybackSessionId;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(PlayerEvent::DurationKnown {
//!         session_id: PlaybackSessionId::from_raw(1),
//!         duration_ms: 5_000,
//!     })
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Duration known");
//! # }
//! ```
//!
//! ## Delivery Guarantees
//!
//! - Every subscriber sees events in the order the controller emitted them.
//! - Subscribers are independent; a slow one never blocks the controller or
//!   other subscribers. It receives `RecvError::Lagged(n)` instead and can
//!   continue with newer events.
//! - `RecvError::Closed` means the bus was dropped (controller shut down).
//! - Events emitted while nobody is subscribed are discarded.
//!
//! Position updates may transiently exceed the last known duration near the
//! end of a track. Subscribers must tolerate that.

use bridge_traits::playback::{PlaybackSessionId, PlaybackState};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// At one position update per second this holds well over a minute of
/// backlog per subscriber.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Player Events
// ============================================================================

/// Status events published by the playback controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlayerEvent {
    /// The controller entered a new state.
    StateChanged {
        /// Session the state belongs to; `None` once no session exists.
        session_id: Option<PlaybackSessionId>,
        state: PlaybackState,
    },
    /// The decoder finished preparing and reported the media duration.
    DurationKnown {
        session_id: PlaybackSessionId,
        /// Total duration (milliseconds), always > 0.
        duration_ms: u64,
    },
    /// Periodic position sample while playing.
    PositionUpdate {
        session_id: PlaybackSessionId,
        /// Current position (milliseconds).
        position_ms: u64,
    },
    /// Playback reached the end of the media.
    Finished { session_id: PlaybackSessionId },
    /// The decoder could not open the media.
    LoadFailed {
        session_id: PlaybackSessionId,
        locator: String,
        message: String,
    },
    /// The decoder failed after the media was prepared.
    PlaybackFailed {
        session_id: PlaybackSessionId,
        message: String,
    },
}

impl PlayerEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            PlayerEvent::StateChanged { .. } => "Playback state changed",
            PlayerEvent::DurationKnown { .. } => "Duration known",
            PlayerEvent::PositionUpdate { .. } => "Playback position updated",
            PlayerEvent::Finished { .. } => "Track finished",
            PlayerEvent::LoadFailed { .. } => "Media failed to load",
            PlayerEvent::PlaybackFailed { .. } => "Playback failed",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlayerEvent::LoadFailed { .. } | PlayerEvent::PlaybackFailed { .. } => {
                EventSeverity::Error
            }
            PlayerEvent::StateChanged { .. }
            | PlayerEvent::DurationKnown { .. }
            | PlayerEvent::Finished { .. } => EventSeverity::Info,
            PlayerEvent::PositionUpdate { .. } => EventSeverity::Debug,
        }
    }

    /// Session the event belongs to, if any.
    pub fn session_id(&self) -> Option<PlaybackSessionId> {
        match self {
            PlayerEvent::StateChanged { session_id, .. } => *session_id,
            PlayerEvent::DurationKnown { session_id, .. }
            | PlayerEvent::PositionUpdate { session_id, .. }
            | PlayerEvent::Finished { session_id }
            | PlayerEvent::LoadFailed { session_id, .. }
            | PlayerEvent::PlaybackFailed { session_id, .. } => Some(*session_id),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to player events.
///
/// Cloning the bus yields another publisher for the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. [`PlayerConfig`](crate::config::PlayerConfig)
    /// validation rejects a zero buffer before it reaches here.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, SendError<PlayerEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future
    /// events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&PlayerEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, PlayerEvent};
///
/// let event_bus = EventBus::new(100);
/// let positions = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, PlayerEvent::PositionUpdate { .. }));
/// ```
pub struct EventStream {
    receiver: Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<PlayerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Restricts the stream to events of one session.
    pub fn for_session(self, session_id: PlaybackSessionId) -> Self {
        self.filter(move |event| event.session_id() == Some(session_id))
    }

    fn accepts(&self, event: &PlayerEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<PlayerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<PlayerEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every matching event currently buffered.
    ///
    /// Lag notifications are skipped; draining stops at the first empty or
    /// closed read.
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
