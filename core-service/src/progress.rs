//! Client-side fold of player events into displayable progress.
//!
//! [`PlaybackProgress`] is what a UI keeps to render a seek bar: the current
//! session, its state, the known duration and a position that always lies in
//! `[0, duration]` once the duration is known.

use bridge_traits::playback::{PlaybackSessionId, PlaybackState};
use core_runtime::events::PlayerEvent;
use serde::Serialize;

/// Progress of the most recent session seen on the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackProgress {
    session_id: Option<PlaybackSessionId>,
    state: PlaybackState,
    duration_ms: Option<u64>,
    position_ms: u64,
    last_error: Option<String>,
}

impl Default for PlaybackProgress {
    fn default() -> Self {
        Self {
            session_id: None,
            state: PlaybackState::Idle,
            duration_ms: None,
            position_ms: 0,
            last_error: None,
        }
    }
}

impl PlaybackProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<PlaybackSessionId> {
        self.session_id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Message of the last load or playback failure of the tracked session.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Position as a fraction of the duration, when the duration is known.
    pub fn fraction(&self) -> Option<f64> {
        self.duration_ms
            .map(|duration| self.position_ms as f64 / duration as f64)
    }

    /// Applies one event. Returns `false` if the event belonged to an older
    /// session and was ignored.
    pub fn apply(&mut self, event: &PlayerEvent) -> bool {
        match event {
            PlayerEvent::StateChanged {
                session_id: Some(id),
                state,
            } => {
                if !self.track(*id) {
                    return false;
                }
                self.state = *state;
            }
            PlayerEvent::StateChanged {
                session_id: None,
                state,
            } => {
                self.state = *state;
                self.position_ms = 0;
            }
            PlayerEvent::DurationKnown {
                session_id,
                duration_ms,
            } => {
                if !self.track(*session_id) {
                    return false;
                }
                if *duration_ms > 0 {
                    self.duration_ms = Some(*duration_ms);
                    self.position_ms = self.clamp(self.position_ms);
                }
            }
            PlayerEvent::PositionUpdate {
                session_id,
                position_ms,
            } => {
                if !self.track(*session_id) {
                    return false;
                }
                self.position_ms = self.clamp(*position_ms);
            }
            PlayerEvent::Finished { session_id } => {
                if !self.track(*session_id) {
                    return false;
                }
                if let Some(duration) = self.duration_ms {
                    self.position_ms = duration;
                }
            }
            PlayerEvent::LoadFailed {
                session_id,
                message,
                ..
            }
            | PlayerEvent::PlaybackFailed {
                session_id,
                message,
            } => {
                if !self.track(*session_id) {
                    return false;
                }
                self.last_error = Some(message.clone());
            }
        }
        true
    }

    /// Switches to `id` if it is newer than the tracked session. Returns
    /// `false` for events of older sessions.
    fn track(&mut self, id: PlaybackSessionId) -> bool {
        match self.session_id {
            Some(current) if current == id => true,
            Some(current) if current > id => false,
            _ => {
                *self = Self {
                    session_id: Some(id),
                    state: self.state,
                    ..Self::default()
                };
                true
            }
        }
    }

    fn clamp(&self, position_ms: u64) -> u64 {
        match self.duration_ms {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> PlaybackSessionId {
        PlaybackSessionId::from_raw(raw)
    }

    fn playing(raw: u64) -> PlayerEvent {
        PlayerEvent::StateChanged {
            session_id: Some(id(raw)),
            state: PlaybackState::Playing,
        }
    }

    #[test]
    fn folds_a_session() {
        let mut progress = PlaybackProgress::new();
        progress.apply(&PlayerEvent::StateChanged {
            session_id: Some(id(1)),
            state: PlaybackState::Preparing,
        });
        progress.apply(&PlayerEvent::DurationKnown {
            session_id: id(1),
            duration_ms: 4_000,
        });
        progress.apply(&playing(1));
        progress.apply(&PlayerEvent::PositionUpdate {
            session_id: id(1),
            position_ms: 1_000,
        });

        assert_eq!(progress.session_id(), Some(id(1)));
        assert_eq!(progress.state(), PlaybackState::Playing);
        assert_eq!(progress.duration_ms(), Some(4_000));
        assert_eq!(progress.position_ms(), 1_000);
        assert_eq!(progress.fraction(), Some(0.25));
    }

    #[test]
    fn clamps_position_to_duration() {
        let mut progress = PlaybackProgress::new();
        progress.apply(&PlayerEvent::DurationKnown {
            session_id: id(1),
            duration_ms: 5_000,
        });
        progress.apply(&PlayerEvent::PositionUpdate {
            session_id: id(1),
            position_ms: 5_300,
        });
        assert_eq!(progress.position_ms(), 5_000);
    }

    #[test]
    fn ignores_non_positive_duration() {
        let mut progress = PlaybackProgress::new();
        assert!(progress.apply(&PlayerEvent::DurationKnown {
            session_id: id(1),
            duration_ms: 0,
        }));
        assert_eq!(progress.duration_ms(), None);

        progress.apply(&PlayerEvent::PositionUpdate {
            session_id: id(1),
            position_ms: 90_000,
        });
        assert_eq!(progress.position_ms(), 90_000);
        assert_eq!(progress.fraction(), None);
    }

    #[test]
    fn ignores_older_sessions_and_resets_on_newer() {
        let mut progress = PlaybackProgress::new();
        progress.apply(&PlayerEvent::DurationKnown {
            session_id: id(2),
            duration_ms: 3_000,
        });
        progress.apply(&playing(2));

        assert!(!progress.apply(&PlayerEvent::PositionUpdate {
            session_id: id(1),
            position_ms: 700,
        }));
        assert_eq!(progress.position_ms(), 0);

        progress.apply(&PlayerEvent::StateChanged {
            session_id: Some(id(3)),
            state: PlaybackState::Preparing,
        });
        assert_eq!(progress.session_id(), Some(id(3)));
        assert_eq!(progress.duration_ms(), None);
        assert_eq!(progress.state(), PlaybackState::Preparing);
    }

    #[test]
    fn finished_moves_to_end_and_idle_resets_position() {
        let mut progress = PlaybackProgress::new();
        progress.apply(&PlayerEvent::DurationKnown {
            session_id: id(1),
            duration_ms: 2_000,
        });
        progress.apply(&PlayerEvent::Finished { session_id: id(1) });
        assert_eq!(progress.position_ms(), 2_000);

        progress.apply(&PlayerEvent::StateChanged {
            session_id: None,
            state: PlaybackState::Idle,
        });
        assert_eq!(progress.state(), PlaybackState::Idle);
        assert_eq!(progress.position_ms(), 0);
        assert_eq!(progress.duration_ms(), Some(2_000));
    }

    #[test]
    fn records_failures() {
        let mut progress = PlaybackProgress::new();
        progress.apply(&PlayerEvent::LoadFailed {
            session_id: id(1),
            locator: "a.mp3".to_string(),
            message: "unsupported format".to_string(),
        });
        assert_eq!(progress.last_error(), Some("unsupported format"));
    }
}
