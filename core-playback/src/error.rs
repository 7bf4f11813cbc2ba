//! # Playback Error Types
//!
//! Errors raised by the playback controller and its command channel.
//!
//! Only [`PlaybackError::ChannelUnavailable`] ever reaches a caller of the
//! command surface, and [`PlaybackError::Config`] a caller constructing a
//! controller. Decoder failures are reported as events and ignored commands
//! are logged; both are represented here so they can be logged with a
//! uniform shape.

use bridge_traits::error::BridgeError;
use bridge_traits::playback::PlaybackState;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Command Boundary Errors
    // ========================================================================
    /// The command server is unreachable (shut down, dropped, or the
    /// acknowledgement was lost). Callers should assume playback stopped.
    #[error("Playback command channel unavailable")]
    ChannelUnavailable,

    /// The controller configuration was rejected.
    #[error("Invalid player configuration: {0}")]
    Config(#[from] core_runtime::Error),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The decoder could not open the media locator.
    #[error("Failed to load media: {0}")]
    LoadFailed(String),

    /// A command that has no meaning in the current state.
    #[error("Ignored {command} while {state}")]
    InvalidTransition {
        command: &'static str,
        state: PlaybackState,
    },

    /// A sampler tick observed a session that was released or cancelled.
    #[error("Sampler tick raced with session teardown")]
    SamplerRace,

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Failure reported by the host decoder adapter.
    #[error("Decoder error: {0}")]
    Decoder(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if the caller can retry later.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PlaybackError::ChannelUnavailable)
    }

    /// Returns `true` for conditions the controller absorbs without
    /// surfacing anything to observers.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidTransition { .. } | PlaybackError::SamplerRace
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
