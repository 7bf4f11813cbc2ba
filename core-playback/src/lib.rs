//! # Playback Control Module
//!
//! Coordinates a single host-provided media decoder.
//!
//! ## Overview
//!
//! This module handles:
//! - The playback session state machine ([`PlaybackController`])
//! - Periodic position sampling while playing ([`sampler`])
//! - The request/acknowledge command boundary ([`CommandServer`],
//!   [`PlayerHandle`])
//!
//! Status flows back to observers through the
//! [`EventBus`](core_runtime::events::EventBus) owned by the controller.

pub mod channel;
pub mod controller;
pub mod error;
pub mod sampler;
pub mod session;

pub use channel::{CommandServer, PlayerCommand, PlayerHandle};
pub use controller::PlaybackController;
pub use error::{PlaybackError, Result};
pub use session::SessionSnapshot;
