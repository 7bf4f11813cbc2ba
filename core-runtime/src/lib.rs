//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the playback crates depend
//! on. It establishes the logging conventions, the player configuration and
//! the event broadcasting mechanism through which the controller publishes
//! status to its observers.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::PlayerConfig;
pub use error::{Error, Result};
pub use events::{EventBus, EventStream, PlayerEvent};
