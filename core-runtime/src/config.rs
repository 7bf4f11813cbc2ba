//! # Player Configuration
//!
//! Tunables for the playback controller, its position sampler and its
//! command/event channels.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::config::PlayerConfig;
//! use std::time::Duration;
//!
//! let config = PlayerConfig::builder()
//!     .tick_interval(Duration::from_millis(500))
//!     .event_buffer_size(256)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.tick_interval, Duration::from_millis(500));
//! ```
//!
//! Hosts that keep settings in a file can deserialize the same structure;
//! missing fields take their defaults:
//!
//! ```rust
//! use core_runtime::config::PlayerConfig;
//!
//! let config = PlayerConfig::from_json(r#"{ "command_buffer_size": 8 }"#).unwrap();
//! assert_eq!(config.command_buffer_size, 8);
//! ```
//!
//! ## Error Handling
//!
//! `build()` and `from_json()` validate eagerly and return
//! [`Error::Config`](crate::error::Error::Config) with an actionable message:
//!
//! ```should_panic
//! use core_runtime::config::PlayerConfig;
//! use std::time::Duration;
//!
//! let config = PlayerConfig::builder()
//!     .tick_interval(Duration::ZERO)
//!     .build()
//!     .expect("Should fail - zero tick interval");
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest accepted sampler interval.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Longest accepted sampler interval.
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Playback controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Interval between two position samples while playing.
    ///
    /// Default: 1 second.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: Duration,

    /// Events buffered per subscriber before it starts lagging.
    ///
    /// Default: 100.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// Commands queued on the command channel before senders wait.
    ///
    /// Default: 32.
    #[serde(default = "default_command_buffer_size")]
    pub command_buffer_size: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            event_buffer_size: default_event_buffer_size(),
            command_buffer_size: default_command_buffer_size(),
        }
    }
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_event_buffer_size() -> usize {
    crate::events::DEFAULT_EVENT_BUFFER_SIZE
}

fn default_command_buffer_size() -> usize {
    32
}

impl PlayerConfig {
    /// Creates a new builder starting from the defaults.
    pub fn builder() -> PlayerConfigBuilder {
        PlayerConfigBuilder::default()
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid player configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval < MIN_TICK_INTERVAL {
            return Err(Error::Config(format!(
                "Tick interval must be at least {:?}",
                MIN_TICK_INTERVAL
            )));
        }

        if self.tick_interval > MAX_TICK_INTERVAL {
            return Err(Error::Config(format!(
                "Tick interval exceeds maximum of {:?}",
                MAX_TICK_INTERVAL
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.command_buffer_size == 0 {
            return Err(Error::Config(
                "Command buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`PlayerConfig`].
#[derive(Debug, Default)]
pub struct PlayerConfigBuilder {
    config: PlayerConfig,
}

impl PlayerConfigBuilder {
    /// Sets the position sampling interval.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    /// Sets the per-subscriber event buffer.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.config.event_buffer_size = size;
        self
    }

    /// Sets the command channel capacity.
    pub fn command_buffer_size(mut self, size: usize) -> Self {
        self.config.command_buffer_size = size;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<PlayerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
