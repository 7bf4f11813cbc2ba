//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and the
//! platform-specific pieces it drives but does not own. Each trait represents
//! a capability the core requires but that must be implemented differently
//! per platform.
//!
//! ## Traits
//!
//! ### Playback
//! - [`MediaDecoder`](playback::MediaDecoder) - Decoder/renderer for one playback session
//! - [`DecoderFactory`](playback::DecoderFactory) - Creates a decoder per session
//! - [`DecoderListener`](playback::DecoderListener) - Asynchronous ready/failed/finished callbacks
//!
//! ### Utilities
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! and include context (locator, device) in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`: the core calls decoders from its
//! command, callback and sampler tasks concurrently.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::playback::{DecoderListener, MediaDecoder, MediaLocator};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! pub struct NativePlayer { /* platform handle */ }
//!
//! #[async_trait]
//! impl MediaDecoder for NativePlayer {
//!     async fn load(&self, locator: &MediaLocator, listener: Arc<dyn DecoderListener>) -> Result<()> {
//!         // hand the locator to the platform player, call listener.on_ready() when prepared
//!         todo!()
//!     }
//!     // ...
//! }
//! ```

pub mod error;
pub mod playback;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use playback::{
    DecoderFactory, DecoderListener, MediaDecoder, MediaLocator, PlaybackSessionId, PlaybackState,
};
pub use time::{LogEntry, LogLevel, LoggerSink};
