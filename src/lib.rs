//! Workspace placeholder crate.
//!
//! This crate exists to expose the playback core as a single dependency.
//! Host applications can depend on `media-player-workspace` and use the
//! re-exported `core_service` façade without wiring each workspace crate
//! individually.

#[cfg(feature = "service")]
pub use core_service;
