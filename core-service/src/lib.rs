//! Core service façade and bootstrap helpers.
//!
//! This crate wires a host-provided decoder factory and the player
//! configuration into one [`PlayerService`]: the playback controller, its
//! command server and its event bus. Hosts connect clients with
//! [`PlayerService::connect`], observe them with [`PlayerService::subscribe`]
//! and tear everything down with [`PlayerService::shutdown`].
//!
//! ```ignore
//! use core_service::PlayerService;
//!
//! let service = PlayerService::builder()
//!     .decoder_factory(factory)
//!     .build()?;
//!
//! let player = service.connect();
//! let mut events = service.subscribe();
//! player.play("file:///music/a.mp3").await?;
//! ```

pub mod error;
pub mod progress;

pub use error::{CoreError, Result};
pub use progress::PlaybackProgress;

use std::sync::Arc;

use bridge_traits::playback::DecoderFactory;
use core_playback::{CommandServer, PlaybackController, PlayerHandle};
use core_runtime::config::PlayerConfig;
use core_runtime::events::EventStream;
use parking_lot::Mutex;
use tracing::info;

/// Builder for [`PlayerService`].
#[derive(Default)]
pub struct PlayerServiceBuilder {
    decoder_factory: Option<Arc<dyn DecoderFactory>>,
    config: PlayerConfig,
}

impl PlayerServiceBuilder {
    /// Factory producing one decoder per playback session. Required.
    pub fn decoder_factory(mut self, factory: Arc<dyn DecoderFactory>) -> Self {
        self.decoder_factory = Some(factory);
        self
    }

    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and starts the service.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Result<PlayerService> {
        let factory = self
            .decoder_factory
            .ok_or_else(|| CoreError::CapabilityMissing {
                capability: "DecoderFactory".to_string(),
                message: "No decoder factory was provided. Hosts must supply a \
                          MediaDecoder implementation for their platform."
                    .to_string(),
            })?;

        self.config.validate()?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CoreError::InitializationFailed(
                "PlayerService must be built inside a Tokio runtime".to_string(),
            ));
        }

        let command_buffer = self.config.command_buffer_size;
        let controller = PlaybackController::new(factory, self.config)?;
        let (server, handle) = CommandServer::spawn(controller.clone(), command_buffer);
        info!("Player service started");

        Ok(PlayerService {
            controller,
            handle,
            server: Mutex::new(Some(server)),
        })
    }
}

/// Primary façade exposed to host applications.
pub struct PlayerService {
    controller: PlaybackController,
    handle: PlayerHandle,
    server: Mutex<Option<CommandServer>>,
}

impl PlayerService {
    pub fn builder() -> PlayerServiceBuilder {
        PlayerServiceBuilder::default()
    }

    /// Hands out a command stub bound to this service.
    ///
    /// After [`shutdown`](Self::shutdown) every stub, including ones obtained
    /// later, fails with `ChannelUnavailable`.
    pub fn connect(&self) -> PlayerHandle {
        self.handle.clone()
    }

    /// Subscribes to player events.
    pub fn subscribe(&self) -> EventStream {
        self.controller.subscribe()
    }

    /// Direct access to the controller, bypassing the command channel.
    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    /// Returns `true` until [`shutdown`](Self::shutdown) is called.
    pub fn is_running(&self) -> bool {
        self.server.lock().is_some()
    }

    /// Stops the command server, then shuts the controller down.
    ///
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        let server = self.server.lock().take();
        let Some(server) = server else {
            return Ok(());
        };

        server.shutdown().await;
        self.controller.shutdown().await;
        info!("Player service shut down");
        Ok(())
    }
}
