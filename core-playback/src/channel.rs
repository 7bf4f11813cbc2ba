//! # Command Channel
//!
//! Request/acknowledge boundary between remote callers and the controller.
//!
//! A [`CommandServer`] task owns the receiving end of a bounded channel and
//! applies requests to the [`PlaybackController`] one at a time, in arrival
//! order. [`PlayerHandle`] is the cloneable client stub; each call resolves
//! once the controller applied the command, or fails with
//! [`PlaybackError::ChannelUnavailable`] when the server is gone.
//!
//! ```ignore
//! let (server, handle) = CommandServer::spawn(controller, 32);
//!
//! handle.play("https://cdn.example/a.mp3").await?;
//! handle.pause().await?;
//!
//! server.shutdown().await;
//! assert!(handle.stop().await.is_err());
//! ```

use crate::controller::PlaybackController;
use crate::error::{PlaybackError, Result};
use crate::session::SessionSnapshot;

use bridge_traits::playback::MediaLocator;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

/// Commands accepted over the channel.
///
/// Serializable so hosts can carry them across a real process boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlayerCommand {
    Play { locator: MediaLocator },
    Pause,
    Resume,
    Stop,
}

impl PlayerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerCommand::Play { .. } => "play",
            PlayerCommand::Pause => "pause",
            PlayerCommand::Resume => "resume",
            PlayerCommand::Stop => "stop",
        }
    }
}

enum Request {
    Command {
        command: PlayerCommand,
        ack: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Cloneable client stub for a [`CommandServer`].
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    requests: mpsc::Sender<Request>,
}

impl PlayerHandle {
    /// Sends a command and waits until the controller applied it.
    pub async fn send(&self, command: PlayerCommand) -> Result<()> {
        let (ack, applied) = oneshot::channel();
        self.requests
            .send(Request::Command { command, ack })
            .await
            .map_err(|_| PlaybackError::ChannelUnavailable)?;
        applied.await.map_err(|_| PlaybackError::ChannelUnavailable)
    }

    pub async fn play(&self, locator: impl Into<MediaLocator>) -> Result<()> {
        self.send(PlayerCommand::Play {
            locator: locator.into(),
        })
        .await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.send(PlayerCommand::Resume).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(PlayerCommand::Stop).await
    }

    /// Queries the current session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, snapshot) = oneshot::channel();
        self.requests
            .send(Request::Snapshot { reply })
            .await
            .map_err(|_| PlaybackError::ChannelUnavailable)?;
        snapshot.await.map_err(|_| PlaybackError::ChannelUnavailable)
    }

    /// Returns `true` while the server accepts requests.
    pub fn is_connected(&self) -> bool {
        !self.requests.is_closed()
    }
}

/// Task applying channel requests to a controller.
///
/// Dropping the server stops the task like [`shutdown`](Self::shutdown)
/// without waiting for it.
#[derive(Debug)]
pub struct CommandServer {
    handle: PlayerHandle,
    token: CancellationToken,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl CommandServer {
    /// Spawns the server task with a request queue of `buffer` entries.
    ///
    /// # Panics
    ///
    /// Panics if `buffer` is zero or when called outside a Tokio runtime.
    pub fn spawn(controller: PlaybackController, buffer: usize) -> (Self, PlayerHandle) {
        let (requests, receiver) = mpsc::channel(buffer);
        let token = CancellationToken::new();
        let task = tokio::spawn(serve(controller, receiver, token.clone()));
        let handle = PlayerHandle { requests };

        let server = Self {
            handle: handle.clone(),
            _guard: token.clone().drop_guard(),
            token,
            task,
        };
        (server, handle)
    }

    /// Another client stub for this server.
    pub fn handle(&self) -> PlayerHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops accepting requests and waits for the task to exit.
    ///
    /// A request being applied completes; queued ones fail with
    /// [`PlaybackError::ChannelUnavailable`].
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(err) = self.task.await {
            debug!(error = %err, "Command server task ended abnormally");
        }
    }
}

async fn serve(
    controller: PlaybackController,
    mut requests: mpsc::Receiver<Request>,
    token: CancellationToken,
) {
    info!("Command server started");

    loop {
        let request = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            request = requests.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        match request {
            Request::Command { command, ack } => {
                debug!(command = command.name(), "Applying command");
                apply(&controller, command).await;
                // The caller may have stopped waiting.
                let _ = ack.send(());
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(controller.snapshot().await);
            }
        }
    }

    requests.close();
    info!("Command server stopped");
}

async fn apply(controller: &PlaybackController, command: PlayerCommand) {
    match command {
        PlayerCommand::Play { locator } => {
            controller.play(locator).await;
        }
        PlayerCommand::Pause => controller.pause().await,
        PlayerCommand::Resume => controller.resume().await,
        PlayerCommand::Stop => controller.stop().await,
    }
}
