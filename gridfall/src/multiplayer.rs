//! Game variant fed by a remote piece authority

use std::ops::Deref;
use std::sync::Mutex;

use tokio::task::JoinHandle;

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::game::state::GameState;
use crate::game::supply::RemoteSupply;
use crate::game::Game;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::scores::ScoreEntry;

/// One end of a bidirectional line channel
pub struct Channel {
    /// Lines sent to the peer
    pub outbound: flume::Sender<String>,
    /// Lines received from the peer
    pub inbound: flume::Receiver<String>,
}

impl Channel {
    /// Two connected ends: what one sends the other receives
    pub fn pair() -> (Channel, Channel) {
        let (a_tx, a_rx) = flume::unbounded();
        let (b_tx, b_rx) = flume::unbounded();
        (
            Channel {
                outbound: a_tx,
                inbound: b_rx,
            },
            Channel {
                outbound: b_tx,
                inbound: a_rx,
            },
        )
    }
}

/// Game whose pieces come from a remote authority
///
/// Dereferences to the underlying [`Game`] for placement, rotation and
/// snapshots. Inbound `PIECE` lines fill the current slot, then the
/// following slot, then the backlog. Score, lives and game over are
/// reported back on the outbound side. A `NEWSCORE` from the authority
/// triggers a fresh `HISCORES` request.
pub struct MultiplayerGame {
    game: Game<RemoteSupply>,
    outbound: flume::Sender<String>,
    inbound: flume::Receiver<String>,
    listener: Option<JoinHandle<()>>,
}

impl MultiplayerGame {
    pub fn new(config: GameConfig, channel: Channel) -> Self {
        let supply = RemoteSupply::new(channel.outbound.clone(), config.prefetch);
        MultiplayerGame {
            game: Game::new(config, supply),
            outbound: channel.outbound,
            inbound: channel.inbound,
            listener: None,
        }
    }

    /// Request the opening pieces, start the timer and listen to the authority
    pub fn start(&mut self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| GameError::Internal(format!("no tokio runtime for the game listener: {}", e)))?;
        self.game.start()?;

        let state = self.game.shared_state();
        let inbound = self.inbound.clone();
        let outbound = self.outbound.clone();
        self.listener = Some(runtime.spawn(async move {
            while let Ok(line) = inbound.recv_async().await {
                Self::handle_line(&state, &outbound, &line);
            }
            tracing::info!("Piece authority channel closed");
        }));
        Ok(())
    }

    fn handle_line(
        state: &Mutex<GameState<RemoteSupply>>,
        outbound: &flume::Sender<String>,
        line: &str,
    ) {
        match line.parse::<ServerMessage>() {
            Ok(ServerMessage::Piece(id)) => {
                if let Err(e) = Game::<RemoteSupply>::locked(state).deliver_piece(id) {
                    tracing::warn!("Dropping piece {} from authority: {}", id, e);
                }
            }
            Ok(ServerMessage::Scores(standings)) => {
                tracing::debug!("Received standings for {} players", standings.len());
                Game::<RemoteSupply>::locked(state).emit_standings(standings);
            }
            Ok(ServerMessage::HiScores(entries)) => {
                Game::<RemoteSupply>::locked(state).emit_hiscores(entries);
            }
            Ok(ServerMessage::NewScore) => {
                tracing::info!("High score accepted, reloading the online list");
                if outbound.send(ClientMessage::HiScores.to_string()).is_err() {
                    tracing::warn!("Cannot reload high scores, authority channel closed");
                }
            }
            Err(e) => {
                tracing::warn!("Ignoring message '{}' from authority: {}", line.trim(), e);
            }
        }
    }

    /// Ask the authority for the standings; they arrive as a
    /// [`GameEvent::Standings`](crate::GameEvent::Standings) event
    pub fn request_standings(&self) -> Result<()> {
        self.send(ClientMessage::Scores)
    }

    /// Ask the authority for the online high-score list; it arrives as a
    /// [`GameEvent::HiScores`](crate::GameEvent::HiScores) event
    pub fn request_hiscores(&self) -> Result<()> {
        self.send(ClientMessage::HiScores)
    }

    /// Offer a score to the online high-score list
    pub fn submit_hiscore(&self, entry: ScoreEntry) -> Result<()> {
        self.send(ClientMessage::HiScore(entry))
    }

    fn send(&self, message: ClientMessage) -> Result<()> {
        self.outbound
            .send(message.to_string())
            .map_err(|e| GameError::ChannelClosed(e.to_string()))
    }

    /// Piece identifiers received but not yet promoted
    pub fn backlog(&self) -> Vec<u8> {
        self.game.lock().supply.backlog().collect()
    }
}

impl Deref for MultiplayerGame {
    type Target = Game<RemoteSupply>;

    fn deref(&self) -> &Self::Target {
        &self.game
    }
}

impl Drop for MultiplayerGame {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
