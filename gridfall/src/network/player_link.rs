//! Player side of the zenoh link to the piece authority

use tokio::task::JoinHandle;
use zenoh::key_expr::KeyExpr;
use zenoh::liveliness::LivelinessToken;

use crate::error::{GameError, Result};
use crate::multiplayer::Channel;
use crate::network::keyexpr::{AliveKeyexpr, AuthorityKeyexpr, PlayerKeyexpr};
use crate::types::PlayerId;

/// Bridges a [`Channel`] onto zenoh
///
/// Lines sent on the game side are published on `<prefix>/player/<name>`;
/// lines published by the authority on `<prefix>/authority/<name>` come
/// back on the game side. A liveliness token on `<prefix>/alive/<name>`
/// lives as long as the link, so the authority notices a vanished player.
pub struct PlayerLink {
    player: PlayerId,
    task: JoinHandle<()>,
}

impl PlayerLink {
    /// Declare the link and return the channel end for a [`MultiplayerGame`](crate::MultiplayerGame)
    ///
    /// The link stops when the game side of the channel is dropped.
    pub async fn connect(
        session: &zenoh::Session,
        prefix: &KeyExpr<'static>,
        player: PlayerId,
    ) -> Result<(Self, Channel)> {
        let publisher = session
            .declare_publisher(KeyExpr::from(PlayerKeyexpr::new(prefix, Some(player.clone()))))
            .await
            .map_err(GameError::Zenoh)?;
        let subscriber = session
            .declare_subscriber(KeyExpr::from(AuthorityKeyexpr::new(prefix, player.clone())))
            .await
            .map_err(GameError::Zenoh)?;
        let token = session
            .liveliness()
            .declare_token(KeyExpr::from(AliveKeyexpr::new(prefix, Some(player.clone()))))
            .await
            .map_err(GameError::Zenoh)?;

        let (game_end, link_end) = Channel::pair();
        let name = player.clone();
        let task = tokio::spawn(async move {
            // held for the lifetime of the link
            let _token: LivelinessToken = token;
            loop {
                tokio::select! {
                    line = link_end.inbound.recv_async() => {
                        let Ok(line) = line else {
                            tracing::info!("Player '{}' link closed by the game", name);
                            break;
                        };
                        if let Err(e) = publisher.put(zenoh_ext::z_serialize(&line)).await {
                            tracing::warn!("Player '{}' failed to send '{}': {}", name, line, e);
                        }
                    }
                    sample = subscriber.recv_async() => {
                        let Ok(sample) = sample else {
                            tracing::warn!("Player '{}' subscriber closed", name);
                            break;
                        };
                        match zenoh_ext::z_deserialize::<String>(sample.payload()) {
                            Ok(line) => {
                                if link_end.outbound.send(line).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Player '{}' received undecodable payload: {}", name, e);
                            }
                        }
                    }
                }
            }
        });

        tracing::info!("Player '{}' linked on '{}'", player, prefix);
        Ok((PlayerLink { player, task }, game_end))
    }

    pub fn player(&self) -> &PlayerId {
        &self.player
    }

    pub fn is_connected(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PlayerLink {
    fn drop(&mut self) {
        self.task.abort();
    }
}
