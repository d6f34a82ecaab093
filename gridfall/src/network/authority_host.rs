//! Piece authority served over zenoh

use zenoh::key_expr::KeyExpr;
use zenoh::sample::{Sample, SampleKind};

use crate::authority::PieceAuthority;
use crate::error::{GameError, Result};
use crate::network::keyexpr::{AliveKeyexpr, AuthorityKeyexpr, PlayerKeyexpr};

type SampleSubscriber = zenoh::pubsub::Subscriber<zenoh::handlers::FifoChannelHandler<Sample>>;

/// Runs a [`PieceAuthority`] for every player under a prefix
pub struct AuthorityHost {
    session: zenoh::Session,
    prefix: KeyExpr<'static>,
    authority: PieceAuthority,
    messages: SampleSubscriber,
    liveliness: SampleSubscriber,
}

impl AuthorityHost {
    /// Subscribe to all players and their liveliness tokens
    pub async fn new(
        session: &zenoh::Session,
        prefix: &KeyExpr<'static>,
        authority: PieceAuthority,
    ) -> Result<Self> {
        let messages = session
            .declare_subscriber(KeyExpr::from(PlayerKeyexpr::new(prefix, None)))
            .await
            .map_err(GameError::Zenoh)?;
        let liveliness = session
            .liveliness()
            .declare_subscriber(KeyExpr::from(AliveKeyexpr::new(prefix, None)))
            .await
            .map_err(GameError::Zenoh)?;

        tracing::info!("Piece authority serving on '{}'", prefix);
        Ok(Self {
            session: session.clone(),
            prefix: prefix.clone(),
            authority,
            messages,
            liveliness,
        })
    }

    /// Serve until `stop` fires or is dropped, then hand the authority back
    pub async fn run(mut self, stop: flume::Receiver<()>) -> Result<PieceAuthority> {
        loop {
            tokio::select! {
                _ = stop.recv_async() => {
                    tracing::info!("Piece authority stopping");
                    break;
                }
                sample = self.messages.recv_async() => {
                    let sample = sample.map_err(|e| {
                        GameError::Internal(format!("Failed to receive sample: {}", e))
                    })?;
                    self.handle_message(&sample).await?;
                }
                sample = self.liveliness.recv_async() => {
                    let sample = sample.map_err(|e| {
                        GameError::Internal(format!("Failed to receive liveliness sample: {}", e))
                    })?;
                    self.handle_liveliness(&sample);
                }
            }
        }
        Ok(self.authority)
    }

    async fn handle_message(&mut self, sample: &Sample) -> Result<()> {
        let sender = match PlayerKeyexpr::try_from(sample.key_expr().clone().into_owned()) {
            Ok(keyexpr) => keyexpr.player().cloned(),
            Err(e) => {
                tracing::warn!("Ignoring sample on '{}': {}", sample.key_expr(), e);
                return Ok(());
            }
        };
        let Some(player) = sender else {
            return Ok(());
        };
        let line: String = match zenoh_ext::z_deserialize(sample.payload()) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Undecodable message from '{}': {}", player, e);
                return Ok(());
            }
        };

        if let Some(reply) = self.authority.handle(&player, &line) {
            let keyexpr = AuthorityKeyexpr::new(&self.prefix, player);
            self.session
                .put(KeyExpr::from(keyexpr), zenoh_ext::z_serialize(&reply.to_string()))
                .await
                .map_err(GameError::Zenoh)?;
        }
        Ok(())
    }

    fn handle_liveliness(&mut self, sample: &Sample) {
        if sample.kind() != SampleKind::Delete {
            return;
        }
        match AliveKeyexpr::try_from(sample.key_expr().clone().into_owned()) {
            Ok(keyexpr) => {
                if let Some(player) = keyexpr.player() {
                    self.authority.disconnect(player);
                }
            }
            Err(e) => tracing::warn!("Ignoring liveliness sample on '{}': {}", sample.key_expr(), e),
        }
    }

    pub fn authority(&self) -> &PieceAuthority {
        &self.authority
    }
}
