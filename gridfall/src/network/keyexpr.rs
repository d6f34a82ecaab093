//! Key expression types for the player/authority link

use crate::error::GameError;
use crate::types::PlayerId;
use zenoh::key_expr::KeyExpr;

const PLAYER_CHUNK: &str = "player";
const AUTHORITY_CHUNK: &str = "authority";
const ALIVE_CHUNK: &str = "alive";

// Split `<prefix>/<role>/<player>` into prefix and player, `*` meaning any player
fn split(keyexpr: &KeyExpr<'_>, role: &str, type_name: &str) -> Result<(String, Option<PlayerId>), GameError> {
    let parts: Vec<&str> = keyexpr.as_str().split('/').collect();

    // Expected pattern: [...prefix]/<role>/<player or *>
    if parts.len() < 3 || parts[parts.len() - 2] != role {
        return Err(GameError::InvalidKeyexpr(format!(
            "Invalid {} pattern: {}",
            type_name,
            keyexpr.as_str()
        )));
    }

    let player = match parts[parts.len() - 1] {
        "*" => None,
        name => Some(PlayerId::from_name(name)?),
    };
    let prefix = parts[..parts.len() - 2].join("/");
    Ok((prefix, player))
}

fn join(prefix: &str, role: &str, player: Option<&PlayerId>) -> KeyExpr<'static> {
    let player = player.map(PlayerId::as_str).unwrap_or("*");
    let keyexpr_str = format!("{}/{}/{}", prefix, role, player);
    // prefix comes from a valid KeyExpr and the player name is a single chunk
    KeyExpr::try_from(keyexpr_str).unwrap().into_owned()
}

/// Lines sent by a player to the authority
///
/// Pattern: `<prefix>/player/<name>`, or `<prefix>/player/*` to listen to
/// every player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerKeyexpr {
    prefix: String,
    player: Option<PlayerId>,
}

impl PlayerKeyexpr {
    pub fn new(prefix: &KeyExpr, player: Option<PlayerId>) -> Self {
        Self {
            prefix: prefix.to_string(),
            player,
        }
    }

    /// Sending player, `None` for the wildcard
    pub fn player(&self) -> Option<&PlayerId> {
        self.player.as_ref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl TryFrom<KeyExpr<'_>> for PlayerKeyexpr {
    type Error = GameError;

    fn try_from(keyexpr: KeyExpr<'_>) -> Result<Self, Self::Error> {
        let (prefix, player) = split(&keyexpr, PLAYER_CHUNK, "PlayerKeyexpr")?;
        Ok(Self { prefix, player })
    }
}

impl From<PlayerKeyexpr> for KeyExpr<'static> {
    fn from(keyexpr: PlayerKeyexpr) -> Self {
        join(&keyexpr.prefix, PLAYER_CHUNK, keyexpr.player.as_ref())
    }
}

/// Lines sent by the authority to one player
///
/// Pattern: `<prefix>/authority/<name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyexpr {
    prefix: String,
    player: PlayerId,
}

impl AuthorityKeyexpr {
    pub fn new(prefix: &KeyExpr, player: PlayerId) -> Self {
        Self {
            prefix: prefix.to_string(),
            player,
        }
    }

    /// Receiving player
    pub fn player(&self) -> &PlayerId {
        &self.player
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl TryFrom<KeyExpr<'_>> for AuthorityKeyexpr {
    type Error = GameError;

    fn try_from(keyexpr: KeyExpr<'_>) -> Result<Self, Self::Error> {
        match split(&keyexpr, AUTHORITY_CHUNK, "AuthorityKeyexpr")? {
            (prefix, Some(player)) => Ok(Self { prefix, player }),
            (_, None) => Err(GameError::InvalidKeyexpr(format!(
                "AuthorityKeyexpr needs a player name: {}",
                keyexpr.as_str()
            ))),
        }
    }
}

impl From<AuthorityKeyexpr> for KeyExpr<'static> {
    fn from(keyexpr: AuthorityKeyexpr) -> Self {
        join(&keyexpr.prefix, AUTHORITY_CHUNK, Some(&keyexpr.player))
    }
}

/// Liveliness token of a player
///
/// Pattern: `<prefix>/alive/<name>`, or `<prefix>/alive/*` to watch every player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliveKeyexpr {
    prefix: String,
    player: Option<PlayerId>,
}

impl AliveKeyexpr {
    pub fn new(prefix: &KeyExpr, player: Option<PlayerId>) -> Self {
        Self {
            prefix: prefix.to_string(),
            player,
        }
    }

    pub fn player(&self) -> Option<&PlayerId> {
        self.player.as_ref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl TryFrom<KeyExpr<'_>> for AliveKeyexpr {
    type Error = GameError;

    fn try_from(keyexpr: KeyExpr<'_>) -> Result<Self, Self::Error> {
        let (prefix, player) = split(&keyexpr, ALIVE_CHUNK, "AliveKeyexpr")?;
        Ok(Self { prefix, player })
    }
}

impl From<AliveKeyexpr> for KeyExpr<'static> {
    fn from(keyexpr: AliveKeyexpr) -> Self {
        join(&keyexpr.prefix, ALIVE_CHUNK, keyexpr.player.as_ref())
    }
}
