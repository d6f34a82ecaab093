/// Error types for the gridfall library
use thiserror::Error;

/// Result type alias for gridfall operations
pub type Result<T> = std::result::Result<T, GameError>;

/// Errors that can occur in gridfall operations
#[derive(Debug, Error)]
pub enum GameError {
    /// Zenoh-related errors
    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    /// Invalid player name provided
    #[error("Invalid player name: {0}. Must be a valid single-chunk keyexpr (no /, *, $, ?, #, @)")]
    InvalidPlayerName(String),

    /// Invalid keyexpr pattern
    #[error("Invalid keyexpr: {0}")]
    InvalidKeyexpr(String),

    /// Piece identifier outside the catalog
    #[error("Invalid piece identifier: {0}")]
    InvalidPiece(i64),

    /// Protocol line that could not be parsed
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// A piece was consumed before the authority delivered it.
    ///
    /// Every local consumption is paired with exactly one `PIECE` request, so
    /// hitting this means the request/consume pairing was broken.
    #[error("Piece backlog exhausted: consumption outran the piece authority")]
    BacklogExhausted,

    /// The peer end of a message channel is gone
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
