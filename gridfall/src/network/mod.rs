//! Zenoh transport for the piece protocol

pub mod authority_host;
pub mod keyexpr;
pub mod name_generator;
pub mod player_link;

pub use authority_host::AuthorityHost;
pub use keyexpr::{AliveKeyexpr, AuthorityKeyexpr, PlayerKeyexpr};
pub use player_link::PlayerLink;
