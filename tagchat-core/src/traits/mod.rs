mod matchmaking;
mod media;
mod peer;

pub use matchmaking::MatchmakingApi;
pub use media::{MediaSource, MediaStream};
pub use peer::{DataConnection, MediaCall, PeerEvent, PeerService};
