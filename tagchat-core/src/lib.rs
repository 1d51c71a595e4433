//! Core of the tagchat random video-chat client.
//!
//! Everything here is independent of the browser: the model and wire formats,
//! configuration, the platform seams in [`traits`], the session caches, the
//! matchmaking REST client and the [`Session`] controller.

pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod matchmaker;
pub mod model;
pub mod session;
pub mod traits;

pub use cache::{MediaAcquirer, SessionContext, TagFetcher};
pub use config::{ClientConfig, IceServerConfig, MatchmakerConfig, MediaConstraints, SignalingConfig};
pub use error::{ConfigError, MatchmakingError, MediaError, PeerError, ProtocolError, SessionError};
pub use matchmaker::HttpMatchmaker;
pub use model::{ControlMessage, PeerId, SelectedTags, SignalMessage, Tag};
pub use session::{ConnectOutcome, Phase, Session, SessionSnapshot};
