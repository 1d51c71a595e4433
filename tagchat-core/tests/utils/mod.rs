pub mod mock_matchmaker;
pub mod mock_media;
pub mod mock_peer;
pub mod stub_matchmaker;

pub use harness::*;
pub use local_spawner::*;
pub use mock_matchmaker::*;
pub use mock_media::*;
pub use mock_peer::*;
pub use stub_matchmaker::*;
