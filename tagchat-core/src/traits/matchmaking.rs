use crate::error::MatchmakingError;
use crate::model::{PeerId, Tag};
use async_trait::async_trait;

/// Tag-based matchmaking server.
#[async_trait(?Send)]
pub trait MatchmakingApi {
    async fn fetch_tags(&self) -> Result<Vec<Tag>, MatchmakingError>;

    /// `None` when the server has nobody to offer.
    async fn find_partner(
        &self,
        own_id: &PeerId,
        tags: &[Tag],
    ) -> Result<Option<PeerId>, MatchmakingError>;
}
