use crate::model::peer::PeerId;
use crate::model::tag::Tag;
use serde::{Deserialize, Serialize};

/// Body of `GET /get-tags`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Body of `POST /get-user-by-tags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindPartnerRequest {
    pub username: PeerId,
    pub tags: Vec<Tag>,
}

/// Reply of `POST /get-user-by-tags`. A missing, null or empty name means no match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindPartnerResponse {
    #[serde(default)]
    pub username: Option<String>,
}

impl FindPartnerResponse {
    pub fn partner(self) -> Option<PeerId> {
        self.username.filter(|name| !name.is_empty()).map(PeerId::from)
    }
}
