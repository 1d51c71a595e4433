//! REST client for the tag matchmaking server.
//!
//! Runs in the browser (reqwest drives `fetch`) and natively.

use crate::config::MatchmakerConfig;
use crate::error::MatchmakingError;
use crate::model::{FindPartnerRequest, FindPartnerResponse, PeerId, Tag, TagsResponse};
use crate::traits::MatchmakingApi;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

pub const TAGS_PATH: &str = "/get-tags";
pub const FIND_PARTNER_PATH: &str = "/get-user-by-tags";

#[derive(Debug, Clone)]
pub struct HttpMatchmaker {
    config: MatchmakerConfig,
    http: Client,
}

impl HttpMatchmaker {
    pub fn new(config: MatchmakerConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, MatchmakingError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MatchmakingError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| MatchmakingError::Decode(e.to_string()))
}

#[async_trait(?Send)]
impl MatchmakingApi for HttpMatchmaker {
    async fn fetch_tags(&self) -> Result<Vec<Tag>, MatchmakingError> {
        let url = self.config.endpoint(TAGS_PATH);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        let body: TagsResponse = parse_json(response).await?;
        Ok(body.tags)
    }

    async fn find_partner(
        &self,
        own_id: &PeerId,
        tags: &[Tag],
    ) -> Result<Option<PeerId>, MatchmakingError> {
        let url = self.config.endpoint(FIND_PARTNER_PATH);
        debug!("POST {} as {} with {} tags", url, own_id, tags.len());

        let request = FindPartnerRequest {
            username: own_id.clone(),
            tags: tags.to_vec(),
        };
        let response = self.http.post(&url).json(&request).send().await?;
        let body: FindPartnerResponse = parse_json(response).await?;

        let partner = body.partner();
        match &partner {
            Some(peer) => info!("Matched with {}", peer),
            None => info!("No partner available"),
        }
        Ok(partner)
    }
}
