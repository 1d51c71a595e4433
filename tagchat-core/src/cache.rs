//! Lazily filled, session-scoped caches for the local stream and the tag list.

use crate::config::{ClientConfig, MediaConstraints};
use crate::error::MatchmakingError;
use crate::model::Tag;
use crate::traits::{MatchmakingApi, MediaSource, MediaStream};
use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, error, info};

type PendingMedia = Shared<LocalBoxFuture<'static, Option<Rc<dyn MediaStream>>>>;
type PendingTags = Shared<LocalBoxFuture<'static, Result<Vec<Tag>, MatchmakingError>>>;

/// Requests local capture at most once per session.
///
/// Concurrent callers share the in-flight request. A failed request is logged,
/// resolves to `None` and is not cached, so the next call prompts again.
pub struct MediaAcquirer {
    source: Rc<dyn MediaSource>,
    constraints: MediaConstraints,
    slot: RefCell<Option<PendingMedia>>,
}

impl MediaAcquirer {
    pub fn new(source: Rc<dyn MediaSource>, constraints: MediaConstraints) -> Self {
        Self {
            source,
            constraints,
            slot: RefCell::new(None),
        }
    }

    pub async fn get(&self) -> Option<Rc<dyn MediaStream>> {
        let pending = self
            .slot
            .borrow_mut()
            .get_or_insert_with(|| {
                let source = self.source.clone();
                let constraints = self.constraints;
                async move {
                    debug!("Requesting user media: {:?}", constraints);
                    match source.request_user_media(&constraints).await {
                        Ok(stream) => {
                            info!("Local media acquired: {}", stream.id());
                            Some(stream)
                        }
                        Err(e) => {
                            error!("Failed to acquire local media: {}", e);
                            None
                        }
                    }
                }
                .boxed_local()
                .shared()
            })
            .clone();

        let stream = pending.clone().await;
        if stream.is_none() {
            let mut slot = self.slot.borrow_mut();
            if slot.as_ref().is_some_and(|s| s.ptr_eq(&pending)) {
                *slot = None;
            }
        }
        stream
    }

    /// The stream if a request already succeeded.
    pub fn cached(&self) -> Option<Rc<dyn MediaStream>> {
        self.slot
            .borrow()
            .as_ref()
            .and_then(|pending| pending.peek().cloned().flatten())
    }
}

/// Fetches the tag list at most once per session.
///
/// Concurrent callers share the in-flight request. Errors reach every waiting
/// caller and are not cached.
pub struct TagFetcher {
    api: Rc<dyn MatchmakingApi>,
    slot: RefCell<Option<PendingTags>>,
}

impl TagFetcher {
    pub fn new(api: Rc<dyn MatchmakingApi>) -> Self {
        Self {
            api,
            slot: RefCell::new(None),
        }
    }

    pub async fn get(&self) -> Result<Vec<Tag>, MatchmakingError> {
        let pending = self
            .slot
            .borrow_mut()
            .get_or_insert_with(|| {
                let api = self.api.clone();
                async move {
                    let tags = api.fetch_tags().await?;
                    info!("Fetched {} tags", tags.len());
                    Ok(tags)
                }
                .boxed_local()
                .shared()
            })
            .clone();

        let tags = pending.clone().await;
        if tags.is_err() {
            let mut slot = self.slot.borrow_mut();
            if slot.as_ref().is_some_and(|s| s.ptr_eq(&pending)) {
                *slot = None;
            }
        }
        tags
    }

    pub fn cached(&self) -> Option<Vec<Tag>> {
        self.slot
            .borrow()
            .as_ref()
            .and_then(|pending| pending.peek().cloned())
            .and_then(Result::ok)
    }
}

/// Everything a session needs that outlives a single call.
pub struct SessionContext {
    pub config: ClientConfig,
    pub media: MediaAcquirer,
    pub tags: TagFetcher,
    pub matchmaker: Rc<dyn MatchmakingApi>,
}

impl SessionContext {
    pub fn new(
        config: ClientConfig,
        media_source: Rc<dyn MediaSource>,
        matchmaker: Rc<dyn MatchmakingApi>,
    ) -> Self {
        Self {
            media: MediaAcquirer::new(media_source, config.media),
            tags: TagFetcher::new(matchmaker.clone()),
            matchmaker,
            config,
        }
    }
}
