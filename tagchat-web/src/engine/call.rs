use std::cell::RefCell;
use std::rc::Rc;

use tagchat_core::event::OnceEvent;
use tagchat_core::model::{ConnectionId, PeerId};
use tagchat_core::traits::{MediaCall, MediaStream};
use tracing::info;

use crate::engine::{EngineInner, PeerEngine};

/// Handle to one call. Dropping it leaves the link open; `close` ends it.
pub struct BrowserCall {
    inner: Rc<RefCell<EngineInner>>,
    id: ConnectionId,
    peer: PeerId,
    remote: RefCell<Option<OnceEvent<Rc<dyn MediaStream>>>>,
}

impl BrowserCall {
    pub(crate) fn new(
        inner: Rc<RefCell<EngineInner>>,
        id: ConnectionId,
        peer: PeerId,
        remote: OnceEvent<Rc<dyn MediaStream>>,
    ) -> Self {
        Self {
            inner,
            id,
            peer,
            remote: RefCell::new(Some(remote)),
        }
    }
}

impl MediaCall for BrowserCall {
    fn peer(&self) -> &PeerId {
        &self.peer
    }

    fn answer(&self, stream: Option<Rc<dyn MediaStream>>) {
        info!("Answering call {} from {}", self.id, self.peer);
        let task = {
            let inner = self.inner.clone();
            let id = self.id.clone();
            async move { PeerEngine::answer_media_offer(&inner, &id, stream).await }
        };
        PeerEngine::spawn_link_task(&self.inner, &self.id, task);
    }

    fn remote_stream(&self) -> OnceEvent<Rc<dyn MediaStream>> {
        self.remote
            .borrow_mut()
            .take()
            .unwrap_or_else(OnceEvent::closed)
    }

    fn close(&self) {
        PeerEngine::close_link(&self.inner, &self.id);
    }
}
