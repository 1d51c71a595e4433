use std::cell::RefCell;
use std::rc::Rc;

use tagchat_core::error::PeerError;
use tagchat_core::event::EventStream;
use tagchat_core::model::{ConnectionId, PeerId};
use tagchat_core::traits::DataConnection;
use web_sys::RtcDataChannelState;

use crate::engine::{EngineInner, PeerEngine, rtc_err};

/// Handle to one text data connection.
pub struct BrowserConnection {
    inner: Rc<RefCell<EngineInner>>,
    id: ConnectionId,
    peer: PeerId,
    messages: RefCell<Option<EventStream<String>>>,
}

impl BrowserConnection {
    pub(crate) fn new(
        inner: Rc<RefCell<EngineInner>>,
        id: ConnectionId,
        peer: PeerId,
        messages: EventStream<String>,
    ) -> Self {
        Self {
            inner,
            id,
            peer,
            messages: RefCell::new(Some(messages)),
        }
    }
}

impl DataConnection for BrowserConnection {
    fn peer(&self) -> &PeerId {
        &self.peer
    }

    /// Sends now if the channel is open, otherwise queues until it opens.
    fn send(&self, text: &str) -> Result<(), PeerError> {
        let mut inner = self.inner.borrow_mut();
        let link = inner.links.get_mut(&self.id).ok_or(PeerError::Closed)?;

        if let Some(dc) = &link.dc {
            if dc.ready_state() == RtcDataChannelState::Open {
                return dc.send_with_str(text).map_err(rtc_err);
            }
        }
        link.outbox.push(text.to_string());
        Ok(())
    }

    fn messages(&self) -> EventStream<String> {
        self.messages
            .borrow_mut()
            .take()
            .unwrap_or_else(EventStream::empty)
    }

    fn close(&self) {
        PeerEngine::close_link(&self.inner, &self.id);
    }
}
