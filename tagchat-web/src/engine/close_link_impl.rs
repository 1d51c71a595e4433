use std::cell::RefCell;
use std::rc::Rc;

use tagchat_core::model::{ConnectionId, PeerId};
use tracing::{debug, info, warn};
use web_sys::RtcDataChannelState;

use crate::engine::{EngineInner, Link, PeerEngine, sleep_ms};

const DRAIN_POLL_MS: i32 = 20;
/// Upper bound on how long a closing link waits for queued text to reach the peer.
const DRAIN_TIMEOUT_MS: i32 = 3_000;

/// Transport of a closed link that still has text to deliver.
pub(crate) struct Draining {
    dc: web_sys::RtcDataChannel,
    pc: Option<web_sys::RtcPeerConnection>,
    outbox: Vec<String>,
}

impl Link {
    /// Ends the call's remote-stream event and the connection's message stream.
    /// A data link that is open or still opening hands back its transport so the
    /// outbox and the channel buffer can drain before the peer connection goes.
    pub(crate) fn close(self) -> Option<Draining> {
        if let Some(trigger) = &self.remote_stream {
            trigger.close();
        }
        if let Some(messages) = &self.messages {
            messages.close();
        }

        match self.dc {
            Some(dc)
                if matches!(
                    dc.ready_state(),
                    RtcDataChannelState::Connecting | RtcDataChannelState::Open
                ) =>
            {
                Some(Draining {
                    dc,
                    pc: self.pc,
                    outbox: self.outbox,
                })
            }
            dc => {
                if let Some(dc) = dc {
                    dc.close();
                }
                if let Some(pc) = self.pc {
                    pc.close();
                }
                None
            }
        }
    }
}

impl Draining {
    /// Sends the outbox once the channel is open, waits for the send buffer to
    /// empty, closes the channel and waits for it to report closed, then closes
    /// the peer connection.
    pub(crate) async fn run(self) {
        let label = self.dc.label();
        let mut waited = 0;

        while self.dc.ready_state() == RtcDataChannelState::Connecting && waited < DRAIN_TIMEOUT_MS {
            waited += Self::pause().await;
        }

        if self.dc.ready_state() == RtcDataChannelState::Open {
            for text in &self.outbox {
                if let Err(e) = self.dc.send_with_str(text) {
                    warn!("Failed to flush {} on closing {}: {:?}", text, label, e);
                }
            }
            while self.dc.buffered_amount() > 0
                && self.dc.ready_state() == RtcDataChannelState::Open
                && waited < DRAIN_TIMEOUT_MS
            {
                waited += Self::pause().await;
            }
        } else if !self.outbox.is_empty() {
            warn!(
                "Dropping {} queued message(s); {} never opened",
                self.outbox.len(),
                label
            );
        }

        self.dc.close();
        while self.dc.ready_state() != RtcDataChannelState::Closed && waited < DRAIN_TIMEOUT_MS {
            waited += Self::pause().await;
        }
        if let Some(pc) = &self.pc {
            pc.close();
        }
        debug!("Link {} drained after {}ms", label, waited);
    }

    async fn pause() -> i32 {
        if let Err(e) = sleep_ms(DRAIN_POLL_MS).await {
            warn!("Drain timer failed: {:?}", e);
            return DRAIN_TIMEOUT_MS;
        }
        DRAIN_POLL_MS
    }
}

impl PeerEngine {
    pub(crate) fn close_link(inner: &Rc<RefCell<EngineInner>>, id: &ConnectionId) {
        let link = inner.borrow_mut().links.remove(id);
        if let Some(link) = link {
            info!("Closing {:?} link {} to {}", link.kind, id, link.peer);
            Self::finish(link);
        }
    }

    pub(crate) fn close_links_for(inner: &Rc<RefCell<EngineInner>>, peer: &PeerId) {
        let links: Vec<(ConnectionId, Link)> = {
            let mut inner = inner.borrow_mut();
            let ids: Vec<ConnectionId> = inner
                .links
                .iter()
                .filter(|(_, link)| &link.peer == peer)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| inner.links.remove(&id).map(|link| (id, link)))
                .collect()
        };

        for (id, link) in links {
            info!("Closing link {} after {} left", id, peer);
            Self::finish(link);
        }
    }

    fn finish(link: Link) {
        if let Some(draining) = link.close() {
            wasm_bindgen_futures::spawn_local(draining.run());
        }
    }
}
