use std::cell::RefCell;
use std::rc::Rc;

use tagchat_core::error::PeerError;
use tagchat_core::event::{event_channel, once_event};
use tagchat_core::model::{
    BrokerNotice, CandidatePayload, ConnectionId, ConnectionKind, IceCandidate, OfferPayload,
    PeerId, SdpKind, SessionDescription, SignalMessage,
};
use tagchat_core::traits::PeerEvent;
use tracing::{debug, info, warn};

use crate::engine::{
    BrowserCall, BrowserConnection, ConnectionState, EngineInner, Link, PeerEngine, rtc_err,
};

pub(crate) fn sdp_type(kind: SdpKind) -> web_sys::RtcSdpType {
    match kind {
        SdpKind::Offer => web_sys::RtcSdpType::Offer,
        SdpKind::Answer => web_sys::RtcSdpType::Answer,
    }
}

fn notice_text(payload: Option<BrokerNotice>) -> String {
    payload
        .map(|notice| notice.msg)
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| "no details".to_string())
}

impl PeerEngine {
    pub(super) fn handle_signal(inner_rc: &Rc<RefCell<EngineInner>>, text: String) {
        let msg = match SignalMessage::parse(&text) {
            Ok(m) => m,
            Err(e) => {
                warn!("Dropping broker message: {}", e);
                return;
            }
        };

        let inner = inner_rc.clone();

        match msg {
            SignalMessage::Open => {
                let id = {
                    let mut inner = inner.borrow_mut();
                    inner.state = ConnectionState::Open;
                    inner.id.clone()
                };
                Self::flush_signals(&inner);
                match id {
                    Some(id) => {
                        info!("Broker opened session {}", id);
                        Self::emit(&inner, PeerEvent::Open(id));
                    }
                    None => warn!("Broker sent OPEN before an id was assigned"),
                }
            }

            SignalMessage::Heartbeat => {}

            SignalMessage::IdTaken { payload } => {
                let text = notice_text(payload);
                warn!("Broker rejected our id: {}", text);
                Self::emit(
                    &inner,
                    PeerEvent::Error(PeerError::Signaling(format!("id taken: {}", text))),
                );
            }

            SignalMessage::Error { payload } => {
                let text = notice_text(payload);
                warn!("Broker error: {}", text);
                Self::emit(&inner, PeerEvent::Error(PeerError::Signaling(text)));
            }

            SignalMessage::Leave { src } | SignalMessage::Expire { src } => {
                info!("Peer {} is gone", src);
                Self::close_links_for(&inner, &src);
            }

            SignalMessage::Offer { src, payload, .. } => match src {
                Some(src) => Self::handle_offer(&inner, src, payload),
                None => warn!("Dropping OFFER {} without a source", payload.connection_id),
            },

            SignalMessage::Answer { payload, .. } => {
                info!("Received ANSWER for {}", payload.connection_id);
                let id = payload.connection_id.clone();
                let task = {
                    let inner = inner.clone();
                    async move {
                        Self::apply_remote_description(&inner, &payload.connection_id, &payload.sdp)
                            .await
                    }
                };
                Self::spawn_link_task(&inner, &id, task);
            }

            SignalMessage::Candidate { payload, .. } => {
                Self::handle_candidate(&inner, payload);
            }

            SignalMessage::Unknown => debug!("Ignoring broker message: {}", text),
        }
    }

    fn handle_offer(inner: &Rc<RefCell<EngineInner>>, src: PeerId, payload: OfferPayload) {
        let id = payload.connection_id;
        if inner.borrow().links.contains_key(&id) {
            warn!("Duplicate OFFER for {}", id);
            return;
        }

        match payload.kind {
            ConnectionKind::Media => {
                info!("Incoming call {} from {}", id, src);
                let (trigger, remote) = once_event();
                let mut link = Link::media(src.clone(), trigger);
                link.pending_offer = Some(payload.sdp);
                inner.borrow_mut().links.insert(id.clone(), link);

                let call = BrowserCall::new(inner.clone(), id, src, remote);
                Self::emit(inner, PeerEvent::Call(Rc::new(call)));
            }

            ConnectionKind::Data => {
                info!(
                    "Incoming data connection {} from {} ({})",
                    id,
                    src,
                    payload.serialization.as_deref().unwrap_or("default")
                );
                let (emitter, messages) = event_channel();
                inner
                    .borrow_mut()
                    .links
                    .insert(id.clone(), Link::data(src.clone(), emitter));

                let task = {
                    let inner = inner.clone();
                    let (id, src) = (id.clone(), src.clone());
                    let offer = payload.sdp;
                    async move { Self::answer_data_offer(&inner, &id, &src, offer).await }
                };
                Self::spawn_link_task(inner, &id, task);

                let connection = BrowserConnection::new(inner.clone(), id, src, messages);
                Self::emit(inner, PeerEvent::Connection(Rc::new(connection)));
            }
        }
    }

    /// Adds a remote candidate now, or holds it until the remote description is set.
    fn handle_candidate(inner: &Rc<RefCell<EngineInner>>, payload: CandidatePayload) {
        let pc = {
            let mut inner = inner.borrow_mut();
            match inner.links.get_mut(&payload.connection_id) {
                Some(link) if link.remote_set => link.pc.clone(),
                Some(link) => {
                    link.pending_candidates.push(payload.candidate.clone());
                    None
                }
                None => {
                    debug!("Candidate for unknown link {}", payload.connection_id);
                    None
                }
            }
        };

        if let Some(pc) = pc {
            Self::add_candidate(&pc, payload.candidate);
        }
    }

    pub(crate) fn add_candidate(pc: &web_sys::RtcPeerConnection, candidate: IceCandidate) {
        let init = web_sys::RtcIceCandidateInit::new(&candidate.candidate);
        if let Some(mid) = &candidate.sdp_mid {
            init.set_sdp_mid(Some(mid));
        }
        if let Some(idx) = candidate.sdp_m_line_index {
            init.set_sdp_m_line_index(Some(idx));
        }

        debug!("Adding ICE: {}", candidate.candidate);
        let promise = pc.add_ice_candidate_with_opt_rtc_ice_candidate_init(Some(&init));

        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                warn!("Error adding ICE: {:?}", e);
            }
        });
    }

    /// Sets the remote description on link `id`, then adds the candidates held for it.
    pub(crate) async fn apply_remote_description(
        inner: &Rc<RefCell<EngineInner>>,
        id: &ConnectionId,
        desc: &SessionDescription,
    ) -> Result<(), PeerError> {
        let pc = inner
            .borrow()
            .links
            .get(id)
            .and_then(|link| link.pc.clone())
            .ok_or(PeerError::Closed)?;

        let init = web_sys::RtcSessionDescriptionInit::new(sdp_type(desc.kind));
        init.set_sdp(&desc.sdp);
        wasm_bindgen_futures::JsFuture::from(pc.set_remote_description(&init))
            .await
            .map_err(rtc_err)?;
        debug!("Remote description set on {}", id);

        let pending = {
            let mut inner = inner.borrow_mut();
            match inner.links.get_mut(id) {
                Some(link) => {
                    link.remote_set = true;
                    std::mem::take(&mut link.pending_candidates)
                }
                None => Vec::new(),
            }
        };
        for candidate in pending {
            Self::add_candidate(&pc, candidate);
        }
        Ok(())
    }
}
