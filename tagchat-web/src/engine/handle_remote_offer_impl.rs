use std::cell::RefCell;
use std::rc::Rc;

use tagchat_core::error::PeerError;
use tagchat_core::model::{
    AnswerPayload, ConnectionId, ConnectionKind, PeerId, SdpKind, SessionDescription,
    SignalMessage,
};
use tagchat_core::traits::MediaStream;
use tracing::info;
use wasm_bindgen::prelude::*;

use crate::engine::{BROWSER, EngineInner, PeerEngine};

impl PeerEngine {
    /// Answers an inbound call offer that was held until the user side answered.
    pub(crate) async fn answer_media_offer(
        inner: &Rc<RefCell<EngineInner>>,
        id: &ConnectionId,
        stream: Option<Rc<dyn MediaStream>>,
    ) -> Result<(), PeerError> {
        let (peer, offer) = {
            let mut inner = inner.borrow_mut();
            let link = inner.links.get_mut(id).ok_or(PeerError::Closed)?;
            let offer = link
                .pending_offer
                .take()
                .ok_or_else(|| PeerError::Signaling(format!("call {} already answered", id)))?;
            (link.peer.clone(), offer)
        };

        let pc = Self::create_pc(inner, id, &peer, ConnectionKind::Media)?;
        Self::watch_remote_tracks(inner, &pc, id);
        Self::store_pc(inner, id, &pc)?;

        Self::apply_remote_description(inner, id, &offer).await?;
        // Without local media the offered transceivers already answer receive-only.
        if stream.is_some() {
            Self::attach_local_media(&pc, stream.as_ref());
        }

        Self::send_answer(inner, &pc, id, &peer, ConnectionKind::Media).await
    }

    /// Answers an inbound data connection offer right away.
    pub(crate) async fn answer_data_offer(
        inner: &Rc<RefCell<EngineInner>>,
        id: &ConnectionId,
        peer: &PeerId,
        offer: SessionDescription,
    ) -> Result<(), PeerError> {
        let pc = Self::create_pc(inner, id, peer, ConnectionKind::Data)?;

        let ondatachannel_callback = {
            let inner = inner.clone();
            let id = id.clone();
            Closure::wrap(Box::new(move |ev: web_sys::RtcDataChannelEvent| {
                let dc = ev.channel();
                info!("Received DataChannel: {}", dc.label());
                Self::setup_data_channel(&inner, &id, dc);
            }) as Box<dyn FnMut(web_sys::RtcDataChannelEvent)>)
        };
        pc.set_ondatachannel(Some(ondatachannel_callback.as_ref().unchecked_ref()));
        ondatachannel_callback.forget();

        Self::store_pc(inner, id, &pc)?;
        Self::apply_remote_description(inner, id, &offer).await?;

        Self::send_answer(inner, &pc, id, peer, ConnectionKind::Data).await
    }

    async fn send_answer(
        inner: &Rc<RefCell<EngineInner>>,
        pc: &web_sys::RtcPeerConnection,
        id: &ConnectionId,
        peer: &PeerId,
        kind: ConnectionKind,
    ) -> Result<(), PeerError> {
        let answer_sdp = Self::create_local_description(pc, SdpKind::Answer).await?;

        info!("Sending ANSWER for {} to {}", id, peer);
        let msg = SignalMessage::Answer {
            src: None,
            dst: Some(peer.clone()),
            payload: AnswerPayload {
                sdp: SessionDescription::answer(answer_sdp),
                kind,
                connection_id: id.clone(),
                browser: Some(BROWSER.to_string()),
            },
        };
        Self::send_signal(inner, &msg);
        Ok(())
    }
}
