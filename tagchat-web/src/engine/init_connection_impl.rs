use std::cell::RefCell;
use std::rc::Rc;

use tagchat_core::error::PeerError;
use tagchat_core::model::{
    ConnectionId, ConnectionKind, OfferPayload, PeerId, SdpKind, SessionDescription,
    SignalMessage,
};
use tagchat_core::traits::MediaStream;
use tracing::info;

use crate::engine::handle_signal_impl::sdp_type;
use crate::engine::{BROWSER, EngineInner, PeerEngine, rtc_err};

/// Data connections carry plain text frames.
const SERIALIZATION: &str = "raw";

impl PeerEngine {
    pub(super) async fn open_media_call(
        inner: &Rc<RefCell<EngineInner>>,
        id: &ConnectionId,
        peer: &PeerId,
        stream: Option<Rc<dyn MediaStream>>,
    ) -> Result<(), PeerError> {
        let pc = Self::create_pc(inner, id, peer, ConnectionKind::Media)?;
        Self::attach_local_media(&pc, stream.as_ref());
        Self::watch_remote_tracks(inner, &pc, id);
        Self::store_pc(inner, id, &pc)?;

        let offer_sdp = Self::create_local_description(&pc, SdpKind::Offer).await?;

        info!("Sending OFFER for call {} to {}", id, peer);
        Self::send_offer(
            inner,
            peer,
            OfferPayload {
                sdp: SessionDescription::offer(offer_sdp),
                kind: ConnectionKind::Media,
                connection_id: id.clone(),
                label: None,
                serialization: None,
                reliable: None,
                browser: Some(BROWSER.to_string()),
                metadata: None,
            },
        );
        Ok(())
    }

    pub(super) async fn open_data_connection(
        inner: &Rc<RefCell<EngineInner>>,
        id: &ConnectionId,
        peer: &PeerId,
    ) -> Result<(), PeerError> {
        let pc = Self::create_pc(inner, id, peer, ConnectionKind::Data)?;

        let dc = pc.create_data_channel(id.as_str());
        Self::setup_data_channel(inner, id, dc);
        Self::store_pc(inner, id, &pc)?;

        let offer_sdp = Self::create_local_description(&pc, SdpKind::Offer).await?;

        info!("Sending OFFER for data connection {} to {}", id, peer);
        Self::send_offer(
            inner,
            peer,
            OfferPayload {
                sdp: SessionDescription::offer(offer_sdp),
                kind: ConnectionKind::Data,
                connection_id: id.clone(),
                label: Some(id.to_string()),
                serialization: Some(SERIALIZATION.to_string()),
                reliable: Some(true),
                browser: Some(BROWSER.to_string()),
                metadata: None,
            },
        );
        Ok(())
    }

    fn send_offer(inner: &Rc<RefCell<EngineInner>>, peer: &PeerId, payload: OfferPayload) {
        let msg = SignalMessage::Offer {
            src: None,
            dst: Some(peer.clone()),
            payload,
        };
        Self::send_signal(inner, &msg);
    }

    /// Creates an offer or answer, sets it as the local description and returns its SDP.
    pub(crate) async fn create_local_description(
        pc: &web_sys::RtcPeerConnection,
        kind: SdpKind,
    ) -> Result<String, PeerError> {
        let promise = match kind {
            SdpKind::Offer => pc.create_offer(),
            SdpKind::Answer => pc.create_answer(),
        };
        let desc_val = wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(rtc_err)?;
        let sdp = js_sys::Reflect::get(&desc_val, &"sdp".into())
            .map_err(rtc_err)?
            .as_string()
            .ok_or_else(|| PeerError::Rtc("session description without sdp".to_string()))?;

        let desc = web_sys::RtcSessionDescriptionInit::new(sdp_type(kind));
        desc.set_sdp(&sdp);
        wasm_bindgen_futures::JsFuture::from(pc.set_local_description(&desc))
            .await
            .map_err(rtc_err)?;

        Ok(sdp)
    }
}
