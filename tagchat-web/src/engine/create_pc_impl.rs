use std::cell::RefCell;
use std::rc::Rc;

use tagchat_core::config::{
    DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2, DEFAULT_STUN_ADDR_3, DEFAULT_STUN_ADDR_4,
};
use tagchat_core::error::PeerError;
use tagchat_core::model::{
    CandidatePayload, ConnectionId, ConnectionKind, IceCandidate, PeerId, SignalMessage,
};
use tagchat_core::traits::MediaStream;
use tracing::{debug, info, warn};
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::{RtcIceConnectionState, RtcRtpTransceiverDirection, RtcRtpTransceiverInit};

use crate::engine::{EngineInner, PeerEngine, rtc_err};
use crate::media::BrowserStream;

impl PeerEngine {
    /// New peer connection for link `id`. Local ICE candidates are relayed to
    /// `peer` through the broker; a failed or closed ICE transport closes the link.
    pub(crate) fn create_pc(
        inner: &Rc<RefCell<EngineInner>>,
        id: &ConnectionId,
        peer: &PeerId,
        kind: ConnectionKind,
    ) -> Result<web_sys::RtcPeerConnection, PeerError> {
        let rtc_config = web_sys::RtcConfiguration::new();
        let ice_servers_arr = js_sys::Array::new();

        let servers = inner.borrow().config.ice_servers.clone();
        if servers.is_empty() {
            let stun_urls = js_sys::Array::new();
            for url in [
                DEFAULT_STUN_ADDR,
                DEFAULT_STUN_ADDR_2,
                DEFAULT_STUN_ADDR_3,
                DEFAULT_STUN_ADDR_4,
            ] {
                stun_urls.push(&JsValue::from_str(url));
            }

            let stun_server = web_sys::RtcIceServer::new();
            stun_server.set_urls(&stun_urls);
            ice_servers_arr.push(&stun_server);
        } else {
            for server_config in &servers {
                let rtc_ice_server = web_sys::RtcIceServer::new();

                let urls = js_sys::Array::new();
                for url in &server_config.urls {
                    urls.push(&JsValue::from_str(url));
                }
                rtc_ice_server.set_urls(&urls);

                if let Some(username) = &server_config.username {
                    rtc_ice_server.set_username(username);
                }
                if let Some(credential) = &server_config.credential {
                    rtc_ice_server.set_credential(credential);
                }

                ice_servers_arr.push(&rtc_ice_server);
            }
        }

        rtc_config.set_ice_servers(&ice_servers_arr);

        let pc = web_sys::RtcPeerConnection::new_with_configuration(&rtc_config).map_err(rtc_err)?;

        let onice = {
            let inner = inner.clone();
            let id = id.clone();
            let peer = peer.clone();
            Closure::wrap(Box::new(move |ev: web_sys::RtcPeerConnectionIceEvent| {
                if let Some(candidate) = ev.candidate() {
                    let msg = SignalMessage::Candidate {
                        src: None,
                        dst: Some(peer.clone()),
                        payload: CandidatePayload {
                            candidate: IceCandidate {
                                candidate: candidate.candidate(),
                                sdp_mid: candidate.sdp_mid(),
                                sdp_m_line_index: candidate.sdp_m_line_index(),
                            },
                            kind,
                            connection_id: id.clone(),
                        },
                    };
                    Self::send_signal(&inner, &msg);
                }
            }) as Box<dyn FnMut(web_sys::RtcPeerConnectionIceEvent)>)
        };
        pc.set_onicecandidate(Some(onice.as_ref().unchecked_ref()));
        onice.forget();

        let onstate = {
            let inner = inner.clone();
            let id = id.clone();
            let pc = pc.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                let state = pc.ice_connection_state();
                debug!("ICE state of {}: {:?}", id, state);
                if matches!(
                    state,
                    RtcIceConnectionState::Failed | RtcIceConnectionState::Closed
                ) {
                    Self::close_link(&inner, &id);
                }
            }))
        };
        pc.set_oniceconnectionstatechange(Some(onstate.as_ref().unchecked_ref()));
        onstate.forget();

        Ok(pc)
    }

    /// Sends the local tracks, or asks for receive-only audio and video when
    /// there is no local stream.
    pub(crate) fn attach_local_media(
        pc: &web_sys::RtcPeerConnection,
        stream: Option<&Rc<dyn MediaStream>>,
    ) {
        let local = stream.and_then(|s| BrowserStream::from_dyn(s.as_ref()));

        match local {
            Some(local) => {
                for track in local.get_tracks().iter() {
                    match track.dyn_into::<web_sys::MediaStreamTrack>() {
                        Ok(track) => {
                            pc.add_track_0(&track, local);
                        }
                        Err(e) => warn!("Skipping non-track entry: {:?}", e),
                    }
                }
            }
            None => {
                info!("No local stream; negotiating receive-only");
                for kind in ["audio", "video"] {
                    let init = RtcRtpTransceiverInit::new();
                    init.set_direction(RtcRtpTransceiverDirection::Recvonly);
                    pc.add_transceiver_with_str_and_init(kind, &init);
                }
            }
        }
    }

    /// Fires the link's remote-stream event with the first stream that arrives.
    pub(crate) fn watch_remote_tracks(
        inner: &Rc<RefCell<EngineInner>>,
        pc: &web_sys::RtcPeerConnection,
        id: &ConnectionId,
    ) {
        let ontrack = {
            let inner = inner.clone();
            let id = id.clone();
            Closure::wrap(Box::new(move |ev: web_sys::RtcTrackEvent| {
                let Ok(stream) = ev.streams().get(0).dyn_into::<web_sys::MediaStream>() else {
                    debug!("Track on {} without a stream", id);
                    return;
                };

                let trigger = inner
                    .borrow_mut()
                    .links
                    .get_mut(&id)
                    .and_then(|link| link.remote_stream.take());
                if let Some(trigger) = trigger {
                    info!("Remote stream {} on {}", stream.id(), id);
                    trigger.fire(Rc::new(BrowserStream::new(stream)));
                }
            }) as Box<dyn FnMut(web_sys::RtcTrackEvent)>)
        };
        pc.set_ontrack(Some(ontrack.as_ref().unchecked_ref()));
        ontrack.forget();
    }
}
