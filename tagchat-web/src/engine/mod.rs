use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tagchat_core::SignalingConfig;
use tagchat_core::error::PeerError;
use tagchat_core::event::{
    EventEmitter, EventStream, OnceTrigger, event_channel, once_event,
};
use tagchat_core::model::{
    ConnectionId, ConnectionKind, IceCandidate, PeerId, SessionDescription, SignalMessage,
};
use tagchat_core::traits::{DataConnection, MediaCall, MediaStream, PeerEvent, PeerService};
use tracing::{debug, info, warn};
use wasm_bindgen::JsValue;

mod call;
mod close_link_impl;
mod connection;
mod create_pc_impl;
mod handle_remote_offer_impl;
mod handle_signal_impl;
mod init_connection_impl;
mod setup_data_channel_impl;
mod ws_setup_impl;

pub use call::BrowserCall;
pub use connection::BrowserConnection;

/// Reported to remote peers in offers and answers.
const BROWSER: &str = "tagchat";

/// Broker socket state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

/// One negotiated link (a call or a data connection) with a remote peer.
pub(crate) struct Link {
    peer: PeerId,
    kind: ConnectionKind,
    pc: Option<web_sys::RtcPeerConnection>,
    remote_set: bool,
    /// Inbound call offer kept until the call is answered.
    pending_offer: Option<SessionDescription>,
    pending_candidates: Vec<IceCandidate>,
    remote_stream: Option<OnceTrigger<Rc<dyn MediaStream>>>,
    dc: Option<web_sys::RtcDataChannel>,
    outbox: Vec<String>,
    messages: Option<EventEmitter<String>>,
}

impl Link {
    fn media(peer: PeerId, remote_stream: OnceTrigger<Rc<dyn MediaStream>>) -> Self {
        Self::new(peer, ConnectionKind::Media, Some(remote_stream), None)
    }

    fn data(peer: PeerId, messages: EventEmitter<String>) -> Self {
        Self::new(peer, ConnectionKind::Data, None, Some(messages))
    }

    fn new(
        peer: PeerId,
        kind: ConnectionKind,
        remote_stream: Option<OnceTrigger<Rc<dyn MediaStream>>>,
        messages: Option<EventEmitter<String>>,
    ) -> Self {
        Self {
            peer,
            kind,
            pc: None,
            remote_set: false,
            pending_offer: None,
            pending_candidates: Vec::new(),
            remote_stream,
            dc: None,
            outbox: Vec::new(),
            messages,
        }
    }
}

pub(crate) struct EngineInner {
    config: SignalingConfig,
    state: ConnectionState,
    id: Option<PeerId>,
    ws: Option<web_sys::WebSocket>,
    signal_queue: Vec<String>,
    links: HashMap<ConnectionId, Link>,
    events: EventEmitter<PeerEvent>,
    event_stream: Option<EventStream<PeerEvent>>,
}

/// PeerJS-compatible peer: one broker socket, any number of calls and data
/// connections, each on its own `RtcPeerConnection`.
pub struct PeerEngine {
    inner: Rc<RefCell<EngineInner>>,
}

pub(crate) fn rtc_err(e: JsValue) -> PeerError {
    PeerError::Rtc(format!("{:?}", e))
}

/// Resolves after `ms` milliseconds on the browser timer.
pub(crate) async fn sleep_ms(ms: i32) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let mut scheduled: Result<i32, JsValue> = Ok(0);
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        scheduled = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
    });
    scheduled?;
    wasm_bindgen_futures::JsFuture::from(promise).await.map(|_| ())
}

impl PeerEngine {
    pub fn new(config: SignalingConfig) -> Self {
        let (events, event_stream) = event_channel();
        let inner = Rc::new(RefCell::new(EngineInner {
            config,
            state: ConnectionState::Disconnected,
            id: None,
            ws: None,
            signal_queue: Vec::new(),
            links: HashMap::new(),
            events,
            event_stream: Some(event_stream),
        }));
        PeerEngine { inner }
    }

    pub fn id(&self) -> Option<PeerId> {
        self.inner.borrow().id.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.borrow().state
    }

    /// Obtains an identity from the broker and opens the signaling socket.
    /// `PeerEvent::Open` follows once the broker confirms the session.
    pub async fn start(&self) -> Result<PeerId, PeerError> {
        let config = self.inner.borrow().config.clone();
        let id = Self::fetch_id(&config).await;
        let token = uuid::Uuid::new_v4().simple().to_string();
        let url = config
            .socket_url(id.as_str(), &token)
            .map_err(|e| PeerError::Signaling(e.to_string()))?;

        {
            let mut inner = self.inner.borrow_mut();
            inner.id = Some(id.clone());
            inner.state = ConnectionState::Connecting;
        }

        Self::ws_setup(&self.inner, &url)?;
        Self::spawn_heartbeat(&self.inner);
        Ok(id)
    }

    async fn fetch_id(config: &SignalingConfig) -> PeerId {
        let url = format!("{}?ts={}", config.id_url(), js_sys::Date::now() as u64);

        async fn request(url: &str) -> Result<String, reqwest::Error> {
            reqwest::get(url).await?.error_for_status()?.text().await
        }

        match request(&url).await {
            Ok(id) if !id.trim().is_empty() => PeerId::from(id.trim()),
            Ok(_) => {
                warn!("Broker returned an empty id; generating one locally");
                PeerId::generate()
            }
            Err(e) => {
                warn!("Failed to fetch id from broker ({}); generating one locally", e);
                PeerId::generate()
            }
        }
    }

    fn ensure_registered(&self) -> Result<(), PeerError> {
        match self.inner.borrow().id {
            Some(_) => Ok(()),
            None => Err(PeerError::NotRegistered),
        }
    }

    pub(crate) fn emit(inner: &Rc<RefCell<EngineInner>>, event: PeerEvent) {
        let events = inner.borrow().events.clone();
        if !events.emit(event) {
            debug!("Peer event dropped; nobody is listening");
        }
    }

    /// Sends a broker message, or queues it until the broker has opened the session.
    pub(crate) fn send_signal(inner: &Rc<RefCell<EngineInner>>, msg: &SignalMessage) {
        let json = match msg.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode signal: {}", e);
                return;
            }
        };

        let mut inner = inner.borrow_mut();
        if inner.state == ConnectionState::Open {
            if let Some(ws) = &inner.ws {
                if let Err(e) = ws.send_with_str(&json) {
                    warn!("Failed to send signal: {:?}", e);
                }
                return;
            }
        }
        inner.signal_queue.push(json);
    }

    /// Sends everything queued before the broker opened. Without a socket the
    /// queue is kept.
    pub(crate) fn flush_signals(inner: &Rc<RefCell<EngineInner>>) {
        let (ws, queued) = {
            let mut inner = inner.borrow_mut();
            let Some(ws) = inner.ws.clone() else {
                return;
            };
            let queued: Vec<String> = inner.signal_queue.drain(..).collect();
            (ws, queued)
        };

        for json in queued {
            if let Err(e) = ws.send_with_str(&json) {
                warn!("Failed to send queued signal: {:?}", e);
            }
        }
    }

    pub(crate) fn store_pc(
        inner: &Rc<RefCell<EngineInner>>,
        id: &ConnectionId,
        pc: &web_sys::RtcPeerConnection,
    ) -> Result<(), PeerError> {
        let mut inner = inner.borrow_mut();
        match inner.links.get_mut(id) {
            Some(link) => {
                link.pc = Some(pc.clone());
                Ok(())
            }
            None => {
                pc.close();
                Err(PeerError::Closed)
            }
        }
    }

    pub(crate) fn spawn_link_task(
        inner: &Rc<RefCell<EngineInner>>,
        id: &ConnectionId,
        task: impl std::future::Future<Output = Result<(), PeerError>> + 'static,
    ) {
        let inner = inner.clone();
        let id = id.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = task.await {
                warn!("Link {} failed: {}", id, e);
                Self::close_link(&inner, &id);
            }
        });
    }
}

impl PeerService for PeerEngine {
    fn take_events(&self) -> EventStream<PeerEvent> {
        self.inner
            .borrow_mut()
            .event_stream
            .take()
            .unwrap_or_else(EventStream::empty)
    }

    fn connect(&self, peer: &PeerId) -> Result<Rc<dyn DataConnection>, PeerError> {
        self.ensure_registered()?;

        let id = ConnectionId::new(ConnectionKind::Data);
        let (emitter, messages) = event_channel();
        self.inner
            .borrow_mut()
            .links
            .insert(id.clone(), Link::data(peer.clone(), emitter));
        info!("Opening data connection {} to {}", id, peer);

        let task = {
            let inner = self.inner.clone();
            let (id, peer) = (id.clone(), peer.clone());
            async move { Self::open_data_connection(&inner, &id, &peer).await }
        };
        Self::spawn_link_task(&self.inner, &id, task);

        Ok(Rc::new(BrowserConnection::new(
            self.inner.clone(),
            id,
            peer.clone(),
            messages,
        )))
    }

    fn call(
        &self,
        peer: &PeerId,
        stream: Option<Rc<dyn MediaStream>>,
    ) -> Result<Rc<dyn MediaCall>, PeerError> {
        self.ensure_registered()?;

        let id = ConnectionId::new(ConnectionKind::Media);
        let (trigger, remote) = once_event();
        self.inner
            .borrow_mut()
            .links
            .insert(id.clone(), Link::media(peer.clone(), trigger));
        info!("Calling {} on {}", peer, id);

        let task = {
            let inner = self.inner.clone();
            let (id, peer) = (id.clone(), peer.clone());
            async move { Self::open_media_call(&inner, &id, &peer, stream).await }
        };
        Self::spawn_link_task(&self.inner, &id, task);

        Ok(Rc::new(BrowserCall::new(
            self.inner.clone(),
            id,
            peer.clone(),
            remote,
        )))
    }
}
