use crate::cache::SessionContext;
use crate::error::SessionError;
use crate::event::EventStream;
use crate::model::{ControlMessage, PeerId, Tag};
use crate::session::state::{
    CallOutcome, ConnectOutcome, EstablishedCall, Origin, Phase, SessionSnapshot, SessionState,
};
use crate::traits::{DataConnection, MediaCall, MediaStream, PeerEvent, PeerService};
use futures::StreamExt;
use futures::task::{LocalSpawn, LocalSpawnExt};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

type Listener = Rc<dyn Fn(&SessionSnapshot)>;

struct SessionInner {
    ctx: SessionContext,
    peer: Rc<dyn PeerService>,
    spawner: Rc<dyn LocalSpawn>,
    state: RefCell<SessionState>,
    listeners: RefCell<Vec<Listener>>,
}

/// Session controller: owns the call state and drives media, matchmaking and
/// the peer service from user actions and peer events.
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct Session {
    inner: Rc<SessionInner>,
}

impl Session {
    pub fn new(
        ctx: SessionContext,
        peer: Rc<dyn PeerService>,
        spawner: Rc<dyn LocalSpawn>,
    ) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                ctx,
                peer,
                spawner,
                state: RefCell::new(SessionState::default()),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.inner.ctx
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.borrow().phase()
    }

    /// Registers a listener called with a fresh snapshot after every state change.
    pub fn subscribe(&self, listener: impl Fn(&SessionSnapshot) + 'static) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn notify(&self) {
        let snapshot = self.snapshot();
        let listeners: Vec<Listener> = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    fn spawn(&self, task: impl std::future::Future<Output = ()> + 'static) {
        if let Err(e) = self.inner.spawner.spawn_local(task) {
            error!("Failed to spawn session task: {:?}", e);
        }
    }

    fn downgrade(&self) -> Weak<SessionInner> {
        Rc::downgrade(&self.inner)
    }

    fn from_weak(weak: &Weak<SessionInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Acquires media and tags concurrently, then consumes peer events until the
    /// peer service shuts down.
    pub async fn run(&self) {
        let events = self.inner.peer.take_events();
        futures::join!(self.bootstrap(), self.pump(events));
        info!("Session event loop finished");
    }

    async fn bootstrap(&self) {
        let media = async {
            if let Some(stream) = self.inner.ctx.media.get().await {
                self.inner.state.borrow_mut().local_stream = Some(stream);
                self.notify();
            }
        };
        let tags = async {
            match self.inner.ctx.tags.get().await {
                Ok(tags) => {
                    self.inner.state.borrow_mut().tags = tags;
                    self.notify();
                }
                Err(e) => error!("Failed to fetch tags: {}", e),
            }
        };
        futures::join!(media, tags);
    }

    async fn pump(&self, mut events: EventStream<PeerEvent>) {
        while let Some(event) = events.next().await {
            self.handle_peer_event(event);
        }
    }

    pub fn handle_peer_event(&self, event: PeerEvent) {
        match event {
            PeerEvent::Open(id) => self.set_identity(id),
            PeerEvent::Call(call) => {
                info!("Incoming call from {}", call.peer());
                let session = self.clone();
                self.spawn(async move { session.accept_call(call).await });
            }
            PeerEvent::Connection(connection) => {
                info!("Incoming connection from {}", connection.peer());
                self.adopt_connection(connection);
            }
            PeerEvent::Disconnected => warn!("Signaling broker disconnected"),
            PeerEvent::Error(e) => error!("Peer service error: {}", e),
        }
    }

    fn set_identity(&self, id: PeerId) {
        {
            let mut state = self.inner.state.borrow_mut();
            if let Some(current) = &state.own_id {
                if *current != id {
                    warn!("Ignoring identity {}; already registered as {}", id, current);
                }
                return;
            }
            info!("Registered as {}", id);
            state.own_id = Some(id);
        }
        self.notify();
    }

    pub fn toggle_tag(&self, tag: Tag) {
        {
            let mut state = self.inner.state.borrow_mut();
            let selected = state.selected.toggle(tag.clone());
            debug!("Tag {} selected: {}", tag, selected);
        }
        self.notify();
    }

    /// Connect button: find a partner for the selected tags and call them.
    pub async fn connect(&self) -> Result<ConnectOutcome, SessionError> {
        let (own_id, tags) = {
            let mut state = self.inner.state.borrow_mut();
            if state.loading || state.call_stream.is_some() {
                return Ok(ConnectOutcome::Busy);
            }
            let own_id = state.own_id.clone().ok_or(SessionError::NoIdentity)?;
            state.loading = true;
            (own_id, state.selected.as_slice().to_vec())
        };
        self.notify();

        let result = self.find_and_call(&own_id, &tags).await;

        self.inner.state.borrow_mut().loading = false;
        self.notify();

        match &result {
            Ok(outcome) => info!("Connect finished: {:?}", outcome),
            Err(e) => error!("Connect failed: {}", e),
        }
        result
    }

    async fn find_and_call(
        &self,
        own_id: &PeerId,
        tags: &[Tag],
    ) -> Result<ConnectOutcome, SessionError> {
        let Some(partner) = self.inner.ctx.matchmaker.find_partner(own_id, tags).await? else {
            return Ok(ConnectOutcome::NoMatch);
        };

        let local = self.inner.ctx.media.get().await;
        if local.is_none() {
            warn!("Calling {} without local media", partner);
        }

        match self.start_call(&partner, local).await? {
            CallOutcome::Established(call) => {
                let connection = call.connection.clone();
                self.install_call(call.call, call.stream, Some(connection.clone()), Origin::Local);
                self.watch(connection);
                Ok(ConnectOutcome::Connected(partner))
            }
            CallOutcome::NotEstablished => Ok(ConnectOutcome::NotEstablished),
        }
    }

    /// Opens a data connection and a call to `partner`, then waits for the remote
    /// stream. There is no timeout.
    pub async fn start_call(
        &self,
        partner: &PeerId,
        local: Option<Rc<dyn MediaStream>>,
    ) -> Result<CallOutcome, SessionError> {
        let connection = self.inner.peer.connect(partner)?;
        let call = match self.inner.peer.call(partner, local) {
            Ok(call) => call,
            Err(e) => {
                connection.close();
                return Err(e.into());
            }
        };

        match call.remote_stream().await {
            Ok(stream) => {
                info!("Remote stream {} from {}", stream.id(), partner);
                Ok(CallOutcome::Established(EstablishedCall {
                    call,
                    stream,
                    connection,
                }))
            }
            Err(_) => {
                warn!("Call to {} ended before media arrived", partner);
                call.close();
                connection.close();
                Ok(CallOutcome::NotEstablished)
            }
        }
    }

    /// Answers an incoming call. Until its stream arrives the call is pending, and a
    /// teardown in the meantime closes it.
    async fn accept_call(&self, call: Rc<dyn MediaCall>) {
        let replaced = self
            .inner
            .state
            .borrow_mut()
            .pending_call
            .replace(call.clone());
        if let Some(old) = replaced {
            info!("Dropping unanswered call from {}", old.peer());
            old.close();
        }

        let local = self.inner.ctx.media.get().await;
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.is_pending(&call) {
                info!("Call from {} was dropped before it was answered", call.peer());
                return;
            }
            if let Some(stream) = &local {
                if state.local_stream.is_none() {
                    state.local_stream = Some(stream.clone());
                }
            }
        }

        let remote = call.remote_stream();
        call.answer(local);
        let result = remote.await;

        let still_pending = {
            let mut state = self.inner.state.borrow_mut();
            let pending = state.is_pending(&call);
            if pending {
                state.pending_call = None;
            }
            pending
        };

        match result {
            Ok(stream) if still_pending => {
                info!("Remote stream {} from {}", stream.id(), call.peer());
                self.install_call(call, stream, None, Origin::Remote);
            }
            Ok(stream) => {
                info!("Discarding stream from {}; the call was torn down", call.peer());
                stream.stop_tracks();
                call.close();
            }
            Err(_) => warn!("Incoming call from {} ended before media arrived", call.peer()),
        }
    }

    /// Makes `call` the active call, releasing whatever call was active before.
    /// A call that loses the simultaneous-match tie-break is closed instead.
    fn install_call(
        &self,
        call: Rc<dyn MediaCall>,
        stream: Rc<dyn MediaStream>,
        connection: Option<Rc<dyn DataConnection>>,
        origin: Origin,
    ) {
        let keep_current = {
            let state = self.inner.state.borrow();
            state.call.as_ref().is_some_and(|current| {
                state.prefers_current(current.peer(), state.call_origin, call.peer(), origin)
            })
        };
        if keep_current {
            info!("Keeping the existing call with {}; closing the crossed one", call.peer());
            stream.stop_tracks();
            call.close();
            if let Some(connection) = connection {
                connection.close();
            }
            return;
        }

        let (old_call, old_stream, old_connection) = {
            let mut state = self.inner.state.borrow_mut();
            let old_call = state.call.replace(call.clone());
            state.call_origin = origin;
            let old_stream = state.call_stream.replace(stream);
            let old_connection = match connection {
                Some(connection) => state.swap_connection(connection, origin),
                None => None,
            };
            state.loading = false;
            (old_call, old_stream, old_connection)
        };

        if let Some(old) = old_stream {
            old.stop_tracks();
        }
        if let Some(old) = old_call.filter(|old| !Rc::ptr_eq(old, &call)) {
            old.close();
        }
        if let Some(old) = old_connection {
            old.close();
        }
        self.notify();
    }

    fn adopt_connection(&self, connection: Rc<dyn DataConnection>) {
        let dropped = self
            .inner
            .state
            .borrow_mut()
            .swap_connection(connection.clone(), Origin::Remote);
        if let Some(dropped) = dropped {
            dropped.close();
        }
        self.watch(connection);
        self.notify();
    }

    fn is_current(&self, connection: &Rc<dyn DataConnection>) -> bool {
        self.inner.state.borrow().is_current(connection)
    }

    /// Feeds the connection's messages into the session until it closes. A current
    /// connection that closes ends the call as if the peer had sent STOP.
    fn watch(&self, connection: Rc<dyn DataConnection>) {
        let weak = self.downgrade();
        self.spawn(async move {
            let mut messages = connection.messages();
            while let Some(text) = messages.next().await {
                let Some(session) = Self::from_weak(&weak) else {
                    return;
                };
                if let Err(e) = session.handle_message(&connection, &text) {
                    warn!("Ignoring message from {}: {}", connection.peer(), e);
                }
            }

            match Self::from_weak(&weak) {
                Some(session) if session.is_current(&connection) => {
                    info!("Connection to {} closed; ending the call", connection.peer());
                    session.teardown();
                }
                _ => debug!("Connection to {} closed", connection.peer()),
            }
        });
    }

    /// Applies a control message received on `connection`.
    pub fn handle_message(
        &self,
        connection: &Rc<dyn DataConnection>,
        text: &str,
    ) -> Result<(), SessionError> {
        if !self.is_current(connection) {
            debug!("Dropping message from stale connection to {}", connection.peer());
            return Ok(());
        }

        match ControlMessage::parse(text)? {
            ControlMessage::Stop => {
                info!("Remote peer {} hung up", connection.peer());
                self.teardown();
            }
        }
        Ok(())
    }

    /// Stop button: tell the remote peer and tear the call down.
    pub fn stop(&self) -> Result<(), SessionError> {
        let connection = self.inner.state.borrow().connection.clone();
        if let Some(connection) = connection {
            let text = ControlMessage::Stop.to_text()?;
            if let Err(e) = connection.send(&text) {
                warn!("Failed to send STOP to {}: {}", connection.peer(), e);
            }
        }
        self.teardown();
        Ok(())
    }

    /// Releases the remote stream, the calls and the connection. The local stream stays.
    fn teardown(&self) {
        let (call, pending, stream, connection) = {
            let mut state = self.inner.state.borrow_mut();
            (
                state.call.take(),
                state.pending_call.take(),
                state.call_stream.take(),
                state.connection.take(),
            )
        };

        if let Some(stream) = stream {
            stream.stop_tracks();
        }
        if let Some(call) = call {
            call.close();
        }
        if let Some(pending) = pending {
            pending.close();
        }
        if let Some(connection) = connection {
            connection.close();
        }
        info!("Call torn down");
        self.notify();
    }
}
