use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tagchat_core::PeerId;
use tagchat_core::error::PeerError;
use tagchat_core::event::{
    EventEmitter, EventStream, OnceEvent, OnceTrigger, event_channel, once_event,
};
use tagchat_core::traits::{DataConnection, MediaCall, MediaStream, PeerEvent, PeerService};

/// Call handle whose remote stream is delivered by the test.
pub struct MockCall {
    peer: PeerId,
    trigger: OnceTrigger<Rc<dyn MediaStream>>,
    event: RefCell<Option<OnceEvent<Rc<dyn MediaStream>>>>,
    offered: Option<String>,
    answered_with: RefCell<Option<Option<String>>>,
    closed: Cell<bool>,
}

impl MockCall {
    pub fn new(peer: &str, offered: Option<String>) -> Rc<Self> {
        let (trigger, event) = once_event();
        Rc::new(Self {
            peer: PeerId::from(peer),
            trigger,
            event: RefCell::new(Some(event)),
            offered,
            answered_with: RefCell::new(None),
            closed: Cell::new(false),
        })
    }

    pub fn deliver(&self, stream: Rc<dyn MediaStream>) -> bool {
        self.trigger.fire(stream)
    }

    /// The remote side goes away before sending media.
    pub fn hang_up(&self) {
        self.trigger.close();
    }

    /// Id of the stream this call was placed with.
    pub fn offered(&self) -> Option<String> {
        self.offered.clone()
    }

    /// `None` until answered; then the id of the stream answered with, if any.
    pub fn answered_with(&self) -> Option<Option<String>> {
        self.answered_with.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl MediaCall for MockCall {
    fn peer(&self) -> &PeerId {
        &self.peer
    }

    fn answer(&self, stream: Option<Rc<dyn MediaStream>>) {
        *self.answered_with.borrow_mut() = Some(stream.map(|s| s.id()));
    }

    fn remote_stream(&self) -> OnceEvent<Rc<dyn MediaStream>> {
        self.event.borrow_mut().take().unwrap_or_else(OnceEvent::closed)
    }

    fn close(&self) {
        self.closed.set(true);
        self.trigger.close();
    }
}

/// Data connection that records outgoing text and lets the test inject incoming text.
pub struct MockConnection {
    peer: PeerId,
    sent: RefCell<Vec<String>>,
    emitter: EventEmitter<String>,
    stream: RefCell<Option<EventStream<String>>>,
    closed: Cell<bool>,
}

impl MockConnection {
    pub fn new(peer: &str) -> Rc<Self> {
        let (emitter, stream) = event_channel();
        Rc::new(Self {
            peer: PeerId::from(peer),
            sent: RefCell::new(Vec::new()),
            emitter,
            stream: RefCell::new(Some(stream)),
            closed: Cell::new(false),
        })
    }

    pub fn receive(&self, text: &str) -> bool {
        self.emitter.emit(text.to_string())
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl DataConnection for MockConnection {
    fn peer(&self) -> &PeerId {
        &self.peer
    }

    fn send(&self, text: &str) -> Result<(), PeerError> {
        if self.closed.get() {
            return Err(PeerError::Closed);
        }
        self.sent.borrow_mut().push(text.to_string());
        Ok(())
    }

    fn messages(&self) -> EventStream<String> {
        self.stream.borrow_mut().take().unwrap_or_else(EventStream::empty)
    }

    fn close(&self) {
        self.closed.set(true);
        self.emitter.close();
    }
}

/// Peer service that records outbound links and lets the test inject events.
pub struct MockPeerService {
    emitter: EventEmitter<PeerEvent>,
    events: RefCell<Option<EventStream<PeerEvent>>>,
    calls: RefCell<Vec<Rc<MockCall>>>,
    connections: RefCell<Vec<Rc<MockConnection>>>,
    refuse_calls: Cell<bool>,
}

impl MockPeerService {
    pub fn new() -> Rc<Self> {
        let (emitter, events) = event_channel();
        Rc::new(Self {
            emitter,
            events: RefCell::new(Some(events)),
            calls: RefCell::new(Vec::new()),
            connections: RefCell::new(Vec::new()),
            refuse_calls: Cell::new(false),
        })
    }

    pub fn emit(&self, event: PeerEvent) -> bool {
        self.emitter.emit(event)
    }

    pub fn open(&self, id: &str) {
        self.emit(PeerEvent::Open(PeerId::from(id)));
    }

    pub fn shutdown(&self) {
        self.emitter.close();
    }

    pub fn set_refuse_calls(&self, refuse: bool) {
        self.refuse_calls.set(refuse);
    }

    pub fn calls(&self) -> Vec<Rc<MockCall>> {
        self.calls.borrow().clone()
    }

    pub fn connections(&self) -> Vec<Rc<MockConnection>> {
        self.connections.borrow().clone()
    }

    pub fn last_call(&self) -> Option<Rc<MockCall>> {
        self.calls.borrow().last().cloned()
    }

    pub fn last_connection(&self) -> Option<Rc<MockConnection>> {
        self.connections.borrow().last().cloned()
    }
}

impl PeerService for MockPeerService {
    fn take_events(&self) -> EventStream<PeerEvent> {
        self.events.borrow_mut().take().unwrap_or_else(EventStream::empty)
    }

    fn connect(&self, peer: &PeerId) -> Result<Rc<dyn DataConnection>, PeerError> {
        let connection = MockConnection::new(peer.as_str());
        self.connections.borrow_mut().push(connection.clone());
        Ok(connection)
    }

    fn call(
        &self,
        peer: &PeerId,
        stream: Option<Rc<dyn MediaStream>>,
    ) -> Result<Rc<dyn MediaCall>, PeerError> {
        if self.refuse_calls.get() {
            return Err(PeerError::Rtc("createOffer failed".into()));
        }
        let call = MockCall::new(peer.as_str(), stream.map(|s| s.id()));
        self.calls.borrow_mut().push(call.clone());
        Ok(call)
    }
}
