use crate::error::PeerError;
use crate::event::{EventStream, OnceEvent};
use crate::model::PeerId;
use crate::traits::media::MediaStream;
use std::rc::Rc;

/// Events raised by the peer service over its lifetime.
pub enum PeerEvent {
    /// The broker accepted the session under this identity.
    Open(PeerId),
    /// A remote peer is calling.
    Call(Rc<dyn MediaCall>),
    /// A remote peer opened a data connection.
    Connection(Rc<dyn DataConnection>),
    /// The broker socket went away.
    Disconnected,
    Error(PeerError),
}

/// Peer-to-peer provider: identity, outbound links and inbound events.
pub trait PeerService {
    /// The event stream. Only the first caller receives live events; later
    /// callers get a stream that is already complete.
    fn take_events(&self) -> EventStream<PeerEvent>;

    /// Opens a data connection. Returns immediately; the link opens in the background.
    fn connect(&self, peer: &PeerId) -> Result<Rc<dyn DataConnection>, PeerError>;

    /// Places a call offering `stream`, or a receive-only call without one.
    fn call(
        &self,
        peer: &PeerId,
        stream: Option<Rc<dyn MediaStream>>,
    ) -> Result<Rc<dyn MediaCall>, PeerError>;
}

/// One audio/video call with a remote peer.
pub trait MediaCall {
    fn peer(&self) -> &PeerId;

    /// Accepts an inbound call. No-op for outbound calls.
    fn answer(&self, stream: Option<Rc<dyn MediaStream>>);

    /// Resolves once with the remote stream, or with `Closed` if the call ends first.
    /// Only the first caller gets the live event.
    fn remote_stream(&self) -> OnceEvent<Rc<dyn MediaStream>>;

    fn close(&self);
}

/// Text side channel to a remote peer.
pub trait DataConnection {
    fn peer(&self) -> &PeerId;

    fn send(&self, text: &str) -> Result<(), PeerError>;

    /// Inbound text messages; completes when the connection closes.
    /// Only the first caller gets live messages.
    fn messages(&self) -> EventStream<String>;

    fn close(&self);
}
