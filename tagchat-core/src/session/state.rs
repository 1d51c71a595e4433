use crate::model::{PeerId, SelectedTags, Tag};
use crate::traits::{DataConnection, MediaCall, MediaStream};
use std::rc::Rc;

/// Observable phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No call, Connect available.
    Idle,
    /// Matchmaking or waiting for the remote stream.
    Connecting,
    /// A remote stream is attached.
    InCall,
}

/// Result of a Connect action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(PeerId),
    /// The server had nobody for the selected tags.
    NoMatch,
    /// The call ended before the remote stream arrived.
    NotEstablished,
    /// Already connecting or in a call; nothing was done.
    Busy,
}

/// A call whose remote stream arrived.
pub struct EstablishedCall {
    pub call: Rc<dyn MediaCall>,
    pub stream: Rc<dyn MediaStream>,
    pub connection: Rc<dyn DataConnection>,
}

pub enum CallOutcome {
    Established(EstablishedCall),
    NotEstablished,
}

/// Which side placed a call or opened a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Origin {
    #[default]
    Local,
    Remote,
}

#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) own_id: Option<PeerId>,
    pub(crate) tags: Vec<Tag>,
    pub(crate) selected: SelectedTags,
    pub(crate) local_stream: Option<Rc<dyn MediaStream>>,
    pub(crate) call: Option<Rc<dyn MediaCall>>,
    pub(crate) call_origin: Origin,
    pub(crate) call_stream: Option<Rc<dyn MediaStream>>,
    /// Incoming call answered but still waiting for its remote stream.
    pub(crate) pending_call: Option<Rc<dyn MediaCall>>,
    pub(crate) connection: Option<Rc<dyn DataConnection>>,
    pub(crate) connection_origin: Origin,
    pub(crate) loading: bool,
}

impl SessionState {
    /// Two peers matched with each other at once each end up with a local and a
    /// remote link to the same partner. Both keep the link placed by the lower id.
    pub(crate) fn prefers_current(
        &self,
        current_peer: &PeerId,
        current: Origin,
        new_peer: &PeerId,
        new: Origin,
    ) -> bool {
        if current_peer != new_peer || current == new {
            return false;
        }
        let Some(own) = &self.own_id else {
            return false;
        };
        let placer = |origin: Origin, peer: &PeerId| match origin {
            Origin::Local => own.clone(),
            Origin::Remote => peer.clone(),
        };
        placer(current, current_peer) < placer(new, new_peer)
    }

    /// Makes `connection` current unless the current one wins the tie-break.
    /// Returns the connection that lost, which the caller closes.
    pub(crate) fn swap_connection(
        &mut self,
        connection: Rc<dyn DataConnection>,
        origin: Origin,
    ) -> Option<Rc<dyn DataConnection>> {
        if let Some(current) = &self.connection {
            if Rc::ptr_eq(current, &connection) {
                return None;
            }
            if self.prefers_current(current.peer(), self.connection_origin, connection.peer(), origin)
            {
                return Some(connection);
            }
        }
        self.connection_origin = origin;
        self.connection.replace(connection)
    }

    pub(crate) fn is_current(&self, connection: &Rc<dyn DataConnection>) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, connection))
    }

    pub(crate) fn is_pending(&self, call: &Rc<dyn MediaCall>) -> bool {
        self.pending_call
            .as_ref()
            .is_some_and(|pending| Rc::ptr_eq(pending, call))
    }

    pub(crate) fn phase(&self) -> Phase {
        if self.call_stream.is_some() {
            Phase::InCall
        } else if self.loading {
            Phase::Connecting
        } else {
            Phase::Idle
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            own_id: self.own_id.clone(),
            tags: self.tags.clone(),
            selected: self.selected.clone(),
            local_stream: self.local_stream.clone(),
            call_stream: self.call_stream.clone(),
            partner: self
                .call
                .as_ref()
                .map(|c| c.peer().clone())
                .or_else(|| self.connection.as_ref().map(|c| c.peer().clone())),
            loading: self.loading,
            has_connection: self.connection.is_some(),
        }
    }
}

/// Read-only view of a session, handed to listeners after every change.
#[derive(Clone)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub own_id: Option<PeerId>,
    pub tags: Vec<Tag>,
    pub selected: SelectedTags,
    pub local_stream: Option<Rc<dyn MediaStream>>,
    pub call_stream: Option<Rc<dyn MediaStream>>,
    pub partner: Option<PeerId>,
    pub loading: bool,
    pub has_connection: bool,
}

impl SessionSnapshot {
    pub fn is_selected(&self, tag: &Tag) -> bool {
        self.selected.contains(tag)
    }
}
