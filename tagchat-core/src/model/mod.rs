mod control;
mod matchmaking;
mod peer;
mod signaling;
mod tag;

pub use control::ControlMessage;
pub use matchmaking::{FindPartnerRequest, FindPartnerResponse, TagsResponse};
pub use peer::{ConnectionId, ConnectionKind, PeerId};
pub use signaling::{
    AnswerPayload, BrokerNotice, CandidatePayload, IceCandidate, OfferPayload, SdpKind,
    SessionDescription, SignalMessage,
};
pub use tag::{SelectedTags, Tag};
