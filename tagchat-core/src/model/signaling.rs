use crate::error::ProtocolError;
use crate::model::peer::{ConnectionId, ConnectionKind, PeerId};
use serde::{Deserialize, Serialize};

/// Messages exchanged with the signaling broker over its WebSocket.
///
/// The broker relays `OFFER`, `ANSWER` and `CANDIDATE` between peers, filling in
/// `src` on delivery. Everything else is broker-to-client bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING-KEBAB-CASE")]
pub enum SignalMessage {
    Open,
    Heartbeat,
    IdTaken {
        #[serde(default)]
        payload: Option<BrokerNotice>,
    },
    Error {
        #[serde(default)]
        payload: Option<BrokerNotice>,
    },
    Leave {
        src: PeerId,
    },
    Expire {
        src: PeerId,
    },
    Offer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<PeerId>,
        payload: OfferPayload,
    },
    Answer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<PeerId>,
        payload: AnswerPayload,
    },
    Candidate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dst: Option<PeerId>,
        payload: CandidatePayload,
    },
    #[serde(other)]
    Unknown,
}

impl SignalMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed {
            reason: e.to_string(),
            text: text.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerNotice {
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: String) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp,
        }
    }

    pub fn answer(sdp: String) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferPayload {
    pub sdp: SessionDescription,
    #[serde(rename = "type")]
    pub kind: ConnectionKind,
    pub connection_id: ConnectionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    pub sdp: SessionDescription,
    #[serde(rename = "type")]
    pub kind: ConnectionKind,
    pub connection_id: ConnectionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePayload {
    pub candidate: IceCandidate,
    #[serde(rename = "type")]
    pub kind: ConnectionKind,
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
}
