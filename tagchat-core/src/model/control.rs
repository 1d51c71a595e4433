use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// Messages exchanged over the data connection of an active call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Hang up. The receiver tears the call down without answering.
    Stop,
}

impl ControlMessage {
    pub fn to_text(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed {
            reason: e.to_string(),
            text: text.to_string(),
        })
    }
}
