//! Client configuration, supplied once at startup.

use crate::error::ConfigError;
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_3: &str = "stun:stun2.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_4: &str = "stun:stun3.l.google.com:19302";

pub const DEFAULT_MATCHMAKER_URL: &str = "https://6aab9a53.ngrok.io";
pub const DEFAULT_BROKER_HOST: &str = "khudiakov.monster";
pub const DEFAULT_BROKER_PORT: u16 = 9000;
pub const DEFAULT_BROKER_KEY: &str = "peerjs";
pub const DEFAULT_HEARTBEAT_MS: u32 = 5000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(urls: &[&str]) -> Self {
        Self {
            urls: urls.iter().map(|u| u.to_string()).collect(),
            username: None,
            credential: None,
        }
    }
}

/// Top-level configuration of a tagchat client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub matchmaker: MatchmakerConfig,
    pub signaling: SignalingConfig,
    pub media: MediaConstraints,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matchmaker.validate()?;
        self.signaling.validate()?;
        self.media.validate()
    }
}

/// Where the tag matchmaking server lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerConfig {
    pub base_url: String,
}

impl Default for MatchmakerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MATCHMAKER_URL.to_string(),
        }
    }
}

impl MatchmakerConfig {
    /// Absolute URL of an endpoint, `path` starting with `/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidUrl {
            field: "matchmaker.base_url",
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ConfigError::InvalidUrl {
                field: "matchmaker.base_url",
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }
}

/// Signaling broker endpoint and peer connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub secure: bool,
    pub key: String,
    pub ice_servers: Vec<IceServerConfig>,
    pub heartbeat_interval_ms: u32,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BROKER_HOST.to_string(),
            port: DEFAULT_BROKER_PORT,
            path: "/".to_string(),
            secure: true,
            key: DEFAULT_BROKER_KEY.to_string(),
            ice_servers: vec![IceServerConfig::stun(&[
                DEFAULT_STUN_ADDR,
                DEFAULT_STUN_ADDR_2,
                DEFAULT_STUN_ADDR_3,
                DEFAULT_STUN_ADDR_4,
            ])],
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_MS,
        }
    }
}

impl SignalingConfig {
    /// Broker path, always with leading and trailing slash.
    fn normalized_path(&self) -> String {
        let trimmed = self.path.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        }
    }

    /// Endpoint that hands out fresh peer identities.
    pub fn id_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!(
            "{}://{}:{}{}{}/id",
            scheme,
            self.host,
            self.port,
            self.normalized_path(),
            self.key
        )
    }

    /// WebSocket endpoint for the given identity and session token.
    pub fn socket_url(&self, id: &str, token: &str) -> Result<String, ConfigError> {
        let scheme = if self.secure { "wss" } else { "ws" };
        let base = format!(
            "{}://{}:{}{}peerjs",
            scheme,
            self.host,
            self.port,
            self.normalized_path()
        );
        let mut url = Url::parse(&base).map_err(|e| ConfigError::InvalidUrl {
            field: "signaling",
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("key", &self.key)
            .append_pair("id", id)
            .append_pair("token", token);
        Ok(url.to_string())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "signaling.host",
            });
        }
        if self.key.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "signaling.key",
            });
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                field: "signaling.port",
                reason: "port must be non-zero".to_string(),
            });
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "signaling.heartbeat_interval_ms",
                reason: "interval must be non-zero".to_string(),
            });
        }
        if let Some(server) = self.ice_servers.iter().find(|s| s.urls.is_empty()) {
            return Err(ConfigError::Invalid {
                field: "signaling.ice_servers",
                reason: format!("ICE server entry without urls: {server:?}"),
            });
        }
        self.socket_url("probe", "probe").map(|_| ())
    }
}

/// Which local capture devices to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

impl MediaConstraints {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.audio && !self.video {
            return Err(ConfigError::Invalid {
                field: "media",
                reason: "at least one of audio or video must be requested".to_string(),
            });
        }
        Ok(())
    }
}
