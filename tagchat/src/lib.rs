pub use tagchat_core::model::{PeerId, Tag};
pub use tagchat_core::{ClientConfig, Session, SessionContext};

pub mod model {
    pub use tagchat_core::model::*;
}

pub mod config {
    pub use tagchat_core::config::*;
}

pub mod session {
    pub use tagchat_core::session::*;
}

#[cfg(feature = "web")]
pub mod web {
    pub use tagchat_web::*;
}
