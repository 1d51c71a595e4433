use crate::config::MediaConstraints;
use crate::error::MediaError;
use async_trait::async_trait;
use std::any::Any;
use std::rc::Rc;

/// Handle to a set of audio/video tracks.
pub trait MediaStream {
    /// Platform identifier, stable for the lifetime of the stream.
    fn id(&self) -> String;

    /// Stops every track. Only ever called on remote call streams.
    fn stop_tracks(&self);

    fn as_any(&self) -> &dyn Any;
}

/// Platform capture API.
#[async_trait(?Send)]
pub trait MediaSource {
    /// Requests capture. May prompt the user.
    async fn request_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Rc<dyn MediaStream>, MediaError>;
}
