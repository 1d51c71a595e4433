//! Local capture through `navigator.mediaDevices.getUserMedia`.

use std::any::Any;
use std::rc::Rc;

use async_trait::async_trait;
use tagchat_core::MediaConstraints;
use tagchat_core::error::MediaError;
use tagchat_core::traits::{MediaSource, MediaStream};
use tracing::{debug, info};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::MediaStreamConstraints;

/// A browser `MediaStream`, local or remote.
pub struct BrowserStream {
    stream: web_sys::MediaStream,
}

impl BrowserStream {
    pub fn new(stream: web_sys::MediaStream) -> Self {
        Self { stream }
    }

    pub fn inner(&self) -> &web_sys::MediaStream {
        &self.stream
    }

    /// The underlying browser stream, if `stream` came from this backend.
    pub fn from_dyn(stream: &dyn MediaStream) -> Option<&web_sys::MediaStream> {
        stream
            .as_any()
            .downcast_ref::<BrowserStream>()
            .map(BrowserStream::inner)
    }
}

impl MediaStream for BrowserStream {
    fn id(&self) -> String {
        self.stream.id()
    }

    fn stop_tracks(&self) {
        for track in self.stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<web_sys::MediaStreamTrack>() {
                debug!("Stopping {} track {}", track.kind(), track.id());
                track.stop();
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Denials surface as DOMExceptions named `NotAllowedError` or `SecurityError`.
fn classify(e: JsValue) -> MediaError {
    let name = js_sys::Reflect::get(&e, &"name".into())
        .ok()
        .and_then(|n| n.as_string())
        .unwrap_or_default();
    match name.as_str() {
        "NotAllowedError" | "SecurityError" => MediaError::PermissionDenied(name),
        _ => MediaError::Unavailable(format!("{:?}", e)),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserMediaSource;

#[async_trait(?Send)]
impl MediaSource for BrowserMediaSource {
    async fn request_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Rc<dyn MediaStream>, MediaError> {
        let window =
            web_sys::window().ok_or_else(|| MediaError::Unavailable("no window".to_string()))?;
        let media_devices = window
            .navigator()
            .media_devices()
            .map_err(|e| MediaError::Unavailable(format!("{:?}", e)))?;

        let request = MediaStreamConstraints::new();
        request.set_audio(&JsValue::from_bool(constraints.audio));
        request.set_video(&JsValue::from_bool(constraints.video));

        let promise = media_devices
            .get_user_media_with_constraints(&request)
            .map_err(classify)?;
        let stream: web_sys::MediaStream = JsFuture::from(promise)
            .await
            .map_err(classify)?
            .dyn_into()
            .map_err(|v| MediaError::Unavailable(format!("not a MediaStream: {:?}", v)))?;

        info!("Acquired local stream {}", stream.id());
        Ok(Rc::new(BrowserStream::new(stream)))
    }
}
