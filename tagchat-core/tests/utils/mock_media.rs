use async_trait::async_trait;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tagchat_core::MediaConstraints;
use tagchat_core::error::MediaError;
use tagchat_core::event::{OnceEvent, OnceTrigger, once_event};
use tagchat_core::traits::{MediaSource, MediaStream};

/// Stream handle that records whether its tracks were stopped.
pub struct MockStream {
    id: String,
    stopped: Cell<bool>,
}

impl MockStream {
    pub fn new(id: &str) -> Rc<Self> {
        Rc::new(Self {
            id: id.to_string(),
            stopped: Cell::new(false),
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

impl MediaStream for MockStream {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn stop_tracks(&self) {
        tracing::debug!("[MockStream] stopping tracks of {}", self.id);
        self.stopped.set(true);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Capture API that counts requests and can be told to refuse or to hold a request.
#[derive(Default)]
pub struct MockMediaSource {
    requests: Cell<usize>,
    deny: Cell<bool>,
    gate: RefCell<Option<OnceEvent<()>>>,
    streams: RefCell<Vec<Rc<MockStream>>>,
}

impl MockMediaSource {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    pub fn set_deny(&self, deny: bool) {
        self.deny.set(deny);
    }

    /// Holds the next request until the returned trigger fires.
    pub fn hold_next(&self) -> OnceTrigger<()> {
        let (trigger, event) = once_event();
        *self.gate.borrow_mut() = Some(event);
        trigger
    }

    pub fn last_stream(&self) -> Option<Rc<MockStream>> {
        self.streams.borrow().last().cloned()
    }
}

#[async_trait(?Send)]
impl MediaSource for MockMediaSource {
    async fn request_user_media(
        &self,
        _constraints: &MediaConstraints,
    ) -> Result<Rc<dyn MediaStream>, MediaError> {
        let n = self.requests.get() + 1;
        self.requests.set(n);

        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.deny.get() {
            return Err(MediaError::PermissionDenied("NotAllowedError".into()));
        }

        let stream = MockStream::new(&format!("local-{n}"));
        self.streams.borrow_mut().push(stream.clone());
        Ok(stream)
    }
}
