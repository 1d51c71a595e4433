//! Typed replacements for callback registration.
//!
//! [`OnceEvent`] resolves exactly once: with the value its [`OnceTrigger`] fired, or
//! with [`Closed`] when the trigger is dropped unfired. [`EventStream`] yields every
//! emitted value in order and completes once its [`EventEmitter`] is closed or every
//! clone of it has been dropped.

use futures::channel::{mpsc, oneshot};
use futures::{Future, Stream};
use std::cell::RefCell;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The source of a single-shot event went away without firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed;

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event source closed")
    }
}

impl std::error::Error for Closed {}

pub fn once_event<T>() -> (OnceTrigger<T>, OnceEvent<T>) {
    let (tx, rx) = oneshot::channel();
    (
        OnceTrigger {
            tx: RefCell::new(Some(tx)),
        },
        OnceEvent { rx },
    )
}

pub struct OnceTrigger<T> {
    tx: RefCell<Option<oneshot::Sender<T>>>,
}

impl<T> OnceTrigger<T> {
    /// Fires the event. Later calls are ignored and return `false`, as does a
    /// call after the awaiting side was dropped.
    pub fn fire(&self, value: T) -> bool {
        match self.tx.borrow_mut().take() {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Resolves the awaiting side with [`Closed`].
    pub fn close(&self) {
        self.tx.borrow_mut().take();
    }

    pub fn is_pending(&self) -> bool {
        self.tx.borrow().as_ref().is_some_and(|tx| !tx.is_canceled())
    }
}

pub struct OnceEvent<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> OnceEvent<T> {
    /// An event that is already closed.
    pub fn closed() -> Self {
        let (_, event) = once_event();
        event
    }
}

impl<T> Future for OnceEvent<T> {
    type Output = Result<T, Closed>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|res| res.map_err(|_| Closed))
    }
}

pub fn event_channel<T>() -> (EventEmitter<T>, EventStream<T>) {
    let (tx, rx) = mpsc::unbounded();
    (EventEmitter { tx }, EventStream { rx })
}

pub struct EventEmitter<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventEmitter<T> {
    /// Returns `false` once the stream is closed or dropped.
    pub fn emit(&self, value: T) -> bool {
        self.tx.unbounded_send(value).is_ok()
    }

    /// Completes the stream for every clone of this emitter.
    pub fn close(&self) {
        self.tx.close_channel();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct EventStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> EventStream<T> {
    /// A stream that yields nothing.
    pub fn empty() -> Self {
        let (_, stream) = event_channel();
        stream
    }
}

impl<T> Stream for EventStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}
