use std::cell::RefCell;
use std::rc::Rc;

use tagchat_core::model::ConnectionId;
use tracing::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::engine::{EngineInner, PeerEngine};

impl PeerEngine {
    pub(super) fn setup_data_channel(
        inner: &Rc<RefCell<EngineInner>>,
        id: &ConnectionId,
        dc: web_sys::RtcDataChannel,
    ) {
        let on_msg = {
            let inner = inner.clone();
            let id = id.clone();
            Closure::<dyn FnMut(web_sys::MessageEvent)>::wrap(Box::new(
                move |ev: web_sys::MessageEvent| {
                    let Some(text) = ev.data().as_string() else {
                        warn!("Dropping binary frame on {}", id);
                        return;
                    };
                    let emitter = inner
                        .borrow()
                        .links
                        .get(&id)
                        .and_then(|link| link.messages.clone());
                    match emitter {
                        Some(emitter) => {
                            emitter.emit(text);
                        }
                        None => debug!("Message on closed link {}", id),
                    }
                },
            ))
        };
        dc.set_onmessage(Some(on_msg.as_ref().unchecked_ref()));
        on_msg.forget();

        let on_open = {
            let inner = inner.clone();
            let id = id.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                info!("DataChannel {} OPEN", id);

                let (dc, messages) = {
                    let mut inner_mut = inner.borrow_mut();
                    match inner_mut.links.get_mut(&id) {
                        Some(link) => {
                            let msgs: Vec<String> = link.outbox.drain(..).collect();
                            (link.dc.clone(), msgs)
                        }
                        None => (None, Vec::new()),
                    }
                };

                if let Some(dc) = dc {
                    for msg in messages {
                        if let Err(e) = dc.send_with_str(&msg) {
                            warn!("Failed to send buffered message: {:?}", e);
                        }
                    }
                }
            }))
        };
        dc.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        on_open.forget();

        let on_close = {
            let inner = inner.clone();
            let id = id.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                info!("DataChannel {} CLOSED", id);
                Self::close_link(&inner, &id);
            }))
        };
        dc.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        on_close.forget();

        let mut inner_mut = inner.borrow_mut();
        match inner_mut.links.get_mut(id) {
            Some(link) => link.dc = Some(dc),
            None => dc.close(),
        }
    }
}
