use std::cell::RefCell;
use std::rc::Rc;

use tagchat_core::error::PeerError;
use tagchat_core::model::SignalMessage;
use tagchat_core::traits::PeerEvent;
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsValue, prelude::Closure};
use web_sys::WebSocket;

use crate::engine::{ConnectionState, EngineInner, PeerEngine, sleep_ms};

impl PeerEngine {
    pub(crate) fn ws_setup(inner: &Rc<RefCell<EngineInner>>, url: &str) -> Result<(), PeerError> {
        let ws = WebSocket::new(url).map_err(|e| PeerError::Signaling(format!("{:?}", e)))?;

        let onopen_callback = Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
            info!("WS Open; waiting for broker OPEN");
        }));
        ws.set_onopen(Some(onopen_callback.as_ref().unchecked_ref()));
        onopen_callback.forget();

        let onmessage_callback = {
            let inner = inner.clone();
            Closure::<dyn FnMut(web_sys::MessageEvent)>::wrap(Box::new(
                move |e: web_sys::MessageEvent| {
                    if let Ok(text) = e.data().dyn_into::<js_sys::JsString>() {
                        let text: String = text.into();
                        debug!("WS IN: {}", text);
                        Self::handle_signal(&inner, text);
                    }
                },
            ))
        };
        ws.set_onmessage(Some(onmessage_callback.as_ref().unchecked_ref()));
        onmessage_callback.forget();

        let onclose_callback = {
            let inner = inner.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                warn!("WS Closed");
                inner.borrow_mut().state = ConnectionState::Disconnected;
                Self::emit(&inner, PeerEvent::Disconnected);
            }))
        };
        ws.set_onclose(Some(onclose_callback.as_ref().unchecked_ref()));
        onclose_callback.forget();

        let onerror_callback = Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |e| {
            warn!("WS Error: {:?}", e);
        }));
        ws.set_onerror(Some(onerror_callback.as_ref().unchecked_ref()));
        onerror_callback.forget();

        inner.borrow_mut().ws = Some(ws);
        Ok(())
    }

    /// Keeps the broker session alive until the socket closes.
    pub(crate) fn spawn_heartbeat(inner: &Rc<RefCell<EngineInner>>) {
        let interval = i32::try_from(inner.borrow().config.heartbeat_interval_ms).unwrap_or(i32::MAX);
        let inner = inner.clone();

        wasm_bindgen_futures::spawn_local(async move {
            let heartbeat = match SignalMessage::Heartbeat.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!("Heartbeat disabled: {}", e);
                    return;
                }
            };

            loop {
                if let Err(e) = sleep_ms(interval).await {
                    warn!("Heartbeat timer failed: {:?}", e);
                    break;
                }

                let ws = inner.borrow().ws.clone();
                match ws {
                    Some(ws) if ws.ready_state() == WebSocket::OPEN => {
                        if let Err(e) = ws.send_with_str(&heartbeat) {
                            warn!("Failed to send heartbeat: {:?}", e);
                        }
                    }
                    Some(ws) if ws.ready_state() == WebSocket::CLOSED => break,
                    Some(_) => {}
                    None => break,
                }
            }
            debug!("Heartbeat stopped");
        });
    }
}
