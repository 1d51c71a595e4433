//! Browser front end for tagchat: the PeerJS-compatible peer engine, capture
//! through `getUserMedia`, the DOM view and the `wasm-bindgen` entry points.

use std::rc::Rc;

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};
use tagchat_core::traits::PeerService;
use tagchat_core::{ClientConfig, HttpMatchmaker, Session, SessionContext};
use tracing::{error, info};
use wasm_bindgen::prelude::*;

pub mod engine;
pub mod logger;
pub mod media;
pub mod view;

pub use engine::{ConnectionState, PeerEngine};
pub use media::{BrowserMediaSource, BrowserStream};
pub use view::View;

const DEFAULT_LOG_LEVEL: &str = "info";

#[cfg(all(test, target_arch = "wasm32"))]
wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

/// Runs session tasks on the browser microtask queue.
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

/// Installs console logging and the panic hook. `level` takes `EnvFilter`
/// directives and defaults to `info`.
#[wasm_bindgen]
pub fn init_logging(level: Option<String>) -> Result<(), JsValue> {
    logger::init(level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_config(config: JsValue) -> anyhow::Result<ClientConfig> {
    let config: ClientConfig = if config.is_undefined() || config.is_null() {
        ClientConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)
            .map_err(|e| anyhow::anyhow!("invalid client config: {e}"))?
    };
    config.validate()?;
    Ok(config)
}

#[wasm_bindgen]
pub struct TagChatClient {
    session: Session,
    engine: Rc<PeerEngine>,
    _view: Rc<View>,
}

#[wasm_bindgen]
impl TagChatClient {
    /// Mounts the page under `root`. `config` may be `undefined` for the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(root: web_sys::Element, config: JsValue) -> Result<TagChatClient, JsValue> {
        let config = parse_config(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        info!(
            "Starting tagchat: matchmaker {}, broker {}:{}",
            config.matchmaker.base_url, config.signaling.host, config.signaling.port
        );

        let engine = Rc::new(PeerEngine::new(config.signaling.clone()));
        let matchmaker = Rc::new(HttpMatchmaker::new(config.matchmaker.clone()));
        let ctx = SessionContext::new(config, Rc::new(BrowserMediaSource), matchmaker);

        let peer: Rc<dyn PeerService> = engine.clone();
        let session = Session::new(ctx, peer, Rc::new(BrowserSpawner));
        let view = View::mount(&root, session.clone())?;

        Ok(TagChatClient {
            session,
            engine,
            _view: view,
        })
    }

    /// Acquires media and tags, registers with the broker and starts handling
    /// peer events.
    pub fn start(&self) {
        let session = self.session.clone();
        wasm_bindgen_futures::spawn_local(async move { session.run().await });

        let engine = self.engine.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match engine.start().await {
                Ok(id) => info!("Registering with the broker as {}", id),
                Err(e) => error!("Failed to reach the signaling broker: {}", e),
            }
        });
    }

    /// Identity assigned by the broker, once known.
    #[wasm_bindgen(getter)]
    pub fn id(&self) -> Option<String> {
        self.session.snapshot().own_id.map(|id| id.to_string())
    }
}
