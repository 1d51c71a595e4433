//! DOM rendering of a [`Session`]: Connect/Stop buttons, the tag row and the
//! two video elements. Re-rendered from every session snapshot.

use std::cell::RefCell;
use std::rc::Rc;

use tagchat_core::traits::MediaStream;
use tagchat_core::{Session, SessionSnapshot, Tag};
use tracing::{debug, error, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlButtonElement, HtmlElement, HtmlVideoElement};

use crate::media::BrowserStream;

const SELECTED_COLOR: &str = "red";
const UNSELECTED_COLOR: &str = "black";

fn create<T: JsCast>(document: &Document, tag: &str) -> Result<T, JsValue> {
    document
        .create_element(tag)?
        .dyn_into::<T>()
        .map_err(|e| JsValue::from_str(&format!("<{tag}> has an unexpected type: {e:?}")))
}

fn set_styles(el: &HtmlElement, styles: &[(&str, &str)]) -> Result<(), JsValue> {
    let style = el.style();
    for (property, value) in styles {
        style.set_property(property, value)?;
    }
    Ok(())
}

/// Calls `play()` whenever a new source has loaded its metadata.
fn play_on_metadata(video: &HtmlVideoElement) {
    let target = video.clone();
    let on_metadata = Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
        match target.play() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    debug!("play() rejected: {:?}", e);
                }
            }),
            Err(e) => warn!("play() failed: {:?}", e),
        }
    }));
    video.set_onloadedmetadata(Some(on_metadata.as_ref().unchecked_ref()));
    on_metadata.forget();
}

pub struct View {
    document: Document,
    session: Session,
    connect_row: HtmlElement,
    connect: HtmlButtonElement,
    stop: HtmlButtonElement,
    tag_row: HtmlElement,
    call_video: HtmlVideoElement,
    local_video: HtmlVideoElement,
    tags: RefCell<Vec<(Tag, HtmlElement)>>,
    tag_handlers: RefCell<Vec<Closure<dyn FnMut(JsValue)>>>,
    bound_local: RefCell<Option<String>>,
    bound_call: RefCell<Option<String>>,
}

impl View {
    /// Builds the page under `root` and re-renders it on every session change.
    pub fn mount(root: &Element, session: Session) -> Result<Rc<View>, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let container: HtmlElement = create(&document, "div")?;
        set_styles(
            &container,
            &[
                ("width", "100vw"),
                ("height", "100vh"),
                ("overflow", "hidden"),
                ("display", "flex"),
                ("flex-direction", "column"),
            ],
        )?;

        let connect_row: HtmlElement = create(&document, "div")?;
        set_styles(&connect_row, &[("display", "flex"), ("flex-direction", "row")])?;
        let connect: HtmlButtonElement = create(&document, "button")?;
        connect.set_text_content(Some("Connect"));
        connect_row.append_child(&connect)?;

        let stop: HtmlButtonElement = create(&document, "button")?;
        stop.set_text_content(Some("Stop"));

        let tag_row: HtmlElement = create(&document, "div")?;
        set_styles(&tag_row, &[("display", "flex"), ("flex-direction", "row")])?;

        let call_video: HtmlVideoElement = create(&document, "video")?;
        call_video.set_id("callStream");
        set_styles(&call_video, &[("flex", "1")])?;

        let local_video: HtmlVideoElement = create(&document, "video")?;
        local_video.set_id("stream");
        local_video.set_muted(true);
        set_styles(
            &local_video,
            &[
                ("position", "absolute"),
                ("bottom", "0"),
                ("right", "0"),
                ("width", "200px"),
                ("height", "100px"),
            ],
        )?;

        play_on_metadata(&call_video);
        play_on_metadata(&local_video);

        container.append_child(&connect_row)?;
        container.append_child(&stop)?;
        container.append_child(&tag_row)?;
        container.append_child(&call_video)?;
        container.append_child(&local_video)?;
        root.append_child(&container)?;

        let view = Rc::new(View {
            document,
            session: session.clone(),
            connect_row,
            connect,
            stop,
            tag_row,
            call_video,
            local_video,
            tags: RefCell::new(Vec::new()),
            tag_handlers: RefCell::new(Vec::new()),
            bound_local: RefCell::new(None),
            bound_call: RefCell::new(None),
        });
        view.wire_buttons();

        let listener = view.clone();
        session.subscribe(move |snapshot: &SessionSnapshot| {
            if let Err(e) = listener.render(snapshot) {
                warn!("Render failed: {:?}", e);
            }
        });
        view.render(&session.snapshot())?;

        Ok(view)
    }

    fn wire_buttons(&self) {
        let on_connect = {
            let session = self.session.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                let session = session.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = session.connect().await {
                        error!("Connect failed: {}", e);
                    }
                });
            }))
        };
        self.connect
            .set_onclick(Some(on_connect.as_ref().unchecked_ref()));
        on_connect.forget();

        let on_stop = {
            let session = self.session.clone();
            Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                if let Err(e) = session.stop() {
                    error!("Stop failed: {}", e);
                }
            }))
        };
        self.stop.set_onclick(Some(on_stop.as_ref().unchecked_ref()));
        on_stop.forget();
    }

    pub fn render(&self, snapshot: &SessionSnapshot) -> Result<(), JsValue> {
        let in_call = snapshot.call_stream.is_some();
        set_styles(
            &self.connect_row,
            &[("display", if in_call { "none" } else { "flex" })],
        )?;
        set_styles(
            &self.stop,
            &[("display", if in_call { "inline-block" } else { "none" })],
        )?;
        self.connect.set_disabled(snapshot.loading);

        self.render_tags(snapshot)?;

        Self::bind(&self.local_video, snapshot.local_stream.as_ref(), &self.bound_local);
        Self::bind(&self.call_video, snapshot.call_stream.as_ref(), &self.bound_call);
        Ok(())
    }

    fn render_tags(&self, snapshot: &SessionSnapshot) -> Result<(), JsValue> {
        let stale = {
            let rendered = self.tags.borrow();
            rendered.len() != snapshot.tags.len()
                || rendered.iter().zip(&snapshot.tags).any(|((t, _), s)| t != s)
        };
        if stale {
            self.rebuild_tags(&snapshot.tags)?;
        }

        for (tag, label) in self.tags.borrow().iter() {
            let color = if snapshot.is_selected(tag) {
                SELECTED_COLOR
            } else {
                UNSELECTED_COLOR
            };
            set_styles(label, &[("color", color)])?;
        }
        Ok(())
    }

    fn rebuild_tags(&self, tags: &[Tag]) -> Result<(), JsValue> {
        self.tag_row.set_inner_html("");

        let mut labels = Vec::with_capacity(tags.len());
        let mut handlers = Vec::with_capacity(tags.len());
        for tag in tags {
            let label: HtmlElement = create(&self.document, "span")?;
            label.set_text_content(Some(tag.as_str()));
            set_styles(&label, &[("margin-right", "5px"), ("cursor", "pointer")])?;

            let on_click = {
                let session = self.session.clone();
                let tag = tag.clone();
                Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |_| {
                    session.toggle_tag(tag.clone());
                }))
            };
            label.set_onclick(Some(on_click.as_ref().unchecked_ref()));

            self.tag_row.append_child(&label)?;
            labels.push((tag.clone(), label));
            handlers.push(on_click);
        }

        *self.tags.borrow_mut() = labels;
        *self.tag_handlers.borrow_mut() = handlers;
        Ok(())
    }

    /// Points `video` at `stream` when the stream changed since the last render.
    fn bind(
        video: &HtmlVideoElement,
        stream: Option<&Rc<dyn MediaStream>>,
        bound: &RefCell<Option<String>>,
    ) {
        let id = stream.map(|s| s.id());
        if *bound.borrow() == id {
            return;
        }

        let source = stream.and_then(|s| BrowserStream::from_dyn(s.as_ref()));
        video.set_src_object(source);
        *bound.borrow_mut() = id;
    }
}
