#![cfg(target_arch = "wasm32")]

//! Browser host: a full-window canvas driven by `requestAnimationFrame`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use anyhow::{anyhow, Context, Result};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{EventTarget, HtmlCanvasElement, MouseEvent, Response};

use crate::config::{DemoConfig, TextConfig};
use crate::text::{build_text_mesh, PendingText, TextLoadError};
use crate::{DemoApp, Renderer, TickOutcome};

type FrameCallback = Closure<dyn FnMut(f64)>;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Handle to a running demo. Dropping it stops the loop and detaches every
/// page listener.
#[wasm_bindgen]
pub struct WebDemo {
    shared: Rc<Shared>,
    _listeners: Vec<Listener>,
}

struct Shared {
    app: RefCell<DemoApp<Renderer>>,
    canvas: HtmlCanvasElement,
    frame_callback: RefCell<Option<FrameCallback>>,
    frame_request: Cell<Option<i32>>,
}

#[wasm_bindgen]
impl WebDemo {
    /// Appends a canvas to the page, starts loading the font and returns
    /// the stopped demo. `config_json` overrides the defaults.
    pub async fn create(config_json: Option<String>) -> Result<WebDemo, JsValue> {
        Self::build(config_json)
            .await
            .map_err(|err| JsValue::from_str(&format!("{err:#}")))
    }

    pub fn start(&self) {
        if self.shared.app.borrow().is_running() {
            return;
        }
        self.shared.app.borrow_mut().start();
        self.shared.request_frame();
    }

    pub fn stop(&self) {
        self.shared.app.borrow_mut().stop();
        self.shared.cancel_frame();
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.shared.app.borrow().is_running()
    }
}

impl WebDemo {
    async fn build(config_json: Option<String>) -> Result<Self> {
        let config = match config_json {
            Some(json) => DemoConfig::from_json(&json)?,
            None => DemoConfig::default(),
        };
        let window = web_sys::window().context("no browser window")?;
        let document = window.document().context("window has no document")?;
        let (width, height) = window_size(&window);

        let canvas: HtmlCanvasElement = document
            .create_element("canvas")
            .map_err(js_error)?
            .dyn_into()
            .map_err(|_| anyhow!("created element is not a canvas"))?;
        canvas.set_width(width);
        canvas.set_height(height);
        canvas
            .style()
            .set_property("display", "block")
            .map_err(js_error)?;
        let body = document.body().context("document has no body element")?;
        body.append_child(&canvas).map_err(js_error)?;

        let renderer =
            Renderer::new(wgpu::SurfaceTarget::Canvas(canvas.clone()), width, height).await?;
        let mut app = DemoApp::new(config, renderer, width, height)?;
        let pending = PendingText::new();
        app.request_text(pending.clone());
        spawn_font_fetch(app.config().text.clone(), pending);

        let shared = Rc::new(Shared {
            app: RefCell::new(app),
            canvas,
            frame_callback: RefCell::new(None),
            frame_request: Cell::new(None),
        });
        *shared.frame_callback.borrow_mut() = Some(frame_callback(&shared));

        let target: EventTarget = window.clone().into();
        let listeners = vec![
            Listener::attach(&target, "mousemove", pointer_handler(&shared))?,
            Listener::attach(&target, "resize", resize_handler(&shared))?,
        ];
        Ok(Self {
            shared,
            _listeners: listeners,
        })
    }
}

impl Drop for WebDemo {
    fn drop(&mut self) {
        self.shared.app.borrow_mut().stop();
        self.shared.cancel_frame();
    }
}

impl Shared {
    fn request_frame(&self) {
        let callback = self.frame_callback.borrow();
        let (Some(callback), Some(window)) = (callback.as_ref(), web_sys::window()) else {
            return;
        };
        match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
            Ok(id) => self.frame_request.set(Some(id)),
            Err(err) => log::error!("requestAnimationFrame failed: {err:?}"),
        }
    }

    fn cancel_frame(&self) {
        if let (Some(id), Some(window)) = (self.frame_request.take(), web_sys::window()) {
            if let Err(err) = window.cancel_animation_frame(id) {
                log::warn!("cancelAnimationFrame failed: {err:?}");
            }
        }
    }
}

/// The persistent `requestAnimationFrame` callback. It re-requests itself
/// only while the loop keeps running.
fn frame_callback(shared: &Rc<Shared>) -> FrameCallback {
    let weak = Rc::downgrade(shared);
    Closure::wrap(Box::new(move |now_ms: f64| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        shared.frame_request.set(None);
        let outcome = shared.app.borrow_mut().frame(now_ms);
        match outcome {
            Ok(TickOutcome::Halted) => log::info!("render loop halted"),
            Ok(_) => shared.request_frame(),
            Err(err) => log::error!("render loop stopped: {err}"),
        }
    }) as Box<dyn FnMut(f64)>)
}

fn pointer_handler(shared: &Rc<Shared>) -> impl FnMut(web_sys::Event) + 'static {
    let weak: Weak<Shared> = Rc::downgrade(shared);
    move |event: web_sys::Event| {
        let (Some(shared), Some(event)) = (weak.upgrade(), event.dyn_ref::<MouseEvent>()) else {
            return;
        };
        shared
            .app
            .borrow_mut()
            .on_pointer_move(event.client_x() as f32, event.client_y() as f32);
    }
}

fn resize_handler(shared: &Rc<Shared>) -> impl FnMut(web_sys::Event) + 'static {
    let weak: Weak<Shared> = Rc::downgrade(shared);
    move |_event: web_sys::Event| {
        let (Some(shared), Some(window)) = (weak.upgrade(), web_sys::window()) else {
            return;
        };
        let (width, height) = window_size(&window);
        if width == 0 || height == 0 {
            return;
        }
        shared.canvas.set_width(width);
        shared.canvas.set_height(height);
        shared.app.borrow_mut().on_resize(width, height);
    }
}

/// Event listener removed from its target on drop.
struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
    fn attach(
        target: &EventTarget,
        kind: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self> {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
        target
            .add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())
            .map_err(js_error)
            .with_context(|| format!("failed to listen for {kind}"))?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref());
    }
}

fn spawn_font_fetch(text: TextConfig, pending: PendingText) {
    spawn_local(async move {
        let result = fetch_font(&text.font)
            .await
            .and_then(|json| build_text_mesh(&json, &text.content, &text.params));
        pending.fulfil(result);
    });
}

async fn fetch_font(url: &str) -> Result<String, TextLoadError> {
    let fetch_error = |err: JsValue| TextLoadError::Fetch(format!("{url}: {err:?}"));
    let window = web_sys::window().ok_or_else(|| TextLoadError::Fetch("no browser window".into()))?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(fetch_error)?
        .dyn_into()
        .map_err(fetch_error)?;
    if !response.ok() {
        return Err(TextLoadError::Fetch(format!(
            "{url} answered HTTP {}",
            response.status()
        )));
    }
    let body = JsFuture::from(response.text().map_err(fetch_error)?)
        .await
        .map_err(fetch_error)?;
    body.as_string()
        .ok_or_else(|| TextLoadError::Fetch(format!("{url} returned a non-text body")))
}

fn window_size(window: &web_sys::Window) -> (u32, u32) {
    let dimension = |value: Result<JsValue, JsValue>| {
        value
            .ok()
            .and_then(|value| value.as_f64())
            .map_or(1, |value| value.max(1.0) as u32)
    };
    (dimension(window.inner_width()), dimension(window.inner_height()))
}

fn js_error(err: JsValue) -> anyhow::Error {
    anyhow!("{err:?}")
}
