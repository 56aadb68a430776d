//! Browser host. Binds the viewer to three page elements: the `model`
//! container the canvas lives in, the `book` trigger that opens it and the
//! `close3D` button that hides it again.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::sync::Arc;

use log::{error, info, warn};
use vitrine_assets::LoadError;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, HtmlCanvasElement, HtmlElement, Response};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    platform::web::{EventLoopExtWebSys, WindowBuilderExtWebSys},
    window::{Window, WindowBuilder},
};

use crate::app::ViewerInstance;
use crate::cli::ViewerConfig;
use crate::controller::ViewerController;
use crate::error::InitializationError;
use crate::loader::LoadRequest;
use crate::page::{PageAction, ViewerPage};
use crate::scene::ContainerSize;
use crate::viewer::RenderSurface;

const CONTAINER_ID: &str = "model";
const TRIGGER_ID: &str = "book";
const CLOSE_ID: &str = "close3D";

const ASSET_BASE: &str = "./model/";
const MODEL_FILE: &str = "character.glb";
const ANIMATION_FILE: &str = "";

struct WebHost {
    container: HtmlElement,
    window: Arc<Window>,
    page: ViewerPage<ViewerInstance>,
    config: ViewerConfig,
    request: LoadRequest,
}

type SharedHost = Rc<RefCell<WebHost>>;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    boot().map_err(|err| {
        error!("[vitrine] {err}");
        JsValue::from_str(&err.to_string())
    })
}

fn boot() -> Result<(), InitializationError> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or(InitializationError::MissingElement("document"))?;
    let container = element::<HtmlElement>(&document, CONTAINER_ID)?;
    let trigger = element::<HtmlElement>(&document, TRIGGER_ID)?;
    let close = element::<HtmlElement>(&document, CLOSE_ID)?;

    let canvas = document
        .create_element("canvas")
        .ok()
        .and_then(|node| node.dyn_into::<HtmlCanvasElement>().ok())
        .ok_or_else(|| InitializationError::Window("creating canvas".to_string()))?;
    container
        .append_child(&canvas)
        .map_err(|err| InitializationError::Window(format!("{err:?}")))?;

    let config = ViewerConfig::default();
    let event_loop =
        EventLoop::new().map_err(|err| InitializationError::Window(err.to_string()))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_canvas(Some(canvas))
            .with_transparent(config.render.transparent)
            .build(&event_loop)
            .map_err(|err| InitializationError::Window(err.to_string()))?,
    );

    let host: SharedHost = Rc::new(RefCell::new(WebHost {
        container,
        window,
        page: ViewerPage::new(config.preload),
        config,
        request: LoadRequest {
            base_path: ASSET_BASE.into(),
            model_file: MODEL_FILE.to_string(),
            animation_file: ANIMATION_FILE.to_string(),
            spawn_offset: glam::Vec3::new(0.0, 10.0, 0.0),
        },
    }));

    listen(&trigger, "click", {
        let host = host.clone();
        move || open(&host)
    })?;
    listen(&close, "click", {
        let host = host.clone();
        move || host.borrow_mut().close()
    })?;
    if let Some(browser) = web_sys::window() {
        listen(&browser, "resize", {
            let host = host.clone();
            move || host.borrow_mut().resize()
        })?;
        listen(&browser, "scroll", {
            let host = host.clone();
            move || {
                let pos = web_sys::window()
                    .and_then(|window| window.scroll_y().ok())
                    .unwrap_or(0.0);
                host.borrow_mut().page.scroll(pos as f32);
            }
        })?;
    }
    if document.ready_state() == "loading" {
        listen(&document, "DOMContentLoaded", {
            let host = host.clone();
            move || content_loaded(&host)
        })?;
    } else {
        content_loaded(&host);
    }

    event_loop.spawn(move |event, target| {
        target.set_control_flow(ControlFlow::Poll);
        // A redraw requested from inside a DOM callback can be dispatched
        // while that callback still holds the host; the next tick catches up.
        if let Ok(mut host) = host.try_borrow_mut() {
            host.handle(event);
        }
    });
    Ok(())
}

fn element<T: JsCast>(document: &Document, id: &'static str) -> Result<T, InitializationError> {
    document
        .get_element_by_id(id)
        .and_then(|node| node.dyn_into::<T>().ok())
        .ok_or(InitializationError::MissingElement(id))
}

fn listen(
    target: &web_sys::EventTarget,
    kind: &str,
    handler: impl FnMut() + 'static,
) -> Result<(), InitializationError> {
    let closure = Closure::<dyn FnMut()>::new(handler);
    target
        .add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
        .map_err(|err| InitializationError::Window(format!("listening for {kind}: {err:?}")))?;
    // Listeners live as long as the page.
    closure.forget();
    Ok(())
}

fn now_ms() -> f64 {
    js_sys::Date::now()
}

fn content_loaded(host: &SharedHost) {
    let action = host.borrow_mut().page.content_loaded();
    construct(host, action);
}

fn open(host: &SharedHost) {
    let action = {
        let mut host = host.borrow_mut();
        host.show(true);
        let action = host.page.open();
        // A viewer built while hidden was sized to nothing.
        host.sync_size();
        action
    };
    construct(host, action);
}

/// Build the viewer asynchronously; the page stays responsive meanwhile.
fn construct(host: &SharedHost, action: PageAction) {
    if action != PageAction::Construct {
        return;
    }
    let (window, settings) = {
        let host = host.borrow();
        (host.window.clone(), host.config.render.clone())
    };
    let host = host.clone();
    wasm_bindgen_futures::spawn_local(async move {
        let surface = RenderSurface::new(window, settings).await;
        let mut host = host.borrow_mut();
        host.sync_size();
        let size = host.container_size();
        let result = surface.map(|surface| {
            let controller = ViewerController::new(host.config.clone(), size, now_ms());
            let mut instance = ViewerInstance::new(controller, surface);
            instance.begin_load(host.request.clone());
            instance
        });
        if let Err(err) = host.page.finish_initialization(result) {
            error!("[vitrine] viewer initialization failed: {err}");
            host.show(false);
        }
    });
}

impl WebHost {
    fn show(&self, visible: bool) {
        let display = if visible { "block" } else { "none" };
        if let Err(err) = self.container.style().set_property("display", display) {
            warn!("[vitrine] toggling container: {err:?}");
        }
    }

    fn close(&mut self) {
        self.show(false);
        self.page.close(now_ms());
    }

    /// Container size in device pixels; collapsed while hidden.
    fn container_size(&self) -> ContainerSize {
        ContainerSize::from_logical(
            f64::from(self.container.offset_width()),
            f64::from(self.container.offset_height()),
            self.window.scale_factor(),
        )
    }

    /// Fit the canvas and the viewer to the container as laid out now.
    fn sync_size(&mut self) {
        let width = f64::from(self.container.offset_width());
        let height = f64::from(self.container.offset_height());
        self.apply_size(width, height);
    }

    /// Browser resizes follow the window, as a full-page overlay does.
    fn resize(&mut self) {
        let Some(browser) = web_sys::window() else {
            return;
        };
        let width = browser
            .inner_width()
            .ok()
            .and_then(|value| value.as_f64())
            .unwrap_or(0.0);
        let height = browser
            .inner_height()
            .ok()
            .and_then(|value| value.as_f64())
            .unwrap_or(0.0);
        self.apply_size(width, height);
    }

    fn apply_size(&mut self, css_width: f64, css_height: f64) {
        let size = ContainerSize::from_logical(css_width, css_height, self.window.scale_factor());
        if size.is_collapsed() {
            return;
        }
        let _ = self
            .window
            .request_inner_size(winit::dpi::LogicalSize::new(css_width, css_height));
        self.page.resize(size);
    }

    fn handle(&mut self, event: Event<()>) {
        match event {
            Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                let now = now_ms();
                match event {
                    WindowEvent::RedrawRequested => {
                        self.page.tick(now);
                        if let Some(viewer) = self.page.active_viewer() {
                            if let Err(err) = viewer.draw() {
                                warn!("[vitrine] render error: {err:?}");
                            }
                        }
                    }
                    WindowEvent::Resized(size) => {
                        let size = ContainerSize::new(size.width, size.height);
                        if !size.is_collapsed() {
                            self.page.resize(size);
                        }
                    }
                    other => {
                        if let Some(viewer) = self.page.active_viewer() {
                            viewer.pointer_input(&other, now);
                        }
                    }
                }
            }
            // Animation frames keep firing under `display: none`, so the
            // frame loop runs whether or not the container is shown.
            Event::AboutToWait => self.window.request_redraw(),
            _ => {}
        }
    }
}

/// Fetch an asset over HTTP. A 404 maps to `LoadError::NotFound`.
pub(crate) async fn fetch_asset(url: &str) -> Result<Vec<u8>, LoadError> {
    let io_error = |err: JsValue| LoadError::Io {
        location: url.to_string(),
        source: io::Error::other(format!("{err:?}")),
    };
    let browser = web_sys::window().ok_or_else(|| io_error(JsValue::from_str("no window")))?;
    let response: Response = JsFuture::from(browser.fetch_with_str(url))
        .await
        .and_then(|value| value.dyn_into())
        .map_err(io_error)?;
    if response.status() == 404 {
        return Err(LoadError::NotFound {
            location: url.to_string(),
        });
    }
    if !response.ok() {
        return Err(io_error(JsValue::from_str(&format!(
            "HTTP {} {}",
            response.status(),
            response.status_text()
        ))));
    }
    let buffer = JsFuture::from(response.array_buffer().map_err(io_error)?)
        .await
        .map_err(io_error)?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    info!("[vitrine] fetched {url} ({} bytes)", bytes.len());
    Ok(bytes)
}
