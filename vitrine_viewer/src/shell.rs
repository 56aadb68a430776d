//! Native host. The window plays the part of the page: it exists from
//! startup, while the viewer inside it is built on first open (or right away
//! when preloading) exactly as the browser host does it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{error, info, warn};
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{Key, NamedKey},
    window::{Window, WindowBuilder},
};

use crate::app::ViewerInstance;
use crate::cli::{Args, ViewerConfig};
use crate::controller::ViewerController;
use crate::headless::FRAME_INTERVAL_MS;
use crate::loader::LoadRequest;
use crate::page::{PageAction, ViewerPage};
use crate::scene::ContainerSize;
use crate::viewer::RenderSurface;

const SCROLL_STEP: f32 = 50.0;

struct Shell {
    window: Arc<Window>,
    page: ViewerPage<ViewerInstance>,
    config: ViewerConfig,
    request: LoadRequest,
    clock: Instant,
}

pub fn run(args: &Args) -> Result<()> {
    let config = args.viewer_config().context("resolving viewer configuration")?;
    let request = args.load_request();

    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(format!("Vitrine - {}", args.model))
            .with_inner_size(PhysicalSize::new(args.width, args.height))
            .with_transparent(config.render.transparent)
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    println!("Enter/Space opens the viewer, Escape closes it, Q quits.");
    println!("PageUp/PageDown/Home move the page scroll offset.");

    let mut shell = Shell {
        window,
        page: ViewerPage::new(config.preload),
        config,
        request,
        clock: Instant::now(),
    };

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);
            shell.handle(event, target);
        })
        .context("running viewer application")?;
    Ok(())
}

impl Shell {
    fn now_ms(&self) -> f64 {
        self.clock.elapsed().as_secs_f64() * 1000.0
    }

    fn container_size(&self) -> ContainerSize {
        let size = self.window.inner_size();
        ContainerSize::new(size.width, size.height)
    }

    fn handle(&mut self, event: Event<()>, target: &EventLoopWindowTarget<()>) {
        match event {
            Event::Resumed => {
                let action = self.page.content_loaded();
                self.act(action);
            }
            Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                self.handle_window_event(event, target)
            }
            Event::AboutToWait => {
                let now_ms = self.now_ms();
                self.page.tick(now_ms);
                if self.page.is_visible() {
                    self.window.request_redraw();
                } else {
                    // Nothing presents while hidden, so pace the loop here.
                    target.set_control_flow(ControlFlow::WaitUntil(
                        Instant::now() + Duration::from_secs_f64(FRAME_INTERVAL_MS / 1000.0),
                    ));
                }
            }
            Event::LoopExiting => {
                if let Some(viewer) = self.page.teardown() {
                    info!(
                        "[vitrine] exiting with scene {}",
                        viewer.controller().content().label()
                    );
                    viewer.dispose();
                }
            }
            _ => {}
        }
    }

    fn handle_window_event(&mut self, event: WindowEvent, target: &EventLoopWindowTarget<()>) {
        let now_ms = self.now_ms();
        match event {
            WindowEvent::CloseRequested => target.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(logical_key, now_ms, target),
            WindowEvent::Resized(new_size) => {
                self.page
                    .resize(ContainerSize::new(new_size.width, new_size.height));
            }
            WindowEvent::CursorMoved { .. }
            | WindowEvent::MouseInput { .. }
            | WindowEvent::MouseWheel { .. } => {
                if let Some(viewer) = self.page.active_viewer() {
                    viewer.pointer_input(&event, now_ms);
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(viewer) = self.page.active_viewer() else {
                    return;
                };
                match viewer.draw() {
                    Ok(_) => {}
                    Err(SurfaceError::OutOfMemory) => {
                        error!("[vitrine] GPU out of memory; exiting");
                        target.exit();
                    }
                    Err(err) => warn!("[vitrine] render error: {err:?}"),
                }
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: Key, now_ms: f64, target: &EventLoopWindowTarget<()>) {
        match key {
            Key::Named(NamedKey::Enter | NamedKey::Space) => {
                let action = self.page.open();
                self.act(action);
            }
            Key::Named(NamedKey::Escape) => self.page.close(now_ms),
            Key::Named(NamedKey::PageDown) => {
                let pos = self.page.scroll_offset() + SCROLL_STEP;
                self.page.scroll(pos);
            }
            Key::Named(NamedKey::PageUp) => {
                let pos = (self.page.scroll_offset() - SCROLL_STEP).max(0.0);
                self.page.scroll(pos);
            }
            Key::Named(NamedKey::Home) => self.page.scroll(0.0),
            Key::Character(text) if text.as_str().eq_ignore_ascii_case("q") => target.exit(),
            _ => {}
        }
    }

    fn act(&mut self, action: PageAction) {
        if action != PageAction::Construct {
            return;
        }
        info!("[vitrine] constructing viewer");
        let result = pollster::block_on(RenderSurface::new(
            self.window.clone(),
            self.config.render.clone(),
        ))
        .map(|surface| {
            let controller =
                ViewerController::new(self.config.clone(), self.container_size(), self.now_ms());
            let mut instance = ViewerInstance::new(controller, surface);
            instance.begin_load(self.request.clone());
            instance
        });
        if let Err(err) = self.page.finish_initialization(result) {
            error!("[vitrine] viewer initialization failed: {err}");
        }
    }
}
