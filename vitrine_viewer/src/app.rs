//! One constructed viewer: the controller plus the surface it draws into.
//! Both hosts (winit shell and browser page) drive this through
//! `ViewerPage`.

use glam::Vec2;
use log::{debug, error, warn};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use crate::controller::{FrameReport, LoadProgress, ViewerController};
use crate::controls::PointerButton;
use crate::loader::LoadRequest;
use crate::page::PageViewer;
use crate::scene::ContainerSize;
use crate::viewer::RenderSurface;

/// Pixels one wheel "line" is worth, matching a browser's `deltaY`.
const WHEEL_LINE_PIXELS: f32 = 100.0;

pub struct ViewerInstance {
    controller: ViewerController,
    surface: RenderSurface,
    cursor: Vec2,
}

impl ViewerInstance {
    pub fn new(controller: ViewerController, surface: RenderSurface) -> Self {
        Self {
            controller,
            surface,
            cursor: Vec2::ZERO,
        }
    }

    pub fn controller(&self) -> &ViewerController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ViewerController {
        &mut self.controller
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn begin_load(&mut self, request: LoadRequest) -> bool {
        self.controller.begin_load(request)
    }

    /// Poll the loader and advance the frame loop. Load failures are logged
    /// and the loop keeps going with whatever is in the scene.
    pub fn advance(&mut self, now_ms: f64) -> FrameReport {
        match self.controller.poll_loader() {
            Ok(LoadProgress::ModelAttached) => debug!("[vitrine] model attached"),
            Ok(LoadProgress::AnimationAttached) => debug!("[vitrine] animation attached"),
            Ok(_) => {}
            Err(err) => error!("[vitrine] failed to load model: {err}"),
        }
        self.controller.advance_frame(now_ms)
    }

    /// Draw the current state. Only meaningful while the container is shown.
    pub fn draw(&mut self) -> Result<(), SurfaceError> {
        self.surface.render(&self.controller)
    }

    /// Feed pointer input to the orbit controls. Returns false for events
    /// that are not pointer input.
    pub fn pointer_input(&mut self, event: &WindowEvent, now_ms: f64) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                self.controller.pointer_move(self.cursor);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = pointer_button(*button) else {
                    return true;
                };
                match state {
                    ElementState::Pressed => {
                        self.controller.pointer_down(button, self.cursor, now_ms)
                    }
                    ElementState::Released => self.controller.pointer_up(now_ms),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * WHEEL_LINE_PIXELS,
                    MouseScrollDelta::PixelDelta(position) => -position.y as f32,
                };
                self.controller.wheel(delta_y, now_ms);
            }
            _ => return false,
        }
        true
    }

    pub fn dispose(self) {
        self.surface.dispose();
    }
}

impl PageViewer for ViewerInstance {
    fn open(&mut self) {
        self.surface.window().request_redraw();
    }

    fn close(&mut self, now_ms: f64) {
        self.controller.close(now_ms);
        self.surface.release_model();
        if let Err(err) = self.surface.render_cleared() {
            warn!("[vitrine] clearing closed viewer: {err:?}");
        }
    }

    fn scroll(&mut self, pos: f32) {
        self.controller.on_scroll(pos);
    }

    fn resize(&mut self, size: ContainerSize) {
        self.controller.resize(size);
        self.surface
            .resize(PhysicalSize::new(size.width, size.height));
    }

    fn tick(&mut self, now_ms: f64) {
        self.advance(now_ms);
    }
}

pub fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_buttons_map_to_orbit_roles() {
        assert_eq!(pointer_button(MouseButton::Left), Some(PointerButton::Primary));
        assert_eq!(pointer_button(MouseButton::Right), Some(PointerButton::Secondary));
        assert_eq!(pointer_button(MouseButton::Middle), Some(PointerButton::Middle));
        assert_eq!(pointer_button(MouseButton::Back), None);
    }
}
