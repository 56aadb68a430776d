use glam::{Vec2, Vec3};

use super::{SceneContent, ViewerController};
use crate::controls::{ControlEvent, PointerButton};
use crate::scene::{CAMERA_HOME, ContainerSize};

const SCROLL_RANGE: f32 = 500.0;
const SCROLL_X_START: f32 = 15.0;
const SCROLL_X_END: f32 = -15.0;
const SCROLL_HEIGHT: f32 = 15.0;
const SCROLL_DEPTH: f32 = 20.0;

/// Camera position for page scroll offset `pos`: a straight sweep along X at
/// fixed height and depth, clamped to the first 500 units of scrolling.
pub fn scroll_camera_position(pos: f32) -> Vec3 {
    let amount = (pos / SCROLL_RANGE).clamp(0.0, 1.0);
    Vec3::new(
        SCROLL_X_START + amount * (SCROLL_X_END - SCROLL_X_START),
        SCROLL_HEIGHT,
        SCROLL_DEPTH,
    )
}

impl ViewerController {
    /// Interaction boundaries from the orbit controls. Start cancels the
    /// turntable; both restart the idle clock.
    pub fn handle_control_event(&mut self, event: ControlEvent, now_ms: f64) {
        if event == ControlEvent::Start {
            self.auto_rotate = false;
        }
        self.last_interaction_ms = now_ms;
    }

    pub fn pointer_down(&mut self, button: PointerButton, position: Vec2, now_ms: f64) {
        if let Some(event) = self.controls.pointer_down(button, position) {
            self.handle_control_event(event, now_ms);
        }
    }

    pub fn pointer_move(&mut self, position: Vec2) {
        let viewport = Vec2::new(self.size.width as f32, self.size.height as f32);
        self.controls.pointer_move(position, viewport, &self.camera);
    }

    pub fn pointer_up(&mut self, now_ms: f64) {
        if let Some(event) = self.controls.pointer_up() {
            self.handle_control_event(event, now_ms);
        }
    }

    pub fn wheel(&mut self, delta_y: f32, now_ms: f64) {
        for event in self.controls.wheel(delta_y) {
            self.handle_control_event(event, now_ms);
        }
    }

    /// Put camera and controls back in the canonical pose.
    pub fn reset(&mut self, now_ms: f64) {
        self.auto_rotate = false;
        self.last_interaction_ms = now_ms;
        self.controls.reset(&mut self.camera);
        self.controls.target = Vec3::ZERO;
        self.camera.position = CAMERA_HOME;
        self.controls.update(&mut self.camera);
    }

    /// Closing the viewer: canonical camera plus the parked model pose.
    pub fn close(&mut self, now_ms: f64) {
        if let SceneContent::Ready(ready) = &mut self.content {
            ready.model.park();
        }
        self.reset(now_ms);
    }

    pub fn resize(&mut self, size: ContainerSize) {
        self.size = size;
        self.camera.aspect = size.aspect();
    }

    /// Drive the camera from the page scroll offset. Returns false (and
    /// leaves the camera alone) unless scroll-driven camera is enabled.
    pub fn on_scroll(&mut self, pos: f32) -> bool {
        if !self.config.scroll_camera {
            return false;
        }
        self.camera.position = scroll_camera_position(pos);
        self.controls.update(&mut self.camera);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{controller, ready_controller};
    use super::*;
    use crate::cli::ViewerConfig;
    use crate::model::CLOSED_ROTATION;

    #[test]
    fn scroll_mapping_hits_endpoints() {
        assert_eq!(scroll_camera_position(-40.0), Vec3::new(15.0, 15.0, 20.0));
        assert_eq!(scroll_camera_position(0.0), Vec3::new(15.0, 15.0, 20.0));
        assert_eq!(scroll_camera_position(500.0), Vec3::new(-15.0, 15.0, 20.0));
        assert_eq!(scroll_camera_position(9000.0), Vec3::new(-15.0, 15.0, 20.0));
        assert_eq!(scroll_camera_position(250.0), Vec3::new(0.0, 15.0, 20.0));
    }

    #[test]
    fn scroll_mapping_is_monotonic() {
        let mut previous = f32::INFINITY;
        for step in 0..=120 {
            let x = scroll_camera_position(step as f32 * 5.0).x;
            assert!(x <= previous);
            previous = x;
        }
    }

    #[test]
    fn scroll_is_inert_unless_enabled() {
        let mut controller = controller(0.0);
        let before = controller.camera().position;
        assert!(!controller.on_scroll(300.0));
        assert_eq!(controller.camera().position, before);

        let config = ViewerConfig {
            scroll_camera: true,
            ..ViewerConfig::default()
        };
        let mut controller =
            super::super::ViewerController::new(config, ContainerSize::new(800, 600), 0.0);
        assert!(controller.on_scroll(500.0));
        let position = controller.camera().position;
        assert!((position.x + 15.0).abs() < 1e-3);
        assert!((position.y - 15.0).abs() < 1e-3);
    }

    #[test]
    fn resize_reapplies_aspect() {
        let mut controller = controller(0.0);
        for (width, height) in [(1920, 1080), (300, 600), (1024, 1024)] {
            controller.resize(ContainerSize::new(width, height));
            assert_eq!(controller.camera().aspect, width as f32 / height as f32);
            controller.resize(ContainerSize::new(width, height));
            assert_eq!(controller.camera().aspect, width as f32 / height as f32);
        }
    }

    #[test]
    fn reset_is_idempotent() {
        let mut controller = ready_controller(0.0);
        controller.pointer_down(PointerButton::Primary, Vec2::new(10.0, 10.0), 5.0);
        controller.pointer_move(Vec2::new(200.0, 90.0));
        controller.pointer_up(6.0);
        for frame in 0..30 {
            controller.advance_frame(10.0 + frame as f64 * 16.0);
        }

        controller.close(1000.0);
        let once = (
            controller.camera().clone(),
            controller.controls().target,
            controller.model().expect("model").transform,
        );
        controller.close(1000.0);
        let twice = (
            controller.camera().clone(),
            controller.controls().target,
            controller.model().expect("model").transform,
        );
        assert_eq!(once, twice);
        assert!((once.0.position - CAMERA_HOME).length() < 1e-4);
        assert_eq!(once.1, Vec3::ZERO);
        assert_eq!(once.2.rotation, CLOSED_ROTATION);
        assert!(!controller.auto_rotate());
    }

    #[test]
    fn wheel_counts_as_interaction() {
        let mut controller = ready_controller(0.0);
        controller.advance_frame(3500.0);
        assert!(controller.auto_rotate());
        controller.wheel(-1.0, 3600.0);
        assert!(!controller.auto_rotate());
        assert_eq!(controller.last_interaction_ms(), 3600.0);
    }
}
