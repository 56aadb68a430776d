//! Orbit-style camera control: drag to rotate around a target, wheel or
//! middle-drag to dolly, right-drag to pan. Input handlers only accumulate
//! deltas; `update` applies them (with optional damping) once per frame.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::cli::ControlsSettings;
use crate::scene::PerspectiveCamera;

const POLAR_EPSILON: f32 = 1e-6;
const MOVE_EPSILON: f32 = 1e-6;

/// Interaction boundaries reported to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Dolly,
    Pan,
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    mode: DragMode,
    last: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SavedState {
    target: Vec3,
    position: Vec3,
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vec3,
    drag: Option<Drag>,
    saved: SavedState,
}

impl OrbitControls {
    /// Attach to `camera`, orbiting `target`. The camera's current pose
    /// becomes the reset state.
    pub fn new(camera: &PerspectiveCamera, target: Vec3, settings: &ControlsSettings) -> Self {
        Self {
            target,
            enable_damping: settings.enable_damping,
            damping_factor: settings.damping_factor,
            rotate_speed: settings.rotate_speed,
            zoom_speed: settings.zoom_speed,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            drag: None,
            saved: SavedState {
                target,
                position: camera.position,
            },
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn pointer_down(&mut self, button: PointerButton, position: Vec2) -> Option<ControlEvent> {
        if self.drag.is_some() {
            return None;
        }
        let mode = match button {
            PointerButton::Primary => DragMode::Rotate,
            PointerButton::Middle => DragMode::Dolly,
            PointerButton::Secondary => DragMode::Pan,
        };
        self.drag = Some(Drag {
            mode,
            last: position,
        });
        Some(ControlEvent::Start)
    }

    /// Accumulate a drag step. `viewport` is the drawing surface size in the
    /// same units as `position`.
    pub fn pointer_move(&mut self, position: Vec2, viewport: Vec2, camera: &PerspectiveCamera) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let delta = position - drag.last;
        drag.last = position;
        let mode = drag.mode;
        let height = viewport.y.max(1.0);

        match mode {
            DragMode::Rotate => {
                self.delta_theta -= 2.0 * PI * delta.x / height * self.rotate_speed;
                self.delta_phi -= 2.0 * PI * delta.y / height * self.rotate_speed;
            }
            DragMode::Dolly => {
                if delta.y > 0.0 {
                    self.dolly_in(self.zoom_scale());
                } else if delta.y < 0.0 {
                    self.dolly_out(self.zoom_scale());
                }
            }
            DragMode::Pan => self.pan(delta * self.pan_speed, height, camera),
        }
    }

    pub fn pointer_up(&mut self) -> Option<ControlEvent> {
        self.drag.take().map(|_| ControlEvent::End)
    }

    /// A wheel notch is a complete interaction on its own.
    pub fn wheel(&mut self, delta_y: f32) -> [ControlEvent; 2] {
        if delta_y < 0.0 {
            self.dolly_out(self.zoom_scale());
        } else if delta_y > 0.0 {
            self.dolly_in(self.zoom_scale());
        }
        [ControlEvent::Start, ControlEvent::End]
    }

    /// Apply pending rotation, dolly and pan to `camera` and aim it at the
    /// target. Returns whether the camera moved noticeably.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let previous_position = camera.position;
        let previous_orientation = camera.orientation;

        let offset = camera.position - self.target;
        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.delta_theta * step;
        phi += self.delta_phi * step;
        phi = phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        self.target += self.pan_offset * step;

        let sin_phi_radius = phi.sin() * radius;
        let offset = Vec3::new(
            sin_phi_radius * theta.sin(),
            phi.cos() * radius,
            sin_phi_radius * theta.cos(),
        );
        camera.position = self.target + offset;
        camera.look_at(self.target);

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.delta_theta *= keep;
            self.delta_phi *= keep;
            self.pan_offset *= keep;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        camera.position.distance_squared(previous_position) > MOVE_EPSILON
            || 8.0 * (1.0 - camera.orientation.dot(previous_orientation)) > MOVE_EPSILON
    }

    /// Remember the current camera pose and target as the reset state.
    pub fn save_state(&mut self, camera: &PerspectiveCamera) {
        self.saved = SavedState {
            target: self.target,
            position: camera.position,
        };
    }

    /// Return camera and target to the saved state and drop any inertia.
    pub fn reset(&mut self, camera: &mut PerspectiveCamera) {
        self.target = self.saved.target;
        camera.position = self.saved.position;
        camera.look_at(self.target);
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.pan_offset = Vec3::ZERO;
        self.scale = 1.0;
        self.drag = None;
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    fn dolly_in(&mut self, factor: f32) {
        self.scale /= factor;
    }

    fn dolly_out(&mut self, factor: f32) {
        self.scale *= factor;
    }

    fn pan(&mut self, delta: Vec2, viewport_height: f32, camera: &PerspectiveCamera) {
        let distance = (camera.position - self.target).length();
        let half_fov = (camera.fov_degrees.to_radians() * 0.5).tan();
        let world_per_pixel = 2.0 * distance * half_fov / viewport_height;
        self.pan_offset += camera.right() * (-delta.x * world_per_pixel);
        self.pan_offset += camera.local_up() * (delta.y * world_per_pixel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::CAMERA_HOME;

    fn setup(enable_damping: bool) -> (OrbitControls, PerspectiveCamera) {
        let mut camera = PerspectiveCamera::new(1.5);
        camera.look_at(Vec3::ZERO);
        let settings = ControlsSettings {
            enable_damping,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        };
        (OrbitControls::new(&camera, Vec3::ZERO, &settings), camera)
    }

    #[test]
    fn drag_emits_start_then_end_once() {
        let (mut controls, _) = setup(true);
        assert_eq!(
            controls.pointer_down(PointerButton::Primary, Vec2::ZERO),
            Some(ControlEvent::Start)
        );
        assert_eq!(
            controls.pointer_down(PointerButton::Secondary, Vec2::ZERO),
            None
        );
        assert_eq!(controls.pointer_up(), Some(ControlEvent::End));
        assert_eq!(controls.pointer_up(), None);
    }

    #[test]
    fn idle_update_keeps_camera_in_place() {
        let (mut controls, mut camera) = setup(true);
        let moved = controls.update(&mut camera);
        assert!(!moved);
        assert!((camera.position - CAMERA_HOME).length() < 1e-4);
    }

    #[test]
    fn rotate_drag_orbits_at_constant_radius() {
        let (mut controls, mut camera) = setup(false);
        let radius = camera.position.length();
        controls.pointer_down(PointerButton::Primary, Vec2::new(100.0, 100.0));
        controls.pointer_move(Vec2::new(160.0, 100.0), Vec2::new(800.0, 600.0), &camera);
        controls.pointer_up();
        assert!(controls.update(&mut camera));
        assert!((camera.position.length() - radius).abs() < 1e-3);
        assert!((camera.position.y - CAMERA_HOME.y).abs() < 1e-3);
        assert!((camera.position - CAMERA_HOME).length() > 0.1);
    }

    #[test]
    fn damping_spreads_motion_over_frames() {
        let (mut controls, mut camera) = setup(true);
        controls.pointer_down(PointerButton::Primary, Vec2::ZERO);
        controls.pointer_move(Vec2::new(50.0, 0.0), Vec2::new(800.0, 600.0), &camera);
        controls.update(&mut camera);
        let after_one = camera.position;
        controls.update(&mut camera);
        assert!((camera.position - after_one).length() > 0.0);
    }

    #[test]
    fn wheel_up_moves_camera_closer() {
        let (mut controls, mut camera) = setup(false);
        let before = camera.position.length();
        assert_eq!(
            controls.wheel(-120.0),
            [ControlEvent::Start, ControlEvent::End]
        );
        controls.update(&mut camera);
        assert!(camera.position.length() < before);
    }

    #[test]
    fn reset_restores_saved_pose_and_is_idempotent() {
        let (mut controls, mut camera) = setup(true);
        controls.pointer_down(PointerButton::Secondary, Vec2::ZERO);
        controls.pointer_move(Vec2::new(30.0, 40.0), Vec2::new(800.0, 600.0), &camera);
        for _ in 0..10 {
            controls.update(&mut camera);
        }
        assert!(controls.target.length() > 0.0);

        controls.reset(&mut camera);
        let once = (camera.clone(), controls.target);
        controls.reset(&mut camera);
        assert_eq!((camera.clone(), controls.target), once);
        assert_eq!(camera.position, CAMERA_HOME);
        assert_eq!(controls.target, Vec3::ZERO);
        assert!(!controls.is_dragging());
    }
}
