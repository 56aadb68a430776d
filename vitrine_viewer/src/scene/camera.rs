use glam::{Mat4, Quat, Vec3};

use super::orientation::look_rotation;

pub const CAMERA_FOV_DEGREES: f32 = 60.0;
pub const CAMERA_NEAR: f32 = 1.0;
pub const CAMERA_FAR: f32 = 1000.0;
pub const CAMERA_HOME: Vec3 = Vec3::new(4.0, 6.0, 7.0);

/// Perspective camera looking down its local -Z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub orientation: Quat,
    pub up: Vec3,
}

impl PerspectiveCamera {
    pub fn new(aspect: f32) -> Self {
        Self {
            fov_degrees: CAMERA_FOV_DEGREES,
            aspect,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            position: CAMERA_HOME,
            orientation: Quat::IDENTITY,
            up: Vec3::Y,
        }
    }

    /// Turn the camera so that -Z points at `target`.
    pub fn look_at(&mut self, target: Vec3) {
        self.orientation = look_rotation(self.position - target, self.up);
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    pub fn local_up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_faces_negative_z_toward_target() {
        let mut camera = PerspectiveCamera::new(1.0);
        camera.look_at(Vec3::ZERO);
        let expected = (Vec3::ZERO - CAMERA_HOME).normalize();
        assert!((camera.forward() - expected).length() < 1e-5);
    }

    #[test]
    fn target_projects_to_screen_center() {
        let mut camera = PerspectiveCamera::new(16.0 / 9.0);
        camera.look_at(Vec3::ZERO);
        let clip = camera.view_projection() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }
}
