//! Scene Builder: the camera plus the key and fill lights every viewer starts
//! with. Construction is deterministic; only the container size feeds in.

mod camera;
mod lights;
mod orientation;

use glam::Vec3;

pub use camera::{CAMERA_FAR, CAMERA_FOV_DEGREES, CAMERA_HOME, CAMERA_NEAR, PerspectiveCamera};
pub use lights::{AmbientLight, DirectionalLight, ShadowSettings};
pub use orientation::{EulerXyz, Transform, look_rotation};

pub const KEY_LIGHT_POSITION: Vec3 = Vec3::new(20.0, 100.0, 10.0);

/// Pixel size of the element the drawing surface fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSize {
    pub width: u32,
    pub height: u32,
}

impl ContainerSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Device pixels for a size measured in CSS (logical) pixels.
    pub fn from_logical(width: f64, height: f64, scale_factor: f64) -> Self {
        let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        Self::new(
            (width.max(0.0) * scale).round() as u32,
            (height.max(0.0) * scale).round() as u32,
        )
    }

    pub fn is_collapsed(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height. A collapsed container reports 1 so projections
    /// stay finite.
    pub fn aspect(&self) -> f32 {
        if self.is_collapsed() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub key_light: DirectionalLight,
    pub fill_light: AmbientLight,
}

impl Scene {
    pub fn new(shadow_map_size: u32) -> Self {
        Self {
            key_light: DirectionalLight {
                color: Vec3::ONE,
                intensity: 1.0,
                position: KEY_LIGHT_POSITION,
                target: Vec3::ZERO,
                cast_shadow: true,
                shadow: ShadowSettings {
                    map_size: shadow_map_size,
                    ..ShadowSettings::default()
                },
            },
            fill_light: AmbientLight {
                color: Vec3::ONE,
                intensity: 1.0,
            },
        }
    }
}

/// Build the lights and the camera for a container of `size`.
pub fn build_scene(size: ContainerSize, shadow_map_size: u32) -> (Scene, PerspectiveCamera) {
    let scene = Scene::new(shadow_map_size);
    let camera = PerspectiveCamera::new(size.aspect());
    (scene, camera)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_matches_container_aspect() {
        for (width, height) in [(1280, 720), (300, 900), (1, 1), (4096, 17)] {
            let (_, camera) = build_scene(ContainerSize::new(width, height), 2048);
            assert_eq!(camera.aspect, width as f32 / height as f32);
        }
    }

    #[test]
    fn default_scene_uses_canonical_parameters() {
        let (scene, camera) = build_scene(ContainerSize::new(800, 600), 2048);
        assert_eq!(camera.fov_degrees, 60.0);
        assert_eq!(camera.near, 1.0);
        assert_eq!(camera.far, 1000.0);
        assert_eq!(camera.position, Vec3::new(4.0, 6.0, 7.0));

        let shadow = &scene.key_light.shadow;
        assert!(scene.key_light.cast_shadow);
        assert_eq!(shadow.map_size, 2048);
        assert_eq!((shadow.near, shadow.far), (0.5, 500.0));
        assert_eq!(shadow.bias, -0.001);
        assert_eq!(scene.fill_light.intensity, 1.0);
    }

    #[test]
    fn collapsed_container_keeps_finite_aspect() {
        assert_eq!(ContainerSize::new(640, 0).aspect(), 1.0);
    }

    #[test]
    fn logical_sizes_scale_to_device_pixels() {
        assert_eq!(
            ContainerSize::from_logical(800.0, 600.0, 2.0),
            ContainerSize::new(1600, 1200)
        );
        assert_eq!(
            ContainerSize::from_logical(333.5, 200.0, 1.5),
            ContainerSize::new(500, 300)
        );
        assert_eq!(
            ContainerSize::from_logical(640.0, 480.0, 0.0),
            ContainerSize::new(640, 480)
        );
        assert!(ContainerSize::from_logical(0.0, 480.0, 2.0).is_collapsed());
    }
}
