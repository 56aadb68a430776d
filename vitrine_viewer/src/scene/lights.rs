use glam::{Mat4, Vec3};

/// Orthographic shadow camera attached to a directional light.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub bias: f32,
    pub near: f32,
    pub far: f32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map_size: 2048,
            bias: -0.001,
            near: 0.5,
            far: 500.0,
            left: -100.0,
            right: 100.0,
            top: 100.0,
            bottom: -100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub cast_shadow: bool,
    pub shadow: ShadowSettings,
}

impl DirectionalLight {
    /// Unit vector from the lit surface toward the light.
    pub fn direction(&self) -> Vec3 {
        (self.position - self.target).normalize_or_zero()
    }

    pub fn shadow_view_projection(&self) -> Mat4 {
        let shadow = &self.shadow;
        let projection = Mat4::orthographic_rh(
            shadow.left,
            shadow.right,
            shadow.bottom,
            shadow.top,
            shadow.near,
            shadow.far,
        );
        let up = if self.direction().cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        projection * Mat4::look_at_rh(self.position, self.target, up)
    }
}

/// Non-directional fill light; never casts shadows.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

impl AmbientLight {
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_light() -> DirectionalLight {
        DirectionalLight {
            color: Vec3::ONE,
            intensity: 1.0,
            position: Vec3::new(20.0, 100.0, 10.0),
            target: Vec3::ZERO,
            cast_shadow: true,
            shadow: ShadowSettings::default(),
        }
    }

    #[test]
    fn origin_lands_inside_shadow_frustum() {
        let clip = key_light().shadow_view_projection() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn direction_points_toward_light() {
        let direction = key_light().direction();
        assert!(direction.y > 0.9);
        assert!((direction.length() - 1.0).abs() < 1e-5);
    }
}
