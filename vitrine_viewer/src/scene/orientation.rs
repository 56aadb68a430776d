//! Euler-angle and look-at helpers for the viewer's Y-up, right-handed basis.
//! Rotations are stored as XYZ-order Euler angles (intrinsic X, then Y, then
//! Z) so that per-axis nudges such as "add 2 degrees of yaw" compose the same
//! way they do in common web scene graphs. Objects face +Z; cameras look down
//! -Z.

use glam::{Mat3, Mat4, Quat, Vec3};

/// Euler angles in radians, applied in XYZ order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerXyz {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl EulerXyz {
    pub const ZERO: EulerXyz = EulerXyz {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_quat(self) -> Quat {
        Quat::from_rotation_x(self.x)
            * Quat::from_rotation_y(self.y)
            * Quat::from_rotation_z(self.z)
    }

    /// Decompose a rotation into XYZ Euler angles. Near gimbal lock the Z
    /// angle is folded into X.
    pub fn from_quat(rotation: Quat) -> Self {
        let m = Mat3::from_quat(rotation.normalize());
        let m11 = m.x_axis.x;
        let m12 = m.y_axis.x;
        let m13 = m.z_axis.x;
        let m22 = m.y_axis.y;
        let m23 = m.z_axis.y;
        let m32 = m.y_axis.z;
        let m33 = m.z_axis.z;

        let y = m13.clamp(-1.0, 1.0).asin();
        if m13.abs() < 0.999_999_9 {
            Self {
                x: (-m23).atan2(m33),
                y,
                z: (-m12).atan2(m11),
            }
        } else {
            Self {
                x: m32.atan2(m22),
                y,
                z: 0.0,
            }
        }
    }
}

/// Position, rotation and uniform-or-not scale of an object in the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: EulerXyz,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: EulerXyz::ZERO,
        scale: Vec3::ONE,
    };

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation.to_quat(), self.position)
    }

    /// Rotate the object so its +Z axis points at `target`.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.rotation = EulerXyz::from_quat(look_rotation(target - self.position, up));
    }
}

/// Rotation whose +Z axis points along `forward`, keeping `up` as close to +Y
/// as possible. Degenerate inputs (zero forward, forward parallel to up) are
/// nudged instead of producing NaNs.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let mut z = forward;
    if z.length_squared() == 0.0 {
        z = Vec3::Z;
    }
    z = z.normalize();

    let mut x = up.cross(z);
    if x.length_squared() == 0.0 {
        if up.z.abs() == 1.0 {
            z.x += 0.0001;
        } else {
            z.z += 0.0001;
        }
        z = z.normalize();
        x = up.cross(z);
    }
    x = x.normalize();
    let y = z.cross(x);

    Quat::from_mat3(&Mat3::from_cols(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    fn approx_vec(a: Vec3, b: Vec3) {
        assert!((a - b).length() <= EPSILON, "{a:?} != {b:?}");
    }

    #[test]
    fn euler_round_trips_through_quaternion() {
        let euler = EulerXyz::new(-0.087, 1.2, 0.2);
        let back = EulerXyz::from_quat(euler.to_quat());
        assert!((back.x - euler.x).abs() < EPSILON);
        assert!((back.y - euler.y).abs() < EPSILON);
        assert!((back.z - euler.z).abs() < EPSILON);
    }

    #[test]
    fn look_at_points_positive_z_at_target() {
        let mut transform = Transform {
            position: Vec3::new(0.0, 10.0, 0.0),
            ..Transform::IDENTITY
        };
        let target = Vec3::new(4.0, 6.0, 7.0);
        transform.look_at(target, Vec3::Y);
        let facing = transform.rotation.to_quat() * Vec3::Z;
        approx_vec(facing, (target - transform.position).normalize());
    }

    #[test]
    fn yaw_about_y_turns_forward_toward_positive_x() {
        let rotation = EulerXyz::new(0.0, FRAC_PI_2, 0.0).to_quat();
        approx_vec(rotation * Vec3::Z, Vec3::X);
    }

    #[test]
    fn look_rotation_survives_parallel_up() {
        let rotation = look_rotation(Vec3::Y, Vec3::Y);
        assert!(rotation.is_finite());
        assert!((rotation * Vec3::Z).y > 0.99);
    }
}
