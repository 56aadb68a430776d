//! The loaded character as the viewer sees it: the decoded asset, a root
//! transform the frame loop and reset logic mutate, and the current node
//! pose the animation mixers write into.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat3, Mat4, Vec3};
use vitrine_assets::{MeshAsset, ModelAsset, NodeTransform, PrimitiveAsset};

use crate::scene::{EulerXyz, Transform};
use crate::viewer::MeshVertex;

/// Yaw applied after the model has been turned toward the camera.
pub const FACING_YAW: f32 = FRAC_PI_2;
pub const TILT_PITCH_DEGREES: f32 = -5.0;
pub const YAW_TRIM_DEGREES: f32 = 2.0;
/// Root rotation restored when the viewer is closed.
pub const CLOSED_ROTATION: EulerXyz = EulerXyz::new(0.0, 2.0, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowFlags {
    pub cast: bool,
    pub receive: bool,
}

pub struct ModelHandle {
    asset: ModelAsset,
    pub transform: Transform,
    pose: Vec<NodeTransform>,
    shadows: Vec<ShadowFlags>,
}

impl ModelHandle {
    pub fn new(asset: ModelAsset) -> Self {
        let pose = asset.nodes.iter().map(|node| node.transform).collect();
        let shadows = vec![
            ShadowFlags {
                cast: false,
                receive: false,
            };
            asset.meshes.len()
        ];
        Self {
            asset,
            transform: Transform::IDENTITY,
            pose,
            shadows,
        }
    }

    /// Normalize a freshly decoded asset the way every loaded character is
    /// presented: scaled, shadow-casting, recentered, turned toward the
    /// camera and then parked at the origin with a fixed yaw and tilt.
    ///
    /// `spawn_offset` only influences the facing direction; the final
    /// position is always the origin.
    pub fn prepare(
        mut asset: ModelAsset,
        scale: f32,
        spawn_offset: Vec3,
        camera_position: Vec3,
        receive_shadows: bool,
    ) -> Self {
        asset.recenter_meshes();
        let mut model = Self::new(asset);
        model.transform.scale = Vec3::splat(scale);
        model.set_shadows(ShadowFlags {
            cast: true,
            receive: receive_shadows,
        });

        model.transform.position = spawn_offset;
        model.transform.look_at(camera_position, Vec3::Y);
        model.transform.position = Vec3::ZERO;
        model.transform.rotation.y += FACING_YAW;
        model.transform.rotation.x = TILT_PITCH_DEGREES.to_radians();
        model.transform.rotation.y += YAW_TRIM_DEGREES.to_radians();
        model
    }

    pub fn asset(&self) -> &ModelAsset {
        &self.asset
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn yaw(&self) -> f32 {
        self.transform.rotation.y
    }

    /// Put the root back to the closed-viewer pose.
    pub fn park(&mut self) {
        self.transform.position = Vec3::ZERO;
        self.transform.rotation = CLOSED_ROTATION;
    }

    pub fn set_shadows(&mut self, flags: ShadowFlags) {
        self.shadows.iter_mut().for_each(|slot| *slot = flags);
    }

    pub fn shadow_flags(&self, mesh: usize) -> ShadowFlags {
        self.shadows.get(mesh).copied().unwrap_or(ShadowFlags {
            cast: false,
            receive: false,
        })
    }

    pub fn pose(&self) -> &[NodeTransform] {
        &self.pose
    }

    pub fn node_pose_mut(&mut self, node: usize) -> Option<&mut NodeTransform> {
        self.pose.get_mut(node)
    }

    /// Global (model-space) matrix of every node under the current pose.
    pub fn node_globals(&self) -> Vec<Mat4> {
        let mut globals: Vec<Option<Mat4>> = vec![None; self.asset.nodes.len()];
        for index in 0..self.asset.nodes.len() {
            self.resolve_global(index, &mut globals, 0);
        }
        globals
            .into_iter()
            .map(|global| global.unwrap_or(Mat4::IDENTITY))
            .collect()
    }

    fn resolve_global(&self, index: usize, cache: &mut [Option<Mat4>], depth: usize) -> Mat4 {
        if let Some(global) = cache[index] {
            return global;
        }
        let local = self.pose[index].matrix();
        // Cycles are malformed input; cut them off instead of recursing forever.
        let global = match self.asset.nodes[index].parent {
            Some(parent) if parent < cache.len() && depth < cache.len() => {
                self.resolve_global(parent, cache, depth + 1) * local
            }
            _ => local,
        };
        cache[index] = Some(global);
        global
    }

    /// Write model-space vertices for one primitive into `out`.
    pub fn pose_primitive(
        &self,
        mesh: &MeshAsset,
        primitive: &PrimitiveAsset,
        globals: &[Mat4],
        out: &mut Vec<MeshVertex>,
    ) {
        out.clear();
        out.reserve(primitive.vertices.len());

        let palette = mesh
            .skin
            .and_then(|skin| self.asset.skins.get(skin))
            .map(|skin| {
                skin.joints
                    .iter()
                    .enumerate()
                    .map(|(slot, joint)| {
                        let global = globals.get(*joint).copied().unwrap_or(Mat4::IDENTITY);
                        let inverse_bind = skin
                            .inverse_bind
                            .get(slot)
                            .copied()
                            .unwrap_or(Mat4::IDENTITY);
                        global * inverse_bind
                    })
                    .collect::<Vec<_>>()
            });

        match palette {
            Some(palette) if !palette.is_empty() => {
                for vertex in &primitive.vertices {
                    let mut skin = Mat4::ZERO;
                    let mut total = 0.0;
                    for (joint, weight) in vertex.joints.iter().zip(vertex.weights) {
                        if weight <= 0.0 {
                            continue;
                        }
                        if let Some(matrix) = palette.get(*joint as usize) {
                            skin += *matrix * weight;
                            total += weight;
                        }
                    }
                    let skin = if total > 0.0 {
                        skin * (1.0 / total)
                    } else {
                        Mat4::IDENTITY
                    };
                    out.push(transform_vertex(&skin, vertex));
                }
            }
            _ => {
                let node = globals.get(mesh.node).copied().unwrap_or(Mat4::IDENTITY);
                out.extend(
                    primitive
                        .vertices
                        .iter()
                        .map(|vertex| transform_vertex(&node, vertex)),
                );
            }
        }
    }
}

fn transform_vertex(matrix: &Mat4, vertex: &vitrine_assets::SkinnedVertex) -> MeshVertex {
    let position = matrix.transform_point3(Vec3::from(vertex.position));
    let normal_matrix = Mat3::from_mat4(*matrix).inverse().transpose();
    let normal = (normal_matrix * Vec3::from(vertex.normal)).normalize_or_zero();
    MeshVertex {
        position: position.to_array(),
        normal: normal.to_array(),
        uv: vertex.uv,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use vitrine_assets::{decode_model, fixtures};

    fn skinned_asset() -> ModelAsset {
        decode_model("fixture.glb", &fixtures::skinned_triangle_glb()).expect("fixture decodes")
    }

    #[test]
    fn prepare_lands_at_origin_for_any_offset() {
        let camera = Vec3::new(4.0, 6.0, 7.0);
        for offset in [
            Vec3::ZERO,
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(-50.0, 3.0, 120.0),
        ] {
            let model = ModelHandle::prepare(skinned_asset(), 0.1, offset, camera, true);
            assert_eq!(model.position(), Vec3::ZERO);
            assert_eq!(model.transform.scale, Vec3::splat(0.1));
            assert!((model.transform.rotation.x - (-5f32).to_radians()).abs() < 1e-6);
        }
    }

    #[test]
    fn prepare_marks_every_mesh_as_shadow_caster() {
        let model = ModelHandle::prepare(skinned_asset(), 0.1, Vec3::ZERO, Vec3::Z, false);
        for mesh in 0..model.asset().meshes.len() {
            assert_eq!(
                model.shadow_flags(mesh),
                ShadowFlags {
                    cast: true,
                    receive: false
                }
            );
        }
    }

    #[test]
    fn prepare_recenters_geometry_on_mesh_origin() {
        let model = ModelHandle::prepare(skinned_asset(), 0.1, Vec3::ZERO, Vec3::Z, true);
        let (min, max) = model.asset().meshes[0].bounds().expect("bounds");
        assert!(((min + max) * 0.5).length() < 1e-6);
    }

    #[test]
    fn skinned_vertices_follow_joint_pose() {
        let mut model = ModelHandle::new(skinned_asset());
        let joint = model
            .asset()
            .node_index(fixtures::JOINT_NODE_NAME)
            .expect("joint node");
        model.node_pose_mut(joint).expect("pose slot").rotation =
            Quat::from_rotation_y(FRAC_PI_2);

        let globals = model.node_globals();
        let mesh = &model.asset().meshes[0];
        let mut vertices = Vec::new();
        model.pose_primitive(mesh, &mesh.primitives[0], &globals, &mut vertices);

        // (1,0,0) turns onto -Z under a quarter turn about +Y.
        let first = Vec3::from(vertices[0].position);
        assert!((first - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
        let normal = Vec3::from(vertices[0].normal);
        assert!((normal - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn rigid_vertices_use_node_transform() {
        let mut model = ModelHandle::new(
            decode_model("static.glb", &fixtures::static_triangle_glb()).expect("decodes"),
        );
        model.node_pose_mut(0).expect("pose slot").translation = Vec3::new(0.0, 5.0, 0.0);
        let globals = model.node_globals();
        let mesh = &model.asset().meshes[0];
        let mut vertices = Vec::new();
        model.pose_primitive(mesh, &mesh.primitives[0], &globals, &mut vertices);
        assert_eq!(vertices[0].position, [1.0, 5.0, 0.0]);
    }

    #[test]
    fn park_restores_closed_pose() {
        let mut model = ModelHandle::prepare(skinned_asset(), 0.1, Vec3::ZERO, Vec3::Z, true);
        model.transform.rotation.y += 1.0;
        model.park();
        assert_eq!(model.transform.rotation, CLOSED_ROTATION);
        assert_eq!(model.position(), Vec3::ZERO);
    }
}
