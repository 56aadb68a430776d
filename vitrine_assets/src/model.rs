//! Model decoding: node hierarchy, skinned primitives, skins, materials.
//!
//! Mirrors what the viewer needs from a character file: enough to pose the
//! hierarchy from animation tracks and to skin vertices on the CPU before
//! upload. Geometry stays in each mesh's local space; the viewer applies the
//! model root transform on top.

use glam::{Mat4, Quat, Vec3};

use crate::LoadError;
use crate::animation::{AnimationClip, clips_from_document};

/// Rig prefixes stripped before matching node names across files.
const RIG_PREFIXES: [&str; 6] = [
    "mixamorig:",
    "armature|",
    "armature/",
    "armature:",
    "skeleton|",
    "skeleton/",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl NodeTransform {
    pub const IDENTITY: NodeTransform = NodeTransform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone)]
pub struct NodeAsset {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub transform: NodeTransform,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinnedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub joints: [u16; 4],
    pub weights: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct PrimitiveAsset {
    pub vertices: Vec<SkinnedVertex>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

/// A mesh as instanced by one node of the hierarchy.
#[derive(Debug, Clone)]
pub struct MeshAsset {
    pub name: String,
    pub node: usize,
    pub skin: Option<usize>,
    pub primitives: Vec<PrimitiveAsset>,
}

impl MeshAsset {
    /// Axis-aligned bounds over every primitive, in mesh-local space.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut positions = self
            .primitives
            .iter()
            .flat_map(|primitive| primitive.vertices.iter())
            .map(|vertex| Vec3::from(vertex.position));
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(|p| p.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(|p| p.indices.len() / 3).sum()
    }
}

#[derive(Debug, Clone)]
pub struct SkinAsset {
    pub name: String,
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
}

#[derive(Debug, Clone)]
pub struct MaterialAsset {
    pub name: String,
    pub base_color: [f32; 4],
    pub base_color_texture: Option<usize>,
    pub double_sided: bool,
}

/// RGBA8 pixels.
#[derive(Debug, Clone)]
pub struct TextureAsset {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureAsset {
    /// 1x1 opaque white, bound when a material has no texture.
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![0xFF; 4],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub nodes: Vec<NodeAsset>,
    pub roots: Vec<usize>,
    pub meshes: Vec<MeshAsset>,
    pub skins: Vec<SkinAsset>,
    pub materials: Vec<MaterialAsset>,
    pub textures: Vec<TextureAsset>,
    pub animations: Vec<AnimationClip>,
}

impl ModelAsset {
    /// Find a node by exact name, falling back to rig-normalized matching.
    pub fn node_index(&self, name: &str) -> Option<usize> {
        if let Some(index) = self.nodes.iter().position(|node| node.name == name) {
            return Some(index);
        }
        let wanted = normalize_node_name(name);
        self.nodes
            .iter()
            .position(|node| normalize_node_name(&node.name) == wanted)
    }

    /// Translate every mesh so its bounding box is centered on its own
    /// origin, making the mesh pivot its geometric center.
    pub fn recenter_meshes(&mut self) {
        for mesh in &mut self.meshes {
            let Some((min, max)) = mesh.bounds() else {
                continue;
            };
            let center = (min + max) * 0.5;
            if center.length_squared() <= f32::EPSILON {
                continue;
            }
            for vertex in mesh
                .primitives
                .iter_mut()
                .flat_map(|primitive| primitive.vertices.iter_mut())
            {
                vertex.position = (Vec3::from(vertex.position) - center).to_array();
            }
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(MeshAsset::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(MeshAsset::triangle_count).sum()
    }
}

/// Lowercase and strip rig prefixes and separators so `mixamorig:Left_Arm`
/// and `LeftArm` compare equal.
pub fn normalize_node_name(name: &str) -> String {
    let mut out = name.to_lowercase();
    for prefix in RIG_PREFIXES {
        out = out.replace(prefix, "");
    }
    out.replace([' ', '_', '-'], "")
}

pub(crate) fn node_label(node: &gltf::Node<'_>) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()))
}

/// Decode a binary glTF character model.
pub fn decode_model(location: &str, bytes: &[u8]) -> Result<ModelAsset, LoadError> {
    let (document, buffers, images) =
        gltf::import_slice(bytes).map_err(|err| LoadError::decode(location, err))?;

    let mut nodes: Vec<NodeAsset> = document
        .nodes()
        .map(|node| {
            let (translation, rotation, scale) = node.transform().decomposed();
            NodeAsset {
                name: node_label(&node),
                parent: None,
                children: node.children().map(|child| child.index()).collect(),
                transform: NodeTransform {
                    translation: Vec3::from(translation),
                    rotation: Quat::from_array(rotation).normalize(),
                    scale: Vec3::from(scale),
                },
            }
        })
        .collect();
    for parent in 0..nodes.len() {
        for child in nodes[parent].children.clone() {
            if let Some(node) = nodes.get_mut(child) {
                node.parent = Some(parent);
            }
        }
    }

    let roots = match document
        .default_scene()
        .or_else(|| document.scenes().next())
    {
        Some(scene) => scene.nodes().map(|node| node.index()).collect(),
        None => (0..nodes.len())
            .filter(|&index| nodes[index].parent.is_none())
            .collect(),
    };

    let mut meshes = Vec::new();
    for node in document.nodes() {
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let primitives: Vec<PrimitiveAsset> = mesh
            .primitives()
            .filter_map(|primitive| decode_primitive(&primitive, &buffers))
            .collect();
        if primitives.is_empty() {
            continue;
        }
        meshes.push(MeshAsset {
            name: mesh
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| node_label(&node)),
            node: node.index(),
            skin: node.skin().map(|skin| skin.index()),
            primitives,
        });
    }

    if meshes.is_empty() {
        return Err(LoadError::EmptyModel {
            location: location.to_string(),
        });
    }

    let skins = document
        .skins()
        .map(|skin| {
            let joints: Vec<usize> = skin.joints().map(|joint| joint.index()).collect();
            let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let mut inverse_bind: Vec<Mat4> = reader
                .read_inverse_bind_matrices()
                .map(|matrices| matrices.map(|m| Mat4::from_cols_array_2d(&m)).collect())
                .unwrap_or_default();
            inverse_bind.resize(joints.len(), Mat4::IDENTITY);
            SkinAsset {
                name: skin
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("skin{}", skin.index())),
                joints,
                inverse_bind,
            }
        })
        .collect();

    let textures: Vec<TextureAsset> = images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            rgba_texture(image).unwrap_or_else(|| {
                log::warn!(
                    "[vitrine] {location}: image {index} uses unsupported format {:?}; substituting white",
                    image.format
                );
                TextureAsset::white()
            })
        })
        .collect();

    let materials = document
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            MaterialAsset {
                name: material.name().unwrap_or("material").to_string(),
                base_color: pbr.base_color_factor(),
                base_color_texture: pbr
                    .base_color_texture()
                    .map(|info| info.texture().source().index())
                    .filter(|&index| index < textures.len()),
                double_sided: material.double_sided(),
            }
        })
        .collect();

    let animations = clips_from_document(&document, &buffers);

    Ok(ModelAsset {
        nodes,
        roots,
        meshes,
        skins,
        materials,
        textures,
        animations,
    })
}

fn decode_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<PrimitiveAsset> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|it| it.collect())
        .unwrap_or_default();
    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|it| it.into_f32().collect())
        .unwrap_or_default();
    let joints: Vec<[u16; 4]> = reader
        .read_joints(0)
        .map(|it| it.into_u16().collect())
        .unwrap_or_default();
    let weights: Vec<[f32; 4]> = reader
        .read_weights(0)
        .map(|it| it.into_f32().collect())
        .unwrap_or_default();

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(index, position)| SkinnedVertex {
            position: *position,
            normal: normals.get(index).copied().unwrap_or([0.0, 1.0, 0.0]),
            uv: uvs.get(index).copied().unwrap_or([0.0, 0.0]),
            joints: joints.get(index).copied().unwrap_or([0; 4]),
            weights: weights.get(index).copied().unwrap_or([1.0, 0.0, 0.0, 0.0]),
        })
        .collect::<Vec<_>>();

    let vertex_count = vertices.len() as u32;
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertex_count).collect(),
    };

    Some(PrimitiveAsset {
        vertices,
        indices: whole_triangles(&indices, vertex_count),
        material: primitive.material().index(),
    })
}

/// Keep the triangles whose three corners all name a vertex. A trailing
/// partial triangle is dropped.
fn whole_triangles(indices: &[u32], vertex_count: u32) -> Vec<u32> {
    indices
        .chunks_exact(3)
        .filter(|corners| corners.iter().all(|&index| index < vertex_count))
        .flatten()
        .copied()
        .collect()
}

fn rgba_texture(image: &gltf::image::Data) -> Option<TextureAsset> {
    use gltf::image::Format;
    let pixels = match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 0xFF])
            .collect(),
        Format::R8G8 => image
            .pixels
            .chunks_exact(2)
            .flat_map(|c| [c[0], c[0], c[0], c[1]])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&r| [r, r, r, 0xFF]).collect(),
        _ => return None,
    };
    Some(TextureAsset {
        width: image.width,
        height: image.height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn normalizes_rig_prefixes_and_separators() {
        assert_eq!(normalize_node_name("mixamorig:Left_Arm"), "leftarm");
        assert_eq!(normalize_node_name("Armature|Hips"), "hips");
        assert_eq!(normalize_node_name("Spine-01 "), "spine01");
    }

    #[test]
    fn decodes_skinned_fixture() {
        let bytes = fixtures::skinned_triangle_glb();
        let model = decode_model("skinned.glb", &bytes).expect("decode model");

        assert_eq!(model.nodes.len(), 2);
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.skins.len(), 1);
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.triangle_count(), 1);

        let mesh = &model.meshes[0];
        assert_eq!(model.nodes[mesh.node].name, fixtures::MESH_NODE_NAME);
        assert_eq!(mesh.skin, Some(0));
        let joint = model.skins[0].joints[0];
        assert_eq!(model.nodes[joint].name, fixtures::JOINT_NODE_NAME);
        assert_eq!(model.roots.len(), 2);
        assert!(model.animations.is_empty());
    }

    #[test]
    fn node_lookup_falls_back_to_normalized_names() {
        let bytes = fixtures::skinned_triangle_glb();
        let model = decode_model("skinned.glb", &bytes).expect("decode model");
        let exact = model.node_index(fixtures::JOINT_NODE_NAME).expect("exact");
        let loose = model
            .node_index(&format!("mixamorig:{}", fixtures::JOINT_NODE_NAME.to_uppercase()))
            .expect("normalized");
        assert_eq!(exact, loose);
        assert_eq!(model.node_index("missing"), None);
    }

    #[test]
    fn recentering_moves_bounds_center_to_origin() {
        let bytes = fixtures::skinned_triangle_glb();
        let mut model = decode_model("skinned.glb", &bytes).expect("decode model");
        let (min, max) = model.meshes[0].bounds().expect("bounds");
        assert!(((min + max) * 0.5).length() > 0.1, "fixture starts off-center");

        model.recenter_meshes();
        let (min, max) = model.meshes[0].bounds().expect("bounds");
        assert!(((min + max) * 0.5).length() < 1e-5);
    }

    #[test]
    fn rejects_documents_without_meshes() {
        let bytes = fixtures::turntable_animation_glb(1.0);
        let err = decode_model("anim_only.glb", &bytes).expect_err("no meshes");
        assert!(matches!(err, LoadError::EmptyModel { .. }));
    }

    #[test]
    fn out_of_range_index_drops_only_its_triangle() {
        let indices = [0, 1, 2, 0, 9, 1, 0, 2, 1, 2];
        assert_eq!(whole_triangles(&indices, 3), [0, 1, 2, 0, 2, 1]);
    }

    #[test]
    fn embedded_clips_are_kept() {
        let bytes = fixtures::skinned_triangle_with_clip_glb(1.5);
        let model = decode_model("combined.glb", &bytes).expect("decode model");
        assert_eq!(model.animations.len(), 1);
        assert!((model.animations[0].duration - 1.5).abs() < 1e-6);
    }
}
