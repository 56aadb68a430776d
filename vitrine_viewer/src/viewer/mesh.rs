use bytemuck::{Pod, Zeroable, cast_slice};
use glam::{Mat3, Mat4};
use vitrine_assets::TextureAsset;
use wgpu::util::DeviceExt;

use crate::model::ModelHandle;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub light_direction: [f32; 4],
    pub light_radiance: [f32; 4],
    pub ambient_radiance: [f32; 4],
    pub params: [f32; 4],
    pub shadow: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct ModelUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
}

impl ModelUniforms {
    pub fn from_matrix(model: Mat4) -> Self {
        let normal = Mat3::from_mat4(model).inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: Mat4::from_mat3(normal).to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct MaterialUniforms {
    pub base_color: [f32; 4],
}

/// Layouts and samplers every model upload binds against.
pub(super) struct MaterialLayout {
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub sampler: wgpu::Sampler,
}

pub(super) struct PrimitiveBuffers {
    pub mesh: usize,
    pub primitive: usize,
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub index_count: u32,
    pub material: usize,
    pub cast_shadow: bool,
}

/// GPU copy of one loaded model. Geometry is re-posed on the CPU each frame
/// and streamed into the vertex buffers.
pub(super) struct ModelResources {
    pub primitives: Vec<PrimitiveBuffers>,
    pub materials: Vec<wgpu::BindGroup>,
    textures: Vec<wgpu::Texture>,
    scratch: Vec<MeshVertex>,
}

impl ModelResources {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        model: &ModelHandle,
        layout: &MaterialLayout,
    ) -> Self {
        let asset = model.asset();
        let mut textures: Vec<wgpu::Texture> = asset
            .textures
            .iter()
            .enumerate()
            .map(|(index, texture)| upload_texture(device, queue, texture, index))
            .collect();
        let fallback_index = textures.len();
        textures.push(upload_texture(
            device,
            queue,
            &TextureAsset::white(),
            fallback_index,
        ));

        let mut materials: Vec<wgpu::BindGroup> = asset
            .materials
            .iter()
            .map(|material| {
                let texture = material
                    .base_color_texture
                    .filter(|index| *index < fallback_index)
                    .unwrap_or(fallback_index);
                material_bind_group(
                    device,
                    layout,
                    material.base_color,
                    &textures[texture],
                    &material.name,
                )
            })
            .collect();
        let default_material = materials.len();
        materials.push(material_bind_group(
            device,
            layout,
            [1.0, 1.0, 1.0, 1.0],
            &textures[fallback_index],
            "default",
        ));

        let globals = model.node_globals();
        let mut scratch = Vec::new();
        let mut primitives = Vec::new();
        for (mesh_index, mesh) in asset.meshes.iter().enumerate() {
            for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
                if primitive.indices.is_empty() {
                    continue;
                }
                model.pose_primitive(mesh, primitive, &globals, &mut scratch);
                let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("vitrine-model-vertices"),
                    contents: cast_slice(&scratch),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                });
                let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("vitrine-model-indices"),
                    contents: cast_slice(&primitive.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                primitives.push(PrimitiveBuffers {
                    mesh: mesh_index,
                    primitive: primitive_index,
                    vertex,
                    index,
                    index_count: primitive.indices.len() as u32,
                    material: primitive
                        .material
                        .filter(|index| *index < default_material)
                        .unwrap_or(default_material),
                    cast_shadow: model.shadow_flags(mesh_index).cast,
                });
            }
        }

        Self {
            primitives,
            materials,
            textures,
            scratch,
        }
    }

    /// Stream the current pose into the vertex buffers.
    pub fn write_pose(&mut self, queue: &wgpu::Queue, model: &ModelHandle) {
        let asset = model.asset();
        let globals = model.node_globals();
        for buffers in &mut self.primitives {
            let mesh = &asset.meshes[buffers.mesh];
            let primitive = &mesh.primitives[buffers.primitive];
            model.pose_primitive(mesh, primitive, &globals, &mut self.scratch);
            queue.write_buffer(&buffers.vertex, 0, cast_slice(&self.scratch));
            buffers.cast_shadow = model.shadow_flags(buffers.mesh).cast;
        }
    }

    pub fn destroy(self) {
        for primitive in &self.primitives {
            primitive.vertex.destroy();
            primitive.index.destroy();
        }
        for texture in &self.textures {
            texture.destroy();
        }
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &TextureAsset,
    index: usize,
) -> wgpu::Texture {
    let label = format!("vitrine-texture-{index}");
    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: texture.width.max(1),
                height: texture.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &texture.pixels,
    )
}

fn material_bind_group(
    device: &wgpu::Device,
    layout: &MaterialLayout,
    base_color: [f32; 4],
    texture: &wgpu::Texture,
    name: &str,
) -> wgpu::BindGroup {
    let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vitrine-material-uniforms"),
        contents: bytemuck::bytes_of(&MaterialUniforms { base_color }),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let label = format!("vitrine-material-{name}");
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&label),
        layout: &layout.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&layout.sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn vertex_layout_matches_struct() {
        let layout = MeshVertex::layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes[2].offset, 24);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let uniforms = ModelUniforms::from_matrix(Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)));
        let normal = Mat4::from_cols_array_2d(&uniforms.normal_matrix);
        let n = normal.transform_vector3(Vec3::X);
        assert!((n - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn uniform_blocks_are_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<ModelUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialUniforms>() % 16, 0);
    }
}
