use std::f32::consts::PI;

use bytemuck::bytes_of;
use wgpu::SurfaceError;

use super::super::mesh::{FrameUniforms, ModelResources, ModelUniforms};
use super::{RenderSurface, layout};
use crate::cli::ToneMapping;
use crate::controller::ViewerController;

pub(super) fn render(
    state: &mut RenderSurface,
    controller: &ViewerController,
) -> Result<(), SurfaceError> {
    sync_model(state, controller);
    write_uniforms(state, controller);

    let frame = acquire(state)?;
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("vitrine-frame-encoder"),
        });

    if controller.scene().key_light.cast_shadow {
        draw_shadow_pass(state, &mut encoder);
    }
    draw_lit_pass(state, &view, &mut encoder);

    state.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}

pub(super) fn render_cleared(state: &mut RenderSurface) -> Result<(), SurfaceError> {
    let frame = acquire(state)?;
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("vitrine-clear-encoder"),
        });
    {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vitrine-clear-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(state.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }
    state.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}

fn acquire(state: &mut RenderSurface) -> Result<wgpu::SurfaceTexture, SurfaceError> {
    match state.surface.get_current_texture() {
        Ok(frame) => Ok(frame),
        Err(SurfaceError::Lost | SurfaceError::Outdated) => {
            layout::reconfigure(state);
            state.surface.get_current_texture()
        }
        Err(err) => Err(err),
    }
}

/// Upload the model the first time it is seen (or after a release) and
/// stream its current pose otherwise.
fn sync_model(state: &mut RenderSurface, controller: &ViewerController) {
    let Some(model) = controller.model() else {
        state.release_model();
        return;
    };
    if let Some(resources) = state.model.as_mut() {
        resources.write_pose(&state.queue, model);
        return;
    }
    let resources =
        ModelResources::upload(&state.device, &state.queue, model, &state.material_layout);
    log::debug!(
        "[vitrine] uploaded {} model primitives",
        resources.primitives.len()
    );
    state.model = Some(resources);
}

fn write_uniforms(state: &mut RenderSurface, controller: &ViewerController) {
    let camera = controller.camera();
    let scene = controller.scene();
    let key = &scene.key_light;
    let settings = &state.settings;

    let irradiance_scale = if settings.physically_correct_lights {
        1.0
    } else {
        PI
    };
    let tone_mapping = match settings.tone_mapping {
        ToneMapping::AcesFilmic => 1.0,
        ToneMapping::None => 0.0,
    };
    let texel = 1.0 / key.shadow.map_size.max(1) as f32;
    let receive = controller
        .model()
        .map(|model| model.shadow_flags(0).receive)
        .unwrap_or(settings.receive_shadows);

    let frame = FrameUniforms {
        view_proj: camera.view_projection().to_cols_array_2d(),
        light_view_proj: key.shadow_view_projection().to_cols_array_2d(),
        camera_position: camera.position.extend(1.0).to_array(),
        light_direction: key.direction().extend(0.0).to_array(),
        light_radiance: (key.color * key.intensity).extend(1.0).to_array(),
        ambient_radiance: scene.fill_light.radiance().extend(1.0).to_array(),
        params: [
            settings.exposure,
            tone_mapping,
            irradiance_scale,
            if state.encode_srgb { 1.0 } else { 0.0 },
        ],
        shadow: [
            key.shadow.bias,
            texel,
            if receive { 1.0 } else { 0.0 },
            if key.cast_shadow { 1.0 } else { 0.0 },
        ],
    };
    state
        .queue
        .write_buffer(&state.frame_buffer, 0, bytes_of(&frame));

    let root = controller
        .model()
        .map(|model| model.transform.matrix())
        .unwrap_or(glam::Mat4::IDENTITY);
    state.queue.write_buffer(
        &state.model_buffer,
        0,
        bytes_of(&ModelUniforms::from_matrix(root)),
    );
}

fn draw_shadow_pass(state: &RenderSurface, encoder: &mut wgpu::CommandEncoder) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("vitrine-shadow-pass"),
        color_attachments: &[],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &state.shadow_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    let Some(model) = state.model.as_ref() else {
        return;
    };
    pass.set_pipeline(&state.shadow_pipeline);
    pass.set_bind_group(0, &state.shadow_frame_bind_group, &[]);
    pass.set_bind_group(1, &state.model_bind_group, &[]);
    for primitive in model.primitives.iter().filter(|p| p.cast_shadow) {
        pass.set_vertex_buffer(0, primitive.vertex.slice(..));
        pass.set_index_buffer(primitive.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..primitive.index_count, 0, 0..1);
    }
}

fn draw_lit_pass(
    state: &RenderSurface,
    view: &wgpu::TextureView,
    encoder: &mut wgpu::CommandEncoder,
) {
    let (color_view, resolve_target) = match state.targets.msaa.as_ref() {
        Some(msaa) => (msaa, Some(view)),
        None => (view, None),
    };
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("vitrine-lit-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color_view,
            resolve_target,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(state.clear_color),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &state.targets.depth,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Discard,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    let Some(model) = state.model.as_ref() else {
        return;
    };
    pass.set_pipeline(&state.lit_pipeline);
    pass.set_bind_group(0, &state.lit_frame_bind_group, &[]);
    pass.set_bind_group(1, &state.model_bind_group, &[]);
    for primitive in &model.primitives {
        pass.set_bind_group(2, &model.materials[primitive.material], &[]);
        pass.set_vertex_buffer(0, primitive.vertex.slice(..));
        pass.set_index_buffer(primitive.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..primitive.index_count, 0, 0..1);
    }
}
