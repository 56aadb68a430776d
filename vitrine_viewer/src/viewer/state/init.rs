use std::{borrow::Cow, sync::Arc};

use winit::window::Window;

use super::super::mesh::{FrameUniforms, MaterialLayout, MeshVertex, ModelUniforms};
use super::super::shaders::{LIT_SHADER_SOURCE, SHADOW_SHADER_SOURCE};
use super::{FrameTargets, RenderSurface};
use crate::cli::RenderSettings;
use crate::error::InitializationError;

pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const OPAQUE_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.025,
    a: 1.0,
};

/// Bundles the wgpu objects tied to the viewer window.
struct WgpuBootstrap {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    present_mode: wgpu::PresentMode,
    alpha_mode: wgpu::CompositeAlphaMode,
    sample_count: u32,
}

/// Bind group layouts shared by the pipelines and the per-frame bindings.
struct Layouts {
    shadow_frame: wgpu::BindGroupLayout,
    lit_frame: wgpu::BindGroupLayout,
    model: wgpu::BindGroupLayout,
}

pub(super) async fn new(
    window: Arc<Window>,
    settings: RenderSettings,
) -> Result<RenderSurface, InitializationError> {
    let size = window.inner_size();
    let wgpu = bootstrap_wgpu(window.clone(), &settings).await?;
    let device = &wgpu.device;

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: wgpu.surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu.present_mode,
        alpha_mode: wgpu.alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    wgpu.surface.configure(device, &config);

    let layouts = create_layouts(device);
    let material_layout = create_material_layout(device);

    let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("vitrine-frame-uniforms"),
        size: std::mem::size_of::<FrameUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let model_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("vitrine-model-uniforms"),
        size: std::mem::size_of::<ModelUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let shadow_view = create_shadow_map(device, settings.shadow_map_size);
    let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("vitrine-shadow-sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        compare: Some(wgpu::CompareFunction::LessEqual),
        ..Default::default()
    });

    let shadow_frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("vitrine-shadow-frame"),
        layout: &layouts.shadow_frame,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: frame_buffer.as_entire_binding(),
        }],
    });
    let lit_frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("vitrine-lit-frame"),
        layout: &layouts.lit_frame,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&shadow_sampler),
            },
        ],
    });
    let model_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("vitrine-model"),
        layout: &layouts.model,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: model_buffer.as_entire_binding(),
        }],
    });

    let shadow_pipeline = create_shadow_pipeline(device, &layouts);
    let lit_pipeline = create_lit_pipeline(
        device,
        &layouts,
        &material_layout,
        wgpu.surface_format,
        wgpu.sample_count,
    );

    let targets = create_frame_targets(device, &config, wgpu.sample_count);
    let clear_color = if wgpu.alpha_mode == wgpu::CompositeAlphaMode::PreMultiplied {
        wgpu::Color::TRANSPARENT
    } else {
        OPAQUE_CLEAR
    };

    log::info!(
        "[vitrine] surface {}x{} format {:?}, alpha {:?}, {}x MSAA, shadow map {}",
        config.width,
        config.height,
        wgpu.surface_format,
        wgpu.alpha_mode,
        wgpu.sample_count,
        settings.shadow_map_size
    );

    Ok(RenderSurface {
        window,
        surface: wgpu.surface,
        device: wgpu.device,
        queue: wgpu.queue,
        config,
        size,
        encode_srgb: !wgpu.surface_format.is_srgb(),
        sample_count: wgpu.sample_count,
        settings,
        clear_color,
        targets,
        frame_buffer,
        model_buffer,
        shadow_frame_bind_group,
        lit_frame_bind_group,
        model_bind_group,
        material_layout,
        shadow_view,
        shadow_pipeline,
        lit_pipeline,
        model: None,
    })
}

async fn bootstrap_wgpu(
    window: Arc<Window>,
    settings: &RenderSettings,
) -> Result<WgpuBootstrap, InitializationError> {
    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(window)
        .map_err(|err| InitializationError::Surface(err.to_string()))?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .ok_or(InitializationError::NoAdapter)?;

    let required_limits = if cfg!(target_arch = "wasm32") {
        wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
    } else {
        wgpu::Limits::default()
    };
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vitrine-device"),
                required_features: wgpu::Features::empty(),
                required_limits,
            },
            None,
        )
        .await
        .map_err(|err| InitializationError::Device(err.to_string()))?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .or_else(|| surface_caps.formats.first().copied())
        .ok_or_else(|| InitializationError::Surface("surface reports no formats".into()))?;
    let present_mode = surface_caps
        .present_modes
        .iter()
        .copied()
        .find(|mode| *mode == wgpu::PresentMode::Mailbox)
        .unwrap_or(wgpu::PresentMode::Fifo);
    let alpha_mode = if settings.transparent
        && surface_caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
    {
        wgpu::CompositeAlphaMode::PreMultiplied
    } else {
        surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Opaque)
    };

    let format_flags = adapter.get_texture_format_features(surface_format).flags;
    let depth_flags = adapter.get_texture_format_features(DEPTH_FORMAT).flags;
    let sample_count = if settings.msaa_samples > 1
        && format_flags.sample_count_supported(settings.msaa_samples)
        && depth_flags.sample_count_supported(settings.msaa_samples)
    {
        settings.msaa_samples
    } else {
        1
    };

    Ok(WgpuBootstrap {
        surface,
        device,
        queue,
        surface_format,
        present_mode,
        alpha_mode,
        sample_count,
    })
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_layouts(device: &wgpu::Device) -> Layouts {
    let shadow_frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("vitrine-shadow-frame-layout"),
        entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
    });
    let lit_frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("vitrine-lit-frame-layout"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
    });
    let model = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("vitrine-model-layout"),
        entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
    });
    Layouts {
        shadow_frame,
        lit_frame,
        model,
    }
}

fn create_material_layout(device: &wgpu::Device) -> MaterialLayout {
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("vitrine-material-layout"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("vitrine-material-sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });
    MaterialLayout {
        bind_group_layout,
        sampler,
    }
}

fn create_shadow_map(device: &wgpu::Device, map_size: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("vitrine-shadow-map"),
        size: wgpu::Extent3d {
            width: map_size,
            height: map_size,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SHADOW_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_shadow_pipeline(device: &wgpu::Device, layouts: &Layouts) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vitrine-shadow-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SHADOW_SHADER_SOURCE.as_str())),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("vitrine-shadow-pipeline-layout"),
        bind_group_layouts: &[&layouts.shadow_frame, &layouts.model],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vitrine-shadow-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "shadow_vs_main",
            buffers: &[MeshVertex::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: None,
        primitive: wgpu::PrimitiveState {
            cull_mode: None,
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: SHADOW_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

fn create_lit_pipeline(
    device: &wgpu::Device,
    layouts: &Layouts,
    material_layout: &MaterialLayout,
    surface_format: wgpu::TextureFormat,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vitrine-lit-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(LIT_SHADER_SOURCE.as_str())),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("vitrine-lit-pipeline-layout"),
        bind_group_layouts: &[
            &layouts.lit_frame,
            &layouts.model,
            &material_layout.bind_group_layout,
        ],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vitrine-lit-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[MeshVertex::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            // Double-sided and mirrored meshes both render without culling.
            cull_mode: None,
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            ..wgpu::MultisampleState::default()
        },
        multiview: None,
    })
}

pub(super) fn create_frame_targets(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> FrameTargets {
    let size = wgpu::Extent3d {
        width: config.width.max(1),
        height: config.height.max(1),
        depth_or_array_layers: 1,
    };
    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("vitrine-depth"),
        size,
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let msaa = (sample_count > 1).then(|| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("vitrine-msaa-color"),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: config.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    });
    FrameTargets {
        depth: depth.create_view(&wgpu::TextureViewDescriptor::default()),
        msaa,
    }
}
