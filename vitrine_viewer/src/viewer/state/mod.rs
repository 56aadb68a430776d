//! Render Surface Manager. Owns the wgpu device and surface for one viewer
//! window, the shadow map and lit pipelines, and the GPU copy of the loaded
//! model. Submodules split the lifecycle: `init` for setup, `layout` for
//! resize handling and `render` for the per-frame passes.

use std::sync::Arc;

use wgpu::SurfaceError;
use winit::{dpi::PhysicalSize, window::Window};

use super::mesh::{MaterialLayout, ModelResources};
use crate::cli::RenderSettings;
use crate::controller::ViewerController;
use crate::error::InitializationError;

mod init;
mod layout;
mod render;

/// Color targets that depend on the surface size.
struct FrameTargets {
    depth: wgpu::TextureView,
    msaa: Option<wgpu::TextureView>,
}

pub struct RenderSurface {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    settings: RenderSettings,
    sample_count: u32,
    encode_srgb: bool,
    clear_color: wgpu::Color,
    targets: FrameTargets,
    frame_buffer: wgpu::Buffer,
    model_buffer: wgpu::Buffer,
    shadow_frame_bind_group: wgpu::BindGroup,
    lit_frame_bind_group: wgpu::BindGroup,
    model_bind_group: wgpu::BindGroup,
    material_layout: MaterialLayout,
    shadow_view: wgpu::TextureView,
    shadow_pipeline: wgpu::RenderPipeline,
    lit_pipeline: wgpu::RenderPipeline,
    model: Option<ModelResources>,
}

impl RenderSurface {
    pub async fn new(
        window: Arc<Window>,
        settings: RenderSettings,
    ) -> Result<Self, InitializationError> {
        init::new(window, settings).await
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        layout::resize(self, new_size);
    }

    /// Draw the controller's scene from its camera.
    pub fn render(&mut self, controller: &ViewerController) -> Result<(), SurfaceError> {
        render::render(self, controller)
    }

    /// Present an empty frame (closed viewer).
    pub fn render_cleared(&mut self) -> Result<(), SurfaceError> {
        render::render_cleared(self)
    }

    pub fn has_model_resources(&self) -> bool {
        self.model.is_some()
    }

    /// Free the model's buffers and textures. The next `render` with a ready
    /// model uploads them again.
    pub fn release_model(&mut self) {
        if let Some(model) = self.model.take() {
            model.destroy();
            log::debug!("[vitrine] released model GPU resources");
        }
    }

    /// Release everything tied to the model; the surface itself goes away
    /// when this value is dropped.
    pub fn dispose(mut self) {
        self.release_model();
        self.device.poll(wgpu::Maintain::Wait);
    }
}
