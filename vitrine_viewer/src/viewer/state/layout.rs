use winit::dpi::PhysicalSize;

use super::RenderSurface;
use super::init::create_frame_targets;

pub(super) fn resize(state: &mut RenderSurface, new_size: PhysicalSize<u32>) {
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }
    if new_size == state.size {
        return;
    }

    state.size = new_size;
    state.config.width = new_size.width;
    state.config.height = new_size.height;
    state.surface.configure(&state.device, &state.config);
    state.targets = create_frame_targets(&state.device, &state.config, state.sample_count);
}

/// Reconfigure after the surface reported itself lost or outdated.
pub(super) fn reconfigure(state: &mut RenderSurface) {
    state.surface.configure(&state.device, &state.config);
}
