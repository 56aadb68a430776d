//! Windowless run: load the model synchronously, step the frame loop on a
//! fixed 60 Hz clock and summarize where everything ended up. Useful for CI
//! and for checking turntable timing without a GPU.

use anyhow::{Result, bail};
use log::info;
use serde::Serialize;

use crate::cli::ViewerConfig;
use crate::controller::{FrameReport, ViewerController};
use crate::loader::{LoadEvent, LoadRequest, load_blocking};
use crate::scene::ContainerSize;

pub const FRAME_INTERVAL_MS: f64 = 1000.0 / 60.0;

#[derive(Debug, Clone, Serialize)]
pub struct HeadlessSummary {
    pub model: String,
    pub frames: u32,
    pub elapsed_ms: f64,
    pub content: &'static str,
    pub vertex_count: usize,
    pub auto_rotate: bool,
    pub model_yaw: Option<f32>,
    pub mixer_time: Option<f32>,
    pub camera_position: [f32; 3],
    pub last_frame: Option<FrameReport>,
}

pub fn run_headless(
    config: ViewerConfig,
    size: ContainerSize,
    request: LoadRequest,
    frames: u32,
) -> Result<HeadlessSummary> {
    let model = request.model_location();
    let offset = request.spawn_offset;
    let mut controller = ViewerController::new(config, size, 0.0);

    for event in load_blocking(&request) {
        if let LoadEvent::Failed(err) = event {
            bail!("loading {model}: {err}");
        }
        controller.apply_event(event, offset)?;
    }
    let vertex_count = controller
        .model()
        .map(|handle| handle.asset().vertex_count())
        .unwrap_or(0);
    info!("[vitrine] headless: {model} ready ({vertex_count} vertices), stepping {frames} frames");

    let mut last_frame = None;
    let mut now_ms = 0.0;
    for frame in 0..frames {
        now_ms = f64::from(frame) * FRAME_INTERVAL_MS;
        last_frame = Some(controller.advance_frame(now_ms));
    }

    Ok(HeadlessSummary {
        model,
        frames,
        elapsed_ms: now_ms,
        content: controller.content().label(),
        vertex_count,
        auto_rotate: controller.auto_rotate(),
        model_yaw: controller.model().map(|handle| handle.yaw()),
        mixer_time: last_frame.and_then(|report: FrameReport| report.mixer_time),
        camera_position: controller.camera().position.to_array(),
        last_frame,
    })
}
