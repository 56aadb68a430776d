use serde::Serialize;

use super::{SceneContent, ViewerController};

/// Snapshot of one frame-loop tick, used by hosts for logging and by the
/// headless run for its summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameReport {
    pub delta_ms: f64,
    pub idle_ms: f64,
    pub auto_rotate: bool,
    pub model_yaw: Option<f32>,
    pub mixer_time: Option<f32>,
    pub camera_moved: bool,
}

impl ViewerController {
    /// One tick of the frame loop at host time `now_ms`: advance mixers,
    /// update the idle turntable, then let the controls move the camera.
    /// Rendering is the host's next step.
    pub fn advance_frame(&mut self, now_ms: f64) -> FrameReport {
        let previous = self.previous_frame_ms.unwrap_or(now_ms);
        let delta_ms = (now_ms - previous).max(0.0);
        self.previous_frame_ms = Some(now_ms);
        let idle_ms = now_ms - self.last_interaction_ms;

        let dt_seconds = (delta_ms * 0.001) as f32;
        if let SceneContent::Ready(ready) = &mut self.content {
            for mixer in &mut ready.mixers {
                mixer.update(dt_seconds, &mut ready.model);
            }
        }

        if idle_ms > self.config.idle_rotate_delay_ms {
            self.auto_rotate = true;
        }

        let step = self.config.auto_rotate_step;
        let auto_rotate = self.auto_rotate;
        let (model_yaw, mixer_time) = match &mut self.content {
            SceneContent::Ready(ready) => {
                if auto_rotate {
                    ready.model.transform.rotation.y += step;
                }
                (
                    Some(ready.model.yaw()),
                    ready.mixers.first().map(|mixer| mixer.time()),
                )
            }
            _ => (None, None),
        };

        let camera_moved = self.controls.update(&mut self.camera);

        FrameReport {
            delta_ms,
            idle_ms,
            auto_rotate,
            model_yaw,
            mixer_time,
            camera_moved,
        }
    }
}
