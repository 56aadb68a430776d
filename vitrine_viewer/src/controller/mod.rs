//! The Viewer Controller owns everything one viewer instance needs apart
//! from the GPU: camera, lights, orbit controls, the loading state of the
//! model and the idle turntable bookkeeping. Hosts feed it input and a
//! monotonic millisecond clock; it never reads time on its own.

mod frame;
mod interaction;
mod loading;

use glam::Vec3;

use crate::animation::AnimationMixer;
use crate::cli::ViewerConfig;
use crate::controls::OrbitControls;
use crate::loader::{LoadRequest, ModelLoader};
use crate::model::ModelHandle;
use crate::scene::{ContainerSize, PerspectiveCamera, Scene, build_scene};

pub use frame::FrameReport;
pub use interaction::scroll_camera_position;
pub use loading::LoadProgress;

/// Model plus the mixers animating it; only exists once the model is in.
pub struct ReadyScene {
    pub model: ModelHandle,
    pub mixers: Vec<AnimationMixer>,
}

pub enum SceneContent {
    Empty,
    Loading,
    Ready(ReadyScene),
    Failed { reason: String },
}

impl SceneContent {
    pub fn ready(&self) -> Option<&ReadyScene> {
        match self {
            SceneContent::Ready(ready) => Some(ready),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SceneContent::Empty => "empty",
            SceneContent::Loading => "loading",
            SceneContent::Ready(_) => "ready",
            SceneContent::Failed { .. } => "failed",
        }
    }
}

pub struct ViewerController {
    config: ViewerConfig,
    size: ContainerSize,
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    content: SceneContent,
    loader: Option<ModelLoader>,
    request: Option<LoadRequest>,
    auto_rotate: bool,
    last_interaction_ms: f64,
    previous_frame_ms: Option<f64>,
}

impl ViewerController {
    pub fn new(config: ViewerConfig, size: ContainerSize, now_ms: f64) -> Self {
        let (scene, mut camera) = build_scene(size, config.render.shadow_map_size);
        camera.look_at(Vec3::ZERO);
        let mut controls = OrbitControls::new(&camera, Vec3::ZERO, &config.controls);
        controls.update(&mut camera);

        Self {
            config,
            size,
            scene,
            camera,
            controls,
            content: SceneContent::Empty,
            loader: None,
            request: None,
            auto_rotate: false,
            last_interaction_ms: now_ms,
            previous_frame_ms: None,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn size(&self) -> ContainerSize {
        self.size
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn content(&self) -> &SceneContent {
        &self.content
    }

    pub fn model(&self) -> Option<&ModelHandle> {
        self.content.ready().map(|ready| &ready.model)
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    pub fn last_interaction_ms(&self) -> f64 {
        self.last_interaction_ms
    }
}
