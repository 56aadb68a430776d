use glam::Vec3;
use log::{info, warn};
use vitrine_assets::{AnimationClip, LoadError};

use super::{ReadyScene, SceneContent, ViewerController};
use crate::animation::AnimationMixer;
use crate::loader::{LoadEvent, LoadRequest, ModelLoader};
use crate::model::ModelHandle;

/// What a `poll_loader` call observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadProgress {
    Idle,
    Pending,
    ModelAttached,
    AnimationAttached,
    Finished,
}

impl ViewerController {
    /// Kick off the background load. A controller shows at most one model,
    /// so a second request while one is loading or loaded is ignored.
    pub fn begin_load(&mut self, request: LoadRequest) -> bool {
        if !matches!(
            self.content,
            SceneContent::Empty | SceneContent::Failed { .. }
        ) {
            warn!("[vitrine] model already requested; ignoring second load");
            return false;
        }
        info!(
            "[vitrine] loading {} (animation: {})",
            request.model_location(),
            request
                .animation_location()
                .unwrap_or_else(|| "embedded".to_string())
        );
        self.loader = Some(ModelLoader::spawn(request.clone()));
        self.request = Some(request);
        self.content = SceneContent::Loading;
        true
    }

    /// Drain loader events. The first failure is returned to the caller;
    /// the frame loop keeps running either way.
    pub fn poll_loader(&mut self) -> Result<LoadProgress, LoadError> {
        let Some(loader) = self.loader.as_mut() else {
            return Ok(LoadProgress::Idle);
        };
        let offset = self
            .request
            .as_ref()
            .map(|request| request.spawn_offset)
            .unwrap_or(Vec3::ZERO);

        let mut progress = LoadProgress::Pending;
        let mut events = Vec::new();
        while let Some(event) = loader.try_next() {
            events.push(event);
        }
        if loader.is_finished() {
            self.loader = None;
            progress = LoadProgress::Finished;
        }

        let mut failure = None;
        for event in events {
            match self.apply_event(event, offset) {
                Ok(Some(step)) if progress != LoadProgress::Finished => progress = step,
                Ok(_) => {}
                Err(err) => {
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(progress),
        }
    }

    /// Run one loader event to completion on this thread.
    pub fn apply_event(
        &mut self,
        event: LoadEvent,
        spawn_offset: Vec3,
    ) -> Result<Option<LoadProgress>, LoadError> {
        match event {
            LoadEvent::Model(asset) => {
                self.attach_model(ModelHandle::prepare(
                    asset,
                    self.config.model_scale,
                    spawn_offset,
                    self.camera.position,
                    self.config.render.receive_shadows,
                ));
                Ok(Some(LoadProgress::ModelAttached))
            }
            LoadEvent::Animation(clip) => Ok(self
                .attach_animation(clip)
                .then_some(LoadProgress::AnimationAttached)),
            LoadEvent::NoAnimation => {
                info!("[vitrine] model has no animation to play");
                Ok(None)
            }
            LoadEvent::Failed(err) => {
                warn!("[vitrine] load failed: {err}");
                if !matches!(self.content, SceneContent::Ready(_)) {
                    self.content = SceneContent::Failed {
                        reason: err.to_string(),
                    };
                }
                Err(err)
            }
        }
    }

    fn attach_model(&mut self, model: ModelHandle) {
        // Face each other, then orbit whatever the model's final position is.
        self.camera.look_at(model.position());
        self.controls.target = model.position();
        self.controls.update(&mut self.camera);
        info!(
            "[vitrine] model attached: yaw {:.3} rad, {} triangles",
            model.yaw(),
            model.asset().triangle_count()
        );
        self.content = SceneContent::Ready(ReadyScene {
            model,
            mixers: Vec::new(),
        });
    }

    fn attach_animation(&mut self, clip: AnimationClip) -> bool {
        let SceneContent::Ready(ready) = &mut self.content else {
            warn!(
                "[vitrine] clip '{}' arrived without a model; dropped",
                clip.name
            );
            return false;
        };
        let mut mixer = AnimationMixer::new(&ready.model);
        info!(
            "[vitrine] playing clip '{}' ({:.2}s)",
            clip.name, clip.duration
        );
        mixer.clip_action(clip).play();
        ready.mixers.push(mixer);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{controller, ready_controller, turntable};
    use super::*;
    use std::time::{Duration, Instant};
    use vitrine_assets::fixtures;

    #[test]
    fn model_event_attaches_centered_model() {
        let controller = ready_controller(0.0);
        let ready = controller.content().ready().expect("ready scene");
        assert_eq!(ready.model.position(), Vec3::ZERO);
        assert_eq!(ready.mixers.len(), 1);
        assert_eq!(controller.controls().target, Vec3::ZERO);
    }

    #[test]
    fn animation_before_model_is_dropped() {
        let mut controller = controller(0.0);
        let step = controller
            .apply_event(LoadEvent::Animation(turntable(1.0)), Vec3::ZERO)
            .expect("no error");
        assert_eq!(step, None);
        assert!(controller.model().is_none());
    }

    #[test]
    fn failure_before_model_marks_scene_failed() {
        let mut controller = controller(0.0);
        let err = controller
            .apply_event(
                LoadEvent::Failed(LoadError::NotFound {
                    location: "x.glb".into(),
                }),
                Vec3::ZERO,
            )
            .expect_err("failure surfaces");
        assert!(err.is_not_found());
        assert_eq!(controller.content().label(), "failed");
    }

    #[test]
    fn animation_failure_keeps_ready_model() {
        let mut controller = ready_controller(0.0);
        let result = controller.apply_event(
            LoadEvent::Failed(LoadError::MissingAnimation {
                location: "anim.glb".into(),
            }),
            Vec3::ZERO,
        );
        assert!(result.is_err());
        assert_eq!(controller.content().label(), "ready");
    }

    #[test]
    fn poll_loader_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut controller = controller(0.0);
        assert!(controller.begin_load(LoadRequest {
            base_path: dir.path().to_path_buf(),
            model_file: "absent.glb".into(),
            animation_file: String::new(),
            spawn_offset: Vec3::ZERO,
        }));
        assert_eq!(controller.content().label(), "loading");

        let deadline = Instant::now() + Duration::from_secs(10);
        let err = loop {
            match controller.poll_loader() {
                Err(err) => break err,
                Ok(_) if Instant::now() > deadline => panic!("loader never reported"),
                Ok(_) => std::thread::sleep(Duration::from_millis(5)),
            }
        };
        assert!(err.is_not_found());
        assert_eq!(controller.content().label(), "failed");
    }

    #[test]
    fn poll_loader_attaches_model_and_clip() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("model.glb"),
            fixtures::skinned_triangle_with_clip_glb(1.0),
        )
        .expect("write model");
        let mut controller = controller(0.0);
        controller.begin_load(LoadRequest {
            base_path: dir.path().to_path_buf(),
            model_file: "model.glb".into(),
            animation_file: String::new(),
            spawn_offset: Vec3::new(0.0, 10.0, 0.0),
        });
        assert!(!controller.begin_load(LoadRequest {
            base_path: dir.path().to_path_buf(),
            model_file: "model.glb".into(),
            animation_file: String::new(),
            spawn_offset: Vec3::ZERO,
        }));

        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if controller.poll_loader().expect("load succeeds") == LoadProgress::Finished {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        let ready = controller.content().ready().expect("ready");
        assert_eq!(ready.mixers.len(), 1);
        assert_eq!(controller.poll_loader().expect("idle"), LoadProgress::Idle);
    }
}
