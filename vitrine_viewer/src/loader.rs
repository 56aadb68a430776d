//! Model Loader: fetches and decodes the model and its animation off the UI
//! thread. Results come back as events that the controller drains once per
//! frame, so attaching the model to the scene always happens on the thread
//! that owns the scene.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use glam::Vec3;
use log::info;
use vitrine_assets::{AnimationClip, LoadError, ModelAsset, asset_location};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub base_path: PathBuf,
    pub model_file: String,
    /// Empty means "play the model's own first clip".
    pub animation_file: String,
    pub spawn_offset: Vec3,
}

impl LoadRequest {
    pub fn model_location(&self) -> String {
        asset_location(&self.base_path, &self.model_file)
            .display()
            .to_string()
    }

    pub fn animation_location(&self) -> Option<String> {
        if self.animation_file.is_empty() {
            None
        } else {
            Some(
                asset_location(&self.base_path, &self.animation_file)
                    .display()
                    .to_string(),
            )
        }
    }
}

#[derive(Debug)]
pub enum LoadEvent {
    Model(ModelAsset),
    Animation(AnimationClip),
    NoAnimation,
    Failed(LoadError),
}

pub struct ModelLoader {
    events: Receiver<LoadEvent>,
    finished: bool,
}

impl ModelLoader {
    /// Start fetching `request` in the background.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn spawn(request: LoadRequest) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("vitrine_model_loader".to_string())
            .spawn(move || load_into(&request, &tx))
            .expect("spawn model loader thread");
        Self::from_receiver(rx)
    }

    /// Start fetching `request` over HTTP on the browser's task queue.
    #[cfg(target_arch = "wasm32")]
    pub fn spawn(request: LoadRequest) -> Self {
        let (tx, rx) = mpsc::channel();
        wasm_bindgen_futures::spawn_local(async move {
            let model = crate::web::fetch_asset(&request.model_location()).await;
            let animation = match request.animation_location() {
                Some(location) => Some(crate::web::fetch_asset(&location).await),
                None => None,
            };
            deliver(&request, model, animation, &tx);
        });
        Self::from_receiver(rx)
    }

    fn from_receiver(events: Receiver<LoadEvent>) -> Self {
        Self {
            events,
            finished: false,
        }
    }

    /// Next pending event, if any. Never blocks.
    pub fn try_next(&mut self) -> Option<LoadEvent> {
        if self.finished {
            return None;
        }
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                None
            }
        }
    }

    /// True once the worker has delivered everything and hung up.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Fetch and decode both assets synchronously, returning the events the
/// background worker would have sent.
#[cfg(not(target_arch = "wasm32"))]
pub fn load_blocking(request: &LoadRequest) -> Vec<LoadEvent> {
    let (tx, rx) = mpsc::channel();
    load_into(request, &tx);
    drop(tx);
    rx.into_iter().collect()
}

#[cfg(not(target_arch = "wasm32"))]
fn load_into(request: &LoadRequest, tx: &Sender<LoadEvent>) {
    let model = vitrine_assets::read_asset(&request.base_path, &request.model_file);
    let animation = request.animation_location().map(|_| {
        vitrine_assets::read_asset(&request.base_path, &request.animation_file)
    });
    deliver(request, model, animation, tx);
}

fn deliver(
    request: &LoadRequest,
    model_bytes: Result<Vec<u8>, LoadError>,
    animation_bytes: Option<Result<Vec<u8>, LoadError>>,
    tx: &Sender<LoadEvent>,
) {
    let model_location = request.model_location();
    let asset = match model_bytes
        .and_then(|bytes| vitrine_assets::decode_model(&model_location, &bytes))
    {
        Ok(asset) => asset,
        Err(err) => {
            let _ = tx.send(LoadEvent::Failed(err));
            return;
        }
    };
    info!(
        "[vitrine] decoded {model_location}: {} meshes, {} vertices, {} embedded clips",
        asset.meshes.len(),
        asset.vertex_count(),
        asset.animations.len()
    );
    let embedded = asset.animations.first().cloned();
    if tx.send(LoadEvent::Model(asset)).is_err() {
        return;
    }

    let event = match (animation_bytes, request.animation_location()) {
        (Some(bytes), Some(location)) => {
            match bytes.and_then(|bytes| vitrine_assets::decode_animations(&location, &bytes)) {
                Ok(mut clips) if !clips.is_empty() => LoadEvent::Animation(clips.remove(0)),
                Ok(_) => LoadEvent::Failed(LoadError::MissingAnimation { location }),
                Err(err) => LoadEvent::Failed(err),
            }
        }
        _ => match embedded {
            Some(clip) => LoadEvent::Animation(clip),
            None => LoadEvent::NoAnimation,
        },
    };
    let _ = tx.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, Instant};
    use vitrine_assets::fixtures;

    fn write_fixture(dir: &std::path::Path, name: &str, bytes: &[u8]) {
        fs::write(dir.join(name), bytes).expect("write fixture");
    }

    fn request(dir: &std::path::Path, model: &str, animation: &str) -> LoadRequest {
        LoadRequest {
            base_path: dir.to_path_buf(),
            model_file: model.to_string(),
            animation_file: animation.to_string(),
            spawn_offset: Vec3::new(0.0, 10.0, 0.0),
        }
    }

    #[test]
    fn blocking_load_yields_model_then_animation() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_fixture(dir.path(), "model.glb", &fixtures::skinned_triangle_glb());
        write_fixture(dir.path(), "anim.glb", &fixtures::turntable_animation_glb(2.0));

        let events = load_blocking(&request(dir.path(), "model.glb", "anim.glb"));
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], LoadEvent::Model(_)));
        assert!(matches!(&events[1], LoadEvent::Animation(clip) if clip.duration == 2.0));
    }

    #[test]
    fn empty_animation_name_uses_embedded_clip() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_fixture(
            dir.path(),
            "model.glb",
            &fixtures::skinned_triangle_with_clip_glb(1.5),
        );
        let events = load_blocking(&request(dir.path(), "model.glb", ""));
        assert!(matches!(&events[1], LoadEvent::Animation(clip) if clip.duration == 1.5));
    }

    #[test]
    fn model_without_clips_reports_no_animation() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_fixture(dir.path(), "model.glb", &fixtures::skinned_triangle_glb());
        let events = load_blocking(&request(dir.path(), "model.glb", ""));
        assert!(matches!(events[1], LoadEvent::NoAnimation));
    }

    #[test]
    fn missing_model_fails_without_model_event() {
        let dir = tempfile::tempdir().expect("tempdir");
        let events = load_blocking(&request(dir.path(), "absent.glb", "anim.glb"));
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], LoadEvent::Failed(err) if err.is_not_found()));
    }

    #[test]
    fn missing_animation_keeps_model() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_fixture(dir.path(), "model.glb", &fixtures::skinned_triangle_glb());
        let events = load_blocking(&request(dir.path(), "model.glb", "absent.glb"));
        assert!(matches!(events[0], LoadEvent::Model(_)));
        assert!(matches!(&events[1], LoadEvent::Failed(err) if err.is_not_found()));
    }

    #[test]
    fn background_loader_delivers_and_finishes() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_fixture(dir.path(), "model.glb", &fixtures::skinned_triangle_glb());
        write_fixture(dir.path(), "anim.glb", &fixtures::turntable_animation_glb(2.0));

        let mut loader = ModelLoader::spawn(request(dir.path(), "model.glb", "anim.glb"));
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut received = Vec::new();
        while !loader.is_finished() && Instant::now() < deadline {
            match loader.try_next() {
                Some(event) => received.push(event),
                None => std::thread::sleep(Duration::from_millis(5)),
            }
        }
        assert!(loader.is_finished());
        assert_eq!(received.len(), 2);
    }
}
