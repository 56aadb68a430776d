//! Clip playback. A mixer belongs to one model; each clip action binds the
//! clip's tracks to that model's nodes once, then every `update` samples the
//! tracks at the action's local time and writes the result into the pose.

use std::collections::HashMap;

use log::{debug, warn};
use vitrine_assets::{AnimationClip, TrackChannel, normalize_node_name};

use crate::model::ModelHandle;

/// Repeat forever, wrapping local time modulo the clip duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    Once,
    #[default]
    Repeat,
}

#[derive(Debug, Clone)]
struct Binding {
    node: usize,
    track: usize,
}

#[derive(Debug, Clone)]
pub struct ClipAction {
    clip: AnimationClip,
    bindings: Vec<Binding>,
    time: f32,
    playing: bool,
    pub loop_mode: LoopMode,
    pub time_scale: f32,
}

impl ClipAction {
    pub fn play(&mut self) -> &mut Self {
        self.playing = true;
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.playing = false;
        self.time = 0.0;
        self
    }

    pub fn is_running(&self) -> bool {
        self.playing
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn bound_tracks(&self) -> usize {
        self.bindings.len()
    }

    fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        let duration = self.clip.duration;
        self.time += dt * self.time_scale;
        if duration <= 0.0 {
            self.time = 0.0;
            return;
        }
        match self.loop_mode {
            LoopMode::Repeat => self.time = self.time.rem_euclid(duration),
            LoopMode::Once => {
                if self.time >= duration {
                    self.time = duration;
                    self.playing = false;
                }
            }
        }
    }

    fn apply(&self, model: &mut ModelHandle) {
        for binding in &self.bindings {
            let Some(track) = self.clip.tracks.get(binding.track) else {
                continue;
            };
            let Some(pose) = model.node_pose_mut(binding.node) else {
                continue;
            };
            match &track.channel {
                TrackChannel::Translation(keys) => {
                    if let Some(value) = keys.sample(self.time) {
                        pose.translation = value;
                    }
                }
                TrackChannel::Rotation(keys) => {
                    if let Some(value) = keys.sample(self.time) {
                        pose.rotation = value;
                    }
                }
                TrackChannel::Scale(keys) => {
                    if let Some(value) = keys.sample(self.time) {
                        pose.scale = value;
                    }
                }
            }
        }
    }
}

pub struct AnimationMixer {
    node_lookup: HashMap<String, usize>,
    actions: Vec<ClipAction>,
    time: f32,
}

impl AnimationMixer {
    /// Create a mixer whose actions target the nodes of `model`.
    pub fn new(model: &ModelHandle) -> Self {
        let mut node_lookup = HashMap::new();
        for (index, node) in model.asset().nodes.iter().enumerate() {
            node_lookup.entry(node.name.clone()).or_insert(index);
        }
        for (index, node) in model.asset().nodes.iter().enumerate() {
            node_lookup
                .entry(normalize_node_name(&node.name))
                .or_insert(index);
        }
        Self {
            node_lookup,
            actions: Vec::new(),
            time: 0.0,
        }
    }

    fn resolve(&self, target: &str) -> Option<usize> {
        self.node_lookup
            .get(target)
            .or_else(|| self.node_lookup.get(&normalize_node_name(target)))
            .copied()
    }

    /// Bind `clip` to the model and return its (stopped) action.
    pub fn clip_action(&mut self, clip: AnimationClip) -> &mut ClipAction {
        let mut bindings = Vec::with_capacity(clip.tracks.len());
        let mut unmatched = 0usize;
        for (track_index, track) in clip.tracks.iter().enumerate() {
            match self.resolve(&track.target) {
                Some(node) => bindings.push(Binding {
                    node,
                    track: track_index,
                }),
                None => {
                    unmatched += 1;
                    debug!(
                        "[vitrine] clip '{}' {} track targets unknown node '{}'",
                        clip.name,
                        track.channel.label(),
                        track.target
                    );
                }
            }
        }
        if unmatched > 0 {
            warn!(
                "[vitrine] clip '{}': {unmatched} of {} tracks matched no node and were dropped",
                clip.name,
                clip.tracks.len()
            );
        }

        self.actions.push(ClipAction {
            clip,
            bindings,
            time: 0.0,
            playing: false,
            loop_mode: LoopMode::default(),
            time_scale: 1.0,
        });
        let last = self.actions.len() - 1;
        &mut self.actions[last]
    }

    pub fn actions(&self) -> &[ClipAction] {
        &self.actions
    }

    /// Advance by `dt` seconds and write sampled values into `model`.
    pub fn update(&mut self, dt: f32, model: &mut ModelHandle) {
        self.time += dt;
        for action in &mut self.actions {
            action.advance(dt);
            if action.playing || action.time > 0.0 {
                action.apply(model);
            }
        }
    }

    /// Total time this mixer has been advanced by, in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};
    use std::f32::consts::FRAC_PI_4;
    use vitrine_assets::{decode_animations, decode_model, fixtures};

    fn model() -> ModelHandle {
        ModelHandle::new(
            decode_model("model.glb", &fixtures::skinned_triangle_glb()).expect("model decodes"),
        )
    }

    fn turntable(duration: f32) -> AnimationClip {
        decode_animations("anim.glb", &fixtures::turntable_animation_glb(duration))
            .expect("animation decodes")
            .remove(0)
    }

    #[test]
    fn clip_binds_by_node_name() {
        let mut model = model();
        let mut mixer = AnimationMixer::new(&model);
        let action = mixer.clip_action(turntable(2.0));
        assert_eq!(action.bound_tracks(), 1);
        assert!(!action.is_running());
        action.play();

        mixer.update(1.0, &mut model);
        let joint = model
            .asset()
            .node_index(fixtures::JOINT_NODE_NAME)
            .expect("joint");
        let expected = Quat::from_rotation_y(FRAC_PI_4);
        assert!(model.pose()[joint].rotation.angle_between(expected) < 1e-4);
    }

    #[test]
    fn repeat_wraps_local_time_but_not_mixer_time() {
        let mut model = model();
        let mut mixer = AnimationMixer::new(&model);
        mixer.clip_action(turntable(2.0)).play();
        for _ in 0..5 {
            mixer.update(0.5, &mut model);
        }
        assert!((mixer.time() - 2.5).abs() < 1e-6);
        assert!((mixer.actions()[0].time() - 0.5).abs() < 1e-6);
        assert!(mixer.actions()[0].is_running());
    }

    #[test]
    fn stopped_action_leaves_pose_alone() {
        let mut model = model();
        let before = model.pose().to_vec();
        let mut mixer = AnimationMixer::new(&model);
        mixer.clip_action(turntable(2.0));
        mixer.update(1.0, &mut model);
        assert_eq!(model.pose(), before.as_slice());
        assert_eq!(mixer.time(), 1.0);
    }

    #[test]
    fn unmatched_tracks_are_dropped() {
        let mut clip = turntable(2.0);
        clip.tracks[0].target = "NoSuchBone".to_string();
        let model = model();
        let mut mixer = AnimationMixer::new(&model);
        assert_eq!(mixer.clip_action(clip).bound_tracks(), 0);
    }

    #[test]
    fn rig_prefixed_targets_still_bind() {
        let mut clip = turntable(2.0);
        clip.tracks[0].target = format!("mixamorig:{}", fixtures::JOINT_NODE_NAME);
        let model = model();
        let mut mixer = AnimationMixer::new(&model);
        assert_eq!(mixer.clip_action(clip).bound_tracks(), 1);
    }

    #[test]
    fn play_once_holds_last_frame() {
        let mut model = model();
        let mut mixer = AnimationMixer::new(&model);
        let action = mixer.clip_action(turntable(1.0));
        action.loop_mode = LoopMode::Once;
        action.play();
        mixer.update(3.0, &mut model);
        assert!(!mixer.actions()[0].is_running());
        let joint = model
            .asset()
            .node_index(fixtures::JOINT_NODE_NAME)
            .expect("joint");
        let facing = model.pose()[joint].rotation * Vec3::Z;
        assert!((facing - Vec3::X).length() < 1e-4);
    }
}
