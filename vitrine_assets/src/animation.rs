//! Animation clips decoded from glTF and keyframe sampling.
//!
//! Tracks address their target by node *name* rather than index so a clip
//! exported from a separate animation file can drive a model whose node
//! order differs. Binding names to model nodes is the mixer's job.

use glam::{Quat, Vec3};
use gltf::animation::{Property, util::ReadOutputs};

use crate::LoadError;
use crate::model::node_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    /// Sampled through the keyframe values only; tangents are discarded on decode.
    CubicSpline,
}

impl From<gltf::animation::Interpolation> for Interpolation {
    fn from(value: gltf::animation::Interpolation) -> Self {
        match value {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackVec3 {
    pub times: Vec<f32>,
    pub values: Vec<Vec3>,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone)]
pub struct TrackQuat {
    pub times: Vec<f32>,
    pub values: Vec<Quat>,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone)]
pub enum TrackChannel {
    Translation(TrackVec3),
    Rotation(TrackQuat),
    Scale(TrackVec3),
}

impl TrackChannel {
    pub fn label(&self) -> &'static str {
        match self {
            TrackChannel::Translation(_) => "translation",
            TrackChannel::Rotation(_) => "rotation",
            TrackChannel::Scale(_) => "scale",
        }
    }

    fn end_time(&self) -> f32 {
        let times = match self {
            TrackChannel::Translation(track) | TrackChannel::Scale(track) => &track.times,
            TrackChannel::Rotation(track) => &track.times,
        };
        times.last().copied().unwrap_or(0.0)
    }
}

/// One animated property of one node.
#[derive(Debug, Clone)]
pub struct NodeTrack {
    pub target: String,
    pub channel: TrackChannel,
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<NodeTrack>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, tracks: Vec<NodeTrack>) -> Self {
        let duration = tracks
            .iter()
            .map(|track| track.channel.end_time())
            .fold(0.0_f32, f32::max);
        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }
}

/// Keyframe pair surrounding `t` plus the blend factor between them.
fn locate(times: &[f32], t: f32) -> Option<(usize, usize, f32)> {
    let last = times.len().checked_sub(1)?;
    if t <= times[0] {
        return Some((0, 0, 0.0));
    }
    if t >= times[last] {
        return Some((last, last, 0.0));
    }
    let upper = times.partition_point(|&key| key <= t);
    let lower = upper - 1;
    let span = times[upper] - times[lower];
    let blend = if span > f32::EPSILON {
        (t - times[lower]) / span
    } else {
        0.0
    };
    Some((lower, upper, blend))
}

impl TrackVec3 {
    pub fn sample(&self, t: f32) -> Option<Vec3> {
        let (lower, upper, blend) = locate(&self.times, t)?;
        let a = *self.values.get(lower)?;
        let b = *self.values.get(upper)?;
        Some(match self.interpolation {
            Interpolation::Step => a,
            Interpolation::Linear | Interpolation::CubicSpline => a.lerp(b, blend),
        })
    }
}

impl TrackQuat {
    pub fn sample(&self, t: f32) -> Option<Quat> {
        let (lower, upper, blend) = locate(&self.times, t)?;
        let a = *self.values.get(lower)?;
        let b = *self.values.get(upper)?;
        Some(match self.interpolation {
            Interpolation::Step => a,
            Interpolation::Linear | Interpolation::CubicSpline => a.slerp(b, blend).normalize(),
        })
    }
}

/// Decode every animation clip stored in a binary glTF file.
pub fn decode_animations(location: &str, bytes: &[u8]) -> Result<Vec<AnimationClip>, LoadError> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).map_err(|err| LoadError::decode(location, err))?;
    let clips = clips_from_document(&document, &buffers);
    if clips.is_empty() {
        return Err(LoadError::MissingAnimation {
            location: location.to_string(),
        });
    }
    Ok(clips)
}

pub(crate) fn clips_from_document(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Vec<AnimationClip> {
    document
        .animations()
        .map(|animation| {
            let name = animation
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("clip{}", animation.index()));
            let tracks = animation
                .channels()
                .filter_map(|channel| decode_channel(&channel, buffers))
                .collect();
            AnimationClip::new(name, tracks)
        })
        .collect()
}

fn decode_channel(
    channel: &gltf::animation::Channel<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<NodeTrack> {
    let target = channel.target();
    let node = target.node();
    let interpolation = Interpolation::from(channel.sampler().interpolation());
    let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let times: Vec<f32> = reader.read_inputs()?.collect();
    let outputs = reader.read_outputs()?;

    let channel = match (target.property(), outputs) {
        (Property::Translation, ReadOutputs::Translations(values)) => {
            let values = keyframe_values(values.map(Vec3::from).collect(), interpolation);
            TrackChannel::Translation(vec3_track(times, values, interpolation))
        }
        (Property::Scale, ReadOutputs::Scales(values)) => {
            let values = keyframe_values(values.map(Vec3::from).collect(), interpolation);
            TrackChannel::Scale(vec3_track(times, values, interpolation))
        }
        (Property::Rotation, ReadOutputs::Rotations(values)) => {
            let values = keyframe_values(
                values
                    .into_f32()
                    .map(|v| Quat::from_xyzw(v[0], v[1], v[2], v[3]).normalize())
                    .collect(),
                interpolation,
            );
            let len = times.len().min(values.len());
            TrackChannel::Rotation(TrackQuat {
                times: times[..len].to_vec(),
                values: values[..len].to_vec(),
                interpolation,
            })
        }
        (property, _) => {
            log::debug!(
                "[vitrine] skipping unsupported {:?} channel on {}",
                property,
                node_label(&node)
            );
            return None;
        }
    };

    Some(NodeTrack {
        target: node_label(&node),
        channel,
    })
}

fn vec3_track(times: Vec<f32>, values: Vec<Vec3>, interpolation: Interpolation) -> TrackVec3 {
    let len = times.len().min(values.len());
    TrackVec3 {
        times: times[..len].to_vec(),
        values: values[..len].to_vec(),
        interpolation,
    }
}

/// Cubic-spline outputs interleave (in-tangent, value, out-tangent) per key.
fn keyframe_values<T: Copy>(values: Vec<T>, interpolation: Interpolation) -> Vec<T> {
    match interpolation {
        Interpolation::CubicSpline => values.chunks_exact(3).map(|triple| triple[1]).collect(),
        Interpolation::Step | Interpolation::Linear => values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn linear(times: &[f32], values: &[Vec3]) -> TrackVec3 {
        TrackVec3 {
            times: times.to_vec(),
            values: values.to_vec(),
            interpolation: Interpolation::Linear,
        }
    }

    #[test]
    fn linear_track_interpolates_between_keys() {
        let track = linear(&[0.0, 1.0, 3.0], &[Vec3::ZERO, Vec3::X, Vec3::new(3.0, 0.0, 0.0)]);
        let mid = track.sample(2.0).expect("sample");
        assert!((mid.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn samples_clamp_outside_key_range() {
        let track = linear(&[0.5, 1.0], &[Vec3::Y, Vec3::Z]);
        assert_eq!(track.sample(-1.0), Some(Vec3::Y));
        assert_eq!(track.sample(9.0), Some(Vec3::Z));
    }

    #[test]
    fn step_track_holds_previous_key() {
        let mut track = linear(&[0.0, 1.0], &[Vec3::ZERO, Vec3::ONE]);
        track.interpolation = Interpolation::Step;
        assert_eq!(track.sample(0.99), Some(Vec3::ZERO));
    }

    #[test]
    fn empty_track_yields_nothing() {
        let track = linear(&[], &[]);
        assert_eq!(track.sample(0.0), None);
    }

    #[test]
    fn cubic_spline_keeps_middle_of_each_triple() {
        let values = vec![1, 2, 3, 4, 5, 6];
        assert_eq!(keyframe_values(values, Interpolation::CubicSpline), vec![2, 5]);
    }

    #[test]
    fn duration_is_latest_key() {
        let clip = AnimationClip::new(
            "wave",
            vec![
                NodeTrack {
                    target: "Root".into(),
                    channel: TrackChannel::Translation(linear(&[0.0, 0.75], &[Vec3::ZERO, Vec3::X])),
                },
                NodeTrack {
                    target: "Root".into(),
                    channel: TrackChannel::Scale(linear(&[0.0, 1.25], &[Vec3::ONE, Vec3::ONE])),
                },
            ],
        );
        assert!((clip.duration - 1.25).abs() < 1e-6);
    }

    #[test]
    fn decodes_fixture_animation_by_node_name() {
        let bytes = fixtures::turntable_animation_glb(2.0);
        let clips = decode_animations("turntable.glb", &bytes).expect("decode animation");
        assert_eq!(clips.len(), 1);
        let clip = &clips[0];
        assert_eq!(clip.name, fixtures::ANIMATION_CLIP_NAME);
        assert!((clip.duration - 2.0).abs() < 1e-6);
        assert_eq!(clip.tracks.len(), 1);
        assert_eq!(clip.tracks[0].target, fixtures::JOINT_NODE_NAME);
        let TrackChannel::Rotation(track) = &clip.tracks[0].channel else {
            panic!("expected a rotation track");
        };
        let halfway = track.sample(1.0).expect("sample");
        let (axis, angle) = halfway.to_axis_angle();
        assert!((angle - std::f32::consts::FRAC_PI_4).abs() < 1e-4);
        assert!(axis.y > 0.99);
    }

    #[test]
    fn model_without_clips_is_missing_animation() {
        let bytes = fixtures::static_triangle_glb();
        let err = decode_animations("static.glb", &bytes).expect_err("no clips");
        assert!(matches!(err, LoadError::MissingAnimation { .. }));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_animations("junk.glb", b"not a gltf").expect_err("garbage");
        assert!(matches!(err, LoadError::Decode { .. }));
    }
}
