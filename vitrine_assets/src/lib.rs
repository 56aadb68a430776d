//! CPU-side decoding of the viewer's binary model and animation assets.
//!
//! Everything here is renderer-agnostic: the viewer crate turns a
//! `ModelAsset` into GPU buffers and binds `AnimationClip`s to it by node
//! name.

pub mod animation;
pub mod error;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
pub mod model;
pub mod source;

pub use animation::{
    AnimationClip, Interpolation, NodeTrack, TrackChannel, TrackQuat, TrackVec3, decode_animations,
};
pub use error::LoadError;
pub use model::{
    MaterialAsset, MeshAsset, ModelAsset, NodeAsset, NodeTransform, PrimitiveAsset, SkinAsset,
    SkinnedVertex, TextureAsset, decode_model, normalize_node_name,
};
pub use source::{asset_location, read_asset};
