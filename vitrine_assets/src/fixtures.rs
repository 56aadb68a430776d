//! Synthetic GLB files for tests: a skinned triangle, its static twin, and a
//! turntable animation that targets the joint by name.

use serde_json::{Value, json};

pub const MESH_NODE_NAME: &str = "Body";
pub const JOINT_NODE_NAME: &str = "Hips";
pub const ANIMATION_CLIP_NAME: &str = "Idle";

const FLOAT: u32 = 5126;
const UNSIGNED_SHORT: u32 = 5123;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Triangle deliberately off-center so recentering is observable.
const TRIANGLE_POSITIONS: [f32; 9] = [1.0, 0.0, 0.0, 3.0, 0.0, 0.0, 1.0, 2.0, 0.0];
const TRIANGLE_NORMALS: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];

#[derive(Default)]
struct GlbBuilder {
    bin: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl GlbBuilder {
    fn push_view(&mut self, bytes: &[u8], target: Option<u32>) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let mut view = json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        });
        if let Some(target) = target {
            view["target"] = json!(target);
        }
        self.bin.extend_from_slice(bytes);
        self.views.push(view);
        self.views.len() - 1
    }

    fn push_floats(
        &mut self,
        data: &[f32],
        kind: &str,
        components: usize,
        target: Option<u32>,
        with_bounds: bool,
    ) -> usize {
        let bytes: Vec<u8> = data.iter().flat_map(|value| value.to_le_bytes()).collect();
        let view = self.push_view(&bytes, target);
        let mut accessor = json!({
            "bufferView": view,
            "componentType": FLOAT,
            "count": data.len() / components,
            "type": kind,
        });
        if with_bounds {
            let mut min = vec![f32::MAX; components];
            let mut max = vec![f32::MIN; components];
            for element in data.chunks_exact(components) {
                for (axis, value) in element.iter().enumerate() {
                    min[axis] = min[axis].min(*value);
                    max[axis] = max[axis].max(*value);
                }
            }
            accessor["min"] = json!(min);
            accessor["max"] = json!(max);
        }
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    fn push_u16s(&mut self, data: &[u16], kind: &str, components: usize, target: u32) -> usize {
        let bytes: Vec<u8> = data.iter().flat_map(|value| value.to_le_bytes()).collect();
        let view = self.push_view(&bytes, Some(target));
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": UNSIGNED_SHORT,
            "count": data.len() / components,
            "type": kind,
        }));
        self.accessors.len() - 1
    }

    fn finish(mut self, mut document: Value) -> Vec<u8> {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        document["asset"] = json!({ "version": "2.0", "generator": "vitrine fixtures" });
        document["buffers"] = json!([{ "byteLength": self.bin.len() }]);
        document["bufferViews"] = Value::Array(self.views);
        document["accessors"] = Value::Array(self.accessors);

        let mut json_chunk = serde_json::to_vec(&document).expect("fixture JSON serializes");
        while json_chunk.len() % 4 != 0 {
            json_chunk.push(b' ');
        }

        let total = 12 + 8 + json_chunk.len() + 8 + self.bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
        out.extend_from_slice(&json_chunk);
        out.extend_from_slice(&(self.bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
        out.extend_from_slice(&self.bin);
        out
    }
}

fn triangle_mesh(builder: &mut GlbBuilder, skinned: bool) -> Value {
    let position = builder.push_floats(&TRIANGLE_POSITIONS, "VEC3", 3, Some(ARRAY_BUFFER), true);
    let normal = builder.push_floats(&TRIANGLE_NORMALS, "VEC3", 3, Some(ARRAY_BUFFER), false);
    let indices = builder.push_u16s(&[0, 1, 2], "SCALAR", 1, ELEMENT_ARRAY_BUFFER);
    let mut attributes = json!({ "POSITION": position, "NORMAL": normal });
    if skinned {
        let joints = builder.push_u16s(&[0; 12], "VEC4", 4, ARRAY_BUFFER);
        let weights = builder.push_floats(
            &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
            "VEC4",
            4,
            Some(ARRAY_BUFFER),
            false,
        );
        attributes["JOINTS_0"] = json!(joints);
        attributes["WEIGHTS_0"] = json!(weights);
    }
    json!({
        "name": "Triangle",
        "primitives": [{ "attributes": attributes, "indices": indices, "mode": 4 }],
    })
}

fn turntable_animation(builder: &mut GlbBuilder, node: usize, duration: f32) -> Value {
    let half = std::f32::consts::FRAC_PI_4;
    let times = builder.push_floats(&[0.0, duration], "SCALAR", 1, None, true);
    let rotations = builder.push_floats(
        &[0.0, 0.0, 0.0, 1.0, 0.0, half.sin(), 0.0, half.cos()],
        "VEC4",
        4,
        None,
        false,
    );
    json!({
        "name": ANIMATION_CLIP_NAME,
        "samplers": [{ "input": times, "output": rotations, "interpolation": "LINEAR" }],
        "channels": [{ "sampler": 0, "target": { "node": node, "path": "rotation" } }],
    })
}

fn skinned_document(builder: &mut GlbBuilder) -> Value {
    let mesh = triangle_mesh(builder, true);
    let identity: Vec<f32> = glam::Mat4::IDENTITY.to_cols_array().to_vec();
    let inverse_bind = builder.push_floats(&identity, "MAT4", 16, None, false);
    json!({
        "scene": 0,
        "scenes": [{ "nodes": [0, 1] }],
        "nodes": [
            { "name": MESH_NODE_NAME, "mesh": 0, "skin": 0 },
            { "name": JOINT_NODE_NAME, "translation": [0.0, 0.0, 0.0] },
        ],
        "meshes": [mesh],
        "skins": [{ "joints": [1], "inverseBindMatrices": inverse_bind, "skeleton": 1 }],
    })
}

/// One skinned triangle bound to a single joint node, no clips.
pub fn skinned_triangle_glb() -> Vec<u8> {
    let mut builder = GlbBuilder::default();
    let document = skinned_document(&mut builder);
    builder.finish(document)
}

/// The skinned triangle with an embedded turntable clip on the joint.
pub fn skinned_triangle_with_clip_glb(duration: f32) -> Vec<u8> {
    let mut builder = GlbBuilder::default();
    let mut document = skinned_document(&mut builder);
    let animation = turntable_animation(&mut builder, 1, duration);
    document["animations"] = json!([animation]);
    builder.finish(document)
}

/// A rigid triangle on a single node.
pub fn static_triangle_glb() -> Vec<u8> {
    let mut builder = GlbBuilder::default();
    let mesh = triangle_mesh(&mut builder, false);
    let document = json!({
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": MESH_NODE_NAME, "mesh": 0 }],
        "meshes": [mesh],
    });
    builder.finish(document)
}

/// Animation-only file: the joint node rotates 90 degrees about +Y over
/// `duration` seconds.
pub fn turntable_animation_glb(duration: f32) -> Vec<u8> {
    let mut builder = GlbBuilder::default();
    let animation = turntable_animation(&mut builder, 0, duration);
    let document = json!({
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": JOINT_NODE_NAME }],
        "animations": [animation],
    });
    builder.finish(document)
}
