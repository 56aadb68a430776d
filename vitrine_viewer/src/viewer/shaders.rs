use once_cell::sync::Lazy;

/// Uniform block shared by the shadow and lit passes.
const FRAME_UNIFORMS: &str = r#"
struct FrameUniforms {
    view_proj: mat4x4<f32>,
    light_view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    // xyz: unit vector toward the key light
    light_direction: vec4<f32>,
    light_radiance: vec4<f32>,
    ambient_radiance: vec4<f32>,
    // x: exposure, y: tone mapping on, z: irradiance scale, w: encode sRGB
    params: vec4<f32>,
    // x: bias, y: texel size, z: receive shadows, w: shadows enabled
    shadow: vec4<f32>,
};

struct ModelUniforms {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
};
"#;

const SHADOW_BODY: &str = r#"
@group(0) @binding(0)
var<uniform> frame: FrameUniforms;
@group(1) @binding(0)
var<uniform> object: ModelUniforms;

@vertex
fn shadow_vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return frame.light_view_proj * object.model * vec4<f32>(position, 1.0);
}
"#;

const LIT_BODY: &str = r#"
const PI: f32 = 3.141592653589793;

struct MaterialUniforms {
    base_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> frame: FrameUniforms;
@group(0) @binding(1)
var shadow_map: texture_depth_2d;
@group(0) @binding(2)
var shadow_sampler: sampler_comparison;
@group(1) @binding(0)
var<uniform> object: ModelUniforms;
@group(2) @binding(0)
var<uniform> material: MaterialUniforms;
@group(2) @binding(1)
var base_texture: texture_2d<f32>;
@group(2) @binding(2)
var base_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) light_space: vec4<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let world = object.model * vec4<f32>(input.position, 1.0);
    var out: VertexOutput;
    out.clip = frame.view_proj * world;
    out.world_normal = (object.normal_matrix * vec4<f32>(input.normal, 0.0)).xyz;
    out.uv = input.uv;
    out.light_space = frame.light_view_proj * world;
    return out;
}

fn shadow_visibility(light_space: vec4<f32>) -> f32 {
    if (frame.shadow.w < 0.5 || frame.shadow.z < 0.5) {
        return 1.0;
    }
    let ndc = light_space.xyz / light_space.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    if (uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 || ndc.z > 1.0) {
        return 1.0;
    }
    let depth = ndc.z + frame.shadow.x;
    let texel = frame.shadow.y;
    var lit = 0.0;
    for (var y = -1; y <= 1; y = y + 1) {
        for (var x = -1; x <= 1; x = x + 1) {
            let offset = vec2<f32>(f32(x), f32(y)) * texel;
            lit = lit + textureSampleCompareLevel(shadow_map, shadow_sampler, uv + offset, depth);
        }
    }
    return lit / 9.0;
}

fn aces_filmic(color: vec3<f32>) -> vec3<f32> {
    let c = color * frame.params.x;
    let mapped = (c * (2.51 * c + 0.03)) / (c * (2.43 * c + 0.59) + 0.14);
    return clamp(mapped, vec3<f32>(0.0), vec3<f32>(1.0));
}

fn linear_to_srgb(color: vec3<f32>) -> vec3<f32> {
    let low = color * 12.92;
    let high = 1.055 * pow(color, vec3<f32>(1.0 / 2.4)) - 0.055;
    return select(high, low, color <= vec3<f32>(0.0031308));
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let albedo = material.base_color * textureSample(base_texture, base_sampler, input.uv);
    let normal = normalize(input.world_normal);
    let to_light = normalize(frame.light_direction.xyz);
    let n_dot_l = max(dot(normal, to_light), 0.0);
    let visibility = shadow_visibility(input.light_space);

    let irradiance_scale = frame.params.z;
    let direct = frame.light_radiance.rgb * n_dot_l * visibility * irradiance_scale;
    let ambient = frame.ambient_radiance.rgb * irradiance_scale;
    var color = albedo.rgb * (1.0 / PI) * (direct + ambient);

    if (frame.params.y > 0.5) {
        color = aces_filmic(color);
    } else {
        color = clamp(color * frame.params.x, vec3<f32>(0.0), vec3<f32>(1.0));
    }
    if (frame.params.w > 0.5) {
        color = linear_to_srgb(color);
    }
    return vec4<f32>(color * albedo.a, albedo.a);
}
"#;

pub(super) static SHADOW_SHADER_SOURCE: Lazy<String> =
    Lazy::new(|| format!("{FRAME_UNIFORMS}{SHADOW_BODY}"));

pub(super) static LIT_SHADER_SOURCE: Lazy<String> =
    Lazy::new(|| format!("{FRAME_UNIFORMS}{LIT_BODY}"));
