//! Shader programs and their standard uniform locations

use std::collections::HashMap;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::resources::catalog::{GraphicsResource, ResourceKey, Uploadable};

/// Uniforms every pass knows how to feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardLocation {
    ProjectionMatrix,
    ViewMatrix,
    ModelMatrix,
    MaterialAmbient,
    MaterialDiffuse,
    MaterialSpecular,
    MaterialShininess,
    ColorMap,
    UseColorMap,
    DepthMap,
    NormalMap,
    NoiseMap,
    OcclusionMap,
    LightPosition,
    LightColor,
    LightDirection,
    ScreenSize,
}

impl StandardLocation {
    /// Uniform name used by the built-in programs
    pub fn default_name(&self) -> &'static str {
        match self {
            StandardLocation::ProjectionMatrix => "u_proj",
            StandardLocation::ViewMatrix => "u_view",
            StandardLocation::ModelMatrix => "u_model",
            StandardLocation::MaterialAmbient => "u_material_ambient",
            StandardLocation::MaterialDiffuse => "u_material_diffuse",
            StandardLocation::MaterialSpecular => "u_material_specular",
            StandardLocation::MaterialShininess => "u_material_shininess",
            StandardLocation::ColorMap => "u_color_map",
            StandardLocation::UseColorMap => "u_use_color_map",
            StandardLocation::DepthMap => "u_depth_map",
            StandardLocation::NormalMap => "u_normal_map",
            StandardLocation::NoiseMap => "u_noise_map",
            StandardLocation::OcclusionMap => "u_occlusion_map",
            StandardLocation::LightPosition => "u_light_position",
            StandardLocation::LightColor => "u_light_color",
            StandardLocation::LightDirection => "u_light_direction",
            StandardLocation::ScreenSize => "u_screen_size",
        }
    }

    pub const ALL: [StandardLocation; 17] = [
        StandardLocation::ProjectionMatrix,
        StandardLocation::ViewMatrix,
        StandardLocation::ModelMatrix,
        StandardLocation::MaterialAmbient,
        StandardLocation::MaterialDiffuse,
        StandardLocation::MaterialSpecular,
        StandardLocation::MaterialShininess,
        StandardLocation::ColorMap,
        StandardLocation::UseColorMap,
        StandardLocation::DepthMap,
        StandardLocation::NormalMap,
        StandardLocation::NoiseMap,
        StandardLocation::OcclusionMap,
        StandardLocation::LightPosition,
        StandardLocation::LightColor,
        StandardLocation::LightDirection,
        StandardLocation::ScreenSize,
    ];
}

/// A vertex + fragment program
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    key: ResourceKey,
    version: u64,
    name: String,
    vertex_source: String,
    fragment_source: String,
    locations: HashMap<StandardLocation, String>,
}

impl ShaderProgram {
    pub const UNLIT_TEXTURE: &'static str = "shaders/unlit_texture";
    pub const UNLIT_DIFFUSE: &'static str = "shaders/unlit_diffuse";
    pub const PHONG: &'static str = "shaders/phong";
    pub const GBUFFER: &'static str = "shaders/gbuffer";
    pub const SCREEN_TEXTURE: &'static str = "shaders/screen_texture";
    pub const DEFERRED_LIGHTING: &'static str = "shaders/deferred_lighting";
    pub const VIGNETTE: &'static str = "shaders/post/vignette";
    pub const TONEMAP: &'static str = "shaders/post/tonemap";
    pub const DEBUG_DEPTH: &'static str = "shaders/post/debug_depth";
    pub const SSAO: &'static str = "shaders/post/ssao";
    pub const SSAO_BLUR: &'static str = "shaders/post/ssao_blur";

    /// Program without any registered standard location
    pub fn new(name: &str, vertex_source: &str, fragment_source: &str) -> Self {
        Self {
            key: ResourceKey::next(),
            version: 0,
            name: name.to_string(),
            vertex_source: vertex_source.to_string(),
            fragment_source: fragment_source.to_string(),
            locations: HashMap::new(),
        }
    }

    /// Register every standard location under its default uniform name
    pub fn with_standard_locations(mut self) -> Self {
        for location in StandardLocation::ALL {
            self.locations
                .insert(location, location.default_name().to_string());
        }
        self
    }

    pub fn register_location(&mut self, location: StandardLocation, uniform: &str) {
        self.locations.insert(location, uniform.to_string());
    }

    /// Uniform name bound to a standard location, if the program uses it
    pub fn location(&self, location: StandardLocation) -> Option<&str> {
        self.locations.get(&location).map(String::as_str)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    /// Programs registered by [`crate::resources::Assets::with_builtins`]
    pub fn builtins() -> Vec<ShaderProgram> {
        [
            (Self::UNLIT_TEXTURE, MESH_VERTEX_SHADER, UNLIT_TEXTURE_FRAGMENT),
            (Self::UNLIT_DIFFUSE, MESH_VERTEX_SHADER, UNLIT_DIFFUSE_FRAGMENT),
            (Self::PHONG, MESH_VERTEX_SHADER, PHONG_FRAGMENT),
            (Self::GBUFFER, MESH_VERTEX_SHADER, GBUFFER_FRAGMENT),
            (Self::SCREEN_TEXTURE, SCREEN_VERTEX_SHADER, SCREEN_TEXTURE_FRAGMENT),
            (Self::DEFERRED_LIGHTING, SCREEN_VERTEX_SHADER, DEFERRED_LIGHTING_FRAGMENT),
            (Self::VIGNETTE, SCREEN_VERTEX_SHADER, VIGNETTE_FRAGMENT),
            (Self::TONEMAP, SCREEN_VERTEX_SHADER, TONEMAP_FRAGMENT),
            (Self::DEBUG_DEPTH, SCREEN_VERTEX_SHADER, DEBUG_DEPTH_FRAGMENT),
            (Self::SSAO, SCREEN_VERTEX_SHADER, SSAO_FRAGMENT),
            (Self::SSAO_BLUR, SCREEN_VERTEX_SHADER, SSAO_BLUR_FRAGMENT),
        ]
        .into_iter()
        .map(|(name, vs, fs)| ShaderProgram::new(name, vs, fs).with_standard_locations())
        .collect()
    }
}

impl GraphicsResource for ShaderProgram {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Program
    }

    fn key(&self) -> ResourceKey {
        self.key
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn size_in_bytes(&self) -> usize {
        self.vertex_source.len() + self.fragment_source.len()
    }
}

impl Uploadable for ShaderProgram {
    fn upload(&self, backend: &mut dyn GraphicsBackend, id: GpuId) -> BackendResult<()> {
        backend.compile_program(id, &self.vertex_source, &self.fragment_source)
    }
}

const MESH_VERTEX_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
}

@group(0) @binding(0) var<uniform> u_proj: mat4x4<f32>;
@group(0) @binding(1) var<uniform> u_view: mat4x4<f32>;
@group(1) @binding(0) var<uniform> u_model: mat4x4<f32>;

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    let world_pos = u_model * vec4<f32>(input.position, 1.0);
    output.clip_position = u_proj * u_view * world_pos;
    output.world_normal = normalize((u_model * vec4<f32>(input.normal, 0.0)).xyz);
    output.uv = input.uv;
    return output;
}
"#;

const SCREEN_VERTEX_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(2) uv: vec2<f32>) -> VertexOutput {
    var output: VertexOutput;
    output.clip_position = vec4<f32>(position.xy, 0.0, 1.0);
    output.uv = uv;
    return output;
}
"#;

const UNLIT_TEXTURE_FRAGMENT: &str = r#"
@group(2) @binding(0) var u_color_map: texture_2d<f32>;
@group(2) @binding(1) var u_sampler: sampler;
@group(2) @binding(2) var<uniform> u_material_diffuse: vec4<f32>;

@fragment
fn fs_main(@location(1) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(u_color_map, u_sampler, uv) * u_material_diffuse;
}
"#;

const UNLIT_DIFFUSE_FRAGMENT: &str = r#"
@group(2) @binding(0) var<uniform> u_material_diffuse: vec4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return u_material_diffuse;
}
"#;

const PHONG_FRAGMENT: &str = r#"
@group(2) @binding(0) var<uniform> u_material_ambient: vec4<f32>;
@group(2) @binding(1) var<uniform> u_material_diffuse: vec4<f32>;
@group(3) @binding(0) var<uniform> u_light_direction: vec4<f32>;
@group(3) @binding(1) var<uniform> u_light_color: vec4<f32>;

@fragment
fn fs_main(@location(0) world_normal: vec3<f32>) -> @location(0) vec4<f32> {
    let n_dot_l = max(dot(normalize(world_normal), -u_light_direction.xyz), 0.0);
    return u_material_ambient + u_material_diffuse * u_light_color * n_dot_l;
}
"#;

const GBUFFER_FRAGMENT: &str = r#"
@group(2) @binding(0) var<uniform> u_material_diffuse: vec4<f32>;

struct GBufferOutput {
    @location(0) albedo: vec4<f32>,
    @location(1) normal: vec4<f32>,
}

@fragment
fn fs_main(@location(0) world_normal: vec3<f32>) -> GBufferOutput {
    var output: GBufferOutput;
    output.albedo = u_material_diffuse;
    output.normal = vec4<f32>(normalize(world_normal) * 0.5 + 0.5, 1.0);
    return output;
}
"#;

const SCREEN_TEXTURE_FRAGMENT: &str = r#"
@group(0) @binding(0) var u_color_map: texture_2d<f32>;
@group(0) @binding(1) var u_sampler: sampler;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(u_color_map, u_sampler, uv);
}
"#;

const DEFERRED_LIGHTING_FRAGMENT: &str = r#"
@group(0) @binding(0) var u_color_map: texture_2d<f32>;
@group(0) @binding(1) var u_normal_map: texture_2d<f32>;
@group(0) @binding(2) var u_depth_map: texture_depth_2d;
@group(0) @binding(3) var u_sampler: sampler;
@group(1) @binding(0) var<uniform> u_light_position: vec4<f32>;
@group(1) @binding(1) var<uniform> u_light_color: vec4<f32>;
@group(1) @binding(2) var<uniform> u_light_direction: vec4<f32>;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let albedo = textureSample(u_color_map, u_sampler, uv);
    let normal = textureSample(u_normal_map, u_sampler, uv).xyz * 2.0 - 1.0;
    let n_dot_l = max(dot(normal, -u_light_direction.xyz), 0.0);
    return vec4<f32>(albedo.rgb * u_light_color.rgb * u_light_color.w * n_dot_l, 1.0);
}
"#;

const VIGNETTE_FRAGMENT: &str = r#"
@group(0) @binding(0) var u_color_map: texture_2d<f32>;
@group(0) @binding(1) var u_sampler: sampler;
@group(1) @binding(0) var<uniform> u_inner_cutoff: f32;
@group(1) @binding(1) var<uniform> u_outer_cutoff: f32;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let color = textureSample(u_color_map, u_sampler, uv);
    let d = distance(uv, vec2<f32>(0.5, 0.5));
    let factor = 1.0 - smoothstep(u_inner_cutoff, u_outer_cutoff, d);
    return vec4<f32>(color.rgb * factor, color.a);
}
"#;

const TONEMAP_FRAGMENT: &str = r#"
@group(0) @binding(0) var u_color_map: texture_2d<f32>;
@group(0) @binding(1) var u_sampler: sampler;
@group(1) @binding(0) var<uniform> u_exposure: f32;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let hdr = textureSample(u_color_map, u_sampler, uv).rgb * u_exposure;
    let mapped = hdr / (hdr + vec3<f32>(1.0));
    return vec4<f32>(pow(mapped, vec3<f32>(1.0 / 2.2)), 1.0);
}
"#;

const DEBUG_DEPTH_FRAGMENT: &str = r#"
@group(0) @binding(0) var u_depth_map: texture_depth_2d;
@group(0) @binding(1) var u_sampler: sampler;
@group(1) @binding(0) var<uniform> u_near: f32;
@group(1) @binding(1) var<uniform> u_far: f32;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let z = textureSample(u_depth_map, u_sampler, uv) * 2.0 - 1.0;
    let linear = (2.0 * u_near * u_far) / (u_far + u_near - z * (u_far - u_near));
    let v = linear / u_far;
    return vec4<f32>(v, v, v, 1.0);
}
"#;

const SSAO_FRAGMENT: &str = r#"
@group(0) @binding(0) var u_depth_map: texture_depth_2d;
@group(0) @binding(1) var u_noise_map: texture_2d<f32>;
@group(0) @binding(2) var u_normal_map: texture_2d<f32>;
@group(0) @binding(3) var u_sampler: sampler;
@group(1) @binding(0) var<uniform> u_proj: mat4x4<f32>;
@group(1) @binding(1) var<uniform> u_screen_size: vec2<f32>;
@group(1) @binding(2) var<uniform> u_radius: f32;
@group(1) @binding(3) var<uniform> u_occluder_bias: f32;
@group(1) @binding(4) var<uniform> u_attenuation_constant: f32;
@group(1) @binding(5) var<uniform> u_attenuation_linear: f32;
@group(1) @binding(6) var<uniform> u_noise_size: f32;
@group(1) @binding(7) var<uniform> u_use_normal_map: i32;

fn view_position(uv: vec2<f32>) -> vec3<f32> {
    let depth = textureSample(u_depth_map, u_sampler, uv);
    let ndc = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, depth, 1.0);
    let p = vec4<f32>(ndc.x / u_proj[0][0], ndc.y / u_proj[1][1], -1.0, 1.0);
    let z = u_proj[3][2] / (depth + u_proj[2][2]);
    return vec3<f32>(p.xy * -z, z);
}

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let origin = view_position(uv);
    var normal = normalize(cross(dpdx(origin), dpdy(origin)));
    if (u_use_normal_map != 0) {
        normal = textureSample(u_normal_map, u_sampler, uv).xyz * 2.0 - 1.0;
    }
    let noise_uv = uv * u_screen_size / u_noise_size;
    let rotation = textureSample(u_noise_map, u_sampler, noise_uv).xy * 2.0 - 1.0;

    var occlusion = 0.0;
    let offsets = array<vec2<f32>, 4>(vec2(1.0, 0.0), vec2(-1.0, 0.0), vec2(0.0, 1.0), vec2(0.0, -1.0));
    for (var i = 0; i < 4; i++) {
        let offset = reflect(offsets[i], rotation) * u_radius / u_screen_size;
        let sample = view_position(uv + offset);
        let to_sample = sample - origin;
        let distance = length(to_sample);
        let factor = max(dot(normal, to_sample / distance) - u_occluder_bias, 0.0);
        occlusion += factor / (u_attenuation_constant + u_attenuation_linear * distance);
    }
    let ao = 1.0 - occlusion / 4.0;
    return vec4<f32>(ao, ao, ao, 1.0);
}
"#;

const SSAO_BLUR_FRAGMENT: &str = r#"
@group(0) @binding(0) var u_color_map: texture_2d<f32>;
@group(0) @binding(1) var u_occlusion_map: texture_2d<f32>;
@group(0) @binding(2) var u_sampler: sampler;
@group(1) @binding(0) var<uniform> u_screen_size: vec2<f32>;
@group(1) @binding(1) var<uniform> u_blur_size: i32;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let texel = 1.0 / u_screen_size;
    let half = u_blur_size / 2;
    var sum = 0.0;
    for (var x = -half; x < u_blur_size - half; x++) {
        for (var y = -half; y < u_blur_size - half; y++) {
            sum += textureSample(u_occlusion_map, u_sampler, uv + vec2<f32>(f32(x), f32(y)) * texel).r;
        }
    }
    let ao = sum / f32(max(u_blur_size * u_blur_size, 1));
    let color = textureSample(u_color_map, u_sampler, uv);
    return vec4<f32>(color.rgb * ao, color.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_locations() {
        let program = ShaderProgram::new("custom", "vs", "fs");
        assert_eq!(program.location(StandardLocation::ModelMatrix), None);

        let program = program.with_standard_locations();
        assert_eq!(program.location(StandardLocation::ModelMatrix), Some("u_model"));
    }

    #[test]
    fn test_builtins_have_unique_names() {
        let builtins = ShaderProgram::builtins();
        let mut names: Vec<_> = builtins.iter().map(|p| p.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), builtins.len());
        assert!(builtins
            .iter()
            .all(|p| !p.vertex_source().trim().is_empty() && !p.fragment_source().trim().is_empty()));
    }
}
