//! Common types shared between the renderer and backends

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Backend-side identity of a GPU object (buffer name, texture name...).
///
/// Identities are only meaningful together with the [`ResourceKind`] they were
/// generated for; a buffer and a texture may share the same numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GpuId(pub u32);

/// Kind of GPU object managed by a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    VertexBuffer,
    IndexBuffer,
    InstancedBuffer,
    Texture,
    FrameBuffer,
    Program,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::VertexBuffer,
        ResourceKind::IndexBuffer,
        ResourceKind::InstancedBuffer,
        ResourceKind::Texture,
        ResourceKind::FrameBuffer,
        ResourceKind::Program,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::VertexBuffer => "vertex buffer",
            ResourceKind::IndexBuffer => "index buffer",
            ResourceKind::InstancedBuffer => "instanced buffer",
            ResourceKind::Texture => "texture",
            ResourceKind::FrameBuffer => "frame buffer",
            ResourceKind::Program => "program",
        }
    }
}

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    #[default]
    Rgba8Unorm,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    Depth24Stencil8,
    Depth32Float,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth24Stencil8 | TextureFormat::Depth32Float
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::Depth24Stencil8)
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::R32Float
            | TextureFormat::Depth24Stencil8
            | TextureFormat::Depth32Float => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

/// Texture descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// Render targets are never sampled from CPU data
    pub render_target: bool,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            render_target: false,
        }
    }
}

impl TextureDescriptor {
    pub fn render_target(label: &str, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: Some(label.to_string()),
            width,
            height,
            format,
            render_target: true,
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        (self.width * self.height * self.format.bytes_per_pixel()) as usize
    }
}

/// Depth test configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    pub enabled: bool,
    pub write: bool,
    pub compare: CompareFunction,
}

impl DepthState {
    pub const DISABLED: Self = Self {
        enabled: false,
        write: false,
        compare: CompareFunction::Always,
    };

    pub const ENABLED: Self = Self {
        enabled: true,
        write: true,
        compare: CompareFunction::Less,
    };

    /// Depth tested but not written, used for translucent geometry
    pub const READ_ONLY: Self = Self {
        enabled: true,
        write: false,
        compare: CompareFunction::LessEqual,
    };
}

impl Default for DepthState {
    fn default() -> Self {
        Self::ENABLED
    }
}

/// Compare function for depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Alpha blending configuration attached to materials and blend passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlphaState {
    pub enabled: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl AlphaState {
    pub const DISABLED: Self = Self {
        enabled: false,
        src: BlendFactor::One,
        dst: BlendFactor::Zero,
    };

    pub const ENABLED: Self = Self {
        enabled: true,
        src: BlendFactor::SrcAlpha,
        dst: BlendFactor::OneMinusSrcAlpha,
    };

    pub const ENABLED_ADDITIVE_BLEND: Self = Self {
        enabled: true,
        src: BlendFactor::One,
        dst: BlendFactor::One,
    };

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for AlphaState {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Clear value applied when a framebuffer is bound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValue {
    pub color: Vec4,
    pub depth: f32,
}

impl Default for ClearValue {
    fn default() -> Self {
        Self {
            color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            depth: 1.0,
        }
    }
}

/// Value bound to a shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    /// Texture identity bound to a sampler unit
    Sampler { unit: u32, texture: GpuId },
}

/// Standard vertex with position, normal and UV
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub const fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Light parameters as laid out for the deferred lighting program
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightUniformData {
    /// xyz = position, w = radius
    pub position: Vec4,
    /// xyz = color, w = intensity
    pub color_intensity: Vec4,
    /// xyz = direction, w = light type (0=point, 1=spot, 2=directional)
    pub direction_type: Vec4,
}
