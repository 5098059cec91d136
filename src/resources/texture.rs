//! CPU-side textures

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::resources::catalog::{GraphicsResource, ResourceKey, Uploadable};

/// Texture owned by the application or by a render graph
///
/// Render targets carry no pixel data; the backend only allocates storage.
#[derive(Debug)]
pub struct Texture {
    key: ResourceKey,
    version: u64,
    desc: TextureDescriptor,
    data: Option<Vec<u8>>,
}

impl Texture {
    pub fn new(name: &str, width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Self {
        Self {
            key: ResourceKey::next(),
            version: 0,
            desc: TextureDescriptor {
                label: Some(name.to_string()),
                width,
                height,
                format,
                render_target: false,
            },
            data: Some(data),
        }
    }

    /// Storage-only texture used as a frame buffer attachment
    pub fn render_target(name: &str, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            key: ResourceKey::next(),
            version: 0,
            desc: TextureDescriptor::render_target(name, width, height, format),
            data: None,
        }
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self::new(name, 1, 1, TextureFormat::Rgba8Unorm, color.to_vec())
    }

    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], "white")
    }

    /// Create a checkerboard texture with 8x8 cells
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                data.extend_from_slice(if is_even { &color1 } else { &color2 });
            }
        }

        Self::new("checkerboard", size, size, TextureFormat::Rgba8Unorm, data)
    }

    /// Tileable `size` x `size` texture of unit rotation vectors packed into
    /// red and green. Texels step around the circle by the golden angle so
    /// neighbors never share a direction.
    pub fn rotation_noise(size: u32) -> Self {
        const GOLDEN_ANGLE: f32 = 2.399_963;
        let size = size.max(1);
        let data = (0..size * size)
            .flat_map(|i| {
                let (sin, cos) = (i as f32 * GOLDEN_ANGLE).sin_cos();
                let pack = |v: f32| ((v * 0.5 + 0.5) * 255.0).round() as u8;
                [pack(cos), pack(sin), 0, 255]
            })
            .collect();

        Self::new("rotation noise", size, size, TextureFormat::Rgba8Unorm, data)
    }

    pub fn name(&self) -> &str {
        self.desc.label.as_deref().unwrap_or("texture")
    }

    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.desc
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Replace pixel data, marking the texture dirty
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = Some(data);
        self.version += 1;
    }
}

impl GraphicsResource for Texture {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Texture
    }

    fn key(&self) -> ResourceKey {
        self.key
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn size_in_bytes(&self) -> usize {
        self.desc.size_in_bytes()
    }
}

impl Uploadable for Texture {
    fn upload(&self, backend: &mut dyn GraphicsBackend, id: GpuId) -> BackendResult<()> {
        backend.upload_texture(id, &self.desc, self.data.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkerboard_layout() {
        let tex = Texture::checkerboard(16, [255; 4], [0, 0, 0, 255]);
        let data = tex.data().unwrap();
        assert_eq!(data.len(), 16 * 16 * 4);
        assert_eq!(&data[0..4], &[255; 4]);
        // Cell (1, 0) starts at x = 8
        assert_eq!(&data[8 * 4..8 * 4 + 4], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_rotation_noise() {
        let tex = Texture::rotation_noise(4);
        let data = tex.data().unwrap();
        assert_eq!((tex.width(), tex.height()), (4, 4));
        assert_eq!(data.len(), 4 * 4 * 4);
        // First texel points along +x
        assert_eq!(&data[0..4], &[255, 128, 0, 255]);
        assert_ne!(&data[0..2], &data[4..6]);

        assert_eq!(Texture::rotation_noise(0).width(), 1);
    }

    #[test]
    fn test_set_data_bumps_version() {
        let mut tex = Texture::white();
        let before = tex.version();
        tex.set_data(vec![0, 0, 0, 255]);
        assert_eq!(tex.version(), before + 1);
    }

    #[test]
    fn test_render_target_has_no_data() {
        let tex = Texture::render_target("color", 64, 32, TextureFormat::Rgba16Float);
        assert!(tex.data().is_none());
        assert_eq!(tex.size_in_bytes(), 64 * 32 * 8);
    }
}
