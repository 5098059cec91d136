//! Frame buffer objects

use std::sync::Arc;

use crate::backend::types::*;
use crate::resources::catalog::{GraphicsResource, ResourceKey};
use crate::resources::texture::Texture;

/// A set of render target textures drawn to together.
///
/// The screen buffer is a frame buffer without attachments that represents
/// the default surface.
#[derive(Debug, Clone)]
pub struct FrameBufferObject {
    key: ResourceKey,
    name: String,
    width: u32,
    height: u32,
    colors: Vec<Arc<Texture>>,
    depth: Option<Arc<Texture>>,
    clear: ClearValue,
    screen: bool,
}

impl FrameBufferObject {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            key: ResourceKey::next(),
            name: name.to_string(),
            width,
            height,
            colors: Vec::new(),
            depth: None,
            clear: ClearValue::default(),
            screen: false,
        }
    }

    /// The default surface
    pub fn screen(width: u32, height: u32) -> Self {
        Self {
            screen: true,
            ..Self::new("screen", width, height)
        }
    }

    /// Attach a texture, routing depth formats to the depth slot
    pub fn attach(&mut self, texture: Arc<Texture>) {
        if texture.format().is_depth() {
            self.depth = Some(texture);
        } else {
            self.colors.push(texture);
        }
    }

    pub fn with_clear(mut self, clear: ClearValue) -> Self {
        self.clear = clear;
        self
    }

    pub fn set_clear(&mut self, clear: ClearValue) {
        self.clear = clear;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn colors(&self) -> &[Arc<Texture>] {
        &self.colors
    }

    pub fn depth(&self) -> Option<&Arc<Texture>> {
        self.depth.as_ref()
    }

    pub fn clear_value(&self) -> ClearValue {
        self.clear
    }

    pub fn is_screen(&self) -> bool {
        self.screen
    }

    /// Every attached texture, colors first
    pub fn attachments(&self) -> impl Iterator<Item = &Arc<Texture>> {
        self.colors.iter().chain(self.depth.iter())
    }
}

impl GraphicsResource for FrameBufferObject {
    fn kind(&self) -> ResourceKind {
        ResourceKind::FrameBuffer
    }

    fn key(&self) -> ResourceKey {
        self.key
    }

    // Attachments are fixed at creation
    fn version(&self) -> u64 {
        0
    }

    fn size_in_bytes(&self) -> usize {
        self.attachments().map(|t| t.size_in_bytes()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_routes_depth() {
        let mut fbo = FrameBufferObject::new("gbuffer", 8, 8);
        fbo.attach(Arc::new(Texture::render_target("depth", 8, 8, TextureFormat::Depth32Float)));
        fbo.attach(Arc::new(Texture::render_target("color", 8, 8, TextureFormat::Rgba8Unorm)));

        assert_eq!(fbo.colors().len(), 1);
        assert!(fbo.depth().is_some());
        assert_eq!(fbo.attachments().count(), 2);
        assert_eq!(fbo.size_in_bytes(), 8 * 8 * 4 * 2);
    }

    #[test]
    fn test_screen_buffer() {
        let screen = FrameBufferObject::screen(640, 480);
        assert!(screen.is_screen());
        assert_eq!(screen.attachments().count(), 0);
    }
}
