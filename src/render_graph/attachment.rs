//! Logical render targets of a render graph

use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::backend::types::TextureFormat;
use crate::render_graph::pass::PassId;
use crate::resources::Texture;

/// Unique identifier for an attachment, an index into its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttachmentId(pub(crate) u32);

impl AttachmentId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    /// Hints guiding backing texture allocation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttachmentHints: u32 {
        /// 8 bit RGBA color.
        const FORMAT_RGBA = 1 << 0;
        /// 16 bit float RGBA color.
        const FORMAT_RGBA_HDR = 1 << 1;
        /// Depth buffer.
        const FORMAT_DEPTH = 1 << 2;
        /// Stencil bits, combined with depth.
        const FORMAT_STENCIL = 1 << 3;
        /// Never sampled by a later pass.
        const RENDER_ONLY = 1 << 4;
        /// Never shares backing storage with another attachment.
        const PERSISTENT = 1 << 5;
    }
}

impl AttachmentHints {
    pub fn texture_format(&self) -> TextureFormat {
        if self.contains(Self::FORMAT_DEPTH) {
            if self.contains(Self::FORMAT_STENCIL) {
                TextureFormat::Depth24Stencil8
            } else {
                TextureFormat::Depth32Float
            }
        } else if self.contains(Self::FORMAT_STENCIL) {
            TextureFormat::Depth24Stencil8
        } else if self.contains(Self::FORMAT_RGBA_HDR) {
            TextureFormat::Rgba16Float
        } else {
            TextureFormat::Rgba8Unorm
        }
    }

    pub fn is_depth(&self) -> bool {
        self.intersects(Self::FORMAT_DEPTH | Self::FORMAT_STENCIL)
    }

    pub fn is_persistent(&self) -> bool {
        self.contains(Self::PERSISTENT)
    }
}

/// Attachment dimensions, resolved against the screen at allocation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SizePolicy {
    /// Relative to screen size (1.0 = full screen)
    ScreenRelative { scale: f32 },
    /// Absolute size in pixels
    Fixed { width: u32, height: u32 },
}

impl Default for SizePolicy {
    fn default() -> Self {
        SizePolicy::ScreenRelative { scale: 1.0 }
    }
}

impl SizePolicy {
    /// Size in pixels, never smaller than 1x1
    pub fn resolve(&self, screen_width: u32, screen_height: u32) -> (u32, u32) {
        let (width, height) = match *self {
            SizePolicy::Fixed { width, height } => (width, height),
            SizePolicy::ScreenRelative { scale } => (
                (screen_width as f32 * scale) as u32,
                (screen_height as f32 * scale) as u32,
            ),
        };
        (width.max(1), height.max(1))
    }
}

/// A named logical render target
#[derive(Debug, Clone)]
pub struct Attachment {
    id: AttachmentId,
    name: String,
    hints: AttachmentHints,
    size: SizePolicy,
    pub(crate) producers: Vec<PassId>,
    pub(crate) consumers: Vec<PassId>,
    pub(crate) texture: Option<Arc<Texture>>,
}

impl Attachment {
    pub(crate) fn new(id: AttachmentId, name: &str, hints: AttachmentHints, size: SizePolicy) -> Self {
        Self {
            id,
            name: name.to_string(),
            hints,
            size,
            producers: Vec::new(),
            consumers: Vec::new(),
            texture: None,
        }
    }

    pub fn id(&self) -> AttachmentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hints(&self) -> AttachmentHints {
        self.hints
    }

    pub fn size(&self) -> SizePolicy {
        self.size
    }

    pub fn format(&self) -> TextureFormat {
        self.hints.texture_format()
    }

    /// Passes writing this attachment, in declaration order
    pub fn producers(&self) -> &[PassId] {
        &self.producers
    }

    /// Passes reading this attachment, in declaration order
    pub fn consumers(&self) -> &[PassId] {
        &self.consumers
    }

    /// Backing texture for the current frame, if allocated
    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.texture.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_formats() {
        assert_eq!(AttachmentHints::FORMAT_RGBA.texture_format(), TextureFormat::Rgba8Unorm);
        assert_eq!(AttachmentHints::FORMAT_RGBA_HDR.texture_format(), TextureFormat::Rgba16Float);
        assert_eq!(
            (AttachmentHints::FORMAT_DEPTH | AttachmentHints::RENDER_ONLY).texture_format(),
            TextureFormat::Depth32Float
        );
        assert_eq!(
            (AttachmentHints::FORMAT_DEPTH | AttachmentHints::FORMAT_STENCIL).texture_format(),
            TextureFormat::Depth24Stencil8
        );
    }

    #[test]
    fn test_size_policy_resolve() {
        assert_eq!(SizePolicy::default().resolve(1280, 720), (1280, 720));
        assert_eq!(SizePolicy::ScreenRelative { scale: 0.5 }.resolve(1280, 720), (640, 360));
        assert_eq!(SizePolicy::ScreenRelative { scale: 0.0 }.resolve(1280, 720), (1, 1));
        assert_eq!(
            SizePolicy::Fixed { width: 256, height: 128 }.resolve(1280, 720),
            (256, 128)
        );
    }
}
