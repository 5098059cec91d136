//! Material definitions

use glam::{Vec3, Vec4};

use crate::backend::types::{AlphaState, DepthState};
use crate::resources::assets::{ProgramId, TextureId};

/// Phong material with optional color map and custom program
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub shininess: f32,

    /// `None` lets passes pick a default program
    pub color_map: Option<TextureId>,
    pub program: Option<ProgramId>,

    pub alpha_state: AlphaState,
    pub depth_state: DepthState,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vec4::ONE,
            shininess: 50.0,
            color_map: None,
            program: None,
            alpha_state: AlphaState::DISABLED,
            depth_state: DepthState::ENABLED,
        }
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_diffuse(mut self, color: Vec4) -> Self {
        self.diffuse = color;
        self
    }

    pub fn with_ambient(mut self, color: Vec4) -> Self {
        self.ambient = color;
        self
    }

    pub fn with_color_map(mut self, texture: TextureId) -> Self {
        self.color_map = Some(texture);
        self
    }

    pub fn with_program(mut self, program: ProgramId) -> Self {
        self.program = Some(program);
        self
    }

    pub fn with_alpha_state(mut self, state: AlphaState) -> Self {
        self.alpha_state = state;
        self
    }

    pub fn with_depth_state(mut self, state: DepthState) -> Self {
        self.depth_state = state;
        self
    }

    /// Whether the material should be drawn after opaque geometry
    pub fn is_translucent(&self) -> bool {
        self.alpha_state.is_enabled() || self.program.is_some()
    }

    // Preset materials

    pub fn plastic(color: Vec3) -> Self {
        Self::new("plastic").with_diffuse(color.extend(1.0))
    }

    pub fn glass() -> Self {
        Self::new("glass")
            .with_diffuse(Vec4::new(1.0, 1.0, 1.0, 0.3))
            .with_alpha_state(AlphaState::ENABLED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction() {
        let material = Material::default();

        assert_eq!(material.ambient, Vec4::new(0.2, 0.2, 0.2, 1.0));
        assert_eq!(material.diffuse, Vec4::new(0.8, 0.8, 0.8, 1.0));
        assert_eq!(material.specular, Vec4::ONE);
        assert_eq!(material.shininess, 50.0);
        assert_eq!(material.color_map, None);
        assert_eq!(material.program, None);
        assert!(!material.is_translucent());
    }

    #[test]
    fn test_custom_program_is_translucent() {
        let material = Material::new("custom").with_program(ProgramId(3));
        assert!(material.is_translucent());
        assert!(Material::glass().is_translucent());
    }
}
