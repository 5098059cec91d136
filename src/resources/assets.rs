//! Asset storage shared by the scene, the render queue and the passes
//!
//! Assets are stored in per-type arenas and addressed with typed ids. The
//! store is created explicitly and passed by reference; there is no global
//! instance.

use std::collections::HashMap;

use crate::resources::material::Material;
use crate::resources::primitive::Primitive;
use crate::resources::program::ShaderProgram;
use crate::resources::texture::Texture;

macro_rules! asset_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }
    };
}

asset_id!(
    /// Handle to a [`Material`]
    MaterialId
);
asset_id!(
    /// Handle to a [`Primitive`]
    PrimitiveId
);
asset_id!(
    /// Handle to a [`Texture`]
    TextureId
);
asset_id!(
    /// Handle to a [`ShaderProgram`]
    ProgramId
);

/// Arena of materials, primitives, textures and programs
#[derive(Debug, Default)]
pub struct Assets {
    materials: Vec<Material>,
    primitives: Vec<Primitive>,
    textures: Vec<Texture>,
    programs: Vec<ShaderProgram>,
    named_programs: HashMap<String, ProgramId>,
    named_primitives: HashMap<String, PrimitiveId>,
}

impl Assets {
    /// Name of the full screen quad registered by [`Assets::with_builtins`]
    pub const SCREEN_QUAD: &'static str = "primitives/screen_quad";

    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the built-in programs and the screen quad registered
    pub fn with_builtins() -> Self {
        let mut assets = Self::new();
        for program in ShaderProgram::builtins() {
            let name = program.name().to_string();
            assets.add_named_program(&name, program);
        }
        assets.add_named_primitive(Self::SCREEN_QUAD, Primitive::screen_quad());
        assets
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() as u32 - 1)
    }

    pub fn add_primitive(&mut self, primitive: Primitive) -> PrimitiveId {
        self.primitives.push(primitive);
        PrimitiveId(self.primitives.len() as u32 - 1)
    }

    pub fn add_named_primitive(&mut self, name: &str, primitive: Primitive) -> PrimitiveId {
        let id = self.add_primitive(primitive);
        self.named_primitives.insert(name.to_string(), id);
        id
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() as u32 - 1)
    }

    pub fn add_program(&mut self, program: ShaderProgram) -> ProgramId {
        self.programs.push(program);
        ProgramId(self.programs.len() as u32 - 1)
    }

    /// Register a program that passes can look up by name
    pub fn add_named_program(&mut self, name: &str, program: ShaderProgram) -> ProgramId {
        let id = self.add_program(program);
        self.named_programs.insert(name.to_string(), id);
        id
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.index())
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.index())
    }

    pub fn primitive(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(id.index())
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.index())
    }

    pub fn texture_mut(&mut self, id: TextureId) -> Option<&mut Texture> {
        self.textures.get_mut(id.index())
    }

    pub fn program(&self, id: ProgramId) -> Option<&ShaderProgram> {
        self.programs.get(id.index())
    }

    pub fn program_id(&self, name: &str) -> Option<ProgramId> {
        self.named_programs.get(name).copied()
    }

    pub fn program_by_name(&self, name: &str) -> Option<&ShaderProgram> {
        self.program_id(name).and_then(|id| self.program(id))
    }

    pub fn primitive_by_name(&self, name: &str) -> Option<&Primitive> {
        self.named_primitives
            .get(name)
            .and_then(|id| self.primitive(*id))
    }

    /// Program used to draw a material: its own program, else the unlit
    /// texture program when it has a color map, else unlit diffuse.
    pub fn program_for(&self, material: &Material) -> Option<&ShaderProgram> {
        self.program_for_with_fallback(material, ShaderProgram::UNLIT_DIFFUSE)
    }

    /// Like [`Assets::program_for`] with a custom fallback for materials
    /// without a color map.
    pub fn program_for_with_fallback(
        &self,
        material: &Material,
        fallback: &str,
    ) -> Option<&ShaderProgram> {
        if let Some(program) = material.program {
            return self.program(program);
        }

        if material.color_map.is_some() {
            self.program_by_name(ShaderProgram::UNLIT_TEXTURE)
        } else {
            self.program_by_name(fallback)
        }
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i as u32), m))
    }

    pub fn primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives.iter()
    }

    pub fn textures(&self) -> impl Iterator<Item = &Texture> {
        self.textures.iter()
    }

    pub fn programs(&self) -> impl Iterator<Item = &ShaderProgram> {
        self.programs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let assets = Assets::with_builtins();
        assert!(assets.program_by_name(ShaderProgram::UNLIT_DIFFUSE).is_some());
        assert!(assets.program_by_name(ShaderProgram::DEFERRED_LIGHTING).is_some());
        assert!(assets.primitive_by_name(Assets::SCREEN_QUAD).is_some());
    }

    #[test]
    fn test_program_fallback() {
        let mut assets = Assets::with_builtins();
        let texture = assets.add_texture(Texture::white());
        let custom = assets.add_program(ShaderProgram::new("custom", "vs", "fs"));

        let plain = Material::default();
        let textured = Material::default().with_color_map(texture);
        let programmed = Material::default()
            .with_color_map(texture)
            .with_program(custom);

        assert_eq!(
            assets.program_for(&plain).map(|p| p.name()),
            Some(ShaderProgram::UNLIT_DIFFUSE)
        );
        assert_eq!(
            assets.program_for(&textured).map(|p| p.name()),
            Some(ShaderProgram::UNLIT_TEXTURE)
        );
        assert_eq!(assets.program_for(&programmed).map(|p| p.name()), Some("custom"));
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut assets = Assets::new();
        let a = assets.add_material(Material::new("a"));
        let b = assets.add_material(Material::new("b"));
        assert!(a < b);
        assert_eq!(assets.material(b).map(|m| m.name.as_str()), Some("b"));
    }
}
