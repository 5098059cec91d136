//! Renderer backed by resource catalogs

use glam::Mat4;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::RenderResult;
use crate::renderer::{Renderer, RendererState};
use crate::resources::{
    Assets, BufferObject, Catalog, CatalogStats, FrameBufferObject, GraphicsResource, Material,
    Primitive, ShaderProgram, StandardLocation, Texture,
};

/// One catalog per kind of GPU object
#[derive(Debug)]
pub struct Catalogs {
    vertex_buffers: Catalog,
    index_buffers: Catalog,
    instanced_buffers: Catalog,
    textures: Catalog,
    frame_buffers: Catalog,
    programs: Catalog,
}

impl Catalogs {
    pub fn new() -> Self {
        Self {
            vertex_buffers: Catalog::new(ResourceKind::VertexBuffer),
            index_buffers: Catalog::new(ResourceKind::IndexBuffer),
            instanced_buffers: Catalog::new(ResourceKind::InstancedBuffer),
            textures: Catalog::new(ResourceKind::Texture),
            frame_buffers: Catalog::new(ResourceKind::FrameBuffer),
            programs: Catalog::new(ResourceKind::Program),
        }
    }

    pub fn get(&self, kind: ResourceKind) -> &Catalog {
        match kind {
            ResourceKind::VertexBuffer => &self.vertex_buffers,
            ResourceKind::IndexBuffer => &self.index_buffers,
            ResourceKind::InstancedBuffer => &self.instanced_buffers,
            ResourceKind::Texture => &self.textures,
            ResourceKind::FrameBuffer => &self.frame_buffers,
            ResourceKind::Program => &self.programs,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut Catalog {
        match kind {
            ResourceKind::VertexBuffer => &mut self.vertex_buffers,
            ResourceKind::IndexBuffer => &mut self.index_buffers,
            ResourceKind::InstancedBuffer => &mut self.instanced_buffers,
            ResourceKind::Texture => &mut self.textures,
            ResourceKind::FrameBuffer => &mut self.frame_buffers,
            ResourceKind::Program => &mut self.programs,
        }
    }

    /// Frame buffers go first so they never outlive their attachments
    pub fn cleanup(&mut self, backend: &mut dyn GraphicsBackend) {
        for catalog in [
            &mut self.frame_buffers,
            &mut self.textures,
            &mut self.vertex_buffers,
            &mut self.index_buffers,
            &mut self.instanced_buffers,
            &mut self.programs,
        ] {
            catalog.cleanup(backend);
        }
    }
}

impl Default for Catalogs {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Renderer`] implementation forwarding to a [`GraphicsBackend`]
pub struct CatalogRenderer<B: GraphicsBackend> {
    backend: B,
    catalogs: Catalogs,
    screen_buffer: FrameBufferObject,
    state: RendererState,
}

impl<B: GraphicsBackend> CatalogRenderer<B> {
    pub fn new(backend: B) -> Self {
        let (width, height) = backend.surface_size();
        log::info!("Renderer created on {} backend ({}x{})", backend.name(), width, height);

        Self {
            backend,
            catalogs: Catalogs::new(),
            screen_buffer: FrameBufferObject::screen(width, height),
            state: RendererState::default(),
        }
    }

    /// Clear color used when the screen buffer is bound
    pub fn set_clear_value(&mut self, clear: ClearValue) {
        self.screen_buffer.set_clear(clear);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    fn program_id(&self, program: &ShaderProgram) -> Option<GpuId> {
        self.catalogs.programs.catalog_id(program)
    }

    /// Bind the primitive buffers, draw, then unbind them even when the
    /// draw fails
    fn draw_geometry(&mut self, primitive: &Primitive, instances: Option<&BufferObject>) -> RenderResult<()> {
        let result = self.issue_draw(primitive, instances);

        let catalogs = &mut self.catalogs;
        catalogs.instanced_buffers.unbind(&mut self.backend, instances);
        catalogs.index_buffers.unbind(&mut self.backend, primitive.index_buffer());
        catalogs
            .vertex_buffers
            .unbind(&mut self.backend, Some(primitive.vertex_buffer()));
        result
    }

    fn issue_draw(&mut self, primitive: &Primitive, instances: Option<&BufferObject>) -> RenderResult<()> {
        let catalogs = &mut self.catalogs;
        let vertices = primitive.vertex_buffer();
        catalogs.vertex_buffers.load_if_dirty(&mut self.backend, vertices)?;
        catalogs.vertex_buffers.bind(&mut self.backend, Some(vertices))?;

        if let Some(instances) = instances {
            catalogs.instanced_buffers.load_if_dirty(&mut self.backend, instances)?;
            catalogs.instanced_buffers.bind(&mut self.backend, Some(instances))?;
        }

        let (indexed, count) = match primitive.index_buffer() {
            Some(indices) => {
                catalogs.index_buffers.load_if_dirty(&mut self.backend, indices)?;
                catalogs.index_buffers.bind(&mut self.backend, Some(indices))?;
                (true, indices.count())
            }
            None => (false, vertices.count()),
        };

        let topology = primitive.topology;
        match instances {
            Some(instances) => self
                .backend
                .draw_instanced(topology, count, indexed, instances.count())?,
            None if indexed => self.backend.draw_indexed(topology, count)?,
            None => self.backend.draw_arrays(topology, count)?,
        }
        Ok(())
    }
}

impl<B: GraphicsBackend> Renderer for CatalogRenderer<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn screen_size(&self) -> (u32, u32) {
        (self.screen_buffer.width(), self.screen_buffer.height())
    }

    fn resize(&mut self, width: u32, height: u32) {
        log::debug!("Renderer resized to {}x{}", width, height);
        self.backend.resize(width, height);
        self.screen_buffer.resize(width, height);
    }

    fn screen_buffer(&self) -> &FrameBufferObject {
        &self.screen_buffer
    }

    fn bind_frame_buffer(&mut self, fbo: Option<&FrameBufferObject>) -> RenderResult<()> {
        let Some(fbo) = fbo else {
            return Ok(());
        };

        let id = if fbo.is_screen() {
            None
        } else {
            let mut colors = Vec::with_capacity(fbo.colors().len());
            for texture in fbo.colors() {
                colors.push(
                    self.catalogs
                        .textures
                        .load_if_dirty(&mut self.backend, texture.as_ref())?,
                );
            }
            let depth = match fbo.depth() {
                Some(texture) => Some(
                    self.catalogs
                        .textures
                        .load_if_dirty(&mut self.backend, texture.as_ref())?,
                ),
                None => None,
            };

            let frame_buffers = &mut self.catalogs.frame_buffers;
            if frame_buffers.is_dirty(fbo) {
                frame_buffers.load_with(&mut self.backend, Some(fbo), |backend, id| {
                    backend.attach_frame_buffer(id, &colors, depth)
                })?;
            }
            Some(frame_buffers.identity(&mut self.backend, fbo)?)
        };

        self.backend
            .bind_frame_buffer(id, fbo.width(), fbo.height(), fbo.clear_value());
        self.state.frame_buffer = Some(fbo.key());
        Ok(())
    }

    fn unbind_frame_buffer(&mut self, fbo: Option<&FrameBufferObject>) {
        let Some(fbo) = fbo else {
            return;
        };

        if self.state.frame_buffer == Some(fbo.key()) {
            self.backend.unbind_object(ResourceKind::FrameBuffer);
            self.state.frame_buffer = None;
        }
    }

    fn bind_program(&mut self, program: Option<&ShaderProgram>) -> RenderResult<()> {
        let Some(program) = program else {
            return Ok(());
        };

        let programs = &mut self.catalogs.programs;
        programs.load_if_dirty(&mut self.backend, program)?;
        programs.bind(&mut self.backend, Some(program))?;
        self.state.program = Some(program.key());
        Ok(())
    }

    fn unbind_program(&mut self, program: Option<&ShaderProgram>) {
        let Some(program) = program else {
            return;
        };

        self.catalogs.programs.unbind(&mut self.backend, Some(program));
        if self.state.program == Some(program.key()) {
            self.state.program = None;
        }
    }

    fn bind_material(
        &mut self,
        program: &ShaderProgram,
        material: &Material,
        assets: &Assets,
    ) -> RenderResult<()> {
        self.bind_uniform(program, StandardLocation::MaterialAmbient, UniformValue::Vec4(material.ambient));
        self.bind_uniform(program, StandardLocation::MaterialDiffuse, UniformValue::Vec4(material.diffuse));
        self.bind_uniform(program, StandardLocation::MaterialSpecular, UniformValue::Vec4(material.specular));
        self.bind_uniform(program, StandardLocation::MaterialShininess, UniformValue::Float(material.shininess));

        let color_map = material.color_map.and_then(|id| assets.texture(id));
        if material.color_map.is_some() && color_map.is_none() {
            log::warn!("Material '{}' references a missing color map", material.name);
        }

        match color_map {
            Some(texture) => {
                self.bind_texture(program, StandardLocation::ColorMap, 0, texture)?;
                self.bind_uniform(program, StandardLocation::UseColorMap, UniformValue::Int(1));
            }
            None => {
                self.bind_uniform(program, StandardLocation::UseColorMap, UniformValue::Int(0));
            }
        }

        self.set_alpha_state(material.alpha_state);
        self.set_depth_state(material.depth_state);
        Ok(())
    }

    fn unbind_material(&mut self, _program: &ShaderProgram, material: &Material, assets: &Assets) {
        let color_map = material.color_map.and_then(|id| assets.texture(id));
        self.unbind_texture(color_map);

        self.set_alpha_state(AlphaState::DISABLED);
        self.set_depth_state(DepthState::ENABLED);
    }

    fn bind_uniform(&mut self, program: &ShaderProgram, location: StandardLocation, value: UniformValue) {
        if let Some(name) = program.location(location) {
            self.bind_uniform_named(program, name, value);
        }
    }

    fn bind_uniform_named(&mut self, program: &ShaderProgram, name: &str, value: UniformValue) {
        match self.program_id(program) {
            Some(id) => self.backend.set_uniform(id, name, &value),
            None => log::warn!(
                "Uniform '{}' set on program '{}' which was never bound",
                name,
                program.name()
            ),
        }
    }

    fn bind_texture(
        &mut self,
        program: &ShaderProgram,
        location: StandardLocation,
        unit: u32,
        texture: &Texture,
    ) -> RenderResult<()> {
        let textures = &mut self.catalogs.textures;
        let id = textures.load_if_dirty(&mut self.backend, texture)?;
        textures.bind(&mut self.backend, Some(texture))?;
        self.bind_uniform(program, location, UniformValue::Sampler { unit, texture: id });
        Ok(())
    }

    fn unbind_texture(&mut self, texture: Option<&Texture>) {
        self.catalogs.textures.unbind(&mut self.backend, texture);
    }

    fn set_depth_state(&mut self, state: DepthState) {
        self.backend.set_depth_state(state);
        self.state.depth = state;
    }

    fn set_alpha_state(&mut self, state: AlphaState) {
        self.backend.set_alpha_state(state);
        self.state.alpha = state;
    }

    fn draw_primitive(
        &mut self,
        program: &ShaderProgram,
        primitive: &Primitive,
        world: &Mat4,
    ) -> RenderResult<()> {
        self.bind_uniform(program, StandardLocation::ModelMatrix, UniformValue::Mat4(*world));
        self.draw_geometry(primitive, None)
    }

    fn draw_primitive_instanced(
        &mut self,
        program: &ShaderProgram,
        primitive: &Primitive,
        instances: &BufferObject,
    ) -> RenderResult<()> {
        if instances.count() == 0 {
            return Ok(());
        }
        self.bind_uniform(program, StandardLocation::ModelMatrix, UniformValue::Mat4(Mat4::IDENTITY));
        self.draw_geometry(primitive, Some(instances))
    }

    fn unload_texture(&mut self, texture: Option<&Texture>) {
        self.catalogs.textures.unload(texture);
    }

    fn unload_frame_buffer(&mut self, fbo: Option<&FrameBufferObject>) {
        let Some(fbo) = fbo else {
            return;
        };

        if self.state.frame_buffer == Some(fbo.key()) {
            log::warn!("Unloading frame buffer '{}' while it is bound", fbo.name());
            self.unbind_frame_buffer(Some(fbo));
        }

        self.catalogs.frame_buffers.unload(Some(fbo));
        for texture in fbo.attachments() {
            self.catalogs.textures.unload(Some(texture.as_ref()));
        }
    }

    fn unload_primitive(&mut self, primitive: Option<&Primitive>) {
        let Some(primitive) = primitive else {
            return;
        };

        self.catalogs
            .vertex_buffers
            .unload(Some(primitive.vertex_buffer()));
        self.catalogs.index_buffers.unload(primitive.index_buffer());
    }

    fn unload_program(&mut self, program: Option<&ShaderProgram>) {
        self.catalogs.programs.unload(program);
    }

    fn unload_instances(&mut self, instances: Option<&BufferObject>) {
        self.catalogs.instanced_buffers.unload(instances);
    }

    fn cleanup(&mut self) {
        self.catalogs.cleanup(&mut self.backend);
    }

    fn state(&self) -> RendererState {
        self.state
    }

    fn catalog_stats(&self, kind: ResourceKind) -> CatalogStats {
        self.catalogs.get(kind).stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::{BackendCommand, FailurePoint, HeadlessBackend};
    use std::sync::Arc;

    fn renderer() -> CatalogRenderer<HeadlessBackend> {
        CatalogRenderer::new(HeadlessBackend::new(320, 240))
    }

    #[test]
    fn test_bind_program_compiles_once() {
        let mut renderer = renderer();
        let program = ShaderProgram::new("p", "vs", "fs").with_standard_locations();

        renderer.bind_program(Some(&program)).unwrap();
        renderer.unbind_program(Some(&program));
        renderer.bind_program(Some(&program)).unwrap();

        let compiles = renderer
            .backend()
            .commands()
            .iter()
            .filter(|c| matches!(c, BackendCommand::CompileProgram(_)))
            .count();
        assert_eq!(compiles, 1);
        assert_eq!(renderer.state().program, Some(program.key()));
    }

    #[test]
    fn test_frame_buffer_attaches_textures() {
        let mut renderer = renderer();
        let mut fbo = FrameBufferObject::new("target", 320, 240);
        fbo.attach(Arc::new(Texture::render_target("depth", 320, 240, TextureFormat::Depth32Float)));
        fbo.attach(Arc::new(Texture::render_target("color", 320, 240, TextureFormat::Rgba8Unorm)));

        renderer.bind_frame_buffer(Some(&fbo)).unwrap();
        assert_eq!(renderer.state().frame_buffer, Some(fbo.key()));
        assert_eq!(renderer.backend().live_count(ResourceKind::Texture), 2);
        assert!(renderer
            .backend()
            .commands()
            .iter()
            .any(|c| matches!(c, BackendCommand::AttachFrameBuffer { colors, depth: Some(_), .. } if colors.len() == 1)));

        renderer.unbind_frame_buffer(Some(&fbo));
        assert_eq!(renderer.state().frame_buffer, None);
    }

    #[test]
    fn test_unload_frame_buffer_releases_attachments() {
        let mut renderer = renderer();
        let mut fbo = FrameBufferObject::new("target", 320, 240);
        fbo.attach(Arc::new(Texture::render_target("color", 320, 240, TextureFormat::Rgba8Unorm)));

        renderer.bind_frame_buffer(Some(&fbo)).unwrap();
        renderer.unbind_frame_buffer(Some(&fbo));
        renderer.unload_frame_buffer(Some(&fbo));

        assert_eq!(renderer.catalog_stats(ResourceKind::Texture).pending_deletion, 1);
        renderer.cleanup();

        assert_eq!(renderer.backend().live_count(ResourceKind::Texture), 0);
        assert_eq!(renderer.backend().live_count(ResourceKind::FrameBuffer), 0);
    }

    #[test]
    fn test_draw_indexed_primitive() {
        let mut renderer = renderer();
        let program = ShaderProgram::new("p", "vs", "fs").with_standard_locations();
        let cube = Primitive::cube();

        renderer.bind_program(Some(&program)).unwrap();
        renderer
            .draw_primitive(&program, &cube, &Mat4::IDENTITY)
            .unwrap();

        assert!(renderer.backend().commands().contains(&BackendCommand::DrawIndexed {
            topology: PrimitiveTopology::TriangleList,
            count: 36,
        }));
    }

    #[test]
    fn test_draw_failure_propagates() {
        let mut renderer = renderer();
        renderer.backend_mut().inject_failure(FailurePoint::Draw);
        let program = ShaderProgram::new("p", "vs", "fs");

        renderer.bind_program(Some(&program)).unwrap();
        assert!(renderer
            .draw_primitive(&program, &Primitive::screen_quad(), &Mat4::IDENTITY)
            .is_err());
    }

    #[test]
    fn test_failed_draw_unbinds_buffers() {
        let mut renderer = renderer();
        renderer.backend_mut().inject_failure(FailurePoint::Draw);
        let program = ShaderProgram::new("p", "vs", "fs");

        renderer.bind_program(Some(&program)).unwrap();
        assert!(renderer
            .draw_primitive(&program, &Primitive::cube(), &Mat4::IDENTITY)
            .is_err());

        let commands = renderer.backend().commands();
        assert!(commands.contains(&BackendCommand::Unbind(ResourceKind::VertexBuffer)));
        assert!(commands.contains(&BackendCommand::Unbind(ResourceKind::IndexBuffer)));
    }

    #[test]
    fn test_instanced_draw_uploads_instances_once() {
        let mut renderer = renderer();
        let program = ShaderProgram::new("p", "vs", "fs").with_standard_locations();
        let cube = Primitive::cube();
        let instances = BufferObject::instanced(&[Mat4::IDENTITY, Mat4::from_translation(glam::Vec3::X)]);

        renderer.bind_program(Some(&program)).unwrap();
        for _ in 0..2 {
            renderer
                .draw_primitive_instanced(&program, &cube, &instances)
                .unwrap();
        }

        let commands = renderer.backend().commands();
        let uploads = commands
            .iter()
            .filter(|c| matches!(c, BackendCommand::UploadBuffer { kind: ResourceKind::InstancedBuffer, size: 128, .. }))
            .count();
        assert_eq!(uploads, 1);
        assert!(commands.contains(&BackendCommand::DrawInstanced {
            topology: PrimitiveTopology::TriangleList,
            count: 36,
            indexed: true,
            instances: 2,
        }));
        assert_eq!(renderer.backend().draw_count(), 2);
        assert_eq!(renderer.catalog_stats(ResourceKind::InstancedBuffer).resident, 1);
    }

    #[test]
    fn test_instanced_strip_and_release() {
        let mut renderer = renderer();
        let program = ShaderProgram::new("p", "vs", "fs");
        let quad = Primitive::screen_quad();
        let mut instances = BufferObject::instanced(&[Mat4::IDENTITY; 3]);

        renderer.bind_program(Some(&program)).unwrap();
        renderer
            .draw_primitive_instanced(&program, &quad, &instances)
            .unwrap();
        assert_eq!(
            renderer.backend().commands().last(),
            Some(&BackendCommand::Unbind(ResourceKind::VertexBuffer))
        );
        assert!(renderer.backend().commands().contains(&BackendCommand::DrawInstanced {
            topology: PrimitiveTopology::TriangleStrip,
            count: 4,
            indexed: false,
            instances: 3,
        }));

        // No instances, nothing to draw
        instances.update::<Mat4>(&[]);
        renderer
            .draw_primitive_instanced(&program, &quad, &instances)
            .unwrap();
        assert_eq!(renderer.backend().draw_count(), 1);

        renderer.unload_instances(Some(&instances));
        renderer.cleanup();
        assert_eq!(renderer.backend().live_count(ResourceKind::InstancedBuffer), 0);
    }

    #[test]
    fn test_material_binding_restores_state() {
        let mut renderer = renderer();
        let mut assets = Assets::with_builtins();
        let texture = assets.add_texture(Texture::white());
        let material = Material::glass().with_color_map(texture);
        let program = ShaderProgram::new("p", "vs", "fs").with_standard_locations();

        renderer.bind_program(Some(&program)).unwrap();
        renderer.bind_material(&program, &material, &assets).unwrap();
        assert_eq!(renderer.state().alpha, AlphaState::ENABLED);

        renderer.unbind_material(&program, &material, &assets);
        assert_eq!(renderer.state(), RendererState {
            program: Some(program.key()),
            ..RendererState::default()
        });
    }

    #[test]
    fn test_null_arguments_are_no_ops() {
        let mut renderer = renderer();
        renderer.bind_frame_buffer(None).unwrap();
        renderer.bind_program(None).unwrap();
        renderer.unload_texture(None);
        renderer.unload_primitive(None);
        renderer.unload_frame_buffer(None);

        assert!(renderer.backend().commands().is_empty());
    }
}
