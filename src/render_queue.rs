//! Per-frame render queue
//!
//! The queue is rebuilt every frame from the scene. Renderables are bucketed
//! (opaque, translucent, screen) and keyed by material and then primitive so
//! passes can bind each material and each primitive once.

use std::collections::BTreeMap;

use glam::Mat4;

use crate::resources::{Assets, Material, MaterialId, PrimitiveId};
use crate::scene::{Camera, GeometryId, Light};

/// Render queue bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderableType {
    Opaque,
    Translucent,
    Screen,
}

impl RenderableType {
    pub const ALL: [RenderableType; 3] = [
        RenderableType::Opaque,
        RenderableType::Translucent,
        RenderableType::Screen,
    ];
}

/// A draw request: what to draw, with which material, and where
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderable {
    pub material: MaterialId,
    pub primitive: PrimitiveId,
    pub geometry: GeometryId,
    pub world: Mat4,
}

/// Geometry instances of one primitive, in push order
pub type GeometryList = Vec<(GeometryId, Mat4)>;
pub type PrimitiveMap = BTreeMap<PrimitiveId, GeometryList>;
pub type MaterialMap = BTreeMap<MaterialId, PrimitiveMap>;

#[derive(Debug, Clone)]
pub struct RenderQueue {
    camera: Option<Camera>,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    lights: Vec<Light>,
    opaque: MaterialMap,
    translucent: MaterialMap,
    screen: MaterialMap,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self {
            camera: None,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            lights: Vec::new(),
            opaque: MaterialMap::new(),
            translucent: MaterialMap::new(),
            screen: MaterialMap::new(),
        }
    }

    /// Clear camera, lights and every bucket
    pub fn reset(&mut self) {
        self.set_camera(None);
        self.lights.clear();
        self.opaque.clear();
        self.translucent.clear();
        self.screen.clear();
    }

    /// Cache the camera matrices. `None` resets them to identity.
    pub fn set_camera(&mut self, camera: Option<&Camera>) {
        match camera {
            Some(camera) => {
                self.view_matrix = camera.view_matrix();
                self.projection_matrix = camera.projection_matrix();
                self.camera = Some(camera.clone());
            }
            None => {
                self.view_matrix = Mat4::IDENTITY;
                self.projection_matrix = Mat4::IDENTITY;
                self.camera = None;
            }
        }
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    /// Bucket a renderable goes to.
    ///
    /// Screen space wins over blending. A custom program counts as
    /// translucent since its depth behavior is unknown.
    pub fn classify(material: &Material, render_on_screen: bool) -> RenderableType {
        if render_on_screen {
            RenderableType::Screen
        } else if material.is_translucent() {
            RenderableType::Translucent
        } else {
            RenderableType::Opaque
        }
    }

    /// Queue a renderable. Returns the bucket it landed in, or `None` when
    /// its material doesn't exist.
    pub fn push(
        &mut self,
        assets: &Assets,
        renderable: Renderable,
        render_on_screen: bool,
    ) -> Option<RenderableType> {
        let Some(material) = assets.material(renderable.material) else {
            log::warn!(
                "Dropping renderable {:?}: unknown material {:?}",
                renderable.geometry,
                renderable.material
            );
            return None;
        };

        let kind = Self::classify(material, render_on_screen);
        self.bucket_mut(kind)
            .entry(renderable.material)
            .or_default()
            .entry(renderable.primitive)
            .or_default()
            .push((renderable.geometry, renderable.world));
        Some(kind)
    }

    /// Append a light; iteration follows insertion order
    pub fn push_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn each_light<F: FnMut(&Light, usize)>(&self, mut callback: F) {
        for (index, light) in self.lights.iter().enumerate() {
            callback(light, index);
        }
    }

    pub fn renderables(&self, kind: RenderableType) -> &MaterialMap {
        match kind {
            RenderableType::Opaque => &self.opaque,
            RenderableType::Translucent => &self.translucent,
            RenderableType::Screen => &self.screen,
        }
    }

    fn bucket_mut(&mut self, kind: RenderableType) -> &mut MaterialMap {
        match kind {
            RenderableType::Opaque => &mut self.opaque,
            RenderableType::Translucent => &mut self.translucent,
            RenderableType::Screen => &mut self.screen,
        }
    }

    /// Visit a bucket material by material, in material id order
    pub fn each<F: FnMut(MaterialId, &PrimitiveMap)>(&self, kind: RenderableType, mut callback: F) {
        for (material, primitives) in self.renderables(kind) {
            callback(*material, primitives);
        }
    }

    /// Visit a snapshot of a bucket while the callback may mutate the queue.
    ///
    /// Changes made by the callback are not seen by the running iteration.
    pub fn each_mut<F>(&mut self, kind: RenderableType, mut callback: F)
    where
        F: FnMut(&mut RenderQueue, MaterialId, &PrimitiveMap),
    {
        let snapshot = self.renderables(kind).clone();
        for (material, primitives) in &snapshot {
            callback(self, *material, primitives);
        }
    }

    /// Visit every queued renderable of a bucket
    pub fn each_renderable<F: FnMut(Renderable)>(&self, kind: RenderableType, mut callback: F) {
        self.each(kind, |material, primitives| {
            for (primitive, geometries) in primitives {
                for (geometry, world) in geometries {
                    callback(Renderable {
                        material,
                        primitive: *primitive,
                        geometry: *geometry,
                        world: *world,
                    });
                }
            }
        });
    }

    /// Number of geometry entries in a bucket
    pub fn count(&self, kind: RenderableType) -> usize {
        self.renderables(kind)
            .values()
            .flat_map(|primitives| primitives.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        RenderableType::ALL.iter().all(|kind| self.count(*kind) == 0) && self.lights.is_empty()
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::AlphaState;
    use crate::resources::{Primitive, ShaderProgram};
    use crate::scene::PointLight;
    use glam::Vec3;

    struct Fixture {
        assets: Assets,
        opaque: MaterialId,
        blended: MaterialId,
        custom: MaterialId,
        cube: PrimitiveId,
    }

    fn fixture() -> Fixture {
        let mut assets = Assets::with_builtins();
        let program = assets.add_program(ShaderProgram::new("custom", "vs", "fs"));
        Fixture {
            opaque: assets.add_material(Material::default()),
            blended: assets.add_material(Material::default().with_alpha_state(AlphaState::ENABLED)),
            custom: assets.add_material(Material::default().with_program(program)),
            cube: assets.add_primitive(Primitive::cube()),
            assets,
        }
    }

    fn renderable(material: MaterialId, primitive: PrimitiveId, geometry: u32) -> Renderable {
        Renderable {
            material,
            primitive,
            geometry: GeometryId(geometry),
            world: Mat4::from_translation(Vec3::new(geometry as f32, 0.0, 0.0)),
        }
    }

    #[test]
    fn test_classification_order() {
        let f = fixture();
        let mut queue = RenderQueue::new();

        assert_eq!(
            queue.push(&f.assets, renderable(f.blended, f.cube, 0), true),
            Some(RenderableType::Screen)
        );
        assert_eq!(
            queue.push(&f.assets, renderable(f.blended, f.cube, 1), false),
            Some(RenderableType::Translucent)
        );
        assert_eq!(
            queue.push(&f.assets, renderable(f.custom, f.cube, 2), false),
            Some(RenderableType::Translucent)
        );
        assert_eq!(
            queue.push(&f.assets, renderable(f.opaque, f.cube, 3), false),
            Some(RenderableType::Opaque)
        );
    }

    #[test]
    fn test_screen_pushes_leave_other_buckets_alone() {
        let f = fixture();
        let mut queue = RenderQueue::new();

        for i in 0..5 {
            let material = if i % 2 == 0 { f.opaque } else { f.blended };
            queue.push(&f.assets, renderable(material, f.cube, i), true);
        }

        assert_eq!(queue.count(RenderableType::Screen), 5);
        assert_eq!(queue.count(RenderableType::Opaque), 0);
        assert_eq!(queue.count(RenderableType::Translucent), 0);
    }

    #[test]
    fn test_duplicates_accumulate_in_push_order() {
        let f = fixture();
        let mut queue = RenderQueue::new();

        queue.push(&f.assets, renderable(f.opaque, f.cube, 4), false);
        queue.push(&f.assets, renderable(f.opaque, f.cube, 2), false);
        queue.push(&f.assets, renderable(f.opaque, f.cube, 4), false);

        let geometries: Vec<_> = queue.renderables(RenderableType::Opaque)[&f.opaque][&f.cube]
            .iter()
            .map(|(g, _)| g.0)
            .collect();
        assert_eq!(geometries, vec![4, 2, 4]);
    }

    #[test]
    fn test_reset_clears_everything() {
        let f = fixture();
        let mut queue = RenderQueue::new();
        queue.set_camera(Some(&Camera::default()));
        queue.push(&f.assets, renderable(f.opaque, f.cube, 0), false);
        queue.push(&f.assets, renderable(f.blended, f.cube, 1), false);
        queue.push(&f.assets, renderable(f.opaque, f.cube, 2), true);
        queue.push_light(Light::Point(PointLight::default()));

        queue.reset();

        let mut visits = 0;
        for kind in RenderableType::ALL {
            queue.each(kind, |_, _| visits += 1);
        }
        assert_eq!(visits, 0);
        assert!(queue.is_empty());
        assert!(queue.camera().is_none());
        assert_eq!(queue.view_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_unknown_material_is_dropped() {
        let f = fixture();
        let mut queue = RenderQueue::new();
        let missing = MaterialId(999);

        assert_eq!(queue.push(&f.assets, renderable(missing, f.cube, 0), false), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_each_mut_iterates_snapshot() {
        let f = fixture();
        let mut queue = RenderQueue::new();
        queue.push(&f.assets, renderable(f.opaque, f.cube, 0), false);

        let mut visits = 0;
        let assets = &f.assets;
        let blended = f.blended;
        let cube = f.cube;
        queue.each_mut(RenderableType::Opaque, |queue, _, _| {
            visits += 1;
            // Rerouted entries must not extend the running iteration
            queue.push(assets, renderable(blended, cube, 9), false);
            queue.reset();
        });

        assert_eq!(visits, 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_lights_keep_insertion_order() {
        let mut queue = RenderQueue::new();
        for i in 0..3 {
            queue.push_light(Light::Point(PointLight {
                position: Vec3::splat(i as f32),
                ..Default::default()
            }));
        }

        let mut seen = Vec::new();
        queue.each_light(|light, index| seen.push((index, light.position().x)));
        assert_eq!(seen, vec![(0, 0.0), (1, 1.0), (2, 2.0)]);
    }
}
