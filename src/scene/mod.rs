//! Scene management
//!
//! A flat scene: cameras, lights and geometry nodes under one root
//! transform. Collection walks it once per frame to fill a [`RenderQueue`].

mod camera;
mod light;
mod transform;

pub use camera::*;
pub use light::*;
pub use transform::*;

use crate::render_queue::{RenderQueue, Renderable};
use crate::resources::{Assets, MaterialId, PrimitiveId};

/// Handle to a geometry node of a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeometryId(pub u32);

/// A drawable node
#[derive(Debug, Clone)]
pub struct GeometryNode {
    pub name: String,
    pub primitive: PrimitiveId,
    pub material: MaterialId,
    pub transform: Transform,
    /// Draw in screen space, on top of the 3D scene
    pub render_on_screen: bool,
    pub enabled: bool,
}

impl GeometryNode {
    pub fn new(name: &str, primitive: PrimitiveId, material: MaterialId) -> Self {
        Self {
            name: name.to_string(),
            primitive,
            material,
            transform: Transform::default(),
            render_on_screen: false,
            enabled: true,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn on_screen(mut self) -> Self {
        self.render_on_screen = true;
        self
    }
}

/// The scene containing all renderable content
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub root: Transform,
    cameras: Vec<Camera>,
    lights: Vec<Light>,
    nodes: Vec<GeometryNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_camera(&mut self, camera: Camera) -> usize {
        self.cameras.push(camera);
        self.cameras.len() - 1
    }

    /// First camera added to the scene
    pub fn main_camera(&self) -> Option<&Camera> {
        self.cameras.first()
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn cameras_mut(&mut self) -> &mut [Camera] {
        &mut self.cameras
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn add_geometry(&mut self, node: GeometryNode) -> GeometryId {
        self.nodes.push(node);
        GeometryId(self.nodes.len() as u32 - 1)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&GeometryNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn geometry_mut(&mut self, id: GeometryId) -> Option<&mut GeometryNode> {
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn geometry_count(&self) -> usize {
        self.nodes.len()
    }

    /// Populate `queue` for one camera. Returns the number of renderables
    /// queued; disabled nodes are skipped.
    ///
    /// The queue is not reset here.
    pub fn collect_render_queue(
        &self,
        camera: Option<&Camera>,
        assets: &Assets,
        queue: &mut RenderQueue,
    ) -> usize {
        queue.set_camera(camera);

        for light in &self.lights {
            queue.push_light(light.clone());
        }

        let mut queued = 0;
        for (index, node) in self.nodes.iter().enumerate() {
            if !node.enabled {
                continue;
            }

            let renderable = Renderable {
                material: node.material,
                primitive: node.primitive,
                geometry: GeometryId(index as u32),
                world: node.transform.compose(&self.root).matrix(),
            };
            if queue.push(assets, renderable, node.render_on_screen).is_some() {
                queued += 1;
            }
        }

        log::trace!(
            "Collected {} renderables and {} lights",
            queued,
            self.lights.len()
        );
        queued
    }
}
