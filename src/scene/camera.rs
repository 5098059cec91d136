//! Scene cameras

use glam::{Mat4, Vec3};

/// How a camera maps view space to clip space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// `fov_y` in radians
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    /// Box centered on the view axis
    Orthographic {
        half_width: f32,
        half_height: f32,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Self::perspective(45.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        Projection::Orthographic {
            half_width: width * 0.5,
            half_height: height * 0.5,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y, aspect, near, far),
            Projection::Orthographic {
                half_width,
                half_height,
                near,
                far,
            } => Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, near, far),
        }
    }

    /// Near and far clip distances
    pub fn depth_range(&self) -> (f32, f32) {
        match *self {
            Projection::Perspective { near, far, .. } | Projection::Orthographic { near, far, .. } => {
                (near, far)
            }
        }
    }

    /// Only perspective projections track an aspect ratio
    pub fn set_aspect(&mut self, aspect: f32) {
        if let Projection::Perspective { aspect: current, .. } = self {
            *current = aspect;
        }
    }
}

/// Camera for viewing the scene
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO)
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    /// Follow a new screen size. A zero height is ignored.
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.projection.set_aspect(width / height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_matrix_moves_eye_to_origin() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let eye = camera.view_matrix().transform_point3(camera.position);
        assert!(eye.length() < 1e-5);
    }

    #[test]
    fn test_set_aspect_ignores_zero_height() {
        let mut camera = Camera::default();
        camera.set_aspect(800.0, 0.0);
        assert_eq!(camera.projection, Projection::default());

        camera.set_aspect(800.0, 400.0);
        assert!(matches!(camera.projection, Projection::Perspective { aspect, .. } if aspect == 2.0));
    }
}
