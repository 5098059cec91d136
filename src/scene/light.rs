//! Light types for the scene

use glam::{Vec3, Vec4};

use crate::backend::types::LightUniformData;

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
            radius: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
    pub inner_angle: f32, // radians
    pub outer_angle: f32, // radians
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: -Vec3::Y,
            color: Vec3::ONE,
            intensity: 1.0,
            radius: 10.0,
            inner_angle: 0.3,
            outer_angle: 0.5,
        }
    }
}

/// Light infinitely far away (like the sun)
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.5, -1.0, -0.5).normalize(),
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Point(PointLight),
    Spot(SpotLight),
    Directional(DirectionalLight),
}

impl Light {
    /// World position; directional lights sit at the origin
    pub fn position(&self) -> Vec3 {
        match self {
            Light::Point(l) => l.position,
            Light::Spot(l) => l.position,
            Light::Directional(_) => Vec3::ZERO,
        }
    }

    pub fn uniform_data(&self) -> LightUniformData {
        match self {
            Light::Point(l) => LightUniformData {
                position: l.position.extend(l.radius),
                color_intensity: l.color.extend(l.intensity),
                direction_type: Vec4::new(0.0, 0.0, 0.0, 0.0), // type 0 = point
            },
            Light::Spot(l) => LightUniformData {
                position: l.position.extend(l.radius),
                color_intensity: l.color.extend(l.intensity),
                direction_type: l.direction.normalize_or_zero().extend(1.0), // type 1 = spot
            },
            Light::Directional(l) => LightUniformData {
                position: Vec4::new(0.0, 0.0, 0.0, f32::INFINITY),
                color_intensity: l.color.extend(l.intensity),
                direction_type: l.direction.normalize_or_zero().extend(2.0), // type 2 = directional
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_data_encodes_type() {
        let point = Light::Point(PointLight::default()).uniform_data();
        let spot = Light::Spot(SpotLight::default()).uniform_data();
        let sun = Light::Directional(DirectionalLight::default()).uniform_data();

        assert_eq!(point.direction_type.w, 0.0);
        assert_eq!(spot.direction_type.w, 1.0);
        assert_eq!(sun.direction_type.w, 2.0);
        assert_eq!(point.position.w, 10.0);
    }
}
