use glam::Vec3;

use crate::scene::EntityHandle;

/// Light type and its geometric parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Infinitely distant light. `direction` points from the light toward
    /// the scene, in world space, and is expected to be normalized.
    Directional {
        /// World-space direction of travel.
        direction: Vec3,
    },
    /// Omnidirectional light with linear falloff to zero at `radius`.
    Point {
        /// Position in the submitting entity's local space.
        position: Vec3,
        /// Radius of influence in world units.
        radius: f32,
    },
}

/// An unshadowed light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Kind-specific parameters.
    pub kind: LightKind,
    /// Linear RGB color.
    pub color: Vec3,
    /// Scalar brightness multiplier.
    pub intensity: f32,
}

impl Light {
    /// Directional light traveling along `direction`.
    #[must_use]
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional { direction },
            color,
            intensity,
        }
    }

    /// Point light at `position` (entity-local) reaching `radius`.
    #[must_use]
    pub fn point(position: Vec3, radius: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point { position, radius },
            color,
            intensity,
        }
    }
}

/// A light queued for the current frame, with the entity whose world
/// transform places it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSubmission {
    /// The light parameters.
    pub light: Light,
    /// Entity resolved through [`Scene::entity_transform`](crate::scene::Scene::entity_transform)
    /// during the lighting pass.
    pub entity: EntityHandle,
}
